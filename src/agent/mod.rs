pub mod agent_loop;

pub use agent_loop::{Agent, AgentConfig, TurnError};
