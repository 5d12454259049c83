use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use tracing::warn;

use crate::config::EmailConfig;
use crate::tool::{Tool, ToolError, require_str};

/// Email dispatch over SMTP.
///
/// Without SMTP credentials the tool still answers, reporting that no
/// message was delivered, so the model can tell the user instead of the
/// turn failing.
pub struct SendEmailTool {
    config: EmailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SendEmailTool {
    pub fn new(config: EmailConfig) -> Self {
        let transport = if config.is_configured() {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host) {
                Ok(builder) => Some(
                    builder
                        .port(config.smtp_port)
                        .credentials(Credentials::new(
                            config.smtp_user.clone(),
                            config.smtp_pass.clone(),
                        ))
                        .build(),
                ),
                Err(err) => {
                    warn!(%err, "Failed to build SMTP transport, email tool degraded");
                    None
                }
            }
        } else {
            None
        };
        Self { config, transport }
    }

    fn fail(&self, reason: impl ToString) -> ToolError {
        ToolError::ExecutionFailed {
            tool: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email with the given subject and message to the given address."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "Recipient email address"
                },
                "subject": {
                    "type": "string",
                    "description": "Email subject line"
                },
                "message": {
                    "type": "string",
                    "description": "Email body text"
                }
            },
            "required": ["email", "subject", "message"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let email = require_str(self.name(), &args, "email")?;
        let subject = require_str(self.name(), &args, "subject")?;
        let message = require_str(self.name(), &args, "message")?;

        let Some(transport) = &self.transport else {
            warn!(to = email, "Email not configured, nothing sent");
            return Ok(format!(
                "Email sending is not configured; no message was delivered to {email}"
            ));
        };

        let mail = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_email)
                    .parse()
                    .map_err(|e| self.fail(e))?,
            )
            .to(email.parse().map_err(|e| self.fail(e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| self.fail(e))?;

        transport.send(mail).await.map_err(|e| self.fail(e))?;

        Ok(format!(
            "Email sent to {email} with subject '{subject}' and message '{message}'"
        ))
    }
}
