//! Fallback parser for disguised tool calls.
//!
//! The model sometimes skips the structured tool-call field and instead
//! embeds a pseudo-call in its reply text, shaped like
//! `<function=NAME{ARGS}</function>`, often with the argument object's
//! closing brace missing. This module recovers such calls. It is only
//! consulted for short replies (the orchestrator's bound); a failed parse
//! means "no tool call", never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::tool::ToolCall;

static PSEUDO_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<function=([A-Za-z_][A-Za-z0-9_]*)\{(.*?)</function>")
        .expect("pseudo-call regex is valid")
});

// Looser variant: whitespace between the name and the argument object.
static PSEUDO_CALL_SPACED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<function=([A-Za-z_][A-Za-z0-9_]*)\s+\{(.*?)</function>")
        .expect("spaced pseudo-call regex is valid")
});

/// Extracts pseudo tool calls from reply text.
///
/// Returns `None` when no recognizable call is present or the argument
/// body is not a JSON object. Synthesized ids are deterministic
/// (`call_<name>`), since the model issued no real id to echo back.
pub fn parse_tool_calls(text: &str) -> Option<Vec<ToolCall>> {
    let captures = PSEUDO_CALL
        .captures(text)
        .or_else(|| PSEUDO_CALL_SPACED.captures(text))?;

    let name = captures.get(1)?.as_str();
    let body = captures.get(2)?.as_str().trim();

    // Re-attach the opening brace the pattern consumed; if the body also
    // dropped its closing brace, re-close it and retry.
    let candidate = format!("{{{body}");
    let arguments: Value = serde_json::from_str(&candidate)
        .or_else(|_| serde_json::from_str(&format!("{candidate}}}")))
        .ok()?;
    if !arguments.is_object() {
        return None;
    }

    Some(vec![ToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_pseudo_call() {
        let calls =
            parse_tool_calls(r#"<function=generate_qr_code{"data": "hello"}</function>"#).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "generate_qr_code");
        assert_eq!(calls[0].id, "call_generate_qr_code");
        let args: Value = serde_json::from_str(&calls[0].arguments).unwrap();
        assert_eq!(args, serde_json::json!({"data": "hello"}));
    }

    #[test]
    fn recloses_a_missing_brace() {
        let calls = parse_tool_calls(r#"<function=web_search{"query": "rust"</function>"#).unwrap();
        let args: Value = serde_json::from_str(&calls[0].arguments).unwrap();
        assert_eq!(args, serde_json::json!({"query": "rust"}));
    }

    #[test]
    fn tolerates_space_before_the_argument_object() {
        let calls = parse_tool_calls(r#"<function=web_search {"query": "rust"}</function>"#).unwrap();
        assert_eq!(calls[0].name, "web_search");
    }

    #[test]
    fn missing_closing_tag_yields_no_call() {
        assert!(parse_tool_calls(r#"<function=generate_qr_code{"data": "hello"}"#).is_none());
    }

    #[test]
    fn unparseable_argument_body_yields_no_call() {
        assert!(parse_tool_calls(r#"<function=web_search{not json at all}</function>"#).is_none());
    }

    #[test]
    fn plain_prose_yields_no_call() {
        assert!(parse_tool_calls("The weather in Paris is mild today.").is_none());
    }
}
