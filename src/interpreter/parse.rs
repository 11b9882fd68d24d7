//! Decoding of raw model output into a `Command`.
//!
//! Model output nominally follows the response schema but may carry markdown
//! fences, decorated keys, or malformed JSON. Each stage either hands a cleaner
//! value to the next one or stops with an `InterpretError`.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use super::command::{Action, Command};
use super::InterpretError;

fn fenced_json_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap())
}

/// The JSON text to parse: the first ```json fenced block if present,
/// otherwise the whole trimmed output.
pub fn extract_json_payload(raw: &str) -> &str {
    match fenced_json_block().captures(raw).and_then(|caps| caps.get(1)) {
        Some(block) => block.as_str().trim(),
        None => raw.trim(),
    }
}

/// Strip every character that is not alphanumeric or `_` from a key.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Rebuild an object with sanitized top-level keys.
///
/// Keys keep document order, so on collision the key written later wins.
pub fn sanitize_keys(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| {
            let cleaned = sanitize_key(&key);
            if cleaned != key {
                tracing::debug!("Sanitized key {:?} -> {:?}", key, cleaned);
            }
            (cleaned, value)
        })
        .collect()
}

/// Run the whole extract → parse → sanitize → validate pipeline.
pub fn parse_command(raw: &str) -> Result<Command, InterpretError> {
    let payload = extract_json_payload(raw);

    let object = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return Err(InterpretError::InvalidJson(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
        Err(e) => return Err(InterpretError::InvalidJson(e.to_string())),
    };

    let object = sanitize_keys(object);

    match object.get("action") {
        None | Some(Value::Null) => return Err(InterpretError::MissingAction),
        Some(Value::String(action)) if Action::parse(action).is_some() => {}
        Some(Value::String(action)) => return Err(InterpretError::InvalidAction(action.clone())),
        Some(other) => return Err(InterpretError::InvalidAction(other.to_string())),
    }

    serde_json::from_value(Value::Object(object)).map_err(|e| InterpretError::Schema(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn test_fenced_block_wins_over_prose() {
        let raw = "Sure! Here it is:\n```json\n{\"action\": \"read\"}\n```\nAnything else?";
        assert_eq!(extract_json_payload(raw), "{\"action\": \"read\"}");
    }

    #[test]
    fn test_first_fenced_block_is_used() {
        let raw = "```json\n{\"action\": \"delete\"}\n```\n```json\n{\"action\": \"create\"}\n```";
        assert_eq!(extract_json_payload(raw), "{\"action\": \"delete\"}");
    }

    #[test]
    fn test_unfenced_text_is_trimmed() {
        assert_eq!(extract_json_payload("  \n{\"a\": 1}\n "), "{\"a\": 1}");
    }

    #[test]
    fn test_sanitize_key_strips_decoration() {
        assert_eq!(sanitize_key(" \"action\" "), "action");
        assert_eq!(sanitize_key("task_id:"), "task_id");
        assert_eq!(sanitize_key("\nstart_date\t"), "start_date");
        assert_eq!(sanitize_key("descripción"), "descripción");
    }

    #[test]
    fn test_parse_fenced_create() {
        let raw = concat!(
            "```json\n{\n",
            "  \"action\": \"create\",\n",
            "  \"description\": \"comprar pan\",\n",
            "  \"status\": \"pending\"\n",
            "}\n```"
        );
        let command = parse_command(raw).unwrap();
        assert_eq!(command.action, Action::Create);
        assert_eq!(command.description.as_deref(), Some("comprar pan"));
        assert_eq!(command.status, Some(TaskStatus::Pending));
        assert_eq!(command.task_id, None);
    }

    #[test]
    fn test_parse_with_dirty_keys_and_extra_fields() {
        let raw =
            r#"{" action ": "update", "task_id ": "abc", "status": "completed", "score": 0.9}"#;
        let command = parse_command(raw).unwrap();
        assert_eq!(command.action, Action::Update);
        assert_eq!(command.task_id.as_deref(), Some("abc"));
        assert_eq!(command.status, Some(TaskStatus::Completed));
    }

    #[test]
    fn test_colliding_keys_resolve_to_the_later_one() {
        let command = parse_command(r#"{"action": "delete", " action": "read"}"#).unwrap();
        assert_eq!(command.action, Action::Read);

        let command = parse_command(r#"{" action": "read", "action": "delete"}"#).unwrap();
        assert_eq!(command.action, Action::Delete);
    }

    #[test]
    fn test_missing_or_null_action() {
        assert!(matches!(
            parse_command(r#"{"description": "x"}"#),
            Err(InterpretError::MissingAction)
        ));
        assert!(matches!(
            parse_command(r#"{"action": null}"#),
            Err(InterpretError::MissingAction)
        ));
    }

    #[test]
    fn test_invalid_action_is_named() {
        match parse_command(r#"{"action": "archive"}"#) {
            Err(InterpretError::InvalidAction(value)) => assert_eq!(value, "archive"),
            other => panic!("unexpected result: {:?}", other),
        }
        match parse_command(r#"{"action": 3}"#) {
            Err(InterpretError::InvalidAction(value)) => assert_eq!(value, "3"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_command("```json\n{\"action\": \"read\",\n```"),
            Err(InterpretError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_command("[\"read\"]"),
            Err(InterpretError::InvalidJson(_))
        ));
        assert!(matches!(parse_command(""), Err(InterpretError::InvalidJson(_))));
    }

    #[test]
    fn test_type_mismatch_is_schema_error() {
        assert!(matches!(
            parse_command(r#"{"action": "create", "description": 42}"#),
            Err(InterpretError::Schema(_))
        ));
        assert!(matches!(
            parse_command(r#"{"action": "update", "task_id": "a", "status": "done"}"#),
            Err(InterpretError::Schema(_))
        ));
    }
}
