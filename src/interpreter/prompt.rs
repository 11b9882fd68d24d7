//! Prompt and response schema sent with every interpretation request.

use serde_json::{json, Value};

use super::command::Action;
use crate::task::TaskStatus;

/// Instruction block preceding the user's command. The user text is appended
/// verbatim as the last line, so nothing in it is treated as a placeholder.
const INSTRUCTIONS: &str = r#"You are a task-management assistant. Your job is to interpret the user's command and return ONE JSON object describing the action and the task data. DO NOT INCLUDE ANY TEXT OUTSIDE THE JSON.
Dates must use the YYYY-MM-DD format.
The possible task statuses are: "pending", "completed", "in_progress", "cancelled".

If you cannot determine a clear action, use "unknown" as the action and put a helpful message in the "message" field.

Examples:
User command: 'crear la tarea "realizar app" con fecha de inicio 03-07-2025 y estado "pendiente"'
Expected JSON:
```json
{
  "action": "create",
  "description": "realizar app",
  "start_date": "2025-07-03",
  "status": "pending"
}
```

User command: 'marcar tarea 3f1c2a9e-8d4b-4c7a-9e1f-2b6d5a7c8e90 como completada'
Expected JSON:
```json
{
  "action": "update",
  "task_id": "3f1c2a9e-8d4b-4c7a-9e1f-2b6d5a7c8e90",
  "status": "completed"
}
```

User command: 'actualizar la descripción de la tarea 3f1c2a9e-8d4b-4c7a-9e1f-2b6d5a7c8e90 a "Terminar informe"'
Expected JSON:
```json
{
  "action": "update",
  "task_id": "3f1c2a9e-8d4b-4c7a-9e1f-2b6d5a7c8e90",
  "description": "Terminar informe"
}
```

User command: 'eliminar tarea 3f1c2a9e-8d4b-4c7a-9e1f-2b6d5a7c8e90'
Expected JSON:
```json
{
  "action": "delete",
  "task_id": "3f1c2a9e-8d4b-4c7a-9e1f-2b6d5a7c8e90"
}
```

User command: 'mostrar todas mis tareas'
Expected JSON:
```json
{
  "action": "read"
}
```

User command: '¿Qué tiempo hace hoy?'
Expected JSON:
```json
{
  "action": "unknown",
  "message": "Sorry, I can only manage tasks. Is there anything I can do with your tasks?"
}
```
"#;

/// Build the full prompt for one user command.
pub fn build_prompt(user_text: &str) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + user_text.len() + 20);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\nUser command: '");
    prompt.push_str(user_text);
    prompt.push('\'');
    prompt
}

/// Response schema in the Gemini `responseSchema` dialect.
pub fn response_schema() -> Value {
    let actions: Vec<&str> = Action::ALL.iter().map(Action::as_str).collect();
    let statuses: Vec<&str> = TaskStatus::ALL.iter().map(TaskStatus::as_str).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "action": {
                "type": "STRING",
                "enum": actions,
                "description": "The action to perform on tasks."
            },
            "task_id": {
                "type": "STRING",
                "description": "ID of the task for update or delete actions. Required for update/delete."
            },
            "description": {
                "type": "STRING",
                "description": "Description of the task. Required for create, optional for update."
            },
            "start_date": {
                "type": "STRING",
                "description": "Start date of the task in YYYY-MM-DD format. Optional for create/update."
            },
            "status": {
                "type": "STRING",
                "enum": statuses,
                "description": "Status of the task. Optional for create/update."
            },
            "message": {
                "type": "STRING",
                "description": "A user-friendly message if the action is 'unknown' or needs clarification."
            }
        },
        "required": ["action"],
        "propertyOrdering": ["action", "task_id", "description", "start_date", "status", "message"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_user_text() {
        let prompt = build_prompt("crear la tarea 'comprar pan' con estado pendiente");
        assert!(prompt.starts_with("You are a task-management assistant."));
        assert!(prompt
            .ends_with("User command: 'crear la tarea 'comprar pan' con estado pendiente'"));
    }

    #[test]
    fn test_prompt_keeps_braces_in_user_text() {
        let prompt = build_prompt("crear tarea {user_prompt} {}");
        assert!(prompt.ends_with("'crear tarea {user_prompt} {}'"));
    }

    #[test]
    fn test_prompt_contains_six_examples() {
        let prompt = build_prompt("x");
        assert_eq!(prompt.matches("Expected JSON:").count(), 6);
        for action in Action::ALL {
            assert!(prompt.contains(&format!("\"action\": \"{}\"", action)));
        }
        assert!(prompt.contains("\"in_progress\""));
    }

    #[test]
    fn test_schema_requires_action_only() {
        let schema = response_schema();
        assert_eq!(schema["required"], json!(["action"]));
        assert_eq!(
            schema["properties"]["action"]["enum"],
            json!(["create", "read", "update", "delete", "unknown"])
        );
        assert_eq!(
            schema["properties"]["status"]["enum"],
            json!(["pending", "completed", "in_progress", "cancelled"])
        );
    }
}
