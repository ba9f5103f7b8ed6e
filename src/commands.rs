//! Slash-command parsing for the input box.
//!
//! Anything that does not start with `/` is a chat message. Commands mutate
//! the registry and panel state; parsing is pure so the controller loop can
//! act on the result.

use std::collections::HashMap;

use crate::api::ServerSpec;

#[derive(Debug, PartialEq)]
pub enum InputAction {
    /// Plain text, sent to the assistant.
    Message(String),
    AddServer(ServerSpec),
    DeleteServer(Option<String>),
    /// Expand/collapse a server's tool list; `None` targets the selection.
    ToggleTools(Option<String>),
    ToggleEnabled(Option<String>),
    Select(String),
    ImportFile(String),
    Help,
    /// A recognized command with arguments that failed validation; the
    /// message is logged and the operation dropped.
    Invalid(String),
}

pub fn process_input(input: &str) -> InputAction {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return InputAction::Message(input.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or_default();
    match command {
        "/add" => parse_add(trimmed),
        "/delete" | "/del" => InputAction::DeleteServer(parts.next().map(str::to_string)),
        "/tools" => InputAction::ToggleTools(parts.next().map(str::to_string)),
        "/enable" => InputAction::ToggleEnabled(parts.next().map(str::to_string)),
        "/select" => match parts.next() {
            Some(name) => InputAction::Select(name.to_string()),
            None => InputAction::Invalid("Usage: /select <server>".to_string()),
        },
        "/import" => match parts.next() {
            Some(path) => InputAction::ImportFile(path.to_string()),
            None => InputAction::Invalid("Usage: /import <file.json>".to_string()),
        },
        "/help" => InputAction::Help,
        other => InputAction::Invalid(format!("Unknown command: {other}")),
    }
}

/// `/add <name> <command> [args...] [env={json}]`. The env payload, when
/// present, runs to the end of the line so it may contain spaces.
fn parse_add(input: &str) -> InputAction {
    const USAGE: &str = "Usage: /add <name> <command> [args...] [env={\"KEY\":\"value\"}]";

    let (head, env) = match input.find(" env=") {
        Some(pos) => {
            let json = input[pos + " env=".len()..].trim();
            match serde_json::from_str::<HashMap<String, String>>(json) {
                Ok(env) => (&input[..pos], Some(env)),
                Err(e) => return InputAction::Invalid(format!("Invalid env JSON: {e}")),
            }
        }
        None => (input, None),
    };

    let mut parts = head.split_whitespace().skip(1);
    let (Some(name), Some(command)) = (parts.next(), parts.next()) else {
        return InputAction::Invalid(USAGE.to_string());
    };
    InputAction::AddServer(ServerSpec {
        name: name.to_string(),
        command: command.to_string(),
        args: parts.map(str::to_string).collect(),
        env,
    })
}

pub const HELP_TEXT: &str = "\
Commands:
  /add <name> <command> [args...] [env={json}]   Register a tool-provider server
  /delete [name]                                 Deregister a server (default: selection)
  /tools [name]                                  Expand/collapse a server's tool list
  /enable [name]                                 Toggle a server's enabled flag
  /select <name>                                 Select a server in the panel
  /import <file.json>                            Import an mcpServers document
  /help                                          Show this help
Anything else is sent to the assistant.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            process_input("hello there"),
            InputAction::Message("hello there".to_string())
        );
    }

    #[test]
    fn add_parses_name_command_and_args() {
        let InputAction::AddServer(spec) = process_input("/add fs node server.js --port 3000")
        else {
            panic!("expected AddServer");
        };
        assert_eq!(spec.name, "fs");
        assert_eq!(spec.command, "node");
        assert_eq!(spec.args, vec!["server.js", "--port", "3000"]);
        assert_eq!(spec.env, None);
    }

    #[test]
    fn add_parses_trailing_env_json() {
        let InputAction::AddServer(spec) =
            process_input(r#"/add fs node server.js env={"TOKEN": "a b c"}"#)
        else {
            panic!("expected AddServer");
        };
        let env = spec.env.unwrap();
        assert_eq!(env.get("TOKEN").map(String::as_str), Some("a b c"));
    }

    #[test]
    fn malformed_env_json_is_a_validation_failure() {
        assert!(matches!(
            process_input("/add fs node env={broken"),
            InputAction::Invalid(_)
        ));
    }

    #[test]
    fn add_without_command_shows_usage() {
        assert!(matches!(process_input("/add fs"), InputAction::Invalid(_)));
    }

    #[test]
    fn bare_delete_targets_the_selection() {
        assert_eq!(process_input("/delete"), InputAction::DeleteServer(None));
        assert_eq!(
            process_input("/del fs"),
            InputAction::DeleteServer(Some("fs".to_string()))
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        assert!(matches!(process_input("/frobnicate"), InputAction::Invalid(_)));
    }
}
