//! Command values and their responses.

use std::fmt;

use crate::envelope::{CommandStatus, Envelope};
use crate::error::Error;

/// A game command split into its name and the rest of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Option<String>,
}

impl Command {
    pub fn parse(command_line: &str) -> Command {
        let mut parts = command_line.trim().splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_string();
        let args = parts
            .next()
            .map(str::trim)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        Command { name, args }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            Some(args) => write!(f, "{} {}", self.name, args),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Command {
    fn from(command_line: &str) -> Self {
        Command::parse(command_line)
    }
}

impl From<String> for Command {
    fn from(command_line: String) -> Self {
        Command::parse(&command_line)
    }
}

/// A successful command reply. Failures never construct this; they surface
/// as [`Error::Command`] with the code and message the game reported.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub code: i64,
    pub status_message: String,
    pub raw: Envelope,
}

impl CommandResponse {
    pub(crate) fn from_envelope(envelope: Envelope, command_line: &str) -> Result<Self, Error> {
        let status: CommandStatus =
            serde_json::from_value(envelope.body.clone()).unwrap_or_default();
        if status.status_code != 0 {
            return Err(Error::Command {
                code: status.status_code,
                message: status.status_message,
                command: command_line.to_string(),
            });
        }
        Ok(CommandResponse {
            code: status.status_code,
            status_message: status.status_message,
            raw: envelope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MessagePurpose;
    use serde_json::json;

    fn reply(body: serde_json::Value) -> Envelope {
        serde_json::from_value(json!({
            "header": {"version": 1, "requestId": "r", "messagePurpose": "commandResponse"},
            "body": body,
        }))
        .unwrap()
    }

    #[test]
    fn parse_splits_name_and_args() {
        let command = Command::parse("title @a actionbar hey!");
        assert_eq!(command.name, "title");
        assert_eq!(command.args.as_deref(), Some("@a actionbar hey!"));
        assert_eq!(command.to_string(), "title @a actionbar hey!");
    }

    #[test]
    fn parse_handles_bare_commands() {
        let command = Command::parse("  list  ");
        assert_eq!(command.name, "list");
        assert_eq!(command.args, None);
        assert_eq!(command.to_string(), "list");
    }

    #[test]
    fn conversion_normalizes_the_separator() {
        let command: Command = "say   hi".into();
        assert_eq!(command.name, "say");
        assert_eq!(command.args.as_deref(), Some("hi"));
        assert_eq!(command.to_string(), "say hi");
        let owned: Command = String::from("tp @a  0 64 0").into();
        assert_eq!(owned.to_string(), "tp @a  0 64 0");
    }

    #[test]
    fn zero_status_is_success() {
        let envelope = reply(json!({"statusCode": 0, "statusMessage": "ok"}));
        let response = CommandResponse::from_envelope(envelope, "say hello").unwrap();
        assert_eq!(response.code, 0);
        assert_eq!(response.status_message, "ok");
        assert_eq!(
            response.raw.header.message_purpose,
            MessagePurpose::CommandResponse
        );
    }

    #[test]
    fn nonzero_status_carries_the_failure() {
        let envelope = reply(json!({
            "statusCode": -2147352576i64,
            "statusMessage": "Unknown command",
        }));
        let err = CommandResponse::from_envelope(envelope, "say hello").unwrap_err();
        match err {
            Error::Command {
                code,
                message,
                command,
            } => {
                assert_eq!(code, -2147352576);
                assert_eq!(message, "Unknown command");
                assert_eq!(command, "say hello");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
