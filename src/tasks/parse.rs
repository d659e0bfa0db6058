//! # Transport message parser.
//!
//! Turns one inbound text line of the form `<type>[:<data>]` into a [`Message`].
//! Type and data stop at the first whitespace or second colon, so trailing
//! garbage is ignored.
//!
//! | line               | result                              |
//! |--------------------|-------------------------------------|
//! | `start_app:pong`   | `StartApp` task, data `pong`        |
//! | `close_app`        | `CloseApp` task, no data            |
//! | `interaction`      | `Interaction` task                  |
//! | `test:hello`       | `Test` task, data `hello`           |
//! | `input`            | raw input (feedback switch decides) |
//! | anything else      | `None`                              |

use super::task::{Task, TaskKind};

/// A parsed inbound message.
#[derive(Debug, Clone)]
pub enum Message {
    /// Post this task.
    Task(Task),
    /// Raw input event; becomes an `Interaction` only while feedback is enabled.
    Input,
}

/// Parses one line. Returns `None` for blank or unknown messages.
pub fn parse_message(line: &str) -> Option<Message> {
    let line = line.trim_start();
    let head = line.split(char::is_whitespace).next().unwrap_or_default();

    let mut parts = head.splitn(3, ':');
    let msg_type = parts.next().filter(|t| !t.is_empty())?;
    let data = parts.next().unwrap_or_default();

    let kind = match msg_type {
        "start_app" => TaskKind::StartApp,
        "close_app" => TaskKind::CloseApp,
        "interaction" => TaskKind::Interaction,
        "test" => TaskKind::Test,
        "input" => return Some(Message::Input),
        other => {
            tracing::debug!(msg_type = other, "ignoring unknown message");
            return None;
        }
    };
    Some(Message::Task(Task::new(kind).with_data(data)))
}
