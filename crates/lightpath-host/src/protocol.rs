//! Line protocol for feeding host events to the `lightpath` binary.
//!
//! Each line is either a whitespace-separated command:
//!
//! ```text
//! down 39
//! up 39
//! collide 0
//! quit
//! ```
//!
//! or a JSON object in the host's native event shape:
//! `{"keyCode": 39, "type": "down"}` / `{"playerIndex": 0}`.

use serde::Deserialize;

use lightpath_core::keys::{KeyCode, KeyEvent, KeyEventKind};

use crate::collision::CollisionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Key(KeyEvent),
    Collision(CollisionEvent),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
    TrailingInput(String),
    Json(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::UnknownCommand(c) => write!(f, "unknown command '{c}'"),
            Self::MissingArgument(what) => write!(f, "missing {what}"),
            Self::InvalidNumber(n) => write!(f, "'{n}' is not a valid number"),
            Self::TrailingInput(t) => write!(f, "unexpected trailing input '{t}'"),
            Self::Json(m) => write!(f, "malformed event: {m}"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireEvent {
    Key {
        #[serde(rename = "keyCode")]
        key_code: KeyCode,
        #[serde(rename = "type")]
        kind: KeyEventKind,
    },
    Collision {
        #[serde(rename = "playerIndex")]
        player_index: usize,
    },
}

pub fn parse_line(line: &str) -> Result<HostEvent, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(ParseError::Empty);
    }
    if line.starts_with('{') {
        return parse_json(line);
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().ok_or(ParseError::Empty)?;
    let event = match command.to_ascii_lowercase().as_str() {
        "down" => HostEvent::Key(KeyEvent::down(parse_arg(parts.next(), "key code")?)),
        "up" => HostEvent::Key(KeyEvent::up(parse_arg(parts.next(), "key code")?)),
        "collide" => HostEvent::Collision(CollisionEvent {
            player_index: parse_arg(parts.next(), "player index")?,
        }),
        "quit" | "exit" => HostEvent::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    let rest: Vec<&str> = parts.collect();
    if !rest.is_empty() {
        return Err(ParseError::TrailingInput(rest.join(" ")));
    }
    Ok(event)
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&str>, what: &'static str) -> Result<T, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument(what))?;
    arg.parse()
        .map_err(|_| ParseError::InvalidNumber(arg.to_string()))
}

fn parse_json(line: &str) -> Result<HostEvent, ParseError> {
    let wire: WireEvent = serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(match wire {
        WireEvent::Key { key_code, kind } => HostEvent::Key(KeyEvent {
            code: key_code,
            kind,
        }),
        WireEvent::Collision { player_index } => {
            HostEvent::Collision(CollisionEvent { player_index })
        },
    })
}
