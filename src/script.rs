//! Command scripts driving `tourguide simulate`.
//!
//! Commands are separated by whitespace, `;` or newlines; `#` starts a
//! comment that runs to the end of the line.
//!
//! | command        | effect                                  |
//! |----------------|-----------------------------------------|
//! | `next`         | advance (completes on the last step)    |
//! | `prev`         | go back one step                        |
//! | `goto:N`       | jump to step `N`                        |
//! | `skip`/`close` | end the tour through the close path     |
//! | `open:/route`  | start a new session on another page     |
//! | `page:/route`  | host navigation while the tour runs     |
//! | `resize:WxH`   | change the viewport size                |
//! | `scroll:X,Y`   | change the scroll offset                |
//! | `wait:MS`      | let wall-clock time pass                |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tourguide_core_types::{PageId, Viewport};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("command '{command}' needs an argument ({expected})")]
    MissingArgument {
        command: String,
        expected: &'static str,
    },
    #[error("invalid argument for '{command}': {reason}")]
    InvalidArgument { command: String, reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptCommand {
    Next,
    Previous,
    GoTo(usize),
    Skip,
    Close,
    Open(PageId),
    Page(PageId),
    Resize { width: f64, height: f64 },
    Scroll { x: f64, y: f64 },
    Wait(Duration),
}

impl ScriptCommand {
    /// Whether the command moves the tour to another step or session.
    pub fn navigates(&self) -> bool {
        matches!(
            self,
            ScriptCommand::Next
                | ScriptCommand::Previous
                | ScriptCommand::GoTo(_)
                | ScriptCommand::Open(_)
                | ScriptCommand::Page(_)
        )
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::Next => f.write_str("next"),
            ScriptCommand::Previous => f.write_str("prev"),
            ScriptCommand::GoTo(index) => write!(f, "goto:{index}"),
            ScriptCommand::Skip => f.write_str("skip"),
            ScriptCommand::Close => f.write_str("close"),
            ScriptCommand::Open(page) => write!(f, "open:{page}"),
            ScriptCommand::Page(page) => write!(f, "page:{page}"),
            ScriptCommand::Resize { width, height } => write!(f, "resize:{width}x{height}"),
            ScriptCommand::Scroll { x, y } => write!(f, "scroll:{x},{y}"),
            ScriptCommand::Wait(duration) => write!(f, "wait:{}", duration.as_millis()),
        }
    }
}

impl FromStr for ScriptCommand {
    type Err = ScriptError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match raw.split_once(':') {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (raw, None),
        };
        let name = name.trim().to_ascii_lowercase();
        let require = |expected: &'static str| {
            arg.filter(|value| !value.is_empty())
                .ok_or_else(|| ScriptError::MissingArgument {
                    command: name.clone(),
                    expected,
                })
        };
        let invalid = |reason: String| ScriptError::InvalidArgument {
            command: name.clone(),
            reason,
        };

        match name.as_str() {
            "next" => Ok(ScriptCommand::Next),
            "prev" | "previous" | "back" => Ok(ScriptCommand::Previous),
            "skip" => Ok(ScriptCommand::Skip),
            "close" => Ok(ScriptCommand::Close),
            "goto" => require("step index")?
                .parse()
                .map(ScriptCommand::GoTo)
                .map_err(|err| invalid(format!("{err}"))),
            "open" => Ok(ScriptCommand::Open(PageId::from(require("page route")?))),
            "page" => Ok(ScriptCommand::Page(PageId::from(require("page route")?))),
            "resize" => {
                let viewport: Viewport = require("WIDTHxHEIGHT")?
                    .parse()
                    .map_err(|err| invalid(format!("{err}")))?;
                Ok(ScriptCommand::Resize {
                    width: viewport.width,
                    height: viewport.height,
                })
            }
            "scroll" => {
                let value = require("X,Y")?;
                let (x, y) = value
                    .split_once(',')
                    .ok_or_else(|| invalid(format!("expected X,Y, got '{value}'")))?;
                let x = x.trim().parse().map_err(|err| invalid(format!("{err}")))?;
                let y = y.trim().parse().map_err(|err| invalid(format!("{err}")))?;
                Ok(ScriptCommand::Scroll { x, y })
            }
            "wait" | "sleep" => require("milliseconds")?
                .parse()
                .map(|ms| ScriptCommand::Wait(Duration::from_millis(ms)))
                .map_err(|err| invalid(format!("{err}"))),
            _ => Err(ScriptError::UnknownCommand(raw.to_string())),
        }
    }
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split(|c: char| c == ';' || c.is_whitespace()))
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}
