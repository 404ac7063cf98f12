//! Event command tags.

use serde::{Serialize, Serializer};

/// Command tag carried in `p_cmd`.
///
/// The seven known tags are the only ones the gateway may stream. Any
/// other tag is kept as `Other` so that the decoder can reject it with
/// a validation error instead of losing the text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Status / error notice.
    St,
    /// Keep-alive.
    Kp,
    /// Board (quote) update.
    Fd,
    /// Order / execution change.
    Ec,
    /// News.
    Ns,
    /// System status change.
    Ss,
    /// Operation status change.
    Us,
    /// Any tag outside the allow-list, upper-cased.
    Other(String),
}

/// Commands subscribed when the caller asks for none.
pub const DEFAULT_COMMANDS: [Command; 5] = [
    Command::St,
    Command::Kp,
    Command::Ec,
    Command::Ss,
    Command::Us,
];

impl Command {
    /// Normalize raw text into a command (trim + upper-case).
    ///
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let tag = raw.trim().to_ascii_uppercase();
        let cmd = match tag.as_str() {
            "" => return None,
            "ST" => Self::St,
            "KP" => Self::Kp,
            "FD" => Self::Fd,
            "EC" => Self::Ec,
            "NS" => Self::Ns,
            "SS" => Self::Ss,
            "US" => Self::Us,
            _ => Self::Other(tag),
        };
        Some(cmd)
    }

    /// Wire text of the tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::St => "ST",
            Self::Kp => "KP",
            Self::Fd => "FD",
            Self::Ec => "EC",
            Self::Ns => "NS",
            Self::Ss => "SS",
            Self::Us => "US",
            Self::Other(tag) => tag,
        }
    }

    /// Whether the gateway is allowed to stream this command.
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
