//! Operator command parsing.
//!
//! Parsing never fails: any non-blank line becomes a [`Command`]. Whether the
//! verb means anything is decided later by [`Verb::parse`] inside the
//! coordinator, which reports unknown verbs back to the operator.
//!
//! # Examples
//!
//! ```
//! use ad_agent::{Command, Verb};
//!
//! let cmd = Command::parse("watch ./services/api").expect("non-blank line");
//! assert_eq!(cmd.verb(), Verb::Watch);
//! assert_eq!(cmd.argument, "./services/api");
//!
//! assert!(Command::parse("   ").is_none());
//! ```

use std::fmt;

/// One line of operator input, split into verb and argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The first word of the line.
    pub verb: String,

    /// Everything after the first whitespace run. Empty when absent.
    pub argument: String,
}

impl Command {
    /// Creates a command from its parts.
    #[must_use]
    pub fn new(verb: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            argument: argument.into(),
        }
    }

    /// Parses a raw input line.
    ///
    /// Surrounding whitespace is trimmed. Returns `None` for a blank line.
    /// The argument is the remainder after the first whitespace run and is
    /// kept verbatim, so paths containing spaces survive intact.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (verb, argument) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim_start()),
            None => (line, ""),
        };

        Some(Self::new(verb, argument))
    }

    /// Classifies the verb.
    #[must_use]
    pub fn verb(&self) -> Verb {
        Verb::parse(&self.verb)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.argument.is_empty() {
            f.write_str(&self.verb)
        } else {
            write!(f, "{} {}", self.verb, self.argument)
        }
    }
}

/// The verbs the coordinator understands.
///
/// Matching is case-sensitive: `watchList` is a verb, `watchlist` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Redeploy immediately, bypassing debounce and cooldown.
    Redeploy,
    /// Stop reacting to file changes.
    Pause,
    /// React to file changes again.
    Resume,
    /// Change the cooldown window.
    Cooldown,
    /// Show the current state.
    Status,
    /// Start watching a directory.
    Watch,
    /// Stop watching a directory.
    WatchRemove,
    /// List watched directories.
    WatchList,
    /// Stop watching every directory.
    Reset,
    /// Show the command reference.
    Help,
    /// Anything else.
    Unknown,
}

impl Verb {
    /// Classifies a verb string.
    #[must_use]
    pub fn parse(verb: &str) -> Self {
        match verb {
            "redeploy" => Self::Redeploy,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "cooldown" => Self::Cooldown,
            "status" => Self::Status,
            "watch" => Self::Watch,
            "watchRemove" => Self::WatchRemove,
            "watchList" => Self::WatchList,
            "reset" => Self::Reset,
            "help" => Self::Help,
            _ => Self::Unknown,
        }
    }
}
