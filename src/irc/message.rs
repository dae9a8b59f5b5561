//! IRC protocol lines.

use std::fmt;

/// One parsed IRC protocol line.
///
/// Message tags are accepted on input and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Source of the message (`nick!user@host` or a server name).
    pub prefix: Option<String>,
    /// Command word or three-digit numeric, upper-cased.
    pub command: String,
    /// Parameters, the trailing one included.
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Build a client message with no prefix.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.to_string(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a single line (without its line terminator).
    ///
    /// Returns `None` for blank lines or lines without a command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if let Some(tagged) = rest.strip_prefix('@') {
            rest = tagged.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }
        rest = rest.trim_start_matches(' ');

        let prefix = match rest.strip_prefix(':') {
            Some(prefixed) => {
                let (prefix, r) = prefixed.split_once(' ').unwrap_or((prefixed, ""));
                rest = r;
                Some(prefix.to_string())
            }
            None => None,
        };

        rest = rest.trim_start_matches(' ');
        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = r;
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nickname part of the prefix, if the prefix is a user.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split_once('!').map(|(nick, _)| nick).unwrap_or(prefix))
    }

    /// Parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Last parameter, usually the free-text part.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}

impl fmt::Display for IrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {}", param)?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }

        Ok(())
    }
}
