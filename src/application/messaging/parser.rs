//! Command parser - Turns raw chat text into command events

use crate::domain::entities::CommandEvent;

/// Parses `/token@botname args` text into a `CommandEvent`
pub struct CommandParser {
    command_prefix: String,
    bot_username: Option<String>,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            bot_username: None,
        }
    }

    /// Only accept `@username` suffixes addressed to this bot
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Parse a text message; `None` when it is not a command for this bot.
    ///
    /// The token runs up to the first whitespace, the rest of the text
    /// (trimmed) becomes the raw argument string.
    pub fn parse(&self, text: &str) -> Option<CommandEvent> {
        let text = text.trim();
        let body = text.strip_prefix(self.command_prefix.as_str())?;

        let (token, args) = match body.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (body, ""),
        };

        let command = match token.split_once('@') {
            Some((command, target)) => {
                if let Some(username) = &self.bot_username {
                    if !target.eq_ignore_ascii_case(username) {
                        return None;
                    }
                }
                command
            }
            None => token,
        };

        if command.is_empty() {
            return None;
        }

        Some(CommandEvent::new(command, args))
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Split an argument string on single spaces, requiring exactly `expected`
/// fields. On mismatch returns the number of fields actually received.
pub fn split_args(args: &str, expected: usize) -> Result<Vec<&str>, usize> {
    let fields: Vec<&str> = if args.is_empty() {
        Vec::new()
    } else {
        args.split(' ').collect()
    };

    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(fields.len())
    }
}
