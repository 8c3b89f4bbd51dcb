//! Discord bot commands (!roll, !rollhelp).
//!
//! Classifies message text against a table of command tokens.

use tracing::debug;

use crate::common::InboundMessage;
use crate::config::CommandsConfig;

/// What a message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollCommand {
    /// Roll dice. Carries the full message text, command token included.
    Roll(String),
    /// Send usage help privately.
    Help,
    /// Not for us.
    Ignore,
}

/// Kinds of command a token can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Roll,
    Help,
}

/// Command tokens, matched longest first.
///
/// `!rollhelp` starts with `!roll`, so a shorter token must never be tried
/// before a longer one it prefixes.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<(String, CommandKind)>,
}

impl CommandTable {
    pub fn new(entries: impl IntoIterator<Item = (String, CommandKind)>) -> Self {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Self { entries }
    }

    pub fn from_config(config: &CommandsConfig) -> Self {
        Self::new([
            (config.roll.clone(), CommandKind::Roll),
            (config.help.clone(), CommandKind::Help),
        ])
    }

    /// Token configured for `kind`.
    pub fn token(&self, kind: CommandKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(token, _)| token.as_str())
    }

    /// Classify a message.
    pub fn route(&self, msg: &InboundMessage) -> RollCommand {
        // Never react to our own output
        if msg.is_self {
            return RollCommand::Ignore;
        }

        let kind = self
            .entries
            .iter()
            .find(|(token, _)| msg.content.starts_with(token.as_str()))
            .map(|(_, kind)| *kind);

        match kind {
            Some(CommandKind::Help) => RollCommand::Help,
            Some(CommandKind::Roll) => {
                debug!("Roll command from {}: {}", msg.author_id, msg.content);
                RollCommand::Roll(msg.content.clone())
            }
            None => RollCommand::Ignore,
        }
    }

    /// Usage text sent in reply to the help command.
    pub fn help_text(&self) -> String {
        let roll = self.token(CommandKind::Roll).unwrap_or_default();
        let help = self.token(CommandKind::Help).unwrap_or_default();

        format!(
            r#"**Dice Roller**
• `{roll} <dice> [reason]` - Roll dice, e.g. `{roll} 2d6+1 fireball`
• `{help}` - Show this help message

**Dice syntax**
• `NdS` - Roll N dice with S sides (`d20`, `3d6`, `d%` for d100)
• `NdF` - Fudge dice (-1, 0, +1)
• `+ 3`, `- 1d4` - Add or subtract constants and other dice
• `k3` / `kh3` - Keep the 3 highest, `kl1` keeps the lowest
• `d1` / `dl1` - Drop the lowest, `dh1` drops the highest
• `!` - Exploding dice, e.g. `3d6!`

Rolls in server channels replace your command with the result."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CommandTable {
        CommandTable::from_config(&CommandsConfig::default())
    }

    fn message(content: &str) -> InboundMessage {
        InboundMessage {
            id: 1,
            author_id: 42,
            channel_id: 100,
            content: content.to_string(),
            is_self: false,
        }
    }

    #[test]
    fn test_roll_forwards_full_text() {
        assert_eq!(
            table().route(&message("!roll 2d6+1")),
            RollCommand::Roll("!roll 2d6+1".to_string())
        );
    }

    #[test]
    fn test_help_wins_over_roll_prefix() {
        assert_eq!(table().route(&message("!rollhelp")), RollCommand::Help);
        assert_eq!(table().route(&message("!rollhelp please")), RollCommand::Help);
    }

    #[test]
    fn test_longest_token_first_regardless_of_order() {
        let table = CommandTable::new([
            ("!r".to_string(), CommandKind::Roll),
            ("!rh".to_string(), CommandKind::Help),
        ]);
        assert_eq!(table.route(&message("!rh")), RollCommand::Help);

        let table = CommandTable::new([
            ("!rh".to_string(), CommandKind::Help),
            ("!r".to_string(), CommandKind::Roll),
        ]);
        assert_eq!(table.route(&message("!rh")), RollCommand::Help);
        assert_eq!(
            table.route(&message("!r d6")),
            RollCommand::Roll("!r d6".to_string())
        );
    }

    #[test]
    fn test_self_authored_is_ignored() {
        let mut msg = message("!roll 1d20");
        msg.is_self = true;
        assert_eq!(table().route(&msg), RollCommand::Ignore);

        msg.content = "!rollhelp".to_string();
        assert_eq!(table().route(&msg), RollCommand::Ignore);
    }

    #[test]
    fn test_other_text_is_ignored() {
        assert_eq!(table().route(&message("hello")), RollCommand::Ignore);
        assert_eq!(table().route(&message(" !roll 1d6")), RollCommand::Ignore);
        assert_eq!(table().route(&message("!ROLL 1d6")), RollCommand::Ignore);
        assert_eq!(table().route(&message("")), RollCommand::Ignore);
    }

    #[test]
    fn test_help_text_uses_configured_tokens() {
        let table = CommandTable::new([
            ("/r".to_string(), CommandKind::Roll),
            ("/rhelp".to_string(), CommandKind::Help),
        ]);
        let help = table.help_text();
        assert!(help.contains("`/r <dice> [reason]`"));
        assert!(help.contains("`/rhelp`"));
    }
}
