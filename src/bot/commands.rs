//! Slash-command parser for chat messages.
//!
//! Only messages starting with `/` are commands; everything else is ignored so the bot
//! stays quiet in normal conversation. A `@botname` suffix on the command is accepted.
use log::trace;

use crate::game::ActionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Stats,
    Help,
    Bosses,
    Fight(Option<String>),
    Hit(Option<String>),
    Flee,
    Loot,
    Action(ActionKind),
    Unknown(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BotCommandParser;

impl BotCommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a message. `None` when the text is not a command at all.
    pub fn parse(&self, raw: &str) -> Option<BotCommand> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix('/')?;
        let mut words = body.split_whitespace();
        let head = words.next().unwrap_or("");
        let name = head.split('@').next().unwrap_or("").to_ascii_lowercase();
        let arg = words.next().map(|w| w.to_ascii_lowercase());

        let cmd = match name.as_str() {
            "start" => BotCommand::Start,
            "stats" | "me" => BotCommand::Stats,
            "help" => BotCommand::Help,
            "bosses" => BotCommand::Bosses,
            "fight" => BotCommand::Fight(arg),
            "hit" | "attack" => BotCommand::Hit(arg),
            "flee" => BotCommand::Flee,
            "loot" => BotCommand::Loot,
            "dig" => BotCommand::Action(ActionKind::DigTrash),
            "bottles" => BotCommand::Action(ActionKind::CollectBottles),
            "train" => BotCommand::Action(ActionKind::TrainStrength),
            _ => BotCommand::Unknown(name),
        };
        trace!("Parsed {:?} from '{}'", cmd, crate::logutil::escape_log(raw));
        Some(cmd)
    }
}
