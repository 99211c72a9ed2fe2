//! Chat bot front end.
//!
//! Updates arrive on `POST /webhook/<token>` and the reply is returned inline as a
//! `sendMessage` method body. The only outbound call is the `setWebhook`
//! registration at startup (see [`register`]).

pub mod commands;
pub mod register;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::game::{ActionKind, GameError, PlayerRecord};
use crate::logutil::escape_log;
use crate::service::{GameService, LootOutcome, TurnOutcome};
use commands::{BotCommand, BotCommandParser};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<Sender>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Sender {
    pub id: i64,
}

/// Inline webhook reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessage {
    pub method: &'static str,
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
}

impl SendMessage {
    fn new(chat_id: i64, text: String) -> Self {
        SendMessage {
            method: "sendMessage",
            chat_id,
            text,
            reply_markup: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotHandler {
    token: String,
    webapp_url: String,
    parser: BotCommandParser,
}

impl BotHandler {
    pub fn new(token: &str, webapp_url: &str) -> Self {
        BotHandler {
            token: token.to_string(),
            webapp_url: webapp_url.to_string(),
            parser: BotCommandParser::new(),
        }
    }

    pub fn token_matches(&self, candidate: &str) -> bool {
        !self.token.is_empty() && self.token == candidate
    }

    /// Handle one update. `None` when there is nothing to say.
    pub async fn handle_update(&self, service: &GameService, update: Update) -> Option<SendMessage> {
        service.metrics().inc_bot_update();
        let message = update.message?;
        let text = message.text.as_deref()?;
        let command = self.parser.parse(text)?;
        let chat_id = message.chat.id;
        let user_id = message.from.map(|f| f.id).unwrap_or(chat_id).to_string();
        log::debug!(
            "bot update {} from {}: {}",
            update.update_id,
            user_id,
            escape_log(text)
        );

        let reply = match self.run(service, &user_id, command).await {
            Ok(reply) => reply,
            Err(e) => SendMessage::new(chat_id, describe_error(&e)),
        };
        Some(SendMessage { chat_id, ..reply })
    }

    async fn run(
        &self,
        service: &GameService,
        user_id: &str,
        command: BotCommand,
    ) -> Result<SendMessage, GameError> {
        let text = match command {
            BotCommand::Start => {
                let user = service.get_player(user_id).await?;
                let mut msg = SendMessage::new(
                    0,
                    format!(
                        "👋 Welcome to the street!\n\n📊 Level: {}\n💵 Rub: {}\n⚡ Energy: {}/{}\n\nType /help for commands.",
                        user.level, user.money_rub, user.energy, user.max_energy
                    ),
                );
                if !self.webapp_url.is_empty() {
                    msg.reply_markup = Some(json!({
                        "inline_keyboard": [[{
                            "text": "🎮 Play",
                            "web_app": { "url": self.webapp_url }
                        }]]
                    }));
                }
                return Ok(msg);
            }
            BotCommand::Stats => stats_text(&service.get_player(user_id).await?),
            BotCommand::Help => help_text(),
            BotCommand::Bosses => bosses_text(service),
            BotCommand::Fight(None) => format!("Usage: /fight <boss>\n\n{}", bosses_text(service)),
            BotCommand::Fight(Some(boss_id)) => {
                let outcome = service.start_battle(user_id, &boss_id).await?;
                let moves: Vec<&str> = service.catalog().moves().values().map(|m| m.id.as_str()).collect();
                format!(
                    "{}\n\nAttack with /hit <move>. Moves: {}",
                    outcome.battle.log.join("\n"),
                    moves.join(", ")
                )
            }
            BotCommand::Hit(None) => moves_text(service),
            BotCommand::Hit(Some(move_id)) => turn_text(&service.take_turn(user_id, &move_id).await?),
            BotCommand::Flee => turn_text(&service.flee(user_id).await?),
            BotCommand::Loot => loot_text(&service.end_battle(user_id).await?),
            BotCommand::Action(kind) => {
                let outcome = service.perform_action(user_id, kind.as_str()).await?;
                action_text(kind, &outcome.user)
            }
            BotCommand::Unknown(name) => format!("Unknown command /{}. Try /help", name),
        };
        Ok(SendMessage::new(0, text))
    }
}

fn describe_error(err: &GameError) -> String {
    if err.is_internal() {
        return "❌ Something went wrong, try again later".to_string();
    }
    match err {
        GameError::NotActive => "❌ You are not fighting anyone. Try /fight <boss>".to_string(),
        GameError::NotFinished => "❌ The fight is not over yet. Keep hitting with /hit".to_string(),
        GameError::AlreadyActive => "❌ You are already in a fight. Use /hit or /flee".to_string(),
        other => format!("❌ {}", other),
    }
}

fn stats_text(user: &PlayerRecord) -> String {
    let mut text = format!(
        "📊 Stats\n\n👤 ID: {}\n⭐ Level: {}\n✨ Exp: {}\n💵 Rub: {}\n💲 Usd: {}\n⚡ Energy: {}/{}\n💪 Strength: {}\n😔 Pity: {}\n😎 Coolness: {}",
        user.user_id,
        user.level,
        user.exp,
        user.money_rub,
        user.money_usd,
        user.energy,
        user.max_energy,
        user.strength,
        user.pity,
        user.coolness
    );
    if !user.inventory.is_empty() {
        text.push_str(&format!("\n🎒 Items: {}", user.inventory.join(", ")));
    }
    if let Some(b) = user.battle.as_ref() {
        let status = if b.active { "in progress" } else { "finished, /loot" };
        text.push_str(&format!("\n⚔️ Fight vs {}: {}", b.boss_name, status));
    }
    text
}

fn help_text() -> String {
    [
        "🆘 Commands:",
        "/start - start playing",
        "/stats - your stats",
        "/dig - dig through trash",
        "/bottles - collect bottles",
        "/train - train strength",
        "/bosses - list bosses",
        "/fight <boss> - start a fight",
        "/hit <move> - attack",
        "/flee - run away",
        "/loot - collect the result of a fight",
        "/help - this help",
    ]
    .join("\n")
}

fn bosses_text(service: &GameService) -> String {
    let lines: Vec<String> = service
        .catalog()
        .bosses()
        .values()
        .map(|b| {
            format!(
                "👹 {} ({}): {} HP, hits {}-{}",
                b.name, b.id, b.max_hp, b.damage_range.0, b.damage_range.1
            )
        })
        .collect();
    if lines.is_empty() {
        return "No bosses around today.".to_string();
    }
    lines.join("\n")
}

fn moves_text(service: &GameService) -> String {
    let lines: Vec<String> = service
        .catalog()
        .moves()
        .values()
        .map(|m| format!("🥊 {} ({}): {} dmg, {} energy", m.name, m.id, m.base_damage, m.energy_cost))
        .collect();
    format!("Usage: /hit <move>\n\n{}", lines.join("\n"))
}

fn turn_text(outcome: &TurnOutcome) -> String {
    let b = &outcome.battle;
    let mut text = if outcome.report.lines.is_empty() {
        "The fight is already over.".to_string()
    } else {
        outcome.report.lines.join("\n")
    };
    text.push_str(&format!(
        "\n\n❤️ You: {}/{} | 👹 {}: {}/{} | ⚡ {}",
        b.player_hp, b.player_max_hp, b.boss_name, b.boss_hp, b.boss_max_hp, outcome.user.energy
    ));
    if outcome.report.finished {
        text.push_str("\nUse /loot to wrap up.");
    }
    text
}

fn loot_text(outcome: &LootOutcome) -> String {
    if !outcome.player_won {
        return "🩹 You lick your wounds. No loot this time.".to_string();
    }
    let loot = &outcome.loot;
    let mut text = format!(
        "🏆 Loot: +{} exp, +{} rub, +{} usd",
        loot.exp, loot.rub, loot.usd
    );
    if !loot.items.is_empty() {
        text.push_str(&format!("\n🎁 Items: {}", loot.items.join(", ")));
    }
    text.push_str(&format!("\n⭐ Level {}", outcome.user.level));
    text
}

fn action_text(kind: ActionKind, user: &PlayerRecord) -> String {
    let t = kind.table();
    let headline = match kind {
        ActionKind::DigTrash => format!("🗑️ Dug through trash: +{} rub", t.money_rub),
        ActionKind::CollectBottles => format!("🍾 Collected bottles: +{} rub", t.money_rub),
        ActionKind::TrainStrength => format!("💪 Trained: +{} strength", t.strength),
    };
    format!(
        "{}, +{} exp\n⚡ Energy: {}/{}",
        headline, t.exp, user.energy, user.max_energy
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_not_leaked_to_chat() {
        let io = GameError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let text = describe_error(&io);
        assert!(!text.contains("disk"));
        assert!(describe_error(&GameError::UnknownBoss("x".into())).contains("unknown boss"));
    }

    #[test]
    fn help_lists_every_command_the_parser_knows() {
        let help = help_text();
        let parser = BotCommandParser::new();
        for line in help.lines().skip(1) {
            let cmd = line.split_whitespace().next().unwrap_or("");
            assert!(
                !matches!(parser.parse(cmd), Some(BotCommand::Unknown(_)) | None),
                "{}",
                cmd
            );
        }
    }

    #[test]
    fn token_must_match_exactly() {
        let bot = BotHandler::new("123:abc", "");
        assert!(bot.token_matches("123:abc"));
        assert!(!bot.token_matches("123:ab"));
        assert!(!BotHandler::new("", "").token_matches(""));
    }
}
