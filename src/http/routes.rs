//! API routing.
//!
//! | method | path | body / query |
//! |---|---|---|
//! | GET | `/` | health |
//! | GET | `/metrics` | counters |
//! | GET | `/user/<id>`, `/user?user_id=` | |
//! | POST | `/action` | `{user_id, action}` |
//! | POST | `/battle/start` | `{user_id, boss_id}` |
//! | POST | `/battle/turn` | `{user_id, move_id}` |
//! | POST | `/battle/flee` | `{user_id}` |
//! | POST | `/battle/end` | `{user_id}` |
//! | GET | `/battle/config` | |
//! | POST | `/webhook/<token>` | bot update |
//! | OPTIONS | any | CORS preflight |
//!
//! Any other `GET` is looked up in the static directory.

use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use super::request::Request;
use super::response::Response;
use super::static_files;
use crate::bot::{BotHandler, Update};
use crate::game::GameError;
use crate::logutil::escape_log;
use crate::service::GameService;
use crate::validation::{secure_json_parse, ValidationError};

/// Player ids arrive as strings from the web client and as integers from chat platforms.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(s) => s,
            IdValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiBody {
    #[serde(default)]
    user_id: Option<IdValue>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    boss_id: Option<String>,
    #[serde(default)]
    move_id: Option<String>,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, GameError> {
    value.ok_or(GameError::Validation(ValidationError::Missing { field }))
}

impl ApiBody {
    fn user_id(&mut self) -> Result<String, GameError> {
        required(self.user_id.take(), "user_id").map(IdValue::into_string)
    }
}

pub struct Router {
    service: Arc<GameService>,
    static_dir: PathBuf,
    bot: Option<BotHandler>,
    max_body: usize,
}

impl Router {
    pub fn new(service: Arc<GameService>, static_dir: impl Into<PathBuf>, max_body: usize) -> Self {
        Router {
            service,
            static_dir: static_dir.into(),
            bot: None,
            max_body,
        }
    }

    pub fn with_bot(mut self, bot: BotHandler) -> Self {
        self.bot = Some(bot);
        self
    }

    pub fn max_body(&self) -> usize {
        self.max_body
    }

    pub fn service(&self) -> &GameService {
        &self.service
    }

    /// Route one request, count it, and log the outcome.
    pub async fn handle(&self, req: Request) -> Response {
        let metrics = self.service.metrics();
        metrics.inc_http_request();
        let resp = self.dispatch(&req).await;
        if resp.status >= 400 {
            metrics.inc_http_error();
        }
        log::debug!("{} {} -> {}", req.method, escape_log(&req.path), resp.status);
        resp
    }

    async fn dispatch(&self, req: &Request) -> Response {
        if req.method == "OPTIONS" {
            return Response::empty(204)
                .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
                .with_header("Access-Control-Allow-Headers", "Content-Type");
        }
        let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();
        let method = req.method.as_str();

        let result = match (method, segments.as_slice()) {
            ("GET", [""]) => Ok(Response::json(
                200,
                &json!({ "status": "ok", "message": "bomzh server is running" }),
            )),
            ("GET", ["metrics"]) => Ok(self.metrics().await),
            ("GET", ["user"]) => self.get_user(req.query_param("user_id").unwrap_or("")).await,
            ("GET", ["user", id]) => self.get_user(id).await,
            ("GET", ["battle", "config"]) => Ok(Response::json_of(200, self.service.catalog())),
            ("POST", ["action"]) => self.action(req).await,
            ("POST", ["battle", "start"]) => self.battle_start(req).await,
            ("POST", ["battle", "turn"]) => self.battle_turn(req).await,
            ("POST", ["battle", "flee"]) => self.battle_flee(req).await,
            ("POST", ["battle", "end"]) => self.battle_end(req).await,
            ("POST", ["webhook", token]) => Ok(self.webhook(token, req).await),
            ("GET", _) => Ok(static_files::serve(&self.static_dir, &req.path).await),
            (_, ["user", ..] | ["action"] | ["battle", ..] | ["metrics"] | ["webhook", ..]) => Ok(
                Response::error(405, "method_not_allowed", "method not allowed"),
            ),
            _ => Ok(Response::error(404, "not_found", "not found")),
        };

        result.unwrap_or_else(|e| {
            if e.is_internal() {
                log::error!("{} {} failed: {}", req.method, escape_log(&req.path), e);
            }
            Response::from_game_error(&e)
        })
    }

    fn body(&self, req: &Request) -> Result<ApiBody, GameError> {
        Ok(secure_json_parse(&req.body, self.max_body)?)
    }

    async fn metrics(&self) -> Response {
        Response::json(
            200,
            &json!({
                "metrics": self.service.metrics().snapshot(),
                "players": self.service.player_count().await,
            }),
        )
    }

    async fn get_user(&self, user_id: &str) -> Result<Response, GameError> {
        let user = self.service.get_player(user_id).await?;
        Ok(Response::json(200, &json!({ "user": user })))
    }

    async fn action(&self, req: &Request) -> Result<Response, GameError> {
        let mut body = self.body(req)?;
        let user_id = body.user_id()?;
        let action = required(body.action, "action")?;
        let outcome = self.service.perform_action(&user_id, &action).await?;
        Ok(Response::json(
            200,
            &json!({ "user": outcome.user, "action": outcome.action, "reward": outcome.reward }),
        ))
    }

    async fn battle_start(&self, req: &Request) -> Result<Response, GameError> {
        let mut body = self.body(req)?;
        let user_id = body.user_id()?;
        let boss_id = required(body.boss_id, "boss_id")?;
        let outcome = self.service.start_battle(&user_id, &boss_id).await?;
        Ok(Response::json(
            200,
            &json!({ "battle": outcome.battle, "user": outcome.user }),
        ))
    }

    async fn battle_turn(&self, req: &Request) -> Result<Response, GameError> {
        let mut body = self.body(req)?;
        let user_id = body.user_id()?;
        let move_id = required(body.move_id, "move_id")?;
        let outcome = self.service.take_turn(&user_id, &move_id).await?;
        Ok(turn_response(outcome))
    }

    async fn battle_flee(&self, req: &Request) -> Result<Response, GameError> {
        let user_id = self.body(req)?.user_id()?;
        Ok(turn_response(self.service.flee(&user_id).await?))
    }

    async fn battle_end(&self, req: &Request) -> Result<Response, GameError> {
        let user_id = self.body(req)?.user_id()?;
        let outcome = self.service.end_battle(&user_id).await?;
        Ok(Response::json(
            200,
            &json!({
                "loot": outcome.loot,
                "player_won": outcome.player_won,
                "boss_id": outcome.boss_id,
                "user": outcome.user,
            }),
        ))
    }

    async fn webhook(&self, token: &str, req: &Request) -> Response {
        let bot = match self.bot.as_ref() {
            Some(bot) if bot.token_matches(token) => bot,
            Some(_) => {
                log::warn!("webhook call with wrong token");
                return Response::error(403, "forbidden", "forbidden");
            }
            None => return Response::error(404, "not_found", "not found"),
        };
        if !req.is_json() {
            log::warn!(
                "webhook call with content-type {:?}",
                req.header("content-type").unwrap_or("<none>")
            );
            return Response::error(403, "forbidden", "forbidden");
        }
        let update: Update = match secure_json_parse(&req.body, self.max_body) {
            Ok(u) => u,
            Err(e) => {
                log::warn!("bad webhook payload: {}", e);
                return Response::error(400, "validation_error", &e.to_string());
            }
        };
        match bot.handle_update(&self.service, update).await {
            Some(reply) => Response::json_of(200, &reply),
            None => Response::empty(200),
        }
    }
}

fn turn_response(outcome: crate::service::TurnOutcome) -> Response {
    Response::json(
        200,
        &json!({
            "battle": outcome.battle,
            "finished": outcome.report.finished,
            "player_won": outcome.report.player_won,
            "turn": outcome.report.turn,
            "log": outcome.report.lines,
            "user": outcome.user,
        }),
    )
}
