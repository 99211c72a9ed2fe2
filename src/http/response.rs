use serde::Serialize;
use serde_json::{json, Value};

use crate::game::GameError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

pub fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "Unknown",
    }
}

/// HTTP status for a game error.
pub fn status_for(err: &GameError) -> u16 {
    match err {
        GameError::Validation(_)
        | GameError::InsufficientEnergy { .. }
        | GameError::UnknownAction(_) => 400,
        GameError::UnknownMove(_) | GameError::UnknownBoss(_) => 404,
        GameError::AlreadyActive | GameError::NotActive | GameError::NotFinished => 409,
        GameError::Storage(_) | GameError::Serialization(_) => 500,
    }
}

impl Response {
    pub fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Response {
            status,
            content_type: content_type.to_string(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self::bytes(status, "application/json", value.to_string().into_bytes())
    }

    /// Serialize any value; a serialization failure becomes a 500.
    pub fn json_of<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::bytes(status, "application/json", body),
            Err(e) => {
                log::error!("response serialization failed: {}", e);
                Self::error(500, "server_error", "internal server error")
            }
        }
    }

    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::json(status, &json!({ "error": message, "code": code }))
    }

    /// Map a game error to a JSON error body. Internal details stay in the log.
    pub fn from_game_error(err: &GameError) -> Self {
        let status = status_for(err);
        if err.is_internal() {
            return Self::error(status, err.code(), "internal server error");
        }
        Self::error(status, err.code(), &err.to_string())
    }

    pub fn empty(status: u16) -> Self {
        Self::bytes(status, "text/plain; charset=utf-8", Vec::new())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Serialize status line, headers (always with CORS and `Connection: close`) and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}
