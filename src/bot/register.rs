//! Webhook registration with the bot API (`setWebhook`), done once at server start.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::BotConfig;

/// Full webhook address announced to the bot API.
pub fn webhook_address(public_base: &str, token: &str) -> String {
    format!("{}/webhook/{}", public_base.trim().trim_end_matches('/'), token)
}

/// Point the bot API at this server's webhook. Returns the registered address.
pub async fn register_webhook(client: &reqwest::Client, bot: &BotConfig) -> Result<String> {
    let address = webhook_address(&bot.webhook_url, &bot.token);
    let endpoint = format!(
        "{}/bot{}/setWebhook",
        bot.api_base.trim_end_matches('/'),
        bot.token
    );
    let request = client.post(&endpoint).json(&json!({ "url": address }));
    let response = timeout(Duration::from_secs(bot.api_timeout_secs), request.send())
        .await
        .map_err(|_| anyhow!("setWebhook timed out after {}s", bot.api_timeout_secs))?
        .map_err(|e| anyhow!("setWebhook request failed: {}", e.without_url()))?;

    if !response.status().is_success() {
        return Err(anyhow!("setWebhook returned status {}", response.status()));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| anyhow!("setWebhook sent an unreadable reply: {}", e.without_url()))?;
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        let reason = body
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description");
        return Err(anyhow!("setWebhook rejected: {}", reason));
    }
    log::info!(
        "webhook registered at {}/webhook/<token>",
        bot.webhook_url.trim().trim_end_matches('/')
    );
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn address_joins_base_and_token() {
        assert_eq!(
            webhook_address("https://bomzh.example/ ", "1:x"),
            "https://bomzh.example/webhook/1:x"
        );
        assert_eq!(
            webhook_address("https://bomzh.example", "1:x"),
            "https://bomzh.example/webhook/1:x"
        );
    }

    /// One-shot fake bot API: answers a single request and hands back what it received.
    async fn fake_api(status: &'static str, reply: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reply.len(),
                reply
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (base, handle)
    }

    fn bot_config(api_base: String) -> BotConfig {
        BotConfig {
            enabled: true,
            token: "123:abc".into(),
            webhook_url: "https://bomzh.example/".into(),
            api_base,
            api_timeout_secs: 5,
            ..BotConfig::default()
        }
    }

    #[tokio::test]
    async fn registers_the_webhook_address() {
        let (base, api) = fake_api("200 OK", r#"{"ok":true,"result":true}"#).await;
        let client = reqwest::Client::new();
        let address = register_webhook(&client, &bot_config(base)).await.unwrap();
        assert_eq!(address, "https://bomzh.example/webhook/123:abc");

        let seen = api.await.unwrap();
        assert!(seen.starts_with("POST /bot123:abc/setWebhook HTTP/1.1"), "{}", seen);
        let body = &seen[seen.find("\r\n\r\n").unwrap() + 4..];
        let sent: Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent["url"], "https://bomzh.example/webhook/123:abc");
    }

    #[tokio::test]
    async fn api_refusals_are_errors() {
        let (base, api) = fake_api("200 OK", r#"{"ok":false,"description":"bad webhook"}"#).await;
        let client = reqwest::Client::new();
        let err = register_webhook(&client, &bot_config(base)).await.unwrap_err();
        assert!(err.to_string().contains("bad webhook"));
        api.await.unwrap();

        let (base, api) = fake_api("401 Unauthorized", r#"{"ok":false}"#).await;
        let err = register_webhook(&client, &bot_config(base)).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(!err.to_string().contains("123:abc"));
        api.await.unwrap();
    }
}
