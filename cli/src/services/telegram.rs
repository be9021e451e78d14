use crate::{
    config::Settings,
    error::{AppError, Result},
    services::http::{build_client, send_once},
    utils::Logger,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const MAX_MESSAGE_LEN: usize = 4096;

/// Telegram Bot API notifier. Without a token and chat id every send is a no-op.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    credentials: Option<(String, String)>,
    warned_disabled: AtomicBool,
    logger: Logger,
}

impl TelegramNotifier {
    pub fn new(settings: &Settings) -> Result<Self> {
        let credentials = match (&settings.telegram_bot_token, &settings.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some((token.clone(), chat_id.clone())),
            _ => None,
        };
        Ok(Self {
            client: build_client(Duration::from_secs(60))?,
            api_url: TELEGRAM_API_URL.to_string(),
            credentials,
            warned_disabled: AtomicBool::new(false),
            logger: Logger::new("TELEGRAM"),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send a plain text message. Returns `false` when notifications are disabled.
    /// Sent once: a failed response may still have been delivered.
    pub async fn send_message(&self, text: &str) -> Result<bool> {
        let Some((token, chat_id)) = self.active_credentials() else {
            return Ok(false);
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let text = truncate_message(text);
        let request = self
            .client
            .post(&url)
            .form(&[("chat_id", chat_id), ("text", text.as_str())]);
        let response = send_once(request)
            .await
            .map_err(|e| AppError::Notification(format!("sendMessage failed: {}", e)))?;

        check_response(response.json().await?)?;
        self.logger.debug("Message delivered");
        Ok(true)
    }

    /// Upload `path` as a document with an optional caption
    pub async fn send_document(&self, path: &Path, caption: Option<&str>) -> Result<bool> {
        let Some((token, chat_id)) = self.active_credentials() else {
            return Ok(false);
        };

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let url = format!("{}/bot{}/sendDocument", self.api_url, token);
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name.clone()));
        if let Some(caption) = caption {
            form = form.text("caption", truncate_message(caption));
        }
        let response = send_once(self.client.post(&url).multipart(form))
            .await
            .map_err(|e| AppError::Notification(format!("sendDocument failed: {}", e)))?;

        check_response(response.json().await?)?;
        self.logger.info(&format!("Uploaded {}", file_name));
        Ok(true)
    }

    fn active_credentials(&self) -> Option<(&str, &str)> {
        match &self.credentials {
            Some((token, chat_id)) => Some((token.as_str(), chat_id.as_str())),
            None => {
                if !self.warned_disabled.swap(true, Ordering::Relaxed) {
                    self.logger
                        .warn("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing, notifications disabled");
                }
                None
            }
        }
    }
}

fn check_response(body: Value) -> Result<()> {
    if body.get("ok").and_then(|ok| ok.as_bool()) == Some(true) {
        return Ok(());
    }
    let description = body
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or("unknown error");
    Err(AppError::Notification(description.to_string()))
}

fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    text.chars().take(MAX_MESSAGE_LEN - 1).chain(std::iter::once('…')).collect()
}
