//! Async HTTP client wrapping the carebot JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use carebot_core::provider::Message;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Connection settings for the carebot API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// A topic as listed by `GET /api/topics`.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicInfo {
  pub id:        String,
  pub title:     String,
  pub retrieval: bool,
}

#[derive(Serialize)]
struct SendBody<'a> {
  user:     &'a str,
  text:     &'a str,
  remember: bool,
}

#[derive(Deserialize)]
struct SendResponse {
  reply: String,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the carebot JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    // Replies may take several provider retries.
    let client = Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// `GET /api/topics`
  pub async fn topics(&self) -> Result<Vec<TopicInfo>> {
    let resp = self
      .auth(self.client.get(self.url("/topics")))
      .send()
      .await
      .context("GET /topics failed")?;
    check(resp, "GET /topics")
      .await?
      .json()
      .await
      .context("deserialising topics")
  }

  /// `POST /api/chat/{topic}`. `None` when the server had nothing to say,
  /// i.e. the text was blank.
  pub async fn send(
    &self,
    topic: &str,
    user: &str,
    text: &str,
    remember: bool,
  ) -> Result<Option<String>> {
    let resp = self
      .auth(self.client.post(self.url(&format!("/chat/{topic}"))))
      .json(&SendBody { user, text, remember })
      .send()
      .await
      .with_context(|| format!("POST /chat/{topic} failed"))?;
    if resp.status() == StatusCode::NO_CONTENT {
      return Ok(None);
    }
    let body: SendResponse = check(resp, "POST /chat")
      .await?
      .json()
      .await
      .context("deserialising reply")?;
    Ok(Some(body.reply))
  }

  /// `GET /api/chat/{topic}/history`
  pub async fn history(&self, topic: &str) -> Result<Vec<Message>> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/chat/{topic}/history"))))
      .send()
      .await
      .with_context(|| format!("GET /chat/{topic}/history failed"))?;
    check(resp, "GET /chat/history")
      .await?
      .json()
      .await
      .context("deserialising history")
  }

  /// `DELETE /api/chat/{topic}`
  pub async fn clear(&self, topic: &str) -> Result<()> {
    let resp = self
      .auth(self.client.delete(self.url(&format!("/chat/{topic}"))))
      .send()
      .await
      .with_context(|| format!("DELETE /chat/{topic} failed"))?;
    check(resp, "DELETE /chat").await?;
    Ok(())
  }
}

/// Pass successful responses through; turn anything else into an error
/// carrying the server's `{"error": ..}` message when there is one.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<ErrorBody>()
    .await
    .map(|b| b.error)
    .unwrap_or_else(|_| status.to_string());
  Err(anyhow!("{what} → {status}: {message}"))
}
