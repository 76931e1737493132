//! Chat completions over the OpenAI wire format, direct or via Azure.

use std::time::Duration;

use carebot_core::provider::{ChatProvider, ChatRequest, ProviderError};
use serde_json::json;

use crate::{
  config::{ChatConfig, ChatFlavor, resolve_api_key},
  http::{client, join_url, send_json},
};

pub struct OpenAiChat {
  client:  reqwest::Client,
  flavor:  ChatFlavor,
  url:     String,
  model:   String,
  api_key: String,
  timeout: Duration,
}

/// The completions URL for `config`. Azure addresses a deployment and pins
/// an API version; OpenAI names the model in the body instead.
pub(crate) fn completions_url(config: &ChatConfig) -> String {
  match config.flavor {
    ChatFlavor::Openai => join_url(&config.endpoint, "v1/chat/completions"),
    ChatFlavor::Azure => format!(
      "{}?api-version={}",
      join_url(
        &config.endpoint,
        &format!("openai/deployments/{}/chat/completions", config.model)
      ),
      config.api_version
    ),
  }
}

/// Extract `choices[0].message.content`.
pub(crate) fn parse_completion(json: &serde_json::Value) -> Result<String, ProviderError> {
  json
    .get("choices")
    .and_then(|c| c.get(0))
    .and_then(|c| c.get("message"))
    .and_then(|m| m.get("content"))
    .and_then(|c| c.as_str())
    .map(str::to_owned)
    .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".into()))
}

impl OpenAiChat {
  pub fn new(config: &ChatConfig) -> Result<Self, ProviderError> {
    let fallback_env = match config.flavor {
      ChatFlavor::Openai => "OPENAI_API_KEY",
      ChatFlavor::Azure => "AZURE_OPENAI_API_KEY",
    };
    let timeout = Duration::from_secs(config.timeout_secs);
    let chat = Self {
      client: client(timeout)?,
      flavor: config.flavor,
      url: completions_url(config),
      model: config.model.clone(),
      api_key: resolve_api_key(
        config.api_key.as_deref(),
        config.api_key_env.as_deref(),
        fallback_env,
      )?,
      timeout,
    };
    tracing::info!(flavor = ?chat.flavor, model = %chat.model, "chat provider ready");
    Ok(chat)
  }
}

impl ChatProvider for OpenAiChat {
  async fn complete<'a>(&'a self, request: &'a ChatRequest) -> Result<String, ProviderError> {
    let mut body = json!({
      "messages": request.messages,
      "max_tokens": request.max_tokens,
      "temperature": request.temperature,
    });
    let req = match self.flavor {
      ChatFlavor::Openai => {
        body["model"] = json!(self.model);
        self.client.post(&self.url).bearer_auth(&self.api_key)
      }
      ChatFlavor::Azure => self.client.post(&self.url).header("api-key", &self.api_key),
    };

    let reply = send_json(req.json(&body), self.timeout).await?;
    let text = parse_completion(&reply)?;
    tracing::debug!(chars = text.len(), "completion received");
    Ok(text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn openai_url() {
    let c = ChatConfig::default();
    assert_eq!(completions_url(&c), "https://api.openai.com/v1/chat/completions");
  }

  #[test]
  fn azure_url_names_deployment_and_version() {
    let c = ChatConfig {
      flavor: ChatFlavor::Azure,
      endpoint: "https://example.cognitiveservices.azure.com/".into(),
      model: "gpt-4".into(),
      ..ChatConfig::default()
    };
    assert_eq!(
      completions_url(&c),
      "https://example.cognitiveservices.azure.com/openai/deployments/gpt-4/chat/completions\
       ?api-version=2024-08-01-preview"
    );
  }

  #[test]
  fn parses_first_choice() {
    let body = json!({
      "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Drink water." } }]
    });
    assert_eq!(parse_completion(&body).unwrap(), "Drink water.");
  }

  #[test]
  fn null_content_is_malformed() {
    let body = json!({ "choices": [{ "message": { "role": "assistant", "content": null } }] });
    assert!(matches!(parse_completion(&body), Err(ProviderError::Malformed(_))));
  }

  #[test]
  fn explicit_key_builds_client() {
    let c = ChatConfig { api_key: Some("sk-test".into()), ..ChatConfig::default() };
    assert!(OpenAiChat::new(&c).is_ok());
  }
}
