//! REPL state and command dispatch.

use std::{fmt::Write as _, sync::Arc};

use carebot_core::provider::Role;

use crate::client::{ApiClient, TopicInfo};

pub const DEFAULT_TOPIC: &str = "general_conversation";

pub const HELP: &str = "\
/topics          list topics
/topic <id>      switch topic
/history         show this topic's conversation
/clear           forget this topic's conversation
/remember        toggle saving exchanges to your past prompts
/quit            exit
anything else is sent to the assistant";

// ─── Input ────────────────────────────────────────────────────────────────────

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
  Empty,
  Say(&'a str),
  Topics,
  Topic(&'a str),
  History,
  Clear,
  Remember,
  Help,
  Quit,
  Unknown(&'a str),
}

impl<'a> Input<'a> {
  pub fn parse(line: &'a str) -> Self {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
      return if line.is_empty() { Input::Empty } else { Input::Say(line) };
    };
    let (name, arg) = command
      .split_once(char::is_whitespace)
      .map_or((command, ""), |(n, a)| (n, a.trim()));
    match (name, arg) {
      ("topics", _) => Input::Topics,
      ("topic", id) if !id.is_empty() => Input::Topic(id),
      ("history", _) => Input::History,
      ("clear", _) => Input::Clear,
      ("remember", _) => Input::Remember,
      ("help" | "?", _) => Input::Help,
      ("quit" | "exit" | "q", _) => Input::Quit,
      _ => Input::Unknown(line),
    }
  }
}

/// One line per topic; the current one is starred and topics that read
/// the patient's records are flagged.
pub fn format_topics(topics: &[TopicInfo], current: &str) -> String {
  let mut out = String::new();
  for t in topics {
    let marker = if t.id == current { '*' } else { ' ' };
    let records = if t.retrieval { "  (uses your records)" } else { "" };
    let _ = writeln!(out, "{marker} {:<26} {}{records}", t.id, t.title);
  }
  out.trim_end().to_owned()
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level REPL state.
pub struct App {
  /// Patient id sent with every chat turn.
  pub user:     String,
  /// Topic new messages go to.
  pub topic:    String,
  /// Whether exchanges are stored as past prompts.
  pub remember: bool,
  pub client:   Arc<ApiClient>,
}

impl App {
  pub fn new(client: ApiClient, user: String, topic: String) -> Self {
    Self { user, topic, remember: false, client: Arc::new(client) }
  }

  pub fn prompt(&self) -> String { format!("[{}] > ", self.topic) }

  /// Handle one input line, returning the text to print. `None` means quit.
  ///
  /// Request failures are reported as output; the session continues.
  pub async fn handle(&mut self, line: &str) -> Option<String> {
    let out = match Input::parse(line) {
      Input::Quit => return None,
      Input::Empty => String::new(),
      Input::Help => HELP.to_owned(),
      Input::Unknown(cmd) => format!("unknown command {cmd:?}, try /help"),
      Input::Remember => {
        self.remember = !self.remember;
        format!("remember: {}", if self.remember { "on" } else { "off" })
      }
      Input::Topics => match self.client.topics().await {
        Ok(topics) => format_topics(&topics, &self.topic),
        Err(e) => format!("error: {e:#}"),
      },
      Input::Topic(id) => match self.client.topics().await {
        Ok(topics) if topics.iter().any(|t| t.id == id) => {
          self.topic = id.to_owned();
          format!("switched to {id}")
        }
        Ok(_) => format!("no such topic {id:?}, see /topics"),
        Err(e) => format!("error: {e:#}"),
      },
      Input::History => match self.client.history(&self.topic).await {
        Ok(messages) if messages.is_empty() => "(no messages yet)".to_owned(),
        Ok(messages) => messages
          .iter()
          .map(|m| {
            let who = match m.role {
              Role::User => "you",
              Role::Assistant => "carebot",
              Role::System => "system",
            };
            format!("{who}: {}", m.content)
          })
          .collect::<Vec<_>>()
          .join("\n"),
        Err(e) => format!("error: {e:#}"),
      },
      Input::Clear => match self.client.clear(&self.topic).await {
        Ok(()) => format!("cleared {}", self.topic),
        Err(e) => format!("error: {e:#}"),
      },
      Input::Say(text) => {
        tracing::debug!(topic = %self.topic, "sending message");
        match self
          .client
          .send(&self.topic, &self.user, text, self.remember)
          .await
        {
          Ok(Some(reply)) => format!("carebot: {reply}"),
          Ok(None) => String::new(),
          Err(e) => format!("error: {e:#}"),
        }
      }
    };
    Some(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use crate::client::ApiConfig;

  fn app() -> App {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://127.0.0.1:9".into(),
      username: String::new(),
      password: String::new(),
    })
    .unwrap();
    App::new(client, "129".into(), DEFAULT_TOPIC.into())
  }

  #[test]
  fn parse_plain_text() {
    assert_eq!(Input::parse("  I have a headache \n"), Input::Say("I have a headache"));
    assert_eq!(Input::parse("   "), Input::Empty);
  }

  #[test]
  fn parse_commands() {
    assert_eq!(Input::parse("/topics"), Input::Topics);
    assert_eq!(Input::parse("/topic  symptom_checker "), Input::Topic("symptom_checker"));
    assert_eq!(Input::parse("/history"), Input::History);
    assert_eq!(Input::parse("/clear"), Input::Clear);
    assert_eq!(Input::parse("/q"), Input::Quit);
    assert_eq!(Input::parse("/?"), Input::Help);
  }

  #[test]
  fn topic_without_id_is_unknown() {
    assert_eq!(Input::parse("/topic"), Input::Unknown("/topic"));
    assert_eq!(Input::parse("/dance"), Input::Unknown("/dance"));
  }

  #[test]
  fn topic_listing_marks_current_and_retrieval() {
    let topics = [
      TopicInfo { id: "symptom_checker".into(), title: "Symptom Checker".into(), retrieval: true },
      TopicInfo { id: "general_conversation".into(), title: "General Conversation".into(), retrieval: false },
    ];
    let out = format_topics(&topics, "general_conversation");
    let lines: Vec<_> = out.lines().collect();
    assert!(lines[0].starts_with("  symptom_checker"));
    assert!(lines[0].ends_with("Symptom Checker  (uses your records)"));
    assert!(lines[1].starts_with("* general_conversation"));
    assert!(lines[1].ends_with("General Conversation"));
  }

  #[tokio::test]
  async fn local_commands_need_no_server() {
    let mut app = app();
    assert_eq!(app.handle("/quit").await, None);
    assert_eq!(app.handle("/remember").await.as_deref(), Some("remember: on"));
    assert!(app.remember);
    assert_eq!(app.handle("").await.as_deref(), Some(""));
    assert_eq!(app.prompt(), "[general_conversation] > ");
  }

  #[tokio::test]
  async fn request_failure_is_reported_not_fatal() {
    let mut app = app();
    let out = app.handle("/history").await.unwrap();
    assert!(out.starts_with("error: "), "{out}");
    assert_eq!(app.topic, DEFAULT_TOPIC);
  }
}
