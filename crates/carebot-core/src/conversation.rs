//! Per-topic chat histories and retrieval-augmented replies.
//!
//! A [`ConversationManager`] is created once per process and shared by
//! `Arc`. Each registered [`Topic`] gets its own history and its own busy
//! lock; a topic answers one message at a time and a second message sent
//! while a reply is in flight is rejected with [`Error::TopicBusy`].

use std::{fmt::Write as _, sync::Arc};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::{
  Error, Result,
  keeper::RecordKeeper,
  provider::{ChatProvider, ChatRequest, Embedder, Message},
  record::MedicalRecord,
  retry::RetryPolicy,
  store::RecordStore,
  topic::{self, TOPICS, Topic},
};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables for reply generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversationSettings {
  /// Reply budget when the caller does not ask for one.
  pub default_max_tokens: u32,
  /// Upper bound applied to caller-supplied budgets.
  pub max_tokens_ceiling: u32,
  pub temperature:        f32,
  /// Similar records pulled into retrieval-enabled topics.
  pub retrieval_k:        usize,
  pub retry:              RetryPolicy,
}

impl Default for ConversationSettings {
  fn default() -> Self {
    Self {
      default_max_tokens: 150,
      max_tokens_ceiling: 1024,
      temperature:        0.7,
      retrieval_k:        3,
      retry:              RetryPolicy::default(),
    }
  }
}

// ─── Turn input / topic state ────────────────────────────────────────────────

/// One user message addressed to a topic.
#[derive(Debug, Clone, Copy)]
pub struct UserTurn<'a> {
  /// Whose medical records ground retrieval-enabled topics.
  pub user_id:    &'a str,
  pub text:       &'a str,
  /// Extra text appended to the topic's system prompt for this turn only.
  pub context:    Option<&'a str>,
  pub max_tokens: Option<u32>,
}

impl<'a> UserTurn<'a> {
  pub fn new(user_id: &'a str, text: &'a str) -> Self {
    Self { user_id, text, context: None, max_tokens: None }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
  Idle,
  AwaitingReply,
}

struct TopicSlot {
  topic:   &'static Topic,
  busy:    Mutex<()>,
  history: RwLock<Vec<Message>>,
}

// ─── Manager ─────────────────────────────────────────────────────────────────

pub struct ConversationManager<S, E, C> {
  keeper:   Arc<RecordKeeper<S, E>>,
  chat:     Arc<C>,
  settings: ConversationSettings,
  slots:    Vec<TopicSlot>,
}

impl<S, E, C> ConversationManager<S, E, C>
where
  S: RecordStore,
  E: Embedder,
  C: ChatProvider,
{
  /// A manager with an empty history for every registered topic.
  ///
  /// Fails with [`Error::Config`] when no reply budget fits under
  /// `max_tokens_ceiling`.
  pub fn new(
    keeper: Arc<RecordKeeper<S, E>>,
    chat: Arc<C>,
    settings: ConversationSettings,
  ) -> Result<Self> {
    if settings.max_tokens_ceiling == 0 {
      return Err(Error::Config("max_tokens_ceiling must be at least 1".into()));
    }
    let slots = TOPICS
      .iter()
      .map(|topic| TopicSlot {
        topic,
        busy: Mutex::new(()),
        history: RwLock::new(Vec::new()),
      })
      .collect();
    Ok(Self { keeper, chat, settings, slots })
  }

  pub fn keeper(&self) -> &RecordKeeper<S, E> { &self.keeper }

  /// Registered topics in display order.
  pub fn topics(&self) -> impl Iterator<Item = &'static Topic> + '_ {
    self.slots.iter().map(|s| s.topic)
  }

  fn slot(&self, topic_id: &str) -> Result<&TopicSlot> {
    self
      .slots
      .iter()
      .find(|s| s.topic.id == topic_id)
      .ok_or_else(|| Error::UnknownTopic(topic_id.to_owned()))
  }

  /// A snapshot of the topic's turns, oldest first.
  pub async fn history(&self, topic_id: &str) -> Result<Vec<Message>> {
    Ok(self.slot(topic_id)?.history.read().await.clone())
  }

  pub fn topic_state(&self, topic_id: &str) -> Result<TopicState> {
    let slot = self.slot(topic_id)?;
    Ok(match slot.busy.try_lock() {
      Ok(_) => TopicState::Idle,
      Err(_) => TopicState::AwaitingReply,
    })
  }

  /// Forget every turn of a topic. Fails while a reply is in flight.
  pub async fn clear(&self, topic_id: &str) -> Result<()> {
    let slot = self.slot(topic_id)?;
    let _guard = slot
      .busy
      .try_lock()
      .map_err(|_| Error::TopicBusy(topic_id.to_owned()))?;
    slot.history.write().await.clear();
    tracing::info!(topic = topic_id, "history cleared");
    Ok(())
  }

  /// Send `turn` to `topic_id` and return the assistant's reply.
  ///
  /// Blank input is ignored: `Ok(None)`, no provider call and no history
  /// change. On any failure the history is left exactly as it was.
  pub async fn respond(&self, topic_id: &str, turn: UserTurn<'_>) -> Result<Option<String>> {
    let slot = self.slot(topic_id)?;
    let text = turn.text.trim();
    if text.is_empty() {
      return Ok(None);
    }

    let _guard = slot
      .busy
      .try_lock()
      .map_err(|_| Error::TopicBusy(topic_id.to_owned()))?;

    let system = topic::get_prompt(topic_id, turn.context.unwrap_or_default())?;
    let mut messages = vec![Message::system(system)];
    messages.extend(slot.history.read().await.iter().cloned());

    if slot.topic.retrieval {
      let records = self
        .keeper
        .retrieve_similar(turn.user_id, text, self.settings.retrieval_k)
        .await?;
      if !records.is_empty() {
        messages.push(Message::system(records_context(&records)));
      }
    }
    messages.push(Message::user(text));

    let request = ChatRequest {
      messages,
      max_tokens: turn
        .max_tokens
        .unwrap_or(self.settings.default_max_tokens)
        .clamp(1, self.settings.max_tokens_ceiling),
      temperature: self.settings.temperature,
    };

    let chat = &*self.chat;
    let request = &request;
    let reply = self
      .settings
      .retry
      .run("chat", move || chat.complete(request))
      .await?;

    let mut history = slot.history.write().await;
    history.push(Message::user(text));
    history.push(Message::assistant(reply.clone()));
    tracing::info!(
      topic = topic_id,
      user = turn.user_id,
      turns = history.len(),
      "reply generated"
    );
    Ok(Some(reply))
  }
}

/// The system message listing a user's most relevant medical records.
fn records_context(records: &[MedicalRecord]) -> String {
  let mut out = String::from("Relevant medical records of this patient:");
  for r in records {
    let _ = write!(
      out,
      "\n- {} | Symptom: {} | Diagnosis: {}",
      r.datetime, r.symptom, r.diagnosis
    );
  }
  out
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{Mutex as StdMutex, atomic::Ordering},
    time::Duration,
  };

  use tokio::sync::Notify;

  use super::*;
  use crate::{
    keeper::tests::{TableEmbedder, fast_retry},
    provider::{ProviderError, Role},
    record::NewMedicalRecord,
    store::memory::MemoryStore,
  };

  /// Replies with the last user message, optionally waiting on a gate.
  #[derive(Default)]
  struct EchoChat {
    requests: StdMutex<Vec<ChatRequest>>,
    gate:     Option<Notify>,
    fail:     Option<ProviderError>,
  }

  impl ChatProvider for EchoChat {
    async fn complete<'a>(&'a self, request: &'a ChatRequest) -> Result<String, ProviderError> {
      self.requests.lock().unwrap().push(request.clone());
      if let Some(gate) = &self.gate {
        gate.notified().await;
      }
      if let Some(e) = &self.fail {
        return Err(e.clone());
      }
      let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or_default();
      Ok(format!("echo: {last}"))
    }
  }

  type Manager = ConversationManager<MemoryStore, TableEmbedder, EchoChat>;

  fn manager(embedder: TableEmbedder, chat: EchoChat) -> Manager {
    let store = Arc::new(MemoryStore::new(embedder.dims));
    let keeper = RecordKeeper::new(store, Arc::new(embedder), fast_retry()).unwrap();
    let settings = ConversationSettings { retry: fast_retry(), ..Default::default() };
    ConversationManager::new(Arc::new(keeper), Arc::new(chat), settings).unwrap()
  }

  fn plain() -> Manager { manager(TableEmbedder::new(3, &[]), EchoChat::default()) }

  #[tokio::test]
  async fn history_grows_by_two_per_reply() {
    let m = plain();
    let reply = m
      .respond("empathetic_response", UserTurn::new("129", "I feel tired"))
      .await
      .unwrap();
    assert_eq!(reply.as_deref(), Some("echo: I feel tired"));

    let h = m.history("empathetic_response").await.unwrap();
    assert_eq!(h, vec![Message::user("I feel tired"), Message::assistant("echo: I feel tired")]);

    m.respond("empathetic_response", UserTurn::new("129", "still tired"))
      .await
      .unwrap();
    let h = m.history("empathetic_response").await.unwrap();
    assert_eq!(h.len(), 4);
    assert_eq!(h[2], Message::user("still tired"));
    assert_eq!(h[3].role, Role::Assistant);
  }

  #[tokio::test]
  async fn prior_turns_are_replayed_in_order() {
    let m = plain();
    m.respond("followup_question", UserTurn::new("129", "first")).await.unwrap();
    m.respond("followup_question", UserTurn::new("129", "second")).await.unwrap();

    let requests = m.chat.requests.lock().unwrap();
    let contents: Vec<_> = requests[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents[1..], ["first", "echo: first", "second"]);
    assert_eq!(requests[1].messages[0].role, Role::System);
    assert_eq!(requests[1].max_tokens, 150);
    assert_eq!(requests[1].temperature, 0.7);
  }

  #[tokio::test]
  async fn blank_input_is_a_no_op() {
    let m = plain();
    let reply = m
      .respond("symptom_checker", UserTurn::new("129", "   "))
      .await
      .unwrap();
    assert_eq!(reply, None);
    assert!(m.chat.requests.lock().unwrap().is_empty());
    assert!(m.history("symptom_checker").await.unwrap().is_empty());
    assert_eq!(m.keeper().embedder().calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn unknown_topic_is_rejected() {
    let m = plain();
    let err = m.respond("astrology", UserTurn::new("129", "hi")).await.unwrap_err();
    assert!(matches!(err, Error::UnknownTopic(_)));
  }

  #[tokio::test]
  async fn provider_failure_leaves_history_untouched() {
    let chat = EchoChat {
      fail: Some(ProviderError::Http { status: 400, body: "bad request".into() }),
      ..Default::default()
    };
    let m = manager(TableEmbedder::new(3, &[]), chat);
    let err = m
      .respond("general_conversation", UserTurn::new("129", "hello"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::Http { status: 400, .. })));
    assert!(m.history("general_conversation").await.unwrap().is_empty());
    assert_eq!(m.topic_state("general_conversation").unwrap(), TopicState::Idle);
  }

  #[tokio::test]
  async fn retrieval_topics_include_similar_records() {
    let m = manager(
      TableEmbedder::new(3, &[
        ("Diabetes high blood sugar", vec![1.0, 0.0, 0.0]),
        ("my blood sugar is high", vec![1.0, 0.0, 0.0]),
      ]),
      EchoChat::default(),
    );
    m.keeper()
      .insert_medical(NewMedicalRecord {
        user_id:   "129".into(),
        symptom:   "Diabetes".into(),
        diagnosis: "high blood sugar".into(),
        datetime:  "2025-04-01 10:00:00".parse().unwrap(),
      })
      .await
      .unwrap();

    m.respond("symptom_checker", UserTurn::new("129", "my blood sugar is high"))
      .await
      .unwrap();

    let requests = m.chat.requests.lock().unwrap();
    let msgs = &requests[0].messages;
    assert_eq!(msgs.len(), 3);
    assert_eq!(msgs[1].role, Role::System);
    assert!(
      msgs[1]
        .content
        .contains("2025-04-01 10:00:00 | Symptom: Diabetes | Diagnosis: high blood sugar")
    );
    assert_eq!(msgs[2], Message::user("my blood sugar is high"));
  }

  #[tokio::test]
  async fn retrieval_context_is_omitted_without_records() {
    let m = plain();
    m.respond("medical_summary", UserTurn::new("129", "summarise me")).await.unwrap();
    let requests = m.chat.requests.lock().unwrap();
    assert_eq!(requests[0].messages.len(), 2);
  }

  #[tokio::test]
  async fn extra_context_and_token_ceiling_apply() {
    let m = plain();
    let turn = UserTurn {
      context: Some("Patient is 70 years old."),
      max_tokens: Some(100_000),
      ..UserTurn::new("129", "any advice?")
    };
    m.respond("knowledgeable_advice", turn).await.unwrap();

    let requests = m.chat.requests.lock().unwrap();
    assert!(
      requests[0].messages[0]
        .content
        .ends_with("\n\nAdditional context: Patient is 70 years old.")
    );
    assert_eq!(requests[0].max_tokens, 1024);
  }

  #[test]
  fn zero_token_ceiling_is_a_config_error() {
    let embedder = TableEmbedder::new(3, &[]);
    let store = Arc::new(MemoryStore::new(3));
    let keeper = RecordKeeper::new(store, Arc::new(embedder), fast_retry()).unwrap();
    let settings = ConversationSettings { max_tokens_ceiling: 0, ..Default::default() };
    let err = ConversationManager::new(Arc::new(keeper), Arc::new(EchoChat::default()), settings)
      .err()
      .unwrap();
    assert!(matches!(err, Error::Config(_)));
  }

  #[tokio::test]
  async fn ceiling_of_one_clamps_every_budget() {
    let embedder = TableEmbedder::new(3, &[]);
    let store = Arc::new(MemoryStore::new(3));
    let keeper = RecordKeeper::new(store, Arc::new(embedder), fast_retry()).unwrap();
    let settings = ConversationSettings {
      max_tokens_ceiling: 1,
      retry: fast_retry(),
      ..Default::default()
    };
    let m = ConversationManager::new(Arc::new(keeper), Arc::new(EchoChat::default()), settings)
      .unwrap();
    m.respond("general_conversation", UserTurn::new("129", "hi")).await.unwrap();
    assert_eq!(m.chat.requests.lock().unwrap()[0].max_tokens, 1);
  }

  #[tokio::test]
  async fn concurrent_sends_to_one_topic_are_rejected() {
    let chat = EchoChat { gate: Some(Notify::new()), ..Default::default() };
    let m = Arc::new(manager(TableEmbedder::new(3, &[]), chat));

    let first = tokio::spawn({
      let m = m.clone();
      async move { m.respond("lifestyle_summary", UserTurn::new("129", "one")).await }
    });

    while m.topic_state("lifestyle_summary").unwrap() == TopicState::Idle {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let err = m
      .respond("lifestyle_summary", UserTurn::new("129", "two"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::TopicBusy(_)));
    assert!(matches!(m.clear("lifestyle_summary").await, Err(Error::TopicBusy(_))));

    assert_eq!(m.topic_state("general_conversation").unwrap(), TopicState::Idle);

    m.chat.gate.as_ref().unwrap().notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(m.history("lifestyle_summary").await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn clear_empties_history() {
    let m = plain();
    m.respond("empathetic_response", UserTurn::new("129", "hi")).await.unwrap();
    m.clear("empathetic_response").await.unwrap();
    assert!(m.history("empathetic_response").await.unwrap().is_empty());
  }

  #[test]
  fn topics_are_listed_in_table_order() {
    let m = plain();
    let ids: Vec<_> = m.topics().map(|t| t.id).collect();
    assert_eq!(ids.first(), Some(&"symptom_checker"));
    assert_eq!(ids.len(), TOPICS.len());
  }
}
