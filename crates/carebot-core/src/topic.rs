//! Conversation topics and their system prompts.
//!
//! The topic table is fixed at build time. Each topic owns a system prompt
//! that steers the assistant's tone and task; topics that reason about the
//! patient's history also pull similar medical records into the prompt.

use serde::Serialize;

use crate::{Error, Result};

/// A named conversation domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Topic {
  /// Stable identifier used in URLs and on the command line.
  pub id:        &'static str,
  /// Human-readable name, e.g. "Symptom Checker".
  pub title:     &'static str,
  #[serde(skip)]
  pub prompt:    &'static str,
  /// Whether replies are grounded in the user's similar medical records.
  pub retrieval: bool,
}

/// All registered topics, in display order.
pub const TOPICS: &[Topic] = &[
  Topic {
    id:        "symptom_checker",
    title:     "Symptom Checker",
    prompt:    "You are a knowledgeable and empathetic medical assistant. \
                Given the patient's current symptoms and historical medical records, \
                please provide a thoughtful evaluation of the top three possible causes \
                for these symptoms concisely. Take note of the user's choice of language. \
                Highlight if it is a medical emergency! Explain each possibility clearly, \
                in layman language and kindly in simple terms.",
    retrieval: true,
  },
  Topic {
    id:        "lifestyle_summary",
    title:     "Lifestyle Summary",
    prompt:    "You are a medical professional with experience in sports and health \
                coaching. Given the patient's activity levels and vitals record, evaluate \
                the health of the patient and suggest improvements in a friendly and caring \
                manner like an engaging conversation, not too wordy. Take into account the \
                user's choice of language and use normal layman language.",
    retrieval: false,
  },
  Topic {
    id:        "medical_summary",
    title:     "Medical Summary",
    prompt:    "You are a compassionate medical aide. Summarize the patient's medical \
                records by highlighting any recurring symptoms, diagnoses, or important \
                health events in a clear and empathetic tone. Ensure that the summary is \
                both informative and easy for the patient to understand.",
    retrieval: true,
  },
  Topic {
    id:        "empathetic_response",
    title:     "Empathetic Response",
    prompt:    "You are a friendly and empathetic advisor. Respond to the patient's \
                concerns in a way that is caring, understanding, and supportive. Use warm \
                language and encourage the patient to ask follow-up questions if needed.",
    retrieval: false,
  },
  Topic {
    id:        "knowledgeable_advice",
    title:     "Knowledgeable Advice",
    prompt:    "You are a well-informed and compassionate medical consultant. Based on the \
                information provided by the patient, offer thoughtful advice regarding \
                possible health concerns. Your response should be thorough yet accessible, \
                acknowledging the patient's feelings and providing actionable \
                recommendations.",
    retrieval: false,
  },
  Topic {
    id:        "followup_question",
    title:     "Follow-up Question",
    prompt:    "You are a caring assistant. Based on the patient's information, generate \
                one specific follow-up question to gather more details about their \
                condition.",
    retrieval: false,
  },
  Topic {
    id:        "treatment_recommendation",
    title:     "Treatment Recommendation",
    prompt:    "You are a well-informed medical consultant. Based on the patient's \
                symptoms and medical history, suggest three potential treatment options, \
                explain each option briefly, and note any important precautions. Encourage \
                the patient to consult a healthcare professional for personalized advice.",
    retrieval: true,
  },
  Topic {
    id:        "general_conversation",
    title:     "General Conversation",
    prompt:    "You are a warm, empathetic friend. When the topic of loneliness arises, \
                avoid default apologies like \"I'm sorry.\" Instead, validate the user's \
                feelings and provide supportive, understanding responses. Use phrases like \
                \"I understand how you feel\" or \"You're not alone,\" and share thoughtful \
                insights or gentle suggestions to help them feel cared for and encouraged. \
                Sound like a counsellor rather than just pushing the user to ask someone \
                else.",
    retrieval: false,
  },
];

/// Look up a registered topic by id.
pub fn find(id: &str) -> Option<&'static Topic> { TOPICS.iter().find(|t| t.id == id) }

/// The system prompt for `topic_id`, with `additional_context` appended
/// after a blank line when it is non-empty.
pub fn get_prompt(topic_id: &str, additional_context: &str) -> Result<String> {
  let topic = find(topic_id).ok_or_else(|| Error::UnknownTopic(topic_id.to_owned()))?;
  let context = additional_context.trim();
  if context.is_empty() {
    Ok(topic.prompt.to_owned())
  } else {
    Ok(format!("{}\n\nAdditional context: {context}", topic.prompt))
  }
}
