// src/llm/intent.rs
//! Intent and emotional-state classification for incoming student messages.
//!
//! The classifier asks the model for a JSON verdict; when the model is
//! unreachable or returns garbage it degrades to deterministic keyword
//! rules. Safety overrides run on both paths so crisis signals and fee
//! questions are never lost to a bad model answer.

use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::memory::StoredMessage;

use super::{ChatMessage, CompletionModel, CompletionRequest};

/// Phrases that force a crisis classification regardless of what the model
/// or the rules produced.
pub const CRISIS_KEYWORDS: [&str; 6] = [
    "give up",
    "suicide",
    "kill myself",
    "end it all",
    "no point",
    "hopeless",
];

/// Phrases that mark a message as fee-related even when the classifier
/// called it a general inquiry.
const FEE_KEYWORDS: [&str; 7] = ["fee", "tuition", "cost", "payment", "charge", "gym", "bus pass"];

static RE_FEES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"fee|tuition|cost|payment|charge").expect("valid regex"));
static RE_COURSES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"course|class|enroll|registration|drop|withdraw").expect("valid regex"));
static RE_STRESSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"overwhelm|exhaust|stress|can't handle|too much|tired").expect("valid regex"));
static RE_FRUSTRATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frustrat|annoy|angry|upset").expect("valid regex"));
static RE_CRISIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"give up|suicide|hopeless|no point").expect("valid regex"));
static RE_PROSPECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"apply|admission|prospective|thinking about|interested in").expect("valid regex"));

const CLASSIFIER_PROMPT: &str = r#"You are an intent classifier for a university's remote student support assistant. Analyze the student's message and respond with a single JSON object:
{
  "intent": "fee_inquiry" | "course_question" | "emotional_support" | "academic_policy" | "prospective_student" | "general_inquiry" | "technical_support",
  "emotionalState": "neutral" | "positive" | "stressed" | "frustrated" | "crisis",
  "needsRetrieval": true when answering requires university policies, fees, deadlines, or procedures,
  "requiresEscalation": true when a human should follow up (emotional distress, complex account issues, admission questions from prospective students),
  "category": "fees" | "wellness" | "mental_health" | "academics" | "admissions" | "technical" | "general",
  "keywords": up to 5 key terms from the message
}
Use "crisis" only for signals of self-harm, hopelessness, or giving up. Respond with JSON only, no other text."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FeeInquiry,
    CourseQuestion,
    EmotionalSupport,
    AcademicPolicy,
    ProspectiveStudent,
    #[default]
    GeneralInquiry,
    TechnicalSupport,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FeeInquiry => "fee_inquiry",
            Intent::CourseQuestion => "course_question",
            Intent::EmotionalSupport => "emotional_support",
            Intent::AcademicPolicy => "academic_policy",
            Intent::ProspectiveStudent => "prospective_student",
            Intent::GeneralInquiry => "general_inquiry",
            Intent::TechnicalSupport => "technical_support",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalState {
    #[default]
    Neutral,
    Positive,
    Stressed,
    Frustrated,
    Crisis,
}

impl EmotionalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalState::Neutral => "neutral",
            EmotionalState::Positive => "positive",
            EmotionalState::Stressed => "stressed",
            EmotionalState::Frustrated => "frustrated",
            EmotionalState::Crisis => "crisis",
        }
    }

    pub fn is_crisis(&self) -> bool {
        matches!(self, EmotionalState::Crisis)
    }
}

/// Full classification verdict for one message. Deserialized straight from
/// the model's JSON; missing fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntentDescriptor {
    pub intent: Intent,
    pub emotional_state: EmotionalState,
    pub needs_retrieval: bool,
    pub requires_escalation: bool,
    pub category: String,
    pub keywords: Vec<String>,
}

impl Default for IntentDescriptor {
    fn default() -> Self {
        Self {
            intent: Intent::GeneralInquiry,
            emotional_state: EmotionalState::Neutral,
            needs_retrieval: false,
            requires_escalation: false,
            category: "general".to_string(),
            keywords: Vec::new(),
        }
    }
}

/// Classification outcome, tagged with how it was produced. Downstream
/// behavior is identical for both variants; the tag exists for logging and
/// tests.
#[derive(Debug, Clone)]
pub enum IntentAnalysis {
    /// The model produced a usable verdict.
    Classified(IntentDescriptor),
    /// The model was unavailable; the verdict came from keyword rules.
    Degraded(IntentDescriptor),
}

impl IntentAnalysis {
    pub fn descriptor(&self) -> &IntentDescriptor {
        match self {
            IntentAnalysis::Classified(descriptor) | IntentAnalysis::Degraded(descriptor) => {
                descriptor
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, IntentAnalysis::Degraded(_))
    }
}

pub struct IntentClassifier {
    model: Arc<dyn CompletionModel>,
    model_name: String,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn CompletionModel>, model_name: impl Into<String>) -> Self {
        Self { model, model_name: model_name.into() }
    }

    /// Classifies one message in the context of recent history. Never
    /// fails: a model error degrades to the keyword rules, and the safety
    /// overrides run on whichever verdict was produced.
    pub async fn classify(&self, message: &str, history: &[StoredMessage]) -> IntentAnalysis {
        match self.classify_with_model(message, history).await {
            Ok(descriptor) => IntentAnalysis::Classified(apply_overrides(descriptor, message)),
            Err(e) => {
                warn!("Intent model unavailable, falling back to rules: {e:#}");
                IntentAnalysis::Degraded(apply_overrides(rule_based(message), message))
            }
        }
    }

    async fn classify_with_model(
        &self,
        message: &str,
        history: &[StoredMessage],
    ) -> Result<IntentDescriptor> {
        let context: Vec<ChatMessage> = history.iter().map(ChatMessage::from).collect();
        let context_json =
            serde_json::to_string(&context).unwrap_or_else(|_| "[]".to_string());

        let mut request = CompletionRequest::new(
            &self.model_name,
            vec![
                ChatMessage::system(CLASSIFIER_PROMPT),
                ChatMessage::user(format!(
                    "Message: \"{message}\"\n\nRecent conversation: {context_json}"
                )),
            ],
        );
        request.json_response = true;

        let raw = self.model.complete(request).await?;
        serde_json::from_str(raw.trim()).context("Classifier returned malformed JSON")
    }
}

/// Deterministic keyword classification, used when the model is down.
/// Retrieval is always requested on this path; the rules cannot tell
/// whether the corpus will help, and searching is cheap.
fn rule_based(message: &str) -> IntentDescriptor {
    let text = message.to_lowercase();
    let mut descriptor = IntentDescriptor { needs_retrieval: true, ..Default::default() };

    if RE_FEES.is_match(&text) {
        descriptor.intent = Intent::FeeInquiry;
        descriptor.category = "fees".to_string();
    } else if RE_COURSES.is_match(&text) {
        descriptor.intent = Intent::CourseQuestion;
        descriptor.category = "academics".to_string();
    }

    if RE_STRESSED.is_match(&text) {
        descriptor.intent = Intent::EmotionalSupport;
        descriptor.emotional_state = EmotionalState::Stressed;
        descriptor.requires_escalation = true;
        descriptor.category = "wellness".to_string();
    }
    if RE_FRUSTRATED.is_match(&text) {
        descriptor.emotional_state = EmotionalState::Frustrated;
    }
    if RE_CRISIS.is_match(&text) {
        descriptor.intent = Intent::EmotionalSupport;
        descriptor.emotional_state = EmotionalState::Crisis;
        descriptor.requires_escalation = true;
        descriptor.category = "mental_health".to_string();
    }
    if RE_PROSPECTIVE.is_match(&text) {
        descriptor.intent = Intent::ProspectiveStudent;
        descriptor.category = "admissions".to_string();
    }

    descriptor.keywords = message
        .split_whitespace()
        .filter(|word| word.len() > 3)
        .take(5)
        .map(|word| word.to_string())
        .collect();

    descriptor
}

/// Safety overrides applied to every verdict, model-produced or not.
fn apply_overrides(mut descriptor: IntentDescriptor, message: &str) -> IntentDescriptor {
    let text = message.to_lowercase();

    if CRISIS_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        descriptor.emotional_state = EmotionalState::Crisis;
        descriptor.requires_escalation = true;
        descriptor.category = "mental_health".to_string();
    }

    if FEE_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        if descriptor.intent == Intent::GeneralInquiry {
            descriptor.intent = Intent::FeeInquiry;
        }
        descriptor.needs_retrieval = true;
        if descriptor.category == "general" {
            descriptor.category = "fees".to_string();
        }
    }

    descriptor
}
