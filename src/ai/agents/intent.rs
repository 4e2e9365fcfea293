use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ai::parse::null_as_default;
use crate::ai::prompt::Prompt;
use crate::ai::{ask_structured, build_request};
use crate::conversation::Intent;
use crate::openai::{CollaboratorError, Message, TextGenerator};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent: Intent,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context_summary: String,
}

/// Intent recognition agent. Classifies the latest message and picks up
/// the user's communication style so later replies can match it.
pub async fn analyze_intent(
    generator: &dyn TextGenerator,
    user_input: &str,
    history: &[Message],
) -> Result<IntentAnalysis, CollaboratorError> {
    let request = build_request(
        "You are a helpful assistant for intent recognition.",
        Prompt::Intent,
        &json!({"history": history, "user_input": user_input}),
    )?
    .max_output_tokens(512)
    .temperature(0.2);

    ask_structured(generator, &request).await
}
