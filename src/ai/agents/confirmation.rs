use serde::Deserialize;
use serde_json::{Value, json};

use super::extraction::ExtractedDetails;
use crate::ai::parse::null_as_default;
use crate::ai::prompt::Prompt;
use crate::ai::{ask_structured, build_request};
use crate::conversation::BookingProposal;
use crate::openai::{CollaboratorError, Message, TextGenerator};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Confirmed,
    Modified,
    Rejected,
    #[serde(other)]
    ClarificationNeeded,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ConfirmationAnalysis {
    pub confirmation_status: ConfirmationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_modifications: ExtractedDetails,
    #[serde(default)]
    pub implicit_feedback: Option<Value>,
    #[serde(default)]
    pub next_action: Option<String>,
}

/// Interprets a reply to a booking proposal that was neither a clear
/// yes nor a clear no, e.g. "ok but make it 45 minutes".
pub async fn interpret_confirmation(
    generator: &dyn TextGenerator,
    user_response: &str,
    proposal: &BookingProposal,
    history: &[Message],
) -> Result<ConfirmationAnalysis, CollaboratorError> {
    let request = build_request(
        "You are a confirmation handler for calendar booking.",
        Prompt::Confirmation,
        &json!({
            "proposal": serde_json::to_string(proposal).unwrap_or_default(),
            "history": history,
            "user_response": user_response,
        }),
    )?
    .max_output_tokens(512)
    .temperature(0.2);

    ask_structured(generator, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::parse::parse_structured;

    #[test]
    fn test_parses_modification() {
        let raw = r#"{
            "confirmation_status": "modified",
            "requested_modifications": {"duration": 45},
            "implicit_feedback": "prefers shorter meetings",
            "next_action": "suggest_new"
        }"#;
        let analysis: ConfirmationAnalysis = parse_structured(raw).unwrap();
        assert_eq!(analysis.confirmation_status, ConfirmationStatus::Modified);
        assert_eq!(analysis.requested_modifications.duration, Some(45));
    }

    #[test]
    fn test_unknown_status_needs_clarification() {
        let raw = r#"{"confirmation_status": "partially_confirmed", "requested_modifications": null}"#;
        let analysis: ConfirmationAnalysis = parse_structured(raw).unwrap();
        assert_eq!(
            analysis.confirmation_status,
            ConfirmationStatus::ClarificationNeeded
        );
        assert_eq!(analysis.requested_modifications, ExtractedDetails::default());
    }
}
