use chrono::{NaiveDate, NaiveTime};
use itertools::Itertools;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::ai::parse::null_as_default;
use crate::ai::prompt::Prompt;
use crate::ai::{ask_structured, build_request};
use crate::conversation::{BookingProposal, validate_email};
use crate::openai::{CollaboratorError, Message, TextGenerator};

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Booking details as the model reports them. Everything is optional
/// since the user rarely gives all of it in one message.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ExtractedDetails {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub missing_info: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ambiguity_notes: Vec<Value>,
    #[serde(default)]
    pub context_assembly: Option<Value>,
}

/// Durations come back as `30`, `30.0`, `"30"` or `"30 minutes"`.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Some(Value::String(s)) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    };
    Ok(minutes
        .and_then(|m| u32::try_from(m).ok())
        .filter(|m| *m > 0))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

impl ExtractedDetails {
    /// Folds this turn's details into the running proposal. New values
    /// win, participants accumulate, and `missing_info` only lists what
    /// is still absent afterwards.
    pub fn apply(self, proposal: &mut BookingProposal, user_email: &str) {
        let mut missing_info = self.missing_info;

        if let Some(date) = non_empty(self.date) {
            match parse_date(&date) {
                Some(parsed) => proposal.date = Some(parsed),
                None => {
                    tracing::warn!("Ignoring unparseable date from extraction: {}", date);
                    missing_info.push(String::from("date"));
                }
            }
        }
        if let Some(time) = non_empty(self.time) {
            match parse_time(&time) {
                Some(parsed) => proposal.time = Some(parsed),
                None => {
                    tracing::warn!("Ignoring unparseable time from extraction: {}", time);
                    missing_info.push(String::from("time"));
                }
            }
        }
        if let Some(duration) = self.duration {
            proposal.duration_minutes = Some(duration);
        }
        if let Some(location) = non_empty(self.location) {
            proposal.location = Some(location);
        }
        if let Some(summary) = non_empty(self.summary) {
            proposal.summary = Some(summary);
        }

        for participant in self.participants {
            let participant = participant.trim().to_lowercase();
            if validate_email(&participant) {
                proposal.participants.insert(participant);
            }
        }
        proposal.participants.insert(user_email.to_lowercase());

        if !self.ambiguity_notes.is_empty() {
            tracing::debug!("Extraction ambiguity notes: {:?}", self.ambiguity_notes);
        }

        let collected = proposal.collected_fields();
        proposal.missing_info = missing_info
            .into_iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty() && !collected.contains(f))
            .unique()
            .collect();
    }
}

/// Detail extraction agent. Resolves relative dates against `today`
/// and reports which required details are still missing.
pub async fn extract_details(
    generator: &dyn TextGenerator,
    user_input: &str,
    history: &[Message],
    today: NaiveDate,
) -> Result<ExtractedDetails, CollaboratorError> {
    let request = build_request(
        "You are a detail extraction assistant for calendar booking.",
        Prompt::Extraction,
        &json!({
            "history": history,
            "user_input": user_input,
            "today": today.format("%A, %Y-%m-%d").to_string(),
        }),
    )?
    .max_output_tokens(512)
    .temperature(0.2);

    ask_structured(generator, &request).await
}
