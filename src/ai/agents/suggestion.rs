use chrono_tz::Tz;
use itertools::Itertools;
use serde_json::{Value, json};

use crate::ai::prompt::Prompt;
use crate::ai::{ask_structured, ask_text, build_request};
use crate::availability::TimeInterval;
use crate::openai::{CollaboratorError, TextGenerator};

fn slot_view(slot: &TimeInterval, tz: Tz) -> Value {
    json!({
        "start": slot.start.with_timezone(&tz).format("%a %b %-d, %H:%M").to_string(),
        "end": slot.end.with_timezone(&tz).format("%a %b %-d, %H:%M").to_string(),
    })
}

/// Asks the model to order free slots by preference. Falls back to
/// chronological order when the answer is unusable.
pub async fn rank_slots(
    generator: &dyn TextGenerator,
    slots: Vec<TimeInterval>,
    preferences: &Value,
    context: &str,
    tz: Tz,
) -> Vec<TimeInterval> {
    if slots.len() < 2 {
        return slots;
    }

    let request = match build_request(
        "You are a scheduling optimization assistant.",
        Prompt::SlotRanking,
        &json!({
            "slots": slots.iter().map(|s| slot_view(s, tz)).collect::<Vec<_>>(),
            "preferences": preferences.to_string(),
            "context": context,
        }),
    ) {
        Ok(request) => request.max_output_tokens(512).temperature(0.2),
        Err(e) => {
            tracing::warn!("Slot ranking skipped: {}", e);
            return slots;
        }
    };

    let order: Vec<usize> = match ask_structured(generator, &request).await {
        Ok(order) => order,
        Err(e) => {
            tracing::warn!("Slot ranking failed, keeping chronological order: {}", e);
            return slots;
        }
    };

    if order.iter().any(|i| *i >= slots.len()) || !order.iter().all_unique() {
        tracing::warn!("Slot ranking returned invalid indices: {:?}", order);
        return slots;
    }

    // Slots the model left out keep their chronological position after
    // the ranked ones
    let ranked = order.iter().map(|i| slots[*i]);
    let rest = (0..slots.len())
        .filter(|i| !order.contains(i))
        .map(|i| slots[i]);
    ranked.chain(rest).collect()
}

/// Turns free slots into a conversational suggestion in the user's
/// style.
pub async fn suggestion_message(
    generator: &dyn TextGenerator,
    slots: &[TimeInterval],
    preferences: &Value,
    style: &str,
    context: &str,
    tz: Tz,
) -> Result<String, CollaboratorError> {
    let request = build_request(
        "You are a suggestion generation assistant for calendar booking.",
        Prompt::Suggestion,
        &json!({
            "slots": slots.iter().map(|s| slot_view(s, tz)).collect::<Vec<_>>(),
            "preferences": preferences.to_string(),
            "style": style,
            "context": context,
            "timezone": tz.name(),
        }),
    )?
    .max_output_tokens(256)
    .temperature(0.7);

    ask_text(generator, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::CompletionRequest;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _request: &CompletionRequest) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    fn slots() -> Vec<TimeInterval> {
        (9..12)
            .map(|h| {
                TimeInterval::new(
                    Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2025, 6, 10, h, 30, 0).unwrap(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_ranked_slots_come_first() {
        let ranked = rank_slots(&Canned("[2]"), slots(), &json!({}), "", Tz::UTC).await;
        let original = slots();
        assert_eq!(ranked, vec![original[2], original[0], original[1]]);
    }

    #[tokio::test]
    async fn test_invalid_ranking_keeps_chronological_order() {
        for answer in ["[0, 0, 1]", "[7]", "the second one"] {
            let ranked = rank_slots(&Canned(answer), slots(), &json!({}), "", Tz::UTC).await;
            assert_eq!(ranked, slots(), "answer: {}", answer);
        }
    }

    #[tokio::test]
    async fn test_suggestion_message_strips_fences() {
        let message = suggestion_message(
            &Canned("```\nTuesday at 9 works well.\n```"),
            &slots(),
            &json!({}),
            "casual",
            "",
            Tz::Europe__London,
        )
        .await
        .unwrap();
        assert_eq!(message, "Tuesday at 9 works well.");
    }
}
