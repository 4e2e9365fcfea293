use serde_json::json;

use crate::ai::prompt::Prompt;
use crate::ai::{ask_text, build_request};
use crate::calendar::{BookingError, CreatedEvent};
use crate::conversation::BookingProposal;
use crate::openai::TextGenerator;

/// Tells the user how the booking went, in their style. Never fails:
/// if the model can't be reached a plain message is used instead.
pub async fn booking_message(
    generator: &dyn TextGenerator,
    result: &Result<CreatedEvent, BookingError>,
    proposal: &BookingProposal,
    style: &str,
) -> String {
    let details = serde_json::to_string(proposal).unwrap_or_default();
    let request = match result {
        Ok(_) => build_request(
            "You are a booking communication assistant for calendar events.",
            Prompt::BookingSuccess,
            &json!({"style": style, "details": details}),
        ),
        Err(e) => build_request(
            "You are a booking communication assistant for calendar events.",
            Prompt::BookingFailure,
            &json!({"style": style, "error": e.to_string()}),
        ),
    };

    let message = match request {
        Ok(request) => ask_text(generator, &request.max_output_tokens(128).temperature(0.5)).await,
        Err(e) => Err(e),
    };

    message.unwrap_or_else(|e| {
        tracing::warn!("Booking message generation failed: {}", e);
        match result {
            Ok(event) => format!("Your meeting is booked (event {}).", event.event_id),
            Err(err) => format!("Sorry, I couldn't book the meeting: {}", err),
        }
    })
}
