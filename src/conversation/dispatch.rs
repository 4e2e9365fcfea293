//! Turning a routing decision into what the user sees next.

use crate::conversation::BookingProposal;

pub const CONFIRMATION_PROMPT: &str = "Do you confirm the booking details? (yes/no)";
pub const CANCELLATION_MESSAGE: &str = "Okay, the booking has been cancelled. If you want to start over or change any details, just let me know!";
pub const REPROMPT_MESSAGE: &str = "Please type 'yes' to confirm your booking or 'no' to cancel.";
pub const END_MESSAGE: &str = "Thanks for chatting! Let me know whenever you want to book another meeting.";
pub const ROUTING_FAILED_MESSAGE: &str =
    "Sorry, I could not determine the next step. Could you rephrase your request?";
const FALLBACK_CLARIFICATION: &str =
    "I'm not sure how to proceed. Could you please clarify your request?";

const AFFIRMATIVE: &[&str] = &["yes", "confirm", "i confirm", "confirmed"];
const NEGATIVE: &[&str] = &["no", "cancel", "not now"];

/// How a reply to the confirmation prompt reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Negative,
    Unclear,
}

/// Only exact tokens count. "yes but at 4pm" is `Unclear` so a booking
/// never goes ahead on a guess.
pub fn classify_reply(message: &str) -> ConfirmationReply {
    let normalized = message
        .trim()
        .trim_end_matches(['.', '!'])
        .trim()
        .to_lowercase();
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        ConfirmationReply::Affirmative
    } else if NEGATIVE.contains(&normalized.as_str()) {
        ConfirmationReply::Negative
    } else {
        ConfirmationReply::Unclear
    }
}

fn describe_field(field: &str) -> String {
    match field {
        "time" => String::from("the time for your meeting"),
        "date" => String::from("the date for your meeting"),
        "participants" => String::from("the participants or who should be invited"),
        "location" => String::from("the location for your meeting"),
        "duration" => String::from("how long the meeting should be"),
        other => format!("the {} for your meeting", other.replace('_', " ")),
    }
}

/// Asks for whatever is still missing from the proposal.
pub fn clarification_prompt(missing_info: &[String]) -> String {
    let mut parts: Vec<String> = missing_info
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .map(|f| describe_field(&f))
        .collect();

    let Some(last) = parts.pop() else {
        return FALLBACK_CLARIFICATION.to_string();
    };
    if parts.is_empty() {
        format!("Could you please specify {}?", last)
    } else {
        format!("Could you please specify {} and {}?", parts.join(", "), last)
    }
}

pub fn proposal_summary(proposal: &BookingProposal) -> String {
    format!(
        "Here are the booking details:\n\n{}",
        proposal.summary_lines().join("\n")
    )
}

/// Summary of the proposal followed by the explicit yes/no question.
pub fn confirmation_request(proposal: &BookingProposal) -> String {
    format!("{}\n\n{}", proposal_summary(proposal), CONFIRMATION_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn test_classify_reply() {
        assert_eq!(classify_reply("yes"), ConfirmationReply::Affirmative);
        assert_eq!(classify_reply("  I Confirm. "), ConfirmationReply::Affirmative);
        assert_eq!(classify_reply("Confirmed!"), ConfirmationReply::Affirmative);
        assert_eq!(classify_reply("no"), ConfirmationReply::Negative);
        assert_eq!(classify_reply("Not now"), ConfirmationReply::Negative);
        assert_eq!(classify_reply("maybe"), ConfirmationReply::Unclear);
        assert_eq!(classify_reply("yes but at 4pm"), ConfirmationReply::Unclear);
        assert_eq!(classify_reply(""), ConfirmationReply::Unclear);
    }

    #[test]
    fn test_clarification_prompt() {
        assert_eq!(
            clarification_prompt(&[String::from("time")]),
            "Could you please specify the time for your meeting?"
        );
        assert_eq!(
            clarification_prompt(&[
                String::from("date"),
                String::from("Participants"),
                String::from("location"),
            ]),
            "Could you please specify the date for your meeting, the participants or who should be invited and the location for your meeting?"
        );
        assert_eq!(clarification_prompt(&[]), FALLBACK_CLARIFICATION);
    }

    #[test]
    fn test_confirmation_request_lists_details() {
        let proposal = BookingProposal {
            date: NaiveDate::from_ymd_opt(2025, 6, 10),
            time: NaiveTime::from_hms_opt(15, 0, 0),
            duration_minutes: Some(45),
            ..Default::default()
        };
        let text = confirmation_request(&proposal);
        assert!(text.contains("**Date:** 2025-06-10"));
        assert!(text.contains("**Duration:** 45 minutes"));
        assert!(text.ends_with(CONFIRMATION_PROMPT));
    }
}
