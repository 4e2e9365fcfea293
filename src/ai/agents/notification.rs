use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ai::prompt::Prompt;
use crate::ai::{ask_structured, build_request};
use crate::conversation::BookingProposal;
use crate::openai::{CollaboratorError, TextGenerator};

/// Which email to write about an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Sent after a new booking
    Confirmation,
    /// Sent after an existing event was rescheduled or changed
    Update,
    Reminder,
    Followup,
}

impl NotificationKind {
    /// Subject used when the model can't write the email.
    pub fn fallback_subject(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "Your meeting is booked",
            NotificationKind::Update => "Your meeting has been updated",
            NotificationKind::Reminder => "Reminder: upcoming meeting",
            NotificationKind::Followup => "Following up on our meeting",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            NotificationKind::Confirmation => "confirmation",
            NotificationKind::Update => "update",
            NotificationKind::Reminder => "reminder",
            NotificationKind::Followup => "follow-up",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEmail {
    pub subject: String,
    pub body: String,
}

/// Writes a `kind` email about the event described by `proposal`.
pub async fn compose_notification(
    generator: &dyn TextGenerator,
    kind: NotificationKind,
    proposal: &BookingProposal,
    recipient_name: &str,
    style: &str,
) -> Result<NotificationEmail, CollaboratorError> {
    let request = build_request(
        "You are a notification email assistant for calendar events.",
        Prompt::Notification,
        &json!({
            "kind": kind.to_string(),
            "details": serde_json::to_string(proposal).unwrap_or_default(),
            "recipient_name": recipient_name,
            "style": style,
        }),
    )?
    .max_output_tokens(256)
    .temperature(0.5);

    ask_structured(generator, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::CompletionRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
            self.0.lock().unwrap().push(request.user_message.clone());
            Ok(String::from(r#"{"subject": "See you soon", "body": "Tomorrow at 3pm."}"#))
        }
    }

    #[tokio::test]
    async fn test_kind_is_rendered_into_the_prompt() {
        let generator = Recording::default();
        for kind in [
            NotificationKind::Confirmation,
            NotificationKind::Update,
            NotificationKind::Reminder,
            NotificationKind::Followup,
        ] {
            let email = compose_notification(
                &generator,
                kind,
                &BookingProposal::default(),
                "Ada",
                "casual",
            )
            .await
            .unwrap();
            assert_eq!(email.subject, "See you soon");
        }

        let prompts = generator.0.lock().unwrap();
        assert!(prompts[0].contains("Notification type: confirmation\n"));
        assert!(prompts[1].contains("Notification type: update\n"));
        assert!(prompts[2].contains("Notification type: reminder\n"));
        assert!(prompts[3].contains("Notification type: follow-up\n"));
        assert!(prompts.iter().all(|p| p.contains("Recipient name: Ada")));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::Followup).unwrap(),
            r#""followup""#
        );
        assert_eq!(
            NotificationKind::Reminder.fallback_subject(),
            "Reminder: upcoming meeting"
        );
    }
}
