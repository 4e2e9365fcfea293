//! One function per collaborator-backed step of the conversation.
//! Each builds a prompt, asks the text generator and returns a typed
//! record or a `CollaboratorError`.

pub mod booking;
pub mod confirmation;
pub mod extraction;
pub mod intent;
pub mod notification;
pub mod router;
pub mod suggestion;

pub use booking::booking_message;
pub use confirmation::{ConfirmationAnalysis, ConfirmationStatus, interpret_confirmation};
pub use extraction::{ExtractedDetails, extract_details};
pub use intent::{IntentAnalysis, analyze_intent};
pub use notification::{NotificationEmail, NotificationKind, compose_notification};
pub use router::decide_next_node;
pub use suggestion::{rank_slots, suggestion_message};
