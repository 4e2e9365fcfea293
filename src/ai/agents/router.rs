use serde::Deserialize;
use serde_json::json;

use crate::ai::parse::{null_as_default, parse_structured};
use crate::ai::prompt::Prompt;
use crate::ai::build_request;
use crate::conversation::{
    ActionDescriptor, BookingProposal, ConversationState, Intent, NextNode, RoutingDecision,
};
use crate::openai::{Message, TextGenerator};

/// The decision as the model writes it, before `next_node` is checked
/// against the known set of nodes.
#[derive(Debug, Deserialize)]
struct RawRoutingDecision {
    next_node: String,
    #[serde(default, deserialize_with = "null_as_default")]
    reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    additional_actions: Vec<ActionDescriptor>,
}

/// Conversation router. Always produces a decision: any failure to
/// reach the model, parse its answer or recognize the node it picked
/// routes to `End` with the cause in `reason`.
pub async fn decide_next_node(
    generator: &dyn TextGenerator,
    state: &ConversationState,
    intent: Intent,
    details: &BookingProposal,
    history: &[Message],
) -> RoutingDecision {
    let request = match build_request(
        "You are a conversation router for a calendar booking agent.",
        Prompt::Router,
        &json!({
            "state": serde_json::to_string(state).unwrap_or_default(),
            "intent": intent.to_string(),
            "details": serde_json::to_string(details).unwrap_or_default(),
            "history": history,
        }),
    ) {
        Ok(request) => request.max_output_tokens(256).temperature(0.3),
        Err(e) => return RoutingDecision::end(format!("Could not build routing request: {}", e)),
    };

    let raw = match generator.generate(&request).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!("Routing request failed: {}", e);
            return RoutingDecision::end(format!("Routing request failed: {}", e));
        }
    };
    tracing::debug!("Routing response: {}", raw);

    let decision = match parse_structured::<RawRoutingDecision>(&raw) {
        Ok(decision) => decision,
        Err(e) => {
            return RoutingDecision::end(format!(
                "Failed to parse routing decision: {}",
                e.message
            ));
        }
    };

    match NextNode::parse(&decision.next_node) {
        Some(next_node) => RoutingDecision {
            next_node,
            reason: decision.reason,
            additional_actions: decision.additional_actions,
            degraded: false,
        },
        None => {
            tracing::warn!("Router picked unknown node: {}", decision.next_node);
            RoutingDecision::end(format!(
                "Unrecognized next node '{}', ending instead. Router reason: {}",
                decision.next_node, decision.reason
            ))
        }
    }
}
