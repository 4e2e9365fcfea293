//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since user
//! messages and model output should be considered untrusted and
//! Handlebars forces you to add only what you need.

use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use handlebars::{Handlebars, handlebars_helper};
use serde::Serialize;

// A simple `inc` helper for use with `each` and `@index` so that
// there can be natural number sequences when rendering (instead of
// starting at 0).
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

static TEMPLATES: LazyLock<Handlebars<'static>> = LazyLock::new(templates);

#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    Intent,
    Extraction,
    Router,
    SlotRanking,
    Suggestion,
    Confirmation,
    BookingSuccess,
    BookingFailure,
    Notification,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const HISTORY_PARTIAL: &str = r"{{#each history}}
{{role}}: {{content}}
{{/each}}";

const INTENT_PROMPT: &str = r"
You are an AI assistant for a calendar booking agent. Analyze the following conversation and the latest user message.
For the latest user message, provide:
- Primary intent (booking, reschedule, question, complaint, casual, etc.)
- Confidence (0-1)
- Communication style (formal, casual, urgent, frustrated, etc.)
- Context summary (how this message relates to previous turns)

Conversation history:
{{> history}}

Latest user message:
{{user_input}}

Respond ONLY with a valid JSON object with keys: intent, confidence, style, context_summary.
Do not include any explanation, markdown, or text outside the JSON.
";

const EXTRACTION_PROMPT: &str = r#"
You are an expert assistant for a calendar booking agent. Analyze the following conversation and the latest user message.
Today is {{today}}.
Extract the following as a JSON object:
- date (absolute, e.g., 2024-06-10)
- time (24h format, e.g., 15:00)
- duration (in minutes)
- participants (list of emails, if any)
- location (if mentioned)
- summary (short meeting title, if mentioned)
- missing_info (list of required details not provided, using the names "date", "time", "duration", "participants", "location")
- ambiguity_notes (list of ambiguities or context-dependent meanings)
- context_assembly (summary of how details were gathered across turns)

Handle complex temporal expressions (e.g., "next Friday after the holiday", "before my lunch meeting").
Infer missing information if possible, and note any assumptions.

Conversation history:
{{> history}}

Latest user message:
{{user_input}}

Respond ONLY with a valid JSON object with the keys above. Do not include any explanation, markdown, or text outside the JSON.
"#;

const ROUTER_PROMPT: &str = r"
You are a conversation router for a calendar booking agent. Analyze the current conversation state, user intent, extracted details, and conversation history. Decide the most appropriate next node to keep the conversation smooth and helpful.
- Handle interruptions (e.g., user asks a question mid-booking)
- Allow modifications after confirmation
- Address user frustration or confusion
- Explain errors if needed
- Support booking multiple meetings in one conversation

The next node must be one of: intent, extraction, suggestion, confirmation, booking, ask_clarification, end.
- suggestion: the user wants to know when they are free or has not picked a time yet
- confirmation: date and time are known and the user has not yet confirmed them
- booking: the user has just confirmed the proposed booking
- ask_clarification: required details are missing or the request is unclear
- end: the user is done

Conversation state: {{state}}
User intent: {{intent}}
Extracted details: {{details}}
Conversation history:
{{> history}}

Respond ONLY with a valid JSON object with keys: next_node, reason, additional_actions. Do not include any explanation, markdown, or text outside the JSON.
";

const SLOT_RANKING_PROMPT: &str = r"
You are a scheduling assistant. Given the following available slots and user preferences, rank the slots and suggest the best options.
Free slots:
{{#each slots}}
{{@index}}. {{start}} to {{end}}
{{/each}}
User preferences: {{preferences}}
Context: {{context}}

Respond ONLY with a JSON list of slot numbers, most preferred first. Do not include any explanation, markdown, or text outside the JSON.
";

const SUGGESTION_PROMPT: &str = r"
You are a conversational AI assistant for scheduling. Given the following available time slots, user preferences, and communication style, craft a natural, engaging suggestion message.
- Match the user's tone: {{style}}
- Provide context for why certain slots are suggested
- Present multiple options clearly, but do not overwhelm
- Keep the conversation flowing naturally
- All times are in {{timezone}}

Available slots:
{{#each slots}}
{{inc @index}}. {{start}} to {{end}}
{{/each}}
User preferences: {{preferences}}
Context: {{context}}

Respond with a single suggestion message in natural language.
";

const CONFIRMATION_PROMPT: &str = r"
You are a confirmation handler for a calendar booking agent. Analyze the user's response to the current booking proposal.
- Identify if the user fully confirms, partially confirms, requests modifications, or expresses implicit feedback.
- Handle conditional agreements and multi-step modifications.
- Suggest the appropriate next action (book, suggest_new, ask_clarification).

Booking proposal: {{proposal}}
Conversation history:
{{> history}}
User response: {{user_response}}

Respond ONLY with a valid JSON object with keys: confirmation_status (one of confirmed, modified, rejected, clarification_needed), requested_modifications (object using the keys date, time, duration, location, summary), implicit_feedback, next_action. Do not include any explanation, markdown, or text outside the JSON.
";

const BOOKING_SUCCESS_PROMPT: &str = r"
You are a conversational AI assistant. Craft a personalized confirmation message for a successful calendar booking.
- Match the user's tone: {{style}}
- Include event details: {{details}}
Respond ONLY with a single confirmation message in plain text. Do not include any explanation, markdown, or text outside the message.
";

const BOOKING_FAILURE_PROMPT: &str = r"
You are a conversational AI assistant. Explain a booking failure in a user-friendly, empathetic way.
- Match the user's tone: {{style}}
- Error details: {{error}}
- Suggest next steps if possible.
Respond ONLY with a single error message in plain text. Do not include any explanation, markdown, or text outside the message.
";

const NOTIFICATION_PROMPT: &str = r"
You are an AI assistant for calendar notifications. Compose an email for the following event:
Notification type: {{kind}}
Event details: {{details}}
Recipient name: {{recipient_name}}
Tone: {{style}}
- Personalize the content and adapt the template to the context.
- For reminders and follow-ups, include appropriate timing and a call to action.
- For updates, make clear the event was rescheduled and give the new details.
Respond ONLY with a valid JSON object with keys: subject, body. Do not include any explanation, markdown, or text outside the JSON.
";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text so HTML escaping would only mangle them
    registry.register_escape_fn(handlebars::no_escape);
    registry.register_helper("inc", Box::new(inc));
    registry
        .register_partial("history", HISTORY_PARTIAL)
        .expect("Failed to register partial");

    let prompts = [
        (Prompt::Intent, INTENT_PROMPT),
        (Prompt::Extraction, EXTRACTION_PROMPT),
        (Prompt::Router, ROUTER_PROMPT),
        (Prompt::SlotRanking, SLOT_RANKING_PROMPT),
        (Prompt::Suggestion, SUGGESTION_PROMPT),
        (Prompt::Confirmation, CONFIRMATION_PROMPT),
        (Prompt::BookingSuccess, BOOKING_SUCCESS_PROMPT),
        (Prompt::BookingFailure, BOOKING_FAILURE_PROMPT),
        (Prompt::Notification, NOTIFICATION_PROMPT),
    ];
    for (prompt, template) in prompts {
        registry
            .register_template_string(&prompt.to_string(), template)
            .expect("Failed to register template");
    }
    registry
}

pub fn render<T: Serialize>(prompt: Prompt, data: &T) -> Result<String> {
    Ok(TEMPLATES.render(&prompt.to_string(), data)?)
}
