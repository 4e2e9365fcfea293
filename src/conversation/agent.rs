use std::sync::Arc;

use chrono::{Duration, DurationRound, Utc};
use chrono_tz::Tz;
use serde_json::json;

use super::dispatch::{
    CANCELLATION_MESSAGE, ConfirmationReply, END_MESSAGE, REPROMPT_MESSAGE,
    ROUTING_FAILED_MESSAGE, classify_reply, clarification_prompt, confirmation_request,
    proposal_summary,
};
use super::models::{
    BookedEvent, BookingProposal, Intent, NextNode, RoutingDecision, Session, TurnOutcome,
    UserProfile,
};
use crate::ai::agents::{
    ConfirmationStatus, NotificationEmail, NotificationKind, analyze_intent, booking_message, compose_notification,
    decide_next_node, extract_details, interpret_confirmation, rank_slots, suggestion_message,
};
use crate::availability::{AvailabilityQuery, compute_free_slots, days_after};
use crate::calendar::CalendarBackend;
use crate::core::AppConfig;
use crate::mailer::{EmailSender, MailerSend};
use crate::openai::{Message, OpenAiGenerator, Role, TextGenerator};

/// Upper bound on how far ahead suggestions look.
pub const MAX_SLOT_WINDOW_DAYS: i64 = 366;

#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub slot_window_days: i64,
    pub min_slot_minutes: i64,
    pub max_suggested_slots: usize,
    pub timezone: Tz,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            slot_window_days: 7,
            min_slot_minutes: 30,
            max_suggested_slots: 10,
            timezone: Tz::UTC,
        }
    }
}

impl From<&AppConfig> for AgentSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            slot_window_days: config.slot_window_days.clamp(1, MAX_SLOT_WINDOW_DAYS),
            min_slot_minutes: config.min_slot_minutes.max(1),
            max_suggested_slots: config.max_suggested_slots.max(1),
            timezone: config.timezone.parse().unwrap_or(Tz::UTC),
        }
    }
}

/// Runs one user turn at a time: intent and detail extraction, routing,
/// then exactly one node. The session is passed in and handed back so
/// the caller owns persistence.
pub struct Agent {
    generator: Arc<dyn TextGenerator>,
    calendar: Arc<dyn CalendarBackend>,
    mailer: Arc<dyn EmailSender>,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        calendar: Arc<dyn CalendarBackend>,
        mailer: Arc<dyn EmailSender>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            generator,
            calendar,
            mailer,
            settings,
        }
    }

    /// Wires the configured LLM host and MailerSend around `calendar`.
    pub fn from_config(config: &AppConfig, calendar: Arc<dyn CalendarBackend>) -> Self {
        let generator = OpenAiGenerator::new(
            &config.llm_api_hostname,
            &config.llm_api_key,
            &config.llm_model,
        );
        Self::new(
            Arc::new(generator),
            calendar,
            Arc::new(MailerSend::from(config)),
            AgentSettings::from(config),
        )
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub async fn process_turn(
        &self,
        mut session: Session,
        user: &UserProfile,
        input: &str,
    ) -> TurnOutcome {
        let input = input.trim();
        let prior_history = session.history.clone();
        session.history.push(Message::new(Role::User, input));

        let today = Utc::now().with_timezone(&self.settings.timezone).date_naive();
        let generator = self.generator.as_ref();
        let (intent, details) = tokio::join!(
            analyze_intent(generator, input, &prior_history),
            extract_details(generator, input, &prior_history, today),
        );

        let intent = match intent {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("Intent analysis failed: {}", e);
                return finish(
                    session,
                    vec![String::from(
                        "Sorry, I couldn't work out what you meant (intent analysis failed). Could you rephrase that?",
                    )],
                );
            }
        };
        let details = match details {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Detail extraction failed: {}", e);
                return finish(
                    session,
                    vec![String::from(
                        "Sorry, I couldn't pick out the meeting details (detail extraction failed). Could you rephrase that?",
                    )],
                );
            }
        };

        tracing::debug!(
            "Intent {} ({:.2}) style {}: {}",
            intent.intent,
            intent.confidence,
            intent.style,
            intent.context_summary
        );
        session.intent = intent.intent;
        if session.intent == Intent::Reschedule {
            session.begin_reschedule();
        }
        if !intent.style.trim().is_empty() {
            session.style = intent.style.trim().to_lowercase();
        }
        details.apply(&mut session.proposal, &user.email);

        let decision = decide_next_node(
            generator,
            &session.state,
            session.intent,
            &session.proposal,
            &session.history,
        )
        .await;
        tracing::info!("Routing to {}: {}", decision.next_node, decision.reason);
        if !decision.additional_actions.is_empty() {
            tracing::debug!("Router suggested actions: {:?}", decision.additional_actions);
        }

        session.state.current_node = decision.next_node;
        session.state.info_collected = session.proposal.collected_fields();

        let replies = self.dispatch(&mut session, user, &decision).await;
        finish(session, replies)
    }

    async fn dispatch(
        &self,
        session: &mut Session,
        user: &UserProfile,
        decision: &RoutingDecision,
    ) -> Vec<String> {
        match decision.next_node {
            NextNode::Suggestion => vec![self.suggest(session, user).await],
            NextNode::Confirmation => {
                if session.proposal.is_bookable() {
                    vec![confirmation_request(&session.proposal)]
                } else {
                    vec![self.clarify(session)]
                }
            }
            NextNode::Booking => self.book(session, user).await,
            NextNode::End if decision.degraded => {
                tracing::warn!("Routing degraded: {}", decision.reason);
                vec![String::from(ROUTING_FAILED_MESSAGE)]
            }
            NextNode::End => vec![String::from(END_MESSAGE)],
            NextNode::AskClarification | NextNode::Intent | NextNode::Extraction => {
                vec![self.clarify(session)]
            }
        }
    }

    fn clarify(&self, session: &mut Session) -> String {
        let proposal = &session.proposal;
        let mut missing = proposal.missing_info.clone();
        let required = [("date", proposal.date.is_none()), ("time", proposal.time.is_none())];
        for (required, absent) in required {
            if absent && !missing.iter().any(|m| m == required) {
                missing.push(required.to_string());
            }
        }
        session.state.current_node = NextNode::AskClarification;
        clarification_prompt(&missing)
    }

    async fn suggest(&self, session: &Session, user: &UserProfile) -> String {
        let now = Utc::now();
        let window_start = now.duration_trunc(Duration::minutes(1)).unwrap_or(now);
        let Some(window_end) = days_after(window_start, self.settings.slot_window_days) else {
            tracing::error!(
                "Slot window of {} days is out of range",
                self.settings.slot_window_days
            );
            return String::from("Sorry, I couldn't work out which dates to search.");
        };
        let minimum = session
            .proposal
            .duration_minutes
            .map(i64::from)
            .unwrap_or(self.settings.min_slot_minutes);

        let busy = match self
            .calendar
            .busy_intervals(&user.email, window_start, window_end)
            .await
        {
            Ok(busy) => busy,
            Err(e) => {
                tracing::error!("Failed to fetch busy intervals: {}", e);
                return format!("Sorry, I couldn't check your calendar right now ({}).", e);
            }
        };

        let query = AvailabilityQuery::new(window_start, window_end, minimum);
        let mut slots = match compute_free_slots(&busy, &query) {
            Ok(slots) => slots,
            Err(e) => {
                tracing::error!("Invalid availability query: {}", e);
                return String::from("Sorry, I couldn't work out your free time.");
            }
        };
        if slots.is_empty() {
            return format!(
                "I couldn't find a free slot of {} minutes in the next {} days.",
                minimum, self.settings.slot_window_days
            );
        }
        slots.truncate(self.settings.max_suggested_slots);

        let preferences = json!({
            "duration_minutes": minimum,
            "date": session.proposal.date,
            "time": session.proposal.time,
            "location": session.proposal.location,
        });
        let context = session.last_user_message().unwrap_or_default();
        let tz = self.settings.timezone;
        let ranked = rank_slots(self.generator.as_ref(), slots, &preferences, context, tz).await;

        match suggestion_message(
            self.generator.as_ref(),
            &ranked,
            &preferences,
            &session.style,
            context,
            tz,
        )
        .await
        {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Suggestion generation failed: {}", e);
                String::from(
                    "Sorry, I found some free time but couldn't put the suggestions into words (suggestion generation failed). Could you ask again?",
                )
            }
        }
    }

    async fn book(&self, session: &mut Session, user: &UserProfile) -> Vec<String> {
        let reply = session.last_user_message().unwrap_or_default().to_string();
        match classify_reply(&reply) {
            ConfirmationReply::Negative => {
                session.proposal = BookingProposal::default();
                session.state.current_node = NextNode::End;
                vec![String::from(CANCELLATION_MESSAGE)]
            }
            ConfirmationReply::Unclear => self.reinterpret(session, user, &reply).await,
            ConfirmationReply::Affirmative if !session.proposal.is_bookable() => {
                vec![self.clarify(session)]
            }
            ConfirmationReply::Affirmative => self.execute_booking(session, user).await,
        }
    }

    /// A reply that is neither yes nor no. Modifications are applied but
    /// the booking still waits for an explicit yes.
    async fn reinterpret(
        &self,
        session: &mut Session,
        user: &UserProfile,
        reply: &str,
    ) -> Vec<String> {
        let prior_history = &session.history[..session.history.len().saturating_sub(1)];
        let analysis = interpret_confirmation(
            self.generator.as_ref(),
            reply,
            &session.proposal,
            prior_history,
        )
        .await;

        session.state.current_node = NextNode::Confirmation;
        match analysis {
            Ok(analysis) if analysis.confirmation_status == ConfirmationStatus::Modified => {
                let mut modifications = analysis.requested_modifications;
                // Participants are only ever added by extraction
                modifications.participants.clear();
                modifications.missing_info.clear();
                modifications.apply(&mut session.proposal, &user.email);
                vec![
                    proposal_summary(&session.proposal),
                    String::from(REPROMPT_MESSAGE),
                ]
            }
            Ok(analysis) => {
                tracing::debug!(
                    "Unclear confirmation reply read as {:?}",
                    analysis.confirmation_status
                );
                vec![String::from(REPROMPT_MESSAGE)]
            }
            Err(e) => {
                tracing::warn!("Confirmation interpretation failed: {}", e);
                vec![String::from(REPROMPT_MESSAGE)]
            }
        }
    }

    async fn execute_booking(&self, session: &mut Session, user: &UserProfile) -> Vec<String> {
        let (result, kind) = match session.proposal.event_id.as_deref() {
            Some(event_id) => (
                self.calendar
                    .update_event(&user.email, event_id, &session.proposal)
                    .await,
                NotificationKind::Update,
            ),
            None => (
                self.calendar
                    .create_event(&user.email, &session.proposal)
                    .await,
                NotificationKind::Confirmation,
            ),
        };
        let mut replies = vec![
            booking_message(
                self.generator.as_ref(),
                &result,
                &session.proposal,
                &session.style,
            )
            .await,
        ];

        match result {
            Ok(event) => {
                tracing::info!("Booked event {} ({}) for {}", event.event_id, kind, user.email);
                replies.push(self.notify(session, user, kind).await);
                let proposal = std::mem::take(&mut session.proposal);
                session.booked = Some(BookedEvent {
                    event_id: event.event_id,
                    proposal: BookingProposal {
                        event_id: None,
                        ..proposal
                    },
                });
                session.state.current_node = NextNode::End;
            }
            Err(e) => {
                tracing::error!("Booking failed: {}", e);
                session.state.current_node = NextNode::Confirmation;
            }
        }
        replies
    }

    async fn notify(&self, session: &Session, user: &UserProfile, kind: NotificationKind) -> String {
        let email = compose_notification(
            self.generator.as_ref(),
            kind,
            &session.proposal,
            &user.name,
            &session.style,
        )
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Notification composition failed, using plain summary: {}", e);
            NotificationEmail {
                subject: kind.fallback_subject().to_string(),
                body: session.proposal.summary_lines().join("\n"),
            }
        });

        match self
            .mailer
            .send(&user.email, &email.subject, &email.body, &user.name)
            .await
        {
            Ok(report) if report.delivered => {
                format!("I've sent a {} email to {}.", kind, user.email)
            }
            Ok(report) => {
                tracing::error!(
                    "{} email not delivered ({:?}): {:?}",
                    kind,
                    report.status_code,
                    report.diagnostic
                );
                format!("Your meeting is booked, but I couldn't send the {} email.", kind)
            }
            Err(e) => {
                tracing::error!("{} email failed: {}", kind, e);
                format!("Your meeting is booked, but I couldn't send the {} email.", kind)
            }
        }
    }
}

fn finish(mut session: Session, replies: Vec<String>) -> TurnOutcome {
    for reply in &replies {
        session.history.push(Message::new(Role::Assistant, reply));
    }
    TurnOutcome { session, replies }
}
