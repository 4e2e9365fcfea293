//! Calendar backends: busy lookups for the availability engine, event
//! creation for confirmed proposals and updates for rescheduled ones.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio_rusqlite::Connection;

use crate::availability::TimeInterval;
use crate::conversation::BookingProposal;
use crate::core::AppConfig;
use crate::core::db::find_refresh_token;
use crate::google::gcal::{
    EventAttendee, EventDateTime, NewEvent, insert_event, patch_event, query_free_busy,
};
use crate::google::oauth::refresh_access_token;
use crate::google::{GoogleApiError, CALENDAR_SCOPE};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_SUMMARY: &str = "Meeting";
pub const DEFAULT_DESCRIPTION: &str = "Scheduled via slotbot.";

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Calendar authorization failed: {0}")]
    Auth(String),
    #[error("Calendar request failed: {0}")]
    Backend(String),
}

impl From<GoogleApiError> for CalendarError {
    fn from(err: GoogleApiError) -> Self {
        if err.is_auth() {
            CalendarError::Auth(err.to_string())
        } else {
            CalendarError::Backend(err.to_string())
        }
    }
}

/// Why an event could not be created. Shown to the user, so the
/// message is kept readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BookingError {
    pub message: String,
}

impl BookingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<CalendarError> for BookingError {
    fn from(err: CalendarError) -> Self {
        BookingError::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub event_id: String,
    pub html_link: Option<String>,
}

#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Busy blocks on `account`'s calendar that overlap `[start, end)`.
    async fn busy_intervals(
        &self,
        account: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>, CalendarError>;

    /// Creates the event described by `proposal` and invites its
    /// participants.
    async fn create_event(
        &self,
        account: &str,
        proposal: &BookingProposal,
    ) -> Result<CreatedEvent, BookingError>;

    /// Moves or edits the already booked `event_id` to match `proposal`.
    async fn update_event(
        &self,
        account: &str,
        event_id: &str,
        proposal: &BookingProposal,
    ) -> Result<CreatedEvent, BookingError>;
}

/// Builds the Google event body. Date and time are required; the rest
/// falls back to defaults.
pub fn event_from_proposal(
    proposal: &BookingProposal,
    default_timezone: Tz,
) -> Result<NewEvent, BookingError> {
    let date = proposal
        .date
        .ok_or_else(|| BookingError::new("The meeting date is missing"))?;
    let time = proposal
        .time
        .ok_or_else(|| BookingError::new("The meeting time is missing"))?;
    let duration = proposal.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);

    let timezone = match proposal.timezone.as_deref() {
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone {} on proposal, using {}", name, default_timezone);
            default_timezone
        }),
        None => default_timezone,
    };

    let start = NaiveDateTime::new(date, time);
    let end = start
        .checked_add_signed(Duration::minutes(i64::from(duration)))
        .ok_or_else(|| BookingError::new("The meeting would end too far in the future"))?;
    let format = "%Y-%m-%dT%H:%M:%S";

    Ok(NewEvent {
        summary: proposal
            .summary
            .clone()
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        location: proposal.location.clone(),
        description: proposal
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        start: EventDateTime {
            date_time: start.format(format).to_string(),
            time_zone: timezone.name().to_string(),
        },
        end: EventDateTime {
            date_time: end.format(format).to_string(),
            time_zone: timezone.name().to_string(),
        },
        attendees: proposal
            .participants
            .iter()
            .filter(|p| p.contains('@'))
            .map(|email| EventAttendee {
                email: email.clone(),
            })
            .collect(),
    })
}

/// Google Calendar backed by refresh tokens stored with `slotbot auth`.
pub struct GoogleCalendar {
    db: Connection,
    client_id: String,
    client_secret: String,
    oauth_url: String,
    api_url: String,
    calendar_id: String,
    default_timezone: Tz,
}

impl GoogleCalendar {
    pub fn new(db: Connection, config: &AppConfig) -> Self {
        Self {
            db,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            oauth_url: config.google_oauth_url.clone(),
            api_url: config.google_api_url.clone(),
            calendar_id: config.calendar_id.clone(),
            default_timezone: config.timezone.parse().unwrap_or(Tz::UTC),
        }
    }

    async fn access_token(&self, account: &str) -> Result<String, CalendarError> {
        let refresh_token = find_refresh_token(&self.db, account)
            .await
            .map_err(|e| CalendarError::Backend(e.to_string()))?
            .ok_or_else(|| {
                CalendarError::Auth(format!(
                    "No Google credentials for {}. Run `slotbot auth --email {}` first",
                    account, account
                ))
            })?;
        let token = refresh_access_token(
            &self.oauth_url,
            &self.client_id,
            &self.client_secret,
            &refresh_token,
        )
        .await?;
        if let Some(scope) = &token.scope
            && !scope.contains(CALENDAR_SCOPE)
        {
            tracing::warn!("Access token for {} is missing the calendar scope: {}", account, scope);
        }
        Ok(token.access_token)
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn busy_intervals(
        &self,
        account: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>, CalendarError> {
        let access_token = self.access_token(account).await?;
        let busy = query_free_busy(&self.api_url, &access_token, &self.calendar_id, start, end)
            .await?;
        Ok(busy)
    }

    async fn create_event(
        &self,
        account: &str,
        proposal: &BookingProposal,
    ) -> Result<CreatedEvent, BookingError> {
        let event = event_from_proposal(proposal, self.default_timezone)?;
        let access_token = self.access_token(account).await?;
        let inserted = insert_event(&self.api_url, &access_token, &self.calendar_id, &event)
            .await
            .map_err(CalendarError::from)?;

        tracing::info!("Created event {} for {}", inserted.id, account);
        Ok(CreatedEvent {
            event_id: inserted.id,
            html_link: inserted.html_link,
        })
    }

    async fn update_event(
        &self,
        account: &str,
        event_id: &str,
        proposal: &BookingProposal,
    ) -> Result<CreatedEvent, BookingError> {
        let event = event_from_proposal(proposal, self.default_timezone)?;
        let access_token = self.access_token(account).await?;
        let patched = patch_event(
            &self.api_url,
            &access_token,
            &self.calendar_id,
            event_id,
            &event,
        )
        .await
        .map_err(CalendarError::from)?;

        tracing::info!("Updated event {} for {}", patched.id, account);
        Ok(CreatedEvent {
            event_id: patched.id,
            html_link: patched.html_link,
        })
    }
}
