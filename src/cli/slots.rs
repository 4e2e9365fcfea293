use anyhow::{Result, anyhow};
use chrono::{Duration, DurationRound, Utc};
use chrono_tz::Tz;

use crate::availability::{AvailabilityQuery, compute_free_slots, days_after};
use crate::calendar::{CalendarBackend, GoogleCalendar};
use crate::core::AppConfig;
use crate::core::db::async_db;

pub async fn run(
    email: &str,
    days: Option<i64>,
    min_minutes: Option<i64>,
    config: &AppConfig,
) -> Result<()> {
    super::init_logging();

    let now = Utc::now();
    let start = now.duration_trunc(Duration::minutes(1)).unwrap_or(now);
    let days = days.unwrap_or(config.slot_window_days);
    let end = days_after(start, days).ok_or_else(|| anyhow!("--days is out of range: {}", days))?;
    let query = AvailabilityQuery::new(start, end, min_minutes.unwrap_or(config.min_slot_minutes));
    query.validate()?;

    let db = async_db(&config.db_path()).await?;
    let calendar = GoogleCalendar::new(db, config);
    let busy = calendar.busy_intervals(email, start, end).await?;
    let free = compute_free_slots(&busy, &query)?;

    let tz: Tz = config.timezone.parse().unwrap_or(Tz::UTC);
    if free.is_empty() {
        println!("No free slots found.");
    }
    for slot in free {
        println!(
            "{} - {} ({} minutes)",
            slot.start.with_timezone(&tz).format("%a %Y-%m-%d %H:%M"),
            slot.end.with_timezone(&tz).format("%a %Y-%m-%d %H:%M"),
            slot.duration().num_minutes()
        );
    }
    Ok(())
}
