use std::env;

use crate::google::{DEFAULT_API_URL, DEFAULT_OAUTH_URL};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub llm_api_hostname: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub google_api_url: String,
    pub google_oauth_url: String,
    pub calendar_id: String,
    pub mailersend_api_url: String,
    pub mailersend_api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub slot_window_days: i64,
    pub min_slot_minutes: i64,
    pub max_suggested_slots: usize,
    pub timezone: String,
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", name, value);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("SLOTBOT_STORAGE_PATH").unwrap_or("./".to_string());
        let llm_api_hostname = env::var("SLOTBOT_LLM_HOST")
            .unwrap_or_else(|_| "https://api.groq.com/openai".to_string());
        let llm_api_key =
            env::var("GROQ_API_KEY").unwrap_or_else(|_| "thiswontworkforgroq".to_string());
        let llm_model = env::var("SLOTBOT_LLM_MODEL")
            .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());
        let google_client_id = env::var("SLOTBOT_GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = env::var("SLOTBOT_GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let google_redirect_uri = env::var("SLOTBOT_GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "urn:ietf:wg:oauth:2.0:oob".to_string());
        let google_api_url =
            env::var("SLOTBOT_GOOGLE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let google_oauth_url =
            env::var("SLOTBOT_GOOGLE_OAUTH_URL").unwrap_or_else(|_| DEFAULT_OAUTH_URL.to_string());
        let calendar_id = env::var("SLOTBOT_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());
        let mailersend_api_url = env::var("SLOTBOT_MAILERSEND_URL")
            .unwrap_or_else(|_| "https://api.mailersend.com".to_string());
        let mailersend_api_key = env::var("MAILERSEND_API_KEY").unwrap_or_default();
        let sender_email = env::var("MAILERSEND_SENDER_EMAIL").unwrap_or_default();
        let sender_name = env::var("SLOTBOT_SENDER_NAME").unwrap_or_else(|_| "Slotbot".to_string());

        let timezone = env::var("SLOTBOT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let timezone = if timezone.parse::<chrono_tz::Tz>().is_ok() {
            timezone
        } else {
            tracing::warn!("Unknown timezone {}, using UTC", timezone);
            "UTC".to_string()
        };

        Self {
            storage_path,
            llm_api_hostname,
            llm_api_key,
            llm_model,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            google_api_url,
            google_oauth_url,
            calendar_id,
            mailersend_api_url,
            mailersend_api_key,
            sender_email,
            sender_name,
            slot_window_days: parsed_var("SLOTBOT_SLOT_WINDOW_DAYS", 7),
            min_slot_minutes: parsed_var("SLOTBOT_MIN_SLOT_MINUTES", 30),
            max_suggested_slots: parsed_var("SLOTBOT_MAX_SUGGESTED_SLOTS", 10),
            timezone,
        }
    }
}

impl AppConfig {
    pub fn db_path(&self) -> String {
        format!("{}/db", self.storage_path.trim_end_matches('/'))
    }
}
