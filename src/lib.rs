pub mod ai;
pub mod api;
pub mod availability;
pub mod calendar;
pub mod cli;
pub mod conversation;
pub mod core;
pub mod google;
pub mod mailer;
pub mod openai;
