pub mod catalog;
pub mod config;
pub mod history;
pub mod inventory;
pub mod models;
pub mod session;
pub mod stores;

pub fn now_utc_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
}
