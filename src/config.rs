use std::env;
use std::time::Duration;

use crate::error::DispatchError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub order_queue_size: usize,
    pub event_buffer_size: usize,
    pub dispatch: DispatchSettings,
}

/// Tunables of the dispatch engine itself.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// How long a courier has to accept or reject an offer.
    pub offer_timeout: Duration,
    /// How long a confirmed courier has to reach the pickup.
    pub arrival_deadline: Duration,
    /// Period of the stale-offer sweep.
    pub janitor_period: Duration,
    /// Pending offers older than this are force-reclaimed by the janitor.
    pub stale_offer_max_age: Duration,
    pub search_radius_m: f64,
    pub candidate_cap: usize,
    pub assumed_speed_kmh: f64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            offer_timeout: Duration::from_secs(60),
            arrival_deadline: Duration::from_secs(900),
            janitor_period: Duration::from_secs(30),
            stale_offer_max_age: Duration::from_secs(120),
            search_radius_m: 5_000.0,
            candidate_cap: 50,
            assumed_speed_kmh: 20.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            order_queue_size: parse_or_default("ORDER_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            dispatch: DispatchSettings::from_env()?,
        })
    }
}

impl DispatchSettings {
    pub fn from_env() -> Result<Self, DispatchError> {
        Ok(Self {
            offer_timeout: Duration::from_secs(parse_or_default("OFFER_TIMEOUT_SECS", 60)?),
            arrival_deadline: Duration::from_secs(parse_or_default("ARRIVAL_DEADLINE_SECS", 900)?),
            janitor_period: Duration::from_secs(parse_or_default("JANITOR_PERIOD_SECS", 30)?),
            stale_offer_max_age: Duration::from_secs(parse_or_default(
                "STALE_OFFER_MAX_AGE_SECS",
                120,
            )?),
            search_radius_m: parse_or_default("SEARCH_RADIUS_M", 5_000.0)?,
            candidate_cap: parse_or_default("CANDIDATE_CAP", 50)?,
            assumed_speed_kmh: parse_or_default("ASSUMED_SPEED_KMH", 20.0)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
