use crate::error::{CoreError, CoreResult};
use crate::evidence::aggregator::{
    AggregationOptions, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_FRESHNESS_DAYS, DEFAULT_WORKERS,
};
use crate::sink::interface::DEFAULT_LINK_EXPIRY_DAYS;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime};

pub const ENV_ASSESSMENT_ID: &str = "ASSESSMENT_ID";
pub const ENV_DESTINATION: &str = "REPORT_DESTINATION";
pub const ENV_DESTINATION_LEGACY: &str = "S3_BUCKET";
pub const ENV_RECIPIENTS: &str = "REPORT_RECIPIENTS";
pub const ENV_SENDER: &str = "SENDER_EMAIL";
pub const ENV_FRESHNESS_DAYS: &str = "EVIDENCE_FRESHNESS_DAYS";
pub const ENV_LINK_EXPIRY_DAYS: &str = "REPORT_LINK_EXPIRY_DAYS";
pub const ENV_WORKERS: &str = "EVIDENCE_WORKERS";
pub const ENV_CALL_TIMEOUT_MS: &str = "SOURCE_CALL_TIMEOUT_MS";

pub const MAX_WINDOW_DAYS: i64 = 3650;

const EMAIL_PATTERN: &str = r"^[^@\s,;]+@[^@\s,;]+\.[^@\s,;]+$";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    pub assessment_id: String,
    pub destination: String,
    pub recipients: Vec<String>,
    pub sender: String,
    pub freshness_days: i64,
    pub link_expiry_days: i64,
    pub workers: usize,
    pub call_timeout_ms: u64,
}

impl ReportConfig {
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| CoreError::Config(format!("{} must be set", key)))
        };

        let email = Regex::new(EMAIL_PATTERN)
            .map_err(|e| CoreError::Config(format!("email pattern: {}", e)))?;

        let destination = get(ENV_DESTINATION)
            .or_else(|| get(ENV_DESTINATION_LEGACY))
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "{} (or {}) must be set",
                    ENV_DESTINATION, ENV_DESTINATION_LEGACY
                ))
            })?;

        let recipients: Vec<String> = required(ENV_RECIPIENTS)?
            .split(',')
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(CoreError::Config(format!(
                "{} must list at least one address",
                ENV_RECIPIENTS
            )));
        }
        if let Some(bad) = recipients.iter().find(|r| !email.is_match(r)) {
            return Err(CoreError::Config(format!("invalid recipient address {:?}", bad)));
        }

        let sender = required(ENV_SENDER)?;
        if !email.is_match(&sender) {
            return Err(CoreError::Config(format!("invalid sender address {:?}", sender)));
        }

        Ok(Self {
            assessment_id: required(ENV_ASSESSMENT_ID)?,
            destination,
            recipients,
            sender,
            freshness_days: day_count(
                get(ENV_FRESHNESS_DAYS),
                ENV_FRESHNESS_DAYS,
                DEFAULT_FRESHNESS_DAYS,
            )?,
            link_expiry_days: day_count(
                get(ENV_LINK_EXPIRY_DAYS),
                ENV_LINK_EXPIRY_DAYS,
                DEFAULT_LINK_EXPIRY_DAYS,
            )?,
            workers: positive(get(ENV_WORKERS), ENV_WORKERS, DEFAULT_WORKERS)?,
            call_timeout_ms: positive(
                get(ENV_CALL_TIMEOUT_MS),
                ENV_CALL_TIMEOUT_MS,
                DEFAULT_CALL_TIMEOUT_MS,
            )?,
        })
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::days(self.freshness_days)
    }

    pub fn link_expiry(&self) -> Duration {
        Duration::days(self.link_expiry_days)
    }

    pub fn aggregation_options(&self, run_time: OffsetDateTime) -> AggregationOptions {
        AggregationOptions {
            run_time,
            freshness_window: self.freshness_window(),
            workers: self.workers,
            call_timeout: StdDuration::from_millis(self.call_timeout_ms),
        }
    }
}

fn day_count(raw: Option<String>, key: &str, default: i64) -> CoreResult<i64> {
    let days = positive(raw, key, default)?;
    if days > MAX_WINDOW_DAYS {
        return Err(CoreError::Config(format!(
            "{} must be at most {} days, got {}",
            key, MAX_WINDOW_DAYS, days
        )));
    }
    Ok(days)
}

fn positive<T>(raw: Option<String>, key: &str, default: T) -> CoreResult<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(CoreError::Config(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}
