use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunable constants of the marketplace engine.
///
/// Every key has a default, so partial JSON or a sparse environment only
/// overrides what it names. Both loaders run [`MarketplaceConfig::validate`];
/// hand-built configs should too, since the duration accessors assume it
/// passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// How long a seller has to accept a pending order.
    pub pending_order_ttl_minutes: i64,
    /// How long chat stays open after an order is completed.
    pub chat_window_hours: i64,
    pub default_radius_km: f64,
    /// Flat surcharge added to delivery orders, in the smallest currency unit.
    pub delivery_fee: u64,
    pub fssai_deadline_days: i64,
    pub subscription_grace_days: i64,
    /// Charged when a buyer cancels an order the seller already accepted.
    pub buyer_cancellation_charge: u64,
    /// Optional evening cutoff for seller acceptance. Disabled by default.
    pub acceptance_cutoff: Option<AcceptanceCutoff>,
}

/// Sellers are not expected to answer between `cutoff_hour` and the next
/// day's `resume_hour` (local time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceCutoff {
    pub cutoff_hour: u32,
    pub resume_hour: u32,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            pending_order_ttl_minutes: 60,
            chat_window_hours: 4,
            default_radius_km: 2.0,
            delivery_fee: 30,
            fssai_deadline_days: 15,
            subscription_grace_days: 7,
            buyer_cancellation_charge: 50,
            acceptance_cutoff: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

const MAX_PENDING_ORDER_TTL_MINUTES: i64 = 7 * 24 * 60;
const MAX_CHAT_WINDOW_HOURS: i64 = 30 * 24;
const MAX_POLICY_DAYS: i64 = 366;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

impl MarketplaceConfig {
    pub fn pending_order_ttl(&self) -> Duration {
        Duration::minutes(self.pending_order_ttl_minutes)
    }

    pub fn chat_window(&self) -> Duration {
        Duration::hours(self.chat_window_hours)
    }

    pub fn fssai_deadline(&self) -> Duration {
        Duration::days(self.fssai_deadline_days)
    }

    pub fn subscription_grace(&self) -> Duration {
        Duration::days(self.subscription_grace_days)
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidValue("json".to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let pending_order_ttl_minutes = parse_or(
            &env_map,
            "FOODAMBO_PENDING_ORDER_TTL_MINUTES",
            defaults.pending_order_ttl_minutes,
        )?;
        let chat_window_hours = parse_or(
            &env_map,
            "FOODAMBO_CHAT_WINDOW_HOURS",
            defaults.chat_window_hours,
        )?;
        let default_radius_km = parse_or(
            &env_map,
            "FOODAMBO_DEFAULT_RADIUS_KM",
            defaults.default_radius_km,
        )?;
        let delivery_fee = parse_or(&env_map, "FOODAMBO_DELIVERY_FEE", defaults.delivery_fee)?;
        let fssai_deadline_days = parse_or(
            &env_map,
            "FOODAMBO_FSSAI_DEADLINE_DAYS",
            defaults.fssai_deadline_days,
        )?;
        let subscription_grace_days = parse_or(
            &env_map,
            "FOODAMBO_SUBSCRIPTION_GRACE_DAYS",
            defaults.subscription_grace_days,
        )?;
        let buyer_cancellation_charge = parse_or(
            &env_map,
            "FOODAMBO_BUYER_CANCELLATION_CHARGE",
            defaults.buyer_cancellation_charge,
        )?;
        let acceptance_cutoff = parse_cutoff(&env_map)?;

        let config = MarketplaceConfig {
            pending_order_ttl_minutes,
            chat_window_hours,
            default_radius_km,
            delivery_fee,
            fssai_deadline_days,
            subscription_grace_days,
            buyer_cancellation_charge,
            acceptance_cutoff,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with: non-positive TTL or radius,
    /// durations too large to add to a timestamp, and clock hours outside a day.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "pending_order_ttl_minutes",
            self.pending_order_ttl_minutes,
            1,
            MAX_PENDING_ORDER_TTL_MINUTES,
        )?;
        check_range(
            "chat_window_hours",
            self.chat_window_hours,
            0,
            MAX_CHAT_WINDOW_HOURS,
        )?;
        check_range(
            "fssai_deadline_days",
            self.fssai_deadline_days,
            1,
            MAX_POLICY_DAYS,
        )?;
        check_range(
            "subscription_grace_days",
            self.subscription_grace_days,
            0,
            MAX_POLICY_DAYS,
        )?;
        if !(self.default_radius_km.is_finite() && self.default_radius_km > 0.0) {
            return Err(ConfigError::InvalidValue(
                "default_radius_km".to_string(),
                "must be a positive number".to_string(),
            ));
        }
        if let Some(cutoff) = self.acceptance_cutoff {
            if cutoff.cutoff_hour >= 24 || cutoff.resume_hour >= 24 {
                return Err(ConfigError::InvalidValue(
                    "acceptance_cutoff".to_string(),
                    "hours must be below 24".to_string(),
                ));
            }
            check_range(
                "acceptance_cutoff.utc_offset_minutes",
                i64::from(cutoff.utc_offset_minutes),
                -i64::from(MAX_UTC_OFFSET_MINUTES),
                i64::from(MAX_UTC_OFFSET_MINUTES),
            )?;
        }
        Ok(())
    }
}

fn check_range(key: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between {min} and {max}, got {value}"),
        ))
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse {raw:?}"))
        }),
    }
}

/// `FOODAMBO_ACCEPTANCE_CUTOFF` is `"<cutoff_hour>-<resume_hour>"`, e.g. `"21-10"`.
fn parse_cutoff(
    env_map: &HashMap<String, String>,
) -> Result<Option<AcceptanceCutoff>, ConfigError> {
    const KEY: &str = "FOODAMBO_ACCEPTANCE_CUTOFF";
    let Some(raw) = env_map.get(KEY) else {
        return Ok(None);
    };
    let invalid = || {
        ConfigError::InvalidValue(
            KEY.to_string(),
            format!("must look like 21-10, got {raw:?}"),
        )
    };
    let (cutoff, resume) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let cutoff_hour: u32 = cutoff.trim().parse().map_err(|_| invalid())?;
    let resume_hour: u32 = resume.trim().parse().map_err(|_| invalid())?;
    let utc_offset_minutes = parse_or(env_map, "FOODAMBO_UTC_OFFSET_MINUTES", 0i32)?;

    Ok(Some(AcceptanceCutoff {
        cutoff_hour,
        resume_hour,
        utc_offset_minutes,
    }))
}
