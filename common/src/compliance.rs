//! FSSAI food-license deadline tracking.
//!
//! Advisory only: an overdue store stays visible to buyers. Enforcement is
//! left to whoever consumes [`ComplianceStatus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MarketplaceConfig;
use crate::error::{EngineError, Result};
use crate::storefront::Store;

const SECONDS_PER_DAY: i64 = 86_400;
const LICENSE_DIGITS: usize = 14;

/// Where a store stands on its FSSAI certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ComplianceStatus {
    Verified,
    PendingVerification { submitted_at: DateTime<Utc> },
    /// Negative once the deadline has passed.
    Countdown { days_remaining: i64 },
}

impl ComplianceStatus {
    pub fn is_overdue(&self) -> bool {
        matches!(self, ComplianceStatus::Countdown { days_remaining } if *days_remaining < 0)
    }

    /// True when the seller should see a banner asking for the certificate.
    pub fn needs_attention(&self) -> bool {
        matches!(self, ComplianceStatus::Countdown { .. })
    }
}

/// Deadline for submitting the certificate.
pub fn deadline(store: &Store, config: &MarketplaceConfig) -> DateTime<Utc> {
    store.created_at + config.fssai_deadline()
}

/// `deadline_days - floor(days since creation)`.
pub fn days_remaining(store: &Store, now: DateTime<Utc>, config: &MarketplaceConfig) -> i64 {
    let elapsed_days = (now - store.created_at)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY);
    config.fssai_deadline_days - elapsed_days
}

pub fn status(store: &Store, now: DateTime<Utc>, config: &MarketplaceConfig) -> ComplianceStatus {
    if store.fssai_verified {
        return ComplianceStatus::Verified;
    }
    if let Some(submitted_at) = store.fssai_submitted_at {
        return ComplianceStatus::PendingVerification { submitted_at };
    }
    ComplianceStatus::Countdown {
        days_remaining: days_remaining(store, now, config),
    }
}

/// Record a submitted license number. Resubmitting replaces the previous
/// number and clears any earlier verification.
pub fn submit_fssai(store: &mut Store, license_number: &str, now: DateTime<Utc>) -> Result<()> {
    let license_number = license_number.trim();
    if license_number.len() != LICENSE_DIGITS
        || !license_number.chars().all(|c| c.is_ascii_digit())
    {
        return Err(EngineError::InvalidLicenseNumber);
    }

    store.fssai_license = Some(license_number.to_string());
    store.fssai_submitted_at = Some(now);
    store.fssai_verified = false;
    tracing::debug!(store_id = %store.id, "fssai certificate submitted");
    Ok(())
}

pub fn mark_fssai_verified(store: &mut Store) {
    store.fssai_verified = true;
}
