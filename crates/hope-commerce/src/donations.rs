//! Donations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::DonationGateway;
use crate::error::CommerceError;
use crate::ids::{DonationId, UserId};
use crate::money::Money;

/// Generic message when a donation fails without a server explanation.
pub const GENERIC_DONATION_FAILURE: &str = "Donation failed";

/// Payment method used when none is chosen.
pub const DEFAULT_PAYMENT_METHOD: &str = "credit_card";

const MAX_PAYMENT_METHOD_LEN: usize = 50;

/// How often a donation recurs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DonationType {
    #[default]
    OneTime,
    Recurring,
    Monthly,
    Annual,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationType::OneTime => "one-time",
            DonationType::Recurring => "recurring",
            DonationType::Monthly => "monthly",
            DonationType::Annual => "annual",
        }
    }
}

impl fmt::Display for DonationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationType {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one-time" | "one_time" | "onetime" => Ok(DonationType::OneTime),
            "recurring" => Ok(DonationType::Recurring),
            "monthly" => Ok(DonationType::Monthly),
            "annual" => Ok(DonationType::Annual),
            other => Err(CommerceError::ValidationError(format!(
                "unknown donation type: {}",
                other
            ))),
        }
    }
}

/// Body of `POST /donations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub amount: Money,
    pub donation_type: DonationType,
    pub payment_method: String,
}

impl DonationRequest {
    /// A one-time credit card donation of `amount`.
    pub fn new(amount: Money) -> Self {
        Self {
            amount,
            donation_type: DonationType::default(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }

    pub fn with_type(mut self, donation_type: DonationType) -> Self {
        self.donation_type = donation_type;
        self
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = payment_method.into();
        self
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if !self.amount.is_positive() {
            return Err(CommerceError::ValidationError(
                "Please enter a valid amount".to_string(),
            ));
        }
        if self.payment_method.chars().count() > MAX_PAYMENT_METHOD_LEN {
            return Err(CommerceError::ValidationError(format!(
                "payment method must be at most {} characters",
                MAX_PAYMENT_METHOD_LEN
            )));
        }
        Ok(())
    }
}

/// A recorded donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub amount: Money,
    #[serde(default)]
    pub donation_type: Option<DonationType>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// Validate and submit a donation.
///
/// Nothing is sent when validation fails.
pub async fn submit_donation(
    gateway: &dyn DonationGateway,
    request: &DonationRequest,
) -> Result<Donation, CommerceError> {
    request.validate()?;

    match gateway.create_donation(request).await {
        Ok(donation) => {
            tracing::info!(
                donation = %donation.id,
                amount = %donation.amount,
                donation_type = %request.donation_type,
                "donation recorded"
            );
            Ok(donation)
        }
        Err(e) => {
            tracing::warn!(error = %e, "donation failed");
            Err(e.into())
        }
    }
}
