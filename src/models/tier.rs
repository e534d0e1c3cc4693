use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AppError;

/// Plano de assinatura informado pelo colaborador de billing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum SubscriptionTier {
    Free,
    Basic,
    Pro,
}

impl FromStr for SubscriptionTier {
    type Err = AppError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "basic" => Ok(SubscriptionTier::Basic),
            "pro" => Ok(SubscriptionTier::Pro),
            other => Err(AppError::InvalidPlan(format!("Unknown subscription type '{}'", other))),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Basic => "Basic",
            SubscriptionTier::Pro => "Pro",
        };
        write!(f, "{}", name)
    }
}

/// Quantos cards cada plano enxerga (`None` = sem limite)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLimits {
    pub free: Option<usize>,
    pub basic: Option<usize>,
    pub pro: Option<usize>,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            free: Some(8),
            basic: None,
            pro: None,
        }
    }
}

impl TierLimits {
    pub fn limit_for(&self, tier: SubscriptionTier) -> Option<usize> {
        match tier {
            SubscriptionTier::Free => self.free,
            SubscriptionTier::Basic => self.basic,
            SubscriptionTier::Pro => self.pro,
        }
    }
}
