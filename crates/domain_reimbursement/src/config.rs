//! Lifecycle engine configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, Currency};

/// What happens when a claim total exceeds the event's budget ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPolicy {
    /// Refuse the claim with `BudgetExceeded`
    #[default]
    Enforce,
    /// Accept the claim and log a warning
    Warn,
}

impl BudgetPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPolicy::Enforce => "enforce",
            BudgetPolicy::Warn => "warn",
        }
    }
}

impl fmt::Display for BudgetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(BudgetPolicy::Enforce),
            "warn" => Ok(BudgetPolicy::Warn),
            other => Err(CoreError::unknown_value("budget policy", other)),
        }
    }
}

/// Settings injected into [`crate::ReimbursementService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Currency every expense amount must be expressed in
    pub currency: Currency,
    pub budget_policy: BudgetPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            currency: Currency::IDR,
            budget_policy: BudgetPolicy::Enforce,
        }
    }
}

impl LifecycleConfig {
    pub fn with_budget_policy(mut self, policy: BudgetPolicy) -> Self {
        self.budget_policy = policy;
        self
    }
}
