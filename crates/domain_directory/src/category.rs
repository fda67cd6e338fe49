//! Expense categories
//!
//! The four categories an expense item can belong to. Events switch each one
//! on or off; see [`crate::event::Event::allowed_categories`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Accommodation,
    Transportation,
    Meals,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 4] = [
        ExpenseCategory::Accommodation,
        ExpenseCategory::Transportation,
        ExpenseCategory::Meals,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Transportation => "transportation",
            ExpenseCategory::Meals => "meals",
            ExpenseCategory::Other => "other",
        }
    }

    /// Display label shown on receipts and exports
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Accommodation => "Akomodasi",
            ExpenseCategory::Transportation => "Transportasi",
            ExpenseCategory::Meals => "Konsumsi",
            ExpenseCategory::Other => "Lainnya",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::unknown_value("expense category", s))
    }
}
