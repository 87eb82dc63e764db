//! Retention policy descriptors.
//!
//! Retention expiry is executed by an external, regulator-approved process;
//! these descriptors only declare the horizon and disposal action for each
//! category.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::event::RetentionCategory;

/// What happens when a record's retention horizon expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteAction {
    Archive,
    Anonymize,
    Delete,
}

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub category: RetentionCategory,
    pub retention_period: Duration,
    pub description: &'static str,
    /// Driving regulation (SOX, AML/KYC, GDPR, ...).
    pub regulation: &'static str,
    pub delete_action: DeleteAction,
}

impl RetentionPolicy {
    /// Standard policy for a retention category.
    pub fn standard_for(category: RetentionCategory) -> Self {
        match category {
            RetentionCategory::Standard => Self {
                category,
                retention_period: Duration::days(7 * 365),
                description: "Default retention for audit records",
                regulation: "SOX",
                delete_action: DeleteAction::Archive,
            },
            RetentionCategory::Transaction => Self {
                category,
                retention_period: Duration::days(7 * 365),
                description: "Transaction records for SOX compliance",
                regulation: "SOX",
                delete_action: DeleteAction::Archive,
            },
            RetentionCategory::Kyc => Self {
                category,
                retention_period: Duration::days(7 * 365),
                description: "KYC documents for AML compliance",
                regulation: "AML/KYC",
                delete_action: DeleteAction::Archive,
            },
            RetentionCategory::Login => Self {
                category,
                retention_period: Duration::days(365),
                description: "Login and session events for fraud investigation",
                regulation: "SECURITY",
                delete_action: DeleteAction::Delete,
            },
            RetentionCategory::Report => Self {
                category,
                retention_period: Duration::days(10 * 365),
                description: "Filed compliance reports",
                regulation: "BSA",
                delete_action: DeleteAction::Archive,
            },
            RetentionCategory::DeletedGrace => Self {
                category,
                retention_period: Duration::days(30),
                description: "Right-to-be-forgotten grace period",
                regulation: "GDPR",
                delete_action: DeleteAction::Delete,
            },
        }
    }
}
