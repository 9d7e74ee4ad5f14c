//! Billing-specific error types.
//!
//! These carry more context than the generic API taxonomy and convert into
//! [`ApiError`] at the handler boundary.

use crate::domain::BillStatus;
use crate::error::ApiError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The bill does not exist, or does not belong to the caller. Both look
    /// identical from the outside so ownership cannot be probed.
    BillNotFound { bill_id: i64 },
    /// The caller has no tenancy record.
    TenantNotFound,
    /// The referenced tenant does not exist (bill issuance).
    UnknownTenant { tenant_id: i64 },
    /// The operation is not valid for the bill's current status. Also
    /// covers a guarded transition lost to a concurrent writer.
    InvalidState { bill_id: i64, status: BillStatus },
    /// Bill amounts must be positive.
    InvalidAmount { amount: i64 },
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BillNotFound { bill_id } => write!(f, "Bill {bill_id} not found"),
            Self::TenantNotFound => write!(f, "No tenancy record for this account"),
            Self::UnknownTenant { tenant_id } => write!(f, "Tenant {tenant_id} not found"),
            Self::InvalidState { bill_id, status } => {
                write!(f, "Bill {bill_id} is {status} and cannot be processed")
            }
            Self::InvalidAmount { amount } => {
                write!(f, "Bill amount must be positive, got {amount}")
            }
        }
    }
}

impl std::error::Error for BillingError {}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::BillNotFound { .. } => ApiError::not_found("bill"),
            BillingError::TenantNotFound => ApiError::not_found("tenant"),
            BillingError::UnknownTenant { .. } => ApiError::not_found("tenant"),
            BillingError::InvalidState { .. } => ApiError::invalid_state(err.to_string()),
            BillingError::InvalidAmount { .. } => ApiError::validation(err.to_string()),
        }
    }
}
