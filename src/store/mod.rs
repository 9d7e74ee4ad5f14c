//! Storage abstraction for all persistent entities.
//!
//! [`Store`] is implemented twice: [`SqliteStore`] for production and
//! [`MemoryStore`] for tests and local development. The two billing
//! transition methods, [`Store::attach_payment_proof`] and
//! [`Store::resolve_bill`], are compare-and-swap operations: the write is
//! conditional on the previously-observed status and `Ok(false)` reports a
//! lost race. Callers must treat `false` as an invalid-state outcome, never
//! retry blindly.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::domain::{
    Bill, BillStatus, BillingPeriod, NewReport, NewRoom, NewUser, Payment, ProfileUpdate, Report,
    ReportStatus, Room, RoomType, RoomUpdate, Settings, SettingsUpdate, Tenant, User,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A room together with its current occupant, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomWithOccupant {
    #[serde(flatten)]
    pub room: Room,
    pub occupant: Option<OccupantSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupantSummary {
    pub tenant_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A tenant row for the admin listing, including this period's bill status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOverview {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub room: Option<RoomRef>,
    pub moved_in_at: DateTime<Utc>,
    /// Status of the latest bill in the requested period; tenants with no
    /// bill report `UNPAID`.
    pub payment_status: BillStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub id: i64,
    pub number: String,
    pub room_type: RoomType,
}

/// A bill awaiting verification, joined with tenant and proof detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub bill_id: i64,
    pub period: BillingPeriod,
    pub amount: i64,
    pub status: BillStatus,
    pub tenant_name: String,
    pub tenant_email: String,
    pub tenant_phone: Option<String>,
    pub room_number: Option<String>,
    pub proof_url: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A bill with its payment detail, as shown to the owning tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillWithProof {
    #[serde(flatten)]
    pub bill: Bill,
    pub proof_url: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Context needed to decide a payment and notify the tenant.
#[derive(Debug, Clone)]
pub struct BillContext {
    pub bill: Bill,
    pub tenant_name: String,
    pub tenant_phone: Option<String>,
}

/// A report joined with its reporter, for the admin listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWithTenant {
    #[serde(flatten)]
    pub report: Report,
    pub tenant_name: String,
    pub room_number: Option<String>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub occupied_rooms: i64,
    pub maintenance_rooms: i64,
    pub total_tenants: i64,
    pub pending_payments: i64,
    /// Sum of all PAID bill amounts.
    pub total_revenue: i64,
}

/// Persistent storage for every entity in the system.
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Create a user. Fails with a duplicate error if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up a user and their stored password hash for a login attempt.
    async fn user_credentials(&self, email: &str) -> Result<Option<(User, Option<String>)>>;

    /// Apply a partial profile update. Fails with not-found if absent.
    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<User>;

    // Rooms

    /// Create a room. Fails with a duplicate error if the number is taken.
    async fn create_room(&self, room: NewRoom) -> Result<Room>;

    /// Apply a partial room update. Fails with not-found if absent.
    async fn update_room(&self, id: i64, update: RoomUpdate) -> Result<Room>;

    async fn find_room(&self, id: i64) -> Result<Option<Room>>;

    /// All rooms with occupant summaries, room number ascending.
    async fn list_rooms(&self) -> Result<Vec<RoomWithOccupant>>;

    // Tenants

    /// Create a tenancy for a user, optionally assigning a room.
    ///
    /// When a room is assigned, the room is marked OCCUPIED in the same
    /// transaction (the occupancy side effect shares the tenancy write's
    /// consistency). Fails with not-found if the room does not exist.
    async fn create_tenant(&self, user_id: &str, room_id: Option<i64>) -> Result<Tenant>;

    async fn find_tenant(&self, id: i64) -> Result<Option<Tenant>>;

    async fn find_tenant_by_user(&self, user_id: &str) -> Result<Option<Tenant>>;

    /// All tenants with their bill status for `period`, move-in descending.
    async fn list_tenants(&self, period: BillingPeriod) -> Result<Vec<TenantOverview>>;

    // Bills and payments

    /// Create an UNPAID bill.
    ///
    /// Fails with a duplicate error if a non-REJECTED bill already covers
    /// (tenant, period); a rejected period may be re-billed.
    async fn create_bill(&self, tenant_id: i64, period: BillingPeriod, amount: i64)
        -> Result<Bill>;

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>>;

    /// The latest bill for (tenant, period), with proof detail.
    async fn find_bill_for_period(
        &self,
        tenant_id: i64,
        period: BillingPeriod,
    ) -> Result<Option<BillWithProof>>;

    /// PAID bills for a tenant, period descending.
    async fn list_paid_bills(&self, tenant_id: i64) -> Result<Vec<BillWithProof>>;

    /// Bills in AWAITING_VERIFICATION, creation descending.
    async fn list_pending_verifications(&self) -> Result<Vec<PendingVerification>>;

    async fn find_payment(&self, bill_id: i64) -> Result<Option<Payment>>;

    /// Bill plus tenant context for a verification decision.
    async fn bill_context(&self, bill_id: i64) -> Result<Option<BillContext>>;

    /// Atomically record a payment proof: insert the Payment row and move
    /// the bill UNPAID → AWAITING_VERIFICATION in one transaction.
    ///
    /// The transition is conditional on the bill still being UNPAID;
    /// `Ok(false)` means the guard failed (concurrent submission or a bill
    /// already past UNPAID) and nothing was written.
    async fn attach_payment_proof(&self, bill_id: i64, proof_url: &str) -> Result<bool>;

    /// Atomically resolve a bill awaiting verification to `verdict` (PAID or
    /// REJECTED), annotating the payment with the verifying admin and, when
    /// rejecting, the reason.
    ///
    /// The transition is conditional on AWAITING_VERIFICATION; `Ok(false)`
    /// means the guard failed and nothing was written. A missing Payment row
    /// (data anomaly) does not block the transition — the annotation is
    /// simply skipped.
    async fn resolve_bill(
        &self,
        bill_id: i64,
        verdict: BillStatus,
        verified_by: &str,
        rejection_reason: Option<&str>,
    ) -> Result<bool>;

    // Reports

    async fn create_report(&self, tenant_id: i64, report: NewReport) -> Result<Report>;

    /// A tenant's own reports, creation descending.
    async fn list_reports_for_tenant(&self, tenant_id: i64) -> Result<Vec<Report>>;

    /// All reports with reporter context, creation descending.
    async fn list_reports(&self) -> Result<Vec<ReportWithTenant>>;

    /// Update a report's status. Fails with not-found if absent.
    async fn set_report_status(&self, id: i64, status: ReportStatus) -> Result<Report>;

    // Settings and stats

    /// The singleton settings record, created with defaults on first read.
    async fn settings(&self) -> Result<Settings>;

    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings>;

    async fn stats(&self) -> Result<DashboardStats>;
}
