//! Domain entities for the boarding house.
//!
//! Status enums carry `as_str`/`FromStr` pairs because the store persists
//! them as text; the serde names are the wire format the API clients see.

use crate::auth::Role;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users
// =============================================================================

/// A registered account. The password hash is never part of this struct;
/// the store hands it out separately for credential checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    /// Absent for admin-created tenants that have not registered.
    pub password_hash: Option<String>,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Rooms
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Standard,
    #[serde(rename = "VIP")]
    Vip,
}

impl RoomType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Vip => "VIP",
        }
    }
}

impl std::str::FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(Self::Standard),
            "VIP" => Ok(Self::Vip),
            other => Err(format!("unknown room type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl RoomStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Occupied => "OCCUPIED",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "OCCUPIED" => Ok(Self::Occupied),
            "MAINTENANCE" => Ok(Self::Maintenance),
            other => Err(format!("unknown room status: {other}")),
        }
    }
}

/// A rentable unit. `number` is the natural key and must be unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub number: String,
    pub room_type: RoomType,
    /// Monthly rate in whole rupiah.
    pub monthly_rate: i64,
    pub status: RoomStatus,
    pub amenities: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub number: String,
    pub room_type: RoomType,
    pub monthly_rate: i64,
    pub amenities: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RoomUpdate {
    pub room_type: Option<RoomType>,
    pub monthly_rate: Option<i64>,
    pub status: Option<RoomStatus>,
    pub amenities: Option<String>,
}

// =============================================================================
// Tenants
// =============================================================================

/// Occupancy record linking a user to (at most) one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub user_id: String,
    pub room_id: Option<i64>,
    pub moved_in_at: DateTime<Utc>,
}

// =============================================================================
// Billing
// =============================================================================

/// Lifecycle of a bill.
///
/// Transitions only move forward: `UNPAID` → `AWAITING_VERIFICATION` →
/// `PAID` or `REJECTED`. Both `PAID` and `REJECTED` are terminal for the
/// bill; a rejected period is recovered by issuing a fresh bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Unpaid,
    AwaitingVerification,
    Paid,
    Rejected,
}

impl BillStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::AwaitingVerification => "AWAITING_VERIFICATION",
            Self::Paid => "PAID",
            Self::Rejected => "REJECTED",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Rejected)
    }
}

impl std::str::FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(Self::Unpaid),
            "AWAITING_VERIFICATION" => Ok(Self::AwaitingVerification),
            "PAID" => Ok(Self::Paid),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown bill status: {other}")),
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A billing period with month granularity, formatted `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range: {month}"));
        }
        if !(2000..=9999).contains(&year) {
            return Err(format!("year out of range: {year}"));
        }
        Ok(Self { year, month })
    }

    /// The period containing the current instant (UTC).
    #[must_use]
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid period (expected YYYY-MM): {s}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid period year: {s}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid period month: {s}"))?;
        Self::new(year, month)
    }
}

impl Serialize for BillingPeriod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingPeriod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A per-period charge owed by a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: i64,
    pub tenant_id: i64,
    pub period: BillingPeriod,
    /// Amount in whole rupiah.
    pub amount: i64,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

/// Proof-of-payment record attached to a bill (at most one).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub bill_id: i64,
    pub proof_url: String,
    /// Subject-id of the verifying admin, once decided.
    pub verified_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    New,
    InProgress,
    Done,
}

impl ReportStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            other => Err(format!("unknown report status: {other}")),
        }
    }
}

/// A tenant-filed maintenance/issue ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub tenant_id: i64,
    pub title: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub photo_url: Option<String>,
}

// =============================================================================
// Settings
// =============================================================================

/// Singleton system configuration record, created on first read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub name: String,
    pub bank_info: String,
    /// Default monthly rate in whole rupiah.
    pub base_rate: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "Pondok".to_string(),
            bank_info: "BCA 0000000000 a.n. Pemilik".to_string(),
            base_rate: 500_000,
        }
    }
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub bank_info: Option<String>,
    pub base_rate: Option<i64>,
}
