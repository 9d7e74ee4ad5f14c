//! In-memory [`Store`] used by tests and local development.
//!
//! A single mutex serializes every operation, which trivially gives the
//! compare-and-swap transitions the same winner-takes-all behavior the
//! SQLite backend gets from conditional updates.

use super::{
    BillContext, BillWithProof, DashboardStats, OccupantSummary, PendingVerification, RoomRef,
    RoomWithOccupant, ReportWithTenant, Store, TenantOverview,
};
use crate::domain::{
    Bill, BillStatus, BillingPeriod, NewReport, NewRoom, NewUser, Payment, ProfileUpdate, Report,
    ReportStatus, Room, RoomStatus, RoomUpdate, Settings, SettingsUpdate, Tenant, User,
};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

#[derive(Clone)]
struct UserRecord {
    user: User,
    password_hash: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    rooms: Vec<Room>,
    tenants: Vec<Tenant>,
    bills: Vec<Bill>,
    payments: Vec<Payment>,
    reports: Vec<Report>,
    settings: Option<Settings>,
    next_room_id: i64,
    next_tenant_id: i64,
    next_bill_id: i64,
    next_payment_id: i64,
    next_report_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|r| r.user.email == user.email) {
            return Err(ApiError::duplicate("email"));
        }
        let record = UserRecord {
            user: User {
                id: user.id,
                email: user.email,
                name: user.name,
                phone: user.phone,
                role: user.role,
                created_at: Utc::now(),
            },
            password_hash: user.password_hash,
        };
        inner.users.push(record.clone());
        Ok(record.user)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|r| r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn user_credentials(&self, email: &str) -> Result<Option<(User, Option<String>)>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|r| r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<User> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or_else(|| ApiError::not_found("user"))?;
        if let Some(name) = update.name {
            record.user.name = name;
        }
        if let Some(phone) = update.phone {
            record.user.phone = Some(phone);
        }
        Ok(record.user.clone())
    }

    async fn create_room(&self, room: NewRoom) -> Result<Room> {
        let mut inner = self.inner.lock().unwrap();
        if inner.rooms.iter().any(|r| r.number == room.number) {
            return Err(ApiError::duplicate("room number"));
        }
        let id = next_id(&mut inner.next_room_id);
        let room = Room {
            id,
            number: room.number,
            room_type: room.room_type,
            monthly_rate: room.monthly_rate,
            status: RoomStatus::Available,
            amenities: room.amenities,
        };
        inner.rooms.push(room.clone());
        Ok(room)
    }

    async fn update_room(&self, id: i64, update: RoomUpdate) -> Result<Room> {
        let mut inner = self.inner.lock().unwrap();
        let room = inner
            .rooms
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::not_found("room"))?;
        if let Some(room_type) = update.room_type {
            room.room_type = room_type;
        }
        if let Some(rate) = update.monthly_rate {
            room.monthly_rate = rate;
        }
        if let Some(status) = update.status {
            room.status = status;
        }
        if let Some(amenities) = update.amenities {
            room.amenities = Some(amenities);
        }
        Ok(room.clone())
    }

    async fn find_room(&self, id: i64) -> Result<Option<Room>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<RoomWithOccupant>> {
        let inner = self.inner.lock().unwrap();
        let mut rooms: Vec<RoomWithOccupant> = inner
            .rooms
            .iter()
            .map(|room| {
                let occupant = inner
                    .tenants
                    .iter()
                    .find(|t| t.room_id == Some(room.id))
                    .and_then(|t| {
                        inner
                            .users
                            .iter()
                            .find(|r| r.user.id == t.user_id)
                            .map(|r| OccupantSummary {
                                tenant_id: t.id,
                                name: r.user.name.clone(),
                                email: r.user.email.clone(),
                                phone: r.user.phone.clone(),
                            })
                    });
                RoomWithOccupant {
                    room: room.clone(),
                    occupant,
                }
            })
            .collect();
        rooms.sort_by(|a, b| a.room.number.cmp(&b.room.number));
        Ok(rooms)
    }

    async fn create_tenant(&self, user_id: &str, room_id: Option<i64>) -> Result<Tenant> {
        let mut inner = self.inner.lock().unwrap();
        if inner.tenants.iter().any(|t| t.user_id == user_id) {
            return Err(ApiError::duplicate("tenant"));
        }
        if let Some(room_id) = room_id {
            let room = inner
                .rooms
                .iter_mut()
                .find(|r| r.id == room_id)
                .ok_or_else(|| ApiError::not_found("room"))?;
            room.status = RoomStatus::Occupied;
        }
        let id = next_id(&mut inner.next_tenant_id);
        let tenant = Tenant {
            id,
            user_id: user_id.to_string(),
            room_id,
            moved_in_at: Utc::now(),
        };
        inner.tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn find_tenant(&self, id: i64) -> Result<Option<Tenant>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tenant_by_user(&self, user_id: &str) -> Result<Option<Tenant>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tenants.iter().find(|t| t.user_id == user_id).cloned())
    }

    async fn list_tenants(&self, period: BillingPeriod) -> Result<Vec<TenantOverview>> {
        let inner = self.inner.lock().unwrap();
        let mut tenants: Vec<TenantOverview> = inner
            .tenants
            .iter()
            .filter_map(|tenant| {
                let record = inner.users.iter().find(|r| r.user.id == tenant.user_id)?;
                let room = tenant.room_id.and_then(|room_id| {
                    inner.rooms.iter().find(|r| r.id == room_id).map(|r| RoomRef {
                        id: r.id,
                        number: r.number.clone(),
                        room_type: r.room_type,
                    })
                });
                let payment_status = inner
                    .bills
                    .iter()
                    .filter(|b| b.tenant_id == tenant.id && b.period == period)
                    .max_by_key(|b| b.id)
                    .map(|b| b.status)
                    .unwrap_or(BillStatus::Unpaid);
                Some(TenantOverview {
                    id: tenant.id,
                    user_id: tenant.user_id.clone(),
                    name: record.user.name.clone(),
                    email: record.user.email.clone(),
                    phone: record.user.phone.clone(),
                    room,
                    moved_in_at: tenant.moved_in_at,
                    payment_status,
                })
            })
            .collect();
        tenants.sort_by(|a, b| b.moved_in_at.cmp(&a.moved_in_at));
        Ok(tenants)
    }

    async fn create_bill(
        &self,
        tenant_id: i64,
        period: BillingPeriod,
        amount: i64,
    ) -> Result<Bill> {
        let mut inner = self.inner.lock().unwrap();
        let exists = inner.bills.iter().any(|b| {
            b.tenant_id == tenant_id && b.period == period && b.status != BillStatus::Rejected
        });
        if exists {
            return Err(ApiError::duplicate("bill for this period"));
        }
        let id = next_id(&mut inner.next_bill_id);
        let bill = Bill {
            id,
            tenant_id,
            period,
            amount,
            status: BillStatus::Unpaid,
            created_at: Utc::now(),
        };
        inner.bills.push(bill.clone());
        Ok(bill)
    }

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bills.iter().find(|b| b.id == id).cloned())
    }

    async fn find_bill_for_period(
        &self,
        tenant_id: i64,
        period: BillingPeriod,
    ) -> Result<Option<BillWithProof>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bills
            .iter()
            .filter(|b| b.tenant_id == tenant_id && b.period == period)
            .max_by_key(|b| b.id)
            .map(|bill| with_proof(&inner, bill)))
    }

    async fn list_paid_bills(&self, tenant_id: i64) -> Result<Vec<BillWithProof>> {
        let inner = self.inner.lock().unwrap();
        let mut bills: Vec<BillWithProof> = inner
            .bills
            .iter()
            .filter(|b| b.tenant_id == tenant_id && b.status == BillStatus::Paid)
            .map(|bill| with_proof(&inner, bill))
            .collect();
        bills.sort_by(|a, b| b.bill.period.cmp(&a.bill.period));
        Ok(bills)
    }

    async fn list_pending_verifications(&self) -> Result<Vec<PendingVerification>> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<PendingVerification> = inner
            .bills
            .iter()
            .filter(|b| b.status == BillStatus::AwaitingVerification)
            .filter_map(|bill| {
                let tenant = inner.tenants.iter().find(|t| t.id == bill.tenant_id)?;
                let record = inner.users.iter().find(|r| r.user.id == tenant.user_id)?;
                let room_number = tenant.room_id.and_then(|room_id| {
                    inner
                        .rooms
                        .iter()
                        .find(|r| r.id == room_id)
                        .map(|r| r.number.clone())
                });
                let payment = inner.payments.iter().find(|p| p.bill_id == bill.id);
                Some(PendingVerification {
                    bill_id: bill.id,
                    period: bill.period,
                    amount: bill.amount,
                    status: bill.status,
                    tenant_name: record.user.name.clone(),
                    tenant_email: record.user.email.clone(),
                    tenant_phone: record.user.phone.clone(),
                    room_number,
                    proof_url: payment.map(|p| p.proof_url.clone()),
                    submitted_at: payment.map(|p| p.submitted_at),
                })
            })
            .collect();
        pending.sort_by(|a, b| b.bill_id.cmp(&a.bill_id));
        Ok(pending)
    }

    async fn find_payment(&self, bill_id: i64) -> Result<Option<Payment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.payments.iter().find(|p| p.bill_id == bill_id).cloned())
    }

    async fn bill_context(&self, bill_id: i64) -> Result<Option<BillContext>> {
        let inner = self.inner.lock().unwrap();
        let Some(bill) = inner.bills.iter().find(|b| b.id == bill_id) else {
            return Ok(None);
        };
        let Some(tenant) = inner.tenants.iter().find(|t| t.id == bill.tenant_id) else {
            return Ok(None);
        };
        let Some(record) = inner.users.iter().find(|r| r.user.id == tenant.user_id) else {
            return Ok(None);
        };
        Ok(Some(BillContext {
            bill: bill.clone(),
            tenant_name: record.user.name.clone(),
            tenant_phone: record.user.phone.clone(),
        }))
    }

    async fn attach_payment_proof(&self, bill_id: i64, proof_url: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let payment_id = next_id(&mut inner.next_payment_id);
        let Some(bill) = inner.bills.iter_mut().find(|b| b.id == bill_id) else {
            return Ok(false);
        };
        if bill.status != BillStatus::Unpaid {
            return Ok(false);
        }
        bill.status = BillStatus::AwaitingVerification;
        inner.payments.push(Payment {
            id: payment_id,
            bill_id,
            proof_url: proof_url.to_string(),
            verified_by: None,
            rejection_reason: None,
            submitted_at: Utc::now(),
        });
        Ok(true)
    }

    async fn resolve_bill(
        &self,
        bill_id: i64,
        verdict: BillStatus,
        verified_by: &str,
        rejection_reason: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(bill) = inner.bills.iter_mut().find(|b| b.id == bill_id) else {
            return Ok(false);
        };
        if bill.status != BillStatus::AwaitingVerification {
            return Ok(false);
        }
        bill.status = verdict;
        // A payment row may be missing on anomalous data; the annotation is
        // best-effort and never blocks the transition.
        if let Some(payment) = inner.payments.iter_mut().find(|p| p.bill_id == bill_id) {
            payment.verified_by = Some(verified_by.to_string());
            payment.rejection_reason = rejection_reason.map(str::to_string);
        }
        Ok(true)
    }

    async fn create_report(&self, tenant_id: i64, report: NewReport) -> Result<Report> {
        let mut inner = self.inner.lock().unwrap();
        let id = next_id(&mut inner.next_report_id);
        let now = Utc::now();
        let report = Report {
            id,
            tenant_id,
            title: report.title,
            description: report.description,
            photo_url: report.photo_url,
            status: ReportStatus::New,
            created_at: now,
            updated_at: now,
        };
        inner.reports.push(report.clone());
        Ok(report)
    }

    async fn list_reports_for_tenant(&self, tenant_id: i64) -> Result<Vec<Report>> {
        let inner = self.inner.lock().unwrap();
        let mut reports: Vec<Report> = inner
            .reports
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn list_reports(&self) -> Result<Vec<ReportWithTenant>> {
        let inner = self.inner.lock().unwrap();
        let mut reports: Vec<ReportWithTenant> = inner
            .reports
            .iter()
            .filter_map(|report| {
                let tenant = inner.tenants.iter().find(|t| t.id == report.tenant_id)?;
                let record = inner.users.iter().find(|r| r.user.id == tenant.user_id)?;
                let room_number = tenant.room_id.and_then(|room_id| {
                    inner
                        .rooms
                        .iter()
                        .find(|r| r.id == room_id)
                        .map(|r| r.number.clone())
                });
                Some(ReportWithTenant {
                    report: report.clone(),
                    tenant_name: record.user.name.clone(),
                    room_number,
                })
            })
            .collect();
        reports.sort_by(|a, b| b.report.created_at.cmp(&a.report.created_at));
        Ok(reports)
    }

    async fn set_report_status(&self, id: i64, status: ReportStatus) -> Result<Report> {
        let mut inner = self.inner.lock().unwrap();
        let report = inner
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::not_found("report"))?;
        report.status = status;
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn settings(&self) -> Result<Settings> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.settings.get_or_insert_with(Settings::default).clone())
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let mut inner = self.inner.lock().unwrap();
        let settings = inner.settings.get_or_insert_with(Settings::default);
        if let Some(name) = update.name {
            settings.name = name;
        }
        if let Some(bank_info) = update.bank_info {
            settings.bank_info = bank_info;
        }
        if let Some(base_rate) = update.base_rate {
            settings.base_rate = base_rate;
        }
        Ok(settings.clone())
    }

    async fn stats(&self) -> Result<DashboardStats> {
        let inner = self.inner.lock().unwrap();
        let count_rooms =
            |status: RoomStatus| inner.rooms.iter().filter(|r| r.status == status).count() as i64;
        Ok(DashboardStats {
            total_rooms: inner.rooms.len() as i64,
            available_rooms: count_rooms(RoomStatus::Available),
            occupied_rooms: count_rooms(RoomStatus::Occupied),
            maintenance_rooms: count_rooms(RoomStatus::Maintenance),
            total_tenants: inner.tenants.len() as i64,
            pending_payments: inner
                .bills
                .iter()
                .filter(|b| b.status == BillStatus::AwaitingVerification)
                .count() as i64,
            total_revenue: inner
                .bills
                .iter()
                .filter(|b| b.status == BillStatus::Paid)
                .map(|b| b.amount)
                .sum(),
        })
    }
}

fn with_proof(inner: &Inner, bill: &Bill) -> BillWithProof {
    let payment = inner.payments.iter().find(|p| p.bill_id == bill.id);
    BillWithProof {
        bill: bill.clone(),
        proof_url: payment.map(|p| p.proof_url.clone()),
        submitted_at: payment.map(|p| p.submitted_at),
    }
}
