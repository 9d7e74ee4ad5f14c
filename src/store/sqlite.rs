//! SQLite-backed [`Store`] implementation.
//!
//! Uses runtime-bound queries throughout. The billing transitions are
//! expressed as conditional updates (`UPDATE … WHERE status = ?`) and the
//! affected-row count decides the winner under concurrency; the payment
//! insert/annotation rides in the same transaction.

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
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        phone TEXT,
        role TEXT NOT NULL,
        password_hash TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        number TEXT NOT NULL UNIQUE,
        room_type TEXT NOT NULL,
        monthly_rate INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'AVAILABLE',
        amenities TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tenants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
        room_id INTEGER REFERENCES rooms(id),
        moved_in_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS bills (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL REFERENCES tenants(id),
        period TEXT NOT NULL,
        amount INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'UNPAID',
        created_at TEXT NOT NULL
    )",
    // A rejected period may be re-billed; uniqueness covers live bills only.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_bills_live_period
        ON bills(tenant_id, period) WHERE status != 'REJECTED'",
    "CREATE TABLE IF NOT EXISTS payments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bill_id INTEGER NOT NULL UNIQUE REFERENCES bills(id),
        proof_url TEXT NOT NULL,
        verified_by TEXT,
        rejection_reason TEXT,
        submitted_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL REFERENCES tenants(id),
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        photo_url TEXT,
        status TEXT NOT NULL DEFAULT 'NEW',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        name TEXT NOT NULL,
        bank_info TEXT NOT NULL,
        base_rate INTEGER NOT NULL
    )",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_enum<T>(value: String) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| ApiError::internal(format!("corrupt row: {e}")))
}

fn parse_period(value: String) -> Result<BillingPeriod> {
    value
        .parse()
        .map_err(|e: String| ApiError::internal(format!("corrupt row: {e}")))
}

fn map_unique(err: sqlx::Error, entity: &str) -> ApiError {
    match &err {
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            ApiError::duplicate(entity)
        }
        _ => ApiError::Database(err),
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        role: parse_enum(row.try_get::<String, _>("role")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn room_from_row(row: &SqliteRow) -> Result<Room> {
    Ok(Room {
        id: row.try_get("id")?,
        number: row.try_get("number")?,
        room_type: parse_enum(row.try_get::<String, _>("room_type")?)?,
        monthly_rate: row.try_get("monthly_rate")?,
        status: parse_enum(row.try_get::<String, _>("status")?)?,
        amenities: row.try_get("amenities")?,
    })
}

fn tenant_from_row(row: &SqliteRow) -> Result<Tenant> {
    Ok(Tenant {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        room_id: row.try_get("room_id")?,
        moved_in_at: row.try_get("moved_in_at")?,
    })
}

fn bill_from_row(row: &SqliteRow) -> Result<Bill> {
    Ok(Bill {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        period: parse_period(row.try_get::<String, _>("period")?)?,
        amount: row.try_get("amount")?,
        status: parse_enum(row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<Payment> {
    Ok(Payment {
        id: row.try_get("id")?,
        bill_id: row.try_get("bill_id")?,
        proof_url: row.try_get("proof_url")?,
        verified_by: row.try_get("verified_by")?,
        rejection_reason: row.try_get("rejection_reason")?,
        submitted_at: row.try_get("submitted_at")?,
    })
}

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    Ok(Report {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        photo_url: row.try_get("photo_url")?,
        status: parse_enum(row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, email, name, phone, role, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "email"))?;

        Ok(User {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
            created_at,
        })
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, name, phone, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, name, phone, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_credentials(&self, email: &str) -> Result<Option<(User, Option<String>)>> {
        let row = sqlx::query(
            "SELECT id, email, name, phone, role, password_hash, created_at
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = user_from_row(&row)?;
                let hash: Option<String> = row.try_get("password_hash")?;
                Ok(Some((user, hash)))
            }
            None => Ok(None),
        }
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<User> {
        let current = self
            .find_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found("user"))?;

        let name = update.name.unwrap_or_else(|| current.name.clone());
        let phone = update.phone.or_else(|| current.phone.clone());

        sqlx::query("UPDATE users SET name = ?, phone = ? WHERE id = ?")
            .bind(&name)
            .bind(&phone)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(User {
            name,
            phone,
            ..current
        })
    }

    async fn create_room(&self, room: NewRoom) -> Result<Room> {
        let result = sqlx::query(
            "INSERT INTO rooms (number, room_type, monthly_rate, status, amenities)
             VALUES (?, ?, ?, 'AVAILABLE', ?)",
        )
        .bind(&room.number)
        .bind(room.room_type.as_str())
        .bind(room.monthly_rate)
        .bind(&room.amenities)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "room number"))?;

        Ok(Room {
            id: result.last_insert_rowid(),
            number: room.number,
            room_type: room.room_type,
            monthly_rate: room.monthly_rate,
            status: RoomStatus::Available,
            amenities: room.amenities,
        })
    }

    async fn update_room(&self, id: i64, update: RoomUpdate) -> Result<Room> {
        let current = self
            .find_room(id)
            .await?
            .ok_or_else(|| ApiError::not_found("room"))?;

        let room = Room {
            room_type: update.room_type.unwrap_or(current.room_type),
            monthly_rate: update.monthly_rate.unwrap_or(current.monthly_rate),
            status: update.status.unwrap_or(current.status),
            amenities: update.amenities.or_else(|| current.amenities.clone()),
            ..current
        };

        sqlx::query(
            "UPDATE rooms SET room_type = ?, monthly_rate = ?, status = ?, amenities = ?
             WHERE id = ?",
        )
        .bind(room.room_type.as_str())
        .bind(room.monthly_rate)
        .bind(room.status.as_str())
        .bind(&room.amenities)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(room)
    }

    async fn find_room(&self, id: i64) -> Result<Option<Room>> {
        let row = sqlx::query(
            "SELECT id, number, room_type, monthly_rate, status, amenities
             FROM rooms WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(room_from_row).transpose()
    }

    async fn list_rooms(&self) -> Result<Vec<RoomWithOccupant>> {
        let rows = sqlx::query(
            "SELECT r.id, r.number, r.room_type, r.monthly_rate, r.status, r.amenities,
                    t.id AS tenant_id, u.name AS occupant_name,
                    u.email AS occupant_email, u.phone AS occupant_phone
             FROM rooms r
             LEFT JOIN tenants t ON t.room_id = r.id
             LEFT JOIN users u ON u.id = t.user_id
             ORDER BY r.number ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let room = room_from_row(row)?;
                let tenant_id: Option<i64> = row.try_get("tenant_id")?;
                let occupant = match tenant_id {
                    Some(tenant_id) => Some(OccupantSummary {
                        tenant_id,
                        name: row.try_get("occupant_name")?,
                        email: row.try_get("occupant_email")?,
                        phone: row.try_get("occupant_phone")?,
                    }),
                    None => None,
                };
                Ok(RoomWithOccupant { room, occupant })
            })
            .collect()
    }

    async fn create_tenant(&self, user_id: &str, room_id: Option<i64>) -> Result<Tenant> {
        let mut tx = self.pool.begin().await?;

        if let Some(room_id) = room_id {
            let room = sqlx::query("SELECT id FROM rooms WHERE id = ?")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?;
            if room.is_none() {
                return Err(ApiError::not_found("room"));
            }
            sqlx::query("UPDATE rooms SET status = 'OCCUPIED' WHERE id = ?")
                .bind(room_id)
                .execute(&mut *tx)
                .await?;
        }

        let moved_in_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tenants (user_id, room_id, moved_in_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(room_id)
        .bind(moved_in_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "tenant"))?;

        tx.commit().await?;

        Ok(Tenant {
            id: result.last_insert_rowid(),
            user_id: user_id.to_string(),
            room_id,
            moved_in_at,
        })
    }

    async fn find_tenant(&self, id: i64) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT id, user_id, room_id, moved_in_at FROM tenants WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn find_tenant_by_user(&self, user_id: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query(
            "SELECT id, user_id, room_id, moved_in_at FROM tenants WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn list_tenants(&self, period: BillingPeriod) -> Result<Vec<TenantOverview>> {
        let rows = sqlx::query(
            "SELECT t.id, t.user_id, t.moved_in_at, u.name, u.email, u.phone,
                    r.id AS room_id, r.number AS room_number, r.room_type AS room_type,
                    (SELECT b.status FROM bills b
                     WHERE b.tenant_id = t.id AND b.period = ?
                     ORDER BY b.id DESC LIMIT 1) AS bill_status
             FROM tenants t
             JOIN users u ON u.id = t.user_id
             LEFT JOIN rooms r ON r.id = t.room_id
             ORDER BY t.moved_in_at DESC",
        )
        .bind(period.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let room_id: Option<i64> = row.try_get("room_id")?;
                let room = match room_id {
                    Some(id) => Some(RoomRef {
                        id,
                        number: row.try_get("room_number")?,
                        room_type: parse_enum(row.try_get::<String, _>("room_type")?)?,
                    }),
                    None => None,
                };
                let payment_status = match row.try_get::<Option<String>, _>("bill_status")? {
                    Some(status) => parse_enum(status)?,
                    None => BillStatus::Unpaid,
                };
                Ok(TenantOverview {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    phone: row.try_get("phone")?,
                    room,
                    moved_in_at: row.try_get("moved_in_at")?,
                    payment_status,
                })
            })
            .collect()
    }

    async fn create_bill(
        &self,
        tenant_id: i64,
        period: BillingPeriod,
        amount: i64,
    ) -> Result<Bill> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO bills (tenant_id, period, amount, status, created_at)
             VALUES (?, ?, ?, 'UNPAID', ?)",
        )
        .bind(tenant_id)
        .bind(period.to_string())
        .bind(amount)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "bill for this period"))?;

        Ok(Bill {
            id: result.last_insert_rowid(),
            tenant_id,
            period,
            amount,
            status: BillStatus::Unpaid,
            created_at,
        })
    }

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>> {
        let row = sqlx::query(
            "SELECT id, tenant_id, period, amount, status, created_at FROM bills WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(bill_from_row).transpose()
    }

    async fn find_bill_for_period(
        &self,
        tenant_id: i64,
        period: BillingPeriod,
    ) -> Result<Option<BillWithProof>> {
        let row = sqlx::query(
            "SELECT b.id, b.tenant_id, b.period, b.amount, b.status, b.created_at,
                    p.proof_url, p.submitted_at
             FROM bills b
             LEFT JOIN payments p ON p.bill_id = b.id
             WHERE b.tenant_id = ? AND b.period = ?
             ORDER BY b.id DESC LIMIT 1",
        )
        .bind(tenant_id)
        .bind(period.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(bill_with_proof_from_row).transpose()
    }

    async fn list_paid_bills(&self, tenant_id: i64) -> Result<Vec<BillWithProof>> {
        let rows = sqlx::query(
            "SELECT b.id, b.tenant_id, b.period, b.amount, b.status, b.created_at,
                    p.proof_url, p.submitted_at
             FROM bills b
             LEFT JOIN payments p ON p.bill_id = b.id
             WHERE b.tenant_id = ? AND b.status = 'PAID'
             ORDER BY b.period DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bill_with_proof_from_row).collect()
    }

    async fn list_pending_verifications(&self) -> Result<Vec<PendingVerification>> {
        let rows = sqlx::query(
            "SELECT b.id, b.period, b.amount, b.status,
                    u.name AS tenant_name, u.email AS tenant_email, u.phone AS tenant_phone,
                    r.number AS room_number, p.proof_url, p.submitted_at
             FROM bills b
             JOIN tenants t ON t.id = b.tenant_id
             JOIN users u ON u.id = t.user_id
             LEFT JOIN rooms r ON r.id = t.room_id
             LEFT JOIN payments p ON p.bill_id = b.id
             WHERE b.status = 'AWAITING_VERIFICATION'
             ORDER BY b.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PendingVerification {
                    bill_id: row.try_get("id")?,
                    period: parse_period(row.try_get::<String, _>("period")?)?,
                    amount: row.try_get("amount")?,
                    status: parse_enum(row.try_get::<String, _>("status")?)?,
                    tenant_name: row.try_get("tenant_name")?,
                    tenant_email: row.try_get("tenant_email")?,
                    tenant_phone: row.try_get("tenant_phone")?,
                    room_number: row.try_get("room_number")?,
                    proof_url: row.try_get("proof_url")?,
                    submitted_at: row.try_get("submitted_at")?,
                })
            })
            .collect()
    }

    async fn find_payment(&self, bill_id: i64) -> Result<Option<Payment>> {
        let row = sqlx::query(
            "SELECT id, bill_id, proof_url, verified_by, rejection_reason, submitted_at
             FROM payments WHERE bill_id = ?",
        )
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn bill_context(&self, bill_id: i64) -> Result<Option<BillContext>> {
        let row = sqlx::query(
            "SELECT b.id, b.tenant_id, b.period, b.amount, b.status, b.created_at,
                    u.name AS tenant_name, u.phone AS tenant_phone
             FROM bills b
             JOIN tenants t ON t.id = b.tenant_id
             JOIN users u ON u.id = t.user_id
             WHERE b.id = ?",
        )
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(BillContext {
                bill: bill_from_row(&row)?,
                tenant_name: row.try_get("tenant_name")?,
                tenant_phone: row.try_get("tenant_phone")?,
            })),
            None => Ok(None),
        }
    }

    async fn attach_payment_proof(&self, bill_id: i64, proof_url: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Conditional transition: only an UNPAID bill moves forward, and the
        // affected-row count decides the winner under concurrency.
        let result = sqlx::query(
            "UPDATE bills SET status = 'AWAITING_VERIFICATION'
             WHERE id = ? AND status = 'UNPAID'",
        )
        .bind(bill_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO payments (bill_id, proof_url, submitted_at) VALUES (?, ?, ?)",
        )
        .bind(bill_id)
        .bind(proof_url)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn resolve_bill(
        &self,
        bill_id: i64,
        verdict: BillStatus,
        verified_by: &str,
        rejection_reason: Option<&str>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE bills SET status = ?
             WHERE id = ? AND status = 'AWAITING_VERIFICATION'",
        )
        .bind(verdict.as_str())
        .bind(bill_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // A payment row may be missing on anomalous data; zero affected rows
        // here is fine and never blocks the transition.
        sqlx::query(
            "UPDATE payments SET verified_by = ?, rejection_reason = ? WHERE bill_id = ?",
        )
        .bind(verified_by)
        .bind(rejection_reason)
        .bind(bill_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn create_report(&self, tenant_id: i64, report: NewReport) -> Result<Report> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO reports (tenant_id, title, description, photo_url, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'NEW', ?, ?)",
        )
        .bind(tenant_id)
        .bind(&report.title)
        .bind(&report.description)
        .bind(&report.photo_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Report {
            id: result.last_insert_rowid(),
            tenant_id,
            title: report.title,
            description: report.description,
            photo_url: report.photo_url,
            status: ReportStatus::New,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_reports_for_tenant(&self, tenant_id: i64) -> Result<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, title, description, photo_url, status, created_at, updated_at
             FROM reports WHERE tenant_id = ? ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn list_reports(&self) -> Result<Vec<ReportWithTenant>> {
        let rows = sqlx::query(
            "SELECT rep.id, rep.tenant_id, rep.title, rep.description, rep.photo_url,
                    rep.status, rep.created_at, rep.updated_at,
                    u.name AS tenant_name, r.number AS room_number
             FROM reports rep
             JOIN tenants t ON t.id = rep.tenant_id
             JOIN users u ON u.id = t.user_id
             LEFT JOIN rooms r ON r.id = t.room_id
             ORDER BY rep.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ReportWithTenant {
                    report: report_from_row(row)?,
                    tenant_name: row.try_get("tenant_name")?,
                    room_number: row.try_get("room_number")?,
                })
            })
            .collect()
    }

    async fn set_report_status(&self, id: i64, status: ReportStatus) -> Result<Report> {
        let result = sqlx::query("UPDATE reports SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("report"));
        }

        let row = sqlx::query(
            "SELECT id, tenant_id, title, description, photo_url, status, created_at, updated_at
             FROM reports WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        report_from_row(&row)
    }

    async fn settings(&self) -> Result<Settings> {
        let row = sqlx::query("SELECT name, bank_info, base_rate FROM settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Settings {
                name: row.try_get("name")?,
                bank_info: row.try_get("bank_info")?,
                base_rate: row.try_get("base_rate")?,
            }),
            None => {
                let defaults = Settings::default();
                sqlx::query(
                    "INSERT OR IGNORE INTO settings (id, name, bank_info, base_rate)
                     VALUES (1, ?, ?, ?)",
                )
                .bind(&defaults.name)
                .bind(&defaults.bank_info)
                .bind(defaults.base_rate)
                .execute(&self.pool)
                .await?;
                Ok(defaults)
            }
        }
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let current = self.settings().await?;
        let settings = Settings {
            name: update.name.unwrap_or(current.name),
            bank_info: update.bank_info.unwrap_or(current.bank_info),
            base_rate: update.base_rate.unwrap_or(current.base_rate),
        };

        sqlx::query(
            "INSERT INTO settings (id, name, bank_info, base_rate) VALUES (1, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                bank_info = excluded.bank_info,
                base_rate = excluded.base_rate",
        )
        .bind(&settings.name)
        .bind(&settings.bank_info)
        .bind(settings.base_rate)
        .execute(&self.pool)
        .await?;

        Ok(settings)
    }

    async fn stats(&self) -> Result<DashboardStats> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM rooms) AS total_rooms,
                (SELECT COUNT(*) FROM rooms WHERE status = 'AVAILABLE') AS available_rooms,
                (SELECT COUNT(*) FROM rooms WHERE status = 'OCCUPIED') AS occupied_rooms,
                (SELECT COUNT(*) FROM rooms WHERE status = 'MAINTENANCE') AS maintenance_rooms,
                (SELECT COUNT(*) FROM tenants) AS total_tenants,
                (SELECT COUNT(*) FROM bills WHERE status = 'AWAITING_VERIFICATION') AS pending_payments,
                (SELECT COALESCE(SUM(amount), 0) FROM bills WHERE status = 'PAID') AS total_revenue",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_rooms: row.try_get("total_rooms")?,
            available_rooms: row.try_get("available_rooms")?,
            occupied_rooms: row.try_get("occupied_rooms")?,
            maintenance_rooms: row.try_get("maintenance_rooms")?,
            total_tenants: row.try_get("total_tenants")?,
            pending_payments: row.try_get("pending_payments")?,
            total_revenue: row.try_get("total_revenue")?,
        })
    }
}

fn bill_with_proof_from_row(row: &SqliteRow) -> Result<BillWithProof> {
    let submitted_at: Option<DateTime<Utc>> = row.try_get("submitted_at")?;
    Ok(BillWithProof {
        bill: bill_from_row(row)?,
        proof_url: row.try_get("proof_url")?,
        submitted_at,
    })
}
