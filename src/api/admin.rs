//! Admin handlers: dashboard, settings, tenant management, payment
//! verification, bill issuance and report triage.

use super::AppState;
use crate::auth::{Identity, Role};
use crate::billing::PaymentDecision;
use crate::domain::{
    Bill, BillingPeriod, NewUser, ReportStatus, Settings, SettingsUpdate,
};
use crate::error::Result;
use crate::http::{ApiResponse, CreatedResponse, ValidatedJson};
use crate::store::{DashboardStats, PendingVerification, ReportWithTenant, TenantOverview};
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize)]
pub struct SettingsBody {
    pub settings: Settings,
}

#[derive(Debug, Serialize)]
pub struct TenantList {
    pub tenants: Vec<TenantOverview>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTenant {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub room_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TenantBody {
    pub tenant: CreatedTenant,
}

#[derive(Debug, Serialize)]
pub struct PaymentList {
    pub payments: Vec<PendingVerification>,
}

#[derive(Debug, Serialize)]
pub struct BillBody {
    pub bill: Bill,
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub reports: Vec<ReportWithTenant>,
}

#[derive(Debug, Serialize)]
pub struct ReportBody {
    pub report: crate::domain::Report,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub bank_info: Option<String>,
    #[validate(range(min = 1))]
    pub base_rate: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub phone: Option<String>,
    pub room_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueBillRequest {
    pub tenant_id: i64,
    pub period: BillingPeriod,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub action: DecisionAction,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportStatusRequest {
    pub status: ReportStatus,
}

/// GET /admin/stats
pub async fn stats(State(state): State<AppState>) -> Result<ApiResponse<StatsBody>> {
    let stats = state.store.stats().await?;
    Ok(ApiResponse::success(StatsBody { stats }))
}

/// GET /admin/settings
pub async fn settings(State(state): State<AppState>) -> Result<ApiResponse<SettingsBody>> {
    let settings = state.store.settings().await?;
    Ok(ApiResponse::success(SettingsBody { settings }))
}

/// PUT /admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateSettingsRequest>,
) -> Result<ApiResponse<SettingsBody>> {
    let settings = state
        .store
        .update_settings(SettingsUpdate {
            name: req.name,
            bank_info: req.bank_info,
            base_rate: req.base_rate,
        })
        .await?;

    Ok(ApiResponse::success(SettingsBody { settings }))
}

/// GET /admin/penghuni
pub async fn list_tenants(State(state): State<AppState>) -> Result<ApiResponse<TenantList>> {
    let tenants = state.store.list_tenants(BillingPeriod::current()).await?;
    Ok(ApiResponse::success(TenantList { tenants }))
}

/// POST /admin/penghuni
///
/// Registers a tenant manually (no password; the account cannot log in
/// until it registers). Assigning a room marks it OCCUPIED.
pub async fn create_tenant(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateTenantRequest>,
) -> Result<CreatedResponse<TenantBody>> {
    let user = state
        .store
        .create_user(NewUser {
            id: format!("manual-{}", Uuid::new_v4().simple()),
            email: req.email,
            name: req.name,
            phone: req.phone,
            role: Role::Tenant,
            password_hash: None,
        })
        .await?;

    let tenant = state.store.create_tenant(&user.id, req.room_id).await?;
    tracing::info!(tenant = tenant.id, room = ?tenant.room_id, "tenant created");

    Ok(ApiResponse::created(TenantBody {
        tenant: CreatedTenant {
            id: tenant.id,
            user_id: user.id,
            name: user.name,
            email: user.email,
            room_id: tenant.room_id,
        },
    }))
}

/// POST /admin/tagihan
pub async fn issue_bill(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<IssueBillRequest>,
) -> Result<CreatedResponse<BillBody>> {
    let bill = state
        .engine
        .issue_bill(req.tenant_id, req.period, req.amount)
        .await?;

    Ok(ApiResponse::created(BillBody { bill }))
}

/// GET /admin/pembayaran/pending
pub async fn pending_payments(
    State(state): State<AppState>,
) -> Result<ApiResponse<PaymentList>> {
    let payments = state.store.list_pending_verifications().await?;
    Ok(ApiResponse::success(PaymentList { payments }))
}

/// POST /admin/pembayaran/{id}/confirm
pub async fn confirm_payment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ConfirmPaymentRequest>,
) -> Result<impl axum::response::IntoResponse> {
    let (decision, message) = match req.action {
        DecisionAction::Accept => (PaymentDecision::Accept, "Payment confirmed"),
        DecisionAction::Reject => (
            PaymentDecision::Reject { reason: req.reason },
            "Payment rejected",
        ),
    };

    let outcome = state.engine.decide_payment(&identity, id, decision).await?;

    #[derive(Serialize)]
    struct DecisionBody {
        decision: crate::billing::PaymentDecisionOutcome,
    }

    Ok(ApiResponse::success_with_message(
        DecisionBody { decision: outcome },
        message,
    ))
}

/// GET /admin/laporan
pub async fn list_reports(State(state): State<AppState>) -> Result<ApiResponse<ReportList>> {
    let reports = state.store.list_reports().await?;
    Ok(ApiResponse::success(ReportList { reports }))
}

/// PUT /admin/laporan/{id}/status
pub async fn update_report_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateReportStatusRequest>,
) -> Result<ApiResponse<ReportBody>> {
    let report = state.store.set_report_status(id, req.status).await?;
    Ok(ApiResponse::success(ReportBody { report }))
}
