//! Tenant handlers: own bills, payment-proof upload and reports.

use super::AppState;
use crate::auth::Identity;
use crate::domain::{Bill, NewReport, Report, Tenant};
use crate::error::{ApiError, Result};
use crate::http::{ApiResponse, CreatedResponse};
use crate::store::BillWithProof;
use crate::uploads::StoredFile;
use axum::extract::{Multipart, Path, State};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ActiveBillBody {
    pub bill: Option<BillWithProof>,
}

#[derive(Debug, Serialize)]
pub struct BillHistory {
    pub history: Vec<BillWithProof>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedBill {
    pub bill: Bill,
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub reports: Vec<Report>,
}

#[derive(Debug, Serialize)]
pub struct ReportBody {
    pub report: Report,
}

async fn own_tenant(state: &AppState, identity: &Identity) -> Result<Tenant> {
    state
        .store
        .find_tenant_by_user(&identity.subject)
        .await?
        .ok_or_else(|| ApiError::not_found("tenant"))
}

/// GET /penghuni/tagihan/active
///
/// The current period's bill, if one has been issued.
pub async fn active_bill(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<ApiResponse<ActiveBillBody>> {
    let tenant = own_tenant(&state, &identity).await?;

    let bill = state
        .store
        .find_bill_for_period(tenant.id, crate::domain::BillingPeriod::current())
        .await?;

    Ok(ApiResponse::success(ActiveBillBody { bill }))
}

/// GET /penghuni/tagihan/history
pub async fn bill_history(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<ApiResponse<BillHistory>> {
    let tenant = own_tenant(&state, &identity).await?;

    let history = state.store.list_paid_bills(tenant.id).await?;
    Ok(ApiResponse::success(BillHistory { history }))
}

/// POST /penghuni/tagihan/{id}/bayar
///
/// Multipart upload of the payment proof (field `proof`).
pub async fn submit_payment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<ApiResponse<SubmittedBill>> {
    let proof = read_file_field(&state, multipart, "proof")
        .await?
        .ok_or_else(|| ApiError::validation("Payment proof file is required"))?;

    let bill = state
        .engine
        .submit_proof(&identity.subject, id, &proof)
        .await?;

    Ok(ApiResponse::success_with_message(
        SubmittedBill { bill },
        "Payment proof uploaded. Awaiting admin verification.",
    ))
}

/// GET /penghuni/laporan
pub async fn my_reports(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<ApiResponse<ReportList>> {
    let tenant = own_tenant(&state, &identity).await?;

    let reports = state.store.list_reports_for_tenant(tenant.id).await?;
    Ok(ApiResponse::success(ReportList { reports }))
}

/// POST /penghuni/laporan
///
/// Multipart: text fields `title` and `description`, optional file `photo`.
pub async fn create_report(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<CreatedResponse<ReportBody>> {
    let tenant = own_tenant(&state, &identity).await?;

    let mut title = None;
    let mut description = None;
    let mut photo: Option<StoredFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = Some(read_text(field).await?);
            }
            Some("description") => {
                description = Some(read_text(field).await?);
            }
            Some("photo") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid file upload: {e}")))?;
                if !bytes.is_empty() {
                    photo = Some(state.uploads.store(filename.as_deref(), &bytes).await?);
                }
            }
            _ => {}
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::validation("title is required"))?;
    let description = description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::validation("description is required"))?;

    let report = state
        .store
        .create_report(
            tenant.id,
            NewReport {
                title,
                description,
                photo_url: photo.map(|p| p.url),
            },
        )
        .await?;

    Ok(ApiResponse::created(ReportBody { report }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart field: {e}")))
}

/// Pull a single named file field out of a multipart body and persist it.
async fn read_file_field(
    state: &AppState,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Option<StoredFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid file upload: {e}")))?;
        if bytes.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }
        return Ok(Some(state.uploads.store(filename.as_deref(), &bytes).await?));
    }
    Ok(None)
}
