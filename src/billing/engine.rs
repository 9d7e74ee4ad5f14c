//! The billing state machine.
//!
//! A bill's lifecycle is `UNPAID` → `AWAITING_VERIFICATION` →
//! `PAID`/`REJECTED`. The engine never performs a plain read-then-write:
//! every transition goes through one of the store's guarded
//! compare-and-swap methods, so two concurrent submissions (or decisions)
//! on the same bill resolve to exactly one winner; the loser surfaces as an
//! invalid-state error.
//!
//! The notification side effect of a decision runs strictly after the
//! store transaction commits and is best-effort: failures are logged and
//! reported as `notified: false`, never as a request error.

use crate::auth::Identity;
use crate::domain::{Bill, BillStatus, BillingPeriod};
use crate::error::Result;
use crate::notify::{PaymentNotification, PaymentNotifier};
use crate::store::Store;
use crate::uploads::StoredFile;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::BillingError;

/// Admin verdict on a payment awaiting verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDecision {
    Accept,
    Reject { reason: Option<String> },
}

impl PaymentDecision {
    #[must_use]
    pub fn target_status(&self) -> BillStatus {
        match self {
            Self::Accept => BillStatus::Paid,
            Self::Reject { .. } => BillStatus::Rejected,
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            Self::Accept => None,
            Self::Reject { reason } => reason.as_deref(),
        }
    }
}

/// Result of a verification decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDecisionOutcome {
    pub bill_id: i64,
    pub status: BillStatus,
    /// Whether the payment-status notification was delivered. Best-effort;
    /// `false` never fails the decision itself.
    pub notified: bool,
}

/// Drives bill lifecycle transitions against the store and dispatches the
/// notification side effect.
pub struct BillingEngine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn PaymentNotifier>,
}

impl BillingEngine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn PaymentNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Create an UNPAID bill for a tenant and period.
    ///
    /// Bill generation is an administrative (or automation-service) action;
    /// the duplicate guard lives in the store so a rejected period may be
    /// re-billed while a live bill blocks a second issuance.
    pub async fn issue_bill(
        &self,
        tenant_id: i64,
        period: BillingPeriod,
        amount: i64,
    ) -> Result<Bill> {
        if amount <= 0 {
            return Err(BillingError::InvalidAmount { amount }.into());
        }

        self.store
            .find_tenant(tenant_id)
            .await?
            .ok_or(BillingError::UnknownTenant { tenant_id })?;

        let bill = self.store.create_bill(tenant_id, period, amount).await?;
        tracing::info!(bill_id = bill.id, tenant_id, period = %period, amount, "bill issued");
        Ok(bill)
    }

    /// Record a payment proof for a tenant's own UNPAID bill.
    ///
    /// The Payment insert and the `UNPAID` → `AWAITING_VERIFICATION`
    /// transition are atomic; a bill that is not UNPAID (including one that
    /// lost the race to a concurrent submission) is an invalid-state error.
    pub async fn submit_proof(
        &self,
        user_id: &str,
        bill_id: i64,
        proof: &StoredFile,
    ) -> Result<Bill> {
        let tenant = self
            .store
            .find_tenant_by_user(user_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;

        let bill = self
            .store
            .find_bill(bill_id)
            .await?
            .filter(|b| b.tenant_id == tenant.id)
            .ok_or(BillingError::BillNotFound { bill_id })?;

        if bill.status != BillStatus::Unpaid {
            return Err(BillingError::InvalidState {
                bill_id,
                status: bill.status,
            }
            .into());
        }

        if !self.store.attach_payment_proof(bill_id, &proof.url).await? {
            // Lost the guarded transition to a concurrent submission.
            return Err(BillingError::InvalidState {
                bill_id,
                status: BillStatus::AwaitingVerification,
            }
            .into());
        }

        tracing::info!(bill_id, tenant_id = tenant.id, proof = %proof.url, "payment proof submitted");

        Ok(Bill {
            status: BillStatus::AwaitingVerification,
            ..bill
        })
    }

    /// Accept or reject a payment awaiting verification.
    ///
    /// On success the bill is PAID or REJECTED, the payment (if present) is
    /// annotated with the verifying admin and any rejection reason, and the
    /// tenant is notified. Only a bill in AWAITING_VERIFICATION can be
    /// decided; a second decision fails because the status has moved on.
    pub async fn decide_payment(
        &self,
        admin: &Identity,
        bill_id: i64,
        decision: PaymentDecision,
    ) -> Result<PaymentDecisionOutcome> {
        let context = self
            .store
            .bill_context(bill_id)
            .await?
            .ok_or(BillingError::BillNotFound { bill_id })?;

        if context.bill.status != BillStatus::AwaitingVerification {
            return Err(BillingError::InvalidState {
                bill_id,
                status: context.bill.status,
            }
            .into());
        }

        let verdict = decision.target_status();
        let resolved = self
            .store
            .resolve_bill(bill_id, verdict, &admin.subject, decision.reason())
            .await?;

        if !resolved {
            // A concurrent decision won the guarded transition.
            return Err(BillingError::InvalidState {
                bill_id,
                status: context.bill.status,
            }
            .into());
        }

        tracing::info!(
            bill_id,
            verdict = %verdict,
            admin = %admin.subject,
            "payment decided"
        );

        let message = match &decision {
            PaymentDecision::Accept => format!(
                "Payment for {} has been verified (PAID). Thank you!",
                context.tenant_name
            ),
            PaymentDecision::Reject { reason } => format!(
                "Payment for {} was rejected. Reason: {}",
                context.tenant_name,
                reason.as_deref().unwrap_or("none given")
            ),
        };

        // Strictly after commit; delivery failure is swallowed by the
        // notifier and reported through the flag.
        let notified = match &context.tenant_phone {
            Some(phone) => {
                let notification = PaymentNotification {
                    phone: phone.clone(),
                    status: verdict,
                    message,
                    timestamp: Utc::now(),
                };
                self.notifier.payment_status_changed(&notification).await
            }
            None => false,
        };

        Ok(PaymentDecisionOutcome {
            bill_id,
            status: verdict,
            notified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::domain::NewUser;
    use crate::error::ApiError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingNotifier {
        sent: Mutex<Vec<PaymentNotification>>,
        deliver: bool,
    }

    impl RecordingNotifier {
        fn new(deliver: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                deliver,
            }
        }

        fn sent(&self) -> Vec<PaymentNotification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentNotifier for RecordingNotifier {
        async fn payment_status_changed(&self, notification: &PaymentNotification) -> bool {
            self.sent.lock().unwrap().push(notification.clone());
            self.deliver
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        engine: BillingEngine,
    }

    fn admin() -> Identity {
        Identity {
            subject: "admin-1".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        }
    }

    fn proof() -> StoredFile {
        StoredFile {
            filename: "bukti.jpg".to_string(),
            url: "/uploads/bukti.jpg".to_string(),
        }
    }

    fn period() -> BillingPeriod {
        "2024-06".parse().unwrap()
    }

    async fn harness(deliver: bool) -> (Harness, i64) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new(deliver));
        let engine = BillingEngine::new(store.clone(), notifier.clone());

        store
            .create_user(NewUser {
                id: "user-1".to_string(),
                email: "budi@example.com".to_string(),
                name: "Budi".to_string(),
                phone: Some("+6281234567890".to_string()),
                role: Role::Tenant,
                password_hash: None,
            })
            .await
            .unwrap();
        let tenant = store.create_tenant("user-1", None).await.unwrap();
        let bill = engine
            .issue_bill(tenant.id, period(), 500_000)
            .await
            .unwrap();
        assert_eq!(bill.status, BillStatus::Unpaid);

        (
            Harness {
                store,
                notifier,
                engine,
            },
            bill.id,
        )
    }

    #[tokio::test]
    async fn submit_proof_transitions_to_awaiting() {
        let (h, bill_id) = harness(true).await;

        let bill = h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();
        assert_eq!(bill.status, BillStatus::AwaitingVerification);

        let payment = h.store.find_payment(bill_id).await.unwrap().unwrap();
        assert_eq!(payment.proof_url, "/uploads/bukti.jpg");
        assert!(payment.verified_by.is_none());
    }

    #[tokio::test]
    async fn second_submission_is_invalid_state() {
        let (h, bill_id) = harness(true).await;

        h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();
        let err = h
            .engine
            .submit_proof("user-1", bill_id, &proof())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[tokio::test]
    async fn concurrent_submissions_have_one_winner() {
        let (h, bill_id) = harness(true).await;

        let (p1, p2) = (proof(), proof());
        let (a, b) = tokio::join!(
            h.engine.submit_proof("user-1", bill_id, &p1),
            h.engine.submit_proof("user-1", bill_id, &p2),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

        // Exactly one payment row exists either way.
        assert!(h.store.find_payment(bill_id).await.unwrap().is_some());
        let bill = h.store.find_bill(bill_id).await.unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::AwaitingVerification);
    }

    #[tokio::test]
    async fn submit_requires_ownership() {
        let (h, bill_id) = harness(true).await;

        h.store
            .create_user(NewUser {
                id: "user-2".to_string(),
                email: "siti@example.com".to_string(),
                name: "Siti".to_string(),
                phone: None,
                role: Role::Tenant,
                password_hash: None,
            })
            .await
            .unwrap();
        h.store.create_tenant("user-2", None).await.unwrap();

        let err = h
            .engine
            .submit_proof("user-2", bill_id, &proof())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn accept_marks_paid_and_notifies() {
        let (h, bill_id) = harness(true).await;
        h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();

        let outcome = h
            .engine
            .decide_payment(&admin(), bill_id, PaymentDecision::Accept)
            .await
            .unwrap();
        assert_eq!(outcome.status, BillStatus::Paid);
        assert!(outcome.notified);

        let bill = h.store.find_bill(bill_id).await.unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::Paid);

        let payment = h.store.find_payment(bill_id).await.unwrap().unwrap();
        assert_eq!(payment.verified_by.as_deref(), Some("admin-1"));
        assert!(payment.rejection_reason.is_none());

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("Budi"));
        assert!(sent[0].message.contains("PAID"));
        assert_eq!(sent[0].status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn reject_records_reason() {
        let (h, bill_id) = harness(true).await;
        h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();

        let outcome = h
            .engine
            .decide_payment(
                &admin(),
                bill_id,
                PaymentDecision::Reject {
                    reason: Some("foto tidak jelas".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, BillStatus::Rejected);

        let payment = h.store.find_payment(bill_id).await.unwrap().unwrap();
        assert_eq!(payment.rejection_reason.as_deref(), Some("foto tidak jelas"));

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("foto tidak jelas"));
    }

    #[tokio::test]
    async fn decide_requires_awaiting_verification() {
        let (h, bill_id) = harness(true).await;

        // Still UNPAID: no proof submitted yet.
        let err = h
            .engine
            .decide_payment(&admin(), bill_id, PaymentDecision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        let bill = h.store.find_bill(bill_id).await.unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::Unpaid);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn second_decision_is_invalid_state() {
        let (h, bill_id) = harness(true).await;
        h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();

        h.engine
            .decide_payment(&admin(), bill_id, PaymentDecision::Accept)
            .await
            .unwrap();
        let err = h
            .engine
            .decide_payment(&admin(), bill_id, PaymentDecision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_decision() {
        let (h, bill_id) = harness(false).await;
        h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();

        let outcome = h
            .engine
            .decide_payment(&admin(), bill_id, PaymentDecision::Accept)
            .await
            .unwrap();
        assert_eq!(outcome.status, BillStatus::Paid);
        assert!(!outcome.notified);

        let bill = h.store.find_bill(bill_id).await.unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn guards_report_false_instead_of_erroring() {
        let (h, bill_id) = harness(true).await;

        // Unknown bill: the conditional write matches nothing.
        assert!(!h.store.attach_payment_proof(9999, "/uploads/x.jpg").await.unwrap());
        assert!(!h
            .store
            .resolve_bill(9999, BillStatus::Paid, "admin-1", None)
            .await
            .unwrap());

        // Wrong state: an UNPAID bill cannot be resolved.
        assert!(!h
            .store
            .resolve_bill(bill_id, BillStatus::Paid, "admin-1", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn rebilling_a_rejected_period_is_allowed() {
        let (h, bill_id) = harness(true).await;
        h.engine.submit_proof("user-1", bill_id, &proof()).await.unwrap();
        h.engine
            .decide_payment(
                &admin(),
                bill_id,
                PaymentDecision::Reject { reason: None },
            )
            .await
            .unwrap();

        let tenant = h.store.find_tenant_by_user("user-1").await.unwrap().unwrap();
        let fresh = h
            .engine
            .issue_bill(tenant.id, period(), 500_000)
            .await
            .unwrap();
        assert_ne!(fresh.id, bill_id);
        assert_eq!(fresh.status, BillStatus::Unpaid);

        // A live (unpaid) bill still blocks a duplicate issuance.
        let err = h
            .engine
            .issue_bill(tenant.id, period(), 500_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Duplicate(_)));
    }

    #[tokio::test]
    async fn issue_bill_validates_amount_and_tenant() {
        let (h, _bill_id) = harness(true).await;
        let tenant = h.store.find_tenant_by_user("user-1").await.unwrap().unwrap();

        let err = h.engine.issue_bill(tenant.id, period(), 0).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));

        let err = h
            .engine
            .issue_bill(9999, "2024-07".parse().unwrap(), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
