//! Reconciliation of payments left `pending` by a previous run or by the
//! run that is shutting down.
//!
//! Nothing watches a payment across restarts, so every payment still
//! `pending` at startup or shutdown is settled as `error`. Watched payments
//! get their `error` notification first; the final database update is
//! storewide and also catches rows no context was watching.

use super::registry::StoreWalletRegistry;
use crate::store::StoreError;
use paywatch_sdk::objects::PaymentStatus;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Contexts whose poll loop was stopped.
    pub wallets_stopped: usize,
    /// Watched payments that were notified as `error`.
    pub payments_notified: usize,
    /// Rows moved from `pending` to `error`.
    pub rows_updated: u64,
}

impl StoreWalletRegistry {
    /// Stop every poll loop, notify `error` for every watched payment and
    /// mark every pending row as `error`.
    ///
    /// Calling it again, or with nothing pending, changes nothing.
    pub async fn reconcile_pending_payments(&self) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();

        for ctx in self.contexts().await {
            if ctx.pending().count().await == 0 {
                continue;
            }
            if ctx.stop_polling().await {
                report.wallets_stopped += 1;
            }
            let webhook = ctx.webhook().await;
            for payment in ctx.pending().drain().await {
                self.deps
                    .notifier
                    .notify(&payment.payment_id, PaymentStatus::Error, &webhook)
                    .await;
                report.payments_notified += 1;
            }
        }

        report.rows_updated = self.deps.store.error_all_pending().await?;
        if report.rows_updated > 0 || report.payments_notified > 0 {
            info!(
                wallets_stopped = report.wallets_stopped,
                payments_notified = report.payments_notified,
                rows_updated = report.rows_updated,
                "Pending payments reconciled to error"
            );
        }
        Ok(report)
    }
}
