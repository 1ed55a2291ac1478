//! One store's wallet, the payments it watches and the loop that polls it.
//!
//! The poll loop runs only while the store has pending payments. Adding the
//! first payment sets the wallet online and spawns the loop; the sweep that
//! resolves the last payment sets the wallet offline, cleans it and ends the
//! loop. Both transitions happen under the `poll` mutex, so a payment added
//! concurrently with the last sweep either lands before the idle check (and
//! keeps the loop alive) or after it (and starts a new loop).

use super::evaluator::{Observation, Verdict, evaluate};
use super::notifier::{Notifier, WebhookTarget};
use super::pending_set::{PendingPayment, PendingPaymentSet};
use super::registry::RegistryError;
use crate::config::{SharedPolicy, WatcherConfig};
use crate::entities::PaymentStatus;
use crate::store::PaymentStore;
use crate::wallet::{IntegratedAddress, WalletHandle};
use paywatch_sdk::objects::StoreWalletStatus;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Collaborators shared by every store wallet context.
#[derive(Clone)]
pub struct WatcherDeps {
    pub store: Arc<dyn PaymentStore>,
    pub notifier: Notifier,
    pub policy: SharedPolicy,
    pub config: WatcherConfig,
}

struct PollHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct PollState {
    running: Option<PollHandle>,
    /// Set once the wallet has been closed; no payment may be added anymore.
    closed: bool,
}

pub struct StoreWalletContext {
    store_id: i32,
    wallet: Arc<dyn WalletHandle>,
    pending: PendingPaymentSet,
    webhook: RwLock<WebhookTarget>,
    poll: Mutex<PollState>,
    deps: WatcherDeps,
}

impl std::fmt::Debug for StoreWalletContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreWalletContext")
            .field("store_id", &self.store_id)
            .finish_non_exhaustive()
    }
}

impl StoreWalletContext {
    pub fn new(
        store_id: i32,
        wallet: Arc<dyn WalletHandle>,
        webhook: WebhookTarget,
        deps: WatcherDeps,
    ) -> Arc<Self> {
        Arc::new(Self {
            store_id,
            wallet,
            pending: PendingPaymentSet::new(),
            webhook: RwLock::new(webhook),
            poll: Mutex::new(PollState::default()),
            deps,
        })
    }

    pub fn store_id(&self) -> i32 {
        self.store_id
    }

    pub fn wallet(&self) -> &Arc<dyn WalletHandle> {
        &self.wallet
    }

    pub fn pending(&self) -> &PendingPaymentSet {
        &self.pending
    }

    pub async fn webhook(&self) -> WebhookTarget {
        self.webhook.read().await.clone()
    }

    /// Replace the webhook target. Pending payments are not touched.
    pub async fn set_webhook(&self, target: WebhookTarget) {
        *self.webhook.write().await = target;
    }

    pub async fn is_polling(&self) -> bool {
        self.poll.lock().await.running.is_some()
    }

    pub async fn status(&self) -> StoreWalletStatus {
        StoreWalletStatus {
            store_id: self.store_id,
            active: true,
            polling: self.is_polling().await,
            pending_payments: self.pending.count().await,
        }
    }

    /// Start watching `payment`, bringing the wallet online when it was idle.
    pub async fn add_pending_payment(
        self: &Arc<Self>,
        payment: PendingPayment,
    ) -> Result<(), RegistryError> {
        let payment_id = payment.payment_id.clone();
        let mut poll = self.poll.lock().await;
        if poll.closed {
            return Err(RegistryError::WalletClosed(self.store_id));
        }
        let count = self
            .pending
            .add(payment)
            .await
            .map_err(|e| RegistryError::DuplicatePayment(e.0))?;

        if poll.running.is_none() {
            if let Err(e) = self.wallet.set_online().await {
                self.pending.remove(&payment_id).await;
                return Err(e.into());
            }
            poll.running = Some(self.spawn_poll_loop());
            info!(store_id = self.store_id, "Started watching store wallet");
        }
        debug!(store_id = self.store_id, payment_id, pending = count, "Watching payment");
        Ok(())
    }

    /// Draw integrated addresses until one is unused by any persisted payment.
    pub async fn generate_unique_address(&self) -> Result<IntegratedAddress, RegistryError> {
        loop {
            let address = self.wallet.new_integrated_address().await?;
            if self.deps.store.is_unique_address(&address).await? {
                return Ok(address);
            }
            debug!(
                store_id = self.store_id,
                payment_id = %address.payment_id,
                "Integrated address already used, drawing another"
            );
        }
    }

    /// Stop the poll loop, if any, and take the wallet offline.
    ///
    /// Waits for a sweep in progress to finish. Returns whether a loop was
    /// running. Pending payments stay in the set.
    pub async fn stop_polling(&self) -> bool {
        let mut poll = self.poll.lock().await;
        let Some(handle) = poll.running.take() else {
            return false;
        };
        let _ = handle.shutdown_tx.send(true);
        if let Err(e) = handle.task.await {
            error!(store_id = self.store_id, error = %e, "Poll loop panicked");
        }
        self.wallet.set_offline().await;
        self.wallet.release().await;
        info!(store_id = self.store_id, "Stopped watching store wallet");
        true
    }

    /// Close the wallet for good. Refused while payments are pending.
    pub(super) async fn close(&self) -> Result<(), RegistryError> {
        let mut poll = self.poll.lock().await;
        if poll.running.is_some() || self.pending.count().await > 0 {
            return Err(RegistryError::WalletBusy(self.store_id));
        }
        if !poll.closed {
            poll.closed = true;
            self.wallet.close().await;
        }
        Ok(())
    }

    fn spawn_poll_loop(self: &Arc<Self>) -> PollHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(self).poll_loop(shutdown_rx));
        PollHandle { shutdown_tx, task }
    }

    async fn poll_loop(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.deps.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    debug!(store_id = self.store_id, "Poll loop received shutdown signal");
                    return;
                }

                _ = ticker.tick() => {
                    self.sweep().await;
                    if self.finish_if_idle(&mut shutdown_rx).await {
                        return;
                    }
                }
            }
        }
    }

    /// After a sweep: if nothing is pending, release the wallet and report
    /// that the loop must end.
    async fn finish_if_idle(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        // `stop_polling` holds the lock while it waits for this task, so give
        // way to it instead of blocking on the lock.
        let mut poll = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return true,
            poll = self.poll.lock() => poll,
        };
        if self.pending.count().await > 0 {
            return false;
        }
        poll.running = None;
        self.wallet.set_offline().await;
        self.wallet.release().await;
        info!(store_id = self.store_id, "No pending payments left, wallet is idle");
        true
    }

    async fn sweep(&self) {
        if !self.wallet.is_online().await {
            warn!(
                store_id = self.store_id,
                "Daemon offline, skipping this round of payment checks"
            );
            return;
        }
        let (wallet_height, daemon_height) =
            match tokio::try_join!(self.wallet.local_height(), self.wallet.daemon_height()) {
                Ok(heights) => heights,
                Err(e) => {
                    warn!(store_id = self.store_id, error = %e, "Failed to read wallet heights");
                    return;
                }
            };
        let policy = self.deps.policy.read().await.clone();
        let now = time::OffsetDateTime::now_utc();

        for payment in self.pending.snapshot().await {
            let deposits = match self.wallet.deposits_for(&payment.payment_id).await {
                Ok(deposits) => deposits,
                Err(e) => {
                    warn!(
                        store_id = self.store_id,
                        payment_id = %payment.payment_id,
                        error = %e,
                        "Failed to look up deposits"
                    );
                    continue;
                }
            };
            let observation =
                Observation::of(&payment, &deposits, &policy, wallet_height, daemon_height, now);
            let status = match evaluate(&observation) {
                Verdict::NoChange => continue,
                Verdict::Paid => PaymentStatus::Paid,
                Verdict::Expired => PaymentStatus::Expired,
            };
            debug!(
                store_id = self.store_id,
                payment_id = %payment.payment_id,
                received = observation.received_atomic_amount,
                wallet_height,
                daemon_height,
                %status,
                "Payment resolved"
            );
            self.settle(&payment.payment_id, status).await;
        }
    }

    /// Persist a transition out of `pending`, then stop watching the payment
    /// and tell everybody about it.
    async fn settle(&self, payment_id: &str, status: PaymentStatus) {
        match self.deps.store.set_status_if_pending(payment_id, status).await {
            Ok(0) => {
                info!(
                    store_id = self.store_id,
                    payment_id, "Payment was no longer pending, dropping it"
                );
                self.pending.remove(payment_id).await;
            }
            Ok(_) => {
                self.pending.remove(payment_id).await;
                info!(store_id = self.store_id, payment_id, %status, "Payment status updated");
                let webhook = self.webhook().await;
                self.deps
                    .notifier
                    .notify(payment_id, status.into(), &webhook)
                    .await;
            }
            Err(e) => {
                error!(
                    store_id = self.store_id,
                    payment_id,
                    error = %e,
                    "Failed to persist payment status, will retry next tick"
                );
            }
        }
    }
}
