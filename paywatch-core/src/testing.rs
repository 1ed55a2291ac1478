//! Fakes for the wallet and the database, shared by the unit tests.

use crate::config::{PaymentPolicy, SharedPolicy, WatcherConfig};
use crate::entities::PaymentStatus;
use crate::entities::payments::{PaymentFilter, PaymentRecord, PaymentSortKey};
use crate::processors::live_status::LiveStatusHub;
use crate::processors::notifier::{
    Notifier, WebhookDeliveryReceiver, WebhookTarget, webhook_delivery_channel,
};
use crate::processors::registry::StoreWalletRegistry;
use crate::processors::store_wallet::WatcherDeps;
use crate::store::{NewPayment, PaymentListing, PaymentStore, StoreError, WalletCredentials};
use crate::wallet::{Deposit, IntegratedAddress, WalletError, WalletFactory, WalletHandle};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct FakeWalletState {
    pub online: bool,
    pub local_height: u64,
    pub daemon_height: u64,
    pub deposits: HashMap<String, Vec<Deposit>>,
    pub queued_addresses: VecDeque<IntegratedAddress>,
    pub fail_set_online: bool,
    pub set_online_calls: usize,
    pub set_offline_calls: usize,
    pub release_calls: usize,
    pub close_calls: usize,
    pub deposit_queries: usize,
    pub addresses_drawn: usize,
}

impl Default for FakeWalletState {
    fn default() -> Self {
        Self {
            online: true,
            local_height: 1000,
            daemon_height: 1000,
            deposits: HashMap::new(),
            queued_addresses: VecDeque::new(),
            fail_set_online: false,
            set_online_calls: 0,
            set_offline_calls: 0,
            release_calls: 0,
            close_calls: 0,
            deposit_queries: 0,
            addresses_drawn: 0,
        }
    }
}

/// In-memory wallet: online at height 1000 with no deposits by default.
#[derive(Debug, Default)]
pub struct FakeWallet {
    state: Mutex<FakeWalletState>,
}

impl FakeWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeWalletState> {
        self.state.lock().unwrap()
    }

    pub fn add_deposit(&self, payment_id: &str, amount: u64, height: u64) {
        self.state()
            .deposits
            .entry(payment_id.to_owned())
            .or_default()
            .push(Deposit { amount, height });
    }

    /// Make the next `new_integrated_address` return `address`.
    pub fn queue_address(&self, address: IntegratedAddress) {
        self.state().queued_addresses.push_back(address);
    }
}

#[async_trait]
impl WalletHandle for FakeWallet {
    async fn is_online(&self) -> bool {
        self.state().online
    }

    async fn deposits_for(&self, payment_id: &str) -> Result<Vec<Deposit>, WalletError> {
        let mut state = self.state();
        state.deposit_queries += 1;
        Ok(state.deposits.get(payment_id).cloned().unwrap_or_default())
    }

    async fn local_height(&self) -> Result<u64, WalletError> {
        Ok(self.state().local_height)
    }

    async fn daemon_height(&self) -> Result<u64, WalletError> {
        Ok(self.state().daemon_height)
    }

    async fn set_online(&self) -> Result<(), WalletError> {
        let mut state = self.state();
        state.set_online_calls += 1;
        if state.fail_set_online {
            return Err(WalletError::MalformedResponse("set_online"));
        }
        Ok(())
    }

    async fn set_offline(&self) {
        self.state().set_offline_calls += 1;
    }

    async fn release(&self) {
        self.state().release_calls += 1;
    }

    async fn close(&self) {
        self.state().close_calls += 1;
    }

    async fn new_integrated_address(&self) -> Result<IntegratedAddress, WalletError> {
        let mut state = self.state();
        state.addresses_drawn += 1;
        Ok(state.queued_addresses.pop_front().unwrap_or_else(|| {
            let n = next_id();
            IntegratedAddress {
                address: format!("fake-address-{n}"),
                payment_id: format!("{n:016x}"),
            }
        }))
    }
}

/// Opens a [`FakeWallet`] per store. The view key `"bad"` is rejected.
#[derive(Debug, Default)]
pub struct FakeWalletFactory {
    wallets: Mutex<HashMap<i32, Arc<FakeWallet>>>,
    opened: AtomicUsize,
    open_delay: Mutex<Duration>,
}

impl FakeWalletFactory {
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = delay;
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn wallet(&self, store_id: i32) -> Option<Arc<FakeWallet>> {
        self.wallets.lock().unwrap().get(&store_id).cloned()
    }
}

#[async_trait]
impl WalletFactory for FakeWalletFactory {
    async fn open(
        &self,
        store_id: i32,
        view_key: &str,
    ) -> Result<Arc<dyn WalletHandle>, WalletError> {
        let delay = *self.open_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if view_key == "bad" {
            return Err(WalletError::InvalidViewKey);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let wallet = FakeWallet::new();
        self.wallets
            .lock()
            .unwrap()
            .insert(store_id, Arc::clone(&wallet));
        Ok(wallet)
    }
}

/// In-memory stand-in for the `stores` and `payments` tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stores: Mutex<HashMap<i32, WalletCredentials>>,
    payments: Mutex<HashMap<String, PaymentRecord>>,
    fail_updates: Mutex<bool>,
    race_next_insert: Mutex<bool>,
}

impl MemoryStore {
    /// Insert or replace a store.
    pub fn add_store(&self, store_id: i32, view_key: &str, webhook: WebhookTarget) {
        self.stores.lock().unwrap().insert(
            store_id,
            WalletCredentials {
                view_key: view_key.to_owned(),
                webhook,
            },
        );
    }

    pub fn insert_pending(
        &self,
        store_id: i32,
        atomic_amount: u64,
        creation_time: time::OffsetDateTime,
    ) -> PaymentRecord {
        let n = next_id();
        let record = PaymentRecord {
            payment_id: format!("{n:016x}"),
            status: PaymentStatus::Pending,
            atomic_amount: atomic_amount as i64,
            integrated_address: format!("stored-address-{n}"),
            store_id,
            creation_time,
        };
        self.payments
            .lock()
            .unwrap()
            .insert(record.payment_id.clone(), record.clone());
        record
    }

    pub fn status_of(&self, payment_id: &str) -> Option<PaymentStatus> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .map(|record| record.status)
    }

    /// Change a status behind the watcher's back.
    pub fn force_status(&self, payment_id: &str, status: PaymentStatus) {
        if let Some(record) = self.payments.lock().unwrap().get_mut(payment_id) {
            record.status = status;
        }
    }

    pub fn pending_count(&self) -> usize {
        self.payments
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.status.is_pending())
            .count()
    }

    pub fn set_fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().unwrap() = fail;
    }

    /// Let another writer commit the next inserted address right after its
    /// uniqueness check passed.
    pub fn race_next_insert(&self) {
        *self.race_next_insert.lock().unwrap() = true;
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn wallet_credentials(
        &self,
        store_id: i32,
    ) -> Result<Option<WalletCredentials>, StoreError> {
        Ok(self.stores.lock().unwrap().get(&store_id).cloned())
    }

    async fn set_status_if_pending(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError> {
        if *self.fail_updates.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut payments = self.payments.lock().unwrap();
        match payments.get_mut(payment_id) {
            Some(record) if record.status.is_pending() => {
                record.status = status;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn error_all_pending(&self) -> Result<u64, StoreError> {
        let mut updated = 0;
        for record in self.payments.lock().unwrap().values_mut() {
            if record.status.is_pending() {
                record.status = PaymentStatus::Error;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn is_unique_address(&self, address: &IntegratedAddress) -> Result<bool, StoreError> {
        Ok(!self.payments.lock().unwrap().values().any(|record| {
            record.payment_id == address.payment_id
                || record.integrated_address == address.address
        }))
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError> {
        let record = PaymentRecord {
            payment_id: payment.address.payment_id,
            status: PaymentStatus::Pending,
            atomic_amount: i64::try_from(payment.atomic_amount)
                .map_err(|_| StoreError::AmountOutOfRange(payment.atomic_amount))?,
            integrated_address: payment.address.address,
            store_id: payment.store_id,
            creation_time: time::OffsetDateTime::now_utc(),
        };
        let mut payments = self.payments.lock().unwrap();
        if std::mem::take(&mut *self.race_next_insert.lock().unwrap()) {
            payments.insert(record.payment_id.clone(), record.clone());
        }
        if payments.values().any(|stored| {
            stored.payment_id == record.payment_id
                || stored.integrated_address == record.integrated_address
        }) {
            return Err(StoreError::AddressTaken);
        }
        payments.insert(record.payment_id.clone(), record.clone());
        Ok(record)
    }

    async fn payment_by_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.payments.lock().unwrap().get(payment_id).cloned())
    }

    async fn secret_key(&self, _store_id: i32) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn payments_by_ids(
        &self,
        store_id: i32,
        payment_ids: &[String],
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let payments = self.payments.lock().unwrap();
        Ok(payment_ids
            .iter()
            .filter_map(|id| payments.get(id))
            .filter(|record| record.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn list_payments(
        &self,
        store_id: i32,
        filter: PaymentFilter,
    ) -> Result<PaymentListing, StoreError> {
        let mut matching: Vec<_> = self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.store_id == store_id)
            .filter(|record| filter.status.is_none_or(|status| record.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| match filter.sort_by {
            PaymentSortKey::CreationTime => a.creation_time.cmp(&b.creation_time),
            PaymentSortKey::AtomicAmount => a.atomic_amount.cmp(&b.atomic_amount),
        });
        if filter.descending {
            matching.reverse();
        }
        let total = matching.len() as i64;
        let payments = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok(PaymentListing { total, payments })
    }
}

/// Everything a context or registry needs, wired to fakes.
///
/// Policy: 60 minute TTL, 3 confirmations, one tick per minute.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub wallets: Arc<FakeWalletFactory>,
    pub live: LiveStatusHub,
    pub policy: SharedPolicy,
    pub notifier: Notifier,
    pub webhook_rx: WebhookDeliveryReceiver,
}

impl Harness {
    pub fn new() -> Self {
        let (webhook_tx, webhook_rx) = webhook_delivery_channel();
        let live = LiveStatusHub::new();
        Self {
            store: Arc::new(MemoryStore::default()),
            wallets: Arc::new(FakeWalletFactory::default()),
            notifier: Notifier::new(webhook_tx, live.clone()),
            live,
            policy: Arc::new(tokio::sync::RwLock::new(PaymentPolicy {
                max_ttl: time::Duration::minutes(60),
                min_confirmations: 3,
            })),
            webhook_rx,
        }
    }

    pub fn deps(&self) -> WatcherDeps {
        WatcherDeps {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            policy: Arc::clone(&self.policy),
            config: WatcherConfig {
                poll_interval: Duration::from_secs(60),
            },
        }
    }

    pub fn registry(&self) -> StoreWalletRegistry {
        StoreWalletRegistry::new(self.wallets.clone(), self.deps())
    }
}
