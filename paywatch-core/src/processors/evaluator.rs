//! Decides what a poll tick does with one pending payment.
//!
//! The check order matters:
//! 1. every deposit must have the configured confirmations, otherwise nothing
//!    happens even when the funds already cover the amount;
//! 2. enough confirmed funds settle the payment;
//! 3. past its TTL a payment only expires once the wallet has caught up with
//!    the daemon, so funds already on chain but not yet scanned locally do not
//!    cause a false expiry.

use crate::config::PaymentPolicy;
use crate::processors::pending_set::PendingPayment;
use crate::wallet::Deposit;
use smallvec::SmallVec;

/// How many blocks the wallet may trail the daemon and still count as synced.
pub const SYNC_LAG_TOLERANCE: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NoChange,
    Paid,
    Expired,
}

/// Everything [`evaluate`] looks at, captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub received_atomic_amount: u64,
    /// `daemon_height - deposit_height` for each deposit.
    pub deposit_confirmations: SmallVec<[u64; 4]>,
    pub required_confirmations: u64,
    pub expected_atomic_amount: u64,
    pub elapsed: time::Duration,
    pub max_ttl: time::Duration,
    pub wallet_height: u64,
    pub daemon_height: u64,
}

impl Observation {
    /// Build the observation of `payment` from what the wallet reported.
    pub fn of(
        payment: &PendingPayment,
        deposits: &[Deposit],
        policy: &PaymentPolicy,
        wallet_height: u64,
        daemon_height: u64,
        now: time::OffsetDateTime,
    ) -> Self {
        let received_atomic_amount = deposits
            .iter()
            .fold(0u64, |sum, deposit| sum.saturating_add(deposit.amount));
        let deposit_confirmations = deposits
            .iter()
            .map(|deposit| daemon_height.saturating_sub(deposit.height))
            .collect();
        Self {
            received_atomic_amount,
            deposit_confirmations,
            required_confirmations: policy.min_confirmations,
            expected_atomic_amount: payment.expected_atomic_amount,
            elapsed: now - payment.created_at,
            max_ttl: policy.max_ttl,
            wallet_height,
            daemon_height,
        }
    }

    fn sync_lag(&self) -> u64 {
        self.daemon_height.saturating_sub(self.wallet_height)
    }
}

pub fn evaluate(observation: &Observation) -> Verdict {
    if observation
        .deposit_confirmations
        .iter()
        .any(|&confirmations| confirmations < observation.required_confirmations)
    {
        return Verdict::NoChange;
    }
    if observation.received_atomic_amount >= observation.expected_atomic_amount {
        return Verdict::Paid;
    }
    if observation.elapsed > observation.max_ttl
        && observation.sync_lag() <= SYNC_LAG_TOLERANCE
    {
        return Verdict::Expired;
    }
    Verdict::NoChange
}
