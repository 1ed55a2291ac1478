pub mod evaluator;
pub mod live_status;
pub mod notifier;
pub mod pending_set;
pub mod recovery;
pub mod registry;
pub mod store_wallet;
pub mod webhook_sender;

pub use evaluator::{Observation, SYNC_LAG_TOLERANCE, Verdict, evaluate};
pub use live_status::{LiveStatusHub, StatusObserver};
pub use notifier::{
    Notifier, WebhookDelivery, WebhookDeliveryReceiver, WebhookDeliverySender, WebhookTarget,
    webhook_delivery_channel,
};
pub use pending_set::{PendingPayment, PendingPaymentSet};
pub use recovery::ReconcileReport;
pub use registry::{RegistryError, StoreWalletRegistry};
pub use store_wallet::{StoreWalletContext, WatcherDeps};
pub use webhook_sender::{WebhookError, WebhookSender};
