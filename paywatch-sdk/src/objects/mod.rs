//! Request, response and event objects exchanged with a paywatch server.

pub mod payment;
pub mod webhook;
pub mod ws;

pub use payment::{
    ATOMIC_UNIT_SCALE, CreatePaymentRequest, ListPaymentsQuery, ParseStatusError,
    PaymentLookupRequest, PaymentPage, PaymentSortKey, PaymentStatus, PaymentView, SortOrder,
    StoreWalletStatus, atomic_to_decimal, total_pages,
};
pub use webhook::PaymentUpdateEvent;
