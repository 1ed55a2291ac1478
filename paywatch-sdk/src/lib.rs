//! Shared types for paywatch.
//!
//! Everything a merchant backend or a customer-facing page needs to talk to a
//! paywatch server lives here: the payment status vocabulary, the webhook
//! event payload and its HMAC signature, and the live status frame format.
//! The `client` feature adds a webhook verifier and a live status watcher.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
