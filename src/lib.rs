//! hubsub - AWS Security Hub product subscription lifecycle
//!
//! This crate manages product subscriptions: the activation records that
//! authorize a third-party findings provider to publish findings into
//! Security Hub. Lifecycle operations (create/read/delete) are mapped onto
//! the Security Hub API, with the remote service as the authority on what
//! is currently subscribed.

pub mod adapter;
pub mod aws;
pub mod config;
