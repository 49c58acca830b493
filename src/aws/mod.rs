//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - Security Hub: product subscription management
//! - STS: account ID lookup

pub mod account;
pub mod context;
pub mod error;
pub mod securityhub;

// Core clients
pub use account::{get_current_account_id, AccountId};
pub use context::AwsContext;
pub use securityhub::{SecurityHubClient, SubscriptionApi, SubscriptionPage};

// Error handling
pub use error::{classify_anyhow_error, classify_aws_error, HubError};

#[cfg(test)]
pub use securityhub::MockSubscriptionApi;
