//! Typed configuration and tracked state for product subscriptions
//!
//! ARN validation happens here, once, when the config is built. The
//! lifecycle adapter assumes it receives well-formed input and never
//! re-validates.

use derive_more::{Deref, Display};
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for ARN-shaped input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArnError {
    /// Not of the form arn:partition:service:region:account:resource
    #[error("'{0}' is not a valid ARN: expected arn:partition:service:region:account:resource")]
    Malformed(String),

    /// Structurally an ARN but not a subscription ARN
    #[error("'{0}' is not a product subscription ARN")]
    NotASubscription(String),
}

/// Strongly-typed product ARN identifying a findings provider's offering
///
/// Validated once at construction; immutable afterwards. Replacing the
/// product means destroying the subscription and creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Deref)]
pub struct ProductArn(String);

impl ProductArn {
    /// Parse and validate a product ARN.
    ///
    /// Accepts the six-section ARN shape. Region and account may be empty
    /// (AWS-owned products omit the account section).
    pub fn parse(s: &str) -> Result<Self, ArnError> {
        validate_arn(s)?;
        Ok(ProductArn(s.to_string()))
    }

    /// Derive the product ARN from a subscription ARN.
    ///
    /// Security Hub assigns subscription ARNs whose resource section is
    /// `product-subscription/<company>/<product>`; the corresponding product
    /// resource is `product/<company>/<product>`.
    pub fn from_subscription_arn(subscription_arn: &str) -> Result<Self, ArnError> {
        validate_arn(subscription_arn)?;

        let (prefix, resource) = split_resource(subscription_arn);
        let product_resource = resource
            .strip_prefix("product-subscription/")
            .ok_or_else(|| ArnError::NotASubscription(subscription_arn.to_string()))?;

        Ok(ProductArn(format!("{prefix}product/{product_resource}")))
    }

    /// The ARN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductArn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductArn::parse(s)
    }
}

/// Configuration for one product subscription.
///
/// `product_arn` is the single required field and is immutable for the life
/// of the subscription.
#[derive(Debug, Clone)]
pub struct ProductSubscriptionConfig {
    pub product_arn: ProductArn,
}

impl ProductSubscriptionConfig {
    pub fn new(product_arn: ProductArn) -> Self {
        Self { product_arn }
    }
}

/// Tracked state for one product subscription.
///
/// `subscription_arn` is assigned exactly once, when the product is enabled,
/// and cleared (set to `None`) when a read discovers the subscription is gone
/// from the remote listing. A cleared identity tells the caller to drop the
/// entity from tracked state.
#[derive(Debug, Clone)]
pub struct SubscriptionState {
    pub product_arn: ProductArn,
    pub subscription_arn: Option<String>,
}

impl SubscriptionState {
    /// Whether the subscription is still tracked as existing.
    pub fn exists(&self) -> bool {
        self.subscription_arn.is_some()
    }
}

/// Validate the six-section ARN shape.
fn validate_arn(s: &str) -> Result<(), ArnError> {
    let malformed = || ArnError::Malformed(s.to_string());

    let mut sections = s.splitn(6, ':');
    let prefix = sections.next().ok_or_else(malformed)?;
    let partition = sections.next().ok_or_else(malformed)?;
    let service = sections.next().ok_or_else(malformed)?;
    let _region = sections.next().ok_or_else(malformed)?;
    let _account = sections.next().ok_or_else(malformed)?;
    let resource = sections.next().ok_or_else(malformed)?;

    if prefix != "arn" || partition.is_empty() || service.is_empty() || resource.is_empty() {
        return Err(malformed());
    }

    Ok(())
}

/// Split an ARN into everything up to and including the final `:` and the
/// resource section.
fn split_resource(arn: &str) -> (&str, &str) {
    // validate_arn guarantees six sections, so the split point exists
    let resource_start = arn
        .match_indices(':')
        .nth(4)
        .map(|(idx, _)| idx + 1)
        .unwrap_or(arn.len());
    arn.split_at(resource_start)
}
