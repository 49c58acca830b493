//! Product subscription lifecycle operations
//!
//! Maps declarative create/read/delete onto the Security Hub enable, list,
//! and disable calls. The remote API is authoritative: the adapter holds no
//! copy of truth beyond the identity handed in, and a read that finds the
//! subscription gone clears that identity rather than failing.
//!
//! The adapter performs no retries; the SDK transport layer beneath the
//! client owns retry and backoff. Callers must not issue concurrent
//! lifecycle operations against the same identity.

use crate::aws::securityhub::SubscriptionApi;
use crate::config::{ProductArn, ProductSubscriptionConfig, SubscriptionState};
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Lifecycle adapter for Security Hub product subscriptions.
///
/// Generic over [`SubscriptionApi`] so the remote client is an explicit
/// dependency rather than ambient state, and so tests can substitute a mock.
pub struct ProductSubscriptionAdapter<A> {
    api: A,
}

impl<A: SubscriptionApi> ProductSubscriptionAdapter<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Enable findings import for the configured product.
    ///
    /// The subscription ARN returned by Security Hub becomes the entity's
    /// identity. A read follows immediately to confirm the subscription is
    /// visible in the remote listing; if it is not, the returned state has
    /// its identity cleared.
    pub async fn create(&self, config: &ProductSubscriptionConfig) -> Result<SubscriptionState> {
        debug!(product_arn = %config.product_arn, "Enabling product subscription");

        let subscription_arn = self
            .api
            .enable_product(&config.product_arn)
            .await
            .with_context(|| {
                format!(
                    "Failed to enable product subscription for {}",
                    config.product_arn
                )
            })?;

        let mut state = SubscriptionState {
            product_arn: config.product_arn.clone(),
            subscription_arn: Some(subscription_arn),
        };

        self.read(&mut state).await?;

        Ok(state)
    }

    /// Refresh tracked state against the remote listing.
    ///
    /// Returns whether the subscription still exists. When it is gone the
    /// identity is cleared - out-of-band deletion is a drift signal, not an
    /// error. A failed scan propagates as an error and leaves the identity
    /// untouched; partial results are discarded.
    pub async fn read(&self, state: &mut SubscriptionState) -> Result<bool> {
        let Some(subscription_arn) = state.subscription_arn.clone() else {
            return Ok(false);
        };

        debug!(subscription_arn = %subscription_arn, "Reading product subscriptions");

        let found = self.exists(&subscription_arn).await.with_context(|| {
            format!("Failed to read product subscriptions to find {subscription_arn}")
        })?;

        if !found {
            warn!(
                subscription_arn = %subscription_arn,
                "Product subscription not found, clearing tracked identity"
            );
            state.subscription_arn = None;
        }

        Ok(found)
    }

    /// Scan the enabled product subscriptions for a matching ARN.
    ///
    /// Walks cursor-bearing pages and stops fetching as soon as a match is
    /// found. Subscription ARNs are unique, so the first match is the only
    /// one.
    pub async fn exists(&self, subscription_arn: &str) -> Result<bool> {
        let mut next_token: Option<String> = None;

        loop {
            let page = self.api.list_subscriptions_page(next_token).await?;

            if page
                .subscription_arns
                .iter()
                .any(|arn| arn == subscription_arn)
            {
                return Ok(true);
            }

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(false),
            }
        }
    }

    /// Disable findings import for a subscription.
    ///
    /// Remote rejection (already disabled, not found) propagates as an
    /// error; nothing is retried here.
    pub async fn delete(&self, subscription_arn: &str) -> Result<()> {
        self.api
            .disable_product(subscription_arn)
            .await
            .with_context(|| format!("Failed to disable product subscription {subscription_arn}"))
    }

    /// Adopt an existing subscription by its ARN.
    ///
    /// Verifies the subscription is present in the remote listing and
    /// reconstructs its configuration from the subscription ARN.
    pub async fn import(&self, subscription_arn: &str) -> Result<SubscriptionState> {
        let found = self.exists(subscription_arn).await.with_context(|| {
            format!("Failed to read product subscriptions to find {subscription_arn}")
        })?;

        anyhow::ensure!(
            found,
            "Product subscription {subscription_arn} is not enabled"
        );

        let product_arn = ProductArn::from_subscription_arn(subscription_arn)?;

        Ok(SubscriptionState {
            product_arn,
            subscription_arn: Some(subscription_arn.to_string()),
        })
    }

    /// Collect every enabled product subscription across all pages.
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut subscriptions = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .api
                .list_subscriptions_page(next_token)
                .await
                .context("Failed to list enabled product subscriptions")?;

            subscriptions.extend(page.subscription_arns);

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(subscriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::securityhub::{MockSubscriptionApi, SubscriptionPage};
    use mockall::Sequence;

    const PRODUCT_ARN: &str =
        "arn:aws:securityhub:us-east-1:123456789012:product/crowdstrike/crowdstrike-falcon";
    const SUBSCRIPTION_ARN: &str =
        "arn:aws:securityhub:us-east-1:123456789012:product-subscription/crowdstrike/crowdstrike-falcon";

    fn config() -> ProductSubscriptionConfig {
        ProductSubscriptionConfig::new(ProductArn::parse(PRODUCT_ARN).unwrap())
    }

    fn state_with_identity() -> SubscriptionState {
        SubscriptionState {
            product_arn: ProductArn::parse(PRODUCT_ARN).unwrap(),
            subscription_arn: Some(SUBSCRIPTION_ARN.to_string()),
        }
    }

    fn page(arns: &[&str], next_token: Option<&str>) -> SubscriptionPage {
        SubscriptionPage {
            subscription_arns: arns.iter().map(|s| s.to_string()).collect(),
            next_token: next_token.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn create_returns_confirmed_identity() {
        let mut mock = MockSubscriptionApi::new();
        mock.expect_enable_product()
            .withf(|arn| arn == PRODUCT_ARN)
            .times(1)
            .returning(|_| Ok(SUBSCRIPTION_ARN.to_string()));
        mock.expect_list_subscriptions_page()
            .times(1)
            .returning(|_| Ok(page(&[SUBSCRIPTION_ARN], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let state = adapter.create(&config()).await.unwrap();

        assert!(state.exists());
        assert_eq!(state.subscription_arn.as_deref(), Some(SUBSCRIPTION_ARN));
        assert_eq!(state.product_arn.as_str(), PRODUCT_ARN);
    }

    #[tokio::test]
    async fn create_wraps_remote_failure_with_product_arn() {
        let mut mock = MockSubscriptionApi::new();
        // times(1) also asserts the failure is not retried
        mock.expect_enable_product()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("LimitExceededException: quota exceeded")));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let err = adapter.create(&config()).await.unwrap_err();

        let rendered = format!("{err:#}");
        assert!(rendered.contains(PRODUCT_ARN), "missing ARN in: {rendered}");
        assert!(rendered.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn read_finds_match_on_last_page() {
        let mut mock = MockSubscriptionApi::new();
        let mut seq = Sequence::new();
        mock.expect_list_subscriptions_page()
            .withf(|token| token.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["other-1"], Some("t1"))));
        mock.expect_list_subscriptions_page()
            .withf(|token| token.as_deref() == Some("t1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["other-2"], Some("t2"))));
        mock.expect_list_subscriptions_page()
            .withf(|token| token.as_deref() == Some("t2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["other-3", SUBSCRIPTION_ARN], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = state_with_identity();

        assert!(adapter.read(&mut state).await.unwrap());
        assert!(state.exists());
    }

    #[tokio::test]
    async fn read_stops_fetching_after_match() {
        let mut mock = MockSubscriptionApi::new();
        // The first page matches and advertises another page; times(1) fails
        // the test if the adapter fetches past the match.
        mock.expect_list_subscriptions_page()
            .times(1)
            .returning(|_| Ok(page(&[SUBSCRIPTION_ARN], Some("t1"))));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = state_with_identity();

        assert!(adapter.read(&mut state).await.unwrap());
    }

    #[tokio::test]
    async fn read_clears_identity_when_subscription_gone() {
        let mut mock = MockSubscriptionApi::new();
        let mut seq = Sequence::new();
        mock.expect_list_subscriptions_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["other-1"], Some("t1"))));
        mock.expect_list_subscriptions_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["other-2"], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = state_with_identity();

        let found = adapter.read(&mut state).await.unwrap();

        assert!(!found);
        assert!(!state.exists(), "identity should be cleared on drift");
    }

    #[tokio::test]
    async fn read_error_leaves_identity_intact() {
        let mut mock = MockSubscriptionApi::new();
        let mut seq = Sequence::new();
        mock.expect_list_subscriptions_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["other-1"], Some("t1"))));
        mock.expect_list_subscriptions_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("ThrottlingException: slow down")));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = state_with_identity();

        let err = adapter.read(&mut state).await.unwrap_err();

        // A failed scan must not be conflated with "scanned all pages, not
        // found": the identity survives.
        assert!(state.exists());
        let rendered = format!("{err:#}");
        assert!(rendered.contains(SUBSCRIPTION_ARN));
    }

    #[tokio::test]
    async fn read_is_idempotent() {
        let mut mock = MockSubscriptionApi::new();
        mock.expect_list_subscriptions_page()
            .times(2)
            .returning(|_| Ok(page(&[SUBSCRIPTION_ARN], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = state_with_identity();

        assert!(adapter.read(&mut state).await.unwrap());
        assert!(adapter.read(&mut state).await.unwrap());
        assert_eq!(state.subscription_arn.as_deref(), Some(SUBSCRIPTION_ARN));
    }

    #[tokio::test]
    async fn read_without_identity_makes_no_remote_calls() {
        // No expectations registered: any remote call would panic the mock.
        let mock = MockSubscriptionApi::new();

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = SubscriptionState {
            product_arn: ProductArn::parse(PRODUCT_ARN).unwrap(),
            subscription_arn: None,
        };

        assert!(!adapter.read(&mut state).await.unwrap());
    }

    #[tokio::test]
    async fn delete_disables_subscription() {
        let mut mock = MockSubscriptionApi::new();
        mock.expect_disable_product()
            .withf(|arn| arn == SUBSCRIPTION_ARN)
            .times(1)
            .returning(|_| Ok(()));

        let adapter = ProductSubscriptionAdapter::new(mock);
        adapter.delete(SUBSCRIPTION_ARN).await.unwrap();
    }

    #[tokio::test]
    async fn delete_wraps_remote_failure_with_identity() {
        let mut mock = MockSubscriptionApi::new();
        // times(1) also asserts the failure is not retried
        mock.expect_disable_product()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("ResourceNotFoundException: already gone")));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let err = adapter.delete(SUBSCRIPTION_ARN).await.unwrap_err();

        let rendered = format!("{err:#}");
        assert!(rendered.contains(SUBSCRIPTION_ARN));
        assert!(rendered.contains("already gone"));
    }

    #[tokio::test]
    async fn delete_then_read_reports_gone() {
        let mut mock = MockSubscriptionApi::new();
        mock.expect_disable_product()
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_list_subscriptions_page()
            .times(1)
            .returning(|_| Ok(page(&[], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let mut state = state_with_identity();

        adapter.delete(SUBSCRIPTION_ARN).await.unwrap();

        assert!(!adapter.read(&mut state).await.unwrap());
        assert!(!state.exists());
    }

    #[tokio::test]
    async fn import_adopts_existing_subscription() {
        let mut mock = MockSubscriptionApi::new();
        mock.expect_list_subscriptions_page()
            .times(1)
            .returning(|_| Ok(page(&[SUBSCRIPTION_ARN], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let state = adapter.import(SUBSCRIPTION_ARN).await.unwrap();

        assert_eq!(state.product_arn.as_str(), PRODUCT_ARN);
        assert_eq!(state.subscription_arn.as_deref(), Some(SUBSCRIPTION_ARN));
    }

    #[tokio::test]
    async fn import_fails_when_subscription_missing() {
        let mut mock = MockSubscriptionApi::new();
        mock.expect_list_subscriptions_page()
            .times(1)
            .returning(|_| Ok(page(&["other-1"], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let err = adapter.import(SUBSCRIPTION_ARN).await.unwrap_err();

        assert!(format!("{err:#}").contains("not enabled"));
    }

    #[tokio::test]
    async fn list_all_collects_every_page() {
        let mut mock = MockSubscriptionApi::new();
        let mut seq = Sequence::new();
        mock.expect_list_subscriptions_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["a", "b"], Some("t1"))));
        mock.expect_list_subscriptions_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["c"], None)));

        let adapter = ProductSubscriptionAdapter::new(mock);
        let all = adapter.list_all().await.unwrap();

        assert_eq!(all, vec!["a", "b", "c"]);
    }
}
