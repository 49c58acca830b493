//! Security Hub product subscription client

use crate::aws::context::AwsContext;
use anyhow::{Context, Result};
use aws_sdk_securityhub::Client;
use tracing::{debug, info};

/// Security Hub client for managing product subscriptions
pub struct SecurityHubClient {
    client: Client,
}

/// One page of enabled product subscriptions
///
/// Entries are subscription ARNs; `next_token` carries the cursor for the
/// following page, `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPage {
    pub subscription_arns: Vec<String>,
    pub next_token: Option<String>,
}

impl SecurityHubClient {
    /// Create a new Security Hub client (loads AWS config from environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create a Security Hub client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.securityhub_client(),
        }
    }

    /// Enable findings import for a product
    ///
    /// # Arguments
    /// * `product_arn` - ARN of the findings provider product to enable
    ///
    /// # Returns
    /// The subscription ARN assigned by Security Hub
    pub async fn enable_product(&self, product_arn: &str) -> Result<String> {
        info!(product_arn = %product_arn, "Enabling product subscription");

        let response = self
            .client
            .enable_import_findings_for_product()
            .product_arn(product_arn)
            .send()
            .await
            .context("Failed to enable import findings for product")?;

        let subscription_arn = response
            .product_subscription_arn()
            .context("No product subscription ARN in response")?
            .to_string();

        info!(subscription_arn = %subscription_arn, "Product subscription enabled");

        Ok(subscription_arn)
    }

    /// Fetch one page of enabled product subscriptions
    ///
    /// # Arguments
    /// * `next_token` - Cursor from the previous page, `None` for the first page
    pub async fn list_subscriptions_page(
        &self,
        next_token: Option<String>,
    ) -> Result<SubscriptionPage> {
        let mut request = self.client.list_enabled_products_for_import();
        if let Some(token) = &next_token {
            request = request.next_token(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to list enabled products for import")?;

        let page = SubscriptionPage {
            subscription_arns: response.product_subscriptions().to_vec(),
            next_token: response.next_token().map(|s| s.to_string()),
        };

        debug!(
            count = page.subscription_arns.len(),
            has_more = page.next_token.is_some(),
            "Fetched product subscription page"
        );

        Ok(page)
    }

    /// Disable findings import for a subscription
    ///
    /// # Arguments
    /// * `subscription_arn` - The subscription ARN to disable
    pub async fn disable_product(&self, subscription_arn: &str) -> Result<()> {
        info!(subscription_arn = %subscription_arn, "Disabling product subscription");

        self.client
            .disable_import_findings_for_product()
            .product_subscription_arn(subscription_arn)
            .send()
            .await
            .context("Failed to disable import findings for product")?;

        info!(subscription_arn = %subscription_arn, "Product subscription disabled");

        Ok(())
    }
}

/// Trait for Security Hub subscription operations that can be mocked in tests.
///
/// This trait abstracts the Security Hub client operations to enable unit
/// testing of lifecycle logic without hitting real AWS.
///
/// Note: the page cursor is an owned `Option<String>` to work around mockall
/// lifetime limitations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait SubscriptionApi: Send + Sync {
    /// Enable findings import for a product, returning the subscription ARN
    async fn enable_product(&self, product_arn: &str) -> Result<String>;

    /// Fetch one cursor-bearing page of enabled product subscriptions
    async fn list_subscriptions_page(&self, next_token: Option<String>)
        -> Result<SubscriptionPage>;

    /// Disable findings import for a subscription
    async fn disable_product(&self, subscription_arn: &str) -> Result<()>;
}

impl SubscriptionApi for SecurityHubClient {
    async fn enable_product(&self, product_arn: &str) -> Result<String> {
        SecurityHubClient::enable_product(self, product_arn).await
    }

    async fn list_subscriptions_page(
        &self,
        next_token: Option<String>,
    ) -> Result<SubscriptionPage> {
        SecurityHubClient::list_subscriptions_page(self, next_token).await
    }

    async fn disable_product(&self, subscription_arn: &str) -> Result<()> {
        SecurityHubClient::disable_product(self, subscription_arn).await
    }
}
