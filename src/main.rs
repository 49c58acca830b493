//! hubsub: manage AWS Security Hub product subscriptions
//!
//! A thin driver over the subscription lifecycle adapter: enable a findings
//! provider, check whether a subscription still exists, disable it, or list
//! everything currently enabled. No state is persisted between invocations;
//! the remote listing is the authority.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hubsub::adapter::ProductSubscriptionAdapter;
use hubsub::aws::{get_current_account_id, AwsContext, SecurityHubClient};
use hubsub::config::{ProductArn, ProductSubscriptionConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hubsub")]
#[command(about = "Manage AWS Security Hub product subscriptions")]
#[command(version)]
struct Args {
    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enable findings import for a product
    Enable {
        /// Product ARN of the findings provider to enable
        #[arg(long)]
        product_arn: ProductArn,
    },

    /// Check whether a product subscription still exists
    Status {
        /// Subscription ARN returned when the product was enabled
        #[arg(long)]
        subscription_arn: String,
    },

    /// Disable findings import for a subscription
    Disable {
        /// Subscription ARN to disable
        #[arg(long)]
        subscription_arn: String,
    },

    /// Adopt an existing subscription and print its configuration
    Import {
        /// Subscription ARN to adopt
        #[arg(long)]
        subscription_arn: String,
    },

    /// List all enabled product subscriptions
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    // Print main error message
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    // Print error chain (causes)
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    // Surface a remediation hint for known Security Hub error codes
    if let Some(suggestion) = hubsub::aws::classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[2mHint: {suggestion}\x1b[0m");
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let aws = AwsContext::with_profile(&args.region, args.aws_profile.as_deref()).await;

    if let Some(profile) = &args.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    // Validates credentials before any Security Hub call
    let account_id = get_current_account_id(aws.sdk_config()).await?;
    info!(account_id = %account_id, region = %args.region, "Resolved AWS account");

    let adapter = ProductSubscriptionAdapter::new(SecurityHubClient::from_context(&aws));

    match args.command {
        Command::Enable { product_arn } => {
            let config = ProductSubscriptionConfig::new(product_arn);
            let state = adapter.create(&config).await?;

            match state.subscription_arn {
                Some(subscription_arn) => println!("{subscription_arn}"),
                None => anyhow::bail!(
                    "Subscription for {} was enabled but is not yet visible in the listing; \
                     re-run `hubsub list` to confirm",
                    state.product_arn
                ),
            }
        }

        Command::Status { subscription_arn } => {
            if adapter.exists(&subscription_arn).await? {
                println!("subscribed");
            } else {
                println!("not subscribed");
            }
        }

        Command::Disable { subscription_arn } => {
            adapter.delete(&subscription_arn).await?;
            println!("Disabled {subscription_arn}");
        }

        Command::Import { subscription_arn } => {
            let state = adapter.import(&subscription_arn).await?;
            println!("{}", state.product_arn);
        }

        Command::List { format } => {
            let subscriptions = adapter.list_all().await?;
            print_subscriptions(&subscriptions, &format)?;
        }
    }

    Ok(())
}

/// Render the enabled subscriptions in the requested format
fn print_subscriptions(subscriptions: &[String], format: &str) -> Result<()> {
    if subscriptions.is_empty() {
        println!("No product subscriptions enabled.");
        return Ok(());
    }

    if format == "json" {
        let entries: Vec<_> = subscriptions
            .iter()
            .map(|subscription_arn| {
                serde_json::json!({
                    "subscription_arn": subscription_arn,
                    "product_arn": ProductArn::from_subscription_arn(subscription_arn)
                        .map(|arn| arn.to_string())
                        .ok(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{:<100} {:<60}", "SUBSCRIPTION_ARN", "PRODUCT");
        println!("{}", "-".repeat(130));
        for subscription_arn in subscriptions {
            let product = ProductArn::from_subscription_arn(subscription_arn)
                .map(|arn| arn.to_string())
                .unwrap_or_else(|_| "-".to_string());
            println!("{subscription_arn:<100} {product:<60}");
        }
        println!("\nTotal: {} subscriptions", subscriptions.len());
    }

    Ok(())
}
