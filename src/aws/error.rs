//! Security Hub error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use thiserror::Error;

/// Security Hub error categories for drift and conflict handling
#[derive(Debug, Error)]
pub enum HubError {
    /// Subscription or product was not found (drift signal during read)
    #[error("Resource not found: '{resource_id}'")]
    NotFound { resource_id: String },

    /// The product is already subscribed (safe to adopt instead of enable)
    #[error("Product is already subscribed")]
    AlreadySubscribed,

    /// Security Hub is not enabled in this account/region
    #[error("Security Hub is not enabled in this account/region")]
    HubNotEnabled,

    /// Subscription quota exceeded
    #[error("Product subscription quota exceeded")]
    QuotaExceeded,

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded")]
    Throttled,

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl HubError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, HubError::NotFound { .. })
    }

    /// Check if this is an "already subscribed" error
    pub fn is_already_subscribed(&self) -> bool {
        matches!(self, HubError::AlreadySubscribed)
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, HubError::Throttled)
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            HubError::HubNotEnabled => suggestion_for_code("InvalidAccessException"),
            HubError::QuotaExceeded => suggestion_for_code("LimitExceededException"),
            HubError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            _ => None,
        }
    }
}

/// Known Security Hub error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException"];

/// Known Security Hub error codes for "already subscribed" conditions
const ALREADY_SUBSCRIBED_CODES: &[&str] = &["ResourceConflictException"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known Security Hub error codes for a disabled hub
const HUB_NOT_ENABLED_CODES: &[&str] = &["InvalidAccessException"];

/// Known Security Hub error codes for quota exhaustion
const QUOTA_CODES: &[&str] = &["LimitExceededException"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> HubError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => HubError::NotFound {
            resource_id: message.clone(),
        },
        Some(c) if ALREADY_SUBSCRIBED_CODES.contains(&c) => HubError::AlreadySubscribed,
        Some(c) if THROTTLING_CODES.contains(&c) => HubError::Throttled,
        Some(c) if HUB_NOT_ENABLED_CODES.contains(&c) => HubError::HubNotEnabled,
        Some(c) if QUOTA_CODES.contains(&c) => HubError::QuotaExceeded,
        _ => HubError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain using `ProvideErrorMetadata` to extract `.code()` and
/// `.message()` from any AWS SDK error. Falls back to string matching on the
/// Debug representation if no typed error is found.
pub fn classify_anyhow_error(error: &anyhow::Error) -> HubError {
    use aws_sdk_securityhub::error::ProvideErrorMetadata;

    // Walk the error chain looking for any type that implements ProvideErrorMetadata.
    // AWS SDK operation errors implement this trait directly.
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<aws_sdk_securityhub::error::SdkError<
            aws_sdk_securityhub::operation::enable_import_findings_for_product::EnableImportFindingsForProductError,
        >>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
        if let Some(e) = cause.downcast_ref::<aws_sdk_securityhub::error::SdkError<
            aws_sdk_securityhub::operation::list_enabled_products_for_import::ListEnabledProductsForImportError,
        >>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
        if let Some(e) = cause.downcast_ref::<aws_sdk_securityhub::error::SdkError<
            aws_sdk_securityhub::operation::disable_import_findings_for_product::DisableImportFindingsForProductError,
        >>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
    }

    // Fallback: extract error code from debug string representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&debug_str));
    }

    HubError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// All known Security Hub error codes for extraction from debug strings (flat list)
const ALL_KNOWN_CODES: &[&str] = &[
    // Not found
    "ResourceNotFoundException",
    // Already subscribed
    "ResourceConflictException",
    // Throttling
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    // Hub not enabled
    "InvalidAccessException",
    // Quota
    "LimitExceededException",
    // Bad input
    "InvalidInputException",
    // Authorization
    "AccessDeniedException",
];

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    for code in ALL_KNOWN_CODES {
        if debug_str.contains(code) {
            return Some((*code).to_string());
        }
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "InvalidAccessException",
        "Security Hub is not enabled in this account/region. Enable it before subscribing products.",
    ),
    (
        "LimitExceededException",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "ResourceConflictException",
        "The product is already subscribed. Import the existing subscription instead of enabling it again.",
    ),
    (
        "InvalidInputException",
        "Check that the product ARN matches a product offered in this region.",
    ),
    (
        "AccessDeniedException",
        "Check that your IAM policy allows securityhub:EnableImportFindingsForProduct and related actions.",
    ),
    (
        "Throttling",
        "AWS API rate limit hit. The operation will be retried automatically.",
    ),
    (
        "ThrottlingException",
        "AWS API rate limit hit. The operation will be retried automatically.",
    ),
    (
        "RequestLimitExceeded",
        "AWS API rate limit hit. The operation will be retried automatically.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
