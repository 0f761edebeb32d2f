//! Error types for the remote platform client and credential resolution.
//!
//! [`ApiError`] is the single error type returned by all [`crate::ApiClient`]
//! sub-client methods. Variants are rich enough that callers (the apply and
//! upgrade executors) can classify failures without parsing messages.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`crate::ApiClient`] operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote returned a non-2xx status.
    #[error("request failed: {status} {message}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
        /// Parsed `Retry-After` delay, if the response carried one.
        retry_after: Option<Duration>,
    },

    /// A network-level error (connection reset, refused, timed out, DNS
    /// failure) occurred before a response was received.
    #[error("network error: {kind}: {message}")]
    Network {
        /// One of the recognized network error kinds (§5 Retry).
        kind: NetworkErrorKind,
        /// Human-readable detail.
        message: String,
    },

    /// The request was aborted because it exceeded its configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was aborted via a [`crate::CancellationToken`].
    #[error("request cancelled")]
    Cancelled,

    /// The response body could not be decoded as the expected type.
    #[error("decode error: {0}")]
    Decode(String),

    /// The requested remote resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Classify whether this error is retryable per §5 Retry.
    ///
    /// Network errors and HTTP 429/500/502/503/504 are retryable; every
    /// other HTTP status (2xx never reaches here, 3xx/4xx except 429) is
    /// not. Cancellation and decode errors are never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout(_) => true,
            Self::Request { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            Self::Cancelled | Self::Decode(_) | Self::NotFound(_) => false,
        }
    }

    /// `Retry-After` duration, if this is a rate-limit response carrying one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Request { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// True if this is specifically a 429 rate-limit response.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Request { status: 429, .. })
    }
}

/// Recognized network-level error kinds (§5 Retry).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// `ECONNRESET`.
    ConnectionReset,
    /// `ECONNREFUSED`.
    ConnectionRefused,
    /// `ETIMEDOUT`.
    TimedOut,
    /// `ENOTFOUND`.
    NotFound,
    /// `EAI_AGAIN`.
    DnsRetry,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::TimedOut => "ETIMEDOUT",
            Self::NotFound => "ENOTFOUND",
            Self::DnsRetry => "EAI_AGAIN",
        };
        f.write_str(s)
    }
}

/// Errors produced while resolving operator credentials (§6.4).
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No provider in the chain could resolve a credential.
    #[error("no credential could be resolved (tried: {tried:?})")]
    NoneResolved {
        /// Names of the providers that were attempted, in order.
        tried: Vec<String>,
    },

    /// A credential-helper subprocess failed or timed out.
    #[error("credential helper `{helper}` failed: {detail}")]
    HelperFailed {
        /// The helper binary path or name.
        helper: String,
        /// Human-readable failure detail.
        detail: String,
    },

    /// A vault or settings file existed but could not be decrypted/parsed.
    #[error("could not read credential source `{source_path}`: {detail}")]
    SourceUnreadable {
        /// Which source failed (vault path, settings file path, etc.).
        source_path: String,
        /// Human-readable failure detail.
        detail: String,
    },
}
