//! Remote-platform client trait, credential resolution, and retry/backoff
//! for `agentsync`.
//!
//! This crate defines [`ApiClient`] — the single interface through which
//! the reconciliation core interacts with the remote agent-platform tenant.
//! No core module should construct an HTTP request directly; instead it
//! depends on `agentsync-api` and programs against the trait.
//!
//! # Crate layout
//!
//! - [`client`] — the [`ApiClient`] trait and its per-kind sub-client traits.
//! - [`types`] — wire-level value types used in trait signatures.
//! - [`error`] — the [`error::ApiError`]/[`error::CredentialError`] enums.
//! - [`retry`] — pure backoff/classification helpers (§5 Retry).
//! - [`credentials`] — the [`credentials::CredentialProvider`] chain (§6.4).
//! - [`cancel`] — the cooperative [`cancel::CancellationToken`] (§5).

pub mod cancel;
pub mod client;
pub mod credentials;
pub mod error;
pub mod retry;
pub mod types;

pub use cancel::CancellationToken;
pub use client::{
    AgentsClient, ApiClient, BlocksClient, FoldersClient, IdentitiesClient, McpServersClient,
    ToolsClient,
};
pub use credentials::{CredentialChain, CredentialProvider};
pub use error::{ApiError, CredentialError, NetworkErrorKind};
pub use retry::RetryPolicy;
pub use types::{ListParams, Order, OrderBy, RemoteResource};
