//! Backup Source - Graph-style REST client adapter
//!
//! Implements the `backup-core` ports against a hosted document-store
//! REST API (Microsoft Graph-shaped): drive discovery, delta queries, the
//! fallback children listing, and streaming file download.
//!
//! ## Modules
//!
//! - [`client`] - HTTP transport: auth headers, the uniform retry policy
//! - [`token`] - client-credentials bearer token acquisition
//! - [`discovery`] - drive enumeration
//! - [`delta`] - delta page fetch and parsing
//! - [`rate_limit`] - adaptive per-endpoint rate limiting
//! - [`source_client_impl`] - the [`backup_core::ports::SourceClient`] impl

pub mod client;
pub mod delta;
pub mod discovery;
pub mod rate_limit;
pub mod source_client_impl;
pub mod token;

pub use source_client_impl::GraphSourceClient;
pub use token::{ClientCredentialsConfig, ClientCredentialsTokenSource};
