//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces the domain core depends
//! on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`SourceClient`] - typed wrapper over the source REST surface
//! - [`Blob`] - typed wrapper over the destination object store
//! - [`TokenSource`] - bearer token acquisition and refresh

pub mod blob;
pub mod source_client;
pub mod token_source;

pub use blob::{Blob, HeadResult};
pub use source_client::{DeltaPage, Item, SourceClient};
pub use token_source::{AuthError, TokenSource};
