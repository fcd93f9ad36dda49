//! Backup Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `DriveTarget`, `FileChange`, `DeltaCursor`, `SourceCheckpoint`
//! - **Port definitions** - Traits for adapters: `SourceClient`, `Blob`, `TokenSource`
//! - **Configuration** - Typed job configuration
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external
//! dependencies. Ports define trait interfaces that adapter crates
//! implement; the walker and worker pool in `backup-engine` depend only on
//! these traits, never on a concrete adapter.

pub mod config;
pub mod domain;
pub mod ports;
