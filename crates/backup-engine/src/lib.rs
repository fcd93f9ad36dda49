//! Backup Engine - delta walk, worker pool, and job orchestration
//!
//! Provides:
//! - [`walker::DeltaWalker`] - drives the source's delta/change-tracking
//!   API for one drive target, falling back to a recursive listing when a
//!   cursor is rejected as expired
//! - [`worker_pool::WorkerPool`] - the bounded producer/consumer pipeline
//!   that turns a walker's output into uploads
//! - [`checkpoint`] - persists delta cursors and source-level checkpoints
//!   through the `Blob` port
//! - [`engine::SyncEngine`] - the top-level orchestrator: one job, many
//!   sources, many targets per source, one worker pool per target
//!
//! This crate depends only on `backup-core`'s domain types and ports; it
//! holds no concrete adapter. Callers (the CLI) wire a `SourceClient` and
//! a `Blob` into [`engine::SyncEngine::new`].

pub mod checkpoint;
pub mod engine;
pub mod walker;
pub mod worker_pool;

pub use engine::SyncEngine;
pub use walker::DeltaWalker;
pub use worker_pool::WorkerPool;
