//! Integration tests for backup-source
//!
//! Uses wiremock to simulate the Graph-style source REST API and verifies
//! end-to-end behavior of drive discovery, delta queries, and downloads
//! through the `GraphSourceClient` / `SourceClient` surface.

mod common;

mod test_delta;
mod test_discovery;
mod test_download;
