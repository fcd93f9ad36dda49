//! Composition root
//!
//! Turns a [`SourceConfig`]/[`DestinationConfig`] from the loaded YAML
//! into the concrete adapter instances `backup-engine` needs
//! (`Arc<dyn SourceClient>`, `Arc<dyn Blob>`). Credentials are never
//! stored in the YAML config; they are read from environment variables
//! namespaced by the source/destination name, mirroring how the teacher
//! keeps OAuth tokens out of its own config file.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use backup_core::config::{DestinationConfig, DestinationKind, SourceConfig};
use backup_core::ports::SourceClient;
use backup_source::client::SourceHttpClient;
use backup_source::source_client_impl::GraphSourceClient;
use backup_source::token::{ClientCredentialsConfig, ClientCredentialsTokenSource};
use backup_storage::{AzureBlobDest, S3Blob};

fn env_var(prefix: &str, suffix: &str) -> Result<String> {
    let key = format!("{prefix}_{suffix}");
    std::env::var(&key).with_context(|| format!("missing environment variable {key}"))
}

fn env_prefix(name: &str) -> String {
    name.to_uppercase().replace(['-', ' '], "_")
}

/// Build the source client for a configured source, using
/// `{SOURCE}_CLIENT_ID`/`{SOURCE}_CLIENT_SECRET`/`{SOURCE}_TENANT_ID` for
/// the client-credentials grant.
pub fn build_source_client(source: &SourceConfig) -> Result<Arc<dyn SourceClient>> {
    let prefix = env_prefix(&source.name);
    let client_id = env_var(&prefix, "CLIENT_ID")?;
    let client_secret = env_var(&prefix, "CLIENT_SECRET")?;
    let tenant_id = env_var(&prefix, "TENANT_ID")?;

    let token_config = ClientCredentialsConfig::new(client_id, client_secret, tenant_id);
    let token_source = Arc::new(ClientCredentialsTokenSource::new(token_config));
    let http_client = Arc::new(SourceHttpClient::new(token_source));
    Ok(Arc::new(GraphSourceClient::new(http_client)))
}

/// Build the destination blob store for a configured destination, using
/// `{DESTINATION}_S3_ENDPOINT_URL` (optional, for S3-compatible stores
/// other than AWS) or `{DESTINATION}_AZURE_ACCOUNT`/`_AZURE_KEY`.
pub async fn build_destination(destination: &DestinationConfig) -> Result<Arc<dyn backup_core::ports::Blob>> {
    let prefix = env_prefix(&destination.name);
    match destination.kind {
        DestinationKind::S3 => {
            let endpoint_url = std::env::var(format!("{prefix}_S3_ENDPOINT_URL")).ok();
            let blob = S3Blob::from_env(
                destination.bucket.clone(),
                destination.prefix.clone(),
                destination.region.clone(),
                endpoint_url,
            )
            .await;
            Ok(Arc::new(blob))
        }
        DestinationKind::Azure => {
            let account = env_var(&prefix, "AZURE_ACCOUNT")?;
            let key = env_var(&prefix, "AZURE_KEY")?;
            let blob = AzureBlobDest::new(account, &key, destination.bucket.clone(), destination.prefix.clone())
                .map_err(|e| anyhow!("failed to build azure destination {}: {e}", destination.name))?;
            Ok(Arc::new(blob))
        }
    }
}
