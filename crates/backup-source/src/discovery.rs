//! Drive discovery
//!
//! Enumerates the drives available to the configured credentials: one
//! drive per user for personal sources, one drive per group for team
//! sources. The source's allow-list (which users/groups to actually back
//! up) is applied by the caller in `backup-engine`; this module always
//! enumerates the full set the credentials can see.

use backup_core::domain::{DriveId, DriveKind, DriveTarget};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::SourceHttpClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphUsersResponse {
    value: Vec<GraphUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphGroup {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphGroupsResponse {
    value: Vec<GraphGroup>,
}

#[derive(Debug, Deserialize)]
struct GraphDrive {
    id: String,
}

/// List every personal drive the credentials can see, one per licensed
/// user that actually has a provisioned OneDrive (users without one 404
/// on `/users/{id}/drive` and are silently skipped).
pub async fn list_personal_drives(client: &SourceHttpClient) -> anyhow::Result<Vec<DriveTarget>> {
    let users: GraphUsersResponse = client
        .execute_with_retry(
            reqwest::Method::GET,
            "/users?$top=999&$select=id,displayName,userPrincipalName",
            "metadata",
        )
        .await?
        .json()
        .await?;

    debug!(count = users.value.len(), "enumerated users");

    let mut drives = Vec::new();
    for user in users.value {
        let path = format!("/users/{}/drive", user.id);
        match client
            .execute_with_retry(reqwest::Method::GET, &path, "metadata")
            .await
        {
            Ok(response) => {
                let drive: GraphDrive = response.json().await?;
                let drive_id = DriveId::new(drive.id)?;
                let display_name = user
                    .user_principal_name
                    .or(user.display_name)
                    .unwrap_or(user.id);
                drives.push(DriveTarget::new(
                    drive_id,
                    display_name.clone(),
                    DriveKind::Personal,
                    display_name,
                ));
            }
            Err(e) => {
                warn!(user_id = user.id, error = %e, "user has no provisioned drive, skipping");
            }
        }
    }

    Ok(drives)
}

/// List every team (group-owned) drive the credentials can see.
pub async fn list_team_drives(client: &SourceHttpClient) -> anyhow::Result<Vec<DriveTarget>> {
    let groups: GraphGroupsResponse = client
        .execute_with_retry(
            reqwest::Method::GET,
            "/groups?$top=999&$select=id,displayName",
            "metadata",
        )
        .await?
        .json()
        .await?;

    debug!(count = groups.value.len(), "enumerated groups");

    let mut drives = Vec::new();
    for group in groups.value {
        let path = format!("/groups/{}/drive", group.id);
        match client
            .execute_with_retry(reqwest::Method::GET, &path, "metadata")
            .await
        {
            Ok(response) => {
                let drive: GraphDrive = response.json().await?;
                let drive_id = DriveId::new(drive.id)?;
                let display_name = group.display_name.unwrap_or(group.id);
                drives.push(DriveTarget::new(
                    drive_id,
                    display_name.clone(),
                    DriveKind::Team,
                    display_name,
                ));
            }
            Err(e) => {
                warn!(group_id = group.id, error = %e, "group has no drive, skipping");
            }
        }
    }

    Ok(drives)
}
