//! GitHub token discovery.

use reviewer_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variables checked for a token, in order.
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Resolve the token used for GitHub requests.
///
/// Order: the configured token, `GITHUB_TOKEN`, `GH_TOKEN`, then the
/// token of a logged-in `gh` CLI. Returns `None` when none is available;
/// requests are then sent unauthenticated.
pub async fn resolve_token(configured: Option<&str>) -> Option<String> {
    let from_env = TOKEN_ENV_VARS
        .iter()
        .map(|var| std::env::var(var).ok());
    if let Some(token) = first_token(std::iter::once(configured.map(String::from)).chain(from_env))
    {
        return Some(token);
    }

    match gh_auth_token().await {
        Ok(token) => Some(token),
        Err(e) => {
            warn!(error = %e, "No GitHub token found, requests will be unauthenticated");
            None
        }
    }
}

/// First candidate that is non-blank after trimming.
fn first_token(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

/// Token of the `gh` CLI's active login.
async fn gh_auth_token() -> Result<String> {
    debug!("Asking gh CLI for a token");

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .map_err(|e| Error::Command(format!("Failed to run gh: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Command(format!(
            "gh auth token failed: {}",
            stderr.trim()
        )));
    }

    first_token([Some(String::from_utf8_lossy(&output.stdout).into_owned())])
        .ok_or_else(|| Error::Command("gh auth token returned an empty token".to_string()))
}
