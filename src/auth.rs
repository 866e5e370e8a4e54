use std::path::PathBuf;

use crate::config::{config_dir, GitHubConfig};

/// Try to run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        return non_empty(&String::from_utf8_lossy(&output.stdout));
    }
    None
}

/// Stored token path: ~/.config/grab/token
fn token_path() -> Option<PathBuf> {
    Some(config_dir()?.join("token"))
}

fn load_stored_token() -> Option<String> {
    let token = std::fs::read_to_string(token_path()?).ok()?;
    non_empty(&token)
}

fn non_empty(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Find a GitHub token. A token is optional: without one requests are
/// unauthenticated. Sources, in order:
/// 1. `--token` flag
/// 2. Env var from config (`GITHUB_TOKEN` by default)
/// 3. Stored token in ~/.config/grab/token
/// 4. CLI command from config (`gh auth token` by default)
pub fn load_token(flag: Option<&str>, github: &GitHubConfig) -> Option<String> {
    resolve_token(flag, github, load_stored_token)
}

fn resolve_token(
    flag: Option<&str>,
    github: &GitHubConfig,
    stored: impl FnOnce() -> Option<String>,
) -> Option<String> {
    if let Some(token) = flag.and_then(non_empty) {
        return Some(token);
    }

    if let Some(env_var) = &github.token_env {
        if let Some(token) = std::env::var(env_var).ok().as_deref().and_then(non_empty) {
            tracing::debug!(env_var, "using token from environment");
            return Some(token);
        }
    }

    if let Some(token) = stored() {
        tracing::debug!("using stored token");
        return Some(token);
    }

    if let Some(cmd) = &github.token_command {
        if let Some(token) = try_cli_token(cmd) {
            tracing::debug!(command = %cmd, "using token from command");
            return Some(token);
        }
    }

    tracing::info!("no GitHub token found, requests will be unauthenticated");
    None
}
