use semver::Version;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use url::Url;

use crate::error::AppError;

const REPO_URL: &str = env!("CARGO_PKG_REPOSITORY");
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_RELEASE_ASSET_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "-updater/",
    env!("CARGO_PKG_VERSION")
);

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    tag_name: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize, Clone)]
struct ReleaseAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Result of comparing the running version with the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckInfo {
    pub current_version: String,
    pub target_tag: String,
    pub is_already_latest: bool,
    pub is_downgrade: bool,
}

impl UpdateCheckInfo {
    pub fn has_update(&self) -> bool {
        !self.is_already_latest && !self.is_downgrade
    }
}

fn create_runtime() -> Result<tokio::runtime::Runtime, AppError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Message(format!("Failed to create runtime: {e}")))
}

fn create_http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Message(format!("Failed to initialize HTTP client: {e}")))
}

/// Blocking wrapper for worker threads.
pub fn check_for_update_blocking() -> Result<UpdateCheckInfo, AppError> {
    create_runtime()?.block_on(check_for_update())
}

/// Blocking wrapper for worker threads.
pub fn download_and_apply_blocking(target_tag: &str) -> Result<(), AppError> {
    create_runtime()?.block_on(download_and_apply(target_tag))
}

pub async fn check_for_update() -> Result<UpdateCheckInfo, AppError> {
    let current_version = env!("CARGO_PKG_VERSION");
    let client = create_http_client()?;
    let target_tag = fetch_latest_release(&client).await?.tag_name;
    validate_target_tag(&target_tag)?;
    Ok(compare_versions(current_version, &target_tag))
}

fn compare_versions(current_version: &str, target_tag: &str) -> UpdateCheckInfo {
    let target_version = target_tag.trim_start_matches('v');
    UpdateCheckInfo {
        current_version: current_version.to_string(),
        target_tag: target_tag.to_string(),
        is_already_latest: target_version == current_version,
        is_downgrade: is_downgrade(current_version, target_version),
    }
}

fn is_downgrade(current_version: &str, target_version: &str) -> bool {
    match (Version::parse(current_version), Version::parse(target_version)) {
        (Ok(current), Ok(target)) => target < current,
        _ => false,
    }
}

/// Downloads the platform binary of `target_tag` and swaps it in for the running executable.
pub async fn download_and_apply(target_tag: &str) -> Result<(), AppError> {
    validate_target_tag(target_tag)?;
    let client = create_http_client()?;
    let expected_asset_name = release_asset_name()?;
    let release = fetch_release_by_tag(&client, target_tag).await?;
    let asset = release
        .assets
        .iter()
        .find(|asset| asset.name == expected_asset_name)
        .ok_or_else(|| {
            AppError::Message(format!(
                "Release {target_tag} does not include expected asset '{expected_asset_name}'."
            ))
        })?;
    if let Some(size) = asset.size {
        validate_download_size_limit(size, &asset.name)?;
    }

    let bytes = client
        .get(asset.browser_download_url.as_str())
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| AppError::Message(format!("Failed to download release asset: {e}")))?
        .error_for_status()
        .map_err(|e| AppError::Message(format!("Release asset request failed: {e}")))?
        .bytes()
        .await
        .map_err(|e| AppError::Message(format!("Failed to read release asset: {e}")))?;
    validate_download_size_limit(bytes.len() as u64, &asset.name)?;

    let current_binary = std::env::current_exe().map_err(|e| {
        AppError::Message(format!("Failed to resolve current executable path: {e}"))
    })?;
    replace_binary(&current_binary, &bytes)?;
    log::info!("installed {target_tag} over {}", current_binary.display());
    Ok(())
}

async fn fetch_latest_release(client: &reqwest::Client) -> Result<ReleaseInfo, AppError> {
    fetch_release(client, "latest").await
}

async fn fetch_release_by_tag(
    client: &reqwest::Client,
    tag: &str,
) -> Result<ReleaseInfo, AppError> {
    fetch_release(client, &format!("tags/{tag}")).await
}

async fn fetch_release(client: &reqwest::Client, suffix: &str) -> Result<ReleaseInfo, AppError> {
    let api_url = release_api_url(REPO_URL, suffix)?;
    client
        .get(api_url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| AppError::Message(format!("Failed to query release {suffix}: {e}")))?
        .error_for_status()
        .map_err(|e| AppError::Message(format!("Release API returned error: {e}")))?
        .json::<ReleaseInfo>()
        .await
        .map_err(|e| AppError::Message(format!("Failed to parse release response: {e}")))
}

fn validate_target_tag(tag: &str) -> Result<(), AppError> {
    if !tag.starts_with('v') {
        return Err(AppError::Message(format!(
            "Invalid version tag '{tag}': must start with 'v'."
        )));
    }
    if tag.len() > 64 {
        return Err(AppError::Message(format!(
            "Invalid version tag '{tag}': too long."
        )));
    }
    if !tag
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_')
        || tag.contains("..")
    {
        return Err(AppError::Message(format!(
            "Invalid version tag '{tag}': only [A-Za-z0-9._-] allowed."
        )));
    }
    Ok(())
}

fn release_api_url(repo_url: &str, suffix: &str) -> Result<Url, AppError> {
    let repo_url = Url::parse(repo_url)
        .map_err(|e| AppError::Message(format!("Invalid repository URL '{repo_url}': {e}")))?;
    let host = repo_url
        .host_str()
        .ok_or_else(|| AppError::Message(format!("Repository URL is missing host: {repo_url}")))?
        .to_string();

    let mut parts = repo_url.path().trim_matches('/').split('/');
    let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AppError::Message(format!(
            "Repository URL must be in '<host>/<owner>/<repo>' format: {repo_url}"
        )));
    };
    if owner.is_empty() || repo.is_empty() {
        return Err(AppError::Message(format!(
            "Repository URL must include owner and repo: {repo_url}"
        )));
    }
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    let api_path = if host == "github.com" {
        format!("/repos/{owner}/{repo}/releases/{suffix}")
    } else {
        format!("/api/v3/repos/{owner}/{repo}/releases/{suffix}")
    };

    let mut api_url = repo_url.clone();
    if host == "github.com" {
        api_url
            .set_host(Some("api.github.com"))
            .map_err(|_| AppError::Message("Failed to set GitHub API host.".to_string()))?;
    }
    api_url.set_path(&api_path);
    api_url.set_query(None);
    api_url.set_fragment(None);
    Ok(api_url)
}

fn release_asset_name() -> Result<String, AppError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    let name = match (os, arch) {
        ("macos", "x86_64") | ("macos", "aarch64") => "cc-switch-tui-darwin-universal",
        ("linux", "x86_64") => "cc-switch-tui-linux-x64-musl",
        ("linux", "aarch64") => "cc-switch-tui-linux-arm64-musl",
        ("windows", "x86_64") => "cc-switch-tui-windows-x64.exe",
        _ => {
            return Err(AppError::Message(format!(
                "Self-update is not supported for platform {os}/{arch}."
            )));
        }
    };
    Ok(name.to_string())
}

fn validate_download_size_limit(size_bytes: u64, asset_name: &str) -> Result<(), AppError> {
    if size_bytes > MAX_RELEASE_ASSET_SIZE_BYTES {
        return Err(AppError::Message(format!(
            "Release asset '{asset_name}' is too large ({size_bytes} bytes)."
        )));
    }
    Ok(())
}

/// Stages the new binary next to `target` and renames it over the old one.
fn replace_binary(target: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let parent = target.parent().ok_or_else(|| {
        AppError::Message("Current executable path has no parent directory.".to_string())
    })?;

    let mut staged =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| map_permission_error(parent, e))?;
    staged
        .write_all(bytes)
        .map_err(|e| map_permission_error(staged.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        std::fs::set_permissions(staged.path(), perms)
            .map_err(|e| map_permission_error(staged.path(), e))?;
    }

    staged
        .persist(target)
        .map_err(|e| map_permission_error(target, e.error))?;
    Ok(())
}

fn map_permission_error(target: &Path, err: std::io::Error) -> AppError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        return AppError::Message(format!(
            "Permission denied while updating {}. Re-run with elevated privileges or use your package manager.",
            target.display()
        ));
    }
    AppError::io(target, err)
}
