//! Installation and caching of the external extraction utility.

use std::io::Write;
use std::path::PathBuf;

use fad_config::Config;
use fad_consts::consts;
use fad_tool_cache::{ToolCache, ToolCacheError};
use reqwest::Client;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("no tool cache directory could be determined for this platform")]
    NoCacheDir,

    #[error("failed to download '{url}': unexpected status {status}")]
    DownloadStatus {
        url: Url,
        status: reqwest::StatusCode,
    },

    #[error("failed to download '{url}'")]
    Download {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Cache(#[from] ToolCacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Resolve the download URL of the extraction utility for the given host
/// operating system (`std::env::consts::OS` names).
pub fn download_url(os: &str, config: &Config) -> Result<Url, ToolError> {
    config
        .tool
        .urls
        .get(os)
        .cloned()
        .ok_or_else(|| ToolError::UnsupportedPlatform(os.to_string()))
}

/// File name the utility is cached under for the given operating system.
pub fn tool_file_name(os: &str) -> String {
    if os == "windows" {
        format!("{}.exe", consts::TOOL_NAME)
    } else {
        consts::TOOL_NAME.to_string()
    }
}

/// Provision the extraction utility and return the path to its executable.
///
/// A completed cache entry short-circuits without any network activity;
/// otherwise the binary is downloaded and registered in the cache first.
pub async fn acquire(client: &Client, config: &Config) -> Result<PathBuf, ToolError> {
    let cache_root = config.tool.cache_dir().ok_or(ToolError::NoCacheDir)?;
    let cache = ToolCache::new(cache_root);
    let file_name = tool_file_name(std::env::consts::OS);

    if let Some(entry) = cache.find(consts::TOOL_NAME, &config.tool.version) {
        let tool_path = entry.join(&file_name);
        // The completion marker alone is not proof the binary survived, a
        // wiped entry directory still carries the marker of a previous run.
        if tool_path.is_file() {
            tracing::info!(
                "Found {} in cache @ {}",
                consts::TOOL_NAME,
                entry.display()
            );
            make_executable(&tool_path)?;
            return Ok(tool_path);
        }
        tracing::warn!(
            "Cache entry for {} is missing its binary, re-downloading",
            consts::TOOL_NAME
        );
    }

    download_and_cache(client, config, &cache, &file_name).await
}

async fn download_and_cache(
    client: &Client,
    config: &Config,
    cache: &ToolCache,
    file_name: &str,
) -> Result<PathBuf, ToolError> {
    let url = download_url(std::env::consts::OS, config)?;
    tracing::info!("Downloading {} from {}", consts::TOOL_NAME, url);

    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| ToolError::Download {
            url: url.clone(),
            source,
        })?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(ToolError::DownloadStatus {
            url,
            status: response.status(),
        });
    }

    let mut binary_tempfile = tempfile::NamedTempFile::new()?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| ToolError::Download {
            url: url.clone(),
            source,
        })?
    {
        binary_tempfile.as_file_mut().write_all(&chunk)?;
    }
    binary_tempfile.flush()?;

    // Set the exec bit before registration so the completion marker never
    // describes a non-executable binary. `fs_err::copy` carries the
    // permission bits over into the cache entry.
    make_executable(binary_tempfile.path())?;

    let entry = cache.cache_file(
        binary_tempfile.path(),
        file_name,
        consts::TOOL_NAME,
        &config.tool.version,
    )?;
    Ok(entry.join(file_name))
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<(), ToolError> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs_err::metadata(path)?.permissions().mode();
    if mode & 0o111 != 0o111 {
        fs_err::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<(), ToolError> {
    Ok(())
}
