//! Downloading a workflow artifact through the "download artifact" REST
//! endpoint.
//!
//! The endpoint answers with a 302 pointing at a time-limited signed blob
//! URL. The request is made on a client with redirects disabled so the
//! redirect target can be handed to the extraction strategy instead of being
//! followed by the HTTP client.

use std::path::{Path, PathBuf};

use fad_consts::consts;
use reqwest::{header, Client, StatusCode};
use url::Url;

use crate::extract::{ExtractError, Extractor};

#[derive(thiserror::Error, Debug)]
pub enum DownloadArtifactError {
    #[error("a destination path is required to download an artifact")]
    MissingPath,

    #[error("failed to construct the artifact endpoint url")]
    InvalidEndpoint(#[source] url::ParseError),

    #[error("failed to request the artifact archive")]
    Request(#[source] reqwest::Error),

    #[error("unable to download artifact: unexpected status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("unable to redirect to artifact download url")]
    MissingLocation,

    #[error("redirect location is not a valid url")]
    InvalidLocation(#[source] url::ParseError),

    #[error("unable to download and extract artifact: {source}")]
    Extract {
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Repository coordinates and credential used to locate an artifact.
#[derive(Debug, Clone)]
pub struct FindBy {
    pub repository_owner: String,
    pub repository_name: String,
    pub token: String,
}

/// Caller-facing options for [`fast_download_artifact`].
#[derive(Debug, Clone)]
pub struct DownloadArtifactOptions {
    /// Destination directory. Absence is a configuration error.
    pub path: Option<PathBuf>,
    pub find_by: FindBy,
    /// Base URL of the GitHub REST API.
    pub api_url: Url,
}

/// A fully destructured artifact download request.
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub artifact_id: u64,
    pub repository_owner: String,
    pub repository_name: String,
    pub token: String,
    pub path: Option<PathBuf>,
    pub api_url: Url,
}

/// Return `path`, creating the directory (ancestors included) when it does
/// not exist yet. Stat errors other than "not found" are returned unmodified.
pub fn resolve_or_create_directory(path: &Path) -> std::io::Result<PathBuf> {
    match fs_err::metadata(path) {
        Ok(_) => {
            tracing::debug!(
                "Artifact destination folder already exists: {}",
                path.display()
            );
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "Artifact destination folder does not exist, creating: {}",
                path.display()
            );
            fs_err::create_dir_all(path)?;
        }
        Err(e) => return Err(e),
    }

    Ok(path.to_path_buf())
}

/// Strip query parameters and fragment so signed-URL tokens never end up in
/// logs.
pub fn scrub_query_parameters(url: &Url) -> Url {
    let mut scrubbed = url.clone();
    scrubbed.set_query(None);
    scrubbed.set_fragment(None);
    scrubbed
}

fn artifact_endpoint(request: &ArtifactRequest) -> Result<Url, DownloadArtifactError> {
    Url::parse(&format!(
        "{}/repos/{}/{}/actions/artifacts/{}/zip",
        request.api_url.as_str().trim_end_matches('/'),
        request.repository_owner,
        request.repository_name,
        request.artifact_id,
    ))
    .map_err(DownloadArtifactError::InvalidEndpoint)
}

/// Download and extract a single artifact, returning the destination path.
///
/// `no_redirect_client` must have automatic redirect handling disabled; the
/// raw 302 response is part of the contract.
pub async fn download_artifact(
    no_redirect_client: &Client,
    request: &ArtifactRequest,
    extractor: &Extractor,
) -> Result<PathBuf, DownloadArtifactError> {
    let path = request
        .path
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(DownloadArtifactError::MissingPath)?;
    let download_path = resolve_or_create_directory(path)?;

    tracing::info!(
        "Downloading artifact '{}' from '{}/{}'",
        request.artifact_id,
        request.repository_owner,
        request.repository_name
    );

    let endpoint = artifact_endpoint(request)?;
    let response = no_redirect_client
        .get(endpoint)
        .bearer_auth(&request.token)
        .header(header::ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", consts::GITHUB_API_VERSION)
        .send()
        .await
        .map_err(DownloadArtifactError::Request)?;

    if response.status() != StatusCode::FOUND {
        return Err(DownloadArtifactError::UnexpectedStatus(response.status()));
    }

    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(DownloadArtifactError::MissingLocation)?;
    let location = Url::parse(location).map_err(DownloadArtifactError::InvalidLocation)?;

    tracing::info!(
        "Redirecting to blob download url: {}",
        scrub_query_parameters(&location)
    );

    tracing::info!("Starting download of artifact to: {}", download_path.display());
    extractor
        .stream_extract(&location, &download_path)
        .await
        .map_err(|source| DownloadArtifactError::Extract { source })?;
    tracing::info!("Artifact download completed successfully.");

    Ok(download_path)
}

/// Top-level entry point: destructures `options`, delegates to
/// [`download_artifact`] and, on any failure, emits a single operator-facing
/// warning before propagating the error. No retry happens here.
pub async fn fast_download_artifact(
    no_redirect_client: &Client,
    extractor: &Extractor,
    artifact_id: u64,
    options: DownloadArtifactOptions,
) -> Result<(), DownloadArtifactError> {
    let DownloadArtifactOptions {
        path,
        find_by:
            FindBy {
                repository_owner,
                repository_name,
                token,
            },
        api_url,
    } = options;

    let request = ArtifactRequest {
        artifact_id,
        repository_owner,
        repository_name,
        token,
        path,
        api_url,
    };

    match download_artifact(no_redirect_client, &request, extractor).await {
        Ok(_) => Ok(()),
        Err(error) => {
            tracing::warn!(
                "Download Artifact failed with error: {error}.\n\n\
                 Errors can be temporary, so please try again and optionally run with \
                 increased verbosity for more information.\n\n\
                 If the error persists, please check whether Actions and API requests are \
                 operating normally at {}",
                consts::GITHUB_STATUS_URL
            );
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_scrub_query_parameters() {
        let url = Url::parse("https://blob.example/a.zip?sig=abc&se=2024").unwrap();
        assert_eq!(
            scrub_query_parameters(&url).as_str(),
            "https://blob.example/a.zip"
        );
    }

    #[test]
    fn test_resolve_or_create_directory_creates_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        let resolved = resolve_or_create_directory(&nested).unwrap();
        assert_eq!(resolved, nested);
        assert!(nested.is_dir());

        // Idempotent on the second call.
        let resolved = resolve_or_create_directory(&nested).unwrap();
        assert_eq!(resolved, nested);
    }

    #[tokio::test]
    async fn test_missing_path_fails_before_any_network_call() {
        let (client, no_redirect_client) = crate::reqwest::build_reqwest_clients();
        let request = ArtifactRequest {
            artifact_id: 42,
            repository_owner: "acme".to_string(),
            repository_name: "widgets".to_string(),
            token: "token".to_string(),
            path: None,
            // An unroutable endpoint: reaching the network would error with
            // a request failure instead of the expected configuration error.
            api_url: Url::parse("http://127.0.0.1:1").unwrap(),
        };
        let extractor = Extractor::InProcess { client };

        let err = download_artifact(&no_redirect_client, &request, &extractor)
            .await
            .unwrap_err();
        assert_matches!(err, DownloadArtifactError::MissingPath);
    }

    #[tokio::test]
    async fn test_empty_path_is_a_missing_path() {
        let (client, no_redirect_client) = crate::reqwest::build_reqwest_clients();
        let request = ArtifactRequest {
            artifact_id: 42,
            repository_owner: "acme".to_string(),
            repository_name: "widgets".to_string(),
            token: "token".to_string(),
            path: Some(PathBuf::new()),
            api_url: Url::parse("http://127.0.0.1:1").unwrap(),
        };
        let extractor = Extractor::InProcess { client };

        let err = download_artifact(&no_redirect_client, &request, &extractor)
            .await
            .unwrap_err();
        assert_matches!(err, DownloadArtifactError::MissingPath);
    }

    #[test]
    fn test_artifact_endpoint_handles_trailing_slash() {
        let mut request = ArtifactRequest {
            artifact_id: 42,
            repository_owner: "acme".to_string(),
            repository_name: "widgets".to_string(),
            token: "token".to_string(),
            path: None,
            api_url: Url::parse("https://api.github.com").unwrap(),
        };
        assert_eq!(
            artifact_endpoint(&request).unwrap().as_str(),
            "https://api.github.com/repos/acme/widgets/actions/artifacts/42/zip"
        );

        request.api_url = Url::parse("https://github.example.com/api/v3/").unwrap();
        assert_eq!(
            artifact_endpoint(&request).unwrap().as_str(),
            "https://github.example.com/api/v3/repos/acme/widgets/actions/artifacts/42/zip"
        );
    }
}
