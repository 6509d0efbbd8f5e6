//! Extraction of a zip archive from its blob URL into a directory.
//!
//! Two strategies exist and are selected once at startup from configuration:
//! handing the URL to the external extraction utility (which fetches and
//! inflates in parallel), or downloading the blob to a temporary file and
//! unpacking it in-process. They are never mixed within a run.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use fad_config::{Config, ExtractionStrategy};
use fad_consts::consts;
use reqwest::Client;
use url::Url;

use crate::tool::{self, ToolError};

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("failed to launch extraction utility '{}'", tool.display())]
    ToolLaunch {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction utility exited with {status}")]
    ToolFailed { status: ExitStatus },

    #[error("blob download failed: unexpected status {0}")]
    BlobStatus(reqwest::StatusCode),

    #[error("failed to download artifact blob")]
    BlobDownload(#[source] reqwest::Error),

    #[error("malformed zip archive")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The extraction strategy resolved for this process.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Invoke the external extraction utility, pointing it directly at the
    /// blob URL.
    Subprocess { tool: PathBuf },
    /// Download the blob ourselves and unpack it with the in-process unzip
    /// implementation.
    InProcess { client: Client },
}

impl Extractor {
    /// Resolve the configured strategy. The subprocess strategy provisions
    /// the extraction utility eagerly, so an unavailable tool surfaces here
    /// as an error instead of an unusable extractor.
    pub async fn from_config(config: &Config, client: &Client) -> Result<Extractor, ToolError> {
        match config.extraction_strategy {
            ExtractionStrategy::Subprocess => {
                let tool = tool::acquire(client, config).await?;
                Ok(Extractor::Subprocess { tool })
            }
            ExtractionStrategy::InProcess => Ok(Extractor::InProcess {
                client: client.clone(),
            }),
        }
    }

    /// Fetch the archive behind `url` and unpack it into `directory`.
    pub async fn stream_extract(&self, url: &Url, directory: &Path) -> Result<(), ExtractError> {
        match self {
            Extractor::Subprocess { tool } => {
                let status = tokio::process::Command::new(tool)
                    .arg("unzip-uri")
                    .arg("-d")
                    .arg(directory)
                    .arg(url.as_str())
                    .status()
                    .await
                    .map_err(|source| ExtractError::ToolLaunch {
                        tool: tool.clone(),
                        source,
                    })?;

                if status.success() {
                    Ok(())
                } else {
                    Err(ExtractError::ToolFailed { status })
                }
            }
            Extractor::InProcess { client } => {
                in_process_extract(client, url, directory).await
            }
        }
    }
}

/// Download the blob to `<fresh tempdir>/artifact.zip`, then stream it
/// through the zip decoder into the destination.
async fn in_process_extract(
    client: &Client,
    url: &Url,
    directory: &Path,
) -> Result<(), ExtractError> {
    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(ExtractError::BlobDownload)?;

    if !response.status().is_success() {
        return Err(ExtractError::BlobStatus(response.status()));
    }

    let tempdir = tempfile::tempdir()?;
    let archive_path = tempdir.path().join(consts::ARTIFACT_FILE_NAME);

    let mut archive_file = fs_err::File::create(&archive_path)?;
    while let Some(chunk) = response.chunk().await.map_err(ExtractError::BlobDownload)? {
        archive_file.write_all(&chunk)?;
    }
    archive_file.flush()?;
    drop(archive_file);

    let mut archive = zip::ZipArchive::new(fs_err::File::open(&archive_path)?)?;
    archive.extract(directory)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn blob_url() -> Url {
        Url::parse("https://blob.example/a.zip").unwrap()
    }

    #[tokio::test]
    async fn test_subprocess_missing_tool_fails_to_launch() {
        let extractor = Extractor::Subprocess {
            tool: PathBuf::from("/nonexistent/ripunzip"),
        };
        let dir = tempfile::tempdir().unwrap();

        let err = extractor
            .stream_extract(&blob_url(), dir.path())
            .await
            .unwrap_err();
        assert_matches!(err, ExtractError::ToolLaunch { .. });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_nonzero_exit_is_reported() {
        let extractor = Extractor::Subprocess {
            tool: PathBuf::from("/bin/false"),
        };
        let dir = tempfile::tempdir().unwrap();

        let err = extractor
            .stream_extract(&blob_url(), dir.path())
            .await
            .unwrap_err();
        assert_matches!(err, ExtractError::ToolFailed { status } if !status.success());
    }

    #[tokio::test]
    async fn test_from_config_in_process_needs_no_tool() {
        let mut config = Config::default();
        config.extraction_strategy = ExtractionStrategy::InProcess;
        // No URL table and no cache: the subprocess strategy could not be
        // provisioned from this config.
        config.tool.urls.clear();

        let (client, _) = crate::reqwest::build_reqwest_clients();
        let extractor = Extractor::from_config(&config, &client).await.unwrap();
        assert_matches!(extractor, Extractor::InProcess { .. });
    }
}
