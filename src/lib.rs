pub mod cli;
pub mod download;
pub mod extract;
pub mod reqwest;
pub mod tool;

pub use download::{
    download_artifact, fast_download_artifact, ArtifactRequest, DownloadArtifactError,
    DownloadArtifactOptions, FindBy,
};
pub use extract::{ExtractError, Extractor};
pub use tool::{acquire, download_url, ToolError};
