use console::Style;
use lazy_static::lazy_static;
use url::Url;

pub const CONFIG_FILE: &str = "config.toml";
pub const FAD_DIR: &str = "fad";
pub const TOOLS_DIR: &str = "tools";

/// Name and pinned version of the external extraction utility.
pub const TOOL_NAME: &str = "ripunzip";
pub const TOOL_VERSION: &str = "1.1.0";

/// File name the in-process strategy downloads the archive under.
pub const ARTIFACT_FILE_NAME: &str = "artifact.zip";

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const GITHUB_STATUS_URL: &str = "https://www.githubstatus.com";

const TOOL_RELEASE_BASE: &str =
    "https://github.com/criemen/fast-artifact-download/releases/download/ripunzip";

lazy_static! {
    pub static ref DEFAULT_TOOL_URL_LINUX: Url =
        Url::parse(&format!("{TOOL_RELEASE_BASE}/ripunzip-linux-amd64")).unwrap();
    pub static ref DEFAULT_TOOL_URL_MACOS: Url =
        Url::parse(&format!("{TOOL_RELEASE_BASE}/ripunzip-macos")).unwrap();
    pub static ref DEFAULT_TOOL_URL_WINDOWS: Url =
        Url::parse(&format!("{TOOL_RELEASE_BASE}/ripunzip-win-amd64.exe")).unwrap();
    pub static ref SUCCESS_STYLE: Style = Style::new().green().bold();
    pub static ref PATH_STYLE: Style = Style::new().cyan();
}
