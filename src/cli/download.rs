use std::path::PathBuf;

use clap::Parser;
use fad_config::{Config, ExtractionStrategy};
use fad_consts::consts;
use miette::IntoDiagnostic;

use crate::download::{fast_download_artifact, DownloadArtifactOptions, FindBy};
use crate::extract::Extractor;

/// Download and extract a workflow artifact.
#[derive(Parser, Debug)]
pub struct Args {
    /// Numeric id of the artifact to download
    #[clap(long)]
    pub artifact_id: u64,

    /// Owner of the repository the artifact belongs to
    #[clap(long)]
    pub owner: String,

    /// Name of the repository the artifact belongs to
    #[clap(long)]
    pub repo: String,

    /// Access token used to authenticate against the API
    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Directory to extract the artifact into
    #[clap(long)]
    pub path: PathBuf,

    /// Override the configured extraction strategy
    #[clap(long)]
    pub strategy: Option<ExtractionStrategy>,
}

pub async fn execute(args: Args) -> miette::Result<()> {
    let mut config = Config::load_global();
    if let Some(strategy) = args.strategy {
        config.extraction_strategy = strategy;
    }

    let (client, no_redirect_client) = crate::reqwest::build_reqwest_clients();
    let extractor = Extractor::from_config(&config, &client)
        .await
        .into_diagnostic()?;

    let options = DownloadArtifactOptions {
        path: Some(args.path.clone()),
        find_by: FindBy {
            repository_owner: args.owner,
            repository_name: args.repo,
            token: args.token,
        },
        api_url: config.api_url.clone(),
    };

    fast_download_artifact(&no_redirect_client, &extractor, args.artifact_id, options)
        .await
        .into_diagnostic()?;

    eprintln!(
        "{} Artifact extracted to {}",
        consts::SUCCESS_STYLE.apply_to("✔"),
        consts::PATH_STYLE.apply_to(args.path.display())
    );

    Ok(())
}
