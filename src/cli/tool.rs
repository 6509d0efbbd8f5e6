use clap::Parser;
use fad_config::Config;
use fad_consts::consts;
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
pub enum Command {
    /// Download the extraction utility and register it in the tool cache
    Install,
}

/// Manage the cached extraction utility.
#[derive(Parser, Debug)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

pub async fn execute(args: Args) -> miette::Result<()> {
    match args.command {
        Command::Install => {
            let config = Config::load_global();
            let (client, _) = crate::reqwest::build_reqwest_clients();

            let tool_path = crate::tool::acquire(&client, &config)
                .await
                .into_diagnostic()?;

            eprintln!(
                "{} {} {} available at {}",
                consts::SUCCESS_STYLE.apply_to("✔"),
                consts::TOOL_NAME,
                config.tool.version,
                consts::PATH_STYLE.apply_to(tool_path.display())
            );

            Ok(())
        }
    }
}
