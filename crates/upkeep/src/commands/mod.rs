//! Command dispatch.

pub mod alerts;
pub mod config_cmd;
pub mod devices;
pub mod settings;
pub mod status;
pub mod watch;

use clap::CommandFactory;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Local commands first: these never touch the backend.
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "upkeep", &mut std::io::stdout());
            Ok(())
        }
        Command::Config(args) => config_cmd::handle(&args.command, &cli.global),

        Command::Status => status::handle(&cli.global).await,
        Command::Devices(args) => devices::handle(&args.command, &cli.global).await,
        Command::Alerts(args) => alerts::handle(args.command, &cli.global).await,
        Command::Watch(args) => watch::handle(&args, &cli.global).await,
        Command::Settings(args) => settings::handle(&args.command, &cli.global).await,
    }
}
