use crate::demo::{run_demo, run_requirements, DemoArgs, RequirementsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use workorder_forms::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Work Order Forms",
    about = "Serve and exercise the LKS/LKH work-order submission forms",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the supporting documents a set of job scopes requires
    Requirements(RequirementsArgs),
    /// Walk an LKS submission from project info to hand-off
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Requirements(args) => run_requirements(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve_without_subcommand() {
        let cli = Cli::try_parse_from(["workorder-forms-api"]).expect("cli parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn requirements_accepts_repeated_scopes() {
        let cli = Cli::try_parse_from([
            "workorder-forms-api",
            "requirements",
            "--scope",
            "Civil",
            "--scope",
            "HDD",
        ])
        .expect("cli parses");

        match cli.command {
            Some(Command::Requirements(args)) => {
                assert_eq!(args.scopes, vec!["Civil".to_string(), "HDD".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
