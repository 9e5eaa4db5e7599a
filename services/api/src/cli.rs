use crate::rules::{run_strategy, run_viability, StrategyArgs, ViabilityArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use claim_resolution::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Claim Resolution Engine",
    about = "Serve the claim resolution API or evaluate its decision rules offline",
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
    /// Evaluate the deterministic decision rules without a model or database
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Score whether a claim is worth pursuing
    Viability(ViabilityArgs),
    /// Classify a carrier offer against a contractor estimate
    Strategy(StrategyArgs),
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
        Command::Rules {
            command: RulesCommand::Viability(args),
        } => run_viability(args),
        Command::Rules {
            command: RulesCommand::Strategy(args),
        } => run_strategy(args),
    }
}
