use crate::demo::{run_chat, run_demo, ChatArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fin_advisor::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Financial Decision Advisor",
    about = "Serve, demo, or chat with the small-business financial decision engine",
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
    /// Replay a scripted hiring conversation against an in-memory store
    Demo(DemoArgs),
    /// Hold an interactive decision dialogue on stdin/stdout
    Chat(ChatArgs),
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
        Command::Demo(args) => run_demo(args),
        Command::Chat(args) => run_chat(args),
    }
}
