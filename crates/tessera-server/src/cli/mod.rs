use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tessera-server")]
#[command(about = "Tessera user service")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Connect to MongoDB, ping it, and exit
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Server,
    Check,
}

impl From<Cli> for RunMode {
    fn from(cli: Cli) -> Self {
        match cli.command {
            None | Some(Command::Serve) => Self::Server,
            Some(Command::Check) => Self::Check,
        }
    }
}

pub fn parse_args() -> RunMode {
    Cli::parse().into()
}
