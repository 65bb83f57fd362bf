use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "memobot")]
#[command(version, about = "Memobot - WhatsApp assistant with conversation memory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server (default)
    Serve,

    /// Resolve configuration and print the non-secret settings
    CheckConfig,
}
