//! `logo-spark`: generate logos from the terminal and manage saved ones.

mod cli;
mod config;
mod generate;
mod saved;

use clap::Parser;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    logo_stream::init_observability();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => generate::run(args).await,
        Command::Saved(command) => saved::run(command).await,
        Command::Login { username, password } => saved::login(&username, &password).await,
        Command::Register {
            username,
            password,
            name,
        } => saved::register(&username, &password, &name).await,
    }
}
