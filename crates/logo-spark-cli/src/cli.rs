use clap::{Parser, Subcommand};

/// Command-line client for the Logo Spark generation service.
///
/// Endpoints and credentials come from the environment (or a `.env` file):
/// `LOGO_SPARK_BASE_URL`, `LOGO_SPARK_TIMEOUT_SECS`, `LOGO_SPARK_SAVING_URL`
/// and `LOGO_SPARK_TOKEN`.
#[derive(Parser, Debug)]
#[command(name = "logo-spark", version, about = "Generate and manage logos")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a generation task and stream its logos.
    Generate(GenerateArgs),
    /// Manage saved logos.
    #[command(subcommand)]
    Saved(SavedCommand),
    /// Log in and print a token for `LOGO_SPARK_TOKEN`.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and print its token.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Display name.
        #[arg(long)]
        name: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Company name the logos are generated for.
    pub company: String,

    /// Number of logos expected in total, including the first one.
    #[arg(long)]
    pub total: Option<u32>,

    /// Cancel the task once this many streamed logos have arrived.
    #[arg(long)]
    pub cancel_after: Option<usize>,

    /// Seconds without any stream activity before giving up. `0` disables it.
    #[arg(long, default_value_t = 180)]
    pub idle_timeout: u64,

    /// Treat the `is_last` flag on a logo as the end of the stream instead of
    /// waiting for a `done` event.
    #[arg(long)]
    pub last_flag: bool,
}

#[derive(Subcommand, Debug)]
pub enum SavedCommand {
    /// List saved logos.
    List,
    /// Save a generated logo under a name.
    Save {
        #[arg(long)]
        name: String,
        /// Image path as returned by the generator, e.g. `/images/acme_1.png`.
        #[arg(long)]
        path: String,
    },
    /// Remove a saved logo.
    Remove { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "logo-spark",
            "generate",
            "Acme",
            "--total",
            "4",
            "--cancel-after",
            "2",
            "--last-flag",
        ])
        .expect("parse");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.company, "Acme");
        assert_eq!(args.total, Some(4));
        assert_eq!(args.cancel_after, Some(2));
        assert_eq!(args.idle_timeout, 180);
        assert!(args.last_flag);
    }

    #[test]
    fn parses_login() {
        let cli = Cli::try_parse_from([
            "logo-spark",
            "login",
            "--username",
            "ada",
            "--password",
            "hunter2",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Login { ref username, .. } if username == "ada"
        ));
    }

    #[test]
    fn parses_saved_save() {
        let cli = Cli::try_parse_from([
            "logo-spark",
            "saved",
            "save",
            "--name",
            "Acme",
            "--path",
            "/images/acme_1.png",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Saved(SavedCommand::Save { ref name, .. }) if name == "Acme"
        ));
    }
}
