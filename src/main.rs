use anyhow::Result;
use clap::{Parser, Subcommand};

use cryptsync::cli::{
    handle_backup_command, handle_config_command, handle_restore_command, handle_status_command,
    RestoreArgs,
};
use cryptsync::config::{paths::SyncPaths, settings::Settings};
use cryptsync::logging::{init_logging, LogFormat};
use cryptsync::SyncError;

#[derive(Parser)]
#[command(
    name = "cryptsync",
    version,
    about = "Encrypted git backups for a local note graph",
    long_about = "cryptsync commits a local note graph to git and pushes it through \
                  git-remote-gcrypt, so the remote only ever holds content encrypted \
                  to the configured GnuPG recipients."
)]
struct Cli {
    /// Console log format
    #[arg(
        long,
        global = true,
        value_enum,
        env = "CRYPTSYNC_LOG_FORMAT",
        default_value_t = LogFormat::Human
    )]
    log_format: LogFormat,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit local changes and push them to the encrypted remote
    Backup,

    /// Clone the graph from the encrypted remote, or pull into it
    Restore(RestoreArgs),

    /// Show repository state and the outcome of recent runs
    Status,

    /// Show current configuration and paths
    Config {
        /// Write a default settings file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<SyncError>()
            .map_or(1, SyncError::exit_code);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = SyncPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Commands::Backup => handle_backup_command(&paths, &settings)?,
        Commands::Restore(args) => handle_restore_command(&paths, &settings, args)?,
        Commands::Status => handle_status_command(&paths, &settings)?,
        Commands::Config { init } => handle_config_command(&paths, &settings, init)?,
    }

    Ok(())
}
