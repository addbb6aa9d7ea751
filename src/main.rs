//! drive_pick CLI - choose a file from your drive and save it locally.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use drive_pick::logging::init_logging;
use drive_pick::{Config, DriveError, Outcome, ScriptLoader, Session};

/// Pick a single file from Google Drive and download or export it.
#[derive(Parser)]
#[command(name = "drive_pick")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OAuth client ID.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    client_id: String,

    /// Developer (API) key used by the chooser.
    #[arg(long, env = "GOOGLE_DEVELOPER_KEY")]
    developer_key: String,

    /// OAuth client secret, for desktop clients that require one.
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Download the file right after picking it.
    #[arg(long)]
    download: bool,

    /// Local destination directory.
    #[arg(long, short = 't', default_value = ".")]
    to: PathBuf,

    /// Seconds to wait for the identity client and chooser to load.
    #[arg(long, default_value_t = 10)]
    ready_timeout: u64,

    /// Verbose logging.
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::new(cli.client_id, cli.developer_key)
        .context("Invalid configuration")?
        .with_client_secret(cli.client_secret)
        .with_ready_timeout(Duration::from_secs(cli.ready_timeout));

    let loader = Arc::new(ScriptLoader::google(&config));
    loader.ensure_ready();
    if let Err(e) = loader.wait_ready(config.ready_timeout).await {
        eprintln!("Google Picker not ready yet ({}).", e);
        std::process::exit(1);
    }

    let session = Session::new(&config, loader).context("Failed to start session")?;

    let record = match session.pick().await {
        Ok(Outcome::Completed(record)) => record,
        Ok(Outcome::Aborted) => {
            println!("No file selected.");
            return Ok(());
        }
        Err(e @ DriveError::NotReady(_)) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to pick a file"),
    };

    println!("\n{}", record);

    if !cli.download {
        return Ok(());
    }

    loop {
        print!("Downloading {}... ", record.name);
        io::stdout().flush()?;

        match session.download(&cli.to).await {
            Ok(saved) => {
                println!("OK");
                println!("Saved to: {:?} ({} bytes)", saved.path, saved.bytes);
                return Ok(());
            }
            Err(e) => {
                println!("FAILED");
                eprintln!("{}", e);
                // Token and selection survive a failed download.
                if !confirm("Retry download? [y/N] ").await? {
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n\n"));
        assert!(!is_yes("yep"));
    }
}
