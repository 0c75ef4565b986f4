use std::io::{self, Write};
use std::process;

use bilimanga_downloader::configuration::Settings;
use bilimanga_downloader::models::Cli;
use bilimanga_downloader::run::run;
use clap::Parser;
use env_logger::{Builder, Env, Target};
use log::{error, info};

#[tokio::main]
async fn main() {
    // Init logging
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.target(Target::Stdout);
    builder.init();

    // Parse Args
    let cli = Cli::parse();

    // Parse Settings
    let settings = match Settings::new(&cli.config_file) {
        Ok(s) => s,
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    // Resolve ids before any network activity
    let comic_id = match resolve_comic_id(cli.comic_id) {
        Ok(id) => id,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let ep_id = match cli.ep_id {
        None => {
            info!("no episode id given, downloading every episode of comic {comic_id}");
            None
        }
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                error!("{raw} is not a usable episode id, it must be digits only");
                process::exit(1);
            }
        },
    };

    // Run
    if let Err(e) = run(settings, comic_id, ep_id).await {
        error!("Download error: {}", e);
        process::exit(1);
    }
}

/// Take the comic id from the CLI or prompt for it, then require digits.
fn resolve_comic_id(arg: Option<String>) -> Result<i64, String> {
    let raw = match arg {
        Some(raw) => raw,
        None => {
            info!(
                "no comic id given; the id is the number in the comic page url, \
                 e.g. https://manga.bilibili.com/detail/mc31031 -> 31031"
            );
            prompt("comic id: ").map_err(|e| format!("failed to read comic id: {e}"))?
        }
    };
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("{raw} is not a usable comic id, it must be digits only"))
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
