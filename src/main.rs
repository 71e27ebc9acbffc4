use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use math_game::protocol::{DEFAULT_HUB_URL, DEFAULT_PLAYER};
use math_game::{ClientConfig, PendingQuestionPolicy};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal client for the real-time math quiz", long_about = None)]
struct Args {
    /// Hub endpoint to connect to
    #[arg(short, long, env = "MATH_GAME_HUB_URL", default_value = DEFAULT_HUB_URL)]
    url: String,

    /// Player name sent with every answer
    #[arg(short, long, env = "MATH_GAME_PLAYER", default_value = DEFAULT_PLAYER)]
    player: String,

    /// Reconnect delays in milliseconds, e.g. 0,2000,10000,30000
    #[arg(long, value_delimiter = ',')]
    reconnect_delays: Option<Vec<u64>>,

    /// Hold new questions until the current one is answered
    #[arg(long)]
    queue_unanswered: bool,

    /// Write logs to this file (the terminal is busy with the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.url).with_player(&self.player);
        if let Some(delays) = &self.reconnect_delays {
            let delays = delays.iter().copied().map(Duration::from_millis).collect();
            config = config.with_reconnect_delays(delays);
        }
        if self.queue_unanswered {
            config = config.with_pending_policy(PendingQuestionPolicy::Queue);
        }
        config
    }
}

fn init_logging(args: &Args) -> io::Result<()> {
    let writer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(io::sink),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("Error opening log file: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = math_game::run(args.client_config()).await {
        eprintln!("Error running quiz client: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library() {
        let args = Args::parse_from(["math-game"]);
        let config = args.client_config();
        assert_eq!(config.player, DEFAULT_PLAYER);
        assert_eq!(config.pending_policy, PendingQuestionPolicy::Append);
        assert_eq!(config.reconnect_delays, math_game::config::DEFAULT_RECONNECT_DELAYS.to_vec());
    }

    #[test]
    fn parses_overrides() {
        let args = Args::parse_from([
            "math-game",
            "--url",
            "http://quiz.example:8080/gamehub",
            "--player",
            "Ada",
            "--reconnect-delays",
            "0,500",
            "--queue-unanswered",
        ]);
        let config = args.client_config();
        assert_eq!(config.hub_url, "http://quiz.example:8080/gamehub");
        assert_eq!(config.player, "Ada");
        assert_eq!(config.reconnect_delays, vec![Duration::ZERO, Duration::from_millis(500)]);
        assert_eq!(config.pending_policy, PendingQuestionPolicy::Queue);
    }
}
