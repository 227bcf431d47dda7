//! Binary entrypoint for the axbridge CLI.
//!
//! Commands:
//! - `start [--listen <addr>]` - run the bridge
//! - `init` - create a starter `config.toml`
//! - `status` - print the configured identity, upstream target and limits
//!
//! See the library crate docs for module-level details: `axbridge::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use axbridge::bridge::BridgeServer;
use axbridge::config::Config;
use axbridge::transport::TcpPacketListener;

#[derive(Parser)]
#[command(name = "axbridge")]
#[command(about = "A packet-radio to TCP bridge with an interactive connection menu")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge
    Start {
        /// Listen endpoint for the transport binding (overrides config)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Initialize a new bridge configuration
    Init,
    /// Show the configured identity, upstream target and limits
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { listen } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting axbridge v{}", env!("CARGO_PKG_VERSION"));

            // CLI overrides config; fallback to config when CLI absent
            let listen_addr = listen.unwrap_or_else(|| config.bridge.listen.clone());
            let listener = TcpPacketListener::bind(&listen_addr).await?;
            info!(
                "Listening for packet connections on {} as {}",
                listen_addr, config.bridge.callsign
            );

            let mut server = BridgeServer::new(config, listener);
            server.run().await?;
        }
        Commands::Init => {
            info!("Initializing new bridge configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            println!("Callsign:        {}", config.bridge.callsign);
            println!("Listen endpoint: {}", config.bridge.listen);
            println!(
                "Upstream BBS:    {}:{}",
                config.upstream.host, config.upstream.port
            );
            println!("Max sessions:    {}", config.limits.max_sessions);
            println!(
                "Connect timeout: {}s",
                config.limits.connect_timeout_secs
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config.as_ref().and_then(|cfg| cfg.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // When stdout is not a TTY (running under a supervisor), skip the
            // console copy to avoid duplicate lines in captured output.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        } else {
            eprintln!("Warning: could not open log file {}, logging to console", file);
            builder.format(default_format);
        }
    } else {
        builder.format(default_format);
    }
    let _ = builder.try_init();
}

fn default_format(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    use std::io::Write;
    writeln!(
        fmt,
        "{} [{}] {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        record.level(),
        record.args()
    )
}
