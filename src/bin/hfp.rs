//! HFP CLI binary.
//!
//! Developer tooling for the Hands-Free engine.
//!
//! # Commands
//!
//! - `replay` - Run an AG transcript through a session
//! - `profile` - Print the profile registration record
//!
//! # Transcript format
//!
//! One AG line per input line. Blank lines and lines starting with `#`
//! are skipped. Lines starting with `@` are directives:
//!
//! | Directive      | Effect                        |
//! |----------------|-------------------------------|
//! | `@audio-up`    | SCO link reported up          |
//! | `@audio-down`  | SCO link reported down        |
//! | `@disconnect`  | Control channel lost          |

use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hfp::{BdAddr, ChannelHandle, Config, ProfileRecord, Session, VERSION};

/// Control channel handle used for replays
const REPLAY_CONTROL: ChannelHandle = ChannelHandle(1);

/// Audio channel handle used for replays
const REPLAY_AUDIO: ChannelHandle = ChannelHandle(2);

#[derive(Parser)]
#[command(name = "hfp")]
#[command(version = VERSION)]
#[command(about = "Bluetooth Hands-Free Profile engine (HF role)", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Config file (default: platform config dir, then environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an AG transcript through a session
    Replay {
        /// Transcript file (or - for stdin)
        input: Option<String>,

        /// Peer address reported for the replay
        #[arg(short, long, default_value = "00:00:00:00:00:01")]
        address: String,

        /// Enable codec negotiation
        #[arg(long)]
        codec_negotiation: bool,

        /// Treat +CIEV indices as 1-based
        #[arg(long)]
        ciev_one_based: bool,

        /// Pretty-print the final snapshot
        #[arg(long)]
        pretty: bool,
    },

    /// Print the profile registration record as JSON
    Profile,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Replay {
            input,
            address,
            codec_negotiation,
            ciev_one_based,
            pretty,
        } => {
            let mut config = config;
            config.hands_free.codec_negotiation |= codec_negotiation;
            config.hands_free.ciev_one_based |= ciev_one_based;
            cmd_replay(&config, input, &address, pretty)
        },
        Commands::Profile => cmd_profile(&config),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Ok(Config::from_file(path)?);
    }
    match Config::default_path() {
        Some(path) if path.exists() => Ok(Config::from_file(path)?),
        _ => Ok(Config::from_env()),
    }
}

fn cmd_replay(
    config: &Config,
    input: Option<String>,
    address: &str,
    pretty: bool,
) -> anyhow::Result<()> {
    let transcript = read_input(input)?;
    let address: BdAddr = address.parse()?;
    let mut session = Session::new(config);

    session.start(address, REPLAY_CONTROL)?;
    print_exchange(&mut session);

    for line in transcript.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        println!("AG: {line}");
        let result = match line {
            "@audio-up" => session.audio_connected(REPLAY_AUDIO).map(|_| ()),
            "@audio-down" => session.audio_disconnected().map(|_| ()),
            "@disconnect" => {
                let released = session.disconnect();
                println!("   released {released:?}");
                Ok(())
            },
            directive if directive.starts_with('@') => {
                eprintln!("Unknown directive: {directive}");
                Ok(())
            },
            line => session.process_line(line).map(|_| ()),
        };

        if let Err(e) = result {
            println!("   error: {e}");
        }
        print_exchange(&mut session);
    }

    let snapshot = session.snapshot();
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");

    let stats = session.stats();
    eprintln!();
    eprintln!("Replay Statistics:");
    eprintln!("  Lines:        {}", stats.lines_received);
    eprintln!("  Commands:     {}", stats.commands_sent);
    eprintln!("  Discarded:    {}", stats.events_discarded);
    eprintln!("  Handlers:     {}", stats.handlers_invoked);

    Ok(())
}

fn cmd_profile(config: &Config) -> anyhow::Result<()> {
    let record = ProfileRecord::from_config(config)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn print_exchange(session: &mut Session) {
    for command in session.take_outbound() {
        println!("HF: {command}");
    }
    for notification in session.take_notifications() {
        println!("   -> {notification:?}");
    }
}

fn read_input(input: Option<String>) -> anyhow::Result<String> {
    match input.as_deref() {
        Some("-") | None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        },
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}
