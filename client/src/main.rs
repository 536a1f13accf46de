use clap::Parser;
use client::connection::Endpoint;
use client::directory::{self, DEFAULT_PROBE_TIMEOUT_MS};
use client::input::{parse_line, Command};
use client::network::{Client, ClientConfig, ClientHandle};
use client::phase::GamePhase;
use log::{info, warn};
use std::io::BufRead;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Game server address
    #[arg(short = 'a', long, default_value = "127.0.0.1")]
    address: String,

    /// Game server port
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Connect with TLS (wss://)
    #[arg(long)]
    tls: bool,

    /// Display name to register with the server
    #[arg(short = 'n', long)]
    name: String,

    /// Only probe the server and print its status
    #[arg(long)]
    probe: bool,

    /// Probe timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
    probe_timeout_ms: u64,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let endpoint = Endpoint::new(args.address, args.port, args.tls);

    if args.probe {
        let status = directory::probe(&endpoint, args.probe_timeout_ms).await?;
        println!("{}", status.title);
        println!("  owner:      {}", status.owner);
        println!("  characters: {}", status.loaded_characters);
        println!("  online:     {}", status.online_players);
        let phase = GamePhase::from_code(status.phase)
            .map(|phase| phase.to_string())
            .unwrap_or_else(|| format!("unknown ({})", status.phase));
        println!("  phase:      {}", phase);
        println!("  password:   {}", status.require_password);
        return Ok(());
    }

    let mut config = ClientConfig::new(endpoint, args.name);
    config.fake_ping_ms = args.fake_ping;
    if config.fake_ping_ms > 0 {
        info!("Simulating {}ms latency", config.fake_ping_ms);
    }

    let (mut client, handle) = Client::connect(&config).await?;
    info!("Commands: /ready /hover <card> /unhover /select <card> /pick <card>");
    info!("          /discard yes|no /initdiscard /swap <a> <b> /characters /quit");
    std::thread::spawn(move || read_console(handle));

    client.run().await?;

    let engine = client.engine();
    if let Some(reason) = &engine.connection_state().last_close {
        println!("Disconnected: {}", reason);
    }
    for fault in engine.faults() {
        warn!("Fault during session: {}", fault);
    }

    Ok(())
}

/// Forwards console commands until stdin closes or `/quit`; dropping the
/// handle closes the session. Runs on a plain thread so a pending read
/// never holds up runtime shutdown.
fn read_console(handle: ClientHandle) {
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Send(action))) => {
                if handle.send(action).is_err() {
                    break;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
}
