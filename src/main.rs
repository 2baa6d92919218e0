//! cellterm Server Binary
//!
//! Run with: cargo run -- [command_port] [viewer_port] [options]
//!
//! Options:
//!   --bind <addr>       Bind command port to address (default: 127.0.0.1)
//!   --options <string>  Option string applied after the session opens
//!
//! The environment variable CELLTERM_OPTIONS is applied the same way
//! when --options is not given.
//!
//! Default ports:
//! - Command port: 6140 (applications connect here to send commands)
//! - Viewer port: 6141 (viewers connect here via telnet)

use std::env;
use log::info;

use cellterm::server::{DEFAULT_COMMAND_PORT, DEFAULT_VIEWER_PORT};
use cellterm::Server;

fn print_help() {
    println!("cellterm - tile-based pseudo-terminal engine v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: cellterm-server [command_port] [viewer_port] [options]");
    println!();
    println!("Options:");
    println!("  --bind <addr>       Bind command port to address (default: 127.0.0.1)");
    println!("                      Use 0.0.0.0 for network access");
    println!("  --options <string>  Option string applied at startup");
    println!("                      (default: $CELLTERM_OPTIONS)");
    println!("  --help, -h          Show this help");
    println!();
    println!("Examples:");
    println!("  cellterm-server 6140 6141");
    println!("  cellterm-server --options 'window.size=100x40; font: tiles.png, size=12x12'");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line args
    let args: Vec<String> = env::args().collect();

    let mut command_port = DEFAULT_COMMAND_PORT;
    let mut viewer_port = DEFAULT_VIEWER_PORT;
    let mut bind = "127.0.0.1".to_string();
    let mut options: Option<String> = None;
    let mut positional = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "--options" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a value", args[i]);
                    std::process::exit(1);
                };
                if args[i] == "--bind" {
                    bind = value.clone();
                } else {
                    options = Some(value.clone());
                }
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg => {
                // Positional arguments: command_port, viewer_port
                match arg.parse::<u16>() {
                    Ok(port) if positional == 0 => command_port = port,
                    Ok(port) if positional == 1 => viewer_port = port,
                    _ => {
                        eprintln!("Error: unexpected argument '{}'", arg);
                        std::process::exit(1);
                    }
                }
                positional += 1;
                i += 1;
            }
        }
    }

    let options = options.or_else(|| env::var("CELLTERM_OPTIONS").ok().filter(|s| !s.trim().is_empty()));

    info!("cellterm v{}", env!("CARGO_PKG_VERSION"));
    info!("Command port: {} (bind: {})", command_port, bind);
    info!("Viewer port:  {} (bind: 0.0.0.0)", viewer_port);
    if bind == "0.0.0.0" {
        info!("WARNING: command port open to network");
    }
    if let Some(options) = &options {
        info!("Startup options: {}", options);
    }

    let server = Server::new(command_port, viewer_port, bind).with_options(options);
    server.run().await?;

    Ok(())
}
