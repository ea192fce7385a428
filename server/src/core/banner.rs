//! Startup banner

use super::config::is_all_interfaces;
use super::constants::APP_NAME;

/// Print the startup banner with the realtime endpoint URL
pub fn print_banner(host: &str, port: u16, broker_backend: &str, data_dir: &str) {
    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    const W: usize = 21;

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m ws://{}:{}/ws?token=<jwt>",
        "Realtime endpoint:", display_host, port
    );
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/healthz",
        "Health:", display_host, port
    );
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Broker:", broker_backend);

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir);

    println!();
}
