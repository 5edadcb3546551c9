//! NLWeb CLI Entry Point
//!
//! This binary provides the command-line chat client for an NLWeb answer
//! service.

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = nlweb_interface::run_cli().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
