//! Line-oriented terminal front-end for the session core.
//!
//! Demonstrates:
//! - Driving a session only through the controller's three intents
//! - Rendering connection state and the message log from observables
//! - Surfacing transport failures from the last-error observable
//!
//! Commands:
//!   /connect      open the connection
//!   /disconnect   close it with a normal closure
//!   /quit         dispose the controller and exit
//!   anything else is sent as a text frame
//!
//! Usage:
//!   cargo run --example terminal_chat
//!   cargo run --example terminal_chat -- ws://127.0.0.1:9001
//!   cargo run --example terminal_chat -- --debug

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use ws_session::{Result, SessionConfig, SessionController};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let endpoint = args.iter().find(|a| !a.starts_with("--")).cloned();

    init_logging(debug);

    if let Err(e) = run(endpoint).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(endpoint: Option<String>) -> Result<()> {
    let mut config = SessionConfig::new();
    if let Some(endpoint) = endpoint {
        config = config.with_endpoint(endpoint);
    }
    config.validate()?;

    println!("=== Terminal Chat: {} ===", config.endpoint);
    println!("/connect, /disconnect, /quit; other lines are sent\n");

    let controller = SessionController::from_config(config)?;
    spawn_renderers(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "/connect" => controller.connect(),
            "/disconnect" => controller.disconnect(),
            "/quit" => break,
            "" => {}
            text => controller.send(text),
        }
    }

    controller.dispose();
    println!("Bye.");
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

/// Prints state changes, new log entries and failures as they happen.
fn spawn_renderers(controller: &SessionController) {
    let mut state = controller.connection_state();
    tokio::spawn(async move {
        println!("[state] {}", *state.borrow_and_update());
        while state.changed().await.is_ok() {
            println!("[state] {}", *state.borrow_and_update());
        }
    });

    let mut messages = controller.messages();
    tokio::spawn(async move {
        let mut printed = 0;
        while messages.changed().await.is_ok() {
            let log = messages.borrow_and_update();
            for message in log.iter().skip(printed) {
                let arrow = if message.is_outbound() { ">>" } else { "<<" };
                println!("{arrow} {}", message.text());
            }
            printed = log.len();
        }
    });

    let mut last_error = controller.last_error();
    tokio::spawn(async move {
        while last_error.changed().await.is_ok() {
            if let Some(failure) = last_error.borrow_and_update().as_ref() {
                println!("[error] {failure}");
            }
        }
    });
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "ws_session=debug"
    } else {
        "ws_session=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
