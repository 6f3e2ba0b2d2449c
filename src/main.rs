//! Network Health Monitor - Main CLI Application
//!
//! Runs the latency monitor and device watchers until interrupted.

use clap::Parser;
use network_health_monitor::{
    app::App,
    cli::Cli,
    config::{display_config_summary, load_config, EnvManager},
    error::{AppError, Result},
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<()> {
    cli.validate().map_err(AppError::validation)?;

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return Ok(());
    }

    let show_config = cli.show_config;
    let config = load_config(cli)?;

    if show_config {
        println!("{}", display_config_summary(&config));
        return Ok(());
    }

    let app = App::new(config);
    app.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for Ctrl+C: {}", e);
            futures::future::pending::<()>().await;
        }
    })
    .await
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (run with --env-help)");
            eprintln!("  - DNS candidates are written as Name=address");
            eprintln!("  - URLs must start with http:// or https://");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("Check that the log directory is writable (--log-dir)");
        }
        _ => {}
    }
}
