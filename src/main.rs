mod backend;
mod cli;
mod config;
mod dashboard;
mod home;
mod logging;
mod policy;
mod produce;
mod resource;
mod router;
mod tui;

use clap::Parser;
use config::Config;
use resource::client::RestClient;
use std::path::PathBuf;
use std::process::Command;

#[derive(Parser, Debug)]
#[command(name = "mailpage")]
#[command(about = "Page through emails held by a REST mail service", long_about = None)]
struct Args {
    /// Use config file at PATH instead of default
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Open this route first (unknown routes fall back to /home)
    #[arg(long, value_name = "PATH")]
    route: Option<String>,

    /// Server base URL; overrides [server] base_url
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Run in JSON-over-stdin/stdout CLI mode
    #[arg(long)]
    cli: bool,

    /// Print CLI mode protocol documentation
    #[arg(long)]
    help_cli: bool,

    /// Print default config path and all options
    #[arg(long)]
    help_config: bool,

    /// View the log file in $PAGER
    #[arg(long)]
    log: bool,

    /// Truncate the log file at startup
    #[arg(long)]
    clear_log: bool,
}

fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("mailpage").join("config.toml")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".config")
            .join("mailpage")
            .join("config.toml")
    } else {
        PathBuf::from("config.toml")
    }
}

fn show_log() {
    let path = logging::log_path();
    if !path.exists() {
        eprintln!("No log file found at {}", path.display());
        std::process::exit(1);
    }
    let pager = std::env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    match Command::new(&pager).arg(&path).status() {
        Ok(s) if s.success() => {}
        Ok(s) => std::process::exit(s.code().unwrap_or(1)),
        Err(e) => {
            eprintln!("Failed to launch pager '{}': {}", pager, e);
            std::process::exit(1);
        }
    }
}

fn print_help_config() {
    let config_path = default_config_path();
    println!("Default config file: {}", config_path.display());
    println!();
    println!("Available options:");
    println!();
    println!("[server]");
    println!("  base_url = \"http://localhost:8080\"  # Mail service root (required unless --base-url)");
    println!("  timeout_secs = 30            # Per-request timeout (default: 30)");
    println!();
    println!("[ui]");
    println!("  page_size = 100              # Emails per page (default: 100)");
    println!("  max_size = 10                # Page links shown at once (default: 10)");
    println!("  start_route = \"/home\"        # First screen: /home, /produce or /dashboard");
    println!();
    println!("[render]");
    println!("  allowed_content_types = [\"text/html\", \"text/plain\"]  # Bodies allowed inline");
    println!("  message_id_regex = \"^[A-Za-z0-9._@+-]+$\"  # Ids allowed in body URLs");
    println!();
    println!("[produce]");
    println!("  topic = \"friends\"            # Topic for the producer screen (default: \"friends\")");
    println!("  client = \"mailpage\"          # Client name stamped on payloads");
}

fn main() {
    let args = Args::parse();

    if args.clear_log {
        if let Err(e) = logging::clear() {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    if args.log {
        show_log();
        std::process::exit(0);
    }

    if args.help_cli {
        cli::print_help_cli();
        std::process::exit(0);
    }

    if args.help_config {
        print_help_config();
        std::process::exit(0);
    }

    logging::init();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = match Config::load(&config_path, args.base_url.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config from {}: {}", config_path.display(), e);
            eprintln!("Create a config file with:");
            eprintln!();
            eprintln!("  [server]");
            eprintln!("  base_url = \"http://localhost:8080\"");
            std::process::exit(1);
        }
    };
    log::info!(
        "Starting against {} (page size {})",
        config.server.base_url,
        config.ui.page_size
    );

    let resource = Box::new(RestClient::new(
        config.server.base_url.clone(),
        config.server.timeout,
    ));
    let start_path = args
        .route
        .clone()
        .unwrap_or_else(|| config.ui.start_route.clone());

    if args.cli {
        cli::run_cli(config, resource, &start_path);
        std::process::exit(0);
    }

    if let Err(e) = tui::run(config, resource, &start_path) {
        log::error!("TUI error: {}", e);
        eprintln!("TUI error: {}", e);
        std::process::exit(1);
    }
}
