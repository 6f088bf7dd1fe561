//! Oxide Guard - command-line front end for the browser security layer.

use std::path::PathBuf;
use anyhow::Result;
use browser_security::PopupRequest;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use guard::{GuardConfig, GuardEngine};

/// Oxide Guard - connection trust and content gating checks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable popup blocking
    #[arg(long)]
    no_popup_blocking: bool,

    /// Allow popups from a domain (repeatable)
    #[arg(long)]
    whitelist: Vec<String>,

    /// Block popups from a domain (repeatable)
    #[arg(long)]
    blacklist: Vec<String>,

    /// TLS connection timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide whether a page may open a popup
    Popup {
        /// URL of the page opening the popup
        source: String,
        /// URL the popup would load
        #[arg(long)]
        target: Option<String>,
    },
    /// Check whether page content may navigate to a URL
    Navigate { url: String },
    /// Show the security level of a URL
    Security { url: String },
    /// Show certificate details of an HTTPS URL
    Certificate {
        url: String,
        /// Print the certificate as JSON
        #[arg(long)]
        json: bool,
    },
    /// List HTTP resources referenced by an HTTPS page
    Mixed {
        /// Page URL
        page: String,
        /// Resource URLs
        resources: Vec<String>,
    },
}

fn build_config(args: &Args) -> Result<GuardConfig> {
    let mut config = match &args.config {
        Some(path) => GuardConfig::from_json_file(path)?,
        None => GuardConfig::default(),
    };

    if args.no_popup_blocking {
        config.popup_blocking_enabled = false;
    }
    config.popup_whitelist.extend(args.whitelist.iter().cloned());
    config.popup_blacklist.extend(args.blacklist.iter().cloned());
    if let Some(timeout) = args.timeout {
        config.connection_timeout = timeout;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Oxide Guard v{}", guard::VERSION);

    let engine = GuardEngine::new(build_config(&args)?)?;

    match args.command {
        Command::Popup { source, target } => {
            let mut request = PopupRequest::new(source);
            request.popup_url = target;
            let verdict = engine.check_popup(&request);
            let action = if verdict.blocked { "blocked" } else { "allowed" };
            match verdict.detail {
                Some(detail) => println!("{}: {} ({})", action, verdict.reason, detail),
                None => println!("{}: {}", action, verdict.reason),
            }
        }
        Command::Navigate { url } => {
            let allowed = engine.on_navigation_requested(&url);
            println!("{}", if allowed { "allowed" } else { "blocked" });
        }
        Command::Security { url } => {
            let level = engine.security_level(&url).await;
            println!("{} {} ({})", level.indicator(), level, level.tooltip());
        }
        Command::Certificate { url, json } => {
            let certificate = engine.certificate_details(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&certificate)?);
            } else {
                for line in certificate.summary() {
                    println!("{}", line);
                }
            }
        }
        Command::Mixed { page, resources } => {
            for resource in engine.scan_mixed_content(&page, &resources) {
                println!("{}", resource);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_popup() {
        let args = Args::parse_from(["oxide-guard", "popup", "https://example.com"]);
        assert!(!args.verbose);
        assert!(matches!(
            args.command,
            Command::Popup { ref source, target: None } if source == "https://example.com"
        ));
    }

    #[test]
    fn test_args_mixed() {
        let args = Args::parse_from([
            "oxide-guard",
            "mixed",
            "https://a.com",
            "http://b.com/x.js",
            "https://c.com/y.css",
        ]);
        match args.command {
            Command::Mixed { page, resources } => {
                assert_eq!(page, "https://a.com");
                assert_eq!(resources.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "oxide-guard",
            "--no-popup-blocking",
            "--whitelist",
            "a.com",
            "--whitelist",
            "b.com",
            "--timeout",
            "3",
            "security",
            "https://a.com",
        ]);
        let config = build_config(&args).unwrap();
        assert!(!config.popup_blocking_enabled);
        assert_eq!(config.popup_whitelist, vec!["a.com", "b.com"]);
        assert_eq!(config.connection_timeout, 3);
    }
}
