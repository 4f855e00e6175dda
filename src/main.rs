//! Arrangement stub binary.
//!
//! Run with: `arrangement-stub --config config.yaml --request request.xml`
//!
//! Reads one SOAP request (a file, or stdin with `-`) and prints the stub
//! response envelope to stdout.

use anyhow::{Context, Result};
use arrangement_stub::config::StubConfig;
use arrangement_stub::error::{soap_fault_response, StubError};
use arrangement_stub::{
    parse_validate_request, ArrangementResponder, BundledTemplate, FileTemplate, OutboundMessage,
    RandomTransactionIds, TemplateSource,
};
use clap::Parser;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Stub responder for the validate payment arrangement operation.
///
/// Matches the request's account identifier against the built-in test
/// scenarios and returns the canned response with the scenario's status
/// codes and a fresh transaction id.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// SOAP request file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    request: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr, stdout carries the response
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting arrangement stub v{}", env!("CARGO_PKG_VERSION"));

    let config = if args.config.exists() {
        StubConfig::from_file(&args.config).context("Failed to load config file")?
    } else {
        info!("Config file not found, using defaults");
        StubConfig::default()
    };

    info!(
        template = ?config.template.path,
        content_type = %config.settings.content_type,
        "Configuration loaded"
    );

    let body = read_request(&args.request)
        .with_context(|| format!("Failed to read request from {}", args.request))?;

    let result = match &config.template.path {
        Some(path) => respond(FileTemplate::new(path), &config, &body),
        None => respond(BundledTemplate, &config, &body),
    };

    let mut stdout = std::io::stdout().lock();
    match result {
        Ok(outbound) => {
            stdout
                .write_all(&outbound.payload)
                .context("Failed to write response")?;
            Ok(())
        }
        Err(e) => {
            stdout
                .write_all(soap_fault_response(&format!("{:#}", e)).as_bytes())
                .context("Failed to write fault")?;
            Err(e)
        }
    }
}

fn respond<S: TemplateSource>(
    template: S,
    config: &StubConfig,
    body: &[u8],
) -> Result<OutboundMessage> {
    let request = parse_validate_request(body).context("Failed to decode request")?;
    let responder = ArrangementResponder::new(template, RandomTransactionIds);

    let mut outbound = OutboundMessage::new(config.settings.content_type.clone());
    responder
        .apply_business_rules(&request, &mut outbound)
        .context("Failed to build response")?;
    Ok(outbound)
}

fn read_request(source: &str) -> Result<Vec<u8>, StubError> {
    if source == "-" {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        Ok(body)
    } else {
        Ok(std::fs::read(source)?)
    }
}
