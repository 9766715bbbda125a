mod config;
mod error;
mod request;
mod resolve;
mod session;
mod tls;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use config::SessionConfig;
use session::SecureSession;
use tls::{CertificatePolicy, InsecurePolicy, StrictPolicy};

#[derive(Parser)]
#[command(name = "tlsfetch")]
#[command(about = "Fetch one HTTPS resource over a single TLS connection", long_about = None)]
#[command(version)]
struct Cli {
    /// Target URL (https only)
    #[arg(env = "TLSFETCH_URL", default_value = "https://api.binance.com/api/v3/trades")]
    url: String,

    /// Accept any server certificate without verification
    #[arg(long)]
    insecure: bool,

    /// Maximum serialized request size in bytes
    #[arg(long, default_value_t = config::DEFAULT_BUFFER_CAP)]
    request_cap: usize,

    /// Maximum response size in bytes; longer responses are truncated
    #[arg(long, default_value_t = config::DEFAULT_BUFFER_CAP)]
    response_cap: usize,

    /// Deadline in seconds applied to each connection stage
    #[arg(long)]
    timeout: Option<u64>,

    /// User-Agent header value
    #[arg(long, env = "TLSFETCH_USER_AGENT", default_value = request::DEFAULT_USER_AGENT)]
    user_agent: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let url = Url::parse(&cli.url).context("Invalid target URL")?;
    if url.scheme() != "https" {
        anyhow::bail!("Unsupported URL scheme: {}", url.scheme());
    }
    let host = url.host_str().context("Missing host in URL")?.to_string();
    let service = match url.port() {
        Some(port) => port.to_string(),
        None => url.scheme().to_string(),
    };
    let path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };

    let mut config = SessionConfig {
        request_cap: cli.request_cap,
        response_cap: cli.response_cap,
        user_agent: cli.user_agent,
        ..SessionConfig::default()
    };
    if let Some(secs) = cli.timeout {
        let deadline = Duration::from_secs(secs);
        config.connect_timeout = deadline;
        config.handshake_timeout = deadline;
        config.write_timeout = deadline;
        config.read_timeout = deadline;
    }

    let policy: Arc<dyn CertificatePolicy> = if cli.insecure {
        tracing::warn!("Certificate verification disabled, accepting any certificate");
        Arc::new(InsecurePolicy)
    } else {
        Arc::new(StrictPolicy)
    };

    tracing::info!("Fetching {}", cli.url);

    let endpoints = resolve::resolve_endpoints(&host, &service).await?;
    let connector = tls::create_connector(policy)?;
    let session = SecureSession::new(endpoints, host, path, connector, config);
    let response = session.fetch().await?;

    tracing::info!("Received {} byte(s)", response.body.len());
    if response.truncated {
        tracing::warn!("Response truncated at {} byte(s)", cli.response_cap);
    }

    let mut stdout = io::stdout();
    stdout
        .write_all(&response.body)
        .context("Failed to write response body")?;
    stdout.flush().context("Failed to flush response body")?;

    Ok(())
}
