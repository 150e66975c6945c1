//! Mimic mock server binary.
//!
//! Every option may also be given through a `MIMIC_*` environment variable or
//! the `mimic.yaml` file in the config directory. Command-line values win.

use clap::Parser;
use mimic_server::config::{ConfigLayer, ServerConfig};
use mimic_server::expectation::ExpectationLoader;
use mimic_server::response::ResponseStrategyLocator;
use mimic_server::shutdown::ShutdownHooks;
use mimic_server::tls::create_tls_acceptor;
use mimic_server::{Dispatcher, MockServer, MockState};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mimic-server", version, about = "Stand-alone HTTP mock server")]
struct Args {
    /// Address to listen on [default: 0.0.0.0]
    #[arg(short, long, env = "MIMIC_IP")]
    ip: Option<IpAddr>,

    /// Port to listen on [default: 8086]
    #[arg(short, long, env = "MIMIC_PORT")]
    port: Option<u16>,

    /// Directory with pre-defined expectations [default: ~/.mimic/expectations]
    #[arg(short, long, env = "MIMIC_EXPECTATIONS_DIR")]
    expectations_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "MIMIC_DEBUG")]
    debug: bool,

    /// Directory containing mimic.yaml [default: current directory]
    #[arg(short, long, env = "MIMIC_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// TLS certificate (PEM); enables HTTPS
    #[arg(short = 't', long, env = "MIMIC_CERTIFICATE")]
    certificate: Option<PathBuf>,

    /// TLS private key (PEM; encrypted PKCS#8 needs --cert-passphrase)
    #[arg(short = 'k', long, env = "MIMIC_CERTIFICATE_KEY")]
    certificate_key: Option<PathBuf>,

    /// Passphrase of an encrypted PKCS#8 private key
    #[arg(short = 's', long, env = "MIMIC_CERT_PASSPHRASE")]
    cert_passphrase: Option<String>,
}

impl Args {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            ip: self.ip,
            port: self.port,
            expectations_dir: self.expectations_dir.clone(),
            debug: self.debug.then_some(true),
            certificate: self.certificate.clone(),
            certificate_key: self.certificate_key.clone(),
            cert_passphrase: self.cert_passphrase.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config_dir = args.config_path.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = ServerConfig::load(&config_dir, args.layer())?;

    let level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mimic_server={level},warn").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mimic{}...",
        if config.debug { " in debug mode" } else { "" }
    );

    config.prepare_expectations_dir()?;
    debug!(path = %config.expectations_dir.display(), "Expectations dir is set");
    let backup = ExpectationLoader::load_dir(&config.expectations_dir)?;

    let tls = match &config.tls {
        Some(tls) => Some(create_tls_acceptor(
            &tls.certificate,
            &tls.certificate_key,
            tls.passphrase.as_deref(),
        )?),
        None => None,
    };

    let state = Arc::new(MockState::with_backup(&backup));
    let locator = Arc::new(ResponseStrategyLocator::new()?);
    let dispatcher = Dispatcher::new(state, locator);
    let server = MockServer::bind(&config.listen, dispatcher, backup, tls).await?;
    let handle = server.spawn();

    let mut hooks = ShutdownHooks::new();
    hooks.register("announce", || async { info!("Stopping mimic...") });
    hooks.register("stop server", move || handle.stop());
    hooks.register("farewell", || async { info!("Bye bye") });

    shutdown_signal().await;
    hooks.run().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
