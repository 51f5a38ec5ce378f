//! hostpanel daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   admin client ──▶ http (auth, request id) ──▶ DomainService
//!                                                   │
//!          ┌──────────────┬──────────────┬──────────┴──────┬──────────────┐
//!          ▼              ▼              ▼                 ▼              ▼
//!      validator     provisioner    config writer      activator     certificates
//!    (domain::name)  (site dirs)   (staging dir)   (swap, check,     (certbot)
//!                                                   reload, rollback)
//!                                                        │
//!                                                        ▼
//!                                                  nginx -t / -s reload
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use hostpanel::config::{load_config, loader::default_config};
use hostpanel::lifecycle::Shutdown;
use hostpanel::observability::{logging, metrics};
use hostpanel::{AdminServer, DomainService};

#[derive(Parser)]
#[command(name = "hostpanel")]
#[command(about = "Domain provisioning daemon for a single-host web panel", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hostpanel starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        live_dir = %config.vhost.live_dir.display(),
        web_root = %config.sites.web_root.display(),
        tls_enabled = config.certificates.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Arc::new(DomainService::from_config(&config)?);
    service.reconcile().await?;

    let shutdown = Shutdown::new();
    let server = AdminServer::new(service, &config);

    let (served, ()) = tokio::join!(server.run(shutdown.subscribe()), async {
        shutdown.trigger_on_signal().await;
    });
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
