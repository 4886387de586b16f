mod config;
mod daemon;
mod document;
mod http;
mod probe;
mod snapshot;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use clap::Parser;
use config::Config;
use probe::host::HostSource;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hoststatd")]
#[command(version)]
struct Cli {
    /// Optional YAML configuration file.
    #[arg(long)]
    config: Option<String>,
    /// Listening port; overrides the port of the configured listen address.
    #[arg(short = 'p', long)]
    port: Option<u16>,
    /// Detach from the controlling session and run in the background.
    #[arg(short = 'd', long)]
    daemon: bool,
    #[arg(long)]
    print_default_config: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        if let Err(err) = cfg.set_port(port) {
            error!(error = %err, "invalid listen address");
            process::exit(1);
        }
    }

    if cli.daemon {
        if let Err(err) = daemon::detach() {
            error!(error = %err, "failed to daemonize");
            process::exit(1);
        }
    }

    // The runtime must come up after the optional fork.
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start runtime");
            process::exit(1);
        }
    };
    runtime.block_on(run(cfg));
}

async fn run(cfg: Config) {
    let source = Arc::new(HostSource::new());
    let app = http::build_router(source);

    let addr: SocketAddr = match cfg.listen.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, listen = %cfg.listen, "invalid listen address");
            process::exit(1);
        }
    };
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, listen = %addr, "failed to bind http listener");
            process::exit(1);
        }
    };

    info!(listen = %addr, "hoststatd listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        error!(error = %err, "http server error");
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c");
        return;
    }
    info!("received ctrl-c, shutting down");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
