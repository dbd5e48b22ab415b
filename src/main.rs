use std::sync::{Arc, RwLock};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use medigate::backend::{ForwardingBackend, MockBackend, PredictionBackend};
use medigate::dispatcher::Dispatcher;
use medigate::middleware::{CorsMiddleware, MetricsMiddleware, TracingMiddleware};
use medigate::registry;
use medigate::router::Router;
use medigate::runtime_config::RuntimeConfig;
use medigate::server::{AppService, HttpServer};

/// Command-line interface for the medigate gateway.
#[derive(Parser)]
#[command(name = "medigate")]
#[command(about = "Disease-prediction edge gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the edge router
    Serve {
        /// Address to bind to
        #[arg(long, env = "MEDIGATE_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,

        /// Prediction backend to serve
        #[arg(long, value_enum, default_value = "mock")]
        backend: BackendKind,

        /// Downstream inference base URL (required for --backend forward)
        #[arg(long, env = "MEDIGATE_INFERENCE_URL")]
        inference_url: Option<String>,

        /// Emit logs as JSON instead of human-readable lines
        #[arg(long, default_value_t = false)]
        json_logs: bool,
    },
    /// Print the routing table and exit
    Routes,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Synthesized pseudo-random predictions
    Mock,
    /// Relay to a real inference service
    Forward,
}

fn init_tracing(json_logs: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    guard
}

fn build_backend(
    kind: BackendKind,
    inference_url: Option<String>,
    config: &RuntimeConfig,
) -> anyhow::Result<Arc<dyn PredictionBackend>> {
    match kind {
        BackendKind::Mock => Ok(Arc::new(MockBackend::new())),
        BackendKind::Forward => {
            let url = inference_url
                .or_else(|| config.inference_url.clone())
                .context("--backend forward requires --inference-url or MEDIGATE_INFERENCE_URL")?;
            Ok(Arc::new(ForwardingBackend::new(url, config.timeout)?))
        }
    }
}

fn serve(
    addr: String,
    backend_kind: BackendKind,
    inference_url: Option<String>,
) -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();
    may::config().set_stack_size(config.stack_size);

    let backend = build_backend(backend_kind, inference_url, &config)?;

    let routes = registry::build_routes();
    let router = Arc::new(RwLock::new(Router::new(routes)));

    let cors = Arc::new(CorsMiddleware::permissive());
    let metrics = Arc::new(MetricsMiddleware::new());

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_middleware(Arc::new(TracingMiddleware));
    dispatcher.add_middleware(Arc::clone(&metrics) as Arc<dyn medigate::middleware::Middleware>);
    dispatcher.add_middleware(Arc::clone(&cors) as Arc<dyn medigate::middleware::Middleware>);
    // SAFETY: the May runtime is configured above; handlers are spawned once
    // at startup before the server accepts traffic.
    unsafe {
        medigate::handlers::register_all(&mut dispatcher, &backend);
    }

    let mut service = AppService::new(router, Arc::new(RwLock::new(dispatcher)), cors);
    service.set_metrics_middleware(metrics);

    tracing::info!(addr = %addr, "medigate listening");
    let handle = HttpServer(service)
        .start(&addr)
        .with_context(|| format!("failed to bind {addr}"))?;

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let signal = signals.forever().next();
        tracing::info!(signal = ?signal, "shutdown signal received");
        handle.stop();
    }
    #[cfg(not(unix))]
    {
        handle
            .join()
            .map_err(|e| anyhow::anyhow!("server failed: {e:?}"))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            addr,
            backend,
            inference_url,
            json_logs,
        } => {
            let _guard = init_tracing(json_logs);
            serve(addr, backend, inference_url)
        }
        Commands::Routes => {
            let router = Router::new(registry::build_routes());
            router.dump_routes();
            Ok(())
        }
    }
}
