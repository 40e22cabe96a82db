use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use ar_domain::config::{Config, ObservabilityConfig};
use ar_gateway::api;
use ar_gateway::bootstrap;
use ar_gateway::cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _config_path) = ar_gateway::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability);
            run_server(Arc::new(config), tracer_provider).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = ar_gateway::cli::load_config()?;
            if !ar_gateway::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = ar_gateway::cli::load_config()?;
            ar_gateway::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("agentrelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Install the JSON log subscriber for `serve`, plus an OpenTelemetry
/// layer when `[observability] otlp_endpoint` is set.
///
/// The returned provider must be shut down on exit to flush spans.
fn init_tracing(
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ar_gateway=debug"));

    let provider = obs
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| otlp_provider(endpoint, obs));
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("agentrelay")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer)
        .init();

    provider
}

/// Batch OTLP/gRPC exporter. Runs before the subscriber exists, so a
/// failure goes to stderr and the gateway keeps local logs only.
fn otlp_provider(
    endpoint: &str,
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build();
    let exporter = match exporter {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("WARNING: OTLP export to {endpoint} disabled: {e}");
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    Some(
        opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
                obs.sample_ratio(),
            ))
            .with_resource(resource)
            .build(),
    )
}

/// Start the gateway server with the given configuration.
async fn run_server(
    config: Arc<Config>,
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
) -> anyhow::Result<()> {
    tracing::info!("AgentRelay starting");

    let state = bootstrap::build_app_state(config.clone()).await?;

    // ── CORS layer (config-aware) ────────────────────────────────────
    let cors_layer = build_cors_layer(&config.server.cors);

    // ── Concurrency limit (backpressure protection) ────────────────
    let max_concurrent = config.server.max_concurrent_requests;
    tracing::info!(max_concurrent, "concurrency limit set");

    // ── Router ───────────────────────────────────────────────────────
    let app = api::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state.clone());

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "AgentRelay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error")?;

    // ── Post-shutdown flush ─────────────────────────────────────────
    tracing::info!(
        pending = state.runtime.background.len(),
        "server stopped, waiting for background writes"
    );
    state.runtime.background.drain().await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
        }
    }

    tracing::info!("shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM, then return to trigger graceful shutdown of
/// the Axum server.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
                tracing::info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}

/// CORS for browser clients of the run endpoints.
///
/// An origin ending in `:*` accepts any numeric port on that host; a lone
/// `"*"` accepts every origin.
fn build_cors_layer(cors: &ar_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-tenant-id"),
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-language"),
        ]);

    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allows every origin");
        return base.allow_origin(tower_http::cors::Any);
    }

    let (port_wildcards, exact): (Vec<String>, Vec<String>) = cors
        .allowed_origins
        .iter()
        .cloned()
        .partition(|o| o.ends_with(":*"));

    let exact: Vec<HeaderValue> = exact
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if port_wildcards.is_empty() {
        AllowOrigin::list(exact)
    } else {
        let hosts: Vec<String> = port_wildcards
            .into_iter()
            .map(|o| o.trim_end_matches('*').to_owned())
            .collect();
        AllowOrigin::predicate(move |origin, _| {
            exact.iter().any(|e| e == origin)
                || origin
                    .to_str()
                    .is_ok_and(|o| hosts.iter().any(|h| is_host_with_port(o, h)))
        })
    };

    base.allow_origin(allow_origin).allow_credentials(true)
}

/// `origin` is `host_prefix` followed by a non-empty decimal port.
fn is_host_with_port(origin: &str, host_prefix: &str) -> bool {
    origin
        .strip_prefix(host_prefix)
        .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}
