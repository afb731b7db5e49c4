//! Process entry point: load configuration, wire the concrete capability
//! implementations (§9's traits) together, build the router, serve.

use {
    pulsegate_channel::{ChannelConfig, ChannelRegistry},
    pulsegate_common::{Config, Signer, UsageSink},
    pulsegate_gateway::{app::build_gateway_app, state::AppState},
    pulsegate_grants::{EdDsaSigner, GrantIssuer, InMemoryGrantCache, InMemoryKeyStore, SlidingWindowRateLimiter},
    pulsegate_usage::{BufferedUsageSink, HttpSinkConfig, HttpUsageSink, NoopUsageSink, UsageBufferConfig},
    secrecy::ExposeSecret,
    std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    },
    tracing::info,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    if let Err(err) = config.validate() {
        eprintln!("configuration error: {err}");
        std::process::exit(1);
    }
    pulsegate_common::init_tracing(config.log_format == "json");

    #[cfg(feature = "prometheus")]
    let metrics = pulsegate_metrics::init_metrics(pulsegate_metrics::MetricsRecorderConfig {
        enabled: true,
        prefix: Some("pulsegate".into()),
        global_labels: Vec::new(),
    })?;

    let signer: Arc<dyn Signer> = Arc::new(EdDsaSigner::from_base64(
        config.signing_key.as_ref().map(|k| k.expose_secret().as_str()),
        config.verify_key.as_deref(),
    )?);

    let key_store = InMemoryKeyStore::new();
    if let Some(seed) = &config.bootstrap_keys {
        bootstrap_keys(&key_store, seed);
    }
    let key_store = Arc::new(key_store);

    let rate_limiter = Arc::new(SlidingWindowRateLimiter::new());
    let grant_cache = Arc::new(InMemoryGrantCache::new());

    let issuer = Arc::new(GrantIssuer::new(key_store, rate_limiter, grant_cache, signer.clone()));

    let usage_sink: Arc<dyn UsageSink> = match (&config.webhook_url, &config.webhook_secret) {
        (Some(url), Some(secret)) => {
            let http_sink = HttpUsageSink::new(HttpSinkConfig::new(url.clone(), secret.expose_secret().clone()));
            Arc::new(BufferedUsageSink::spawn(Arc::new(http_sink), UsageBufferConfig::default()))
        }
        _ => {
            info!("no usage webhook configured, shipped events will be discarded");
            Arc::new(NoopUsageSink)
        }
    };

    let channel_config = ChannelConfig {
        egress_budget_bytes: pulsegate_protocol::DEFAULT_EGRESS_BUFFER_BYTES,
        heartbeat_secs: config.heartbeat_secs,
        grace_secs: config.grace_secs,
        sweep_interval: Duration::from_secs(1),
    };
    let registry = Arc::new(ChannelRegistry::new(signer, usage_sink, channel_config, Duration::from_secs(300)));
    let draining = Arc::new(AtomicBool::new(false));

    let state = AppState {
        issuer,
        registry: registry.clone(),
        active_connections: Arc::new(AtomicUsize::new(0)),
        draining: draining.clone(),
        #[cfg(feature = "prometheus")]
        metrics,
        version: env!("CARGO_PKG_VERSION"),
    };

    let app = build_gateway_app(state, true);

    info!(addr = %config.bind_addr, "starting pulsegate gateway");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(draining, registry))
        .await?;

    Ok(())
}

fn bootstrap_keys(store: &InMemoryKeyStore, seed: &str) {
    for entry in seed.split(';').filter(|s| !s.is_empty()) {
        let parts: Vec<&str> = entry.splitn(3, ':').collect();
        let [secret_key, project_id, key_id] = parts[..] else {
            tracing::warn!(entry, "skipping malformed bootstrap key entry");
            continue;
        };
        store.insert(secret_key, project_id, key_id, pulsegate_common::KeyStatus::Active);
    }
}

async fn shutdown_signal(draining: Arc<AtomicBool>, registry: Arc<ChannelRegistry>) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    draining.store(true, Ordering::Relaxed);
    info!("shutdown signal received, draining connections");
    registry.shutdown_all();
}
