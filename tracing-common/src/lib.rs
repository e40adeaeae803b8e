use std::{collections::HashMap, time::Duration};

use color_eyre::eyre::{Context, Result};
use opentelemetry_otlp::WithExportConfig;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Installs the sentry client when `SENTRY_DSN` is set.
///
/// The returned guard flushes pending events on drop, so callers keep it alive
/// for the lifetime of `main`.
pub fn setup_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    ));

    Some(guard)
}

pub fn setup_tracing(crate_name: &str) -> Result<()> {
    color_eyre::install()?;

    let rust_log = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("warn,{crate_name}=trace,db=debug,tower_http=debug"));

    let env_filter = EnvFilter::builder()
        .parse(&rust_log)
        .wrap_err_with(|| format!("Couldn't create env filter from {rust_log}"))?;

    let opentelemetry_layer = if let Ok(honeycomb_key) = std::env::var("HONEYCOMB_API_KEY") {
        let mut map = HashMap::<String, String>::new();
        map.insert("x-honeycomb-team".to_string(), honeycomb_key);
        map.insert("x-honeycomb-dataset".to_string(), crate_name.to_string());

        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_endpoint("https://api.honeycomb.io/v1/traces")
                    .with_timeout(Duration::from_secs(3))
                    .with_headers(map),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .wrap_err("Couldn't install the OTLP tracing pipeline")?;

        println!("Honeycomb layer configured");

        Some(OpenTelemetryLayer::new(tracer))
    } else {
        println!("Skipping Honeycomb layer");

        None
    };

    let heirarchical = HierarchicalLayer::default()
        .with_writer(std::io::stdout)
        .with_indent_lines(true)
        .with_indent_amount(2)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_verbose_exit(true)
        .with_verbose_entry(true)
        .with_targets(true);

    Registry::default()
        .with(heirarchical)
        .with(opentelemetry_layer)
        .with(sentry_tracing::layer())
        .with(env_filter)
        .try_init()
        .wrap_err("Couldn't install the tracing subscriber")?;

    Ok(())
}
