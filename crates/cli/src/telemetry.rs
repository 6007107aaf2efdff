//! OpenTelemetry export for operation spans
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name (default: stinger)
//!
//! # Example
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//! OTEL_SERVICE_NAME=stinger-dev \
//!     stinger questions
//! ```

use anyhow::Result;

#[cfg(feature = "telemetry")]
pub type TelemetryLayer = tracing_opentelemetry::OpenTelemetryLayer<
    tracing_subscriber::Registry,
    opentelemetry_sdk::trace::Tracer,
>;

#[cfg(not(feature = "telemetry"))]
pub type TelemetryLayer = tracing_subscriber::layer::Identity;

/// Export layer, when OpenTelemetry is configured.
///
/// Runs before the subscriber is installed, so diagnostics go to stderr.
pub fn layer() -> Result<Option<TelemetryLayer>> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };

    #[cfg(feature = "telemetry")]
    {
        build(&endpoint).map(Some)
    }

    #[cfg(not(feature = "telemetry"))]
    {
        eprintln!(
            "OpenTelemetry endpoint {} set but feature 'telemetry' not enabled \
             (rebuild with: cargo build --features telemetry)",
            endpoint
        );
        Ok(None)
    }
}

#[cfg(feature = "telemetry")]
fn build(endpoint: &str) -> Result<TelemetryLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "stinger".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Flush pending spans before exit
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
