pub mod addon;
pub mod channel;
pub mod config;
pub mod console;
pub mod demo;
pub mod error;
pub mod feed;
pub mod frame;
pub mod network;
pub mod screen;
pub mod screens;

pub use channel::{ChannelConfig, FrameSource, TelemetryChannel, TelemetryMode};
pub use frame::TelemetryFrame;

/// Where the telemetry bridge forwards to by default
pub const DEFAULT_UDP_HOST: &str = "127.0.0.1";
pub const DEFAULT_UDP_PORT: u16 = 5600;

/// Shortest period a render or send loop ticks at
pub const MIN_TICK: std::time::Duration = std::time::Duration::from_millis(1);

/// Period of a loop running at `rate` per second. Rates below 1 count as 1,
/// and the period never drops below [`MIN_TICK`].
pub fn tick_period(rate: f64) -> std::time::Duration {
    std::time::Duration::from_secs_f64(1.0 / rate.max(1.0)).max(MIN_TICK)
}

/// Build the fmt subscriber shared by the binaries.
/// If RUST_LOG is not set, defaults to loglevel INFO
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

    let subscriber = tracing_subscriber::fmt()
        .with_thread_ids(true)
        .with_ansi(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
