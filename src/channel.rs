use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    demo::DemoSource,
    error::{ChannelError, SourceError},
    frame::TelemetryFrame,
    network::{NetworkOptions, NetworkSource},
};

/// Which producer feeds the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    #[default]
    Demo,
    #[serde(rename = "udp", alias = "network")]
    #[value(name = "udp", alias = "network")]
    Network,
}

impl TelemetryMode {
    pub fn toggled(self) -> Self {
        match self {
            TelemetryMode::Demo => TelemetryMode::Network,
            TelemetryMode::Network => TelemetryMode::Demo,
        }
    }
}

impl fmt::Display for TelemetryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryMode::Demo => f.write_str("Demo"),
            TelemetryMode::Network => f.write_str("UDP"),
        }
    }
}

/// A producer of telemetry frames.
///
/// `start` is called once before `latest` means anything. `stop` releases
/// whatever the source holds and may be called any number of times.
pub trait FrameSource {
    fn kind(&self) -> TelemetryMode;
    fn start(&mut self) -> Result<(), SourceError>;
    /// Never blocks
    fn latest(&self) -> TelemetryFrame;
    fn stop(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    pub mode: TelemetryMode,
    /// Used only in network mode
    pub network: NetworkOptions,
}

/// The one active telemetry source the UI reads from
pub struct TelemetryChannel {
    config: ChannelConfig,
    source: Option<Box<dyn FrameSource>>,
}

impl TelemetryChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            source: None,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    /// Change the configured source. Only valid while stopped.
    pub fn set_config(&mut self, config: ChannelConfig) -> Result<(), ChannelError> {
        if self.is_running() {
            return Err(ChannelError::Running);
        }
        self.config = config;
        Ok(())
    }

    /// Build and start the configured source. On failure nothing is retained.
    pub fn start(&mut self) -> Result<(), ChannelError> {
        if self.is_running() {
            return Ok(());
        }
        let mut source: Box<dyn FrameSource> = match self.config.mode {
            TelemetryMode::Demo => Box::new(DemoSource::new()),
            TelemetryMode::Network => Box::new(NetworkSource::new(self.config.network.clone())),
        };
        if let Err(err) = source.start() {
            warn!("Could not start {} telemetry: {}", self.config.mode, err);
            source.stop();
            return Err(err.into());
        }
        info!("{} telemetry started", source.kind());
        self.source = Some(source);
        Ok(())
    }

    /// The active source's latest frame, or the zero frame when stopped
    pub fn latest(&self) -> TelemetryFrame {
        self.source
            .as_ref()
            .map(|source| source.latest())
            .unwrap_or_default()
    }

    pub fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
            info!("{} telemetry stopped", source.kind());
        }
    }
}

impl Drop for TelemetryChannel {
    fn drop(&mut self) {
        self.stop();
    }
}
