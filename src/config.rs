use std::{cell::RefCell, rc::Rc};

use crate::{
    channel::{ChannelConfig, TelemetryMode},
    network::NetworkOptions,
};

/// Settings the screens read and change at runtime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSettings {
    pub mode: TelemetryMode,
    pub network: NetworkOptions,
    /// Address of the console the telemetry bridge talks to
    pub console_ip: Option<String>,
}

impl ClusterSettings {
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            mode: self.mode,
            network: self.network.clone(),
        }
    }
}

/// All screens run on the UI loop, so settings are shared without locking
pub type SharedSettings = Rc<RefCell<ClusterSettings>>;

pub fn shared(settings: ClusterSettings) -> SharedSettings {
    Rc::new(RefCell::new(settings))
}
