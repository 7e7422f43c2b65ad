use std::{
    f64::consts::TAU,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{
    channel::{FrameSource, TelemetryMode},
    error::SourceError,
    frame::{now_ns, TelemetryFrame},
};

/// Synthetic telemetry, a pure function of the time elapsed since `start()`.
#[derive(Debug, Default)]
pub struct DemoSource {
    started: Option<(Instant, u64)>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frame `elapsed` after start. Identical inputs give identical frames.
    pub fn frame_at(&self, elapsed: Duration) -> TelemetryFrame {
        let epoch_ns = self.started.map(|(_, ns)| ns).unwrap_or_default();
        let t = elapsed.as_secs_f64();
        TelemetryFrame {
            received_time: epoch_ns.saturating_add(elapsed.as_nanos() as u64),
            car_speed: (35.0 + 15.0 * (TAU * t / 6.0).sin()).max(0.0),
            engine_rpm: (6500.0 + 2000.0 * (TAU * t / 3.0).sin()) as u32,
            current_gear: 3 + ((t / 7.0).floor() as i64 % 4) as i32,
            throttle: (t.sin() * 0.5 + 0.5).max(0.0),
            brake: ((t + 1.8).sin() * -0.4).max(0.0),
            steering: (t / 2.0).sin() * 0.3,
            lap: Some(1 + (t / 90.0).floor() as u32),
        }
    }
}

impl FrameSource for DemoSource {
    fn kind(&self) -> TelemetryMode {
        TelemetryMode::Demo
    }

    fn start(&mut self) -> Result<(), SourceError> {
        debug!("Starting demo telemetry");
        self.started = Some((Instant::now(), now_ns()));
        Ok(())
    }

    fn latest(&self) -> TelemetryFrame {
        match self.started {
            Some((at, _)) => self.frame_at(at.elapsed()),
            None => TelemetryFrame::default(),
        }
    }

    fn stop(&mut self) {}
}
