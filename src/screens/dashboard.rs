use std::{rc::Rc, time::Duration};

use tracing::debug;

use crate::{
    addon::Installer,
    channel::TelemetryChannel,
    config::SharedSettings,
    frame::TelemetryFrame,
    screen::{HookResult, InputEvent, InputOutcome, Screen, Surface, Transition},
    screens::SettingsScreen,
};

/// Live gauges. Owns the telemetry channel for as long as it is on top.
pub struct DashboardScreen {
    settings: SharedSettings,
    installer: Rc<dyn Installer>,
    channel: TelemetryChannel,
    frame: TelemetryFrame,
    /// Why the source is not running, if it failed to start
    fault: Option<String>,
}

impl DashboardScreen {
    pub fn new(settings: SharedSettings, installer: Rc<dyn Installer>) -> Self {
        let config = settings.borrow().channel_config();
        Self {
            settings,
            installer,
            channel: TelemetryChannel::new(config),
            frame: TelemetryFrame::default(),
            fault: None,
        }
    }

    pub fn frame(&self) -> &TelemetryFrame {
        &self.frame
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }
}

impl Screen for DashboardScreen {
    fn name(&self) -> &str {
        "dashboard"
    }

    /// Pick up mode changes made while hidden, then start the source
    fn enter(&mut self) -> HookResult {
        self.channel.stop();
        self.channel
            .set_config(self.settings.borrow().channel_config())?;
        self.frame = TelemetryFrame::default();
        match self.channel.start() {
            Ok(()) => {
                self.fault = None;
                Ok(())
            }
            Err(err) => {
                self.fault = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    fn exit(&mut self) -> HookResult {
        self.channel.stop();
        Ok(())
    }

    fn handle_input(&mut self, event: &InputEvent) -> InputOutcome {
        match event {
            InputEvent::OpenSettings => InputOutcome::Navigate(Transition::Push(Box::new(
                SettingsScreen::new(self.settings.clone(), self.installer.clone()),
            ))),
            _ => InputOutcome::Ignored,
        }
    }

    fn update(&mut self, _dt: Duration) -> Option<Transition> {
        self.frame = self.channel.latest();
        None
    }

    fn draw(&mut self, surface: &mut dyn Surface) {
        let frame = &self.frame;
        surface.clear();
        surface.put_text("speed", &format!("{:.0} km/h", frame.speed_kph()));
        surface.put_text("rpm", &format!("{} rpm", frame.engine_rpm));
        surface.put_text("gear", &frame.gear_label());
        surface.put_text(
            "pedals",
            &format!(
                "T {:.0}% B {:.0}%",
                frame.throttle * 100.0,
                frame.brake * 100.0
            ),
        );
        if let Some(lap) = frame.lap {
            surface.put_text("lap", &format!("Lap {lap}"));
        }
        surface.put_text("source", &self.channel.config().mode.to_string());
        if let Some(fault) = &self.fault {
            debug!("Dashboard showing fault: {fault}");
            surface.put_text("fault", fault);
        }
    }
}
