use std::{net::Ipv4Addr, rc::Rc};

use tracing::{info, warn};

use crate::{
    addon::{mode_after_install, Installer},
    config::SharedSettings,
    screen::{HookResult, InputEvent, InputOutcome, Screen, Surface, Transition},
};

pub struct SettingsScreen {
    settings: SharedSettings,
    installer: Rc<dyn Installer>,
    /// Outcome of the last action taken on this screen
    status: Option<String>,
    /// Bridge service state and the console IP it was queried for
    bridge: Option<(String, String)>,
}

impl SettingsScreen {
    pub fn new(settings: SharedSettings, installer: Rc<dyn Installer>) -> Self {
        Self {
            settings,
            installer,
            status: None,
            bridge: None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The bridge line, querying the service again only when the console IP changed
    pub fn bridge_line(&mut self) -> String {
        let Some(ip) = self.settings.borrow().console_ip.clone() else {
            return "Bridge: console IP not set".to_string();
        };
        let state = match &self.bridge {
            Some((queried, state)) if *queried == ip => state.clone(),
            _ => {
                let state = self.installer.bridge_status(&ip);
                self.bridge = Some((ip, state.clone()));
                state
            }
        };
        format!("Bridge: {state}")
    }

    fn refresh_bridge(&mut self) {
        self.bridge = None;
        self.bridge_line();
    }

    fn set_console_ip(&mut self, addr: &str) {
        match addr.trim().parse::<Ipv4Addr>() {
            Ok(ip) => {
                self.settings.borrow_mut().console_ip = Some(ip.to_string());
                info!("Console IP set to {ip}");
                self.status = Some(format!("Console IP set to {ip}"));
                self.refresh_bridge();
            }
            Err(_) => {
                warn!("Rejected console IP {addr:?}");
                self.status = Some(format!("Invalid console IP {addr}"));
            }
        }
    }
}

impl Screen for SettingsScreen {
    fn name(&self) -> &str {
        "settings"
    }

    fn enter(&mut self) -> HookResult {
        self.refresh_bridge();
        Ok(())
    }

    fn handle_input(&mut self, event: &InputEvent) -> InputOutcome {
        match event {
            InputEvent::Back => InputOutcome::Navigate(Transition::Pop),
            InputEvent::ToggleTelemetryMode => {
                let mut settings = self.settings.borrow_mut();
                settings.mode = settings.mode.toggled();
                info!("Telemetry mode set to {}", settings.mode);
                InputOutcome::Consumed
            }
            InputEvent::Install(request) => {
                let console_ip = self.settings.borrow().console_ip.clone();
                let result = self.installer.install(request, console_ip.as_deref());
                let mut settings = self.settings.borrow_mut();
                settings.mode = mode_after_install(settings.mode, &result);
                info!(
                    "Install finished (ok: {}), telemetry mode {}",
                    result.ok, settings.mode
                );
                drop(settings);
                self.status = Some(result.message);
                self.refresh_bridge();
                InputOutcome::Consumed
            }
            InputEvent::SetConsoleIp(addr) => {
                self.set_console_ip(addr);
                InputOutcome::Consumed
            }
            InputEvent::OpenSettings => InputOutcome::Ignored,
        }
    }

    fn draw(&mut self, surface: &mut dyn Surface) {
        surface.clear();
        surface.put_text("title", "System settings");
        surface.put_text("telemetry", &self.settings.borrow().mode.to_string());
        let bridge = self.bridge_line();
        surface.put_text("bridge", &bridge);
        if let Some(status) = &self.status {
            surface.put_text("status", status);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::HashMap};

    use super::*;
    use crate::{
        addon::{InstallRequest, InstallResult},
        channel::TelemetryMode,
        config::{shared, ClusterSettings},
    };

    /// Answers with a canned result and counts calls
    struct Canned {
        ok: bool,
        calls: Cell<usize>,
        status_queries: Cell<usize>,
    }

    impl Installer for Canned {
        fn install(&self, _: &InstallRequest, console_ip: Option<&str>) -> InstallResult {
            self.calls.set(self.calls.get() + 1);
            match console_ip {
                None => InstallResult::failure("Set console IP first"),
                Some(_) if self.ok => InstallResult::success("Installed"),
                Some(_) => InstallResult::failure("Download failed"),
            }
        }

        fn bridge_status(&self, console_ip: &str) -> String {
            self.status_queries.set(self.status_queries.get() + 1);
            if self.calls.get() > 0 && self.ok {
                format!("active on {console_ip}")
            } else {
                "inactive".to_string()
            }
        }
    }

    #[derive(Default)]
    struct Slots(HashMap<String, String>);

    impl Surface for Slots {
        fn clear(&mut self) {
            self.0.clear();
        }

        fn put_text(&mut self, slot: &str, text: &str) {
            self.0.insert(slot.to_string(), text.to_string());
        }
    }

    impl Slots {
        fn get(&self, slot: &str) -> Option<&str> {
            self.0.get(slot).map(String::as_str)
        }
    }

    fn screen_with_ip(
        console_ip: Option<&str>,
        ok: bool,
    ) -> (SettingsScreen, SharedSettings, Rc<Canned>) {
        let settings = shared(ClusterSettings {
            console_ip: console_ip.map(str::to_string),
            ..Default::default()
        });
        let installer = Rc::new(Canned {
            ok,
            calls: Cell::new(0),
            status_queries: Cell::new(0),
        });
        (
            SettingsScreen::new(settings.clone(), installer.clone()),
            settings,
            installer,
        )
    }

    fn screen(ok: bool) -> (SettingsScreen, SharedSettings, Rc<Canned>) {
        screen_with_ip(Some("192.168.0.40"), ok)
    }

    fn install_event() -> InputEvent {
        InputEvent::Install(InstallRequest {
            url: "https://example.invalid/bridge.tgz".to_string(),
            sha256: Some("ab".repeat(32)),
        })
    }

    #[test]
    fn toggle_flips_mode() {
        let (mut screen, settings, _) = screen(true);
        assert!(matches!(
            screen.handle_input(&InputEvent::ToggleTelemetryMode),
            InputOutcome::Consumed
        ));
        assert_eq!(settings.borrow().mode, TelemetryMode::Network);
        screen.handle_input(&InputEvent::ToggleTelemetryMode);
        assert_eq!(settings.borrow().mode, TelemetryMode::Demo);
    }

    #[test]
    fn successful_install_switches_to_network() {
        let (mut screen, settings, installer) = screen(true);
        screen.enter().unwrap();
        assert_eq!(screen.status(), None);
        screen.handle_input(&install_event());
        assert_eq!(installer.calls.get(), 1);
        assert_eq!(settings.borrow().mode, TelemetryMode::Network);
        assert_eq!(screen.status(), Some("Installed"));
    }

    #[test]
    fn failed_install_keeps_current_mode() {
        let (mut screen, settings, _) = screen(false);
        screen.handle_input(&install_event());
        assert_eq!(settings.borrow().mode, TelemetryMode::Demo);
        assert_eq!(screen.status(), Some("Download failed"));
    }

    #[test]
    fn back_pops() {
        let (mut screen, _, _) = screen(true);
        assert!(matches!(
            screen.handle_input(&InputEvent::Back),
            InputOutcome::Navigate(Transition::Pop)
        ));
        assert!(matches!(
            screen.handle_input(&InputEvent::OpenSettings),
            InputOutcome::Ignored
        ));
    }

    #[test]
    fn set_console_ip_enables_install() {
        let (mut screen, settings, installer) = screen_with_ip(None, true);
        screen.enter().unwrap();
        screen.handle_input(&install_event());
        assert_eq!(screen.status(), Some("Set console IP first"));
        assert_eq!(settings.borrow().mode, TelemetryMode::Demo);

        assert!(matches!(
            screen.handle_input(&InputEvent::SetConsoleIp(" 192.168.0.40 ".to_string())),
            InputOutcome::Consumed
        ));
        assert_eq!(settings.borrow().console_ip.as_deref(), Some("192.168.0.40"));
        assert_eq!(screen.status(), Some("Console IP set to 192.168.0.40"));

        screen.handle_input(&install_event());
        assert_eq!(installer.calls.get(), 2);
        assert_eq!(settings.borrow().mode, TelemetryMode::Network);
    }

    #[test]
    fn invalid_console_ip_is_rejected() {
        let (mut screen, settings, _) = screen(true);
        for addr in ["192.168.0", "300.1.1.1", "192.168.01.4", "console"] {
            screen.handle_input(&InputEvent::SetConsoleIp(addr.to_string()));
            assert_eq!(screen.status(), Some(format!("Invalid console IP {addr}").as_str()));
        }
        assert_eq!(settings.borrow().console_ip.as_deref(), Some("192.168.0.40"));
    }

    #[test]
    fn bridge_line_follows_console_ip() {
        let (mut screen, _, installer) = screen_with_ip(None, true);
        screen.enter().unwrap();
        let mut surface = Slots::default();
        screen.draw(&mut surface);
        assert_eq!(surface.get("bridge"), Some("Bridge: console IP not set"));
        assert_eq!(surface.get("status"), None);
        assert_eq!(installer.status_queries.get(), 0);

        // the not-set line clears without leaving the screen
        screen.handle_input(&InputEvent::SetConsoleIp("10.0.0.7".to_string()));
        screen.draw(&mut surface);
        assert_eq!(surface.get("bridge"), Some("Bridge: inactive"));
        assert_eq!(surface.get("status"), Some("Console IP set to 10.0.0.7"));

        screen.handle_input(&install_event());
        screen.draw(&mut surface);
        screen.draw(&mut surface);
        assert_eq!(surface.get("bridge"), Some("Bridge: active on 10.0.0.7"));
        assert_eq!(surface.get("status"), Some("Installed"));
        // one query after the IP was set and one after the install, none per draw
        assert_eq!(installer.status_queries.get(), 2);
    }
}
