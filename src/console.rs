//! Headless front end: text commands in, traced readouts out.
//!
//! Stands in for the touch panel and display when the cluster runs without a
//! screen attached (bench testing, CI, a service with a serial console).

use std::collections::BTreeMap;

use tracing::debug;

use crate::{addon::InstallRequest, screen::InputEvent, screen::Surface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Input(InputEvent),
    Quit,
}

/// `s`ettings, `b`ack, `t`oggle, `i`nstall <url> [sha256], `ip` <addr>, `q`uit
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let cmd = match words.next()? {
        "s" | "settings" => ConsoleCommand::Input(InputEvent::OpenSettings),
        "b" | "back" => ConsoleCommand::Input(InputEvent::Back),
        "t" | "toggle" => ConsoleCommand::Input(InputEvent::ToggleTelemetryMode),
        "i" | "install" => {
            let url = words.next()?.to_string();
            let sha256 = words.next().map(str::to_string);
            ConsoleCommand::Input(InputEvent::Install(InstallRequest { url, sha256 }))
        }
        "ip" | "console-ip" => {
            ConsoleCommand::Input(InputEvent::SetConsoleIp(words.next()?.to_string()))
        }
        "q" | "quit" => ConsoleCommand::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// Collects one frame of text slots and traces it when it changes
#[derive(Debug, Default)]
pub struct LogSurface {
    slots: BTreeMap<String, String>,
    last: String,
}

impl LogSurface {
    /// The current frame as `slot: text` pairs
    pub fn render(&self) -> String {
        self.slots
            .iter()
            .map(|(slot, text)| format!("{slot}: {text}"))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Returns true when the frame differed from the previous flush
    pub fn flush(&mut self) -> bool {
        let rendered = self.render();
        if rendered == self.last {
            return false;
        }
        debug!("{rendered}");
        self.last = rendered;
        true
    }
}

impl Surface for LogSurface {
    fn clear(&mut self) {
        self.slots.clear();
    }

    fn put_text(&mut self, slot: &str, text: &str) {
        self.slots.insert(slot.to_string(), text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_line("s"),
            Some(ConsoleCommand::Input(InputEvent::OpenSettings))
        );
        assert_eq!(
            parse_line("  toggle "),
            Some(ConsoleCommand::Input(InputEvent::ToggleTelemetryMode))
        );
        assert_eq!(parse_line("quit"), Some(ConsoleCommand::Quit));
        assert_eq!(
            parse_line("i http://host/bridge.tgz beef"),
            Some(ConsoleCommand::Input(InputEvent::Install(InstallRequest {
                url: "http://host/bridge.tgz".to_string(),
                sha256: Some("beef".to_string()),
            })))
        );
        assert_eq!(
            parse_line("ip 192.168.0.40"),
            Some(ConsoleCommand::Input(InputEvent::SetConsoleIp(
                "192.168.0.40".to_string()
            )))
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("jump"), None);
        assert_eq!(parse_line("install"), None);
        assert_eq!(parse_line("ip"), None);
    }

    #[test]
    fn flush_reports_changes_only() {
        let mut surface = LogSurface::default();
        surface.put_text("gear", "3");
        surface.put_text("speed", "120 km/h");
        assert_eq!(surface.render(), "gear: 3 | speed: 120 km/h");
        assert!(surface.flush());
        assert!(!surface.flush());
        surface.clear();
        surface.put_text("gear", "4");
        assert!(surface.flush());
    }
}
