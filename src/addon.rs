use std::{path::PathBuf, process::Command};

use tracing::{debug, info, warn};

use crate::channel::TelemetryMode;

/// What the user asked to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub url: String,
    /// Expected sha256 of the download, hex encoded
    pub sha256: Option<String>,
}

/// The only thing the cluster learns from an install attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub ok: bool,
    pub message: String,
}

impl InstallResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Fetches and registers the telemetry bridge. Opaque to the cluster.
pub trait Installer {
    fn install(&self, request: &InstallRequest, console_ip: Option<&str>) -> InstallResult;

    /// One-word state of the bridge service for `console_ip`, such as `active`
    fn bridge_status(&self, console_ip: &str) -> String;
}

/// Name of the bridge service unit registered for a console
pub fn bridge_unit(console_ip: &str) -> String {
    format!("simdash-proxy@{console_ip}.service")
}

/// Runs an external provisioning program:
/// `<program> <url> <console-ip> [sha256]`, exit status 0 meaning success.
/// Bridge state comes from `<status_program> is-active <unit>`.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: PathBuf,
    status_program: PathBuf,
}

impl CommandInstaller {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            status_program: PathBuf::from("/bin/systemctl"),
        }
    }

    pub fn with_status_program(mut self, status_program: impl Into<PathBuf>) -> Self {
        self.status_program = status_program.into();
        self
    }
}

impl Installer for CommandInstaller {
    fn install(&self, request: &InstallRequest, console_ip: Option<&str>) -> InstallResult {
        let Some(console_ip) = console_ip.filter(|ip| !ip.is_empty()) else {
            return InstallResult::failure("Set console IP first");
        };

        let mut cmd = Command::new(&self.program);
        cmd.arg(&request.url).arg(console_ip);
        if let Some(sha) = &request.sha256 {
            cmd.arg(sha);
        }

        info!("Installing telemetry bridge from {}", request.url);
        match cmd.output() {
            Ok(out) => {
                let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).trim().to_string();
                if out.status.success() {
                    let stdout = text(&out.stdout);
                    InstallResult::success(if stdout.is_empty() {
                        format!("Installed bridge for {console_ip}")
                    } else {
                        stdout
                    })
                } else {
                    let stderr = text(&out.stderr);
                    warn!("Installer exited with {}: {}", out.status, stderr);
                    InstallResult::failure(if stderr.is_empty() {
                        format!("Installer failed ({})", out.status)
                    } else {
                        stderr
                    })
                }
            }
            Err(err) => InstallResult::failure(format!(
                "Could not run {}: {}",
                self.program.display(),
                err
            )),
        }
    }

    fn bridge_status(&self, console_ip: &str) -> String {
        // is-active exits non-zero for inactive units but still names the state
        match Command::new(&self.status_program)
            .arg("is-active")
            .arg(bridge_unit(console_ip))
            .output()
        {
            Ok(out) => {
                let state = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if state.is_empty() {
                    "unknown".to_string()
                } else {
                    state
                }
            }
            Err(err) => {
                debug!("Could not query {}: {err}", bridge_unit(console_ip));
                "unknown".to_string()
            }
        }
    }
}

/// Switch to network telemetry only after a successful install
pub fn mode_after_install(current: TelemetryMode, result: &InstallResult) -> TelemetryMode {
    if result.ok {
        TelemetryMode::Network
    } else {
        current
    }
}
