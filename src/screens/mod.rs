//! The cluster's screens.
//!
//! The dashboard is the root screen and owns the telemetry channel. Settings
//! is pushed on top of it, which exits the dashboard (stopping its source) for
//! as long as settings is shown; popping back re-enters the dashboard with
//! whatever mode settings left behind.

mod dashboard;
mod settings;

pub use dashboard::DashboardScreen;
pub use settings::SettingsScreen;
