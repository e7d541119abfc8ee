//! Access point control.
//!
//! This module provides:
//! - [`ApController`]: the two reconfiguration operations the coordinator needs
//! - [`HostapdController`]: edits the hostapd config file and restarts the AP
//! - [`DryRunController`]: logs the requested change and touches nothing

pub mod dry_run;
pub mod hostapd;

use async_trait::async_trait;
use thiserror::Error;

pub use dry_run::DryRunController;
pub use hostapd::HostapdController;

/// Access point reconfiguration errors.
#[derive(Debug, Error)]
pub enum ApError {
    /// The hostapd configuration could not be read or written.
    #[error("Modify config file error: {0}")]
    Io(#[from] std::io::Error),

    /// The restart script exited unsuccessfully or could not be spawned.
    #[error("Restart AP error: {0}")]
    RestartFailed(String),
}

/// Radio mode written to `hw_mode=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwMode {
    /// 5GHz.
    A,
    /// 2.4GHz.
    G,
}

impl HwMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HwMode::A => "a",
            HwMode::G => "g",
        }
    }
}

/// Local access point operations.
#[async_trait]
pub trait ApController: Send + Sync {
    /// Move the AP to a 5GHz channel and restart it.
    async fn apply_channel(&self, channel: u8) -> Result<(), ApError>;

    /// Move the AP to the 2.4GHz fallback channel and restart it.
    async fn fallback_to_legacy_band(&self) -> Result<(), ApError>;
}
