//! hostapd-backed access point controller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{error, info};
use tokio::process::Command;

use afc_protocol::LEGACY_FALLBACK_CHANNEL;

use crate::ap::{ApController, ApError, HwMode};
use crate::config::OpenwifiSection;

/// Rewrites `hw_mode=` and `channel=` in the hostapd config, then runs the
/// restart script.
#[derive(Debug, Clone)]
pub struct HostapdController {
    config_path: PathBuf,
    restart_script: PathBuf,
}

impl HostapdController {
    pub fn new(config_path: impl Into<PathBuf>, restart_script: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            restart_script: restart_script.into(),
        }
    }

    pub fn from_config(section: &OpenwifiSection) -> Self {
        Self::new(&section.hostapd_config, &section.restart_script)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    async fn reconfigure(&self, mode: HwMode, channel: u8) -> Result<(), ApError> {
        // The restart runs even if the edit failed, so the AP comes back up.
        let edit = self.write_config(mode, channel).await;
        match &edit {
            Ok(()) => info!(
                "Successfully set channel to {} and hw_mode to {}",
                channel,
                mode.as_str()
            ),
            Err(e) => error!("{}", e),
        }

        let restart = self.restart_ap().await;
        edit?;
        restart
    }

    async fn write_config(&self, mode: HwMode, channel: u8) -> Result<(), ApError> {
        let contents = tokio::fs::read_to_string(&self.config_path).await?;
        let updated = rewrite_config(&contents, mode, channel);
        tokio::fs::write(&self.config_path, updated).await?;
        Ok(())
    }

    async fn restart_ap(&self) -> Result<(), ApError> {
        let status = Command::new(&self.restart_script)
            .status()
            .await
            .map_err(|e| {
                let err = ApError::RestartFailed(format!(
                    "{}: {}",
                    self.restart_script.display(),
                    e
                ));
                error!("{}", err);
                err
            })?;

        if status.success() {
            info!("Restart AP success");
            Ok(())
        } else {
            let err = ApError::RestartFailed(format!(
                "{} exited with {}",
                self.restart_script.display(),
                status
            ));
            error!("{}", err);
            Err(err)
        }
    }
}

#[async_trait]
impl ApController for HostapdController {
    async fn apply_channel(&self, channel: u8) -> Result<(), ApError> {
        self.reconfigure(HwMode::A, channel).await
    }

    async fn fallback_to_legacy_band(&self) -> Result<(), ApError> {
        self.reconfigure(HwMode::G, LEGACY_FALLBACK_CHANNEL).await
    }
}

/// Replace the `hw_mode=` and `channel=` lines, keeping everything else.
pub fn rewrite_config(contents: &str, mode: HwMode, channel: u8) -> String {
    contents
        .split_inclusive('\n')
        .map(|line| {
            let ending = &line[line.trim_end_matches(['\r', '\n']).len()..];
            if line.starts_with("hw_mode=") {
                format!("hw_mode={}{}", mode.as_str(), ending)
            } else if line.starts_with("channel=") {
                format!("channel={}{}", channel, ending)
            } else {
                line.to_string()
            }
        })
        .collect()
}
