//! Controller that only logs what it would do.

use async_trait::async_trait;
use log::info;

use afc_protocol::LEGACY_FALLBACK_CHANNEL;

use crate::ap::{ApController, ApError, HwMode};

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunController;

#[async_trait]
impl ApController for DryRunController {
    async fn apply_channel(&self, channel: u8) -> Result<(), ApError> {
        info!(
            "[dry-run] Would set channel to {} and hw_mode to {}",
            channel,
            HwMode::A.as_str()
        );
        Ok(())
    }

    async fn fallback_to_legacy_band(&self) -> Result<(), ApError> {
        info!(
            "[dry-run] Would set channel to {} and hw_mode to {}",
            LEGACY_FALLBACK_CHANNEL,
            HwMode::G.as_str()
        );
        Ok(())
    }
}
