//! Inquiry pipeline: ask the portal, pick a channel, reconfigure the AP.
//!
//! The [`Coordinator`] owns the [`AfcClient`] and the access point
//! controller. It is driven by a single task, so at most one pipeline runs
//! at a time.

use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};

use afc_protocol::{
    build_request, map_to_band_channel, parse_optional_response, AfcError, Cfi, DeviceParams,
    FrequencyRange, LowestChannel, SelectionPolicy,
};

use crate::afc::{AfcClient, PortalTransport};
use crate::ap::ApController;

/// Why the access point was moved to the legacy band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The portal granted no 6GHz channel.
    NoChannels,
    /// The selected channel has no 5GHz partner.
    Unmappable(Cfi),
    /// The portal answered the inquiry with a non-success status.
    InquiryStatus(u16),
    /// The reply could not be decoded.
    Malformed(String),
    /// Authentication, transport or endpoint failure.
    Failed(AfcError),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoChannels => write!(f, "no available 6GHz channel"),
            FallbackReason::Unmappable(cfi) => write!(f, "CFI {} has no 5GHz channel", cfi),
            FallbackReason::InquiryStatus(status) => {
                write!(f, "inquiry failed with status {}", status)
            }
            FallbackReason::Malformed(msg) => write!(f, "malformed inquiry response: {}", msg),
            FallbackReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The AP was moved to `channel`, the partner of `cfi`.
    Applied { cfi: Cfi, channel: u8 },
    /// The AP was moved to the legacy band.
    FellBack(FallbackReason),
    /// The request could not be honored; the AP was left untouched.
    Rejected(String),
    /// The AP controller failed to apply the change.
    ControllerFailed(String),
}

/// Inquiry parameters that do not change between runs.
#[derive(Debug, Clone)]
pub struct InquiryParams {
    pub device: DeviceParams,
    pub channel_classes: Vec<u8>,
    pub frequency_ranges: Vec<FrequencyRange>,
}

pub struct Coordinator<T: PortalTransport> {
    client: AfcClient<T>,
    controller: Arc<dyn ApController>,
    params: InquiryParams,
    policy: Box<dyn SelectionPolicy>,
}

impl<T: PortalTransport> Coordinator<T> {
    pub fn new(
        client: AfcClient<T>,
        controller: Arc<dyn ApController>,
        params: InquiryParams,
    ) -> Self {
        Self {
            client,
            controller,
            params,
            policy: Box::new(LowestChannel),
        }
    }

    /// Replace the channel selection policy.
    pub fn with_policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Submit one inquiry and return the granted channels.
    ///
    /// An empty list means the portal legitimately granted nothing.
    pub async fn query_available(
        &mut self,
        channel_classes: &[u8],
        frequency_ranges: &[FrequencyRange],
    ) -> Result<Vec<Cfi>, FallbackReason> {
        let request = build_request(frequency_ranges, channel_classes, &self.params.device);
        info!(
            "Sending AFC request for operating classes {:?}",
            channel_classes
        );

        self.client
            .submit_inquiry(&request)
            .await
            .map_err(FallbackReason::Failed)?;

        match self.client.latest_status() {
            Some(status) if (200..300).contains(&status) => {}
            Some(status) => return Err(FallbackReason::InquiryStatus(status)),
            None => {
                return Err(FallbackReason::Malformed(
                    "no inquiry reply recorded".to_string(),
                ))
            }
        }

        let response = self.client.latest_response();
        let channels = parse_optional_response(response.as_ref())
            .map_err(|e| FallbackReason::Malformed(e.to_string()))?;
        info!("Available channels: {:?}", channels);
        Ok(channels)
    }

    /// Startup cycle: inquire with the default classes, take the best
    /// granted channel or fall back.
    pub async fn run_best_channel(&mut self, channel_classes: &[u8]) -> PipelineOutcome {
        let channels = match self.query_available(channel_classes, &[]).await {
            Ok(channels) => channels,
            Err(reason) => return self.fall_back(reason).await,
        };

        let cfi = match self.policy.select(&channels) {
            Some(cfi) => cfi,
            None => return self.fall_back(FallbackReason::NoChannels).await,
        };
        info!("Selected channel: {}", cfi);

        match map_to_band_channel(cfi) {
            Some(channel) => self.apply(cfi, channel).await,
            None => self.fall_back(FallbackReason::Unmappable(cfi)).await,
        }
    }

    /// `set <cfi>` cycle: inquire with the configured classes and move to
    /// the requested channel if the portal granted it.
    pub async fn run_set_channel(&mut self, requested: Cfi) -> PipelineOutcome {
        let channel = match map_to_band_channel(requested) {
            Some(channel) => channel,
            None => {
                warn!("CFI {} has no 5GHz channel, ignoring", requested);
                return PipelineOutcome::Rejected(format!(
                    "CFI {} has no 5GHz channel",
                    requested
                ));
            }
        };

        let classes = self.params.channel_classes.clone();
        let ranges = self.params.frequency_ranges.clone();
        let channels = match self.query_available(&classes, &ranges).await {
            Ok(channels) => channels,
            Err(reason) => return self.fall_back(reason).await,
        };

        if channels.is_empty() {
            return self.fall_back(FallbackReason::NoChannels).await;
        }

        if channels.binary_search(&requested).is_err() {
            warn!(
                "CFI {} is not among the available channels {:?}, ignoring",
                requested, channels
            );
            return PipelineOutcome::Rejected(format!("CFI {} is not available", requested));
        }

        info!("Mapped channel: {}", channel);
        self.apply(requested, channel).await
    }

    async fn apply(&self, cfi: Cfi, channel: u8) -> PipelineOutcome {
        match self.controller.apply_channel(channel).await {
            Ok(()) => {
                info!("Set channel: {} (CFI {})", channel, cfi);
                PipelineOutcome::Applied { cfi, channel }
            }
            Err(e) => {
                error!("Failed to set channel {}: {}", channel, e);
                PipelineOutcome::ControllerFailed(e.to_string())
            }
        }
    }

    async fn fall_back(&self, reason: FallbackReason) -> PipelineOutcome {
        match &reason {
            FallbackReason::NoChannels => {
                warn!("No available 6GHz channel, switching to 2.4GHz/5GHz")
            }
            FallbackReason::Malformed(_) => {
                error!("{}, switching to 2.4GHz/5GHz", reason)
            }
            FallbackReason::Failed(e) if e.is_transport() => {
                error!("Failed to connect to AFC server ({}), switching to 2.4GHz/5GHz", e)
            }
            _ => error!("AFC request failed: {}, switching to 2.4GHz/5GHz", reason),
        }

        match self.controller.fallback_to_legacy_band().await {
            Ok(()) => PipelineOutcome::FellBack(reason),
            Err(e) => {
                error!("Failed to switch to legacy band: {}", e);
                PipelineOutcome::ControllerFailed(e.to_string())
            }
        }
    }
}
