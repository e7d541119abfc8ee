//! One-shot inquiry run before the command loop starts.

use log::info;

use afc_protocol::DEFAULT_CHANNEL_CLASSES;

use crate::afc::PortalTransport;
use crate::coordinator::{Coordinator, PipelineOutcome};

/// Inquire once with the default operating classes and configure the AP.
///
/// Every failure ends in the legacy band, never in an error.
pub async fn run_startup<T: PortalTransport>(coordinator: &mut Coordinator<T>) -> PipelineOutcome {
    info!("Running startup inquiry");
    let outcome = coordinator.run_best_channel(&DEFAULT_CHANNEL_CLASSES).await;

    match &outcome {
        PipelineOutcome::Applied { cfi, channel } => {
            info!("Startup complete on channel {} (CFI {})", channel, cfi)
        }
        other => info!("Startup complete without 6GHz grant: {:?}", other),
    }
    outcome
}
