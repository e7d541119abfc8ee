//! Building inquiry requests and decoding inquiry responses.
//!
//! Request layout (abridged):
//! ```text
//! { "version": "1.4",
//!   "availableSpectrumInquiryRequests": [ { "requestId": "0",
//!       "deviceDescriptor": {..}, "location": {..},
//!       "inquiredFrequencyRange": [..], "inquiredChannels": [..] } ] }
//! ```

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::types::*;

/// Build an inquiry request for a single device.
///
/// Pure: the same inputs always produce the same request.
pub fn build_request(
    frequency_ranges: &[FrequencyRange],
    channel_classes: &[u8],
    device: &DeviceParams,
) -> InquiryRequestMessage {
    let request = SpectrumInquiryRequest {
        request_id: SINGLE_REQUEST_ID.to_string(),
        device_descriptor: DeviceDescriptor {
            serial_number: device.serial_number.clone(),
            certification_id: vec![CertificationId {
                ruleset_id: device.ruleset_id.clone(),
                id: device.certification_id.clone(),
            }],
        },
        location: Location {
            ellipse: Ellipse {
                center: Point {
                    latitude: device.latitude,
                    longitude: device.longitude,
                },
                major_axis: device.major_axis,
                minor_axis: device.minor_axis,
                orientation: device.orientation,
            },
            elevation: Elevation {
                height: device.height,
                height_type: device.height_type.clone(),
                vertical_uncertainty: device.vertical_uncertainty,
            },
            indoor_deployment: device.indoor_deployment,
        },
        inquired_frequency_range: frequency_ranges.to_vec(),
        inquired_channels: channel_classes
            .iter()
            .map(|&global_operating_class| InquiredChannel {
                global_operating_class,
            })
            .collect(),
    };

    InquiryRequestMessage {
        version: PROTOCOL_VERSION.to_string(),
        available_spectrum_inquiry_requests: vec![request],
    }
}

/// Serialize a request into the JSON body sent to the portal.
pub fn encode_request(request: &InquiryRequestMessage) -> Result<Value, ProtocolError> {
    serde_json::to_value(request).map_err(|e| ProtocolError::EncodeError(e.to_string()))
}

/// Decode an inquiry response into the sorted, duplicate-free set of
/// available channel identifiers.
///
/// Every `channelCfi` of every `availableChannelInfo` block of every
/// response entry is included. Missing keys yield
/// [`ProtocolError::MalformedResponse`].
pub fn parse_response(response: &Value) -> Result<Vec<Cfi>, ProtocolError> {
    let message = InquiryResponseMessage::deserialize(response)
        .map_err(|e| ProtocolError::MalformedResponse(e.to_string()))?;

    let channels: BTreeSet<Cfi> = message
        .available_spectrum_inquiry_responses
        .iter()
        .flat_map(|r| r.available_channel_info.iter())
        .flat_map(|info| info.channel_cfi.iter().copied())
        .collect();

    Ok(channels.into_iter().collect())
}

/// Like [`parse_response`], but treats a missing body as malformed.
pub fn parse_optional_response(response: Option<&Value>) -> Result<Vec<Cfi>, ProtocolError> {
    match response {
        Some(value) => parse_response(value),
        None => Err(ProtocolError::MalformedResponse(
            "no response body available".to_string(),
        )),
    }
}
