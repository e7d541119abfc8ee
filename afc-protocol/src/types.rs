//! Message type definitions for the AFC spectrum inquiry protocol.
//!
//! Field names follow the camelCase JSON keys used on the wire.

use serde::{Deserialize, Serialize};

/// Protocol version sent in every inquiry.
pub const PROTOCOL_VERSION: &str = "1.4";

/// Request identifier for a single synchronous inquiry (no batching).
pub const SINGLE_REQUEST_ID: &str = "0";

/// Global operating class inquired at startup (6GHz, 20MHz channels).
pub const DEFAULT_CHANNEL_CLASSES: [u8; 1] = [131];

/// AFC channel frequency indicator.
pub type Cfi = u16;

/// Access point parameters needed to build an inquiry.
///
/// Deserializes directly from the `[ap]` table of the configuration file,
/// whose keys use the same camelCase names as the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceParams {
    pub serial_number: String,
    pub ruleset_id: String,
    pub certification_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub major_axis: f64,
    pub minor_axis: f64,
    pub orientation: f64,
    pub height: f64,
    pub height_type: String,
    pub vertical_uncertainty: f64,
    /// 0 = unknown, 1 = indoor, 2 = outdoor.
    pub indoor_deployment: u8,
}

/// Inclusive frequency range in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyRange {
    pub low_frequency: u32,
    pub high_frequency: u32,
}

impl FrequencyRange {
    pub fn new(low_frequency: u32, high_frequency: u32) -> Self {
        Self {
            low_frequency,
            high_frequency,
        }
    }
}

/// Top-level inquiry request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequestMessage {
    pub version: String,
    pub available_spectrum_inquiry_requests: Vec<SpectrumInquiryRequest>,
}

/// One spectrum inquiry for one device at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumInquiryRequest {
    pub request_id: String,
    pub device_descriptor: DeviceDescriptor,
    pub location: Location,
    pub inquired_frequency_range: Vec<FrequencyRange>,
    pub inquired_channels: Vec<InquiredChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub serial_number: String,
    pub certification_id: Vec<CertificationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationId {
    pub ruleset_id: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub ellipse: Ellipse,
    pub elevation: Elevation,
    pub indoor_deployment: u8,
}

/// Uncertainty ellipse around the access point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ellipse {
    pub center: Point,
    pub major_axis: f64,
    pub minor_axis: f64,
    pub orientation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elevation {
    pub height: f64,
    pub height_type: String,
    pub vertical_uncertainty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiredChannel {
    pub global_operating_class: u8,
}

/// Top-level inquiry response body.
///
/// Only the fields needed to extract available channels are modelled;
/// everything else the portal sends is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryResponseMessage {
    pub available_spectrum_inquiry_responses: Vec<SpectrumInquiryResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumInquiryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub available_channel_info: Vec<AvailableChannelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableChannelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_operating_class: Option<u8>,
    pub channel_cfi: Vec<Cfi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_eirp: Option<Vec<f64>>,
}
