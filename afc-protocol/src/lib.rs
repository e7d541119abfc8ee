//! Spectrum inquiry protocol definitions for the openwifi AFC client.
//!
//! This crate defines the JSON messages exchanged with an AFC portal,
//! the codec that builds requests and normalizes responses, and the
//! static channel tables used to turn granted 6GHz channels into a
//! channel the access point can run on.
//!
//! # Example
//!
//! ```rust
//! use afc_protocol::{
//!     build_request, map_to_band_channel, parse_response, select_best, DeviceParams,
//! };
//! use serde_json::json;
//!
//! let device = DeviceParams {
//!     serial_number: "SN-0001".to_string(),
//!     ruleset_id: "US_47_CFR_PART_15_SUBPART_E".to_string(),
//!     certification_id: "FCCID-OPENWIFI".to_string(),
//!     latitude: 50.8,
//!     longitude: 4.4,
//!     major_axis: 100.0,
//!     minor_axis: 50.0,
//!     orientation: 45.0,
//!     height: 10.0,
//!     height_type: "AGL".to_string(),
//!     vertical_uncertainty: 5.0,
//!     indoor_deployment: 1,
//! };
//! let request = build_request(&[], &[131], &device);
//! assert_eq!(request.available_spectrum_inquiry_requests[0].request_id, "0");
//!
//! let response = json!({
//!     "availableSpectrumInquiryResponses": [
//!         { "availableChannelInfo": [ { "channelCfi": [9, 5, 5] } ] }
//!     ]
//! });
//! let channels = parse_response(&response).unwrap();
//! assert_eq!(channels, vec![5, 9]);
//!
//! let best = select_best(&channels).unwrap();
//! assert_eq!(map_to_band_channel(best), Some(40));
//! ```

pub mod channel;
pub mod codec;
pub mod error;
pub mod types;

pub use channel::{
    map_to_band_channel, select_best, LowestChannel, LowestMappable, SelectionPolicy, CFI_6G,
    CFI_TO_5G, LEGACY_FALLBACK_CHANNEL, VALID_2G_CHANNELS, VALID_5G_CHANNELS,
};
pub use codec::{build_request, encode_request, parse_optional_response, parse_response};
pub use error::{AfcError, AuthError, ProtocolError, Result, TransportError};
pub use types::{
    Cfi, DeviceParams, FrequencyRange, InquiryRequestMessage, InquiryResponseMessage,
    SpectrumInquiryRequest, DEFAULT_CHANNEL_CLASSES, PROTOCOL_VERSION, SINGLE_REQUEST_ID,
};
