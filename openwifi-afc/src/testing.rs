//! Test doubles: a scripted AFC portal and a recording access point.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::{json, Value};

use afc_protocol::{Cfi, DeviceParams, TransportError};

use crate::afc::session::{collect_cookies, CookieJar};
use crate::afc::transport::{Headers, PortalResponse, PortalTransport};
use crate::afc::{AfcClient, Credentials, PortalEndpoints};
use crate::ap::{ApController, ApError};
use crate::coordinator::{Coordinator, InquiryParams};

pub fn test_device() -> DeviceParams {
    DeviceParams {
        serial_number: "SN-0001".to_string(),
        ruleset_id: "US_47_CFR_PART_15_SUBPART_E".to_string(),
        certification_id: "FCCID-OPENWIFI".to_string(),
        latitude: 50.8125,
        longitude: 4.3818,
        major_axis: 100.0,
        minor_axis: 50.0,
        orientation: 45.0,
        height: 10.0,
        height_type: "AGL".to_string(),
        vertical_uncertainty: 5.0,
        indoor_deployment: 1,
    }
}

const LOGIN_PAGE: &str =
    r#"<form><input id="csrf_token" name="csrf_token" type="hidden" value="test-token"></form>"#;

/// Canned portal replies.
#[derive(Debug, Clone)]
pub struct PortalScript {
    pub login_page_status: u16,
    pub login_page: String,
    pub login_page_cookies: CookieJar,
    pub sign_in_status: u16,
    pub sign_in_cookies: CookieJar,
    pub inquiry_status: u16,
    pub inquiry_body: String,
    /// Every request fails with this error.
    pub failure: Option<TransportError>,
}

impl PortalScript {
    /// A portal that refuses connections.
    pub fn unreachable() -> Self {
        Self {
            failure: Some(TransportError::Connect("connection refused".to_string())),
            ..Self::granting(&[])
        }
    }

    /// A healthy portal granting `cfis` in a single channel info block.
    pub fn granting(cfis: &[Cfi]) -> Self {
        let body = json!({
            "version": "1.4",
            "availableSpectrumInquiryResponses": [
                {
                    "requestId": "0",
                    "availableChannelInfo": [
                        { "globalOperatingClass": 131, "channelCfi": cfis }
                    ]
                }
            ]
        });

        Self {
            login_page_status: 200,
            login_page: LOGIN_PAGE.to_string(),
            login_page_cookies: collect_cookies(["session=anonymous; Path=/"]),
            sign_in_status: 200,
            sign_in_cookies: collect_cookies(["session=signed-in; HttpOnly", "remember_token=r1"]),
            inquiry_status: 200,
            inquiry_body: body.to_string(),
            failure: None,
        }
    }
}

/// One request seen by the scripted portal.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub headers: Headers,
    pub form: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Portal fake. Clones share the script and the call log.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<PortalScript>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedTransport {
    pub fn new(script: PortalScript) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of inquiry POSTs received.
    pub fn inquiry_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == "POST_JSON")
            .count()
    }

    /// Channel classes of every inquiry, in arrival order.
    pub fn inquired_classes(&self) -> Vec<Vec<u64>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.json.as_ref())
            .map(|body| {
                body["availableSpectrumInquiryRequests"][0]["inquiredChannels"]
                    .as_array()
                    .map(|channels| {
                        channels
                            .iter()
                            .filter_map(|c| c["globalOperatingClass"].as_u64())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn set_script(&self, script: PortalScript) {
        *self.script.lock() = script;
    }

    fn record(&self, call: RecordedCall) -> Result<PortalScript, TransportError> {
        self.calls.lock().push(call);
        let script = self.script.lock().clone();
        if let Some(error) = script.failure.clone() {
            return Err(error);
        }
        Ok(script)
    }
}

#[async_trait]
impl PortalTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<PortalResponse, TransportError> {
        let script = self.record(RecordedCall {
            method: "GET",
            url: url.to_string(),
            headers: Vec::new(),
            form: Vec::new(),
            json: None,
        })?;

        Ok(PortalResponse {
            status: script.login_page_status,
            body: script.login_page,
            cookies: script.login_page_cookies,
        })
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<PortalResponse, TransportError> {
        let script = self.record(RecordedCall {
            method: "POST_FORM",
            url: url.to_string(),
            headers: headers.clone(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            json: None,
        })?;

        Ok(PortalResponse {
            status: script.sign_in_status,
            body: String::new(),
            cookies: script.sign_in_cookies,
        })
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &Value,
        headers: &Headers,
    ) -> Result<PortalResponse, TransportError> {
        let script = self.record(RecordedCall {
            method: "POST_JSON",
            url: url.to_string(),
            headers: headers.clone(),
            form: Vec::new(),
            json: Some(body.clone()),
        })?;

        Ok(PortalResponse {
            status: script.inquiry_status,
            body: script.inquiry_body,
            cookies: CookieJar::new(),
        })
    }
}

/// What the recording controller was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApAction {
    Apply(u8),
    Fallback,
}

/// Access point fake that records every call.
#[derive(Clone, Default)]
pub struct RecordingController {
    actions: Arc<Mutex<Vec<ApAction>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl RecordingController {
    pub fn actions(&self) -> Vec<ApAction> {
        self.actions.lock().clone()
    }

    /// Make the next call fail after recording it.
    pub fn fail_next(&self) {
        *self.fail_next.lock() = true;
    }

    fn record(&self, action: ApAction) -> Result<(), ApError> {
        self.actions.lock().push(action);
        let mut fail = self.fail_next.lock();
        if *fail {
            *fail = false;
            return Err(ApError::RestartFailed("scripted failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ApController for RecordingController {
    async fn apply_channel(&self, channel: u8) -> Result<(), ApError> {
        self.record(ApAction::Apply(channel))
    }

    async fn fallback_to_legacy_band(&self) -> Result<(), ApError> {
        self.record(ApAction::Fallback)
    }
}

pub fn test_endpoints() -> PortalEndpoints {
    PortalEndpoints {
        base_url: "https://afc.example.org/".to_string(),
        login_path: "user/sign-in".to_string(),
        sign_in_path: "user/sign-in".to_string(),
        method_path: "fbrat/ap-afc/availableSpectrumInquirySec".to_string(),
    }
}

/// A coordinator wired to a scripted portal and a recording AP.
pub fn coordinator(
    script: PortalScript,
) -> (
    Coordinator<ScriptedTransport>,
    ScriptedTransport,
    RecordingController,
) {
    let transport = ScriptedTransport::new(script);
    let ap = RecordingController::default();
    let client = AfcClient::new(
        transport.clone(),
        test_endpoints(),
        Credentials {
            username: "ap-operator".to_string(),
            password: "hunter2".to_string(),
        },
    );
    let params = InquiryParams {
        device: test_device(),
        channel_classes: vec![131],
        frequency_ranges: Vec::new(),
    };
    let coordinator = Coordinator::new(client, Arc::new(ap.clone()), params);
    (coordinator, transport, ap)
}
