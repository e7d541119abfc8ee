//! Authenticated spectrum inquiry client.
//!
//! One inquiry is a three step exchange with the portal:
//!
//! 1. GET the login page and scrape the CSRF token and session cookies
//! 2. POST the sign-in form with the token and cookies
//! 3. POST the inquiry JSON with the merged cookies and the token header
//!
//! The reply of step 3 is kept until the next inquiry so callers can look
//! at its status and body separately.

use log::{debug, error, info, warn};
use reqwest::Url;
use serde_json::Value;

use afc_protocol::{encode_request, AfcError, AuthError, InquiryRequestMessage, ProtocolError};

use crate::afc::session::{cookie_header, extract_csrf_token, CookieJar, SessionCredentials};
use crate::afc::transport::{Headers, PortalResponse, PortalTransport};
use crate::config::{AccountSection, ConnectionSection};

/// Portal endpoints, relative paths resolved against the base URL.
#[derive(Debug, Clone)]
pub struct PortalEndpoints {
    pub base_url: String,
    pub login_path: String,
    pub sign_in_path: String,
    pub method_path: String,
}

impl PortalEndpoints {
    pub fn from_config(connection: &ConnectionSection) -> Self {
        Self {
            base_url: connection.base_url.clone(),
            login_path: connection.login_url.clone(),
            sign_in_path: connection.sign_in_url.clone(),
            method_path: connection.method_url.clone(),
        }
    }

    /// Parse the base URL and require the https scheme.
    fn secure_base(&self) -> Result<Url, ProtocolError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ProtocolError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if base.scheme() != "https" {
            return Err(ProtocolError::InsecureScheme(self.base_url.clone()));
        }
        Ok(base)
    }

    fn join(&self, path: &str) -> Result<Url, ProtocolError> {
        self.secure_base()?
            .join(path)
            .map_err(|e| ProtocolError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

/// Account used to sign in to the portal.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&AccountSection> for Credentials {
    fn from(account: &AccountSection) -> Self {
        Self {
            username: account.username.clone(),
            password: account.password.clone(),
        }
    }
}

/// Reply to the most recent inquiry.
#[derive(Debug, Clone)]
struct InquiryReply {
    status: u16,
    body: String,
}

/// Client for the AFC portal.
pub struct AfcClient<T: PortalTransport> {
    transport: T,
    endpoints: PortalEndpoints,
    credentials: Credentials,
    latest: Option<InquiryReply>,
}

impl<T: PortalTransport> AfcClient<T> {
    pub fn new(transport: T, endpoints: PortalEndpoints, credentials: Credentials) -> Self {
        Self {
            transport,
            endpoints,
            credentials,
            latest: None,
        }
    }

    /// Fetch the login page and return its CSRF token and session cookies.
    pub async fn retrieve_csrf_token(&self) -> Result<SessionCredentials, AfcError> {
        let login_url = self.endpoints.join(&self.endpoints.login_path)?;
        info!("Getting CSRF token from {}", login_url);

        let response = self.transport.get(&login_url).await?;
        if !response.is_success() {
            error!("Failed to get CSRF token, status code: {}", response.status);
            return Err(AuthError::HttpStatus(response.status).into());
        }

        match extract_csrf_token(&response.body) {
            Some(token) => {
                info!("CSRF token retrieved successfully");
                Ok(SessionCredentials::new(token, response.cookies))
            }
            None => {
                error!("CSRF token not found in the response");
                Err(AuthError::TokenNotFound.into())
            }
        }
    }

    /// Sign in with the configured account.
    ///
    /// Returns the cookies set by the sign-in reply. The portal answers a
    /// successful sign-in either directly or with a redirect to `next`.
    pub async fn authenticate(&self, session: &SessionCredentials) -> Result<CookieJar, AfcError> {
        let base = self.endpoints.secure_base()?;
        let sign_in_url = self.endpoints.join(&self.endpoints.sign_in_path)?;

        let form = [
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
            ("csrf_token", session.csrf_token.as_str()),
            ("next", "/"),
            ("reg_next", "/"),
        ];
        let headers: Headers = vec![
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("Origin".to_string(), base.origin().ascii_serialization()),
            ("Referer".to_string(), sign_in_url.to_string()),
            ("Cookie".to_string(), session.cookie_header()),
        ];

        info!("Logging in with username: {}", self.credentials.username);
        let response = self.transport.post_form(&sign_in_url, &form, &headers).await?;

        if !(response.is_success() || response.is_redirect()) {
            error!("Login failed, status code: {}", response.status);
            return Err(AuthError::LoginFailed(response.status).into());
        }

        info!("Login successful");
        Ok(response.cookies)
    }

    /// Run a full inquiry cycle and record the portal's reply.
    ///
    /// A non-success reply to the inquiry itself is recorded, not returned
    /// as an error; check [`latest_status`](Self::latest_status).
    pub async fn submit_inquiry(
        &mut self,
        request: &InquiryRequestMessage,
    ) -> Result<(), AfcError> {
        self.latest = None;

        let base = match self.endpoints.secure_base() {
            Ok(base) => base,
            Err(e) => {
                error!("{}", e);
                return Err(e.into());
            }
        };
        let method_url = self.endpoints.join(&self.endpoints.method_path)?;
        let payload = encode_request(request)?;

        let mut session = self.retrieve_csrf_token().await?;
        let login_cookies = self.authenticate(&session).await?;
        session.merge_cookies(login_cookies);

        let headers: Headers = vec![
            ("host".to_string(), host_header(&base)),
            ("X-Csrf-Token".to_string(), session.csrf_token.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Cookie".to_string(), cookie_header(&session.cookies)),
        ];

        info!("Sending request to {}", method_url);
        let PortalResponse { status, body, .. } =
            self.transport.post_json(&method_url, &payload, &headers).await?;

        if (200..300).contains(&status) {
            info!("Request sent successfully");
        } else {
            error!("Request failed with status code: {}", status);
        }
        self.latest = Some(InquiryReply { status, body });

        Ok(())
    }

    /// Decoded body of the most recent inquiry.
    ///
    /// `None` if no inquiry has completed or its body is not JSON.
    pub fn latest_response(&self) -> Option<Value> {
        let reply = match &self.latest {
            Some(reply) => reply,
            None => {
                error!("No response available");
                return None;
            }
        };

        match serde_json::from_str(&reply.body) {
            Ok(value) => {
                debug!("Getting response JSON");
                Some(value)
            }
            Err(e) => {
                warn!("Inquiry response is not valid JSON: {}", e);
                None
            }
        }
    }

    /// Status code of the most recent inquiry.
    pub fn latest_status(&self) -> Option<u16> {
        self.latest.as_ref().map(|reply| reply.status)
    }

    pub fn endpoints(&self) -> &PortalEndpoints {
        &self.endpoints
    }
}

fn host_header(base: &Url) -> String {
    match (base.host_str(), base.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}
