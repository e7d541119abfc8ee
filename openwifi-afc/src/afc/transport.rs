//! HTTP transport used to talk to the AFC portal.
//!
//! [`PortalTransport`] is the seam between the client state machine and the
//! network. [`HttpsTransport`] is the reqwest-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use serde_json::Value;

use afc_protocol::TransportError;

use crate::afc::session::{collect_cookies, cookie_header, CookieJar};

/// Raw portal reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub body: String,
    /// Cookies set by this response.
    pub cookies: CookieJar,
}

impl PortalResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Request headers as name/value pairs.
pub type Headers = Vec<(String, String)>;

/// Network operations needed for one inquiry cycle.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    /// GET a page.
    async fn get(&self, url: &Url) -> Result<PortalResponse, TransportError>;

    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<PortalResponse, TransportError>;

    /// POST a JSON body.
    async fn post_json(
        &self,
        url: &Url,
        body: &Value,
        headers: &Headers,
    ) -> Result<PortalResponse, TransportError>;
}

/// Maximum number of redirects followed by one request.
const MAX_REDIRECTS: usize = 10;

/// HTTPS transport backed by `reqwest`.
///
/// The login page GET and the inquiry POST follow redirects. The sign-in
/// POST does not, so cookies set on its redirect reply are still observed.
pub struct HttpsTransport {
    /// Never follows redirects.
    client: Client,
    /// Follows up to [`MAX_REDIRECTS`] redirects.
    following: Client,
}

impl HttpsTransport {
    /// Build a transport with the given request timeout.
    ///
    /// Certificate verification is only disabled when `verify_certificates`
    /// is explicitly false.
    pub fn new(timeout: Duration, verify_certificates: bool) -> Result<Self, TransportError> {
        Self::with_builder(Client::builder, timeout, verify_certificates)
    }

    fn with_builder<F>(
        builder: F,
        timeout: Duration,
        verify_certificates: bool,
    ) -> Result<Self, TransportError>
    where
        F: Fn() -> ClientBuilder,
    {
        if !verify_certificates {
            warn!("TLS certificate verification is disabled for the AFC portal");
        }

        let build = |policy: Policy| {
            builder()
                .timeout(timeout)
                .redirect(policy)
                .danger_accept_invalid_certs(!verify_certificates)
                .build()
                .map_err(|e| TransportError::Other(e.to_string()))
        };

        Ok(Self {
            client: build(Policy::none())?,
            following: build(Policy::limited(MAX_REDIRECTS))?,
        })
    }

    async fn read(response: reqwest::Response) -> Result<PortalResponse, TransportError> {
        let status = response.status().as_u16();
        let cookies = collect_cookies(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(PortalResponse {
            status,
            body,
            cookies,
        })
    }
}

/// Build a header map where each name carries exactly one value.
///
/// A later entry replaces an earlier one, and the map replaces any header
/// of the same name already set by `.form()` or `.json()`.
fn header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Other(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Other(format!("invalid value for {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Where a redirect reply points, resolved against the request URL.
fn redirect_target(url: &Url, response: &reqwest::Response) -> Option<Url> {
    let status = response.status();
    if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    url.join(location).ok()
}

#[async_trait]
impl PortalTransport for HttpsTransport {
    /// Follows redirects by hand so cookies set on every hop are kept.
    async fn get(&self, url: &Url) -> Result<PortalResponse, TransportError> {
        let origin = url.origin();
        let mut url = url.clone();
        let mut cookies = CookieJar::new();

        for _ in 0..=MAX_REDIRECTS {
            let mut request = self.client.get(url.clone());
            if !cookies.is_empty() && url.origin() == origin {
                request = request.header(COOKIE, cookie_header(&cookies));
            }
            let response = request.send().await.map_err(map_reqwest_error)?;
            let next = redirect_target(&url, &response);
            let reply = Self::read(response).await?;
            cookies.extend(reply.cookies);

            match next {
                Some(next) => {
                    debug!("Following redirect from {} to {}", url, next);
                    url = next;
                }
                None => {
                    return Ok(PortalResponse {
                        status: reply.status,
                        body: reply.body,
                        cookies,
                    })
                }
            }
        }

        Err(TransportError::Other(format!(
            "more than {} redirects while fetching {}",
            MAX_REDIRECTS, url
        )))
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<PortalResponse, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .form(form)
            .headers(header_map(headers)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read(response).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &Value,
        headers: &Headers,
    ) -> Result<PortalResponse, TransportError> {
        let response = self
            .following
            .post(url.clone())
            .json(body)
            .headers(header_map(headers)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read(response).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    #[test]
    fn test_status_classes() {
        let mut response = PortalResponse {
            status: 200,
            body: String::new(),
            cookies: CookieJar::new(),
        };
        assert!(response.is_success());
        assert!(!response.is_redirect());

        response.status = 302;
        assert!(!response.is_success());
        assert!(response.is_redirect());

        response.status = 401;
        assert!(!response.is_success());
        assert!(!response.is_redirect());
    }

    #[test]
    fn test_build_https_transport() {
        assert!(HttpsTransport::new(Duration::from_secs(5), true).is_ok());
        assert!(HttpsTransport::new(Duration::from_secs(5), false).is_ok());
    }

    #[test]
    fn test_header_map_keeps_one_value_per_name() {
        let headers: Headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
            ("X-Csrf-Token".to_string(), "t".to_string()),
        ];
        let map = header_map(&headers).unwrap();

        assert_eq!(map.get_all("content-type").iter().count(), 1);
        assert_eq!(map["content-type"], "application/json");
        assert_eq!(map["x-csrf-token"], "t");
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let headers: Headers = vec![("bad header".to_string(), "x".to_string())];
        assert!(matches!(header_map(&headers), Err(TransportError::Other(_))));
    }

    fn local_transport(timeout: Duration) -> HttpsTransport {
        HttpsTransport::with_builder(|| Client::builder().no_proxy(), timeout, true).unwrap()
    }

    fn reply(status_line: &str, headers: &[&str], body: &str) -> String {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            status_line,
            body.len()
        );
        for header in headers {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Answer one request per connection with the given replies, in order.
    /// The handle yields the raw requests.
    async fn serve(replies: Vec<String>) -> (Url, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for reply in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            requests
        });

        (base, handle)
    }

    fn count_header(request: &str, name: &str) -> usize {
        request
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .count()
    }

    #[tokio::test]
    async fn test_posts_send_single_content_type() {
        let (base, server) = serve(vec![
            reply("200 OK", &[], ""),
            reply("200 OK", &[], "{}"),
        ])
        .await;
        let transport = local_transport(Duration::from_secs(5));

        let form_headers: Headers = vec![
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("Cookie".to_string(), "session=a".to_string()),
        ];
        transport
            .post_form(&base.join("user/sign-in").unwrap(), &[("username", "u")], &form_headers)
            .await
            .unwrap();

        let json_headers: Headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Csrf-Token".to_string(), "t".to_string()),
        ];
        transport
            .post_json(&base.join("inquiry").unwrap(), &serde_json::json!({"a": 1}), &json_headers)
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert_eq!(count_header(&requests[0], "content-type"), 1);
        assert!(requests[0]
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(requests[0].ends_with("username=u"));
        assert_eq!(count_header(&requests[1], "content-type"), 1);
        assert!(requests[1]
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        assert_eq!(count_header(&requests[1], "x-csrf-token"), 1);
    }

    #[tokio::test]
    async fn test_get_follows_redirect_and_keeps_cookies() {
        let (base, server) = serve(vec![
            reply(
                "302 Found",
                &[
                    "Location: /user/sign-in?next=%2F",
                    "Set-Cookie: session=first; Path=/",
                ],
                "",
            ),
            reply(
                "200 OK",
                &["Set-Cookie: remember=r1"],
                r#"<input id="csrf_token" value="tok">"#,
            ),
        ])
        .await;
        let transport = local_transport(Duration::from_secs(5));

        let response = transport.get(&base.join("user/sign-in").unwrap()).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.contains("tok"));
        assert_eq!(response.cookies.get("session").map(String::as_str), Some("first"));
        assert_eq!(response.cookies.get("remember").map(String::as_str), Some("r1"));

        let requests = server.await.unwrap();
        assert!(requests[1].starts_with("GET /user/sign-in?next=%2F "));
        assert!(requests[1].to_ascii_lowercase().contains("cookie: session=first"));
    }

    #[tokio::test]
    async fn test_sign_in_redirect_not_followed() {
        let (base, server) = serve(vec![reply(
            "302 Found",
            &["Location: /", "Set-Cookie: session=signed-in"],
            "",
        )])
        .await;
        let transport = local_transport(Duration::from_secs(5));

        let response = transport
            .post_form(&base.join("user/sign-in").unwrap(), &[], &Vec::new())
            .await
            .unwrap();

        assert!(response.is_redirect());
        assert_eq!(
            response.cookies.get("session").map(String::as_str),
            Some("signed-in")
        );
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_silent_portal_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        let transport = local_transport(Duration::from_millis(200));

        let result = transport.get(&url).await;

        assert_eq!(result.unwrap_err(), TransportError::Timeout);
    }
}
