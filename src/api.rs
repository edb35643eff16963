// HTTP transport: a small blocking client that talks to the portal. The
// protocol modules (`auth`, `courses`, `proxy`) only see the `Transport`
// trait, so they can be exercised in tests with a scripted implementation.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Proxy};
use std::time::Duration;

use crate::error::TransportError;
use crate::proxy::ProxyEndpoint;

pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const LEGACY_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko";
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 26_0_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/141.0.7390.41 Mobile/15E148 Safari/604.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    /// POST with an `application/x-www-form-urlencoded` body.
    PostForm,
}

/// One outbound call, fully described: where, how, through which proxy and
/// for how long the caller is willing to block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    pub method: RequestMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub proxy: Option<ProxyEndpoint>,
    pub timeout: Duration,
}

impl PortalRequest {
    pub fn get(url: &str, timeout: Duration) -> Self {
        PortalRequest {
            method: RequestMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            form: Vec::new(),
            proxy: None,
            timeout,
        }
    }

    pub fn post_form(url: &str, timeout: Duration) -> Self {
        PortalRequest {
            method: RequestMethod::PostForm,
            ..PortalRequest::get(url, timeout)
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.form.push((name.to_string(), value.to_string()));
        self
    }

    pub fn via(mut self, proxy: Option<&ProxyEndpoint>) -> Self {
        self.proxy = proxy.cloned();
        self
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back: status, body text and any cookies set by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub body: String,
    pub cookies: Vec<(String, String)>,
}

impl PortalResponse {
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Anything able to perform a `PortalRequest` synchronously.
pub trait Transport {
    fn send(&self, request: &PortalRequest) -> Result<PortalResponse, TransportError>;
}

/// `Transport` backed by `reqwest::blocking`. A client is built for every
/// call because proxy and timeout vary between calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    accept_invalid_certs: bool,
}

impl HttpTransport {
    pub fn new(accept_invalid_certs: bool) -> Self {
        HttpTransport {
            accept_invalid_certs,
        }
    }

    fn client_for(&self, request: &PortalRequest) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .timeout(request.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(proxy) = &request.proxy {
            builder = builder.proxy(Proxy::all(proxy.url())?);
        }
        Ok(builder.build()?)
    }

    fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError(format!("invalid header value for {name}: {e}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &PortalRequest) -> Result<PortalResponse, TransportError> {
        let client = self.client_for(request)?;
        let method = match request.method {
            RequestMethod::Get => Method::GET,
            RequestMethod::PostForm => Method::POST,
        };

        let mut builder = client
            .request(method, &request.url)
            .headers(Self::header_map(&request.headers)?);
        if request.method == RequestMethod::PostForm {
            builder = builder.form(&request.form);
        }

        log::debug!(
            "{:?} {} (proxy: {}, timeout: {:?})",
            request.method,
            request.url,
            request.proxy.as_ref().map(|p| p.as_str()).unwrap_or("none"),
            request.timeout
        );

        let res = builder.send()?;
        let status = res.status().as_u16();
        let cookies = res
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = res.text()?;

        log::debug!("{} answered HTTP {}", request.url, status);
        Ok(PortalResponse {
            status,
            body,
            cookies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let proxy: ProxyEndpoint = "10.0.0.1:3128".parse().unwrap();
        let req = PortalRequest::post_form("https://portal.example/", Duration::from_secs(3))
            .header("Cookie", "a=b")
            .field("Username", "2021-1-60-001")
            .via(Some(&proxy));

        assert_eq!(req.method, RequestMethod::PostForm);
        assert_eq!(req.header_value("cookie"), Some("a=b"));
        assert_eq!(req.form, vec![("Username".into(), "2021-1-60-001".into())]);
        assert_eq!(req.proxy, Some(proxy));
    }

    #[test]
    fn test_response_cookie_lookup() {
        let res = PortalResponse {
            status: 200,
            body: String::new(),
            cookies: vec![
                ("other".into(), "x".into()),
                ("ASP.NET_SessionId".into(), "abc123".into()),
            ],
        };
        assert_eq!(res.cookie("ASP.NET_SessionId"), Some("abc123"));
        assert_eq!(res.cookie("missing"), None);
    }

    #[test]
    fn test_header_map_rejects_bad_name() {
        let headers = vec![("bad header".to_string(), "v".to_string())];
        assert!(HttpTransport::header_map(&headers).is_err());
    }
}
