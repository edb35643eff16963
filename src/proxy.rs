// Proxy list handling and live-proxy selection.
//
// Candidates come from a plain text file, one `host:port` per line. The
// selector probes them in file order and stops at the first one that
// reaches the portal.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::api::{PortalRequest, Transport, DESKTOP_USER_AGENT};
use crate::config::Config;
use crate::error::ProxyListError;

/// A proxy address in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint(String);

impl ProxyEndpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The proxy URL handed to the HTTP client. Every proxy is treated as a
    /// plain HTTP proxy for both schemes.
    pub fn url(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returned when a line is not exactly `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid proxy format: {0}")]
pub struct InvalidProxy(pub String);

impl FromStr for ProxyEndpoint {
    type Err = InvalidProxy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), None) if !host.is_empty() && !port.is_empty() => {
                Ok(ProxyEndpoint(s.to_string()))
            }
            _ => Err(InvalidProxy(s.to_string())),
        }
    }
}

/// Result of reading a proxy list: the usable entries in file order and
/// the lines that were skipped as malformed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProxyList {
    pub candidates: Vec<ProxyEndpoint>,
    pub rejected: Vec<String>,
}

/// Parse the contents of a proxy file. Blank lines and `#` comments are
/// ignored; anything else that is not `host:port` lands in `rejected`.
pub fn parse_proxy_list(text: &str) -> ProxyList {
    let mut list = ProxyList::default();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<ProxyEndpoint>() {
            Ok(endpoint) => list.candidates.push(endpoint),
            Err(InvalidProxy(raw)) => {
                log::warn!("skipping malformed proxy entry {raw:?}");
                list.rejected.push(raw);
            }
        }
    }
    list
}

/// Read and parse the proxy file at `path`.
pub fn read_proxy_file(path: &Path) -> Result<ProxyList, ProxyListError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_proxy_list(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ProxyListError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(ProxyListError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reported to the observer after every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport<'a> {
    /// 1-based position in the candidate list.
    pub index: usize,
    pub total: usize,
    pub endpoint: &'a ProxyEndpoint,
    pub live: bool,
}

/// One bounded GET against the portal through `proxy`. Any failure,
/// including a non-200 answer, counts as "not live".
pub fn probe<T: Transport>(transport: &T, config: &Config, proxy: &ProxyEndpoint) -> bool {
    let request = PortalRequest::get(&config.portal_url, config.probe_timeout)
        .header("User-Agent", DESKTOP_USER_AGENT)
        .via(Some(proxy));
    match transport.send(&request) {
        Ok(res) if res.status == 200 => true,
        Ok(res) => {
            log::info!("proxy {proxy} answered HTTP {}", res.status);
            false
        }
        Err(e) => {
            log::info!("proxy {proxy} failed: {e}");
            false
        }
    }
}

/// Return the first candidate whose probe succeeds. Candidates after it are
/// never contacted. `None` means the caller should connect directly.
pub fn select_live_proxy<T, F>(
    transport: &T,
    config: &Config,
    candidates: &[ProxyEndpoint],
    mut observer: F,
) -> Option<ProxyEndpoint>
where
    T: Transport,
    F: FnMut(&ProbeReport<'_>),
{
    let total = candidates.len();
    for (i, endpoint) in candidates.iter().enumerate() {
        let live = probe(transport, config, endpoint);
        observer(&ProbeReport {
            index: i + 1,
            total,
            endpoint,
            live,
        });
        if live {
            log::info!("selected proxy {endpoint}");
            return Some(endpoint.clone());
        }
    }
    log::info!("no live proxy among {total} candidates");
    None
}
