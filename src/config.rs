// Runtime configuration. Every value has a default that targets the live
// portal; environment variables (optionally from a `.env` file) override them.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::proxy::ProxyEndpoint;

pub const DEFAULT_PORTAL_URL: &str = "https://portal.ewubd.edu/";
pub const DEFAULT_COURSES_URL: &str = "https://portal.ewubd.edu/api/Advising/GetAllRoutine";
pub const DEFAULT_COURSES_REFERER: &str = "https://portal.ewubd.edu/Home/Advising";
/// Extra cookie the course endpoint refuses to answer without.
pub const DEFAULT_TRACKING_COOKIE: &str = "perf_dv6Tr4n=1";

#[derive(Debug, Clone)]
pub struct Config {
    pub portal_url: String,
    pub courses_url: String,
    pub courses_referer: String,
    pub tracking_cookie: String,
    pub proxy_file: PathBuf,
    pub output_dir: PathBuf,
    /// Per-call timeout without a proxy.
    pub direct_timeout: Duration,
    /// Per-call timeout when routed through a proxy.
    pub proxy_timeout: Duration,
    /// Timeout of a single liveness probe while picking a proxy.
    pub probe_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            portal_url: DEFAULT_PORTAL_URL.into(),
            courses_url: DEFAULT_COURSES_URL.into(),
            courses_referer: DEFAULT_COURSES_REFERER.into(),
            tracking_cookie: DEFAULT_TRACKING_COOKIE.into(),
            proxy_file: PathBuf::from("proxy.txt"),
            output_dir: PathBuf::from("output"),
            direct_timeout: Duration::from_secs(10),
            proxy_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }
}

impl Config {
    /// Build a Config from `EWU_*` environment variables, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads values through `lookup`, which keeps
    /// the parsing testable without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(v) = lookup("EWU_PORTAL_URL") {
            cfg.portal_url = v;
        }
        if let Some(v) = lookup("EWU_COURSES_URL") {
            cfg.courses_url = v;
        }
        if let Some(v) = lookup("EWU_COURSES_REFERER") {
            cfg.courses_referer = v;
        }
        if let Some(v) = lookup("EWU_TRACKING_COOKIE") {
            cfg.tracking_cookie = v;
        }
        if let Some(v) = lookup("EWU_PROXY_FILE") {
            cfg.proxy_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("EWU_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }
        if let Some(secs) = parse_key::<u64, _>(&lookup, "EWU_DIRECT_TIMEOUT_SECS")? {
            cfg.direct_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_key::<u64, _>(&lookup, "EWU_PROXY_TIMEOUT_SECS")? {
            cfg.proxy_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_key::<u64, _>(&lookup, "EWU_PROBE_TIMEOUT_SECS")? {
            cfg.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = parse_key::<bool, _>(&lookup, "EWU_ACCEPT_INVALID_CERTS")? {
            cfg.accept_invalid_certs = flag;
        }

        if cfg.proxy_timeout < cfg.direct_timeout {
            log::warn!(
                "proxy timeout ({:?}) is shorter than direct timeout ({:?})",
                cfg.proxy_timeout,
                cfg.direct_timeout
            );
        }

        Ok(cfg)
    }

    /// Timeout for a regular portal call, depending on whether it goes
    /// through a proxy.
    pub fn timeout_for(&self, proxy: Option<&ProxyEndpoint>) -> Duration {
        match proxy {
            Some(_) => self.proxy_timeout,
            None => self.direct_timeout,
        }
    }
}

fn parse_key<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {raw:?}"))?;
            Ok(Some(value))
        }
    }
}
