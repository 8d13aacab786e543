use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use wifidice::HistoryPolicy;

const LISTEN_ENV: &str = "WIFIDICE_LISTEN";
const HISTORY_ENV: &str = "WIFIDICE_HISTORY";
const ERROR_REPLIES_ENV: &str = "WIFIDICE_ERROR_REPLIES";
const CHANNEL_CAPACITY_ENV: &str = "WIFIDICE_CHANNEL_CAPACITY";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid `{name}` environment variable {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen: SocketAddr,
    pub history: HistoryPolicy,
    /// Send an explicit error frame to a client whose frame was rejected.
    pub error_replies: bool,
    /// Outbound frames queued per client before broadcasts to it are dropped.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, wifidice::PORT).into(),
            history: HistoryPolicy::Contiguous,
            error_replies: false,
            channel_capacity: 32,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(value) = lookup(LISTEN_ENV) {
            config.listen = value.parse().map_err(|_| invalid(LISTEN_ENV, &value))?;
        }
        if let Some(value) = lookup(HISTORY_ENV) {
            config.history = match value.to_lowercase().as_str() {
                "contiguous" => HistoryPolicy::Contiguous,
                "legacy" => HistoryPolicy::Legacy,
                _ => return Err(invalid(HISTORY_ENV, &value)),
            };
        }
        if let Some(value) = lookup(ERROR_REPLIES_ENV) {
            config.error_replies = match value.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(invalid(ERROR_REPLIES_ENV, &value)),
            };
        }
        if let Some(value) = lookup(CHANNEL_CAPACITY_ENV) {
            config.channel_capacity = value
                .parse()
                .ok()
                .filter(|&capacity| capacity > 0)
                .ok_or_else(|| invalid(CHANNEL_CAPACITY_ENV, &value))?;
        }
        Ok(config)
    }
}

fn invalid(name: &'static str, value: &str) -> Error {
    Error::Invalid {
        name,
        value: value.to_string(),
    }
}
