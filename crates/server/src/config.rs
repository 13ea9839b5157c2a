// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading and validation. The on-disk format is TOML
//! (the reference implementation's YAML is an immaterial choice of
//! serialization; `Config`'s shape follows §6 of the protocol spec
//! verbatim, plus the `[notify]` section and `resources.cross_user_removal`
//! flag this workspace adds to resolve the two open design questions).

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

const MIN_PROTOCOL_VERSION: u8 = 2;
const MAX_PROTOCOL_VERSION: u8 = 3;
const DEFAULT_COALESCE_WINDOW_MS: u64 = 250;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub domains: Vec<DomainConfig>,
    pub resources: ResourcesConfig,
    pub log: LogConfig,
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            domains: Vec::new(),
            resources: ResourcesConfig::default(),
            log: LogConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source: Box::new(source),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for domain in &self.domains {
            domain.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: Option<String>,
    #[serde(alias = "addrs")]
    pub sockets: Vec<SocketConfig>,
    pub idle: IdlePolicy,
    pub protocol_version: ProtocolVersionRange,
}

impl Default for DomainConfig {
    fn default() -> Self {
        DomainConfig {
            name: None,
            sockets: Vec::new(),
            idle: IdlePolicy::default(),
            protocol_version: ProtocolVersionRange::default(),
        }
    }
}

impl DomainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sockets.is_empty() {
            return Err(ConfigError::NoSockets(
                self.name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
            ));
        }
        self.idle.validate()?;
        self.protocol_version.validate()?;
        for socket in &self.sockets {
            socket.addr.parse::<ListenAddr>().map_err(ConfigError::BadListenAddr)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    pub addr: String,
    #[serde(default)]
    pub tls: Option<TlsOverrides>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsOverrides {
    pub cert: Option<String>,
    pub key: Option<String>,
    /// Trusted CA bundle ("tc" in the reference implementation).
    pub tc: Option<String>,
    /// Certificate revocation list.
    pub crl: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IdlePolicy {
    pub min: u64,
    pub max: u64,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        IdlePolicy { min: 4, max: 30 }
    }
}

impl IdlePolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min < 1 {
            return Err(ConfigError::IdleMinTooSmall(self.min));
        }
        if self.min > self.max {
            return Err(ConfigError::IdleRangeInverted { min: self.min, max: self.max });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ProtocolVersionRange {
    pub min: u8,
    pub max: u8,
}

impl Default for ProtocolVersionRange {
    fn default() -> Self {
        ProtocolVersionRange { min: MIN_PROTOCOL_VERSION, max: MAX_PROTOCOL_VERSION }
    }
}

impl ProtocolVersionRange {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::ProtocolVersionRangeInverted { min: self.min, max: self.max });
        }
        if self.min < MIN_PROTOCOL_VERSION || self.max > MAX_PROTOCOL_VERSION {
            return Err(ConfigError::ProtocolVersionOutOfBounds { min: self.min, max: self.max });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub total: ResourceCaps,
    pub user: ResourceCaps,
    /// Resolves the reference implementation's unspecified non-owner
    /// `unpublish` policy (open question in the design notes): `false`
    /// requires the caller's user identity to match the owner's.
    pub cross_user_removal: bool,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        ResourcesConfig {
            total: ResourceCaps::default(),
            user: ResourceCaps::default(),
            cross_user_removal: false,
        }
    }
}

/// `None` means no limit, matching "absence = no limit" in §6.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ResourceCaps {
    pub clients: Option<u64>,
    pub services: Option<u64>,
    pub subscriptions: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub console: bool,
    pub syslog: bool,
    pub syslog_socket: Option<String>,
    pub facility: Option<String>,
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { console: true, syslog: false, syslog_socket: None, facility: None, filter: None }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub coalesce_window_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig { coalesce_window_ms: DEFAULT_COALESCE_WINDOW_MS }
    }
}

/// A parsed `<scheme>:<address>` listener endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Unix(String),
    Tcp(String),
    Tls(String),
    /// Plain TCP that upgrades to TLS iff the peer's first bytes look
    /// like a TLS `ClientHello`.
    AutoTls(String),
}

impl std::str::FromStr for ListenAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("ux:") {
            return Ok(ListenAddr::Unix(rest.to_string()));
        }
        if let Some(rest) = s.strip_prefix("utls:") {
            return Ok(ListenAddr::AutoTls(rest.to_string()));
        }
        if let Some(rest) = s.strip_prefix("tls:") {
            return Ok(ListenAddr::Tls(rest.to_string()));
        }
        if let Some(rest) = s.strip_prefix("tcp:") {
            return Ok(ListenAddr::Tcp(rest.to_string()));
        }
        Err(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_schemes() {
        assert_eq!("ux:/tmp/pathfinder.sock".parse(), Ok(ListenAddr::Unix("/tmp/pathfinder.sock".into())));
        assert_eq!("tcp:0.0.0.0:4321".parse(), Ok(ListenAddr::Tcp("0.0.0.0:4321".into())));
        assert_eq!("tls:0.0.0.0:4322".parse(), Ok(ListenAddr::Tls("0.0.0.0:4322".into())));
        assert_eq!("utls:0.0.0.0:4323".parse(), Ok(ListenAddr::AutoTls("0.0.0.0:4323".into())));
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!("ftp:example.com".parse::<ListenAddr>().is_err());
    }

    #[test]
    fn idle_policy_rejects_inverted_range() {
        let policy = IdlePolicy { min: 30, max: 4 };
        assert!(matches!(policy.validate(), Err(ConfigError::IdleRangeInverted { .. })));
    }

    #[test]
    fn protocol_version_rejects_out_of_bounds() {
        let range = ProtocolVersionRange { min: 1, max: 3 };
        assert!(matches!(range.validate(), Err(ConfigError::ProtocolVersionOutOfBounds { .. })));
    }

    #[test]
    fn domain_requires_at_least_one_socket() {
        let domain = DomainConfig { name: Some("d".into()), ..Default::default() };
        assert!(matches!(domain.validate(), Err(ConfigError::NoSockets(_))));
    }
}
