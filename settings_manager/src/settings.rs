//! The typed settings document and its defaults.

use phone_core::{Error, SipUri};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fallback SIP domain used when an identity URI has to be synthesized.
pub const DEFAULT_SIP_DOMAIN: &str = "tryit.jssip.net";

/// Default signaling WebSocket.
pub const DEFAULT_SOCKET_URI: &str = "wss://tryit.jssip.net:10443";

const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

const ICE_URL_SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];

/// Full softphone configuration: identity, transport and feature flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Name shown to the remote party
    pub display_name: Option<String>,

    /// SIP address of record
    pub uri: Option<String>,

    pub password: Option<String>,

    /// Signaling transport
    pub socket: SocketSettings,

    pub registrar_server: Option<String>,

    pub contact_uri: Option<String>,

    pub authorization_user: Option<String>,

    /// `+sip.instance` identifier for GRUU/outbound
    pub instance_id: Option<Uuid>,

    pub session_timers: bool,

    pub use_preloaded_route: bool,

    /// Peer connection configuration handed to the media stack
    pub pc_config: PeerConnectionConfig,

    /// Call quality reporting
    pub callstats: CallstatsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketSettings {
    /// `ws://` or `wss://` URI of the SIP WebSocket server
    pub uri: String,
    pub via_transport: ViaTransport,
}

/// Transport advertised in the Via header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViaTransport {
    Auto,
    Ws,
    Wss,
    Tcp,
    Udp,
    Tls,
}

impl ViaTransport {
    pub const ALL: [ViaTransport; 6] = [
        ViaTransport::Auto,
        ViaTransport::Ws,
        ViaTransport::Wss,
        ViaTransport::Tcp,
        ViaTransport::Udp,
        ViaTransport::Tls,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViaTransport::Auto => "auto",
            ViaTransport::Ws => "ws",
            ViaTransport::Wss => "wss",
            ViaTransport::Tcp => "tcp",
            ViaTransport::Udp => "udp",
            ViaTransport::Tls => "tls",
        }
    }
}

impl fmt::Display for ViaTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViaTransport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("Unknown via transport: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConnectionConfig {
    pub rtcp_mux_policy: RtcpMuxPolicy,
    /// Tried in order
    pub ice_servers: Vec<IceServer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtcpMuxPolicy {
    Negotiate,
    Require,
}

impl RtcpMuxPolicy {
    pub const ALL: [RtcpMuxPolicy; 2] = [RtcpMuxPolicy::Negotiate, RtcpMuxPolicy::Require];

    pub fn as_str(self) -> &'static str {
        match self {
            RtcpMuxPolicy::Negotiate => "negotiate",
            RtcpMuxPolicy::Require => "require",
        }
    }
}

impl fmt::Display for RtcpMuxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RtcpMuxPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("Unknown RTCP mux policy: {}", s)))
    }
}

/// One STUN/TURN server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallstatsSettings {
    pub enabled: bool,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_name: None,
            uri: None,
            password: None,
            socket: SocketSettings {
                uri: DEFAULT_SOCKET_URI.to_string(),
                via_transport: ViaTransport::Auto,
            },
            registrar_server: None,
            contact_uri: None,
            authorization_user: None,
            instance_id: None,
            session_timers: false,
            use_preloaded_route: false,
            pc_config: PeerConnectionConfig {
                rtcp_mux_policy: RtcpMuxPolicy::Negotiate,
                ice_servers: vec![IceServer::new([DEFAULT_STUN_SERVER])],
            },
            callstats: CallstatsSettings {
                enabled: false,
                app_id: None,
                app_secret: None,
            },
        }
    }
}

impl Settings {
    /// True when an identity URI is configured. An empty string counts as unset.
    pub fn has_uri(&self) -> bool {
        self.uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }

    /// Check the fields the signaling stack cannot cope with.
    pub fn validate(&self) -> Result<(), Error> {
        validate_socket_uri(&self.socket.uri).map_err(Error::Config)?;

        if let Some(uri) = self.uri.as_deref().filter(|uri| !uri.is_empty()) {
            uri.parse::<SipUri>()
                .map_err(|e| Error::Config(format!("uri: {}", e)))?;
        }

        for (index, server) in self.pc_config.ice_servers.iter().enumerate() {
            if server.urls.is_empty() {
                return Err(Error::Config(format!("ice server #{} has no urls", index)));
            }
            for url in &server.urls {
                validate_ice_url(url)
                    .map_err(|e| Error::Config(format!("ice server #{}: {}", index, e)))?;
            }
        }

        Ok(())
    }
}

/// Signaling must go over a WebSocket.
pub fn validate_socket_uri(uri: &str) -> Result<(), String> {
    let host = uri
        .strip_prefix("wss://")
        .or_else(|| uri.strip_prefix("ws://"))
        .ok_or_else(|| format!("socket uri {:?} must use ws:// or wss://", uri))?;
    if host.is_empty() {
        return Err(format!("socket uri {:?} has no host", uri));
    }
    Ok(())
}

pub fn validate_ice_url(url: &str) -> Result<(), String> {
    match ICE_URL_SCHEMES
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme))
    {
        Some(rest) if !rest.is_empty() => Ok(()),
        Some(_) => Err(format!("ice url {:?} has no host", url)),
        None => Err(format!(
            "ice url {:?} must use one of {}",
            url,
            ICE_URL_SCHEMES.join(" ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.display_name, None);
        assert_eq!(settings.uri, None);
        assert_eq!(settings.socket.uri, DEFAULT_SOCKET_URI);
        assert_eq!(settings.socket.via_transport, ViaTransport::Auto);
        assert!(!settings.session_timers);
        assert_eq!(settings.pc_config.rtcp_mux_policy, RtcpMuxPolicy::Negotiate);
        assert_eq!(
            settings.pc_config.ice_servers[0].urls,
            vec!["stun:stun.l.google.com:19302".to_string()]
        );
        assert!(!settings.callstats.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn serializes_absent_fields_as_null() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value["uri"].is_null());
        assert!(value["callstats"]["app_id"].is_null());
        assert_eq!(value["socket"]["via_transport"], "auto");
        assert_eq!(value["pc_config"]["rtcp_mux_policy"], "negotiate");
        // credentials are only written when present
        assert!(value["pc_config"]["ice_servers"][0].get("username").is_none());
    }

    #[test]
    fn empty_uri_counts_as_unset() {
        let mut settings = Settings::default();
        assert!(!settings.has_uri());
        settings.uri = Some(String::new());
        assert!(!settings.has_uri());
        assert!(settings.validate().is_ok());
        settings.uri = Some("sip:alice@example.com".to_string());
        assert!(settings.has_uri());
    }

    #[test]
    fn rejects_non_websocket_transport() {
        let mut settings = Settings::default();
        settings.socket.uri = "https://tryit.jssip.net".to_string();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
        settings.socket.uri = "ws://".to_string();
        assert!(settings.validate().is_err());
        settings.socket.uri = "ws://10.0.0.1:5066".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_bad_identity_uri() {
        let mut settings = Settings::default();
        settings.uri = Some("alice@example.com".to_string());
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("uri"));
    }

    #[test]
    fn rejects_bad_ice_servers() {
        let mut settings = Settings::default();
        settings.pc_config.ice_servers = vec![IceServer::new(Vec::<String>::new())];
        assert!(settings.validate().is_err());

        settings.pc_config.ice_servers = vec![IceServer::new(["http://stun.example.com"])];
        assert!(settings.validate().is_err());

        settings.pc_config.ice_servers = vec![IceServer::new([
            "turn:turn.example.com:3478",
            "turns:turn.example.com:5349",
        ])];
        assert!(settings.validate().is_ok());

        settings.pc_config.ice_servers.clear();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parse_enums() {
        assert_eq!("WSS".parse::<ViaTransport>().unwrap(), ViaTransport::Wss);
        assert!("sctp".parse::<ViaTransport>().is_err());
        assert_eq!(
            "require".parse::<RtcpMuxPolicy>().unwrap(),
            RtcpMuxPolicy::Require
        );
    }
}
