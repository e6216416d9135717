//! Minimal SIP URI handling.
//!
//! Only the shape the softphone needs: `sip:` or `sips:`, a user part and a
//! host part. Anything after the host (port, `;params`) is kept verbatim.

use crate::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SipScheme {
    Sip,
    Sips,
}

impl SipScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            SipScheme::Sip => "sip",
            SipScheme::Sips => "sips",
        }
    }
}

/// A SIP address of record, e.g. `sip:alice@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SipUri {
    scheme: SipScheme,
    user: String,
    host: String,
}

impl SipUri {
    pub fn scheme(&self) -> SipScheme {
        self.scheme
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.scheme.as_str(), self.user, self.host)
    }
}

impl FromStr for SipUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme, rest) = if let Some(rest) = s.strip_prefix("sips:") {
            (SipScheme::Sips, rest)
        } else if let Some(rest) = s.strip_prefix("sip:") {
            (SipScheme::Sip, rest)
        } else {
            return Err(Error::InvalidUri(format!("{s:?} must start with sip: or sips:")));
        };

        let (user, host) = rest
            .split_once('@')
            .ok_or_else(|| Error::InvalidUri(format!("{s:?} has no user part")))?;

        if user.is_empty() {
            return Err(Error::InvalidUri(format!("{s:?} has an empty user part")));
        }
        if host.is_empty() || host.contains('@') {
            return Err(Error::InvalidUri(format!("{s:?} has an invalid host part")));
        }

        Ok(Self {
            scheme,
            user: user.to_string(),
            host: host.to_string(),
        })
    }
}
