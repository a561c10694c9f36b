//! Pre-check gate for the webhook: source IP allow-list + HTTP Basic auth.
//!
//! Both checks fail closed.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::net::IpAddr;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// CIDR block, IPv4 or IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    base: IpAddr,
    prefix: u8,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid CIDR '{0}'")]
pub struct InvalidRange(String);

impl FromStr for IpRange {
    type Err = InvalidRange;

    /// Accepts `addr/prefix` or a bare address (full-length prefix).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidRange(s.to_string());
        let (addr, prefix) = match s.trim().split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s.trim(), None),
        };
        let base: IpAddr = addr.parse().map_err(|_| err())?;
        let max = if base.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix {
            Some(p) => p.parse::<u8>().map_err(|_| err())?,
            None => max,
        };
        if prefix > max {
            return Err(err());
        }
        Ok(Self { base, prefix })
    }
}

impl IpRange {
    pub fn contains(&self, ip: IpAddr) -> bool {
        // Dual-stack listeners report IPv4 peers as ::ffff:a.b.c.d
        match (self.base, ip.to_canonical()) {
            (IpAddr::V4(base), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.prefix);
                (u32::from(base) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(base), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.prefix);
                (u128::from(base) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 { 0 } else { !0u32 << (32 - u32::from(prefix)) }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 { 0 } else { !0u128 << (128 - u32::from(prefix)) }
}

pub fn ip_allowed(ranges: &[IpRange], ip: IpAddr) -> bool {
    ranges.iter().any(|r| r.contains(ip))
}

/* ---- Basic auth ---- */

/// Decode `Authorization: Basic <b64(user:pass)>`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// `expected == None` rejects every request.
pub fn authorized(headers: &HeaderMap, expected: Option<(&str, &str)>) -> bool {
    let Some((want_user, want_pass)) = expected else {
        return false;
    };
    let Some((user, pass)) = basic_credentials(headers) else {
        return false;
    };
    let user_ok: bool = user.as_bytes().ct_eq(want_user.as_bytes()).into();
    let pass_ok: bool = pass.as_bytes().ct_eq(want_pass.as_bytes()).into();
    user_ok & pass_ok
}
