//! Guards outbound fetches against internal and reserved addresses.
//!
//! Callers hand us arbitrary URLs, so before a page is fetched the scheme
//! must be http(s) and every address the host resolves to must be public.

use std::net::IpAddr;
use tokio::net::lookup_host;
use url::{Host, Url};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked scheme: {0}")]
    BlockedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

/// Loopback, RFC 1918, link-local, multicast, broadcast, unspecified,
/// 0.0.0.0/8 and IPv6 unique-local addresses.
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) {
        Err(SsrfError::BlockedIp(ip))
    } else {
        Ok(())
    }
}

/// Rejects non-http(s) URLs and hosts that are, or resolve to, private addresses.
pub async fn check_url(url: &Url) -> Result<(), SsrfError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SsrfError::BlockedScheme(url.scheme().to_string()));
    }

    let port = url.port_or_known_default().unwrap_or(80);
    match url.host().ok_or(SsrfError::MissingHost)? {
        Host::Ipv4(v4) => validate_ip(IpAddr::V4(v4)),
        Host::Ipv6(v6) => validate_ip(IpAddr::V6(v6)),
        Host::Domain(domain) => {
            let addrs = lookup_host((domain, port))
                .await
                .map_err(|e| SsrfError::DnsError(e.to_string()))?;
            for addr in addrs {
                validate_ip(addr.ip())?;
            }
            Ok(())
        }
    }
}
