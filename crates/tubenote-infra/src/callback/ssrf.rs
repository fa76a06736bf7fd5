//! SSRF validation for caller-supplied callback URLs.
//!
//! A callback URL comes from the request body, so it must never be allowed
//! to point the process at internal infrastructure. Hostnames are also
//! resolved and the resolved addresses checked, which closes the obvious
//! DNS-rebinding hole.

use std::net::{IpAddr, Ipv6Addr};

use tokio::net::lookup_host;
use url::Url;

/// Validate a callback URL before delivery. `allow_private_hosts` disables
/// the private-address checks (tests, on-prem receivers).
pub async fn validate_callback_url(raw: &str, allow_private_hosts: bool) -> Result<(), String> {
    let parsed = Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| "URL must have a host".to_string())?
        .to_ascii_lowercase();

    if allow_private_hosts {
        return Ok(());
    }

    if host == "localhost"
        || host.ends_with(".local")
        || host.contains(".internal")
        || host.contains(".corp")
    {
        return Err("internal hostnames are not allowed".to_string());
    }

    if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err("private or internal IP addresses are not allowed".to_string());
        }
    }

    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| "URL has no usable port".to_string())?;
    match lookup_host((host.as_str(), port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_ip(&addr.ip()) {
                    return Err(format!(
                        "hostname resolves to private address {}",
                        addr.ip()
                    ));
                }
            }
        }
        Err(e) => {
            // Unresolvable hosts fail later at connect time; validation only
            // guards against what it can see.
            tracing::warn!(host = %host, error = %e, "could not resolve callback host");
        }
    }

    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_multicast()
                || v4.is_broadcast()
                || octets[0] == 0
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || is_unique_local(v6)
                || is_link_local(v6)
        }
    }
}

fn is_unique_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}
