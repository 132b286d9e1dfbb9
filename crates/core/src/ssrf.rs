//! Outbound URL safety guard.
//!
//! Indexer and download-client endpoints are user supplied, so every outbound
//! request is preceded by a check that the target is something we are willing
//! to talk to. Loopback and RFC-1918 addresses are allowed on purpose:
//! self-hosted indexers and download clients commonly live on the local
//! network. What is rejected is the link-local space (cloud metadata
//! endpoints included), which a request should never legitimately reach.
//!
//! Known limitation: the hostname is resolved again by the HTTP client when
//! the request is actually issued, so a DNS rebind between this check and the
//! connect is not detected.

use std::net::IpAddr;

use tracing::debug;
use url::{Host, Url};

/// The AWS IPv6 instance metadata address.
const AWS_METADATA_V6: &str = "fd00:ec2::254";

/// Check whether a candidate URL may be contacted.
///
/// Returns `false` for anything that is not parseable http/https, for
/// link-local targets, and for hostnames that fail to resolve. Callers
/// surface a `false` as a configuration error, not a network error.
pub async fn is_safe_url(candidate: &str) -> bool {
    let url = match Url::parse(candidate) {
        Ok(url) => url,
        Err(e) => {
            debug!(url = candidate, error = %e, "Rejecting unparseable URL");
            return false;
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        debug!(url = candidate, scheme = url.scheme(), "Rejecting non-HTTP URL");
        return false;
    }

    match url.host() {
        Some(Host::Ipv4(ip)) => is_safe_addr(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_safe_addr(IpAddr::V6(ip)),
        Some(Host::Domain(domain)) => {
            let port = url.port_or_known_default().unwrap_or(80);
            match tokio::net::lookup_host((domain, port)).await {
                Ok(mut addrs) => match addrs.next() {
                    Some(addr) => is_safe_addr(addr.ip()),
                    None => {
                        debug!(host = domain, "Rejecting host with no addresses");
                        false
                    }
                },
                Err(e) => {
                    debug!(host = domain, error = %e, "Rejecting unresolvable host");
                    false
                }
            }
        }
        None => false,
    }
}

/// Apply the address rules to a single resolved IP.
pub fn is_safe_addr(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => !v4.is_link_local(),
        IpAddr::V6(v6) => {
            // fe80::/10
            if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                return false;
            }
            match AWS_METADATA_V6.parse::<IpAddr>() {
                Ok(IpAddr::V6(meta)) => v6 != meta,
                _ => true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_link_local_ipv4() {
        assert!(!is_safe_url("http://169.254.169.254").await);
        assert!(!is_safe_url("http://169.254.169.254/latest/meta-data").await);
        assert!(!is_safe_url("http://169.254.1.1:8080/api").await);
    }

    #[tokio::test]
    async fn test_rejects_link_local_ipv6() {
        assert!(!is_safe_url("http://[fe80::1]/").await);
        assert!(!is_safe_url("http://[fe80:1234::beef]:9091/rpc").await);
    }

    #[tokio::test]
    async fn test_rejects_aws_metadata_v6() {
        assert!(!is_safe_url("http://[fd00:ec2::254]/latest/meta-data").await);
    }

    #[tokio::test]
    async fn test_accepts_private_and_loopback() {
        assert!(is_safe_url("http://192.168.1.50").await);
        assert!(is_safe_url("http://127.0.0.1").await);
        assert!(is_safe_url("http://10.0.0.7:9117/api").await);
        assert!(is_safe_url("https://172.16.4.2:8080").await);
    }

    #[tokio::test]
    async fn test_rejects_non_http_schemes() {
        assert!(!is_safe_url("ftp://192.168.1.50").await);
        assert!(!is_safe_url("file:///etc/passwd").await);
        assert!(!is_safe_url("magnet:?xt=urn:btih:abc123").await);
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        assert!(!is_safe_url("not a url").await);
        assert!(!is_safe_url("").await);
        assert!(!is_safe_url("http://").await);
    }

    #[test]
    fn test_addr_rules() {
        assert!(!is_safe_addr("169.254.0.1".parse().unwrap()));
        assert!(!is_safe_addr("fe80::1".parse().unwrap()));
        assert!(!is_safe_addr("fd00:ec2::254".parse().unwrap()));
        assert!(is_safe_addr("127.0.0.1".parse().unwrap()));
        assert!(is_safe_addr("192.168.1.50".parse().unwrap()));
        assert!(is_safe_addr("8.8.8.8".parse().unwrap()));
        assert!(is_safe_addr("::1".parse().unwrap()));
        assert!(is_safe_addr("fd00::1".parse().unwrap()));
    }
}
