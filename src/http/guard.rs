//! SSRF guard for outbound test requests.
//!
//! Every request a suite issues is addressed by a relative path. The guard
//! joins that path onto a trusted origin and refuses anything that could
//! redirect the request somewhere else: absolute or protocol-relative URLs,
//! `..` traversal, plaintext origins, and private or loopback hosts.
use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::debug;
use url::{Host, Url};

use crate::error::GuardError;

/// Joins `relative_path` onto `origin`, rejecting targets that leave the origin.
///
/// `allow_insecure` permits `http` origins and private/loopback hosts, which is
/// what local and dev targets need.
///
/// # Errors
///
/// Returns [`GuardError::UnsafeRequestTarget`] for a path that is not a plain
/// relative path, [`GuardError::InvalidOrigin`] or [`GuardError::InsecureOrigin`]
/// for a bad origin, and [`GuardError::PrivateHostBlocked`] for private hosts.
pub fn build_safe_url(
    relative_path: &str,
    origin: &str,
    allow_insecure: bool,
) -> Result<Url, GuardError> {
    check_relative_path(relative_path)?;

    let base = Url::parse(origin).map_err(|err| GuardError::InvalidOrigin {
        origin: origin.to_owned(),
        source: err,
    })?;

    let host = base.host().ok_or_else(|| GuardError::InsecureOrigin {
        origin: origin.to_owned(),
    })?;
    if !allow_insecure && is_private_host(&host) {
        return Err(GuardError::PrivateHostBlocked {
            host: host.to_string(),
        });
    }

    match base.scheme() {
        "https" => {}
        "http" if allow_insecure => {}
        _ => {
            return Err(GuardError::InsecureOrigin {
                origin: origin.to_owned(),
            });
        }
    }

    let prefix = base.path().trim_end_matches('/');
    let joined = format!(
        "{}://{}{}{}",
        base.scheme(),
        authority(&base),
        prefix,
        relative_path
    );
    let target = Url::parse(&joined).map_err(|err| {
        debug!("Joined target '{}' failed to parse: {}", joined, err);
        unsafe_target(relative_path, "not a valid path")
    })?;

    if target.host() != base.host()
        || target.port_or_known_default() != base.port_or_known_default()
    {
        return Err(unsafe_target(relative_path, "resolves outside the origin"));
    }

    Ok(target)
}

fn check_relative_path(path: &str) -> Result<(), GuardError> {
    if !path.starts_with('/') {
        return Err(unsafe_target(path, "must start with '/'"));
    }
    if path.starts_with("//") {
        return Err(unsafe_target(path, "protocol-relative URLs are not allowed"));
    }
    if path.contains("://") {
        return Err(unsafe_target(path, "absolute URLs are not allowed"));
    }
    if path.chars().any(char::is_control) {
        return Err(unsafe_target(path, "contains control characters"));
    }

    let path_only = path.split(['?', '#']).next().unwrap_or_default();
    if path_only.split(['/', '\\']).any(is_dot_dot) {
        return Err(unsafe_target(path, "path traversal is not allowed"));
    }

    Ok(())
}

// WHATWG URL parsing treats percent-encoded dots as dot segments too.
fn is_dot_dot(segment: &str) -> bool {
    let lowered = segment.to_ascii_lowercase();
    matches!(lowered.as_str(), ".." | ".%2e" | "%2e." | "%2e%2e")
}

fn unsafe_target(path: &str, reason: &'static str) -> GuardError {
    GuardError::UnsafeRequestTarget {
        path: path.to_owned(),
        reason,
    }
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_owned(),
    }
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(addr) => is_private_ipv4(*addr),
        Host::Ipv6(addr) => is_private_ipv6(*addr),
    }
}

fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_unspecified()
}

fn is_private_ipv6(addr: Ipv6Addr) -> bool {
    if addr.is_loopback() || addr.is_unspecified() {
        return true;
    }
    addr.to_ipv4_mapped().is_some_and(is_private_ipv4)
}
