//! Peer address helpers

use std::net::{IpAddr, SocketAddr};

/// Build the URL of `path` on `peer`
///
/// `peer` is a host, an IP address or either with an explicit port;
/// `default_port` applies when no port is given.
pub fn peer_url(peer: &str, default_port: u16, path: &str) -> String {
    format!("http://{}{}", authority(peer.trim(), default_port), path)
}

fn authority(peer: &str, default_port: u16) -> String {
    if let Ok(addr) = peer.parse::<SocketAddr>() {
        return addr.to_string();
    }

    let bare = peer
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(peer);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return SocketAddr::new(ip, default_port).to_string();
    }

    match peer.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => peer.to_string(),
        _ => format!("{}:{}", peer, default_port),
    }
}
