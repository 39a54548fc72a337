//! Ephemeral TCP port allocation for stream sessions.
//!
//! Grounds `utils.py`'s `find_free_port`: a port is proven free by binding
//! it and releasing the listener, rather than trusting an OS-assigned
//! ephemeral port, so the chosen number can be handed to a peer process
//! before this one starts listening on it for real.

use std::net::TcpListener;

use crate::error::StreamingError;

/// Scans `[lo, hi]` inclusive for the first port that can be bound on all
/// interfaces, releases it immediately, and returns the number.
pub fn find_free_port(lo: u16, hi: u16) -> Result<u16, StreamingError> {
    for port in lo..=hi {
        if TcpListener::bind(("0.0.0.0", port)).is_ok() {
            return Ok(port);
        }
    }
    Err(StreamingError::PortRangeExhausted)
}

/// Allocates two distinct free ports from the range: one the bridge binds
/// itself, one it hands to the worker to bind. A second scan that skips
/// the first result keeps the pair distinct without holding both sockets
/// open at once.
pub fn find_free_port_pair(lo: u16, hi: u16) -> Result<(u16, u16), StreamingError> {
    let first = find_free_port(lo, hi)?;
    for port in (first + 1)..=hi {
        if TcpListener::bind(("0.0.0.0", port)).is_ok() {
            return Ok((first, port));
        }
    }
    for port in lo..first {
        if TcpListener::bind(("0.0.0.0", port)).is_ok() {
            return Ok((first, port));
        }
    }
    Err(StreamingError::PortRangeExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_port_within_a_narrow_range() {
        let port = find_free_port(30000, 30010).unwrap();
        assert!((30000..=30010).contains(&port));
    }

    #[test]
    fn pair_allocation_returns_distinct_ports() {
        let (a, b) = find_free_port_pair(30100, 30120).unwrap();
        assert_ne!(a, b);
        assert!((30100..=30120).contains(&a));
        assert!((30100..=30120).contains(&b));
    }
}
