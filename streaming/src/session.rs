//! `StreamSession`: the connection plan for one streaming bridge run.
//!
//! Mirrors the data model's `{worker_id, intype, outtype, client-addr,
//! client-port, worker-addr, worker-port, timeout}` tuple (`spec.md` §3).
//! The bridge allocates both ports itself: `client_port` is what it binds
//! its own PUSH socket to, `worker_port` is the port it tells the Service
//! to bind its PUSH socket to via the `StreamStart` RPC. The Service never
//! picks its own port in this design, so both numbers have to come from
//! one free-port scan before the RPC is sent.

use std::time::Duration;

use crate::error::StreamingError;
use crate::frame::FrameType;
use crate::port::find_free_port_pair;

#[derive(Debug, Clone)]
pub struct StreamSession {
    pub worker_id: String,
    pub intype: FrameType,
    pub outtype: FrameType,
    pub client_addr: String,
    pub client_port: u16,
    pub worker_addr: String,
    pub worker_port: u16,
    pub timeout: Duration,
}

impl StreamSession {
    /// Allocates `client_port`/`worker_port` from `[port_lo, port_hi]` and
    /// fills in the rest of the session plan. `worker_addr` is the
    /// Service's reachable host, `client_addr` is this Gateway's own
    /// address as seen by the Service (passed as `peer_ip` in the
    /// `StreamStart` RPC).
    pub fn allocate(
        worker_id: impl Into<String>,
        client_addr: impl Into<String>,
        worker_addr: impl Into<String>,
        intype: FrameType,
        outtype: FrameType,
        timeout: Duration,
        port_lo: u16,
        port_hi: u16,
    ) -> Result<Self, StreamingError> {
        let (client_port, worker_port) = find_free_port_pair(port_lo, port_hi)?;
        Ok(Self {
            worker_id: worker_id.into(),
            intype,
            outtype,
            client_addr: client_addr.into(),
            client_port,
            worker_addr: worker_addr.into(),
            worker_port,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_fills_distinct_ports_from_the_range() {
        let session = StreamSession::allocate(
            "stt-fast",
            "127.0.0.1",
            "10.0.0.5",
            FrameType::Bytes,
            FrameType::Json,
            Duration::from_secs(30),
            30200,
            30220,
        )
        .unwrap();
        assert_ne!(session.client_port, session.worker_port);
        assert_eq!(session.worker_addr, "10.0.0.5");
        assert_eq!(session.intype, FrameType::Bytes);
        assert_eq!(session.outtype, FrameType::Json);
    }
}
