//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::publisher::DEFAULT_MAX_LOG_LEN;
use crate::standalone::DEFAULT_CHANNEL_CAPACITY;

/// Default port for the WebSocket transport.
pub const DEFAULT_PORT: u16 = 8765;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,

    /// Outbound frames buffered per target before slow sockets lag.
    pub channel_capacity: usize,

    /// Length above which logged message content is truncated.
    pub max_log_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            request_logging: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_log_len: DEFAULT_MAX_LOG_LEN,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_max_log_len(mut self, max_log_len: usize) -> Self {
        self.max_log_len = max_log_len;
        self
    }
}
