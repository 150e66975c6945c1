//! Listen and TLS configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 8086;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenConfig {
    pub ip: IpAddr,
    pub port: u16,
}

impl ListenConfig {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self::new(DEFAULT_IP, DEFAULT_PORT)
    }
}

/// TLS configuration for the HTTPS listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub certificate: PathBuf,
    /// Path to TLS private key file (PEM format)
    pub certificate_key: PathBuf,
    /// Accepted for command-line compatibility; encrypted keys are rejected
    pub passphrase: Option<String>,
}
