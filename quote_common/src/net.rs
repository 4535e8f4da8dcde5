//! Shared networking constants and helpers used by client and server.

/// TCP port of the mock posts API.
pub const API_PORT: u16 = 8080;
/// Number of posts requested per sync pass.
pub const DEFAULT_FETCH_LIMIT: usize = 5;

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
