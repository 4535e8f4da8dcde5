//! Talking to the mock posts API over TCP.
//!
//! Every request opens a fresh connection, writes one JSON `Command` line and
//! reads one JSON `Reply` line back. Connection, timeout, decoding and `ERROR`
//! replies all surface as `QuoteError::Network`.
use crate::sync::RemoteSource;
use log::{debug, info};
use quote_common::model::now_millis;
use quote_common::{Command, NewQuote, PostDraft, Quote, QuoteError, Reply, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Connect/read/write timeout in milliseconds.
const TIMEOUT_MS: u64 = 5000;

/// `RemoteSource` backed by the mock posts API.
#[derive(Debug, Clone)]
pub struct TcpRemote {
    server_addr: String,
    limit: usize,
    timeout: Duration,
}

impl TcpRemote {
    pub fn new(server_addr: impl Into<String>, limit: usize) -> Self {
        Self {
            server_addr: server_addr.into(),
            limit,
            timeout: Duration::from_millis(TIMEOUT_MS),
        }
    }

    fn resolve_addr(&self) -> Result<SocketAddr> {
        self.server_addr
            .to_socket_addrs()
            .map_err(QuoteError::network)?
            .next()
            .ok_or_else(|| QuoteError::Network(format!("cannot resolve {}", self.server_addr)))
    }

    fn send_command(&self, command: &Command) -> Result<Reply> {
        let addr = self.resolve_addr()?;
        let mut stream =
            TcpStream::connect_timeout(&addr, self.timeout).map_err(QuoteError::network)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(QuoteError::network)?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(QuoteError::network)?;

        debug!("Sending {} to {}", command.header, addr);
        stream
            .write_all(&command.to_json_line()?)
            .map_err(QuoteError::network)?;

        let mut line = String::new();
        BufReader::new(stream)
            .read_line(&mut line)
            .map_err(QuoteError::network)?;
        let reply: Reply = serde_json::from_str(line.trim())
            .map_err(|e| QuoteError::Network(format!("unreadable reply: {}", e)))?;
        reply.into_result()
    }
}

impl RemoteSource for TcpRemote {
    fn fetch_quotes(&self) -> Result<Vec<Quote>> {
        let reply = self.send_command(&Command::new_fetch(self.limit))?;
        let fetched_at = now_millis();
        let quotes: Vec<Quote> = reply
            .posts
            .iter()
            .map(|post| post.to_quote(fetched_at))
            .collect();
        debug!("Fetched {} quotes from {}", quotes.len(), self.server_addr);
        Ok(quotes)
    }

    fn post_quote(&self, quote: &NewQuote) -> Result<()> {
        let reply = self.send_command(&Command::new_create(PostDraft::from(quote)))?;
        if let Some(post) = reply.created {
            info!("Server stored the quote as post {}", post.id);
        }
        Ok(())
    }
}
