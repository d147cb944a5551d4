//! Client for a running search server

use crate::automaton::SearchMode;
use crate::server::protocol::{RemoteOccurrence, read_response, write_request};
use crate::server::{Connection, Endpoint};
use std::io::{self, BufReader, BufWriter};
use std::time::Duration;

/// Read/write timeout
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug)]
pub enum ClientError {
    /// Communication error
    Io(io::Error),
    /// Server sent something that does not parse
    InvalidResponse(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
            ClientError::InvalidResponse(msg) => write!(f, "Invalid response from server: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::InvalidData {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Io(e)
        }
    }
}

/// Client for the search server
pub struct SearchClient {
    reader: BufReader<Connection>,
    writer: BufWriter<Connection>,
}

impl SearchClient {
    /// Connect with the default timeout
    pub fn connect(endpoint: &Endpoint) -> ClientResult<Self> {
        Self::connect_with_timeout(endpoint, Some(IO_TIMEOUT))
    }

    pub fn connect_with_timeout(endpoint: &Endpoint, timeout: Option<Duration>) -> ClientResult<Self> {
        let connection = Connection::connect(endpoint).map_err(ClientError::Io)?;
        connection.set_timeout(timeout).map_err(ClientError::Io)?;

        let reader = BufReader::new(connection.try_clone().map_err(ClientError::Io)?);
        let writer = BufWriter::new(connection);

        Ok(Self { reader, writer })
    }

    /// Search `query` on the server
    pub fn query(&mut self, query: &[u8], mode: SearchMode) -> ClientResult<Vec<RemoteOccurrence>> {
        write_request(&mut self.writer, mode, query)?;
        Ok(read_response(&mut self.reader, mode)?)
    }

    /// Whether `needle` is one of the server's needles
    pub fn contains(&mut self, needle: &str) -> ClientResult<bool> {
        let found = self.query(needle.as_bytes(), SearchMode(SearchMode::EXACT | SearchMode::FIRST))?;
        Ok(!found.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: ClientError = io::Error::new(io::ErrorKind::InvalidData, "bad frame").into();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
        assert!(err.to_string().contains("bad frame"));

        let err: ClientError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[test]
    fn test_connect_refused() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::unix(dir.path().join("missing.sock"));
        assert!(matches!(SearchClient::connect(&endpoint), Err(ClientError::Io(_))));
    }
}
