//! Network front end for a loaded dictionary
//!
//! The dictionary is loaded once and shared read-only by every worker.
//!
//! Architecture:
//! - `acdat serve`: binds a TCP port or Unix socket, accepts on one thread and
//!   answers each connection on a worker pool
//! - Client: connects, sends `(mode, query)` requests, decodes the occurrences
//! - Protocol: fixed little-endian framing, see [`protocol`]

mod client;
pub mod daemon;
pub mod protocol;

pub use client::{ClientError, ClientResult, SearchClient};
pub use daemon::{SearchServer, ServerConfig};
pub use protocol::RemoteOccurrence;

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Endpoint {
    /// TCP endpoint from `host:port` parts
    pub fn tcp(host: &str, port: u16) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("Invalid address {}:{}", host, port))?
            .next()
            .with_context(|| format!("No address for {}:{}", host, port))?;
        Ok(Endpoint::Tcp(addr))
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix(path.into())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Get the default socket path for the search server
/// Uses a per-user runtime directory for security
pub fn get_socket_path() -> PathBuf {
    // Try XDG_RUNTIME_DIR first (most secure, tmpfs-backed)
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("acdat.sock");
    }

    // Fall back to user's home directory
    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("run").join("acdat.sock");
    }

    // Last resort: /tmp with user ID
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/acdat-{}.sock", uid))
}

/// A bound listening socket
pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener, PathBuf),
}

impl Listener {
    /// Bind `endpoint`. A negative backlog keeps the system default.
    pub fn bind(endpoint: &Endpoint, backlog: i32) -> Result<Self> {
        let listener = match endpoint {
            Endpoint::Tcp(addr) => Listener::Tcp(
                TcpListener::bind(addr).with_context(|| format!("Failed to bind to {}", addr))?,
            ),
            Endpoint::Unix(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                // Remove stale socket file
                if path.exists() {
                    fs::remove_file(path)?;
                }
                let listener = UnixListener::bind(path)
                    .with_context(|| format!("Failed to bind to {}", path.display()))?;
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
                }
                Listener::Unix(listener, path.clone())
            }
        };

        if backlog >= 0 {
            let fd = match &listener {
                Listener::Tcp(l) => l.as_raw_fd(),
                Listener::Unix(l, _) => l.as_raw_fd(),
            };
            // Re-listening on a bound socket only updates the queue length
            if unsafe { libc::listen(fd, backlog) } != 0 {
                return Err(io::Error::last_os_error()).context("Failed to set backlog");
            }
        }

        Ok(listener)
    }

    /// The endpoint actually bound (resolves port 0)
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            Listener::Tcp(l) => Ok(Endpoint::Tcp(l.local_addr()?)),
            Listener::Unix(_, path) => Ok(Endpoint::Unix(path.clone())),
        }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Listener::Tcp(l) => l.set_nonblocking(nonblocking),
            Listener::Unix(l, _) => l.set_nonblocking(nonblocking),
        }
    }

    pub fn accept(&self) -> io::Result<Connection> {
        match self {
            Listener::Tcp(l) => l.accept().map(|(s, _)| Connection::Tcp(s)),
            Listener::Unix(l, _) => l.accept().map(|(s, _)| Connection::Unix(s)),
        }
    }

    /// Socket file to remove on exit
    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            Listener::Tcp(_) => None,
            Listener::Unix(_, path) => Some(path),
        }
    }
}

/// One client connection over either transport
pub enum Connection {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Connection {
    pub fn connect(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => TcpStream::connect(addr).map(Connection::Tcp),
            Endpoint::Unix(path) => UnixStream::connect(path).map(Connection::Unix),
        }
    }

    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Connection::Tcp(s) => s.try_clone().map(Connection::Tcp),
            Connection::Unix(s) => s.try_clone().map(Connection::Unix),
        }
    }

    /// Read and write timeout; `None` blocks forever
    pub fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Connection::Tcp(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
            Connection::Unix(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
        }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Connection::Tcp(s) => s.set_nonblocking(nonblocking),
            Connection::Unix(s) => s.set_nonblocking(nonblocking),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(s) => s.read(buf),
            Connection::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(s) => s.write(buf),
            Connection::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(s) => s.flush(),
            Connection::Unix(s) => s.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_endpoint() {
        let endpoint = Endpoint::tcp("127.0.0.1", 4000).unwrap();
        assert_eq!(endpoint.to_string(), "tcp://127.0.0.1:4000");
    }

    #[test]
    fn test_socket_path_name() {
        let path = get_socket_path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("acdat") && name.ends_with(".sock"));
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let endpoint = Endpoint::tcp("127.0.0.1", 0).unwrap();
        let listener = Listener::bind(&endpoint, 16).unwrap();
        match listener.local_endpoint().unwrap() {
            Endpoint::Tcp(addr) => assert_ne!(addr.port(), 0),
            Endpoint::Unix(_) => panic!("Wrong endpoint kind"),
        }
        assert!(listener.socket_path().is_none());
    }

    #[test]
    fn test_bind_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("acdat.sock");
        let listener = Listener::bind(&Endpoint::unix(&path), -1).unwrap();
        assert!(path.exists());
        assert_eq!(listener.socket_path(), Some(path.as_path()));
    }
}
