//! Search server
//!
//! Holds one dictionary in memory and answers binary search requests over a
//! TCP port or Unix socket. Connections are served on a worker pool; the
//! dictionary is shared read-only through an `Arc`.

use crate::dictionary::Dictionary;
use crate::server::protocol::{Request, empty_response, encode_response, read_request};
use crate::server::{Connection, Endpoint, Listener};
use crate::utils::utf8;
use anyhow::{Context, Result};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Set by SIGINT/SIGTERM
static SIGNALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signal: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

/// Server tuning, stored under `server` in the app config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Worker threads; 0 uses the CPU count
    #[serde(default)]
    pub workers: usize,

    /// Accept queue length; negative keeps the OS default
    #[serde(default = "default_backlog")]
    pub backlog: i32,

    /// Per-connection read/write timeout; 0 disables it
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,

    /// Stop after this long without connections
    #[serde(default)]
    pub server_timeout_secs: Option<u64>,

    /// Cached responses; 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_backlog() -> i32 {
    -1
}

fn default_client_timeout_secs() -> u64 {
    30
}

fn default_cache_size() -> usize {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            backlog: default_backlog(),
            client_timeout_secs: default_client_timeout_secs(),
            server_timeout_secs: None,
            cache_size: default_cache_size(),
        }
    }
}

impl ServerConfig {
    pub fn client_timeout(&self) -> Option<Duration> {
        (self.client_timeout_secs > 0).then(|| Duration::from_secs(self.client_timeout_secs))
    }

    pub fn server_timeout(&self) -> Option<Duration> {
        self.server_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

/// Statistics for the server
struct ServerStats {
    start_time: Instant,
    connections: AtomicU64,
    active_connections: AtomicUsize,
    queries_served: AtomicU64,
    invalid_queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            connections: AtomicU64::new(0),
            active_connections: AtomicUsize::new(0),
            queries_served: AtomicU64::new(0),
            invalid_queries: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    fn cache_hit_rate(&self) -> f32 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        }
    }
}

/// Longer queries are answered but never cached
pub const MAX_CACHED_QUERY: usize = 4 * 1024;

type ResponseCache = Mutex<LruCache<(u8, Vec<u8>), Arc<[u8]>>>;

/// The search server
pub struct SearchServer {
    dictionary: Arc<Dictionary>,
    config: ServerConfig,
    /// Encoded responses keyed by (mode, query bytes)
    cache: Option<ResponseCache>,
    stats: ServerStats,
    shutdown: AtomicBool,
}

impl SearchServer {
    /// Create a new search server wrapped in Arc
    pub fn new(dictionary: Arc<Dictionary>, config: ServerConfig) -> Arc<Self> {
        let cache = NonZeroUsize::new(config.cache_size).map(|size| Mutex::new(LruCache::new(size)));
        Arc::new(Self {
            dictionary,
            config,
            cache,
            stats: ServerStats::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind `endpoint` and serve until signalled or idle (blocking)
    pub fn run(self: &Arc<Self>, endpoint: &Endpoint) -> Result<()> {
        let listener = Listener::bind(endpoint, self.config.backlog)?;
        install_signal_handlers();
        self.serve(listener)
    }

    /// Serve an already bound listener (blocking)
    pub fn serve(self: &Arc<Self>, listener: Listener) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("acdat-worker-{}", i))
            .build()
            .context("Failed to start worker pool")?;

        listener.set_nonblocking(true)?;
        eprintln!(
            "acdat: listening on {} ({} workers)",
            listener.local_endpoint()?,
            pool.current_num_threads()
        );

        let server_timeout = self.config.server_timeout();
        let mut last_activity = Instant::now();

        while !self.is_shutting_down() {
            match listener.accept() {
                Ok(connection) => {
                    last_activity = Instant::now();
                    if let Err(e) = self.prepare(&connection) {
                        eprintln!("acdat: connection setup error: {}", e);
                        continue;
                    }

                    self.stats.connections.fetch_add(1, Ordering::Relaxed);
                    self.stats.active_connections.fetch_add(1, Ordering::Relaxed);
                    let server = Arc::clone(self);
                    pool.spawn(move || {
                        if let Err(e) = server.handle_connection(connection) {
                            eprintln!("acdat: connection error: {}", e);
                        }
                        server.stats.active_connections.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if self.stats.active_connections.load(Ordering::Relaxed) > 0 {
                        last_activity = Instant::now();
                    } else if let Some(idle) = server_timeout
                        && last_activity.elapsed() >= idle
                    {
                        eprintln!("acdat: idle for {}s, stopping", idle.as_secs());
                        break;
                    }
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    eprintln!("acdat: accept error: {}", e);
                }
            }
        }

        // Cleanup
        if let Some(path) = listener.socket_path() {
            let _ = fs::remove_file(path);
        }
        drop(listener);
        drop(pool);

        eprintln!(
            "acdat: shutting down after {:.1?}: {} queries over {} connections, {:.1}% cache hits",
            self.stats.start_time.elapsed(),
            self.queries_served(),
            self.stats.connections.load(Ordering::Relaxed),
            self.cache_hit_rate() * 100.0
        );

        Ok(())
    }

    /// Ask the accept loop to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed) || SIGNALLED.load(Ordering::Relaxed)
    }

    pub fn queries_served(&self) -> u64 {
        self.stats.queries_served.load(Ordering::Relaxed)
    }

    pub fn cache_hit_rate(&self) -> f32 {
        self.stats.cache_hit_rate()
    }

    fn prepare(&self, connection: &Connection) -> io::Result<()> {
        // Accepted sockets may inherit the listener's non-blocking flag
        connection.set_nonblocking(false)?;
        connection.set_timeout(self.config.client_timeout())
    }

    /// Handle a single client connection
    fn handle_connection(&self, connection: Connection) -> Result<()> {
        let mut reader = BufReader::new(connection.try_clone()?);
        let mut writer = BufWriter::new(connection);

        loop {
            let request = match read_request(&mut reader) {
                Ok(request) => request,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    // Client disconnected
                    break;
                }
                Err(e) => return Err(e).context("Invalid request"),
            };

            let response = self.respond(&request)?;
            writer.write_all(&response)?;
            writer.flush()?;
        }

        Ok(())
    }

    /// Encoded answer to one request
    fn respond(&self, request: &Request) -> io::Result<Arc<[u8]>> {
        self.stats.queries_served.fetch_add(1, Ordering::Relaxed);

        let key = (request.query.len() <= MAX_CACHED_QUERY)
            .then(|| (request.mode.0, request.query.clone()));
        if let Some(key) = &key
            && let Some(cache) = &self.cache
            && let Ok(mut cache) = cache.lock()
        {
            if let Some(response) = cache.get(key) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(response));
            }
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let response: Arc<[u8]> = match utf8::decode(&request.query) {
            Ok(query) => {
                let occurrences = self.dictionary.search_characters(&query, request.mode);
                encode_response(&occurrences, request.mode)?.into()
            }
            Err(_) => {
                self.stats.invalid_queries.fetch_add(1, Ordering::Relaxed);
                empty_response().into()
            }
        };

        if let Some(key) = key
            && let Some(cache) = &self.cache
            && let Ok(mut cache) = cache.lock()
        {
            cache.put(key, Arc::clone(&response));
        }

        Ok(response)
    }
}
