use acdat::automaton::{SearchMode, Traversal};
use acdat::dictionary::{self, Dictionary};
use acdat::output;
use acdat::server::{self, Endpoint, SearchClient, SearchServer};
use acdat::utils::{self, AppConfig, spinner};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Port used when `--socket tcp` is given without `--port`
const DEFAULT_TCP_PORT: u16 = 7643;

#[derive(Parser)]
#[command(name = "acdat")]
#[command(about = "Multi-pattern string search over a double-array Aho-Corasick automaton")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a dictionary from a word list (one needle per line, optional TAB + payload)
    Build {
        /// Word list
        words: PathBuf,

        /// Dictionary file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Keep every character in the trie
        #[arg(long)]
        no_tail: bool,

        /// Drop payloads
        #[arg(long)]
        no_user_data: bool,

        /// Fail link computation order
        #[arg(long)]
        traversal: Option<Traversal>,

        /// No progress or summary
        #[arg(short, long)]
        quiet: bool,
    },
    /// Search text with a dictionary (reads stdin lines when no text is given)
    Search {
        /// Dictionary file
        dictionary: PathBuf,

        /// Text to search
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,

        #[command(flatten)]
        mode: ModeArgs,

        /// Only print the number of occurrences
        #[arg(short, long)]
        count: bool,

        /// Print the text with occurrences highlighted
        #[arg(long)]
        highlight: bool,

        /// Disable colors
        #[arg(long)]
        no_color: bool,
    },
    /// Show dictionary statistics
    Stats {
        /// Dictionary file
        dictionary: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve a dictionary over a socket (Ctrl+C to stop)
    Serve {
        /// Dictionary file
        #[arg(short, long, env = "DICTIONARY")]
        dictionary: Option<PathBuf>,

        #[command(flatten)]
        endpoint: EndpointArgs,

        /// Accept queue length
        #[arg(long, env = "BACKLOG", allow_negative_numbers = true)]
        backlog: Option<i32>,

        /// Worker threads (0 = CPU count)
        #[arg(short, long, env = "WORKERS")]
        workers: Option<usize>,

        /// Stop after this many idle seconds
        #[arg(long, env = "SERVER_TIMEOUT")]
        server_timeout: Option<u64>,

        /// Per-connection timeout in seconds (0 = none)
        #[arg(long, env = "CLIENT_TIMEOUT")]
        client_timeout: Option<u64>,

        /// Cached responses (0 = no cache)
        #[arg(long)]
        cache_size: Option<usize>,
    },
    /// Query a running server
    Query {
        /// Text to search
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,

        #[command(flatten)]
        endpoint: EndpointArgs,

        #[command(flatten)]
        mode: ModeArgs,

        /// Timeout in seconds (0 = none)
        #[arg(long, env = "CLIENT_TIMEOUT")]
        client_timeout: Option<u64>,

        /// Disable colors
        #[arg(long)]
        no_color: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to config.json
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SocketKind {
    Unix,
    Tcp,
}

#[derive(Args)]
struct EndpointArgs {
    /// Transport
    #[arg(long, env = "SOCKET", value_enum, default_value_t = SocketKind::Unix)]
    socket: SocketKind,

    /// Unix socket path
    #[arg(long, env = "SOCKET_PATH")]
    socket_path: Option<PathBuf>,

    /// TCP port
    #[arg(short, long, env = "TCP_PORT")]
    port: Option<u16>,

    /// TCP address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

impl EndpointArgs {
    fn endpoint(&self) -> Result<Endpoint> {
        match self.socket {
            SocketKind::Unix => Ok(Endpoint::unix(
                self.socket_path.clone().unwrap_or_else(server::get_socket_path),
            )),
            SocketKind::Tcp => Endpoint::tcp(&self.host, self.port.unwrap_or(DEFAULT_TCP_PORT)),
        }
    }
}

#[derive(Args)]
struct ModeArgs {
    /// Stop at the first occurrence
    #[arg(short, long)]
    first: bool,

    /// Only match needles spanning the whole text
    #[arg(short = 'x', long)]
    exact: bool,
}

impl ModeArgs {
    fn mode(&self) -> SearchMode {
        let mut mode = SearchMode(SearchMode::NEEDLE | SearchMode::USER_DATA);
        if self.first {
            mode = mode | SearchMode::FIRST;
        }
        if self.exact {
            mode = mode | SearchMode::EXACT;
        }
        mode
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Build {
            words,
            output,
            no_tail,
            no_user_data,
            traversal,
            quiet,
        } => {
            let mut options = config.trie.clone();
            options.use_tail &= !no_tail;
            options.use_user_data &= !no_user_data;
            let traversal = traversal.unwrap_or(config.traversal);
            build(&words, &output, &options, traversal, quiet)?;
        }
        Commands::Search {
            dictionary,
            text,
            mode,
            count,
            highlight,
            no_color,
        } => {
            search(&dictionary, &text, mode.mode(), count, highlight, !no_color)?;
        }
        Commands::Stats { dictionary, json } => {
            dictionary::stats::show_stats(&dictionary, json)?;
        }
        Commands::Serve {
            dictionary,
            endpoint,
            backlog,
            workers,
            server_timeout,
            client_timeout,
            cache_size,
        } => {
            let mut server_config = config.server.clone();
            if let Some(backlog) = backlog {
                server_config.backlog = backlog;
            }
            if let Some(workers) = workers {
                server_config.workers = workers;
            }
            if let Some(secs) = server_timeout {
                server_config.server_timeout_secs = Some(secs);
            }
            if let Some(secs) = client_timeout {
                server_config.client_timeout_secs = secs;
            }
            if let Some(size) = cache_size {
                server_config.cache_size = size;
            }

            let path = dictionary
                .or_else(|| config.dictionary.clone())
                .context("No dictionary given (use --dictionary or DICTIONARY)")?;
            let dictionary = load(&path)?;
            let server = SearchServer::new(Arc::new(dictionary), server_config);
            server.run(&endpoint.endpoint()?)?;
        }
        Commands::Query {
            text,
            endpoint,
            mode,
            client_timeout,
            no_color,
        } => {
            let timeout = client_timeout.unwrap_or(config.server.client_timeout_secs);
            let timeout = (timeout > 0).then(|| Duration::from_secs(timeout));
            let endpoint = endpoint.endpoint()?;
            let mut client = SearchClient::connect_with_timeout(&endpoint, timeout)
                .with_context(|| format!("Failed to connect to {}", endpoint))?;

            let found = client.query(text.join(" ").as_bytes(), mode.mode())?;
            let mut stdout = output::stdout(!no_color);
            output::print_remote(&mut stdout, &found)?;
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save()?;
                eprintln!("acdat: saved {}", utils::get_config_path()?.display());
            }
        }
    }

    Ok(())
}

fn build(
    words: &Path,
    output: &Path,
    options: &acdat::dat::TrieOptions,
    traversal: Traversal,
    quiet: bool,
) -> Result<()> {
    let (dictionary, report) =
        dictionary::build_from_word_list(words, options, traversal, quiet)?;

    if report.needles == 0 {
        bail!("No needles in {}", words.display());
    }

    let pb = if quiet { None } else { Some(spinner("Writing dictionary...")?) };
    dictionary.store(output)?;
    if let Some(pb) = pb {
        pb.finish_with_message(format!("Wrote {}", output.display()));
    }

    if !quiet {
        report.print();
        println!("File size:        {}", dictionary::stats::format_size(dictionary.stats().file_size));
    }

    Ok(())
}

fn load(path: &Path) -> Result<Dictionary> {
    let started = std::time::Instant::now();
    let dictionary = Dictionary::load(path)?;
    let stats = dictionary.stats();
    eprintln!(
        "acdat: loaded {} ({} states, {} needles) in {:.1?}",
        path.display(),
        stats.states,
        stats.terminal_states,
        started.elapsed()
    );
    Ok(dictionary)
}

fn search(
    path: &Path,
    text: &[String],
    mode: SearchMode,
    count: bool,
    highlight: bool,
    color: bool,
) -> Result<()> {
    let dictionary = Dictionary::load(path)?;
    let mut stdout = output::stdout(color);

    let mut print = |label: Option<&str>, line: &str| -> io::Result<()> {
        let found = dictionary.search(line, mode);
        if count {
            output::print_count(&mut stdout, label, found.len())
        } else if highlight {
            output::print_highlighted(&mut stdout, line, &found)
        } else {
            output::print_occurrences(&mut stdout, label, line, &found)
        }
    };

    if !text.is_empty() {
        print(None, &text.join(" "))?;
        return Ok(());
    }

    let stdin = io::stdin();
    for (i, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        print(Some(&(i + 1).to_string()), &line)?;
    }

    Ok(())
}
