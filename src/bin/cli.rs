use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;

use bytes::{Bytes, BytesMut};
use clap::{CommandFactory, Parser as ClapParser};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use h1stream::{
    Event, EventSink, Flow, Header, MessageMetadata, OwnedEvent, ParseError, ParsedMessage,
    Parser, ParserConfig, ParserMode, Strictness, format_debug, format_events_jsonl,
    format_headers_only, format_json,
};

/// h1stream CLI — incremental HTTP/1.x parser.
///
/// Reads a raw HTTP stream from a file, --raw string, or stdin, feeds it to
/// the parser (optionally in fixed-size slices) and prints the result in the
/// chosen format. Pipelined messages are all reported.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP message as a single shell argument.
///
/// Set RUST_LOG (e.g. RUST_LOG=h1stream=trace) to see parser diagnostics.
#[derive(ClapParser)]
#[command(name = "h1stream-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP stream.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP string (escape sequences \r \n \t \\ are expanded).
    #[arg(long)]
    raw: Option<String>,

    /// Whether the stream holds requests or responses.
    #[arg(short, long, default_value = "request", value_enum)]
    mode: ModeArg,

    /// Output format.
    #[arg(short, long, default_value = "events", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Feed the input in slices of this many bytes (0 = all at once).
    #[arg(long, default_value = "0")]
    chunk_size: usize,

    /// JSON file with parser limits; flags below override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Content-Length alongside chunked encoding: reject or ignore it.
    #[arg(long, value_enum)]
    strictness: Option<StrictnessArg>,

    /// Maximum declared body size in bytes.
    #[arg(long)]
    max_body_size: Option<u64>,

    /// Maximum number of headers allowed.
    #[arg(long)]
    max_headers: Option<usize>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Request,
    Response,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrictnessArg {
    Strict,
    Lenient,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// One JSON object per parser event
    Events,
    /// JSON array of parsed messages
    Json,
    /// Human-readable debug output
    Debug,
    /// Start line + headers only
    Headers,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("error reading input: {0}")]
    Input(#[from] std::io::Error),
    #[error("error reading config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("empty input")]
    EmptyInput,
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Parse(_) => 2,
            _ => 1,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        if let CliError::Parse(err) = &e {
            eprintln!("  {} (code {})", err.kind.message(), err.kind.code());
        }
        process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let data = read_input(cli)?;
    if data.is_empty() {
        return Err(CliError::EmptyInput);
    }

    let config = build_config(cli)?;
    let mode = match cli.mode {
        ModeArg::Request => ParserMode::Request,
        ModeArg::Response => ParserMode::Response,
    };

    let mut collector = Collector::default();
    let outcome = drive(&data, mode, config, cli.chunk_size, &mut collector);

    // Whatever was parsed before an error is still worth printing.
    let output = match cli.format {
        OutputFormat::Events => format_events_jsonl(&collector.events),
        OutputFormat::Json => format_json(&collector.messages, cli.pretty),
        OutputFormat::Debug => collector
            .messages
            .iter()
            .map(|m| format_debug(m, mode))
            .collect(),
        OutputFormat::Headers => collector
            .messages
            .iter()
            .map(|m| format_headers_only(m, mode))
            .collect(),
    };
    print!("{output}");

    outcome.map_err(CliError::from)
}

/// Feed the whole input, restarting after every completed message.
fn drive(
    data: &[u8],
    mode: ParserMode,
    config: ParserConfig,
    chunk_size: usize,
    collector: &mut Collector,
) -> Result<(), ParseError> {
    let mut parser = Parser::with_config(mode, config);
    let step = if chunk_size == 0 { data.len() } else { chunk_size };

    for chunk in data.chunks(step) {
        let mut rest = chunk;
        while !rest.is_empty() {
            let consumed = parser.feed(rest, collector)?;
            rest = &rest[consumed..];
            if let Some(message) = collector.take_complete() {
                tracing::debug!(body = message.body.len(), "message collected");
                collector.messages.push(message);
            }
            if parser.is_paused() {
                parser.resume();
            }
            if parser.is_complete() {
                // A closed connection carries nothing more; treat what
                // follows as a fresh stream.
                if !parser.next_message() {
                    tracing::debug!("connection not kept alive, resetting");
                    parser.reset();
                }
            } else if consumed == 0 {
                break;
            }
        }
    }

    parser.finish(collector)?;
    if let Some(message) = collector.take_complete() {
        collector.messages.push(message);
    }
    Ok(())
}

/// Records events and assembles complete messages from them. Pauses on
/// every `MessageComplete` so the driver can pick the message up before the
/// next one starts.
#[derive(Default)]
struct Collector {
    events: Vec<OwnedEvent>,
    messages: Vec<ParsedMessage>,
    body: BytesMut,
    /// Metadata snapshot from `HeadersComplete`; trailers are added to it.
    current: Option<MessageMetadata>,
    trailer_name: Option<Bytes>,
    done: Option<MessageMetadata>,
}

impl Collector {
    fn take_complete(&mut self) -> Option<ParsedMessage> {
        let metadata = self.done.take()?;
        Some(ParsedMessage {
            metadata,
            body: self.body.split().freeze(),
        })
    }
}

impl EventSink for Collector {
    fn on_event(&mut self, event: Event<'_>) -> Flow {
        self.events.push(event.to_owned_event());
        match event {
            Event::MessageBegin => {
                self.body.clear();
                self.current = None;
                Flow::Continue
            }
            Event::HeaderField(name) if self.current.is_some() => {
                self.trailer_name = Some(Bytes::copy_from_slice(name));
                Flow::Continue
            }
            Event::HeaderValue(value) => {
                if let (Some(meta), Some(name)) = (self.current.as_mut(), self.trailer_name.take()) {
                    meta.trailers.push(Header {
                        name,
                        value: Bytes::copy_from_slice(value),
                    });
                }
                Flow::Continue
            }
            Event::HeadersComplete(meta) => {
                self.current = Some(meta.clone());
                Flow::Continue
            }
            Event::Body(chunk) => {
                self.body.extend_from_slice(chunk);
                Flow::Continue
            }
            Event::MessageComplete => {
                self.done = self.current.take();
                Flow::Pause
            }
            _ => Flow::Continue,
        }
    }
}

fn build_config(cli: &Cli) -> Result<ParserConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => ParserConfig::default(),
    };

    if let Some(s) = cli.strictness {
        config.strictness = match s {
            StrictnessArg::Strict => Strictness::Strict,
            StrictnessArg::Lenient => Strictness::Lenient,
        };
    }
    if let Some(max) = cli.max_body_size {
        config.max_body_size = Some(max);
    }
    if let Some(max) = cli.max_headers {
        config.max_headers = max;
    }
    Ok(config)
}

fn load_config(path: &Path) -> Result<ParserConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
