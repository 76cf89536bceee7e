use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};

use ferrule_net::{
    DecodeEvent, DecoderConfig, Direction, FailedObject, HeaderMap, MessageHead, MessageStream,
    StartLine,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Side {
    Request,
    Response,
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Request => Direction::Request,
            Side::Response => Direction::Response,
        }
    }
}

/// Decodes a captured HTTP/1.x byte stream and prints its events.
#[derive(Debug, Parser)]
#[command(name = "ferrule")]
struct Cli {
    /// Capture file; stdin when omitted.
    input: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "request")]
    direction: Side,
    /// TOML file with decoder limits.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bytes handed to the decoder per push.
    #[arg(long = "slice-size", default_value_t = 4096)]
    slice_size: usize,
    #[arg(long)]
    max_initial_line_length: Option<usize>,
    #[arg(long)]
    max_header_size: Option<usize>,
    #[arg(long)]
    max_chunk_size: Option<usize>,
    /// Treat chunked bodies as a failure.
    #[arg(long)]
    no_chunked: bool,
    /// Skip header name and value validation.
    #[arg(long)]
    lenient_headers: bool,
    /// Refuse every `Expect: 100-continue`, dropping the announced body.
    #[arg(long)]
    reject_continue: bool,
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.slice_size == 0 {
        return Err("--slice-size must be positive".to_string());
    }
    let config = decoder_config(&cli)?;
    let input = read_input(cli.input.as_deref())?;
    let mut stream =
        MessageStream::new(cli.direction.into(), config).map_err(|err| err.to_string())?;

    info!(bytes = input.len(), slice_size = cli.slice_size, "decoding capture");
    for piece in input.chunks(cli.slice_size) {
        for event in stream.push(piece) {
            if cli.reject_continue
                && matches!(&event, DecodeEvent::MessageHead(head) if head.expects_continue())
            {
                stream.expectation_failed();
            }
            print_event(&event);
        }
    }
    for event in stream.push_eof() {
        print_event(&event);
    }
    if stream.buffered() > 0 {
        warn!(bytes = stream.buffered(), "undecoded bytes left at end of input");
    }
    Ok(())
}

fn decoder_config(cli: &Cli) -> Result<DecoderConfig, String> {
    let mut config = match &cli.config {
        Some(path) => DecoderConfig::load(path).map_err(|err| err.to_string())?,
        None => DecoderConfig::default(),
    };
    apply_overrides(cli, &mut config);
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut DecoderConfig) {
    if let Some(value) = cli.max_initial_line_length {
        config.max_initial_line_length = value;
    }
    if let Some(value) = cli.max_header_size {
        config.max_header_size = value;
    }
    if let Some(value) = cli.max_chunk_size {
        config.max_chunk_size = value;
    }
    if cli.no_chunked {
        config.chunked_supported = false;
    }
    if cli.lenient_headers {
        config.validate_header_names = false;
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => std::fs::read(path).map_err(|err| format!("{}: {err}", path.display())),
        None => {
            let mut input = Vec::new();
            std::io::stdin()
                .read_to_end(&mut input)
                .map_err(|err| err.to_string())?;
            Ok(input)
        }
    }
}

fn print_event(event: &DecodeEvent) {
    match event {
        DecodeEvent::MessageHead(head) => {
            println!("head  {}", start_line(head));
            print_headers("      ", &head.headers);
        }
        DecodeEvent::BodyChunk(data) => println!("body  {} bytes", data.len()),
        DecodeEvent::LastBodyChunk(last) => {
            println!("last  {} bytes", last.data.len());
            print_headers("trailer ", &last.trailers);
        }
        DecodeEvent::DecodeFailure(failure) => match &failure.object {
            FailedObject::Head(head) => {
                println!("error {} (head: {})", failure.cause, start_line(head));
            }
            FailedObject::Content(_) => println!("error {} (body)", failure.cause),
        },
        DecodeEvent::RawPassthroughBytes(data) => println!("raw   {} bytes", data.len()),
    }
}

fn print_headers(prefix: &str, headers: &HeaderMap) {
    for header in headers {
        println!("{prefix}{}: {}", header.name, header.value);
    }
}

fn start_line(head: &MessageHead) -> String {
    match &head.start_line {
        StartLine::Request(line) => format!("{} {} {}", line.method, line.target, line.version),
        StartLine::Status(line) => {
            format!("{} {} {}", line.version, line.status_code, line.reason)
        }
    }
}
