//! flatepool CLI binary.
//!
//! # Commands
//!
//! - `compress` - Compress a file or stdin through a pooled encoder
//! - `serve` - Start the demo HTTP compression server

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flatepool::{
    server::{create_router, AppState, ServerConfig},
    spawn_housekeeping, Codec, Config, EncoderPool, PoolOptions, VERSION,
};

#[derive(Parser)]
#[command(name = "flatepool")]
#[command(version = VERSION)]
#[command(about = "Pooled gzip/deflate stream compression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress input to gzip or raw deflate
    Compress {
        /// Input file path (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec (gzip, deflate)
        #[arg(short, long, default_value = "gzip")]
        codec: String,

        /// Compression level (0-9)
        #[arg(short, long, default_value = "9")]
        level: u32,

        /// Print sizes to stderr
        #[arg(short, long)]
        stats: bool,
    },

    /// Start HTTP compression server
    Serve {
        /// Config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind to all interfaces
        #[arg(long)]
        bind_all: bool,

        /// Seconds between idle-pool drains (0 = never, overrides config)
        #[arg(long)]
        drain_secs: Option<u64>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compress {
            file,
            output,
            codec,
            level,
            stats,
        } => cmd_compress(file, output, &codec, level, stats),

        Commands::Serve {
            config,
            port,
            bind_all,
            drain_secs,
            verbose,
        } => cmd_serve(config, port, bind_all, drain_secs, verbose),
    }
}

fn cmd_compress(
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    codec: &str,
    level: u32,
    stats: bool,
) -> anyhow::Result<()> {
    let codec: Codec = codec.parse()?;
    let pool = EncoderPool::new(codec, PoolOptions::default().with_level(level))?;

    let mut input: Box<dyn Read> = match file {
        Some(path) => Box::new(
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let mut counter = CountingWriter::new(BufWriter::new(sink));
    let mut encoder = pool.acquire(&mut counter)?;
    let bytes_in = io::copy(&mut input, &mut encoder)?;
    pool.release(encoder)?;
    counter.inner.flush()?;

    if stats {
        let bytes_out = counter.written;
        let ratio = if bytes_in == 0 {
            0.0
        } else {
            bytes_out as f64 / bytes_in as f64 * 100.0
        };
        eprintln!("{codec}: {bytes_in} -> {bytes_out} bytes ({ratio:.1}%)");
    }

    Ok(())
}

/// Counts bytes on their way to the output
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    bind_all: bool,
    drain_secs: Option<u64>,
    verbose: bool,
) -> anyhow::Result<()> {
    // Initialize logging
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // Build config: file, then environment on top
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .apply_env();

    let mut server_config = ServerConfig::from_config(&config)?;
    if let Some(port) = port {
        server_config = server_config.with_port(port);
    }
    if bind_all {
        server_config = server_config.bind_all();
    }
    if let Some(secs) = drain_secs {
        server_config =
            server_config.with_drain_interval((secs > 0).then(|| Duration::from_secs(secs)));
    }

    // Create state and router
    let state = Arc::new(AppState::new(server_config.clone())?);
    let app = create_router(state.clone());

    tracing::info!("Starting flatepool server on {}", server_config.addr);
    tracing::info!(
        "Pool: level {}, buffer {} bytes, max idle {}",
        server_config.pool.level,
        server_config.pool.buffer_size,
        server_config
            .pool
            .max_idle
            .map_or_else(|| "unbounded".to_string(), |max| max.to_string())
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let housekeeping = server_config.drain_interval.map(|interval| {
            tracing::info!("Housekeeping: draining idle encoders every {interval:?}");
            spawn_housekeeping(state.compressors.clone(), interval)
        });

        let listener = tokio::net::TcpListener::bind(server_config.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;

        if let Some(handle) = housekeeping {
            handle.abort();
        }
        tracing::info!("Server stopped, {} idle encoders released", state.compressors.drain());
        Ok::<_, anyhow::Error>(())
    })
}
