//! reefgc: garbage collection for a sharded object store.

use clap::Parser;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader, BufWriter};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use reefgc::{pipeline, Args, CleanConfig, Cleaner, Command, GcConfig, GcResult};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    run(args.command).await?;
    Ok(())
}

async fn run(command: Command) -> GcResult<()> {
    match command {
        Command::Gc {
            input,
            grace_days,
            now,
            metadata_out,
            physical_out,
        } => {
            let config = GcConfig::from_args(grace_days, now.as_deref())?;
            let reader = open_input(input.as_deref()).await?;
            let mut metadata = open_output(metadata_out.as_deref()).await?;
            let mut physical = open_output(physical_out.as_deref()).await?;
            pipeline::run_gc(reader, &mut metadata, &mut physical, &config).await?;
        }
        Command::Audit { input } => {
            let reader = open_input(input.as_deref()).await?;
            let mut problems = open_output(None).await?;
            pipeline::run_audit(reader, &mut problems).await?;
        }
        Command::Cruft { input } => {
            let reader = open_input(input.as_deref()).await?;
            let mut cruft = open_output(None).await?;
            pipeline::run_cruft(reader, &mut cruft).await?;
        }
        Command::Clean {
            input,
            target,
            batch_size,
        } => {
            let config = CleanConfig::new(target, batch_size)?;
            let reader = open_input(input.as_deref()).await?;
            let registry = reefgc::ClientRegistry::new();
            let client = registry.get_or_connect(&config.target).await?;
            let cleaner = Cleaner::new(&config, client);
            cleaner.clean(reader).await?;
            registry.close_all();
        }
    }
    Ok(())
}

async fn open_input(path: Option<&Path>) -> io::Result<Box<dyn AsyncBufRead + Unpin>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path).await?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

async fn open_output(path: Option<&Path>) -> io::Result<Box<dyn AsyncWrite + Unpin>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).await?)),
        None => Box::new(io::stdout()),
    })
}
