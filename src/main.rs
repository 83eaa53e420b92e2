//! Main entry point for the tarpeek CLI application.
//!
//! Opens a local archive or a remote object, then lists its index or tree,
//! streams one attachment, or runs the preview pipeline on it.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tarpeek::cli::Command;
use tarpeek::preview::{BlobRegistry, HttpResourceFetcher};
use tarpeek::{
    AttachmentsProvider, Cli, Config, ContentTypeDispatcher, FileNode, HttpRangeReader,
    LocalAttachments, PreviewArtifact, PreviewSlot, PreviewState, RemoteAttachments, tar,
};

/// Application entry point.
///
/// Parses command-line arguments, sets up logging and dispatches to the
/// handler of the selected subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    // reqwest and rustls may each pull in a crypto backend; pin one
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = cli.config().context("invalid layout pattern")?;

    if cli.is_http_url() {
        // Probe once: a backend that ignores Range is rejected here
        let reader = Arc::new(HttpRangeReader::new(cli.source().to_string()).await?);
        run_remote(&cli, &config, reader.clone()).await?;

        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
    } else {
        let data = tokio::fs::read(cli.source())
            .await
            .with_context(|| format!("cannot read {}", cli.source()))?;
        run_local(&cli, &config, data).await?;
    }

    Ok(())
}

/// Route `tracing` output to stderr; `RUST_LOG` wins over `-q`/`-v`.
fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tarpeek={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_local(cli: &Cli, config: &Config, data: Vec<u8>) -> Result<()> {
    let provider = LocalAttachments::load(data, config).await?;

    if let Command::Index { .. } = cli.command {
        println!("{}", provider.index().to_json_pretty()?);
        return Ok(());
    }

    run_attachments(cli, config, Arc::new(provider)).await
}

async fn run_remote(cli: &Cli, config: &Config, reader: Arc<HttpRangeReader>) -> Result<()> {
    let cancel = CancellationToken::new();

    if let Command::Index { .. } = cli.command {
        // The object's own index, one header read per entry
        let index = tar::scan_remote(reader.as_ref()).await?;
        println!("{}", index.to_json_pretty()?);
        return Ok(());
    }

    let provider = if cli.options.direct {
        RemoteAttachments::direct(reader, config, &cancel).await?
    } else {
        RemoteAttachments::discover(reader, config, &cancel).await?
    };

    run_attachments(cli, config, Arc::new(provider)).await
}

/// Subcommands that only need the provider contract.
async fn run_attachments(
    cli: &Cli,
    config: &Config,
    provider: Arc<dyn AttachmentsProvider>,
) -> Result<()> {
    match &cli.command {
        Command::Index { .. } => unreachable!("handled by the caller"),
        Command::Tree { json: true, .. } => {
            println!("{}", serde_json::to_string_pretty(provider.tree())?);
        }
        Command::Tree { json: false, .. } => {
            if provider.is_empty() {
                eprintln!("no attachments");
            }
            print_tree(provider.tree(), 0);
        }
        Command::Cat { path, .. } => {
            let content = provider
                .attachment_content(path, &CancellationToken::new())
                .await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content.bytes).await?;
            stdout.flush().await?;
        }
        Command::Preview { path, .. } => {
            let dispatcher = ContentTypeDispatcher::new(
                config.preview_ceiling,
                BlobRegistry::new(),
                Arc::new(HttpResourceFetcher::default()),
            );
            let slot = PreviewSlot::new(provider, Arc::new(dispatcher));
            let _ = slot.load(path).await;
            print_preview(&slot.state());
        }
    }

    Ok(())
}

/// Print a tree with two-space indentation per level, files with their
/// [`format_size`] size.
fn print_tree(nodes: &[FileNode], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            FileNode::File { name, size, .. } => {
                println!("{indent}{name}  ({})", format_size(*size));
            }
            FileNode::Folder { name, children } => {
                println!("{indent}{name}/");
                print_tree(children, depth + 1);
            }
        }
    }
}

fn print_preview(state: &PreviewState) {
    match state {
        PreviewState::Resolved(PreviewArtifact::Text { text, .. }) => println!("{text}"),
        PreviewState::Resolved(PreviewArtifact::Media { kind, url, mime, resources }) => {
            println!("{kind:?} {mime} at {url} ({} inlined resources)", resources.len());
        }
        PreviewState::Resolved(PreviewArtifact::Table { bytes }) => {
            println!("table data, {}", format_size(bytes.len() as u64));
        }
        PreviewState::Unsupported => println!("preview not supported for this file type"),
        PreviewState::TooBig => println!("file is too big to preview"),
        PreviewState::Empty => println!("file is empty"),
        PreviewState::Error(message) => println!("preview failed: {message}"),
        PreviewState::Idle | PreviewState::Loading => println!("preview not loaded"),
    }
}

/// Attachment and transfer sizes in binary units, two decimals above 1 KiB.
fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if size < 1024 {
        return format!("{size} bytes");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(11), "11 bytes");
        assert_eq!(format_size(1536), "1.50 KiB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.00 MiB");
        assert_eq!(format_size(3 << 40), "3.00 TiB");
    }
}
