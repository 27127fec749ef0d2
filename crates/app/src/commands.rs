//! Subcommand handlers.
//!
//! Each handler prints user-facing text only; raw collaborator errors go
//! to the log.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lumiere_cloud::CloudClients;
use lumiere_core::feedback::FeedbackInput;
use lumiere_core::image_ref::{download_file_name, ImageReference, DATA_URI_PREFIX};
use lumiere_history::{FileStore, HistoryCache, KeyValueStore};
use lumiere_pipeline::{FeedbackPipeline, GenerationFlow};

use crate::cli::{FeedbackCommand, GenerateArgs, HistoryCommand, SubmitArgs};
use crate::config::AppConfig;

/// MIME type used for reference files whose format is not recognised.
/// The request builder drops such entries.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Characters of a reference shown in listings.
const PREVIEW_CHARS: usize = 72;

/// Shared state for subcommand handlers, built once per process.
pub struct App {
    pub config: AppConfig,
    pub clients: CloudClients,
}

impl App {
    async fn history(&self) -> HistoryCache {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(
            &self.config.history_path,
            Some(self.config.history_quota_bytes),
        ));
        HistoryCache::load(store).await
    }

    fn feedback(&self) -> FeedbackPipeline {
        FeedbackPipeline::with_collection(
            self.clients.clone(),
            &self.config.cloud.feedback_collection,
        )
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

pub async fn generate(app: &App, args: GenerateArgs) -> anyhow::Result<()> {
    let mut references = Vec::with_capacity(args.references.len());
    for path in &args.references {
        references.push(read_reference(path).await?);
    }

    let flow = GenerationFlow::new(app.clients.generator().cloned());
    let mut history = app.history().await;

    let generated = flow
        .generate(&args.prompt, &references, &mut history)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if let Some(notice) = generated.history.notice() {
        eprintln!("{notice}");
    }

    match args.output {
        Some(path) => {
            write_image(&generated.image_reference, &path).await?;
            println!("Saved image to {}", path.display());
        }
        None => println!("{}", generated.image_reference),
    }
    Ok(())
}

/// Read an image file and encode it as a data URI.
async fn read_reference(path: &Path) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read reference image {}", path.display()))?;
    let mime = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_MIME);
    Ok(format!("{DATA_URI_PREFIX}{mime};base64,{}", STANDARD.encode(&bytes)))
}

/// Decode an inline image to `path`. Durable URLs are not downloaded.
async fn write_image(reference: &str, path: &Path) -> anyhow::Result<()> {
    let ImageReference::Inline(inline) = ImageReference::parse(reference)? else {
        anyhow::bail!("Image is stored remotely at {reference}; nothing to write");
    };
    let target = if path.is_dir() {
        path.join(download_file_name(reference))
    } else {
        path.to_path_buf()
    };
    tokio::fs::write(&target, inline.decode()?)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

pub async fn history(app: &App, command: HistoryCommand) -> anyhow::Result<()> {
    let mut history = app.history().await;
    match command {
        HistoryCommand::List => {
            if history.is_empty() {
                println!("No images in history.");
            }
            for (index, reference) in history.items().iter().enumerate() {
                println!("{index:>2}  {}", preview(reference));
            }
        }
        HistoryCommand::Remove { index } => {
            history.remove(index).await.map_err(|e| {
                tracing::error!(error = %e, "History removal failed");
                anyhow::anyhow!("{}", e.failure_kind().user_message())
            })?;
            println!("Removed entry {index}.");
        }
        HistoryCommand::Clear => {
            history.clear().await;
            println!("Your image generation history has been cleared.");
        }
    }
    Ok(())
}

fn preview(reference: &str) -> String {
    if reference.chars().count() <= PREVIEW_CHARS {
        return reference.to_string();
    }
    let head: String = reference.chars().take(PREVIEW_CHARS).collect();
    format!("{head}…")
}

// ---------------------------------------------------------------------------
// feedback
// ---------------------------------------------------------------------------

pub async fn feedback(app: &App, command: FeedbackCommand) -> anyhow::Result<()> {
    let pipeline = app.feedback();
    match command {
        FeedbackCommand::Submit(args) => submit(app, &pipeline, args).await,
        FeedbackCommand::List => {
            let entries = pipeline.list().await.map_err(|e| anyhow::anyhow!("{e}"))?;
            if entries.is_empty() {
                println!("No feedback yet.");
            }
            for entry in entries {
                let stars = entry
                    .record
                    .rating
                    .map(|r| "*".repeat(usize::from(r)))
                    .unwrap_or_default();
                println!(
                    "{}  {:<5} {}: {}\n    {}",
                    entry.record.timestamp.format("%Y-%m-%d %H:%M"),
                    stars,
                    entry.record.name,
                    entry.record.feedback_text,
                    entry.record.image_url,
                );
            }
            Ok(())
        }
    }
}

async fn submit(app: &App, pipeline: &FeedbackPipeline, args: SubmitArgs) -> anyhow::Result<()> {
    let image_reference = match (args.image, args.history_index) {
        (Some(image), _) => image,
        (None, Some(index)) => {
            let history = app.history().await;
            history
                .get(index)
                .map(str::to_string)
                .with_context(|| format!("No history entry at index {index}"))?
        }
        (None, None) => anyhow::bail!("Pass --image or --history-index"),
    };

    let outcome = pipeline
        .submit(&FeedbackInput {
            name: args.name,
            rating: args.rating,
            comment: args.comment,
            image_reference,
        })
        .await;

    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        anyhow::bail!("{}", outcome.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_references() {
        let long = format!("data:image/png;base64,{}", "A".repeat(200));
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
        assert_eq!(preview("https://x/y.png"), "https://x/y.png");
    }

    #[tokio::test]
    async fn reference_files_become_data_uris() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let png = temp.path().join("ref.png");
        std::fs::write(&png, [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 0])?;
        let uri = read_reference(&png).await?;
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));

        let txt = temp.path().join("notes.txt");
        std::fs::write(&txt, "hello")?;
        assert!(read_reference(&txt).await?.starts_with("data:application/octet-stream;base64,"));
        Ok(())
    }

    #[tokio::test]
    async fn inline_result_is_written_into_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        write_image("data:image/webp;base64,UklGRg==", temp.path()).await?;
        let written = std::fs::read(temp.path().join("lumiere-art.webp"))?;
        assert_eq!(written, b"RIFF");
        assert!(write_image("https://x/y.png", temp.path()).await.is_err());
        Ok(())
    }
}
