use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Generate images from text prompts, keep a local history, and collect
/// feedback on the results.
#[derive(Debug, Parser)]
#[command(name = "lumiere", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate an image and add it to history
    Generate(GenerateArgs),

    /// Inspect or edit the local image history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Submit or browse feedback
    #[command(subcommand)]
    Feedback(FeedbackCommand),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Description of the image (10-1000 characters)
    #[arg(short, long)]
    pub prompt: String,

    /// Reference image file; repeat for several (max 5)
    #[arg(short, long = "reference", value_name = "FILE")]
    pub references: Vec<PathBuf>,

    /// Write the generated image here instead of printing its reference
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List history entries, newest first
    List,
    /// Remove the entry at INDEX
    Remove { index: usize },
    /// Remove every entry
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum FeedbackCommand {
    /// Submit feedback about an image
    Submit(SubmitArgs),
    /// List all feedback, newest first
    List,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Image reference (data URI or URL)
    #[arg(long, conflicts_with = "history_index", required_unless_present = "history_index")]
    pub image: Option<String>,

    /// Use the history entry at this index as the image
    #[arg(long)]
    pub history_index: Option<usize>,

    /// Your feedback (1-500 characters)
    #[arg(short, long)]
    pub comment: String,

    /// Your name (defaults to Anonymous)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Star rating, 1-5; 0 for none
    #[arg(short, long, value_parser = clap::value_parser!(i32).range(0..=5))]
    pub rating: Option<i32>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_with_references() {
        let cli = Cli::try_parse_from([
            "lumiere", "generate", "-p", "a lighthouse at dusk", "-r", "a.png", "-r", "b.jpg",
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.references.len(), 2);
        assert!(args.output.is_none());
    }

    #[test]
    fn submit_needs_an_image_source() {
        assert!(Cli::try_parse_from(["lumiere", "feedback", "submit", "-c", "nice"]).is_err());
        assert!(Cli::try_parse_from([
            "lumiere", "feedback", "submit", "-c", "nice", "--history-index", "0"
        ])
        .is_ok());
    }

    #[test]
    fn rating_above_five_is_rejected() {
        assert!(Cli::try_parse_from([
            "lumiere", "feedback", "submit", "-c", "nice", "--image", "https://x/y.png", "-r", "6"
        ])
        .is_err());
    }
}
