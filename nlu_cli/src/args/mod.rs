use crate::args::classify::ClassifyCommand;
use crate::args::inspect::InspectCommand;
use crate::args::tag::TagCommand;
use crate::config::Config;
use eyre::{ContextCompat, WrapErr};
use nlu_ml::embedding::{PretrainedEmbeddings, Vocab};
use std::path::PathBuf;

pub mod classify;
pub mod inspect;
pub mod tag;

#[derive(clap::Parser, Debug)]
#[clap(version, about)]
pub struct ClapArgs {
    /// Path to the TOML config, created with defaults if it doesn't exist.
    #[clap(long, global = true, default_value = crate::config::CONFIG_FILE)]
    pub config: PathBuf,
    #[clap(subcommand)]
    pub commands: SubCommands,
}

#[derive(clap::Subcommand, Debug)]
pub enum SubCommands {
    /// Build both models from the config and report their layer widths and parameter counts
    #[clap(alias = "i")]
    Inspect(InspectCommand),
    /// Predict the intent of one or more sentences
    #[clap(arg_required_else_help(true))]
    #[clap(alias = "c")]
    Classify(ClassifyCommand),
    /// Predict a slot tag for every token of one or more sentences
    #[clap(arg_required_else_help(true))]
    #[clap(alias = "t")]
    Tag(TagCommand),
}

/// Load the configured embeddings along with their vocabulary.
///
/// Sentences can only be encoded when the embedding file carries a token column.
pub fn load_embeddings(config: &Config) -> eyre::Result<(PretrainedEmbeddings, Vocab)> {
    let path = &config.embeddings.path;
    let pretrained = PretrainedEmbeddings::load(path).wrap_err_with(|| format!("Failed to load {path:?}"))?;
    let vocab = pretrained
        .vocab()
        .with_context(|| format!("{path:?} has no vocabulary, use a GloVe-style text file"))?;

    Ok((pretrained, vocab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierSettings, EmbeddingSettings, TaggerSettings};
    use clap::Parser;
    use nlu_ml::encoder::RecurrentCell;
    use std::sync::Arc;

    const GLOVE: &str = "[PAD] 0.0 0.0 0.0 0.0\n[UNK] 0.1 0.1 0.1 0.1\nbook 0.3 -0.2 0.5 1.0\na 0.9 0.1 -0.4 0.2\nflight -0.7 0.6 0.0 0.3\n";

    fn small_config(embeddings: PathBuf) -> Config {
        Config {
            embeddings: EmbeddingSettings { path: embeddings },
            classifier: ClassifierSettings {
                hidden_size: 6,
                num_layers: 2,
                sequence_length: 5,
                ..Default::default()
            },
            tagger: TaggerSettings {
                hidden_size: 6,
                num_layers: 1,
                max_length: 5,
                cell: RecurrentCell::Gru,
                ..Default::default()
            },
        }
    }

    fn run(config: &Config, args: &[&str]) -> eyre::Result<()> {
        let args = ClapArgs::try_parse_from(std::iter::once("nlu").chain(args.iter().copied()))?;
        let config = Arc::new(config.clone());

        match args.commands {
            SubCommands::Inspect(inspect) => inspect.run(config),
            SubCommands::Classify(classify) => classify.run(config),
            SubCommands::Tag(tag) => tag.run(config),
        }
    }

    #[test]
    fn commands_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glove.txt");
        std::fs::write(&path, GLOVE).unwrap();
        let config = small_config(path);

        run(&config, &["inspect"]).unwrap();
        run(&config, &["classify", "book a flight", "book", "--json"]).unwrap();
        run(&config, &["classify", "a very long sentence that exceeds the sequence length", "-k", "1"]).unwrap();
        run(&config, &["tag", "book a flight tomorrow"]).unwrap();
    }

    #[test]
    fn json_embeddings_have_no_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, "[[0.0, 1.0], [1.0, 0.0]]").unwrap();
        let config = small_config(path);

        run(&config, &["inspect"]).unwrap();
        let err = run(&config, &["classify", "book"]).unwrap_err();
        assert!(err.to_string().contains("has no vocabulary"));
    }

    #[test]
    fn missing_text_is_rejected() {
        assert!(ClapArgs::try_parse_from(["nlu", "classify"]).is_err());
        assert!(ClapArgs::try_parse_from(["nlu", "tag"]).is_err());
    }
}
