use nlu_ml::encoder::RecurrentCell;
use nlu_ml::seq_classifier::SeqClassifierConfig;
use nlu_ml::slot_tagger::SlotTaggerConfig;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type SharedConfig = Arc<Config>;

pub static CONFIG_FILE: &str = "nlu.toml";

/// Initialise the config file at `path`.
///
/// Creates a new config file if it doesn't yet exist, otherwise loads the existing one.
/// Values can be overridden with `NLU_` prefixed environment variables, f.e. `NLU_CLASSIFIER__HIDDEN_SIZE=256`.
pub fn initialise_config(path: &Path) -> eyre::Result<Config> {
    load_config(path, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("nlu")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_config(path: &Path, environment: config::Environment) -> eyre::Result<Config> {
    if !path.exists() {
        tracing::info!(?path, "No config found, writing defaults");
        save_config(path, &Config::default())?;
    }

    let c = config::Config::builder()
        .add_source(config::File::from(path).required(true))
        .add_source(environment)
        .build()?;

    Ok(c.try_deserialize()?)
}

/// Save the provided config to `path`, creating parent directories as needed.
pub fn save_config(path: &Path, app_settings: &Config) -> eyre::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut config_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let basic_output = toml::to_string_pretty(app_settings)?;

    config_file.write_all(basic_output.as_bytes())?;

    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub embeddings: EmbeddingSettings,
    pub classifier: ClassifierSettings,
    pub tagger: TaggerSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EmbeddingSettings {
    /// Either a JSON matrix or a GloVe-style text file. Only the latter provides a vocabulary.
    pub path: PathBuf,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassifierSettings {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
    pub bidirectional: bool,
    pub sequence_length: usize,
    pub cell: RecurrentCell,
    /// Intent names, one per output class.
    pub labels: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaggerSettings {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
    pub bidirectional: bool,
    /// Sentences are padded or truncated to this many tokens.
    pub max_length: usize,
    pub cell: RecurrentCell,
    /// Slot tag names, the padding tag is appended automatically.
    pub tags: Vec<String>,
}

impl ClassifierSettings {
    pub fn model_config(&self) -> SeqClassifierConfig {
        SeqClassifierConfig::new(
            self.hidden_size,
            self.num_layers,
            self.dropout,
            self.bidirectional,
            self.labels.len(),
            self.sequence_length,
        )
        .with_cell(self.cell.clone())
    }
}

impl TaggerSettings {
    pub fn model_config(&self) -> SlotTaggerConfig {
        SlotTaggerConfig::new(
            self.hidden_size,
            self.num_layers,
            self.dropout,
            self.bidirectional,
            self.tags.len(),
        )
        .with_cell(self.cell.clone())
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("embeddings.txt"),
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            hidden_size: 512,
            num_layers: 2,
            dropout: 0.1,
            bidirectional: true,
            sequence_length: 32,
            cell: RecurrentCell::Lstm,
            labels: ["book_flight", "play_music", "get_weather", "set_alarm"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Default for TaggerSettings {
    fn default() -> Self {
        Self {
            hidden_size: 512,
            num_layers: 2,
            dropout: 0.1,
            bidirectional: true,
            max_length: 32,
            cell: RecurrentCell::Lstm,
            tags: ["O", "B-date", "I-date", "B-time", "I-time", "B-people", "I-people"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn creates_default_config_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = initialise_config(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config, Config::default());
        assert!(logs_contain("No config found, writing defaults"));
    }

    #[test]
    fn loads_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = Config::default();
        config.classifier.cell = RecurrentCell::Gru;
        config.tagger.tags = vec!["O".into(), "B-city".into()];
        save_config(&path, &config).unwrap();

        assert_eq!(initialise_config(&path).unwrap(), config);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let vars = config::Map::from([
            ("NLU_CLASSIFIER__HIDDEN_SIZE".to_string(), "256".to_string()),
            ("NLU_TAGGER__BIDIRECTIONAL".to_string(), "false".to_string()),
        ]);

        let config = load_config(&path, environment().source(Some(vars))).unwrap();

        assert_eq!(config.classifier.hidden_size, 256);
        assert!(!config.tagger.bidirectional);
        assert_eq!(config.embeddings, EmbeddingSettings::default());
    }

    #[test]
    fn settings_map_onto_model_configs() {
        let config = Config::default();

        let classifier = config.classifier.model_config();
        assert_eq!(classifier.num_class, 4);
        assert_eq!(classifier.sequence_length, 32);
        assert_eq!(classifier.encoder_output_size(), 512 * 2 * 32);

        let tagger = config.tagger.model_config();
        assert_eq!(tagger.num_class, 7);
        assert_eq!(tagger.num_tags(), 8);
    }
}
