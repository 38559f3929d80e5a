use crate::config::SharedConfig;
use itertools::Itertools;
use nlu_ml::CpuBackend;
use nlu_ml::batch::TokenBatcher;
use nlu_ml::burn::data::dataloader::batcher::Batcher;
use nlu_ml::burn::tensor::activation::softmax;
use serde::Serialize;

#[derive(clap::Args, Debug)]
pub struct ClassifyCommand {
    /// Sentences to classify, every sentence gets its own prediction
    #[clap(required = true)]
    text: Vec<String>,
    /// Amount of most likely intents to show per sentence
    #[clap(long, short = 'k', default_value_t = 3)]
    top_k: usize,
    /// Print the predictions as JSON
    #[clap(long)]
    json: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IntentPrediction {
    pub text: String,
    pub intents: Vec<(String, f32)>,
}

impl ClassifyCommand {
    #[tracing::instrument(skip_all, fields(sentences = self.text.len()))]
    pub fn run(self, config: SharedConfig) -> eyre::Result<()> {
        let device = Default::default();
        let (pretrained, vocab) = super::load_embeddings(&config)?;
        let settings = &config.classifier;

        let model = settings
            .model_config()
            .init::<CpuBackend>(pretrained.to_tensor(&device), &device)?;
        tracing::warn!("No trained weights are loaded, predictions reflect the initial parameters");

        let batcher = TokenBatcher::<CpuBackend>::new(device, model.sequence_length(), vocab.pad_index());
        let batch = batcher.batch(self.text.iter().map(|text| vocab.encode(text)).collect());
        model.check_batch(&batch.tokens)?;

        let probabilities = softmax(model.forward(batch.tokens), 1);
        let predictions = self
            .text
            .into_iter()
            .zip(probabilities.iter_dim(0))
            .map(|(text, row)| {
                let row = row.into_data().to_vec::<f32>().map_err(|e| eyre::eyre!("{e:?}"))?;
                Ok::<_, eyre::Error>(IntentPrediction {
                    text,
                    intents: top_k(&settings.labels, &row, self.top_k),
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&predictions)?);
        } else {
            for prediction in predictions {
                println!("{}", prediction.text);
                for (label, probability) in prediction.intents {
                    println!("  {label:<24} {probability:.4}");
                }
            }
        }

        Ok(())
    }
}

/// The `k` most probable labels, most probable first.
fn top_k(labels: &[String], probabilities: &[f32], k: usize) -> Vec<(String, f32)> {
    labels
        .iter()
        .zip(probabilities)
        .sorted_by(|a, b| b.1.total_cmp(a.1))
        .take(k)
        .map(|(label, probability)| (label.clone(), *probability))
        .collect_vec()
}
