use crate::config::SharedConfig;
use itertools::Itertools;
use nlu_ml::CpuBackend;
use nlu_ml::batch::TokenBatcher;
use nlu_ml::burn::data::dataloader::batcher::Batcher;
use nlu_ml::embedding::{PAD_TOKEN, Vocab};

#[derive(clap::Args, Debug)]
pub struct TagCommand {
    /// Sentences to tag
    #[clap(required = true)]
    text: Vec<String>,
}

impl TagCommand {
    #[tracing::instrument(skip_all, fields(sentences = self.text.len()))]
    pub fn run(self, config: SharedConfig) -> eyre::Result<()> {
        let device = Default::default();
        let (pretrained, vocab) = super::load_embeddings(&config)?;
        let settings = &config.tagger;
        eyre::ensure!(settings.max_length > 0, "tagger.max_length must be greater than zero");

        let model = settings
            .model_config()
            .init::<CpuBackend>(pretrained.to_tensor(&device), &device)?;
        tracing::warn!("No trained weights are loaded, predictions reflect the initial parameters");

        let batcher = TokenBatcher::<CpuBackend>::new(device, settings.max_length, vocab.pad_index());
        let batch = batcher.batch(self.text.iter().map(|text| vocab.encode(text)).collect());

        // [batch, seq]
        let predicted = model.forward(batch.tokens).argmax(2).squeeze::<2>(2);
        let [_, seq_length] = predicted.dims();
        let predicted = predicted.into_data().convert::<i64>().to_vec::<i64>().map_err(|e| eyre::eyre!("{e:?}"))?;

        for ((text, length), row) in self
            .text
            .iter()
            .zip(batch.lengths)
            .zip(predicted.chunks(seq_length))
        {
            let tags = Vocab::tokenize(text)
                .into_iter()
                .zip(&row[..length])
                .map(|(token, &tag)| format!("{token}/{}", tag_name(&settings.tags, tag as usize)))
                .join(" ");
            println!("{tags}");
        }

        Ok(())
    }
}

/// Tag indices past the configured tags belong to the padding tag.
fn tag_name(tags: &[String], index: usize) -> &str {
    tags.get(index).map(String::as_str).unwrap_or(PAD_TOKEN)
}
