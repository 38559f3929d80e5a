use crate::config::SharedConfig;
use eyre::WrapErr;
use nlu_ml::CpuBackend;
use nlu_ml::burn::module::Module;
use nlu_ml::embedding::PretrainedEmbeddings;

#[derive(clap::Args, Debug)]
pub struct InspectCommand {}

impl InspectCommand {
    #[tracing::instrument(skip_all)]
    pub fn run(self, config: SharedConfig) -> eyre::Result<()> {
        let device = Default::default();
        let path = &config.embeddings.path;
        let pretrained = PretrainedEmbeddings::load(path).wrap_err_with(|| format!("Failed to load {path:?}"))?;
        let [num_embeddings, embedding_dim] = pretrained.dims();
        println!("embeddings: {num_embeddings} x {embedding_dim}");

        let classifier = config
            .classifier
            .model_config()
            .init::<CpuBackend>(pretrained.to_tensor(&device), &device)?;
        println!(
            "classifier: {} layer(s), bidirectional: {}, encoder output: {}, head input: {}, classes: {}, parameters: {}",
            classifier.encoder().num_layers(),
            classifier.encoder().is_bidirectional(),
            classifier.encoder().output_size(),
            classifier.head_input_size(),
            classifier.num_class(),
            classifier.num_params(),
        );

        let tagger = config
            .tagger
            .model_config()
            .init::<CpuBackend>(pretrained.to_tensor(&device), &device)?;
        println!(
            "tagger: {} layer(s), bidirectional: {}, encoder output: {}, tags: {} (pad = {}), parameters: {}",
            tagger.encoder().num_layers(),
            tagger.encoder().is_bidirectional(),
            tagger.encoder().output_size(),
            tagger.num_tags(),
            tagger.pad_tag(),
            tagger.num_params(),
        );

        Ok(())
    }
}
