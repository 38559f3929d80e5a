use crate::error::ModelError;
use burn::config::Config;
use burn::module::Module;
use crate::gru::{Gru, GruConfig};
use burn::nn::{Dropout, DropoutConfig, Lstm, LstmConfig};
use burn::prelude::{Backend, Tensor};

/// The recurrent cell used by every layer of a [RecurrentEncoder].
#[derive(Config, Debug, PartialEq, Eq)]
pub enum RecurrentCell {
    Lstm,
    Gru,
}

#[derive(Config, Debug)]
pub struct RecurrentEncoderConfig {
    /// Width of the incoming feature vectors.
    pub d_input: usize,
    /// Width of the hidden state of a single direction.
    pub d_hidden: usize,
    /// Number of stacked recurrent layers.
    pub num_layers: usize,
    #[config(default = "false")]
    pub bidirectional: bool,
    /// Dropout applied to the output of every layer but the last.
    #[config(default = "0.0")]
    pub dropout: f64,
    #[config(default = "RecurrentCell::Lstm")]
    pub cell: RecurrentCell,
}

impl RecurrentEncoderConfig {
    /// Number of directions, `2` when bidirectional.
    pub fn directions(&self) -> usize {
        if self.bidirectional { 2 } else { 1 }
    }

    /// Width of the features produced for every timestep.
    pub fn output_size(&self) -> usize {
        self.d_hidden * self.directions()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.d_hidden == 0 {
            return Err(ModelError::ZeroHiddenSize);
        }
        if self.num_layers == 0 {
            return Err(ModelError::ZeroLayers);
        }
        validate_dropout(self.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentEncoder<B> {
        let mut lstm_layers = Vec::new();
        let mut gru_layers = Vec::new();

        for layer in 0..self.num_layers {
            // Every layer after the first consumes the concatenated output of both directions.
            let d_input = if layer == 0 { self.d_input } else { self.output_size() };

            match self.cell {
                RecurrentCell::Lstm => {
                    let cell = || LstmConfig::new(d_input, self.d_hidden, true).init(device);
                    lstm_layers.push(LstmLayer {
                        forward_cell: cell(),
                        backward_cell: self.bidirectional.then(cell),
                    });
                }
                RecurrentCell::Gru => {
                    let cell = || GruConfig::new(d_input, self.d_hidden).init(device);
                    gru_layers.push(GruLayer {
                        forward_cell: cell(),
                        backward_cell: self.bidirectional.then(cell),
                    });
                }
            }
        }

        tracing::trace!(
            cell = ?self.cell,
            layers = self.num_layers,
            d_output = self.output_size(),
            "Initialised recurrent encoder"
        );

        RecurrentEncoder {
            lstm_layers,
            gru_layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_output: self.output_size(),
        }
    }
}

pub(crate) fn validate_dropout(dropout: f64) -> Result<(), ModelError> {
    if (0.0..1.0).contains(&dropout) {
        Ok(())
    } else {
        Err(ModelError::InvalidDropout { dropout })
    }
}

/// Stacked, batch-first LSTM or GRU encoder.
///
/// Only one of `lstm_layers`/`gru_layers` is populated, depending on the configured [RecurrentCell].
/// Hidden and cell states start at zero on every call and are discarded afterwards.
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    lstm_layers: Vec<LstmLayer<B>>,
    gru_layers: Vec<GruLayer<B>>,
    dropout: Dropout,
    d_output: usize,
}

impl<B: Backend> RecurrentEncoder<B> {
    /// # Shapes
    ///   - Input [batch_size, seq_length, d_input]
    ///   - Output [batch_size, seq_length, d_hidden * directions]
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let layers = self.lstm_layers.len() + self.gru_layers.len();
        let lstm = self.lstm_layers.iter().map(|layer| layer as &dyn RecurrentLayer<B>);
        let gru = self.gru_layers.iter().map(|layer| layer as &dyn RecurrentLayer<B>);

        lstm.chain(gru).enumerate().fold(input, |x, (i, layer)| {
            let x = layer.forward(x);
            if i + 1 < layers { self.dropout.forward(x) } else { x }
        })
    }

    pub fn output_size(&self) -> usize {
        self.d_output
    }

    pub fn num_layers(&self) -> usize {
        self.lstm_layers.len() + self.gru_layers.len()
    }

    pub fn is_bidirectional(&self) -> bool {
        self.lstm_layers.iter().any(|l| l.backward_cell.is_some()) || self.gru_layers.iter().any(|l| l.backward_cell.is_some())
    }
}

trait RecurrentLayer<B: Backend> {
    fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3>;
}

#[derive(Module, Debug)]
pub struct LstmLayer<B: Backend> {
    forward_cell: Lstm<B>,
    backward_cell: Option<Lstm<B>>,
}

impl<B: Backend> RecurrentLayer<B> for LstmLayer<B> {
    fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let run = |cell: &Lstm<B>, x: Tensor<B, 3>| cell.forward(x, None).0;
        bidirectional(input, &self.forward_cell, self.backward_cell.as_ref(), run)
    }
}

#[derive(Module, Debug)]
pub struct GruLayer<B: Backend> {
    forward_cell: Gru<B>,
    backward_cell: Option<Gru<B>>,
}

impl<B: Backend> RecurrentLayer<B> for GruLayer<B> {
    fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let run = |cell: &Gru<B>, x: Tensor<B, 3>| cell.forward(x);
        bidirectional(input, &self.forward_cell, self.backward_cell.as_ref(), run)
    }
}

/// Run `forward` over the sequence and, if present, `backward` over the time-reversed sequence.
/// The backward output is flipped back into chronological order and concatenated on the feature axis.
fn bidirectional<B: Backend, C>(
    input: Tensor<B, 3>,
    forward: &C,
    backward: Option<&C>,
    run: impl Fn(&C, Tensor<B, 3>) -> Tensor<B, 3>,
) -> Tensor<B, 3> {
    match backward {
        Some(backward) => {
            let reversed = run(backward, input.clone().flip([1])).flip([1]);
            let output = run(forward, input);
            Tensor::cat(vec![output, reversed], 2)
        }
        None => run(forward, input),
    }
}
