use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::{Backend, Tensor};
use burn::tensor::activation::sigmoid;

#[derive(Config, Debug)]
pub struct GruConfig {
    pub d_input: usize,
    pub d_hidden: usize,
}

impl GruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Gru<B> {
        Gru {
            input_gates: LinearConfig::new(self.d_input, 3 * self.d_hidden).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, 3 * self.d_hidden).init(device),
            d_hidden: self.d_hidden,
        }
    }
}

/// Batch-first gated recurrent unit.
///
/// Gates are laid out as `[reset, update, candidate]` along the last axis of both projections.
#[derive(Module, Debug)]
pub struct Gru<B: Backend> {
    input_gates: Linear<B>,
    hidden_gates: Linear<B>,
    d_hidden: usize,
}

impl<B: Backend> Gru<B> {
    /// Runs the sequence from a zero hidden state.
    ///
    /// # Shapes
    ///   - Input [batch_size, seq_length, d_input]
    ///   - Output [batch_size, seq_length, d_hidden]
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, seq_length, _] = input.dims();
        let hidden = self.d_hidden;
        let gate = |x: &Tensor<B, 2>, index: usize| x.clone().slice([0..batch_size, index * hidden..(index + 1) * hidden]);

        // The input half of every gate doesn't depend on the state, so it's projected for all timesteps at once.
        let input_gates = self.input_gates.forward(input);
        let mut state = Tensor::<B, 2>::zeros([batch_size, hidden], &input_gates.device());
        let mut outputs = Vec::with_capacity(seq_length);

        for t in 0..seq_length {
            let x = input_gates
                .clone()
                .slice([0..batch_size, t..t + 1, 0..3 * hidden])
                .squeeze::<2>(1);
            let h = self.hidden_gates.forward(state.clone());

            let reset = sigmoid(gate(&x, 0) + gate(&h, 0));
            let update = sigmoid(gate(&x, 1) + gate(&h, 1));
            let candidate = (gate(&x, 2) + reset * gate(&h, 2)).tanh();

            state = update.clone() * state + update.neg().add_scalar(1.0) * candidate;
            outputs.push(state.clone().unsqueeze_dim::<3>(1));
        }

        Tensor::cat(outputs, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CpuBackend, TrainBackend};
    use burn::tensor::Distribution;

    fn input<B: Backend>(device: &B::Device) -> Tensor<B, 3> {
        Tensor::random([2, 6, 5], Distribution::Normal(0.0, 1.0), device)
    }

    #[test]
    fn output_has_one_state_per_step() {
        let device = Default::default();
        let gru = GruConfig::new(5, 3).init::<CpuBackend>(&device);

        let output = gru.forward(input(&device));

        assert_eq!(output.dims(), [2, 6, 3]);
        // Every state is a convex mix of the previous state and a tanh candidate.
        assert!(output.into_data().to_vec::<f32>().unwrap().iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn steps_only_see_the_past() {
        let device = Default::default();
        let gru = GruConfig::new(5, 3).init::<CpuBackend>(&device);
        let x = input::<CpuBackend>(&device);

        let full = gru.forward(x.clone());
        let prefix = gru.forward(x.slice([0..2, 0..4, 0..5]));

        full.slice([0..2, 0..4, 0..3])
            .into_data()
            .assert_approx_eq(&prefix.into_data(), 5);
    }

    #[test]
    fn gates_receive_gradients() {
        let device = Default::default();
        let gru = GruConfig::new(5, 3).init::<TrainBackend>(&device);

        let grads = gru.forward(input(&device)).sum().backward();

        assert!(gru.input_gates.weight.val().grad(&grads).is_some());
        assert!(gru.hidden_gates.weight.val().grad(&grads).is_some());
    }
}
