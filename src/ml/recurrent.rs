// ============================================================
// Layer 5: Layered Recurrent State + Stacked LSTM
// ============================================================
// Burn's `Lstm` is a single layer. Encoder and decoder both need
// a stack of L layers whose states are threaded in lock-step:
// layer i's new (hidden, cell) must come back as layer i's input
// state on the next call.
//
// RecurrentState keeps that pairing explicit and is validated
// on entry to every stacked forward, so a state built for a
// different depth or width fails fast instead of broadcasting
// into garbage.

use burn::{
    nn::{Dropout, DropoutConfig, Lstm, LstmConfig, LstmState},
    prelude::*,
};

use crate::domain::error::{Seq2SeqError, Seq2SeqResult};

// ─── Mode ─────────────────────────────────────────────────────────────────────
/// Explicit train / eval switch. Dropout only runs in `Train`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

// ─── State ────────────────────────────────────────────────────────────────────
/// One layer's state, each tensor shaped `[batch, units]`.
#[derive(Debug, Clone)]
pub struct LayerState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Tensor<B, 2>,
}

impl<B: Backend> LayerState<B> {
    pub fn new(hidden: Tensor<B, 2>, cell: Tensor<B, 2>) -> Self {
        Self { hidden, cell }
    }

    fn into_lstm(self) -> LstmState<B, 2> {
        LstmState::new(self.cell, self.hidden)
    }

    fn from_lstm(state: LstmState<B, 2>) -> Self {
        Self { hidden: state.hidden, cell: state.cell }
    }
}

/// Ordered per-layer states, index 0 = bottom layer.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    layers: Vec<LayerState<B>>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn from_layers(layers: Vec<LayerState<B>>) -> Self {
        Self { layers }
    }

    pub fn zeros(num_layers: usize, batch: usize, units: usize, device: &B::Device) -> Self {
        let layers = (0..num_layers)
            .map(|_| {
                LayerState::new(
                    Tensor::zeros([batch, units], device),
                    Tensor::zeros([batch, units], device),
                )
            })
            .collect();
        Self { layers }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[LayerState<B>] {
        &self.layers
    }

    pub fn into_layers(self) -> Vec<LayerState<B>> {
        self.layers
    }

    pub fn validate(&self, num_layers: usize, batch: usize, units: usize) -> Seq2SeqResult<()> {
        if self.layers.len() != num_layers {
            return Err(Seq2SeqError::invalid_input(format!(
                "recurrent state has {} layers, expected {}",
                self.layers.len(),
                num_layers
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            let h = layer.hidden.dims();
            let c = layer.cell.dims();
            if h != [batch, units] || c != [batch, units] {
                return Err(Seq2SeqError::invalid_input(format!(
                    "layer {i} state is hidden {h:?} / cell {c:?}, expected [{batch}, {units}]"
                )));
            }
        }
        Ok(())
    }
}

// ─── Stacked LSTM ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct StackedLstmConfig {
    pub d_input:    usize,
    pub units:      usize,
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout:    f64,
}

impl StackedLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedLstm<B> {
        let layers = (0..self.num_layers)
            .map(|i| {
                let d_in = if i == 0 { self.d_input } else { self.units };
                LstmConfig::new(d_in, self.units, true).init(device)
            })
            .collect();
        StackedLstm {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_input: self.d_input,
            units:   self.units,
        }
    }
}

#[derive(Module, Debug)]
pub struct StackedLstm<B: Backend> {
    pub layers:  Vec<Lstm<B>>,
    pub dropout: Dropout,
    pub d_input: usize,
    pub units:   usize,
}

impl<B: Backend> StackedLstm<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// input: [batch, seq_len, d_input] → ([batch, seq_len, units], new state).
    ///
    /// Layer i consumes layer i-1's whole output sequence. In `Train`
    /// mode each layer's input goes through dropout first.
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: RecurrentState<B>,
        mode:  Mode,
    ) -> Seq2SeqResult<(Tensor<B, 3>, RecurrentState<B>)> {
        let [batch, seq_len, d_input] = input.dims();
        if batch == 0 || seq_len == 0 {
            return Err(Seq2SeqError::invalid_input(format!(
                "recurrent input of shape [{batch}, {seq_len}, {d_input}] is empty"
            )));
        }
        if d_input != self.d_input {
            return Err(Seq2SeqError::invalid_input(format!(
                "recurrent input width {d_input}, expected {}",
                self.d_input
            )));
        }
        state.validate(self.layers.len(), batch, self.units)?;

        let mut x    = input;
        let mut next = Vec::with_capacity(self.layers.len());

        for (lstm, layer_state) in self.layers.iter().zip(state.into_layers()) {
            if mode.is_train() {
                x = self.dropout.forward(x);
            }
            let (output, new_state) = lstm.forward(x, Some(layer_state.into_lstm()));
            next.push(LayerState::from_lstm(new_state));
            x = output;
        }

        Ok((x, RecurrentState::from_layers(next)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn stack(num_layers: usize) -> StackedLstm<B> {
        StackedLstmConfig::new(5, 4, num_layers).init(&Default::default())
    }

    #[test]
    fn test_zero_state_has_requested_shape() {
        let s = RecurrentState::<B>::zeros(3, 2, 4, &Default::default());
        assert_eq!(s.num_layers(), 3);
        assert!(s.validate(3, 2, 4).is_ok());
        assert!(s.validate(2, 2, 4).is_err());
        assert!(s.validate(3, 1, 4).is_err());
    }

    #[test]
    fn test_forward_threads_every_layer() {
        let device = Default::default();
        let rnn = stack(3);
        let x = Tensor::<B, 3>::random([2, 6, 5], Distribution::Normal(0.0, 1.0), &device);
        let (out, state) = rnn
            .forward(x, RecurrentState::zeros(3, 2, 4, &device), Mode::Eval)
            .unwrap();

        assert_eq!(out.dims(), [2, 6, 4]);
        assert_eq!(state.num_layers(), 3);
        for layer in state.layers() {
            assert_eq!(layer.hidden.dims(), [2, 4]);
            assert_eq!(layer.cell.dims(), [2, 4]);
        }
    }

    #[test]
    fn test_top_layer_hidden_matches_last_output_step() {
        let device = Default::default();
        let rnn = stack(2);
        let x = Tensor::<B, 3>::random([1, 3, 5], Distribution::Normal(0.0, 1.0), &device);
        let (out, state) = rnn
            .forward(x, RecurrentState::zeros(2, 1, 4, &device), Mode::Eval)
            .unwrap();

        let last: Vec<f32> = out.slice([0..1, 2..3, 0..4]).into_data().iter::<f32>().collect();
        let top: Vec<f32> = state.layers()[1].hidden.clone().into_data().iter::<f32>().collect();
        for (a, b) in last.iter().zip(&top) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_state_of_wrong_depth() {
        let device = Default::default();
        let rnn = stack(2);
        let x = Tensor::<B, 3>::zeros([1, 3, 5], &device);
        let err = rnn
            .forward(x, RecurrentState::zeros(3, 1, 4, &device), Mode::Eval)
            .unwrap_err();
        assert!(matches!(err, Seq2SeqError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_wrong_input_width() {
        let device = Default::default();
        let rnn = stack(1);
        let x = Tensor::<B, 3>::zeros([1, 3, 7], &device);
        assert!(rnn.forward(x, RecurrentState::zeros(1, 1, 4, &device), Mode::Eval).is_err());
    }
}
