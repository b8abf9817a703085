// ============================================================
// Layer 5: Decoder (one step, input feeding)
// ============================================================
// The decoder owns no state between calls. Each step receives
// the previous token, the previous recurrent state and the
// previous attention context, and hands back the new ones:
//
//   prev_token ──► embedding ─┐
//                             ├─ cat ─► stacked LSTM ─► top
//   prev_context ─────────────┘                          │
//                                                        ▼
//                        encoder_outputs ──► attention(top)
//                                                        │
//                                              new_context
//                                                        │
//                              [top ; new_context] ─► Linear ─► logits
//
// Teacher-forced training and greedy inference both drive
// this same `step`; they only differ in which token they feed.
//
// Reference: Luong et al. (2015) §3.3, input-feeding approach

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::domain::error::{Seq2SeqError, Seq2SeqResult};
use crate::ml::attention::{AttentionConfig, AttentionLayer, AttentionMethod};
use crate::ml::recurrent::{Mode, RecurrentState, StackedLstm, StackedLstmConfig};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub units:         usize,
    pub num_layers:    usize,
    pub method:        AttentionMethod,
    #[config(default = 0.0)]
    pub dropout:       f64,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        Decoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            rnn: StackedLstmConfig::new(self.embedding_dim + self.units, self.units, self.num_layers)
                .with_dropout(self.dropout)
                .init(device),
            attention: AttentionConfig::new(self.units, self.method).init(device),
            output:    LinearConfig::new(2 * self.units, self.vocab_size).init(device),
            units:     self.units,
        }
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub rnn:       StackedLstm<B>,
    pub attention: AttentionLayer<B>,
    pub output:    Linear<B>,
    pub units:     usize,
}

/// What one decode step produces.
#[derive(Debug, Clone)]
pub struct DecoderStep<B: Backend> {
    /// Unnormalised vocabulary scores, [batch, vocab_size]
    pub logits:            Tensor<B, 2>,
    pub state:             RecurrentState<B>,
    /// Fed back as `prev_context` on the next step, [batch, units]
    pub context:           Tensor<B, 2>,
    /// [batch, src_len]
    pub attention_weights: Tensor<B, 2>,
}

impl<B: Backend> Decoder<B> {
    pub fn num_layers(&self) -> usize {
        self.rnn.num_layers()
    }

    /// Context fed into the very first step.
    pub fn initial_context(&self, batch: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([batch, self.units], device)
    }

    pub fn step(
        &self,
        prev_token:      Tensor<B, 1, Int>,
        state:           RecurrentState<B>,
        encoder_outputs: &Tensor<B, 3>,
        prev_context:    Tensor<B, 2>,
        mode:            Mode,
    ) -> Seq2SeqResult<DecoderStep<B>> {
        let [batch]           = prev_token.dims();
        let [enc_batch, _, _] = encoder_outputs.dims();
        let ctx_dims          = prev_context.dims();

        if batch == 0 {
            return Err(Seq2SeqError::invalid_input("decoder step on an empty batch"));
        }
        if enc_batch != batch || ctx_dims != [batch, self.units] {
            return Err(Seq2SeqError::invalid_input(format!(
                "decoder step with {batch} tokens, encoder batch {enc_batch} and context {ctx_dims:?}"
            )));
        }

        // [batch] → [batch, 1, embedding_dim + units]
        let embedded = self.embedding.forward(prev_token.reshape([batch, 1]));
        let input    = Tensor::cat(vec![embedded, prev_context.unsqueeze_dim::<3>(1)], 2);

        let (output, state) = self.rnn.forward(input, state, mode)?;
        let top = output.reshape([batch, self.units]);

        let attended = self.attention.forward(top.clone(), encoder_outputs.clone())?;
        let logits   = self
            .output
            .forward(Tensor::cat(vec![top, attended.context.clone()], 1));

        Ok(DecoderStep {
            logits,
            state,
            context:           attended.context,
            attention_weights: attended.weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    const UNITS: usize = 6;
    const VOCAB: usize = 11;

    fn decoder(num_layers: usize, method: AttentionMethod) -> Decoder<B> {
        DecoderConfig::new(VOCAB, 5, UNITS, num_layers, method).init(&Default::default())
    }

    fn encoder_outputs(batch: usize, src_len: usize) -> Tensor<B, 3> {
        Tensor::random([batch, src_len, UNITS], Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_step_preserves_layer_count_order_and_shape() {
        let device = Default::default();
        let dec    = decoder(3, AttentionMethod::General);
        let enc    = encoder_outputs(2, 4);
        let tokens = Tensor::<B, 1, Int>::from_ints([2, 2], &device);

        let state = RecurrentState::zeros(3, 2, UNITS, &device);
        let out = dec
            .step(tokens, state, &enc, dec.initial_context(2, &device), Mode::Eval)
            .unwrap();

        assert_eq!(out.logits.dims(), [2, VOCAB]);
        assert_eq!(out.context.dims(), [2, UNITS]);
        assert_eq!(out.attention_weights.dims(), [2, 4]);
        assert_eq!(out.state.num_layers(), 3);
        for layer in out.state.layers() {
            assert_eq!(layer.hidden.dims(), [2, UNITS]);
            assert_eq!(layer.cell.dims(), [2, UNITS]);
        }

        // the returned state is a valid input for the next step
        let next = dec
            .step(
                Tensor::<B, 1, Int>::from_ints([5, 6], &device),
                out.state,
                &enc,
                out.context,
                Mode::Eval,
            )
            .unwrap();
        assert_eq!(next.state.num_layers(), 3);
    }

    #[test]
    fn test_layers_are_not_reordered() {
        // Layer 0's new cell depends on layer 0's old state only,
        // so swapping the two layers' inputs must change it.
        let device = Default::default();
        let dec    = decoder(2, AttentionMethod::Dot);
        let enc    = encoder_outputs(1, 3);
        let token  = || Tensor::<B, 1, Int>::from_ints([4], &device);

        let layer = |v: f32| {
            crate::ml::recurrent::LayerState::new(
                Tensor::<B, 2>::full([1, UNITS], v, &device),
                Tensor::<B, 2>::full([1, UNITS], v, &device),
            )
        };
        let a = RecurrentState::from_layers(vec![layer(0.5), layer(-0.5)]);
        let b = RecurrentState::from_layers(vec![layer(-0.5), layer(0.5)]);

        let ctx = dec.initial_context(1, &device);
        let out_a = dec.step(token(), a, &enc, ctx.clone(), Mode::Eval).unwrap();
        let out_b = dec.step(token(), b, &enc, ctx, Mode::Eval).unwrap();

        let cell = |s: &RecurrentState<B>, i: usize| -> Vec<f32> {
            s.layers()[i].cell.clone().into_data().iter::<f32>().collect()
        };
        assert_ne!(cell(&out_a.state, 0), cell(&out_b.state, 0));
    }

    #[test]
    fn test_state_of_wrong_depth_is_rejected() {
        let device = Default::default();
        let dec    = decoder(2, AttentionMethod::Concat);
        let enc    = encoder_outputs(1, 3);
        let err = dec
            .step(
                Tensor::<B, 1, Int>::from_ints([2], &device),
                RecurrentState::zeros(4, 1, UNITS, &device),
                &enc,
                dec.initial_context(1, &device),
                Mode::Eval,
            )
            .unwrap_err();
        assert!(matches!(err, Seq2SeqError::InvalidInput(_)));
    }

    #[test]
    fn test_context_of_wrong_width_is_rejected() {
        let device = Default::default();
        let dec    = decoder(1, AttentionMethod::Dot);
        let enc    = encoder_outputs(1, 3);
        let result = dec.step(
            Tensor::<B, 1, Int>::from_ints([2], &device),
            RecurrentState::zeros(1, 1, UNITS, &device),
            &enc,
            Tensor::zeros([1, UNITS + 1], &device),
            Mode::Eval,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_encoder_outputs_are_rejected() {
        let device = Default::default();
        let dec    = decoder(1, AttentionMethod::Dot);
        let enc    = Tensor::<B, 3>::zeros([1, 0, UNITS], &device);
        let result = dec.step(
            Tensor::<B, 1, Int>::from_ints([2], &device),
            RecurrentState::zeros(1, 1, UNITS, &device),
            &enc,
            dec.initial_context(1, &device),
            Mode::Eval,
        );
        assert!(matches!(result, Err(Seq2SeqError::InvalidInput(_))));
    }
}
