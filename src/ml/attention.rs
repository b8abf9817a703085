// ============================================================
// Layer 5: Attention Layer (Luong-style global attention)
// ============================================================
// Scores every encoder timestep against the decoder's current
// top-layer hidden state, normalises the scores with a softmax
// over source positions, and returns the weighted sum of encoder
// outputs as the context vector.
//
// Scoring methods, with h_t the decoder state and h_s one
// encoder output (both of width `units`):
//
//   dot      score = h_t · h_s
//   general  score = h_t · (W_a h_s)
//   concat   score = v_a · tanh(W_a [h_t ; h_s])
//
// Only the weights the chosen method needs are allocated, so the
// record on disk also encodes which method was trained.
//
// Reference: Luong et al. (2015) §3.1, global attention scores

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::{Seq2SeqError, Seq2SeqResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionMethod {
    Dot,
    General,
    Concat,
}

impl FromStr for AttentionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "general" => Ok(Self::General),
            "concat" => Ok(Self::Concat),
            _ => Err(format!(
                "unknown attention method: {s:?} (expected \"dot\", \"general\" or \"concat\")"
            )),
        }
    }
}

impl fmt::Display for AttentionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dot => "dot",
            Self::General => "general",
            Self::Concat => "concat",
        };
        f.write_str(name)
    }
}

#[derive(Config, Debug)]
pub struct AttentionConfig {
    pub units:  usize,
    pub method: AttentionMethod,
}

impl AttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentionLayer<B> {
        let (general, concat, score) = match self.method {
            AttentionMethod::Dot => (None, None, None),
            AttentionMethod::General => (
                Some(LinearConfig::new(self.units, self.units).with_bias(false).init(device)),
                None,
                None,
            ),
            AttentionMethod::Concat => (
                None,
                Some(LinearConfig::new(2 * self.units, self.units).init(device)),
                Some(LinearConfig::new(self.units, 1).with_bias(false).init(device)),
            ),
        };
        AttentionLayer { general, concat, score, units: self.units }
    }
}

#[derive(Module, Debug)]
pub struct AttentionLayer<B: Backend> {
    /// W_a for `general`
    pub general: Option<Linear<B>>,
    /// W_a for `concat`
    pub concat:  Option<Linear<B>>,
    /// v_a for `concat`
    pub score:   Option<Linear<B>>,
    pub units:   usize,
}

/// Context vector `[batch, units]` and weights `[batch, src_len]`.
#[derive(Debug, Clone)]
pub struct AttentionOutput<B: Backend> {
    pub context: Tensor<B, 2>,
    pub weights: Tensor<B, 2>,
}

impl<B: Backend> AttentionLayer<B> {
    /// hidden: [batch, units], encoder_outputs: [batch, src_len, units]
    pub fn forward(
        &self,
        hidden:          Tensor<B, 2>,
        encoder_outputs: Tensor<B, 3>,
    ) -> Seq2SeqResult<AttentionOutput<B>> {
        let [batch, src_len, units] = encoder_outputs.dims();
        let [h_batch, h_units]      = hidden.dims();

        if src_len == 0 || batch == 0 {
            return Err(Seq2SeqError::invalid_input(
                "attention over an empty encoder output sequence",
            ));
        }
        if h_batch != batch || h_units != units || units != self.units {
            return Err(Seq2SeqError::invalid_input(format!(
                "decoder hidden [{h_batch}, {h_units}] does not match encoder outputs \
                 [{batch}, {src_len}, {units}] (attention width {})",
                self.units
            )));
        }

        let scores  = self.scores(hidden, encoder_outputs.clone());
        let weights = softmax(scores, 1);

        // [batch, 1, src_len] × [batch, src_len, units] → [batch, 1, units]
        let context = weights
            .clone()
            .unsqueeze_dim::<3>(1)
            .matmul(encoder_outputs)
            .reshape([batch, units]);

        Ok(AttentionOutput { context, weights })
    }

    /// Unnormalised compatibility scores, [batch, src_len].
    fn scores(&self, hidden: Tensor<B, 2>, encoder_outputs: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, src_len, units] = encoder_outputs.dims();

        match (&self.general, &self.concat, &self.score) {
            (Some(w), _, _) => w
                .forward(encoder_outputs)
                .matmul(hidden.unsqueeze_dim::<3>(2))
                .reshape([batch, src_len]),
            (None, Some(w), Some(v)) => {
                let h = hidden
                    .unsqueeze_dim::<3>(1)
                    .expand([batch, src_len, units]);
                let energy = tanh(w.forward(Tensor::cat(vec![h, encoder_outputs], 2)));
                v.forward(energy).reshape([batch, src_len])
            }
            _ => encoder_outputs
                .matmul(hidden.unsqueeze_dim::<3>(2))
                .reshape([batch, src_len]),
        }
    }
}
