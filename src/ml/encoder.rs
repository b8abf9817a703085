// ============================================================
// Layer 5: Encoder
// ============================================================
// Embeds the padded source ids and runs them through the
// stacked LSTM:
//
//   source [batch, src_len]
//     → embedding   [batch, src_len, embedding_dim]
//     → StackedLstm [batch, src_len, units] + final per-layer state
//
// <pad> positions are embedded and processed like any other
// token; nothing downstream masks them.

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::domain::error::{Seq2SeqError, Seq2SeqResult};
use crate::ml::recurrent::{Mode, RecurrentState, StackedLstm, StackedLstmConfig};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub units:         usize,
    pub num_layers:    usize,
    #[config(default = 0.0)]
    pub dropout:       f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        Encoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            rnn: StackedLstmConfig::new(self.embedding_dim, self.units, self.num_layers)
                .with_dropout(self.dropout)
                .init(device),
        }
    }
}

/// Source-side embedding table + stacked LSTM.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub rnn:       StackedLstm<B>,
}

/// Everything the decoder needs from one encoder pass.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// Top-layer hidden state per source position, [batch, src_len, units]
    pub outputs: Tensor<B, 3>,
    /// Final state of every layer
    pub state:   RecurrentState<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn units(&self) -> usize {
        self.rnn.units
    }

    pub fn num_layers(&self) -> usize {
        self.rnn.num_layers()
    }

    /// All-zero state for a batch, one entry per layer.
    pub fn initial_state(&self, batch: usize, device: &B::Device) -> RecurrentState<B> {
        RecurrentState::zeros(self.num_layers(), batch, self.units(), device)
    }

    /// [batch, src_len] ids → [batch, src_len, embedding_dim]
    pub fn embed(&self, source: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.embedding.forward(source)
    }

    /// Padding is not masked here: pad ids flow through the LSTMs like
    /// any other token, and the sequence length is the padded length.
    pub fn forward(
        &self,
        source:        Tensor<B, 2, Int>,
        initial_state: RecurrentState<B>,
        mode:          Mode,
    ) -> Seq2SeqResult<EncoderOutput<B>> {
        let [batch, src_len] = source.dims();
        if batch == 0 || src_len == 0 {
            return Err(Seq2SeqError::invalid_input(format!(
                "cannot encode an empty source batch [{batch}, {src_len}]"
            )));
        }

        let embedded        = self.embed(source);
        let (outputs, state) = self.rnn.forward(embedded, initial_state, mode)?;

        Ok(EncoderOutput { outputs, state })
    }
}
