use burn::{
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::batcher::ids_to_tensor;
use crate::domain::error::{Seq2SeqError, Seq2SeqResult};
use crate::domain::tokens::{TokenId, PAD_ID, SPECIAL_TOKENS, START_ID};
use crate::ml::attention::AttentionMethod;
use crate::ml::decoder::{Decoder, DecoderConfig};
use crate::ml::encoder::{Encoder, EncoderConfig, EncoderOutput};
use crate::ml::recurrent::{Mode, RecurrentState};
use crate::ml::translator::greedy_decode;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally. Do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_input_size:  usize,
    pub vocab_target_size: usize,
    pub embedding_dim:     usize,
    pub units:             usize,
    pub method:            AttentionMethod,
    #[config(default = 4)]
    pub num_layers:        usize,
    #[config(default = 0.0)]
    pub dropout:           f64,
}

impl Seq2SeqConfig {
    /// Structural checks only; run before any weights are allocated.
    pub fn validate(&self) -> Seq2SeqResult<()> {
        let reserved = SPECIAL_TOKENS.len();
        if self.vocab_input_size < reserved || self.vocab_target_size < reserved {
            return Err(Seq2SeqError::invalid_config(format!(
                "vocabulary sizes ({}, {}) cannot hold the {reserved} reserved tokens",
                self.vocab_input_size, self.vocab_target_size
            )));
        }
        for (name, value) in [
            ("embedding_dim", self.embedding_dim),
            ("units", self.units),
            ("num_layers", self.num_layers),
        ] {
            if value == 0 {
                return Err(Seq2SeqError::invalid_config(format!("{name} must be positive")));
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Seq2SeqError::invalid_config(format!(
                "dropout {} is outside [0, 1)",
                self.dropout
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqResult<Seq2Seq<B>> {
        self.validate()?;

        let encoder = EncoderConfig::new(
            self.vocab_input_size, self.embedding_dim, self.units, self.num_layers,
        )
        .with_dropout(self.dropout)
        .init(device);

        let decoder = DecoderConfig::new(
            self.vocab_target_size, self.embedding_dim, self.units, self.num_layers, self.method,
        )
        .with_dropout(self.dropout)
        .init(device);

        Ok(Seq2Seq { encoder, decoder })
    }
}

#[derive(Module, Debug)]
pub struct Seq2Seq<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
}

/// Masked batch loss: the raw sum and its per-token average.
pub struct Seq2SeqLoss<B: Backend> {
    /// Summed masked cross-entropy; gradients flow from this
    pub total:       Tensor<B, 1>,
    /// `total` divided by `token_count`, for reporting
    pub loss:        Tensor<B, 1>,
    /// Non-pad target positions after <s>
    pub token_count: usize,
}

impl<B: Backend> Seq2Seq<B> {
    pub fn initial_state(&self, batch: usize, device: &B::Device) -> RecurrentState<B> {
        self.encoder.initial_state(batch, device)
    }

    pub fn encode(
        &self,
        source:        Tensor<B, 2, Int>,
        initial_state: RecurrentState<B>,
        mode:          Mode,
    ) -> Seq2SeqResult<EncoderOutput<B>> {
        self.encoder.forward(source, initial_state, mode)
    }

    /// Teacher-forced unroll over target positions 1..T.
    ///
    /// Step t is fed <s> at t = 1 and the true token at t-1 afterwards;
    /// returns one `[batch, vocab]` logits tensor per predicted position.
    pub fn forward_teacher_forced(
        &self,
        source:        Tensor<B, 2, Int>,
        target:        Tensor<B, 2, Int>,
        initial_state: RecurrentState<B>,
        mode:          Mode,
    ) -> Seq2SeqResult<Vec<Tensor<B, 2>>> {
        let [batch, tgt_len] = target.dims();
        if tgt_len < 2 {
            return Err(Seq2SeqError::invalid_input(format!(
                "target length {tgt_len} leaves nothing to predict after <s>"
            )));
        }
        let device = target.device();

        let EncoderOutput { outputs, state } = self.encode(source, initial_state, mode)?;
        let mut state   = state;
        let mut context = self.decoder.initial_context(batch, &device);
        let mut logits  = Vec::with_capacity(tgt_len - 1);

        for t in 1..tgt_len {
            let input = if t == 1 {
                Tensor::<B, 1, Int>::full([batch], START_ID as i64, &device)
            } else {
                target.clone().slice([0..batch, t - 1..t]).reshape([batch])
            };

            let step = self.decoder.step(input, state, &outputs, context, mode)?;
            state   = step.state;
            context = step.context;
            logits.push(step.logits);
        }

        Ok(logits)
    }

    /// Accumulated masked cross-entropy over all decode steps, plus the
    /// same sum divided by the number of real target tokens. Trailing
    /// padding changes neither.
    pub fn forward_loss(
        &self,
        source:        Tensor<B, 2, Int>,
        target:        Tensor<B, 2, Int>,
        initial_state: RecurrentState<B>,
        mode:          Mode,
    ) -> Seq2SeqResult<Seq2SeqLoss<B>> {
        let [batch, tgt_len] = target.dims();
        let logits = self.forward_teacher_forced(source, target.clone(), initial_state, mode)?;

        let mut total: Option<Tensor<B, 1>> = None;
        for (i, step_logits) in logits.into_iter().enumerate() {
            let t = i + 1;
            let gold = target.clone().slice([0..batch, t..t + 1]).reshape([batch]);
            let step_loss = masked_cross_entropy(step_logits, gold);
            total = Some(match total {
                Some(acc) => acc + step_loss,
                None => step_loss,
            });
        }
        let total = total.ok_or_else(|| Seq2SeqError::invalid_input("no decode steps"))?;

        let token_count = target
            .slice([0..batch, 1..tgt_len])
            .equal_elem(PAD_ID as i64)
            .bool_not()
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>() as usize;

        let loss = total.clone() / (token_count.max(1) as f64);
        Ok(Seq2SeqLoss { total, loss, token_count })
    }

    /// Greedy decode of one sentence. Output ends with </s> when the
    /// model emits it before `max_output_len` tokens.
    pub fn translate(
        &self,
        source_ids:     &[TokenId],
        max_output_len: usize,
        device:         &B::Device,
    ) -> Seq2SeqResult<Vec<TokenId>> {
        if source_ids.is_empty() {
            return Err(Seq2SeqError::invalid_input("cannot translate an empty sentence"));
        }

        let source = ids_to_tensor::<B>(&[source_ids], device);
        let EncoderOutput { outputs, state } =
            self.encode(source, self.initial_state(1, device), Mode::Eval)?;

        let mut state   = state;
        let mut context = self.decoder.initial_context(1, device);

        greedy_decode(max_output_len, |prev| {
            let token = Tensor::<B, 1, Int>::from_ints([prev as i32], device);
            let step  = self.decoder.step(token, state.clone(), &outputs, context.clone(), Mode::Eval)?;
            state   = step.state;
            context = step.context;
            Ok(argmax_token(step.logits))
        })
    }
}

/// Sum over the batch of -log p(gold), with <pad> golds contributing 0.
///
/// logits: [batch, vocab], gold: [batch] → [1]
pub fn masked_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    gold:   Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    let mask = gold.clone().equal_elem(PAD_ID as i64).bool_not().float();

    let picked = log_softmax(logits, 1)
        .gather(1, gold.reshape([batch, 1]))
        .reshape([batch]);

    (picked.neg() * mask).sum()
}

/// Highest-scoring id of a single-row logits tensor.
fn argmax_token<B: Backend>(logits: Tensor<B, 2>) -> TokenId {
    logits.argmax(1).into_scalar().elem::<i64>() as TokenId
}
