// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `translate`, and
// all their flags. Attention method and optimizer names are
// parsed through their FromStr impls.

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::attention::AttentionMethod;
use crate::ml::optim::OptimizerKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the translation model on a parallel corpus
    Train(TrainArgs),

    /// Translate sentences with a trained checkpoint
    Translate(TranslateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing train.{source_lang} and train.{target_lang}
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Source language file suffix
    #[arg(long, default_value = "en")]
    pub source_lang: String,

    /// Target language file suffix
    #[arg(long, default_value = "es")]
    pub target_lang: String,

    /// Root directory; each run writes into a new run_* subdirectory
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Drop pairs longer than this many tokens (markers included)
    #[arg(long)]
    pub max_len: Option<usize>,

    /// Use at most this many sentence pairs
    #[arg(long)]
    pub limit: Option<usize>,

    /// Fraction of pairs held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub dev_split: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 256)]
    pub embedding_dim: usize,

    /// Recurrent hidden width, also the attention context width
    #[arg(long, default_value_t = 512)]
    pub units: usize,

    /// Stacked recurrent layers in both encoder and decoder
    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    /// Attention scoring: dot, general or concat
    #[arg(long, default_value_t = AttentionMethod::General)]
    pub method: AttentionMethod,

    /// Dropout on recurrent layer inputs while training
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// adam, sgd, rmsprop or adagrad
    #[arg(long, default_value_t = OptimizerKind::Adam)]
    pub optimizer: OptimizerKind,

    /// Seed for the train/validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            source_lang:    a.source_lang,
            target_lang:    a.target_lang,
            checkpoint_dir: a.checkpoint_dir,
            max_len:        a.max_len,
            limit:          a.limit,
            dev_split:      a.dev_split,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            learning_rate:  a.learning_rate,
            embedding_dim:  a.embedding_dim,
            units:          a.units,
            num_layers:     a.num_layers,
            method:         a.method,
            dropout:        a.dropout,
            optimizer:      a.optimizer,
            seed:           a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// A run directory, or the root (the newest checkpointed run is used)
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Translate this sentence and exit instead of starting a session
    #[arg(long)]
    pub sentence: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_flags_reach_config() {
        let cli = Cli::try_parse_from([
            "nmt-attention", "train",
            "--method", "concat",
            "--optimizer", "rmsprop",
            "--num-layers", "2",
            "--max-len", "30",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.method, AttentionMethod::Concat);
        assert_eq!(cfg.optimizer, OptimizerKind::RmsProp);
        assert_eq!(cfg.num_layers, 2);
        assert_eq!(cfg.max_len, Some(30));
        assert_eq!(cfg.source_lang, "en");
    }

    #[test]
    fn test_unknown_method_is_a_parse_error() {
        assert!(Cli::try_parse_from(["nmt-attention", "train", "--method", "bahdanau"]).is_err());
    }

    #[test]
    fn test_translate_defaults_to_interactive() {
        let cli = Cli::try_parse_from(["nmt-attention", "translate"]).unwrap();
        let Commands::Translate(args) = cli.command else {
            panic!("expected translate");
        };
        assert!(args.sentence.is_none());
        assert_eq!(args.checkpoint_dir, "checkpoints");
    }
}
