// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
// Two commands are supported:
//   1. `train`     : trains on a parallel corpus, writes checkpoints
//   2. `translate` : restores the latest checkpoint and translates

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, TranslateArgs};

use crate::application::translate_use_case::format_translation;

#[derive(Parser, Debug)]
#[command(
    name = "nmt-attention",
    version,
    about = "Train an attention-based encoder-decoder translator, then translate with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; the CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!(
        "Starting training on '{}' ({} → {})",
        args.data_dir, args.source_lang, args.target_lang
    );

    let report  = TrainUseCase::new(args.into()).execute()?;
    let run_dir = report
        .run_dir
        .as_ref()
        .map_or_else(String::new, |dir| dir.display().to_string());

    match (report.best_epoch, report.best_loss) {
        (Some(epoch), Some(loss)) => println!(
            "Training complete. Best loss {loss:.4} at epoch {epoch}; {} checkpoint(s) in '{run_dir}'.",
            report.checkpoints()
        ),
        _ => println!("Training complete, but no epoch produced a finite loss; nothing was checkpointed."),
    }
    if report.non_finite_batches() > 0 {
        println!("Warning: {} batch(es) had a non-finite loss.", report.non_finite_batches());
    }
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let use_case = TranslateUseCase::new(&args.checkpoint_dir)?;

    match args.sentence {
        Some(sentence) => {
            let translation = use_case.translate(&sentence)?;
            println!("{}", format_translation(&translation));
        }
        None => {
            println!(
                "Type a sentence to translate (at most {} output tokens); an empty line quits.",
                use_case.max_output_len()
            );
            let n = use_case.interactive()?;
            tracing::info!("Translated {} sentence(s)", n);
        }
    }
    Ok(())
}
