// ============================================================
// Layer 2: Translate Use Case
// ============================================================
// Loads config.json, both vocabularies and the latest
// checkpoint once, then serves translations either for a
// single sentence or in an interactive session:
//
//   > How are you?
//   Input: <s> how are you ? </s>
//   Predicted translation: <s> ¿ cómo estás ? </s>
//   >            ← empty line ends the session

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::domain::traits::{Translation, Translator};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::translator::{InferBackend, NeuralTranslator};

const PROMPT: &str = "> ";

pub struct TranslateUseCase {
    translator: NeuralTranslator<InferBackend>,
}

impl TranslateUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt       = CheckpointManager::open(checkpoint_dir)?;
        let device     = burn::backend::wgpu::WgpuDevice::default();
        let translator = NeuralTranslator::from_checkpoint(&ckpt, device)?;
        Ok(Self { translator })
    }

    pub fn translate(&self, sentence: &str) -> Result<Translation> {
        self.translator.translate(sentence)
    }

    pub fn max_output_len(&self) -> usize {
        self.translator.max_len_target()
    }

    /// Interactive loop over stdin/stdout.
    pub fn interactive(&self) -> Result<usize> {
        let stdin  = std::io::stdin();
        let stdout = std::io::stdout();
        run_session(&self.translator, stdin.lock(), stdout.lock())
    }
}

/// The two lines printed for every translated sentence.
pub fn format_translation(t: &Translation) -> String {
    format!("Input: {}\nPredicted translation: <s> {}", t.normalized_input, t.text())
}

/// Read sentences until EOF or an empty line; returns how many were
/// translated. A failed sentence is reported and the session goes on.
pub fn run_session<T, R, W>(translator: &T, input: R, mut output: W) -> Result<usize>
where
    T: Translator,
    R: BufRead,
    W: Write,
{
    let mut translated = 0usize;

    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line     = line?;
        let sentence = line.trim();
        if sentence.is_empty() {
            break;
        }

        match translator.translate(sentence) {
            Ok(t) => {
                writeln!(output, "{}", format_translation(&t))?;
                translated += 1;
            }
            Err(e) => {
                tracing::warn!("Translation failed: {e:#}");
                writeln!(output, "Error: {e:#}")?;
            }
        }

        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    tracing::debug!("Session ended after {} translation(s)", translated);
    Ok(translated)
}
