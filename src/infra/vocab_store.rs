// ============================================================
// Layer 6: Vocabulary Store
// ============================================================
// Persists each side's Vocabulary as a HuggingFace tokenizer
// JSON (WordLevel model) next to the checkpoints:
//
//   checkpoints/vocab.en.json
//   checkpoints/vocab.es.json
//
// Training always rebuilds the vocabularies from the corpus
// and overwrites these files; inference only loads them.

use anyhow::Result;
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::data::vocab::Vocabulary;
use crate::domain::error::Seq2SeqError;

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, lang: &str) -> PathBuf {
        self.dir.join(format!("vocab.{lang}.json"))
    }

    pub fn save(&self, lang: &str, vocab: &Vocabulary) -> Result<()> {
        let path = self.path(lang);
        vocab.tokenizer().save(&path, true).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("cannot write vocabulary '{}': {e}", path.display()))
        })?;
        tracing::info!("Saved {} vocabulary ({} tokens) to '{}'", lang, vocab.size(), path.display());
        Ok(())
    }

    pub fn load(&self, lang: &str) -> Result<Vocabulary> {
        let path = self.path(lang);
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("cannot load vocabulary '{}': {e}", path.display()))
        })?;
        let vocab = Vocabulary::from_tokenizer(tokenizer)?;
        tracing::debug!("Loaded {} vocabulary ({} tokens)", lang, vocab.size());
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_vocabulary_loads_with_same_ids() {
        let dir = std::env::temp_dir().join(format!("nmt_vocab_store_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = VocabStore::new(&dir);

        let vocab = Vocabulary::build(["<s> hola mundo . </s>", "<s> hola amigo </s>"]).unwrap();
        store.save("es", &vocab).unwrap();
        assert!(dir.join("vocab.es.json").exists());

        let loaded = store.load("es").unwrap();
        assert_eq!(loaded.size(), vocab.size());
        for word in ["hola", "mundo", "amigo", ".", "<s>", "</s>", "<pad>"] {
            assert_eq!(loaded.token_to_id(word), vocab.token_to_id(word), "{word}");
        }
        assert_eq!(
            loaded.encode("<s> hola desconocido </s>").unwrap(),
            vocab.encode("<s> hola desconocido </s>").unwrap(),
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_checkpoint_io() {
        let store = VocabStore::new(std::env::temp_dir().join("nmt_vocab_store_absent"));
        let err = store.load("xx").unwrap_err();
        assert!(matches!(err.downcast_ref::<Seq2SeqError>(), Some(Seq2SeqError::CheckpointIo(_))));
    }
}
