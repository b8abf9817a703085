// ============================================================
// Layer 4: Word-level Vocabulary
// ============================================================
// A bidirectional token <-> id table for one language, backed by
// a HuggingFace `tokenizers` WordLevel model so it can be saved
// and reloaded in the standard tokenizer.json format.
//
// Id layout:
//   0 <pad>   1 <unk>   2 <s>   3 </s>   4.. corpus words
//
// Corpus words are ordered by descending frequency, ties broken
// alphabetically so the same corpus always yields the same ids.
//
// Any word missing from the table encodes to <unk>. That is a
// silent substitution, never an error.

use anyhow::Result;
use std::collections::HashMap;
use std::str::FromStr;
use tokenizers::Tokenizer;

use crate::domain::error::Seq2SeqError;
use crate::domain::tokens::{TokenId, SPECIAL_TOKENS, UNK_ID, UNK_TOKEN};

#[derive(Debug)]
pub struct Vocabulary {
    tokenizer: Tokenizer,
    size:      usize,
}

impl Vocabulary {
    /// Count whitespace tokens over normalised sentences and build
    /// the tokenizer. Marker tokens in the text are not double counted.
    pub fn build<'a, I>(sentences: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut freq: HashMap<&'a str, usize> = HashMap::new();
        for sentence in sentences {
            for word in sentence.split_whitespace() {
                if SPECIAL_TOKENS.iter().any(|(tok, _)| *tok == word) {
                    continue;
                }
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(&str, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut vocab = serde_json::Map::new();
        for (tok, id) in SPECIAL_TOKENS {
            vocab.insert(tok.to_string(), serde_json::json!(id));
        }
        let mut next_id = SPECIAL_TOKENS.len();
        for (word, _) in &words {
            vocab.insert(word.to_string(), serde_json::json!(next_id));
            next_id += 1;
        }

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .map(|(tok, id)| {
                serde_json::json!({
                    "id": id, "content": tok, "single_word": false,
                    "lstrip": false, "rstrip": false,
                    "normalized": false, "special": true
                })
            })
            .collect();

        // Text is normalised before it reaches the tokenizer, so the
        // only pre-tokenisation step is a plain whitespace split.
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build word-level tokenizer: {e}"))?;

        tracing::debug!("Built vocabulary with {} entries", next_id);
        Self::from_tokenizer(tokenizer)
    }

    /// Wrap an existing tokenizer, checking that the reserved ids
    /// sit where the model expects them.
    pub fn from_tokenizer(tokenizer: Tokenizer) -> Result<Self> {
        for (tok, id) in SPECIAL_TOKENS {
            match tokenizer.token_to_id(tok) {
                Some(found) if found == id => {}
                Some(found) => {
                    return Err(Seq2SeqError::invalid_config(format!(
                        "vocabulary maps '{tok}' to {found}, expected {id}"
                    ))
                    .into())
                }
                None => {
                    return Err(Seq2SeqError::invalid_config(format!(
                        "vocabulary is missing reserved token '{tok}'"
                    ))
                    .into())
                }
            }
        }
        let size = tokenizer.get_vocab_size(false);
        Ok(Self { tokenizer, size })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Number of ids, i.e. the embedding / output-layer width.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Encode a normalised sentence. Unknown words become <unk>.
    pub fn encode(&self, sentence: &str) -> Result<Vec<TokenId>> {
        let encoding = self
            .tokenizer
            .encode(sentence, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    pub fn token_to_id(&self, token: &str) -> TokenId {
        self.tokenizer.token_to_id(token).unwrap_or(UNK_ID)
    }

    pub fn id_to_token(&self, id: TokenId) -> String {
        self.tokenizer
            .id_to_token(id)
            .unwrap_or_else(|| UNK_TOKEN.to_string())
    }

    pub fn decode(&self, ids: &[TokenId]) -> Vec<String> {
        ids.iter().map(|&id| self.id_to_token(id)).collect()
    }
}
