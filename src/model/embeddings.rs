// Sentence embeddings via a local ONNX sentence transformer.
//
// BERTopic embeds a new document with the same sentence transformer it was
// fitted with, then compares that vector against each topic's centroid. The
// transformer runs here through ONNX Runtime; mean pooling over the
// attention mask reproduces sentence-transformers' pooling layer.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

/// Longest token sequence fed to the transformer. Matches the
/// `max_seq_length` sentence-transformers uses for the MiniLM family.
pub const MAX_SEQ_LEN: usize = 256;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Sentence embedder using a local ONNX model.
pub struct SentenceEmbedder {
    // ort::Session::run takes &mut self; the embedder is shared by reference.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    /// Whether the ONNX graph declares a `token_type_ids` input.
    token_type_ids: bool,
    pad_id: i64,
}

impl SentenceEmbedder {
    /// Load the sentence embedding model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `topictag --download-model --` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `topictag --download-model --` to download it.",
                tokenizer_path.display()
            );
        }

        let environment = ort::init()
            .build()
            .context("Failed to initialize ONNX Runtime")?;
        let session = Session::builder(&environment)
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;
        let token_type_ids = takes_token_type_ids(session.inputs().iter().map(|i| i.name()));

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id as i64)
            .unwrap_or(0);

        debug!(
            token_type_ids,
            pad_id,
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            token_type_ids,
            pad_id,
        })
    }

    /// Embed a batch of texts, one mean-pooled vector per text.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings: Vec<_> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        if max_len == 0 {
            anyhow::bail!("Tokenizer produced no tokens for any input");
        }

        // Right-pad every row to max_len; padding is masked out of pooling.
        let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for enc in &encodings {
            let ids = enc.get_ids();
            let pad_len = max_len - ids.len();

            input_ids_flat.extend(ids.iter().map(|&id| id as i64));
            attention_mask_flat.extend(enc.get_attention_mask().iter().map(|&m| m as i64));
            input_ids_flat.extend(std::iter::repeat_n(self.pad_id, pad_len));
            attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
        }

        let shape = [batch_size as i64, max_len as i64];

        let input_ids_tensor = Tensor::from_array((shape, input_ids_flat))
            .context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
            .context("Failed to create attention_mask tensor")?;

        // Output 0 is last_hidden_state: [batch, seq_len, dim]
        let (hidden_shape, hidden_states) = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

            let outputs = (if self.token_type_ids {
                let token_type_ids_tensor =
                    Tensor::from_array((shape, vec![0i64; batch_size * max_len]))
                        .context("Failed to create token_type_ids tensor")?;
                session.run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => token_type_ids_tensor
                })
            } else {
                session.run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor
                })
            })
            .context("Embedding ONNX inference failed")?;

            let (out_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract embedding output tensor")?;

            (out_shape.to_vec(), data.to_vec())
        };

        let dim = match hidden_shape.as_slice() {
            &[b, s, d] if b as usize == batch_size && s as usize == max_len => d as usize,
            other => anyhow::bail!("Unexpected embedding output shape {other:?}"),
        };

        let embeddings = mean_pool(&hidden_states, &attention_mask_flat, batch_size, max_len, dim);

        debug!(batch_size, dim, "Computed sentence embeddings");

        Ok(embeddings)
    }
}

/// BERT-style exports take `token_type_ids`; RoBERTa/XLM-R exports don't.
/// Only feed it when the graph asks for it, since unknown inputs fail the run.
pub fn takes_token_type_ids<'a>(input_names: impl IntoIterator<Item = &'a str>) -> bool {
    input_names.into_iter().any(|name| name == "token_type_ids")
}

/// Average token embeddings per row, weighted by the attention mask.
///
/// `hidden_states` is a flattened `[batch, seq_len, dim]` tensor and
/// `attention_mask` a flattened `[batch, seq_len]` one. Rows whose mask is
/// all zeros come back as zero vectors.
pub fn mean_pool(
    hidden_states: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    dim: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0_f64; dim];
        let mut mask_sum = 0.0_f64;

        for j in 0..seq_len {
            let mask_val = attention_mask[i * seq_len + j] as f64;
            if mask_val > 0.0 {
                mask_sum += mask_val;
                let offset = (i * seq_len + j) * dim;
                for (k, acc) in sum.iter_mut().enumerate() {
                    *acc += hidden_states[offset + k] as f64 * mask_val;
                }
            }
        }

        if mask_sum > 0.0 {
            for val in &mut sum {
                *val /= mask_sum;
            }
        }

        embeddings.push(sum.into_iter().map(|v| v as f32).collect());
    }

    embeddings
}

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Mismatched lengths, empty vectors and zero vectors give 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum();
    let mag_a: f64 = a.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bert_inputs_take_token_type_ids() {
        assert!(takes_token_type_ids([
            "input_ids",
            "attention_mask",
            "token_type_ids"
        ]));
    }

    #[test]
    fn test_xlmr_inputs_skip_token_type_ids() {
        assert!(!takes_token_type_ids(["input_ids", "attention_mask"]));
    }

    #[test]
    fn test_token_type_ids_match_is_exact() {
        assert!(!takes_token_type_ids(["input_ids", "token_type_ids_0"]));
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // One row, three tokens of dim 2; the last token is padding.
        let hidden = vec![1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let mask = vec![1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 1, 3, 2);
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn test_mean_pool_batch_rows_are_independent() {
        let hidden = vec![
            1.0, 1.0, 3.0, 3.0, // row 0
            5.0, 7.0, 0.0, 0.0, // row 1 (second token padded)
        ];
        let mask = vec![1, 1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 2, 2, 2);
        assert_eq!(pooled, vec![vec![2.0, 2.0], vec![5.0, 7.0]]);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let pooled = mean_pool(&[3.0, 4.0], &[0], 1, 1, 2);
        assert_eq!(pooled, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn test_cosine_identical() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_is_negative() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_cosine_mismatched_dimensions() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }
}
