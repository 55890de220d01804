// Portable BERTopic model — embedding-similarity topic prediction.
//
// A BERTopic model saved in its portable form (as published on the
// HuggingFace hub) carries no clustering model. New documents are assigned
// the topic whose centroid embedding is most similar to the document's
// sentence embedding. When the model has an outlier topic, row 0 of the
// centroid matrix is topic -1 and every other row shifts down by one.
//
// Directory layout:
//   config.json                   BERTopic config ("embedding_model")
//   topics.json                   topic metadata ("_outliers")
//   topic_embeddings.safetensors  [n_topics, dim] centroids
//   embedding/model.onnx          sentence transformer, ONNX export
//   embedding/tokenizer.json

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::embeddings::{cosine_similarity, SentenceEmbedder};
use super::topic_embeddings::{read_matrix, TOPIC_EMBEDDINGS_TENSOR};
use super::traits::{TopicAssignment, TopicModel};

pub const CONFIG_FILE: &str = "config.json";
pub const TOPICS_FILE: &str = "topics.json";
pub const TOPIC_EMBEDDINGS_FILE: &str = "topic_embeddings.safetensors";

/// Subdirectory holding the sentence transformer.
pub const EMBEDDING_DIR: &str = "embedding";

/// The subset of BERTopic's `config.json` we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BertopicConfig {
    /// Sentence transformer the model was fitted with, e.g.
    /// "sentence-transformers/all-MiniLM-L6-v2". Absent when the model was
    /// fitted with a custom embedding backend.
    #[serde(default)]
    pub embedding_model: Option<String>,
}

/// The subset of BERTopic's `topics.json` we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicsMetadata {
    /// 1 when topic -1 exists and occupies row 0 of the centroid matrix.
    #[serde(rename = "_outliers", default)]
    pub outliers: i64,
}

/// Path of the sentence transformer directory inside a model directory.
pub fn embedding_dir(model_dir: &Path) -> PathBuf {
    model_dir.join(EMBEDDING_DIR)
}

/// Check whether every file `BertopicModel::load` needs is present.
pub fn model_files_present(model_dir: &Path) -> bool {
    let embed_dir = embedding_dir(model_dir);
    [
        model_dir.join(CONFIG_FILE),
        model_dir.join(TOPICS_FILE),
        model_dir.join(TOPIC_EMBEDDINGS_FILE),
        embed_dir.join(super::embeddings::MODEL_FILE),
        embed_dir.join(super::embeddings::TOKENIZER_FILE),
    ]
    .iter()
    .all(|p| p.exists())
}

/// Read and parse a JSON file from the model directory.
pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Topic centroids plus the outlier offset — everything prediction needs
/// once a document has been embedded.
#[derive(Debug, Clone)]
pub struct TopicCentroids {
    embeddings: Vec<Vec<f32>>,
    outliers: i64,
}

impl TopicCentroids {
    pub fn new(embeddings: Vec<Vec<f32>>, outliers: i64) -> Result<Self> {
        let dim = embeddings
            .first()
            .map(Vec::len)
            .context("Topic model has no topic embeddings")?;
        if dim == 0 {
            anyhow::bail!("Topic embeddings have zero dimensions");
        }
        if !(0..=1).contains(&outliers) {
            anyhow::bail!("Invalid _outliers value {outliers} (expected 0 or 1)");
        }
        Ok(Self { embeddings, outliers })
    }

    pub fn dim(&self) -> usize {
        self.embeddings[0].len()
    }

    pub fn topic_count(&self) -> usize {
        self.embeddings.len()
    }

    /// Assign the most similar topic to one document embedding.
    ///
    /// Ties go to the lowest row, matching numpy's argmax.
    pub fn predict(&self, embedding: &[f32]) -> Result<TopicAssignment> {
        if embedding.len() != self.dim() {
            anyhow::bail!(
                "Document embedding has {} dimensions, topic embeddings have {}",
                embedding.len(),
                self.dim()
            );
        }

        let mut best_row = 0usize;
        let mut best_score = f64::NEG_INFINITY;
        for (row, centroid) in self.embeddings.iter().enumerate() {
            let score = cosine_similarity(embedding, centroid);
            if score > best_score {
                best_row = row;
                best_score = score;
            }
        }

        Ok(TopicAssignment {
            topic: best_row as i64 - self.outliers,
            score: best_score,
        })
    }
}

/// A loaded portable BERTopic model.
pub struct BertopicModel {
    embedder: SentenceEmbedder,
    centroids: TopicCentroids,
}

impl BertopicModel {
    /// Load a portable BERTopic model from `model_dir`.
    ///
    /// Fails if any file is missing or malformed; see the module docs for
    /// the expected layout.
    pub fn load(model_dir: &Path) -> Result<Self> {
        for file in [CONFIG_FILE, TOPICS_FILE, TOPIC_EMBEDDINGS_FILE] {
            let path = model_dir.join(file);
            if !path.exists() {
                anyhow::bail!(
                    "Topic model file not found: {}\nRun `topictag --download-model --` to download it.",
                    path.display()
                );
            }
        }

        let config: BertopicConfig = read_json(&model_dir.join(CONFIG_FILE))?;
        let topics: TopicsMetadata = read_json(&model_dir.join(TOPICS_FILE))?;
        let embeddings = read_matrix(
            &model_dir.join(TOPIC_EMBEDDINGS_FILE),
            TOPIC_EMBEDDINGS_TENSOR,
        )?;
        let centroids = TopicCentroids::new(embeddings, topics.outliers)?;
        let embedder = SentenceEmbedder::load(&embedding_dir(model_dir))?;

        debug!(
            topics = centroids.topic_count(),
            dim = centroids.dim(),
            outliers = topics.outliers,
            embedding_model = ?config.embedding_model,
            "Loaded BERTopic model from {}",
            model_dir.display()
        );

        Ok(Self { embedder, centroids })
    }
}

impl TopicModel for BertopicModel {
    fn transform(&self, documents: &[String]) -> Result<Vec<TopicAssignment>> {
        let embeddings = self.embedder.embed_batch(documents)?;
        embeddings
            .iter()
            .map(|embedding| self.centroids.predict(embedding))
            .collect()
    }
}
