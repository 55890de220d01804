use std::env;
use std::path::{Path, PathBuf};

/// HuggingFace hub repo of the default topic model.
pub const DEFAULT_MODEL_ID: &str = "RenatoBarreira/BERT-VI";

/// HuggingFace hub base URL.
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hub identifier of the topic model (TOPICTAG_MODEL_ID)
    pub model_id: String,
    /// Directory containing the model files (TOPICTAG_MODEL_DIR)
    pub model_dir: PathBuf,
    /// Hub base URL used by `--download-model` (TOPICTAG_HUB_URL)
    pub hub_url: String,
    /// Sentence transformer to download instead of the one named in the
    /// model's config.json (TOPICTAG_EMBEDDING_MODEL)
    pub embedding_model: Option<String>,
}

impl Config {
    /// Load configuration from environment variables. Every setting has a
    /// default, so this never fails.
    pub fn load() -> Self {
        let model_id = env::var("TOPICTAG_MODEL_ID")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let model_dir = env::var("TOPICTAG_MODEL_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_model_dir(&model_id));

        Self {
            model_id,
            model_dir,
            hub_url: env::var("TOPICTAG_HUB_URL")
                .unwrap_or_else(|_| DEFAULT_HUB_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            embedding_model: env::var("TOPICTAG_EMBEDDING_MODEL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Replace the model directory, e.g. from a command-line flag.
    pub fn with_model_dir(mut self, dir: Option<&Path>) -> Self {
        if let Some(dir) = dir {
            self.model_dir = dir.to_path_buf();
        }
        self
    }
}

/// Returns the default directory for a model's files.
/// Uses the platform data directory: ~/.local/share/topictag/models/<id>/ on Linux.
pub fn default_model_dir(model_id: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("topictag")
        .join("models")
        .join(model_dir_name(model_id))
}

/// Filesystem-safe directory name for a hub identifier ("org/name" -> "org--name").
pub fn model_dir_name(model_id: &str) -> String {
    model_id.replace('/', "--")
}
