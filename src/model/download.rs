// Model download helper for the HuggingFace hub.
//
// Fetches a portable BERTopic model in two steps:
// 1. The topic model repo itself: config.json, topics.json and
//    topic_embeddings.safetensors.
// 2. The sentence transformer named by config.json's "embedding_model",
//    as its ONNX export plus tokenizer, into the embedding/ subdirectory.
//
// Files that already exist are skipped, so an interrupted download can be
// resumed by running the command again.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::bertopic::{
    embedding_dir, model_files_present, read_json, BertopicConfig, CONFIG_FILE, TOPICS_FILE,
    TOPIC_EMBEDDINGS_FILE,
};
use super::embeddings::{MODEL_FILE, TOKENIZER_FILE};
use crate::config::Config;

/// Sentence transformer used when config.json doesn't name one.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Where sentence-transformers repos keep their ONNX export.
const EMBEDDING_ONNX_PATH: &str = "onnx/model.onnx";

/// Largest buffer reserved up front from a server's Content-Length.
const MAX_PREALLOC_BYTES: u64 = 16 * 1024 * 1024;

/// Build the download URL for a file in a hub repo.
pub fn hub_file_url(hub_url: &str, repo: &str, file: &str) -> String {
    format!("{}/{}/resolve/main/{}", hub_url.trim_end_matches('/'), repo, file)
}

/// Resolve a sentence transformer name to a hub repo.
///
/// BERTopic configs often store bare names like "all-MiniLM-L6-v2", which
/// live under the sentence-transformers organization.
pub fn embedding_repo(name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("sentence-transformers/{name}")
    }
}

/// Download every file the configured model needs into `config.model_dir`.
///
/// Shows progress bars for large files. Skips files that already exist.
pub async fn download_model(config: &Config) -> Result<()> {
    let dir = &config.model_dir;
    if model_files_present(dir) {
        info!("All model files present in {}", dir.display());
        println!("\nAll model files already present.");
        return Ok(());
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nTopic model ({}):", config.model_id);
    for (file, large) in [
        (CONFIG_FILE, false),
        (TOPICS_FILE, false),
        (TOPIC_EMBEDDINGS_FILE, true),
    ] {
        fetch_if_missing(
            &hub_file_url(&config.hub_url, &config.model_id, file),
            &dir.join(file),
            file,
            large,
        )
        .await?;
    }

    let bertopic: BertopicConfig = read_json(&dir.join(CONFIG_FILE))?;
    let embedding_model = config
        .embedding_model
        .clone()
        .or(bertopic.embedding_model)
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    let repo = embedding_repo(&embedding_model);

    println!("\nSentence embedding model ({repo}):");

    let embed_dir = embedding_dir(dir);
    std::fs::create_dir_all(&embed_dir).with_context(|| {
        format!(
            "Failed to create embedding model directory: {}",
            embed_dir.display()
        )
    })?;

    fetch_if_missing(
        &hub_file_url(&config.hub_url, &repo, TOKENIZER_FILE),
        &embed_dir.join(TOKENIZER_FILE),
        TOKENIZER_FILE,
        false,
    )
    .await?;
    fetch_if_missing(
        &hub_file_url(&config.hub_url, &repo, EMBEDDING_ONNX_PATH),
        &embed_dir.join(MODEL_FILE),
        MODEL_FILE,
        true,
    )
    .await?;

    Ok(())
}

async fn fetch_if_missing(url: &str, dest: &Path, label: &str, large: bool) -> Result<()> {
    if dest.exists() {
        info!("{} already exists, skipping", dest.display());
        println!("  {label} (already exists)");
        return Ok(());
    }
    println!("  Downloading {label}...");
    download_file(url, dest, large).await
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .context("Invalid progress bar template")?
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("    {spinner} {bytes}")
                        .context("Invalid progress bar template")?,
                );
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    // Buffer in memory and write once, so a failed download never leaves a
    // partial file that a later run would skip.
    let mut bytes = Vec::with_capacity(initial_capacity(response.content_length()));
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        bytes.extend_from_slice(&chunk);
        if let Some(ref pb) = pb {
            pb.set_position(bytes.len() as u64);
        }
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

/// Buffer to reserve before streaming a body; the server's size is a hint only.
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize
}
