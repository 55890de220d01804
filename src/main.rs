use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use topictag::classifier::classify_article;
use topictag::config::Config;
use topictag::model::bertopic::BertopicModel;
use topictag::model::download::download_model;
use topictag::output::{print_json, ErrorResponse, TagsResponse};

/// topictag: tag an article with a topic hashtag.
///
/// Prints `{"tags": ["#<tag>"]}` on stdout. Meant to be spawned by another
/// process with the article text as the only argument. A lone argument is
/// always the article, even one that looks like a flag; to use a flag on its
/// own, follow it with `--` (e.g. `topictag --download-model --`).
#[derive(Debug, Parser)]
#[command(name = "topictag", version, about)]
struct Cli {
    /// Directory containing the topic model files
    /// (default: TOPICTAG_MODEL_DIR, then the platform data directory)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Download the configured topic model and exit
    #[arg(long)]
    download_model: bool,

    /// The article text to classify. Anything after it is ignored.
    #[arg(
        value_name = "ARTICLE_TEXT",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    article: Vec<String>,
}

impl Cli {
    /// Parse a full argv (program name first). A single argument is taken as
    /// the article verbatim and never reaches the flag parser.
    fn from_argv(argv: Vec<OsString>) -> Self {
        if let [_, article] = argv.as_slice() {
            return Self {
                model_dir: None,
                download_model: false,
                article: vec![article.to_string_lossy().into_owned()],
            };
        }
        Self::parse_from(argv)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries only the JSON response.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("topictag=warn")),
        )
        .init();

    let cli = Cli::from_argv(std::env::args_os().collect());
    let config = Config::load().with_model_dir(cli.model_dir.as_deref());

    if cli.download_model {
        println!("Downloading topic model {}...", config.model_id);
        println!("  Destination: {}", config.model_dir.display());
        download_model(&config).await?;
        println!("\nModel downloaded successfully.");
        return Ok(());
    }

    let Some(article) = cli.article.into_iter().next() else {
        print_json(&ErrorResponse::missing_content())?;
        std::process::exit(1);
    };

    let model = BertopicModel::load(&config.model_dir)
        .with_context(|| format!("Error loading model {}", config.model_id))?;
    info!("Loaded topic model {}", config.model_id);

    let tags = classify_article(&model, &article);
    print_json(&TagsResponse { tags })?;

    Ok(())
}
