// topictag: tag an article with a topic hashtag.
//
// This is the library root. The binary in main.rs is a thin CLI over
// `classifier::classify_article` and `model::bertopic::BertopicModel`.

pub mod classifier;
pub mod config;
pub mod model;
pub mod output;
