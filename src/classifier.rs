// Article classification — one topic, one tag.
//
// The model assigns a topic ID; a fixed table turns the first five topic
// IDs into hashtags and everything else (including the outlier topic -1)
// into the generic tag.

use tracing::{debug, error};

use crate::model::traits::TopicModel;

/// Tag for topics outside the table.
pub const DEFAULT_TAG: &str = "#general";

/// Tags for topic IDs 0..=4, indexed by topic ID.
pub const TOPIC_TAGS: [&str; 5] = ["#science", "#sports", "#history", "#art", "#technology"];

/// Map a topic ID to its tag.
pub fn tag_for_topic(topic: i64) -> &'static str {
    usize::try_from(topic)
        .ok()
        .and_then(|i| TOPIC_TAGS.get(i))
        .copied()
        .unwrap_or(DEFAULT_TAG)
}

/// Classify one article into at most one tag.
///
/// The content is passed to the model unchanged, empty or not. Inference
/// errors are logged and produce an empty list; the caller still gets a
/// well-formed response.
pub fn classify_article(model: &dyn TopicModel, content: &str) -> Vec<String> {
    let assignments = match model.transform(&[content.to_string()]) {
        Ok(assignments) => assignments,
        Err(e) => {
            error!("Error during classification: {e:#}");
            return Vec::new();
        }
    };

    let Some(assignment) = assignments.first() else {
        error!("Error during classification: model returned no topic");
        return Vec::new();
    };

    let tag = tag_for_topic(assignment.topic);
    debug!(
        topic = assignment.topic,
        score = assignment.score,
        tag,
        "Classified article"
    );

    vec![tag.to_string()]
}
