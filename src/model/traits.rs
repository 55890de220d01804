// Topic model trait — swap-ready abstraction.
//
// The classifier only needs "documents in, topic IDs out". Keeping that
// behind a trait lets tests drive the classifier with a scripted model and
// leaves room for other topic model formats later.

use anyhow::Result;

/// Topic ID BERTopic reserves for documents that fit no topic.
pub const OUTLIER_TOPIC: i64 = -1;

/// The topic a model assigned to a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicAssignment {
    /// Cluster ID; may be `OUTLIER_TOPIC` or any other integer the model emits.
    pub topic: i64,
    /// Cosine similarity between the document and the winning topic.
    pub score: f64,
}

/// Trait for assigning topics to documents.
pub trait TopicModel {
    /// Assign a topic to each document, returning results in the same order.
    fn transform(&self, documents: &[String]) -> Result<Vec<TopicAssignment>>;
}
