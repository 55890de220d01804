// Topic model — loading, embedding and prediction.
//
// `traits::TopicModel` is the seam the classifier talks to. The only real
// implementation is the portable BERTopic model in `bertopic`, which embeds
// documents locally with an ONNX sentence transformer.

pub mod bertopic;
pub mod download;
pub mod embeddings;
pub mod topic_embeddings;
pub mod traits;
