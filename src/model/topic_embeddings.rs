// Topic centroid matrix stored in BERTopic's topic_embeddings.safetensors.
//
// BERTopic writes a single 2-D tensor named "topic_embeddings", one row per
// topic. Depending on how the model was fitted it is F32 or F64; rows come
// back as f32 either way, matching the sentence embedder's output.

use std::path::Path;

use anyhow::{Context, Result};
use safetensors::{Dtype, SafeTensors};

/// Name of the tensor BERTopic stores topic centroids under.
pub const TOPIC_EMBEDDINGS_TENSOR: &str = "topic_embeddings";

/// Read the named 2-D tensor from a safetensors file as rows of f32.
pub fn read_matrix(path: &Path, name: &str) -> Result<Vec<Vec<f32>>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_matrix(&bytes, name)
        .with_context(|| format!("Invalid safetensors file {}", path.display()))
}

/// Parse the named 2-D tensor out of an in-memory safetensors buffer.
pub fn parse_matrix(bytes: &[u8], name: &str) -> Result<Vec<Vec<f32>>> {
    let tensors = SafeTensors::deserialize(bytes).context("Malformed safetensors data")?;
    let view = tensors
        .tensor(name)
        .with_context(|| format!("Tensor '{name}' not found"))?;

    let (rows, cols) = match view.shape() {
        &[rows, cols] => (rows, cols),
        other => anyhow::bail!("Tensor '{name}' must be 2-D, got shape {other:?}"),
    };
    if rows == 0 || cols == 0 {
        anyhow::bail!("Tensor '{name}' is empty (shape {rows}x{cols})");
    }

    let values: Vec<f32> = match view.dtype() {
        Dtype::F32 => view
            .data()
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        Dtype::F64 => view
            .data()
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                f64::from_le_bytes(b) as f32
            })
            .collect(),
        other => anyhow::bail!("Unsupported dtype {other:?} for tensor '{name}'"),
    };

    Ok(values.chunks_exact(cols).map(<[f32]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(header: &str, data: &[u8]) -> Vec<u8> {
        let mut out = (header.len() as u64).to_le_bytes().to_vec();
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_parse_f32_matrix() {
        let data = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let header = r#"{"__metadata__":{"format":"pt"},"topic_embeddings":{"dtype":"F32","shape":[3,2],"data_offsets":[0,24]}}"#;
        let matrix = parse_matrix(&build(header, &data), TOPIC_EMBEDDINGS_TENSOR).unwrap();
        assert_eq!(matrix, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
    }

    #[test]
    fn test_parse_f64_matrix() {
        let data: Vec<u8> = [0.5f64, -1.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        let header = r#"{"topic_embeddings":{"dtype":"F64","shape":[1,2],"data_offsets":[0,16]}}"#;
        let matrix = parse_matrix(&build(header, &data), TOPIC_EMBEDDINGS_TENSOR).unwrap();
        assert_eq!(matrix, vec![vec![0.5, -1.5]]);
    }

    #[test]
    fn test_rejects_missing_tensor() {
        let header = r#"{"something_else":{"dtype":"F32","shape":[1,1],"data_offsets":[0,4]}}"#;
        let err = parse_matrix(&build(header, &f32_bytes(&[1.0])), TOPIC_EMBEDDINGS_TENSOR)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_rejects_non_2d_shape() {
        let header = r#"{"topic_embeddings":{"dtype":"F32","shape":[2],"data_offsets":[0,8]}}"#;
        assert!(
            parse_matrix(&build(header, &f32_bytes(&[1.0, 2.0])), TOPIC_EMBEDDINGS_TENSOR)
                .is_err()
        );
    }

    #[test]
    fn test_rejects_empty_matrix() {
        let header = r#"{"topic_embeddings":{"dtype":"F32","shape":[0,4],"data_offsets":[0,0]}}"#;
        let err = parse_matrix(&build(header, &[]), TOPIC_EMBEDDINGS_TENSOR).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_rejects_unsupported_dtype() {
        let header = r#"{"topic_embeddings":{"dtype":"I32","shape":[1,1],"data_offsets":[0,4]}}"#;
        assert!(parse_matrix(&build(header, &[0, 0, 0, 0]), TOPIC_EMBEDDINGS_TENSOR).is_err());
    }
}
