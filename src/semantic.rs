use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::util::sha256_hex;

pub const DEFAULT_MODEL_ID: &str = "miniLM-L6-v2-local-v1";
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_NORMALIZATION: &str = "l2";
pub const DEFAULT_BACKEND: &str = "local-hash-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticModelConfig {
    pub model_id: String,
    pub model_name: String,
    pub dimensions: usize,
    pub normalization: String,
    pub backend: String,
}

pub fn resolve_model_config(model_id: &str) -> SemanticModelConfig {
    let trimmed = model_id.trim();
    if trimmed.is_empty() || trimmed == DEFAULT_MODEL_ID {
        return SemanticModelConfig {
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIM,
            normalization: DEFAULT_NORMALIZATION.to_string(),
            backend: DEFAULT_BACKEND.to_string(),
        };
    }

    SemanticModelConfig {
        model_id: trimmed.to_string(),
        model_name: trimmed.to_string(),
        dimensions: DEFAULT_EMBEDDING_DIM,
        normalization: DEFAULT_NORMALIZATION.to_string(),
        backend: DEFAULT_BACKEND.to_string(),
    }
}

pub fn embedding_text_hash(payload: &str) -> String {
    sha256_hex(payload.as_bytes())
}

pub fn embed_text_local(payload: &str, dimensions: usize) -> Vec<f32> {
    let dims = dimensions.max(8);
    let mut vector = vec![0_f32; dims];

    let features = feature_tokens(payload);
    if features.is_empty() {
        return vector;
    }

    for feature in features {
        let hash = stable_hash(&feature);
        let index = (hash as usize) % dims;
        let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
        vector[index] += sign;
    }

    l2_normalize(&mut vector);
    vector
}

pub fn embed_chunk_texts(texts: &[String], dimensions: usize) -> Vec<Vec<f32>> {
    texts
        .iter()
        .map(|text| embed_text_local(text, dimensions))
        .collect()
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut left_norm = 0.0_f64;
    let mut right_norm = 0.0_f64;
    for (a, b) in left.iter().zip(right.iter()) {
        let a = f64::from(*a);
        let b = f64::from(*b);
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    if left_norm <= 0.0 || right_norm <= 0.0 {
        return 0.0;
    }

    dot / (left_norm.sqrt() * right_norm.sqrt())
}

pub fn encode_embedding_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_embedding_blob(blob: &[u8], expected_dim: usize) -> Option<Vec<f32>> {
    if expected_dim == 0 || blob.len() != expected_dim.saturating_mul(4) {
        return None;
    }

    let values = blob
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect::<Vec<f32>>();

    (values.len() == expected_dim).then_some(values)
}

fn feature_tokens(payload: &str) -> Vec<String> {
    let words = payload
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|character| character.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<String>>();

    let mut features = Vec::<String>::with_capacity(words.len() * 2);
    for (index, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(index + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn l2_normalize(values: &mut [f32]) {
    let squared_norm = values
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();

    if squared_norm <= 0.0 {
        return;
    }

    let norm = squared_norm.sqrt() as f32;
    for value in values {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic_and_normalized() {
        let first = embed_text_local("district commission jurisdiction", 64);
        let second = embed_text_local("district commission jurisdiction", 64);

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let norm = first
            .iter()
            .map(|value| f64::from(*value) * f64::from(*value))
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_payload_embeds_to_zero_vector() {
        let vector = embed_text_local("   ", 16);
        assert!(vector.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn cosine_similarity_matches_expected_geometry() {
        let left = vec![1.0_f32, 0.0];
        let right = vec![0.0_f32, 1.0];

        assert!((cosine_similarity(&left, &left) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&left, &right).abs() < 1e-9);
        assert_eq!(cosine_similarity(&left, &[1.0_f32]), 0.0);
    }

    #[test]
    fn embedding_blob_round_trips() {
        let values = vec![0.25_f32, -1.5, 3.75];
        let blob = encode_embedding_blob(&values);

        assert_eq!(decode_embedding_blob(&blob, 3), Some(values));
        assert_eq!(decode_embedding_blob(&blob, 4), None);
        assert_eq!(decode_embedding_blob(&[], 0), None);
    }

    #[test]
    fn model_config_falls_back_to_default() {
        let default = resolve_model_config("");
        assert_eq!(default.model_id, DEFAULT_MODEL_ID);
        assert_eq!(default.dimensions, DEFAULT_EMBEDDING_DIM);

        let custom = resolve_model_config("other-model");
        assert_eq!(custom.model_id, "other-model");
        assert_eq!(custom.model_name, "other-model");
    }
}
