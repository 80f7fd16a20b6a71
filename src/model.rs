use serde::{Deserialize, Serialize};

pub const PRELIMINARY_CHAPTER_LABEL: &str = "Preliminary";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMarker {
    pub numeral: String,
    pub text_offset: usize,
    pub title: String,
    pub full_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub chapter_label: String,
    pub section_id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub act: String,
    pub chapter: String,
    pub section: String,
    pub title: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    pub chars_per_token: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_tokens: 850,
            overlap_tokens: 125,
            chars_per_token: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPreviewEntry {
    pub metadata: ChunkMetadata,
    pub text_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorUploadEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbStats {
    pub total_chunks: usize,
    pub total_sections: usize,
    pub total_chapters: usize,
    pub avg_chunk_size_chars: usize,
    pub has_embeddings: bool,
    pub embedding_dimension: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildPaths {
    pub input: String,
    pub output_dir: String,
    pub db_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildCounts {
    pub raw_chars: usize,
    pub normalized_chars: usize,
    pub chapters_detected: usize,
    pub duplicate_chapter_numerals: usize,
    pub sections_extracted: usize,
    pub chunks_created: usize,
    pub split_sections: usize,
    pub embedded_chunks: usize,
    pub chunks_in_db: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub doc_id: String,
    pub act_name: String,
    pub source_sha256: String,
    pub paths: BuildPaths,
    pub counts: BuildCounts,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}
