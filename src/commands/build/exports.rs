use super::*;

const PREVIEW_CHARS: usize = 200;

pub(super) fn build_metadata_index(chunks: &[ChunkRecord]) -> Vec<ChunkPreviewEntry> {
    chunks
        .iter()
        .map(|chunk| ChunkPreviewEntry {
            metadata: chunk.metadata.clone(),
            text_preview: format!("{}...", truncate_chars(&chunk.text, PREVIEW_CHARS)),
        })
        .collect()
}

pub(super) fn build_vector_upload(doc_id: &str, chunks: &[ChunkRecord]) -> Vec<VectorUploadEntry> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| VectorUploadEntry {
            id: chunk_id_for(doc_id, index),
            vector: chunk.embedding.clone().unwrap_or_default(),
            metadata: serde_json::json!({
                "act": chunk.metadata.act,
                "chapter": chunk.metadata.chapter,
                "section": chunk.metadata.section,
                "title": chunk.metadata.title,
                "language": chunk.metadata.language,
                "text": chunk.text,
            }),
        })
        .collect()
}

pub(super) fn compute_stats(chunks: &[ChunkRecord]) -> KbStats {
    let total_chunks = chunks.len();
    let total_sections = chunks
        .iter()
        .map(|chunk| chunk.metadata.section.as_str())
        .collect::<HashSet<&str>>()
        .len();
    let total_chapters = chunks
        .iter()
        .map(|chunk| chunk.metadata.chapter.as_str())
        .collect::<HashSet<&str>>()
        .len();

    let avg_chunk_size_chars = if total_chunks > 0 {
        chunks.iter().map(|chunk| chunk.text.len()).sum::<usize>() / total_chunks
    } else {
        0
    };

    let first_embedding = chunks.first().and_then(|chunk| chunk.embedding.as_ref());

    KbStats {
        total_chunks,
        total_sections,
        total_chapters,
        avg_chunk_size_chars,
        has_embeddings: first_embedding.is_some(),
        embedding_dimension: first_embedding.map(Vec::len).unwrap_or(0),
    }
}
