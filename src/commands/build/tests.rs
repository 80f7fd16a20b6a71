use super::*;

use crate::model::ChunkMetadata;
use crate::semantic::DEFAULT_MODEL_ID;

fn sample_chunk(seq: usize, section: &str, with_embedding: bool) -> ChunkRecord {
    ChunkRecord {
        text: format!("Body of chunk {seq} covering {section}."),
        metadata: ChunkMetadata {
            act: "Test Act".to_string(),
            chapter: "Chapter I: Preliminary".to_string(),
            section: section.to_string(),
            title: "Short title".to_string(),
            language: "English".to_string(),
        },
        embedding: with_embedding.then(|| vec![0.5_f32, 0.5, 0.5, 0.5]),
    }
}

#[test]
fn store_round_trip_preserves_chunk_order_and_embeddings() {
    let mut connection = Connection::open_in_memory().expect("in-memory db opens");
    ensure_schema(&connection).expect("schema applies");

    let model = resolve_model_config(DEFAULT_MODEL_ID);
    upsert_document(
        &connection,
        "test_act",
        "Test Act",
        "English",
        Path::new("input.txt"),
        "abc123",
    )
    .expect("document upserts");
    ensure_model_entry(&connection, &model).expect("model registers");

    let chunks = vec![
        sample_chunk(0, "Section 1", true),
        sample_chunk(1, "Section 2 (Part 1)", true),
        sample_chunk(2, "Section 2 (Part 2)", true),
    ];
    let inserted =
        replace_chunks(&mut connection, "test_act", &chunks, Some(&model)).expect("chunks insert");
    assert_eq!(inserted, 3);

    let sections = connection
        .prepare("SELECT section FROM chunks ORDER BY seq")
        .expect("select prepares")
        .query_map([], |row| row.get::<_, String>(0))
        .expect("select runs")
        .collect::<Result<Vec<String>, rusqlite::Error>>()
        .expect("rows read");
    assert_eq!(
        sections,
        vec!["Section 1", "Section 2 (Part 1)", "Section 2 (Part 2)"]
    );

    let embeddings = count_rows(&connection, "SELECT COUNT(*) FROM chunk_embeddings")
        .expect("embedding count");
    assert_eq!(embeddings, 3);
}

#[test]
fn replace_chunks_is_idempotent_per_document() {
    let mut connection = Connection::open_in_memory().expect("in-memory db opens");
    ensure_schema(&connection).expect("schema applies");
    upsert_document(
        &connection,
        "test_act",
        "Test Act",
        "English",
        Path::new("input.txt"),
        "abc123",
    )
    .expect("document upserts");

    let chunks = vec![sample_chunk(0, "Section 1", false)];
    replace_chunks(&mut connection, "test_act", &chunks, None).expect("first insert");
    replace_chunks(&mut connection, "test_act", &chunks, None).expect("second insert");

    let count = count_rows(&connection, "SELECT COUNT(*) FROM chunks").expect("chunk count");
    assert_eq!(count, 1);

    upsert_document(
        &connection,
        "test_act",
        "Test Act",
        "English",
        Path::new("input.txt"),
        "def456",
    )
    .expect("document re-upserts");
    let documents = count_rows(&connection, "SELECT COUNT(*) FROM documents").expect("doc count");
    assert_eq!(documents, 1);
}

#[test]
fn skipping_embeddings_leaves_embedding_table_empty() {
    let mut connection = Connection::open_in_memory().expect("in-memory db opens");
    ensure_schema(&connection).expect("schema applies");
    upsert_document(
        &connection,
        "test_act",
        "Test Act",
        "English",
        Path::new("input.txt"),
        "abc123",
    )
    .expect("document upserts");

    let chunks = vec![sample_chunk(0, "Section 1", false)];
    replace_chunks(&mut connection, "test_act", &chunks, None).expect("chunks insert");

    let embeddings = count_rows(&connection, "SELECT COUNT(*) FROM chunk_embeddings")
        .expect("embedding count");
    assert_eq!(embeddings, 0);
}

#[test]
fn metadata_index_truncates_previews() {
    let mut chunk = sample_chunk(0, "Section 1", false);
    chunk.text = "x".repeat(500);

    let index = build_metadata_index(&[chunk]);

    assert_eq!(index.len(), 1);
    assert_eq!(index[0].text_preview.len(), 203);
    assert!(index[0].text_preview.ends_with("..."));
}

#[test]
fn vector_upload_entries_derive_ids_from_position() {
    let chunks = vec![
        sample_chunk(0, "Section 1", true),
        sample_chunk(1, "Section 2", false),
    ];

    let upload = build_vector_upload("test_act", &chunks);

    assert_eq!(upload[0].id, "test_act_chunk_0");
    assert_eq!(upload[1].id, "test_act_chunk_1");
    assert_eq!(upload[0].vector.len(), 4);
    assert!(upload[1].vector.is_empty());
    assert_eq!(upload[0].metadata["section"], "Section 1");
    assert_eq!(upload[0].metadata["text"], chunks[0].text);
}

#[test]
fn stats_count_distinct_sections_and_chapters() {
    let mut second = sample_chunk(1, "Section 2 (Part 1)", true);
    second.metadata.chapter = "Chapter II: Consumer Protection Councils".to_string();
    let mut third = sample_chunk(2, "Section 2 (Part 2)", true);
    third.metadata.chapter = "Chapter II: Consumer Protection Councils".to_string();

    let chunks = vec![sample_chunk(0, "Section 1", true), second, third];
    let stats = compute_stats(&chunks);

    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.total_sections, 3);
    assert_eq!(stats.total_chapters, 2);
    assert!(stats.has_embeddings);
    assert_eq!(stats.embedding_dimension, 4);

    let empty = compute_stats(&[]);
    assert_eq!(empty.total_chunks, 0);
    assert_eq!(empty.avg_chunk_size_chars, 0);
    assert!(!empty.has_embeddings);
}
