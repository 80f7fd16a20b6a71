use super::*;

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
              doc_id TEXT PRIMARY KEY,
              act_name TEXT NOT NULL,
              language TEXT NOT NULL,
              source_path TEXT NOT NULL,
              source_sha256 TEXT NOT NULL,
              db_schema_version TEXT NOT NULL,
              ingested_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
              chunk_id TEXT PRIMARY KEY,
              doc_id TEXT NOT NULL REFERENCES documents(doc_id),
              seq INTEGER NOT NULL,
              chapter TEXT NOT NULL,
              section TEXT NOT NULL,
              title TEXT NOT NULL,
              language TEXT NOT NULL,
              text TEXT NOT NULL,
              char_count INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_doc_seq ON chunks(doc_id, seq);

            CREATE TABLE IF NOT EXISTS embedding_models (
              model_id TEXT PRIMARY KEY,
              model_name TEXT NOT NULL,
              dimensions INTEGER NOT NULL,
              normalization TEXT NOT NULL,
              backend TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunk_embeddings (
              chunk_id TEXT NOT NULL REFERENCES chunks(chunk_id),
              model_id TEXT NOT NULL REFERENCES embedding_models(model_id),
              embedding_dim INTEGER NOT NULL,
              text_hash TEXT NOT NULL,
              embedding BLOB NOT NULL,
              created_at TEXT NOT NULL,
              PRIMARY KEY (chunk_id, model_id)
            );
            ",
        )
        .context("failed to create database schema")
}

pub(super) fn upsert_document(
    connection: &Connection,
    doc_id: &str,
    act_name: &str,
    language: &str,
    source_path: &Path,
    source_sha256: &str,
) -> Result<()> {
    connection
        .execute(
            "
            INSERT INTO documents
              (doc_id, act_name, language, source_path, source_sha256, db_schema_version, ingested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(doc_id) DO UPDATE SET
              act_name = excluded.act_name,
              language = excluded.language,
              source_path = excluded.source_path,
              source_sha256 = excluded.source_sha256,
              db_schema_version = excluded.db_schema_version,
              ingested_at = excluded.ingested_at
            ",
            params![
                doc_id,
                act_name,
                language,
                source_path.display().to_string(),
                source_sha256,
                DB_SCHEMA_VERSION,
                now_utc_string(),
            ],
        )
        .with_context(|| format!("failed to upsert document {doc_id}"))?;

    Ok(())
}

pub(super) fn ensure_model_entry(
    connection: &Connection,
    model: &SemanticModelConfig,
) -> Result<()> {
    connection
        .execute(
            "
            INSERT OR IGNORE INTO embedding_models
              (model_id, model_name, dimensions, normalization, backend, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                model.model_id,
                model.model_name,
                model.dimensions as i64,
                model.normalization,
                model.backend,
                now_utc_string(),
            ],
        )
        .with_context(|| format!("failed to register embedding model {}", model.model_id))?;

    Ok(())
}

pub(super) fn replace_chunks(
    connection: &mut Connection,
    doc_id: &str,
    chunks: &[ChunkRecord],
    model: Option<&SemanticModelConfig>,
) -> Result<usize> {
    let transaction = connection
        .transaction()
        .context("failed to begin chunk transaction")?;

    transaction
        .execute(
            "DELETE FROM chunk_embeddings
             WHERE chunk_id IN (SELECT chunk_id FROM chunks WHERE doc_id = ?1)",
            [doc_id],
        )
        .context("failed to clear prior chunk embeddings")?;
    transaction
        .execute("DELETE FROM chunks WHERE doc_id = ?1", [doc_id])
        .context("failed to clear prior chunks")?;

    let mut inserted = 0usize;
    {
        let mut chunk_statement = transaction
            .prepare(
                "
                INSERT INTO chunks
                  (chunk_id, doc_id, seq, chapter, section, title, language, text, char_count)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .context("failed to prepare chunk insert")?;
        let mut embedding_statement = transaction
            .prepare(
                "
                INSERT OR REPLACE INTO chunk_embeddings
                  (chunk_id, model_id, embedding_dim, text_hash, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .context("failed to prepare embedding insert")?;

        for (seq, chunk) in chunks.iter().enumerate() {
            let chunk_id = chunk_id_for(doc_id, seq);
            chunk_statement
                .execute(params![
                    chunk_id,
                    doc_id,
                    seq as i64,
                    chunk.metadata.chapter,
                    chunk.metadata.section,
                    chunk.metadata.title,
                    chunk.metadata.language,
                    chunk.text,
                    chunk.text.len() as i64,
                ])
                .with_context(|| format!("failed to insert chunk {chunk_id}"))?;
            inserted += 1;

            if let (Some(model), Some(embedding)) = (model, chunk.embedding.as_ref()) {
                embedding_statement
                    .execute(params![
                        chunk_id,
                        model.model_id,
                        embedding.len() as i64,
                        semantic::embedding_text_hash(&chunk.text),
                        semantic::encode_embedding_blob(embedding),
                        now_utc_string(),
                    ])
                    .with_context(|| format!("failed to insert embedding for {chunk_id}"))?;
            }
        }
    }

    transaction
        .commit()
        .context("failed to commit chunk transaction")?;

    Ok(inserted)
}

pub(super) fn chunk_id_for(doc_id: &str, seq: usize) -> String {
    format!("{doc_id}_chunk_{seq}")
}

pub(super) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to run count query: {sql}"))?;
    Ok(count)
}
