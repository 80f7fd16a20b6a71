use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::info;

use crate::cli::{EmbedArgs, EmbedRefreshMode};
use crate::commands::build::{DEFAULT_DB_FILENAME, configure_connection, ensure_schema};
use crate::semantic::{
    SemanticModelConfig, embed_text_local, embedding_text_hash, encode_embedding_blob,
    resolve_model_config,
};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

#[derive(Debug, Clone)]
struct EmbedChunkRow {
    chunk_id: String,
    text: String,
}

#[derive(Debug, Clone)]
struct ExistingEmbeddingRow {
    text_hash: String,
    embedding_dim: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRunManifest {
    manifest_version: u32,
    run_id: String,
    generated_at: String,
    model_id: String,
    model_name: String,
    embedding_dim: usize,
    normalization: String,
    backend: String,
    refresh_mode: String,
    eligible_chunks: usize,
    skipped_empty_chunks: usize,
    stale_rows_before: usize,
    updated_chunks: usize,
    batch_size: usize,
    status: String,
}

pub fn run(args: EmbedArgs) -> Result<()> {
    let batch_size = args.batch_size.max(1);
    let model = resolve_model_config(&args.model_id);

    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join(DEFAULT_DB_FILENAME));
    if !db_path.exists() {
        bail!(
            "knowledge base index not found at {}; run the build command first",
            db_path.display()
        );
    }

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    ensure_model_entry(&connection, &model)?;

    let rows = load_chunk_rows(&connection)?;
    let run_id = format!("embed-{}", utc_compact_string(Utc::now()));
    info!(
        model_id = %model.model_id,
        chunk_rows = rows.len(),
        refresh_mode = args.refresh_mode.as_str(),
        "starting embed refresh"
    );

    let mut eligible_chunks = 0usize;
    let mut skipped_empty_chunks = 0usize;
    let mut stale_rows_before = 0usize;
    let mut updated_chunks = 0usize;
    let mut pending = Vec::<(String, String, Vec<u8>)>::new();

    for row in &rows {
        if row.text.trim().is_empty() {
            skipped_empty_chunks += 1;
            continue;
        }
        eligible_chunks += 1;

        let text_hash = embedding_text_hash(&row.text);
        let existing = load_existing_embedding(&connection, &row.chunk_id, &model.model_id)?;
        let stale = existing
            .as_ref()
            .map(|value| value.text_hash != text_hash || value.embedding_dim != model.dimensions)
            .unwrap_or(true);
        if stale {
            stale_rows_before += 1;
        }

        let should_update = match args.refresh_mode {
            EmbedRefreshMode::Full => true,
            EmbedRefreshMode::MissingOrStale => stale,
        };
        if !should_update {
            continue;
        }

        let embedding = embed_text_local(&row.text, model.dimensions);
        pending.push((row.chunk_id.clone(), text_hash, encode_embedding_blob(&embedding)));

        if pending.len() >= batch_size {
            updated_chunks += flush_batch(&mut connection, &model, &mut pending)?;
            info!(updated_chunks, eligible_chunks, "embed batch committed");
        }
    }

    if !pending.is_empty() {
        updated_chunks += flush_batch(&mut connection, &model, &mut pending)?;
    }

    let manifest_path = args.output_dir.join("manifests").join(format!(
        "embed_run_{}.json",
        utc_compact_string(Utc::now())
    ));
    let manifest = EmbedRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        model_id: model.model_id.clone(),
        model_name: model.model_name.clone(),
        embedding_dim: model.dimensions,
        normalization: model.normalization.clone(),
        backend: model.backend.clone(),
        refresh_mode: args.refresh_mode.as_str().to_string(),
        eligible_chunks,
        skipped_empty_chunks,
        stale_rows_before,
        updated_chunks,
        batch_size,
        status: "completed".to_string(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        path = %manifest_path.display(),
        eligible_chunks,
        updated_chunks,
        skipped_empty_chunks,
        "embed refresh completed"
    );

    Ok(())
}

fn ensure_model_entry(connection: &Connection, model: &SemanticModelConfig) -> Result<()> {
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

fn load_chunk_rows(connection: &Connection) -> Result<Vec<EmbedChunkRow>> {
    let mut statement = connection
        .prepare("SELECT chunk_id, text FROM chunks ORDER BY doc_id, seq")
        .context("failed to prepare chunk row query")?;

    let rows = statement
        .query_map([], |row| {
            Ok(EmbedChunkRow {
                chunk_id: row.get(0)?,
                text: row.get(1)?,
            })
        })
        .context("failed to query chunk rows")?
        .collect::<Result<Vec<EmbedChunkRow>, rusqlite::Error>>()
        .context("failed to read chunk rows")?;

    Ok(rows)
}

fn load_existing_embedding(
    connection: &Connection,
    chunk_id: &str,
    model_id: &str,
) -> Result<Option<ExistingEmbeddingRow>> {
    let row = connection
        .query_row(
            "SELECT text_hash, embedding_dim FROM chunk_embeddings
             WHERE chunk_id = ?1 AND model_id = ?2",
            [chunk_id, model_id],
            |row| {
                Ok(ExistingEmbeddingRow {
                    text_hash: row.get(0)?,
                    embedding_dim: row.get::<_, i64>(1)? as usize,
                })
            },
        )
        .optional()
        .with_context(|| format!("failed to load existing embedding for {chunk_id}"))?;

    Ok(row)
}

fn flush_batch(
    connection: &mut Connection,
    model: &SemanticModelConfig,
    pending: &mut Vec<(String, String, Vec<u8>)>,
) -> Result<usize> {
    let transaction = connection
        .transaction()
        .context("failed to begin embed transaction")?;

    let mut flushed = 0usize;
    {
        let mut statement = transaction
            .prepare(
                "
                INSERT OR REPLACE INTO chunk_embeddings
                  (chunk_id, model_id, embedding_dim, text_hash, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .context("failed to prepare embedding upsert")?;

        for (chunk_id, text_hash, blob) in pending.drain(..) {
            statement
                .execute(params![
                    chunk_id,
                    model.model_id,
                    model.dimensions as i64,
                    text_hash,
                    blob,
                    now_utc_string(),
                ])
                .with_context(|| format!("failed to upsert embedding for {chunk_id}"))?;
            flushed += 1;
        }
    }

    transaction
        .commit()
        .context("failed to commit embed transaction")?;

    Ok(flushed)
}
