use std::cmp::Ordering;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::info;

use crate::cli::QueryArgs;
use crate::commands::build::DEFAULT_DB_FILENAME;
use crate::semantic::{
    DEFAULT_MODEL_ID, cosine_similarity, decode_embedding_blob, embed_text_local,
    resolve_model_config,
};
use crate::util::truncate_chars;

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct QueryMatch {
    pub score: f64,
    pub chunk_id: String,
    pub seq: i64,
    pub chapter: String,
    pub section: String,
    pub title: String,
    pub snippet: String,
}

struct SemanticIndexStatus {
    available: bool,
    reason: Option<String>,
}

pub fn run(args: QueryArgs) -> Result<()> {
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

    let connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let model = resolve_model_config(args.model_id.as_deref().unwrap_or(DEFAULT_MODEL_ID));
    let status = semantic_index_status(&connection, &model.model_id)?;
    if !status.available {
        bail!(
            "semantic index unavailable: {}",
            status.reason.unwrap_or_else(|| "unknown reason".to_string())
        );
    }

    info!(query = %args.query, model_id = %model.model_id, "running query");

    let query_embedding = embed_text_local(&args.query, model.dimensions);
    let mut matches = collect_matches(
        &connection,
        &model.model_id,
        model.dimensions,
        &query_embedding,
        args.chapter.as_deref(),
    )?;
    rank_matches(&mut matches);
    matches.truncate(args.limit);

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&matches).context("failed to render query results")?;
        println!("{rendered}");
        return Ok(());
    }

    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (index, result) in matches.iter().enumerate() {
        println!("[{}] score {:.4}", index + 1, result.score);
        println!("    {} | {}", result.chapter, result.section);
        println!("    {}", result.title);
        println!("    {}...", result.snippet);
    }

    Ok(())
}

fn semantic_index_status(connection: &Connection, model_id: &str) -> Result<SemanticIndexStatus> {
    let embeddings_table_exists = connection
        .query_row(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name = 'chunk_embeddings'
            LIMIT 1
            ",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("failed to inspect database schema")?
        .is_some();
    if !embeddings_table_exists {
        return Ok(SemanticIndexStatus {
            available: false,
            reason: Some("chunk_embeddings table is missing; rerun build".to_string()),
        });
    }

    let model_exists = connection
        .query_row(
            "SELECT 1 FROM embedding_models WHERE model_id = ?1 LIMIT 1",
            [model_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .context("failed to inspect embedding models")?
        .is_some();
    if !model_exists {
        return Ok(SemanticIndexStatus {
            available: false,
            reason: Some(format!("embedding model '{model_id}' is not registered")),
        });
    }

    let embedding_count: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM chunk_embeddings WHERE model_id = ?1",
            [model_id],
            |row| row.get(0),
        )
        .context("failed to count embeddings")?;
    if embedding_count <= 0 {
        return Ok(SemanticIndexStatus {
            available: false,
            reason: Some(format!(
                "semantic index is empty for model '{model_id}'; run build without --skip-embeddings or run embed"
            )),
        });
    }

    Ok(SemanticIndexStatus {
        available: true,
        reason: None,
    })
}

fn collect_matches(
    connection: &Connection,
    model_id: &str,
    embedding_dim: usize,
    query_embedding: &[f32],
    chapter_filter: Option<&str>,
) -> Result<Vec<QueryMatch>> {
    let mut statement = connection
        .prepare(
            "
            SELECT c.chunk_id, c.seq, c.chapter, c.section, c.title, c.text,
                   ce.embedding, ce.embedding_dim
            FROM chunk_embeddings ce
            JOIN chunks c ON c.chunk_id = ce.chunk_id
            WHERE ce.model_id = ?1
              AND (?2 IS NULL OR c.chapter = ?2)
            ORDER BY c.doc_id, c.seq
            ",
        )
        .context("failed to prepare candidate query")?;

    let mut rows = statement
        .query(params![model_id, chapter_filter])
        .context("failed to run candidate query")?;

    let mut matches = Vec::<QueryMatch>::new();
    while let Some(row) = rows.next().context("failed to read candidate row")? {
        let row_dim = row.get::<_, i64>(7)? as usize;
        if row_dim != embedding_dim {
            continue;
        }

        let blob = row.get::<_, Vec<u8>>(6)?;
        let Some(embedding) = decode_embedding_blob(&blob, embedding_dim) else {
            continue;
        };

        let text: String = row.get(5)?;
        matches.push(QueryMatch {
            score: cosine_similarity(query_embedding, &embedding),
            chunk_id: row.get(0)?,
            seq: row.get(1)?,
            chapter: row.get(2)?,
            section: row.get(3)?,
            title: row.get(4)?,
            snippet: truncate_chars(&text, SNIPPET_CHARS).to_string(),
        });
    }

    Ok(matches)
}

pub fn rank_matches(matches: &mut [QueryMatch]) {
    matches.sort_by(|left, right| {
        right
            .score
            .partial_cmp(&left.score)
            .unwrap_or(Ordering::Equal)
            .then(left.seq.cmp(&right.seq))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_match(score: f64, seq: i64) -> QueryMatch {
        QueryMatch {
            score,
            chunk_id: format!("doc_chunk_{seq}"),
            seq,
            chapter: "Chapter I: Preliminary".to_string(),
            section: format!("Section {seq}"),
            title: "Short title".to_string(),
            snippet: String::new(),
        }
    }

    #[test]
    fn rank_matches_sorts_by_score_descending() {
        let mut matches = vec![
            query_match(0.2, 0),
            query_match(0.9, 1),
            query_match(0.5, 2),
        ];

        rank_matches(&mut matches);

        assert_eq!(matches[0].seq, 1);
        assert_eq!(matches[1].seq, 2);
        assert_eq!(matches[2].seq, 0);
    }

    #[test]
    fn rank_matches_breaks_ties_by_chunk_order() {
        let mut matches = vec![
            query_match(0.4, 7),
            query_match(0.4, 2),
            query_match(0.4, 5),
        ];

        rank_matches(&mut matches);

        assert_eq!(
            matches.iter().map(|entry| entry.seq).collect::<Vec<i64>>(),
            vec![2, 5, 7]
        );
    }
}
