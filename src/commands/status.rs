use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::build::DEFAULT_DB_FILENAME;
use crate::model::KbStats;

#[derive(Debug, Deserialize)]
struct BuildManifestView {
    run_id: Option<String>,
    status: Option<String>,
    doc_id: Option<String>,
    act_name: Option<String>,
    updated_at: Option<String>,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let stats_path = args.output_dir.join("stats.json");
    let manifest_dir = args.output_dir.join("manifests");
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join(DEFAULT_DB_FILENAME));

    info!(output_dir = %args.output_dir.display(), "status requested");

    if stats_path.exists() {
        let raw = fs::read(&stats_path)
            .with_context(|| format!("failed to read {}", stats_path.display()))?;
        let stats: KbStats = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", stats_path.display()))?;

        info!(
            total_chunks = stats.total_chunks,
            total_sections = stats.total_sections,
            total_chapters = stats.total_chapters,
            avg_chunk_size_chars = stats.avg_chunk_size_chars,
            has_embeddings = stats.has_embeddings,
            embedding_dimension = stats.embedding_dimension,
            "loaded knowledge base stats"
        );
    } else {
        warn!(path = %stats_path.display(), "stats export missing");
    }

    match latest_build_manifest(&manifest_dir)? {
        Some(path) => {
            let raw =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let manifest: BuildManifestView = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                path = %path.display(),
                run_id = %manifest.run_id.unwrap_or_default(),
                status = %manifest.status.unwrap_or_default(),
                doc_id = %manifest.doc_id.unwrap_or_default(),
                act_name = %manifest.act_name.unwrap_or_default(),
                updated_at = %manifest.updated_at.unwrap_or_default(),
                "loaded latest build manifest"
            );
        }
        None => {
            warn!(path = %manifest_dir.display(), "no build manifest found");
        }
    }

    if db_path.exists() {
        let connection = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let documents = query_count(&connection, "SELECT COUNT(*) FROM documents").unwrap_or(0);
        let chunks = query_count(&connection, "SELECT COUNT(*) FROM chunks").unwrap_or(0);
        let embeddings =
            query_count(&connection, "SELECT COUNT(*) FROM chunk_embeddings").unwrap_or(0);

        info!(
            path = %db_path.display(),
            documents,
            chunks,
            embeddings,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn latest_build_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut candidates = Vec::<PathBuf>::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let is_build_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("build_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if is_build_manifest {
            candidates.push(path);
        }
    }

    // run ids embed a compact UTC timestamp, so lexicographic max is newest
    candidates.sort();
    Ok(candidates.pop())
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
