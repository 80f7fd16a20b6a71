use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::cli::BuildArgs;
use crate::model::{
    BuildCounts, BuildPaths, BuildRunManifest, ChunkPreviewEntry, ChunkRecord, ChunkerConfig,
    KbStats, VectorUploadEntry,
};
use crate::semantic::{self, SemanticModelConfig, embed_chunk_texts, resolve_model_config};
use crate::structure::{
    ChapterLocator, SectionSplitter, TextNormalizer, chunk_sections, duplicate_numeral_count,
};
use crate::util::{
    ensure_directory, now_utc_string, sha256_hex, truncate_chars, utc_compact_string,
    write_json_pretty,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";
pub const DEFAULT_DB_FILENAME: &str = "statute_index.sqlite";

mod exports;
mod run;
mod store;
#[cfg(test)]
mod tests;

pub use run::run;
pub use store::{configure_connection, ensure_schema};

use exports::*;
use store::*;
