use super::*;

pub fn run(args: BuildArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("build-{}", utc_compact_string(started_ts));

    let output_dir = args.output_dir.clone();
    ensure_directory(&output_dir)?;
    let manifest_dir = output_dir.join("manifests");
    let manifest_path = manifest_dir.join(format!(
        "build_run_{}.json",
        utc_compact_string(started_ts)
    ));
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| output_dir.join(DEFAULT_DB_FILENAME));

    let raw_text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let source_sha256 = sha256_hex(raw_text.as_bytes());
    let doc_id = args
        .doc_id
        .clone()
        .unwrap_or_else(|| derive_doc_id(&args.input));

    info!(
        input = %args.input.display(),
        doc_id = %doc_id,
        run_id = %run_id,
        "starting build"
    );

    let text = if args.skip_normalization {
        raw_text.clone()
    } else {
        let normalizer = TextNormalizer::new()?;
        normalizer.normalize(&raw_text)
    };
    info!(
        raw_chars = raw_text.len(),
        normalized_chars = text.len(),
        "text prepared"
    );

    let locator = ChapterLocator::new()?;
    let chapters = locator.locate(&text);
    let duplicate_numerals = duplicate_numeral_count(&chapters);

    let splitter = SectionSplitter::new()?;
    let sections = splitter.split(&text, &chapters);
    if sections.is_empty() {
        bail!(
            "no section markers found in {}; the input does not look like normalized statute text",
            args.input.display()
        );
    }
    info!(
        chapters = chapters.len(),
        sections = sections.len(),
        "document structure recovered"
    );

    let config = ChunkerConfig {
        target_tokens: args.target_tokens,
        overlap_tokens: args.overlap_tokens,
        chars_per_token: args.chars_per_token,
    };
    let split_sections = sections
        .iter()
        .filter(|section| {
            section.content.len() / config.chars_per_token.max(1) > config.target_tokens
        })
        .count();
    let mut chunks = chunk_sections(&sections, &config, &args.act_name, &args.language);

    let model = resolve_model_config(semantic::DEFAULT_MODEL_ID);
    let mut embedded_chunks = 0usize;
    if args.skip_embeddings {
        info!("embedding generation skipped");
    } else {
        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<String>>();
        let vectors = embed_chunk_texts(&texts, model.dimensions);
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = Some(vector);
            embedded_chunks += 1;
        }
        info!(
            model_id = %model.model_id,
            embedding_dim = model.dimensions,
            embedded_chunks,
            "embeddings attached"
        );
    }

    write_json_pretty(&output_dir.join("knowledge_base.json"), &chunks)?;
    write_json_pretty(
        &output_dir.join("metadata_index.json"),
        &build_metadata_index(&chunks),
    )?;
    write_json_pretty(
        &output_dir.join("vector_upload.json"),
        &build_vector_upload(&doc_id, &chunks),
    )?;
    let stats = compute_stats(&chunks);
    write_json_pretty(&output_dir.join("stats.json"), &stats)?;

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    upsert_document(
        &connection,
        &doc_id,
        &args.act_name,
        &args.language,
        &args.input,
        &source_sha256,
    )?;
    if !args.skip_embeddings {
        ensure_model_entry(&connection, &model)?;
    }
    replace_chunks(
        &mut connection,
        &doc_id,
        &chunks,
        (!args.skip_embeddings).then_some(&model),
    )?;
    let chunks_in_db = count_rows(&connection, "SELECT COUNT(*) FROM chunks")?;

    let mut warnings = Vec::<String>::new();
    if chapters.is_empty() {
        warnings.push(
            "no chapter markers detected; all sections attributed to the preliminary chapter"
                .to_string(),
        );
    }
    if duplicate_numerals > 0 {
        warnings.push(format!(
            "{duplicate_numerals} chapter numeral(s) appear more than once; front matter may have leaked into the body"
        ));
    }
    for warning in &warnings {
        warn!(warning = %warning, "build warning");
    }

    let updated_at = now_utc_string();
    let manifest = BuildRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at,
        doc_id: doc_id.clone(),
        act_name: args.act_name.clone(),
        source_sha256,
        paths: BuildPaths {
            input: args.input.display().to_string(),
            output_dir: output_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts: BuildCounts {
            raw_chars: raw_text.len(),
            normalized_chars: text.len(),
            chapters_detected: chapters.len(),
            duplicate_chapter_numerals: duplicate_numerals,
            sections_extracted: sections.len(),
            chunks_created: chunks.len(),
            split_sections,
            embedded_chunks,
            chunks_in_db,
        },
        warnings,
        notes: vec![
            "Chapter and section boundaries recovered with heading heuristics over normalized text."
                .to_string(),
            "Oversized sections split into overlapping sentence-aligned chunks.".to_string(),
        ],
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote build run manifest");
    info!(
        chunks = chunks.len(),
        chunks_in_db,
        avg_chunk_size_chars = stats.avg_chunk_size_chars,
        "build completed"
    );

    Ok(())
}

fn derive_doc_id(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("statute");

    let mut doc_id = stem
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>();

    if doc_id.is_empty() {
        doc_id = "statute".to_string();
    }
    doc_id
}
