use crate::model::{ChunkMetadata, ChunkRecord, ChunkerConfig, SectionRecord};

const SENTENCE_SNAP_WINDOW: usize = 200;
const SENTENCE_TERMINATOR: &str = ". ";

pub fn chunk_sections(
    sections: &[SectionRecord],
    config: &ChunkerConfig,
    act_name: &str,
    language: &str,
) -> Vec<ChunkRecord> {
    let chars_per_token = config.chars_per_token.max(1);
    let target_chars = (config.target_tokens * chars_per_token).max(1);
    let overlap_chars = config.overlap_tokens * chars_per_token;

    let mut chunks = Vec::<ChunkRecord>::new();

    for section in sections {
        let content = section.content.as_str();
        let estimated_tokens = content.len() / chars_per_token;

        if estimated_tokens <= config.target_tokens {
            chunks.push(ChunkRecord {
                text: content.to_string(),
                metadata: metadata_for(section, &section.section_id, act_name, language),
                embedding: None,
            });
            continue;
        }

        for (part, piece) in split_with_overlap(content, target_chars, overlap_chars)
            .into_iter()
            .enumerate()
        {
            let section_id = format!("{} (Part {})", section.section_id, part + 1);
            chunks.push(ChunkRecord {
                text: piece,
                metadata: metadata_for(section, &section_id, act_name, language),
                embedding: None,
            });
        }
    }

    chunks
}

fn split_with_overlap(content: &str, target_chars: usize, overlap_chars: usize) -> Vec<String> {
    let mut pieces = Vec::<String>::new();
    let mut start = 0;

    while start < content.len() {
        let nominal_end = start.saturating_add(target_chars);
        if nominal_end >= content.len() {
            pieces.push(content[start..].trim().to_string());
            break;
        }

        let mut end = snap_to_sentence(content, floor_char_boundary(content, nominal_end));
        if end <= start {
            end = ceil_char_boundary(content, start + 1);
        }
        if end >= content.len() {
            pieces.push(content[start..].trim().to_string());
            break;
        }

        pieces.push(content[start..end].trim().to_string());

        let mut next_start = floor_char_boundary(content, end.saturating_sub(overlap_chars));
        if next_start <= start {
            next_start = end;
        }
        start = next_start;
    }

    pieces
}

fn snap_to_sentence(content: &str, nominal_end: usize) -> usize {
    let search_limit = floor_char_boundary(
        content,
        nominal_end.saturating_add(SENTENCE_SNAP_WINDOW).min(content.len()),
    );

    match content[nominal_end..search_limit].find(SENTENCE_TERMINATOR) {
        Some(found) => nominal_end + found + 1,
        None => nominal_end,
    }
}

fn metadata_for(
    section: &SectionRecord,
    section_id: &str,
    act_name: &str,
    language: &str,
) -> ChunkMetadata {
    ChunkMetadata {
        act: act_name.to_string(),
        chapter: section.chapter_label.clone(),
        section: section_id.to_string(),
        title: section.title.clone(),
        language: language.to_string(),
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }

    let mut boundary = index;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }

    let mut boundary = index;
    while !text.is_char_boundary(boundary) {
        boundary += 1;
    }
    boundary
}
