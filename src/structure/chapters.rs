use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::warn;

use crate::model::ChapterMarker;
use crate::structure::title::TitleRepairer;

const TITLE_WINDOW_CHARS: usize = 500;
const TITLE_LINE_MAX_CHARS: usize = 100;
const TITLE_MAX_LINES: usize = 2;
const TITLE_PUNCTUATION: &str = ".,;:()[]{}";

const HEADING_LEXICON: &[&str] = &[
    "CONSUMER",
    "PROTECTION",
    "COUNCILS",
    "CENTRAL",
    "AUTHORITY",
    "DISPUTES",
    "REDRESSAL",
    "COMMISSION",
    "MEDIATION",
    "PRODUCT",
    "LIABILITY",
    "OFFENCES",
    "PENALTIES",
    "MISCELLANEOUS",
    "PRELIMINARY",
    "AND",
    "THE",
    "OF",
];

pub struct ChapterLocator {
    marker: Regex,
    section_line: Regex,
    chapter_line: Regex,
    numbered_line: Regex,
    repairer: TitleRepairer,
}

impl ChapterLocator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            marker: Regex::new(r"CHAPTER\s+([IVXLC]+)")
                .context("failed to compile chapter marker regex")?,
            section_line: Regex::new(r"(?i)^Section\s+\d+")
                .context("failed to compile section line regex")?,
            chapter_line: Regex::new(r"(?i)^CHAPTER\s+[IVXLC]+")
                .context("failed to compile chapter line regex")?,
            numbered_line: Regex::new(r"^\d+\.")
                .context("failed to compile numbered line regex")?,
            repairer: TitleRepairer::new()?,
        })
    }

    pub fn locate(&self, text: &str) -> Vec<ChapterMarker> {
        let matches = self
            .marker
            .captures_iter(text)
            .filter_map(|captures| {
                let full = captures.get(0)?;
                let numeral = captures.get(1)?.as_str().to_string();
                Some((full.start(), full.end(), numeral))
            })
            .collect::<Vec<(usize, usize, String)>>();

        let mut markers = Vec::<ChapterMarker>::with_capacity(matches.len());
        let mut seen_numerals = HashMap::<String, usize>::new();

        for (index, (start, end, numeral)) in matches.iter().enumerate() {
            let window_end = matches
                .get(index + 1)
                .map(|(next_start, _, _)| *next_start)
                .unwrap_or(text.len())
                .min(end + TITLE_WINDOW_CHARS);
            let window = &text[*end..floor_char_boundary(text, window_end)];

            let candidate = self.collect_title_lines(window);
            let candidate = collapse_whitespace(&candidate);
            let candidate = candidate
                .trim_matches(|character: char| {
                    character == ':' || character == '-' || character.is_whitespace()
                })
                .to_string();

            let repaired = self.repairer.repair(&candidate, HEADING_LEXICON);
            let title = if is_valid_title(&repaired) {
                repaired
            } else {
                format!("Chapter {numeral}")
            };

            if let Some(first_offset) = seen_numerals.get(numeral) {
                warn!(
                    numeral = %numeral,
                    first_offset = *first_offset,
                    offset = *start,
                    "duplicate chapter numeral detected"
                );
            } else {
                seen_numerals.insert(numeral.clone(), *start);
            }

            let full_label = format!("Chapter {numeral}: {title}");
            markers.push(ChapterMarker {
                numeral: numeral.clone(),
                text_offset: *start,
                title,
                full_label,
            });
        }

        markers
    }

    fn collect_title_lines(&self, window: &str) -> String {
        let mut parts = Vec::<&str>::new();

        for raw_line in window.lines() {
            let line = raw_line.trim();

            if line.is_empty() {
                if parts.is_empty() {
                    continue;
                }
                break;
            }

            if self.section_line.is_match(line) || self.chapter_line.is_match(line) {
                break;
            }

            if self.numbered_line.is_match(line) || starts_lowercase(line) {
                break;
            }

            if line.chars().count() > TITLE_LINE_MAX_CHARS {
                break;
            }

            parts.push(line);
            if parts.len() >= TITLE_MAX_LINES {
                break;
            }
        }

        parts.join(" ")
    }
}

pub fn duplicate_numeral_count(markers: &[ChapterMarker]) -> usize {
    let mut counts = HashMap::<&str, usize>::new();
    for marker in markers {
        *counts.entry(marker.numeral.as_str()).or_insert(0) += 1;
    }
    counts.values().filter(|count| **count > 1).count()
}

fn is_valid_title(title: &str) -> bool {
    let Some(first) = title.chars().next() else {
        return false;
    };

    let char_count = title.chars().count();
    if char_count < 3 {
        return false;
    }

    if !title.chars().any(char::is_alphabetic) {
        return false;
    }

    if TITLE_PUNCTUATION.contains(first) {
        return false;
    }

    let punctuation_count = title
        .chars()
        .filter(|character| TITLE_PUNCTUATION.contains(*character))
        .count();

    punctuation_count * 3 < char_count
}

fn starts_lowercase(line: &str) -> bool {
    line.chars().next().is_some_and(char::is_lowercase)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
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
