use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{ChapterMarker, PRELIMINARY_CHAPTER_LABEL, SectionRecord};

pub struct SectionSplitter {
    split_point: Regex,
    section: Regex,
    title: Regex,
}

impl SectionSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            split_point: Regex::new(r"\n\s*Section\s+\d+\.")
                .context("failed to compile section split regex")?,
            section: Regex::new(r"(?s)Section\s+(\d+)\.\s*(.+)")
                .context("failed to compile section body regex")?,
            title: Regex::new(r"^(.+?)(?:\.|—|\n)")
                .context("failed to compile section title regex")?,
        })
    }

    pub fn split(&self, text: &str, chapters: &[ChapterMarker]) -> Vec<SectionRecord> {
        let mut records = Vec::<SectionRecord>::new();

        for (offset, span) in self.spans(text) {
            if span.trim().is_empty() {
                continue;
            }

            // spans without a section marker are front matter, dropped
            let Some(captures) = self.section.captures(span) else {
                continue;
            };

            let Some(number) = captures.get(1).map(|value| value.as_str()) else {
                continue;
            };
            let content = captures
                .get(2)
                .map(|value| value.as_str().trim())
                .unwrap_or_default();

            let section_id = format!("Section {number}");
            let title = self
                .title
                .captures(content)
                .and_then(|title_captures| title_captures.get(1))
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_else(|| section_id.clone());

            records.push(SectionRecord {
                chapter_label: chapter_label_at(chapters, offset),
                section_id,
                title,
                content: content.to_string(),
            });
        }

        records
    }

    pub fn spans<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut spans = Vec::<(usize, &'a str)>::new();
        let mut previous = 0;

        for found in self.split_point.find_iter(text) {
            if found.start() > previous {
                spans.push((previous, &text[previous..found.start()]));
            }
            previous = found.start();
        }

        spans.push((previous, &text[previous..]));
        spans
    }
}

fn chapter_label_at(chapters: &[ChapterMarker], offset: usize) -> String {
    let preceding = chapters.partition_point(|marker| marker.text_offset < offset);
    if preceding == 0 {
        return PRELIMINARY_CHAPTER_LABEL.to_string();
    }

    chapters[preceding - 1].full_label.clone()
}
