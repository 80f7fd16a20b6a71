use anyhow::{Context, Result};
use regex::Regex;

pub struct TextNormalizer {
    page_number_line: Regex,
    blank_line_runs: Regex,
    space_runs: Regex,
    boilerplate_lines: Vec<Regex>,
    bare_clause_number: Regex,
    chapter_marker: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        let boilerplate_lines = vec![
            Regex::new(r"(?i)THE GAZETTE OF INDIA.*?\n")
                .context("failed to compile gazette header regex")?,
            Regex::new(r"(?i)EXTRAORDINARY.*?\n")
                .context("failed to compile gazette edition regex")?,
        ];

        Ok(Self {
            page_number_line: Regex::new(r"\n\s*\d+\s*\n")
                .context("failed to compile page number regex")?,
            blank_line_runs: Regex::new(r"\n\s*\n\s*\n+")
                .context("failed to compile blank line regex")?,
            space_runs: Regex::new(r" +").context("failed to compile space run regex")?,
            boilerplate_lines,
            bare_clause_number: Regex::new(r"\n(\d+)\.\s+")
                .context("failed to compile clause number regex")?,
            chapter_marker: Regex::new(r"CHAPTER\s+([IVX]+)")
                .context("failed to compile chapter marker regex")?,
        })
    }

    pub fn normalize(&self, text: &str) -> String {
        let text = self.page_number_line.replace_all(text, "\n");
        let text = self.blank_line_runs.replace_all(&text, "\n\n");
        let mut text = self.space_runs.replace_all(&text, " ").into_owned();

        for pattern in &self.boilerplate_lines {
            text = pattern.replace_all(&text, "").into_owned();
        }

        let text = self
            .bare_clause_number
            .replace_all(&text, "\n\nSection ${1}. ");
        let text = self.chapter_marker.replace_all(&text, "\n\nCHAPTER ${1}");

        text.trim().to_string()
    }
}
