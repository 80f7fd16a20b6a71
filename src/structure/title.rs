use anyhow::{Context, Result};
use regex::Regex;

pub struct TitleRepairer {
    capital_gap: Regex,
}

impl TitleRepairer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            capital_gap: Regex::new(r"([A-Z])\s+([A-Z])")
                .context("failed to compile capital gap regex")?,
        })
    }

    pub fn repair(&self, raw: &str, lexicon: &[&str]) -> String {
        let concatenated = self.collapse_capital_gaps(raw);
        let split = split_on_lexicon(&concatenated, lexicon);

        let candidate = if split != concatenated {
            split
        } else {
            concatenated
        };

        title_case(&collapse_whitespace(&candidate))
    }

    fn collapse_capital_gaps(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        // iteration cap guards termination on pathological input
        let max_passes = raw.chars().count();

        for _ in 0..max_passes {
            if !self.capital_gap.is_match(&text) {
                break;
            }
            text = self.capital_gap.replace_all(&text, "${1}${2}").into_owned();
        }

        text
    }
}

fn split_on_lexicon(text: &str, lexicon: &[&str]) -> String {
    let mut words = lexicon.to_vec();
    words.sort_by_key(|word| std::cmp::Reverse(word.len()));

    let mut result = text.to_string();
    for word in words {
        if word.is_empty() {
            continue;
        }
        result = insert_space_before(&result, word);
    }

    result
}

fn insert_space_before(text: &str, word: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut copied = 0;

    for (start, matched) in text.match_indices(word) {
        if start == 0 {
            continue;
        }
        out.push_str(&text[copied..start]);
        out.push(' ');
        out.push_str(matched);
        copied = start + matched.len();
    }

    out.push_str(&text[copied..]);
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(capitalize_word)
        .collect::<Vec<String>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = first.to_uppercase().collect::<String>();
            out.extend(chars.flat_map(char::to_lowercase));
            out
        }
        None => String::new(),
    }
}
