use std::ops::RangeInclusive;

/// Hangul syllables, U+AC00 ..= U+D7A3.
pub const HANGUL_SYLLABLES: RangeInclusive<char> = '\u{AC00}'..='\u{D7A3}';

/// Like badges render blank for comments without visible likes.
pub fn like_count(raw: String) -> String {
    if raw.is_empty() {
        "0".to_string()
    } else {
        raw
    }
}

pub fn timestamp(raw: &str) -> String {
    raw.trim().to_string()
}

/// Allow-list of characters kept in comment bodies. Everything else,
/// whitespace and line breaks included, becomes a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFilter {
    ranges: Vec<RangeInclusive<char>>,
}

impl Default for ScriptFilter {
    fn default() -> Self {
        Self::new(vec![HANGUL_SYLLABLES])
    }
}

impl ScriptFilter {
    pub fn new(ranges: Vec<RangeInclusive<char>>) -> Self {
        Self { ranges }
    }

    pub fn allows(&self, c: char) -> bool {
        self.ranges.iter().any(|r| r.contains(&c))
    }

    /// One-for-one replacement: the output has as many chars as the input.
    pub fn apply(&self, text: &str) -> String {
        text.chars()
            .map(|c| if self.allows(c) { c } else { ' ' })
            .collect()
    }
}
