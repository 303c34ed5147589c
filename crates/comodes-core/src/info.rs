//! Free-text provenance block attached to a dataset.

use std::collections::BTreeMap;

/// Parsed provenance block. The original text is kept verbatim; lines
/// of the form `key: value` are additionally exposed as a lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoBlock {
    text: String,
    entries: BTreeMap<String, String>,
}

impl InfoBlock {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut entries = BTreeMap::new();

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            // First occurrence wins; later repeats of a key are log noise.
            entries
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }

        Self { text, entries }
    }

    pub fn as_text(&self) -> &str {
        &self.text
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::InfoBlock;

    const SAMPLE: &str = "\
calculation: u18_2m
setup date: 2016-05-11 10:22
tag: low_beta
comment line without separator
tag: duplicate wins nothing
empty value:
";

    #[test]
    fn key_value_lines_become_entries() {
        let info = InfoBlock::from_text(SAMPLE);

        assert_eq!(info.get("calculation"), Some("u18_2m"));
        assert_eq!(info.get("setup date"), Some("2016-05-11 10:22"));
        assert_eq!(info.get("missing"), None);
        assert_eq!(info.entry_count(), 3);
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let info = InfoBlock::from_text(SAMPLE);
        assert_eq!(info.get("tag"), Some("low_beta"));
    }

    #[test]
    fn original_text_is_preserved_verbatim() {
        let info = InfoBlock::from_text(SAMPLE);
        assert_eq!(info.as_text(), SAMPLE);

        let empty = InfoBlock::from_text("");
        assert_eq!(empty.as_text(), "");
        assert_eq!(empty.entry_count(), 0);
    }
}
