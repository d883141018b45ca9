//! Source-to-translation string table

use std::collections::HashMap;

/// Record terminator between a translation and the next source string
const RECORD_END: &str = "\0\0\n";

/// Lookup from source strings to their translations
///
/// Text form: `source \0 translated \0\0 \n` records. The first non-empty
/// translation of a source string wins; an empty translation falls back to
/// the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    pairs: HashMap<String, String>,
}

impl TranslationTable {
    /// Parse the record text form, skipping malformed records
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        let mut rest = text;

        while !rest.is_empty() {
            let (record, next) = match rest.find(RECORD_END) {
                Some(end) => (&rest[..end], &rest[end + RECORD_END.len()..]),
                None => (rest.strip_suffix("\0\0").unwrap_or(rest), ""),
            };
            rest = next;

            let Some((source, translated)) = record.split_once('\0') else {
                continue;
            };
            if source.is_empty() || translated.contains('\0') {
                continue;
            }
            table.insert(source, translated);
        }

        table
    }

    /// Build from explicit pairs with the same precedence as [`Self::parse`]
    pub fn from_pairs<S, T>(pairs: impl IntoIterator<Item = (S, T)>) -> Self
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut table = Self::default();
        for (source, translated) in pairs {
            table.insert(source.as_ref(), translated.as_ref());
        }
        table
    }

    fn insert(&mut self, source: &str, translated: &str) {
        if translated.is_empty() {
            return;
        }
        self.pairs
            .entry(source.to_owned())
            .or_insert_with(|| translated.to_owned());
    }

    /// Translation of `text`, or `text` itself
    pub fn translate<'a>(&'a self, text: &'a str) -> &'a str {
        self.pairs.get(text).map_or(text, String::as_str)
    }

    /// Number of source strings with a translation
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no translation is known
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_records() {
        let table = TranslationTable::parse("剣\0Sword\0\0\n盾\0Shield\0\0");
        assert_eq!(table.len(), 2);
        assert_eq!(table.translate("剣"), "Sword");
        assert_eq!(table.translate("盾"), "Shield");
        assert_eq!(table.translate("弓"), "弓");
    }

    #[test]
    fn test_first_non_empty_translation_wins() {
        let table = TranslationTable::parse("a\0\0\0\na\0first\0\0\na\0second\0\0\n");
        assert_eq!(table.translate("a"), "first");
    }

    #[test]
    fn test_malformed_records_skipped() {
        let table = TranslationTable::parse("no separator\0\0\n\0orphan\0\0\nok\0fine\0\0\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.translate("ok"), "fine");
    }

    #[test]
    fn test_multiline_source() {
        let table = TranslationTable::parse("一行目\n二行目\0line one\nline two\0\0\n");
        assert_eq!(table.translate("一行目\n二行目"), "line one\nline two");
    }

    #[test]
    fn test_from_pairs() {
        let table = TranslationTable::from_pairs([("x", "y"), ("x", "z"), ("e", "")]);
        assert_eq!(table.translate("x"), "y");
        assert_eq!(table.translate("e"), "e");
        assert_eq!(table.len(), 1);
    }
}
