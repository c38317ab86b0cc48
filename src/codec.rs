use std::collections::HashSet;

use crate::engine::EngineError;

/// Insertion-ordered set of item identifiers.
///
/// Order is kept only so that encoding is deterministic; equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the identifier was already present.
    pub fn insert(&mut self, code: impl Into<String>) -> bool {
        let code = code.into();
        if self.seen.contains(&code) {
            return false;
        }
        self.seen.insert(code.clone());
        self.order.push(code);
        true
    }

    pub fn remove(&mut self, code: &str) -> bool {
        if !self.seen.remove(code) {
            return false;
        }
        self.order.retain(|c| c != code);
        true
    }

    pub fn contains(&self, code: &str) -> bool {
        self.seen.contains(code)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn union_with(&mut self, other: &ItemSet) {
        for code in other.iter() {
            self.insert(code);
        }
    }

    pub fn subtract(&mut self, other: &ItemSet) {
        if other.is_empty() {
            return;
        }
        self.order.retain(|c| !other.contains(c));
        self.seen.retain(|c| !other.contains(c));
    }

    /// Keeps only identifiers also present in `other`, preserving this set's order.
    pub fn intersect(&mut self, other: &ItemSet) {
        self.order.retain(|c| other.contains(c));
        self.seen.retain(|c| other.contains(c));
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }
}

impl PartialEq for ItemSet {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for ItemSet {}

impl<S: Into<String>> FromIterator<S> for ItemSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ItemSet::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for ItemSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for code in iter {
            self.insert(code);
        }
    }
}

pub const DEFAULT_SEPARATOR: char = ',';
pub const DEFAULT_ALTERNATIVE: char = ';';

/// Converts between an [`ItemSet`] and its delimited text column.
///
/// Format: identifiers joined by `separator`, no surrounding whitespace, no
/// empty tokens. A separator inside an identifier is replaced by `alternative`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSetCodec {
    separator: char,
    alternative: char,
}

impl Default for ItemSetCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            alternative: DEFAULT_ALTERNATIVE,
        }
    }
}

impl ItemSetCodec {
    pub fn new(separator: char, alternative: char) -> Result<Self, EngineError> {
        if separator == alternative {
            return Err(EngineError::Configuration(format!(
                "separator and alternative must differ (both {separator:?})"
            )));
        }
        if separator.is_whitespace() || alternative.is_whitespace() {
            return Err(EngineError::Configuration(
                "separator and alternative must not be whitespace".into(),
            ));
        }
        Ok(Self {
            separator,
            alternative,
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn alternative(&self) -> char {
        self.alternative
    }

    /// Trim and escape a single identifier. `None` if nothing is left.
    pub fn normalize(&self, code: &str) -> Option<String> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return None;
        }
        let escaped = trimmed.replace(self.separator, &self.alternative.to_string());
        Some(escaped)
    }

    pub fn decode(&self, text: &str) -> ItemSet {
        text.split(self.separator)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    pub fn encode(&self, set: &ItemSet) -> String {
        let mut written = HashSet::new();
        let mut out = String::new();
        for code in set.iter() {
            let Some(code) = self.normalize(code) else {
                continue;
            };
            if !written.insert(code.clone()) {
                continue;
            }
            if !out.is_empty() {
                out.push(self.separator);
            }
            out.push_str(&code);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_trims_and_drops_empty_tokens() {
        let codec = ItemSetCodec::default();
        let set = codec.decode(" A , B,,C ,");
        assert_eq!(set.to_vec(), vec!["A", "B", "C"]);
    }

    #[test]
    fn decode_blank_is_empty_set() {
        let codec = ItemSetCodec::default();
        assert!(codec.decode("").is_empty());
        assert!(codec.decode("   ").is_empty());
        assert!(codec.decode(" , ,").is_empty());
    }

    #[test]
    fn decode_collapses_duplicates() {
        let codec = ItemSetCodec::default();
        let set = codec.decode("A,B,A");
        assert_eq!(set.to_vec(), vec!["A", "B"]);
    }

    #[test]
    fn encode_escapes_separator() {
        let codec = ItemSetCodec::default();
        let set: ItemSet = ["X,1", "Y"].into_iter().collect();
        assert_eq!(codec.encode(&set), "X;1,Y");
    }

    #[test]
    fn encode_drops_values_that_normalize_to_empty() {
        let codec = ItemSetCodec::default();
        let set: ItemSet = ["  ", "A", ""].into_iter().collect();
        assert_eq!(codec.encode(&set), "A");
    }

    #[test]
    fn encode_dedupes_after_escaping() {
        let codec = ItemSetCodec::default();
        let set: ItemSet = ["a,b", "a;b"].into_iter().collect();
        assert_eq!(codec.encode(&set), "a;b");
    }

    #[test]
    fn custom_separator() {
        let codec = ItemSetCodec::new('|', '/').unwrap();
        let set: ItemSet = ["a|b", "c"].into_iter().collect();
        let text = codec.encode(&set);
        assert_eq!(text, "a/b|c");
        assert_eq!(codec.decode(&text).to_vec(), vec!["a/b", "c"]);
    }

    #[test]
    fn separator_must_differ_from_alternative() {
        assert!(matches!(
            ItemSetCodec::new(',', ','),
            Err(EngineError::Configuration(_))
        ));
        assert!(ItemSetCodec::new(' ', ';').is_err());
    }

    #[test]
    fn set_ops() {
        let mut a: ItemSet = ["A", "B", "C"].into_iter().collect();
        let b: ItemSet = ["B", "D"].into_iter().collect();
        a.subtract(&b);
        assert_eq!(a.to_vec(), vec!["A", "C"]);
        a.union_with(&b);
        assert_eq!(a.to_vec(), vec!["A", "C", "B", "D"]);
        a.intersect(&b);
        assert_eq!(a.to_vec(), vec!["B", "D"]);
        assert!(a.remove("B"));
        assert!(!a.remove("B"));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn equality_ignores_order() {
        let a: ItemSet = ["A", "B"].into_iter().collect();
        let b: ItemSet = ["B", "A"].into_iter().collect();
        assert_eq!(a, b);
    }

    fn normalized(codec: &ItemSetCodec, codes: &[String]) -> ItemSet {
        codes.iter().filter_map(|c| codec.normalize(c)).collect()
    }

    proptest! {
        #[test]
        fn prop_round_trip(a in prop::collection::vec("[ a-z,;0-9]{0,8}", 0..12),
                           b in prop::collection::vec("[ a-z,;0-9]{0,8}", 0..12)) {
            let codec = ItemSetCodec::default();
            let mut union: ItemSet = a.iter().cloned().collect();
            union.extend(b.iter().cloned());

            let decoded = codec.decode(&codec.encode(&union));
            let all: Vec<String> = a.iter().chain(b.iter()).cloned().collect();
            prop_assert_eq!(decoded, normalized(&codec, &all));
        }

        #[test]
        fn prop_encode_is_stable_under_redecode(codes in prop::collection::vec("[ a-z,0-9]{0,8}", 0..16)) {
            let codec = ItemSetCodec::default();
            let set: ItemSet = codes.into_iter().collect();
            let once = codec.encode(&set);
            let twice = codec.encode(&codec.decode(&once));
            prop_assert_eq!(once, twice);
        }
    }
}
