use std::collections::BTreeMap;

/// JCAMP header records keyed by canonical label.
///
/// Labels are canonicalised once, on insert and on lookup: lowercased with
/// `#`, spaces, `-`, `_` and `/` removed, which is how JCAMP-DX itself
/// compares labels. `##DATA TYPE`, `data_type` and `DATATYPE` all land on
/// `datatype`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: BTreeMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form of a record label.
    pub fn canonical_label(label: &str) -> String {
        label
            .chars()
            .filter(|c| !matches!(c, '#' | ' ' | '\t' | '-' | '_' | '/'))
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Insert or replace a record. Values are stored trimmed.
    pub fn insert(&mut self, label: &str, value: impl AsRef<str>) {
        self.fields
            .insert(Self::canonical_label(label), value.as_ref().trim().to_string());
    }

    /// Value of a record, `None` when absent or blank.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .get(&Self::canonical_label(label))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// First non-blank value among several labels.
    pub fn get_any(&self, labels: &[&str]) -> Option<&str> {
        labels.iter().find_map(|l| self.get(l))
    }

    /// Append a continuation line to an existing record.
    pub(crate) fn append(&mut self, canonical: &str, more: &str) {
        if let Some(value) = self.fields.get_mut(canonical) {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(more.trim());
        }
    }

    /// Copy every record of `other` over this map.
    pub(crate) fn merge_from(&mut self, other: &HeaderMap) {
        for (k, v) in &other.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (k, v) in iter {
            map.insert(k.as_ref(), v);
        }
        map
    }
}
