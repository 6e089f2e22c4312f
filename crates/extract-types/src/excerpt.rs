use serde::{Deserialize, Serialize};

pub const HUNDRED_LIMIT: usize = 100;
pub const THOUSAND_LIMIT: usize = 1000;
/// Unbounded.
pub const FULL_LIMIT: usize = usize::MAX;

/// Three nested truncations of one representative text.
///
/// All three are cut from the same source string, so `hundred` is always a
/// prefix of `thousand`, which is always a prefix of `full`.  Limits count
/// characters, never bytes, so a cut never splits a code point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpts {
    #[serde(rename = "Exerpt_hund")]
    pub hundred: Option<String>,
    #[serde(rename = "Exerpt_thou")]
    pub thousand: Option<String>,
    #[serde(rename = "Exerpt_full")]
    pub full: Option<String>,
}

impl Excerpts {
    /// Empty text produces no excerpts.
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            hundred: Some(truncate_chars(text, HUNDRED_LIMIT).to_string()),
            thousand: Some(truncate_chars(text, THOUSAND_LIMIT).to_string()),
            full: Some(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_none()
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_prefix_law(e: &Excerpts) {
        let (h, t, f) = (
            e.hundred.as_deref().unwrap(),
            e.thousand.as_deref().unwrap(),
            e.full.as_deref().unwrap(),
        );
        assert!(t.starts_with(h));
        assert!(f.starts_with(t));
        assert!(h.chars().count() <= HUNDRED_LIMIT);
        assert!(t.chars().count() <= THOUSAND_LIMIT);
    }

    #[test]
    fn test_short_text_is_identical_in_all_three() {
        let e = Excerpts::from_text("hello");
        assert_eq!(e.hundred.as_deref(), Some("hello"));
        assert_eq!(e.thousand.as_deref(), Some("hello"));
        assert_eq!(e.full.as_deref(), Some("hello"));
    }

    #[test]
    fn test_long_text_truncates() {
        let text = "abcdefghij".repeat(150);
        let e = Excerpts::from_text(&text);
        assert_eq!(e.hundred.as_ref().unwrap().len(), 100);
        assert_eq!(e.thousand.as_ref().unwrap().len(), 1000);
        assert_eq!(e.full.as_ref().unwrap().len(), 1500);
        assert_prefix_law(&e);
    }

    #[test]
    fn test_multibyte_boundaries() {
        // 'é' is two bytes; a byte-based cut at 100 would split it.
        let text = "é".repeat(1200);
        let e = Excerpts::from_text(&text);
        assert_eq!(e.hundred.as_ref().unwrap().chars().count(), 100);
        assert_eq!(e.thousand.as_ref().unwrap().chars().count(), 1000);
        assert_prefix_law(&e);
    }

    #[test]
    fn test_empty() {
        let e = Excerpts::from_text("");
        assert!(e.is_empty());
        assert_eq!(e, Excerpts::default());
    }

    #[test]
    fn test_serialized_column_names() {
        let v = serde_json::to_value(Excerpts::from_text("x")).unwrap();
        let obj = v.as_object().unwrap();
        assert!(obj.contains_key("Exerpt_hund"));
        assert!(obj.contains_key("Exerpt_thou"));
        assert!(obj.contains_key("Exerpt_full"));
    }
}
