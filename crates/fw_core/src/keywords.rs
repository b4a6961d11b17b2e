use serde_json::Value;

use crate::{Error, Result};

/// The query keywords of one search, in caller order.
///
/// Keywords are trimmed, blank entries are dropped and duplicates are removed
/// case-insensitively, keeping the first spelling seen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordSet {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let lowered = keyword.to_lowercase();
            if !set.lowered.contains(&lowered) {
                set.keywords.push(keyword.to_string());
                set.lowered.push(lowered);
            }
        }
        set
    }

    /// Validates the `keywords` member of a search request body.
    ///
    /// An array with no usable keyword (`[]` or only blanks) is rejected as invalid.
    /// Older deployments accepted an empty array and answered with zero articles;
    /// clients relying on that now get a 400.
    pub fn from_request(body: &Value) -> Result<Self> {
        let entries = body
            .get("keywords")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::InvalidRequest("`keywords` must be an array of strings".to_string())
            })?;

        let mut keywords = Vec::with_capacity(entries.len());
        for entry in entries {
            let keyword = entry.as_str().ok_or_else(|| {
                Error::InvalidRequest(format!("keyword {} is not a string", entry))
            })?;
            keywords.push(keyword);
        }

        let set = Self::new(keywords);
        if set.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one non-blank keyword is required".to_string(),
            ));
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Keywords contained in `text`, case-insensitively, in set order.
    pub fn matched_in(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .zip(&self.lowered)
            .filter(|(_, lowered)| text.contains(lowered.as_str()))
            .map(|(keyword, _)| keyword.clone())
            .collect()
    }
}

/// Keywords from `keywords` found in the concatenation of title and summary.
pub fn matched_keywords(title: &str, summary: &str, keywords: &KeywordSet) -> Vec<String> {
    keywords.matched_in(&format!("{} {}", title, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyword_set_dedup_and_trim() {
        let set = KeywordSet::new(["  Bluetongue ", "", "bluetongue", "Sheep"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Bluetongue", "Sheep"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let set = KeywordSet::new(["sheep", "BLUETONGUE", "pig"]);
        let matched = matched_keywords(
            "Bluetongue confirmed in Kent",
            "Movement restrictions for Sheepfarmers",
            &set,
        );
        assert_eq!(matched, vec!["sheep", "BLUETONGUE"]);
        assert!(matched_keywords("Dairy prices", "Milk", &set).is_empty());
    }

    #[test]
    fn test_match_does_not_span_title_and_summary() {
        let set = KeywordSet::new(["ab"]);
        assert!(matched_keywords("xa", "bx", &set).is_empty());
    }

    #[test]
    fn test_from_request() {
        let set = KeywordSet::from_request(&json!({ "keywords": ["cattle", "TB"] })).unwrap();
        assert_eq!(set.len(), 2);

        for body in [
            json!({}),
            json!({ "keywords": "cattle" }),
            json!({ "keywords": [1, 2] }),
            json!({ "keywords": [] }),
            json!({ "keywords": ["  "] }),
        ] {
            assert!(matches!(
                KeywordSet::from_request(&body),
                Err(Error::InvalidRequest(_))
            ));
        }
    }
}
