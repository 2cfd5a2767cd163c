use serde::{Deserialize, Serialize};

/// One record of the remote search endpoint response.
///
/// The endpoint is loosely structured: every field defaults to an empty
/// string so a record missing a field still ranks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawItem {
    /// Display name.
    pub name: String,
    /// Free text such as `"Character, Score: 9.1"`.
    pub desc: String,
    /// Detail link, absolute or relative to the site root.
    pub link: String,
    /// Thumbnail image URL.
    pub picurl: String,
}

/// A single entry handed to the input surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// URL opened when the suggestion is picked.
    pub content: String,
    /// Markup shown for the suggestion (`<url>`, `<match>`, `<dim>`).
    pub description: String,
}

/// The top-ranked record, kept for the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestMatch {
    /// Display name of the record.
    pub title: String,
    /// Category phrase parsed from the description.
    pub text: String,
    /// Score parsed from the description.
    pub note: String,
    /// Full-resolution image URL.
    pub image: String,
}

/// Ranked and formatted output for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookedData {
    /// Suggestions in rank order.
    pub suggestions: Vec<Suggestion>,
    /// Site-search line with the category histogram appended.
    pub site_link: String,
    /// Top-ranked record, `None` for an empty response.
    pub best: Option<BestMatch>,
}

/// A cooked result as persisted in the cache, stamped with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Suggestions in rank order.
    pub suggestions: Vec<Suggestion>,
    /// Site-search line with the category histogram appended.
    pub site_link: String,
    /// Top-ranked record.
    pub best: Option<BestMatch>,
    /// Expiry as milliseconds since the Unix epoch.
    pub expires: i64,
}

impl CacheRecord {
    /// Stamp cooked data with an expiry.
    pub fn new(data: CookedData, expires: i64) -> Self {
        Self {
            suggestions: data.suggestions,
            site_link: data.site_link,
            best: data.best,
            expires,
        }
    }

    /// Whether the record is still fresh at `now_ms`.
    pub const fn is_fresh(&self, now_ms: i64) -> bool {
        self.expires > now_ms
    }

    /// Drop the expiry stamp.
    pub fn into_data(self) -> CookedData {
        CookedData {
            suggestions: self.suggestions,
            site_link: self.site_link,
            best: self.best,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_item_tolerates_missing_fields() {
        let item: RawItem = serde_json::from_str(r#"{"name":"Onizuka"}"#).unwrap();
        assert_eq!(item.name, "Onizuka");
        assert!(item.desc.is_empty());
        assert!(item.link.is_empty());
        assert!(item.picurl.is_empty());
    }

    #[test]
    fn test_cache_record_freshness() {
        let data = CookedData {
            suggestions: Vec::new(),
            site_link: String::new(),
            best: None,
        };
        let record = CacheRecord::new(data.clone(), 1_000);
        assert!(record.is_fresh(999));
        assert!(!record.is_fresh(1_000));
        assert_eq!(record.into_data(), data);
    }
}
