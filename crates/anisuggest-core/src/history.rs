/// Stack of lowercase prefixes typed on the way to the current query.
///
/// Once the full query is fetched, every remembered shorter prefix is
/// aliased to its cache entry so re-typing any of them needs no request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialInputHistory {
    entries: Vec<String>,
}

impl PartialInputHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sanitized text of a new keystroke.
    ///
    /// Entries are popped while the new text does not extend the top entry
    /// or repeats it case-insensitively; the new text is then pushed.
    pub fn observe(&mut self, text: &str) {
        let lower = text.to_lowercase();
        while let Some(last) = self.entries.last() {
            if last.is_empty() || !lower.starts_with(last.as_str()) || lower == *last {
                self.entries.pop();
            } else {
                break;
            }
        }
        self.entries.push(lower);
    }

    /// Prefixes below the current text, oldest first.
    pub fn partials(&self) -> &[String] {
        self.entries
            .split_last()
            .map_or(&[][..], |(_, rest)| rest)
    }

    /// Drop the current text once its result has been cached.
    pub fn complete(&mut self) {
        self.entries.pop();
    }

    /// Current text, if any.
    pub fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Number of remembered entries including the current text.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(steps: &[&str]) -> PartialInputHistory {
        let mut history = PartialInputHistory::new();
        for step in steps {
            history.observe(step);
        }
        history
    }

    #[test]
    fn test_prefix_chain_accumulates() {
        let history = typed(&["o", "on", "oni", "oniz", "onizu", "onizuk", "Onizuka"]);
        assert_eq!(history.current(), Some("onizuka"));
        assert_eq!(history.partials(), ["o", "on", "oni", "oniz", "onizu", "onizuk"]);
    }

    #[test]
    fn test_backspace_pops_longer_entries() {
        let history = typed(&["o", "on", "oni", "on"]);
        assert_eq!(history.partials(), ["o"]);
        assert_eq!(history.current(), Some("on"));
    }

    #[test]
    fn test_case_only_change_replaces_top() {
        let history = typed(&["be", "bebop", "BEBOP"]);
        assert_eq!(history.partials(), ["be"]);
        assert_eq!(history.current(), Some("bebop"));
    }

    #[test]
    fn test_unrelated_text_resets() {
        let history = typed(&["cow", "cowboy", "naruto"]);
        assert!(history.partials().is_empty());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_empty_entry_never_survives() {
        let history = typed(&["", "a"]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some("a"));
    }

    #[test]
    fn test_complete_keeps_partials() {
        let mut history = typed(&["o", "on", "oni"]);
        history.complete();
        assert_eq!(history.current(), Some("on"));
        history.observe("onik");
        assert_eq!(history.partials(), ["o", "on"]);
    }
}
