//! Root-process selection for the process-set sampler.

use std::collections::BTreeSet;

use crate::collector::ProcessEntry;

/// Which processes the process-set sampler starts its walks from.
///
/// A process is a root when its pid is listed explicitly or when its
/// lowercased name contains one of the keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    pids: BTreeSet<u32>,
    keywords: Vec<String>,
}

impl SelectionCriteria {
    /// Builds criteria from explicit pids and name keywords.
    ///
    /// Keywords are lowercased; empty keywords are dropped since they
    /// would match every process.
    pub fn new<I, K>(pids: impl IntoIterator<Item = u32>, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut lowered: Vec<String> = Vec::new();
        for k in keywords {
            let k = k.as_ref().trim().to_lowercase();
            if !k.is_empty() && !lowered.contains(&k) {
                lowered.push(k);
            }
        }
        Self {
            pids: pids.into_iter().collect(),
            keywords: lowered,
        }
    }

    pub fn pids(&self) -> &BTreeSet<u32> {
        &self.pids
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True when neither pids nor keywords were given.
    pub fn is_empty(&self) -> bool {
        self.pids.is_empty() && self.keywords.is_empty()
    }

    /// First keyword contained in the lowercased `name`, if any.
    pub fn matching_keyword(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.keywords
            .iter()
            .find(|k| name.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Whether `entry` is a root under these criteria.
    pub fn matches(&self, entry: &ProcessEntry) -> bool {
        self.pids.contains(&entry.pid) || self.matching_keyword(&entry.name).is_some()
    }
}

/// Selects root pids from one live-process listing.
///
/// Each process is considered once, so a name matching several keywords
/// still yields a single root. Roots that are descendants of other roots are
/// kept; the tree walk deduplicates them.
pub fn select_roots(criteria: &SelectionCriteria, listing: &[ProcessEntry]) -> Vec<u32> {
    listing
        .iter()
        .filter(|entry| criteria.matches(entry))
        .map(|entry| entry.pid)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pid: u32, ppid: u32, name: &str) -> ProcessEntry {
        ProcessEntry {
            pid,
            ppid,
            name: name.to_string(),
        }
    }

    fn listing() -> Vec<ProcessEntry> {
        vec![
            entry(1, 0, "systemd"),
            entry(10, 1, "postgres"),
            entry(11, 10, "postgres: walwriter"),
            entry(20, 1, "Nginx"),
            entry(30, 1, "bash"),
        ]
    }

    #[test]
    fn test_select_by_pid() {
        let criteria = SelectionCriteria::new([30], Vec::<String>::new());
        assert_eq!(select_roots(&criteria, &listing()), vec![30]);
    }

    #[test]
    fn test_select_by_keyword_is_case_insensitive() {
        let criteria = SelectionCriteria::new([], ["NGINX"]);
        assert_eq!(select_roots(&criteria, &listing()), vec![20]);
    }

    #[test]
    fn test_select_union_keeps_nested_roots() {
        let criteria = SelectionCriteria::new([1], ["postgres"]);
        assert_eq!(select_roots(&criteria, &listing()), vec![1, 10, 11]);
    }

    #[test]
    fn test_multiple_matching_keywords_yield_one_root() {
        let criteria = SelectionCriteria::new([], ["post", "gres", "wal"]);
        let roots = select_roots(&criteria, &listing());
        assert_eq!(roots, vec![10, 11]);
        assert_eq!(criteria.matching_keyword("postgres: walwriter"), Some("post"));
    }

    #[test]
    fn test_pid_matching_and_keyword_matching_same_process_once() {
        let criteria = SelectionCriteria::new([20], ["nginx"]);
        assert_eq!(select_roots(&criteria, &listing()), vec![20]);
    }

    #[test]
    fn test_dead_pid_is_not_selected() {
        let criteria = SelectionCriteria::new([999], Vec::<String>::new());
        assert!(select_roots(&criteria, &listing()).is_empty());
    }

    #[test]
    fn test_empty_keywords_are_dropped() {
        let criteria = SelectionCriteria::new([], ["", "  ", "Bash", "bash"]);
        assert_eq!(criteria.keywords(), ["bash".to_string()]);
        assert!(!criteria.is_empty());
        assert!(SelectionCriteria::new([], [""]).is_empty());
    }
}
