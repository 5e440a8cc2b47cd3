// filters.rs - Sequence selection by name

use regex::Regex;
use std::collections::HashSet;

use crate::core::AlignmentMatrix;

/// Name-based sequence filter. A sequence passes when it matches every
/// include rule and no exclude rule.
#[derive(Debug, Clone, Default)]
pub struct SequenceFilter {
    pub include_regex: Option<Regex>,
    pub exclude_regex: Option<Regex>,
    pub include_names: Option<HashSet<String>>,
    pub exclude_names: Option<HashSet<String>>,
}

impl SequenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.include_regex.is_some()
            || self.exclude_regex.is_some()
            || self.include_names.is_some()
            || self.exclude_names.is_some()
    }

    pub fn accepts(&self, name: &str) -> bool {
        if let Some(regex) = &self.include_regex {
            if !regex.is_match(name) {
                return false;
            }
        }
        if let Some(regex) = &self.exclude_regex {
            if regex.is_match(name) {
                return false;
            }
        }
        if let Some(set) = &self.include_names {
            if !set.contains(name) {
                return false;
            }
        }
        if let Some(set) = &self.exclude_names {
            if set.contains(name) {
                return false;
            }
        }
        true
    }

    /// Original indices of the surviving sequences the filter rejects
    pub fn rejected(&self, matrix: &AlignmentMatrix) -> Vec<usize> {
        if !self.is_active() {
            return Vec::new();
        }
        let rejected: Vec<usize> = matrix
            .kept_sequences()
            .filter(|&s| !self.accepts(matrix.name(s)))
            .collect();
        log::info!(
            "Sequence name filter rejects {} of {} sequences",
            rejected.len(),
            matrix.sequence_count()
        );
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AlignmentMatrix {
        AlignmentMatrix::from_pairs(&[
            ("human_1", "MKV"),
            ("mouse_1", "MKV"),
            ("human_2", "MRV"),
            ("yeast", "MKI"),
        ])
        .unwrap()
    }

    #[test]
    fn test_inactive_filter_rejects_nothing() {
        assert!(SequenceFilter::new().rejected(&sample()).is_empty());
    }

    #[test]
    fn test_regex_rules() {
        let filter = SequenceFilter {
            include_regex: Some(Regex::new("_[0-9]$").unwrap()),
            exclude_regex: Some(Regex::new("^mouse").unwrap()),
            ..Default::default()
        };
        assert_eq!(filter.rejected(&sample()), vec![1, 3]);
    }

    #[test]
    fn test_name_sets() {
        let filter = SequenceFilter {
            exclude_names: Some(["yeast".to_string()].into_iter().collect()),
            ..Default::default()
        };
        assert!(filter.accepts("human_1"));
        assert!(!filter.accepts("yeast"));
        assert_eq!(filter.rejected(&sample()), vec![3]);
    }
}
