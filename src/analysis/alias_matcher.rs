//! Picking the alias an import path starts with.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// How a candidate path is matched against alias tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// The path must start with the token; the longest such token wins, so
    /// `@src/utils` picks `@src` over `@`.
    #[default]
    LongestPrefix,
    /// The path's first `/` segment must equal the token.
    Exact,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AliasMatcher {
    policy: MatchPolicy,
}

impl AliasMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Find the alias `candidate` is written against.
    ///
    /// `None` means the path is not aliased and should be left alone.
    pub fn find<'a>(&self, aliases: &'a [CompactString], candidate: &str) -> Option<&'a str> {
        match self.policy {
            MatchPolicy::LongestPrefix => aliases
                .iter()
                .filter(|alias| !alias.is_empty() && candidate.starts_with(alias.as_str()))
                .max_by_key(|alias| alias.len())
                .map(|alias| alias.as_str()),
            MatchPolicy::Exact => {
                let first = candidate.split('/').next().unwrap_or(candidate);
                aliases
                    .iter()
                    .find(|alias| alias.as_str() == first)
                    .map(|alias| alias.as_str())
            }
        }
    }

    /// Segments of `candidate` after `alias`, empty segments dropped.
    pub fn split<'c>(alias: &str, candidate: &'c str) -> Vec<&'c str> {
        candidate
            .strip_prefix(alias)
            .unwrap_or("")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }
}
