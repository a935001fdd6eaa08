use regex::Regex;
use tracing::warn;

/// Compiled set of patterns for paths that never have a packaged counterpart.
///
/// Metadata side files (`.meta`) are the usual example: they sit next to every asset but
/// are never packaged themselves.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<Regex>,
}

impl IgnoreRules {
    /// Compile the given regular expressions. Invalid patterns are logged and skipped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|pattern| match Regex::new(pattern.as_ref()) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!("ignoring invalid path pattern '{}': {err}", pattern.as_ref());
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Determine whether `path` should be rejected before any lookup.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::IgnoreRules;

    #[test]
    fn ignores_metadata_files() {
        let rules = IgnoreRules::new([r"\.meta$"]);
        assert!(rules.is_ignored("/data/characters/hero.png.meta"));
        assert!(!rules.is_ignored("/data/characters/hero.png"));
        assert!(!rules.is_ignored("/data/metadata/hero.png"));
    }

    #[test]
    fn skips_invalid_patterns() {
        let rules = IgnoreRules::new(["(unclosed", r"\.tmp$"]);
        assert!(rules.is_ignored("cache/file.tmp"));
        assert!(!rules.is_ignored("(unclosed"));
    }

    #[test]
    fn empty_rules_keep_everything() {
        assert!(!IgnoreRules::default().is_ignored("anything.meta"));
    }
}
