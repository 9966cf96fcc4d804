//! Ban reason matching
//!
//! Moderators are not consistent about how they write rule numbers into ban
//! reasons, so the matcher accepts the common spellings of the target rule.

use regex::Regex;
use tracing::warn;

/// Matches ban reasons against a target rule
pub struct RuleMatcher {
    patterns: Vec<Regex>,
}

impl RuleMatcher {
    /// Build a matcher for the given rule text (e.g. "Rule 7").
    ///
    /// Accepts the literal rule plus the `"{rule} violation"`,
    /// `"violating {rule}"` and `"broke {rule}"` phrasings; when the rule is
    /// of the form "Rule N" the `rule N`, `rN` and bare-number spellings are
    /// accepted too.
    #[must_use]
    pub fn new(target_rule: &str) -> Self {
        let rule = target_rule.trim().to_lowercase();
        let literal = regex::escape(&rule);

        let mut sources = vec![
            literal.clone(),
            format!("{literal} violation"),
            format!("violating {literal}"),
            format!("broke {literal}"),
        ];

        if let Some(number) = Self::rule_number(&rule) {
            sources.push(format!(r"rule\s*{number}\b"));
            sources.push(format!(r"\br{number}\b"));
            sources.push(format!(r"\b{number}\b"));
        }

        let patterns = sources
            .into_iter()
            .filter_map(|source| match Regex::new(&format!("(?i){source}")) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(source = %source, error = %e, "Skipping unbuildable rule pattern");
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    fn rule_number(rule: &str) -> Option<&str> {
        let rest = rule.strip_prefix("rule")?.trim_start();
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            Some(rest)
        } else {
            None
        }
    }

    /// Whether a ban reason refers to the target rule
    #[must_use]
    pub fn matches(&self, reason: &str) -> bool {
        let normalized = reason.trim();
        if normalized.is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| p.is_match(normalized))
    }
}
