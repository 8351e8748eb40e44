use super::MultiBucketFixedWindowLimiter;
use crate::config::{Mode, RateLimitConfig};
use crate::error::{RateLimitError, Result};
use crate::pattern::{Pattern, Relationship};

/// A pattern together with the limiter guarding it.
#[derive(Debug)]
pub struct Rule {
    pattern: Pattern,
    limiter: MultiBucketFixedWindowLimiter,
}

impl Rule {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn limiter(&self) -> &MultiBucketFixedWindowLimiter {
        &self.limiter
    }
}

/// Everything one configuration compiles into. Tables are immutable once built;
/// a reload builds a new one and swaps it in whole.
#[derive(Debug)]
pub struct RuleTable {
    pub(crate) app_name: String,
    pub(crate) enabled: bool,
    pub(crate) mode: Mode,
    pub(crate) config_hash: u64,
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Parse and order every pattern of `cfg`, most specific first.
    ///
    /// Fails on the first pattern that does not parse or that is equivalent to,
    /// or overlaps, a pattern already placed; nothing of `cfg` is kept in that
    /// case.
    pub fn compile(cfg: &RateLimitConfig) -> Result<Self> {
        let mut rules: Vec<Rule> = Vec::with_capacity(cfg.paths.len());

        for (text, windows) in &cfg.paths {
            let pattern = Pattern::parse(text)
                .map_err(|source| RateLimitError::Pattern { pattern: text.clone(), source })?;

            let mut position = None;
            for (i, placed) in rules.iter().enumerate() {
                let relationship = pattern.relationship(&placed.pattern);
                if relationship.is_conflict() {
                    return Err(RateLimitError::Conflict {
                        first: placed.pattern.as_str().to_string(),
                        second: text.clone(),
                        relationship,
                    });
                }
                if position.is_none() && relationship == Relationship::MoreSpecific {
                    position = Some(i);
                }
            }

            let rule =
                Rule { pattern, limiter: MultiBucketFixedWindowLimiter::new(windows.clone()) };
            match position {
                Some(i) => rules.insert(i, rule),
                None => rules.push(rule),
            }
        }

        Ok(Self {
            app_name: cfg.app_name.clone(),
            enabled: cfg.enabled,
            mode: cfg.mode,
            config_hash: cfg.content_hash(),
            rules,
        })
    }

    /// First rule matching the request. Rules never overlap, so at most one
    /// rule can match besides those it is nested in, and those come later.
    pub fn find(&self, method: &str, segments: &[&str]) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.pattern.matches(method, segments))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.pattern.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config_hash(&self) -> u64 {
        self.config_hash
    }
}
