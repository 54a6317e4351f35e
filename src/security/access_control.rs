//! User-Agent deny list.
//!
//! Decides whether a request is rejected before any forwarding work happens.
//! Matching is a case-sensitive substring test; an empty or absent
//! User-Agent is always allowed.

use crate::config::AccessConfig;

/// Outcome of [`AccessFilter::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    Allow,
    /// Denied; carries the first configured pattern that matched.
    Deny { pattern: &'a str },
}

impl Verdict<'_> {
    pub fn is_denied(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }
}

/// Static User-Agent filter.
#[derive(Debug, Clone, Default)]
pub struct AccessFilter {
    blocked: Vec<String>,
}

impl AccessFilter {
    pub fn new(blocked: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            blocked: blocked
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.blocked_user_agents.iter().cloned())
    }

    /// Evaluate a User-Agent value. Has no side effects.
    pub fn evaluate(&self, user_agent: Option<&str>) -> Verdict<'_> {
        let Some(user_agent) = user_agent.filter(|ua| !ua.is_empty()) else {
            return Verdict::Allow;
        };

        self.blocked
            .iter()
            .find(|pattern| user_agent.contains(pattern.as_str()))
            .map_or(Verdict::Allow, |pattern| Verdict::Deny {
                pattern: pattern.as_str(),
            })
    }
}
