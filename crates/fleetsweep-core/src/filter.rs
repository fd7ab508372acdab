//! Resource selection rules
//!
//! A discovered resource is turned into a [`ResourceValue`] and checked
//! against the include/exclude [`FilterRule`]s configured for its kind.
//! Exclusion always wins; with no rules at all, everything is included.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;

/// Facts about one discovered resource
#[derive(Debug, Clone, Default)]
pub struct ResourceValue {
    pub name: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub tags: Option<HashMap<String, String>>,
}

impl ResourceValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_creation_time(mut self, time: DateTime<Utc>) -> Self {
        self.creation_time = Some(time);
        self
    }

    pub fn with_tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(
            tags.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }
}

/// Compiled regular expression matched anywhere in a value
#[derive(Debug, Clone)]
pub struct NamePattern(Regex);

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    /// Substring search, not full-string equality
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Regex> for NamePattern {
    fn from(regex: Regex) -> Self {
        Self(regex)
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A set of predicates combined with AND (name patterns are ORed among themselves)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRule {
    pub name_patterns: Vec<NamePattern>,
    pub time_after: Option<DateTime<Utc>>,
    pub time_before: Option<DateTime<Utc>>,
    pub tag_patterns: Option<HashMap<String, NamePattern>>,
}

/// How a predicate over a fact the resource does not carry is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    Satisfied,
    Unsatisfied,
}

impl FilterRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no predicate is configured
    pub fn is_empty(&self) -> bool {
        self.name_patterns.is_empty()
            && self.time_after.is_none()
            && self.time_before.is_none()
            && self.tag_patterns.as_ref().is_none_or(|t| t.is_empty())
    }

    /// Inclusion: an empty rule matches everything, unknown facts never narrow
    pub fn matches_for_include(&self, value: &ResourceValue) -> bool {
        self.matches(value, Missing::Satisfied)
    }

    /// Exclusion: an empty rule matches nothing, unknown facts never exclude
    pub fn matches_for_exclude(&self, value: &ResourceValue) -> bool {
        !self.is_empty() && self.matches(value, Missing::Unsatisfied)
    }

    fn matches(&self, value: &ResourceValue, missing: Missing) -> bool {
        let absent = missing == Missing::Satisfied;

        if !self.name_patterns.is_empty() {
            let ok = match &value.name {
                Some(name) => self.name_patterns.iter().any(|p| p.is_match(name)),
                None => absent,
            };
            if !ok {
                return false;
            }
        }

        if let Some(after) = self.time_after {
            let ok = match value.creation_time {
                Some(created) => created > after,
                None => absent,
            };
            if !ok {
                return false;
            }
        }

        if let Some(before) = self.time_before {
            let ok = match value.creation_time {
                Some(created) => created < before,
                None => absent,
            };
            if !ok {
                return false;
            }
        }

        if let Some(patterns) = self.tag_patterns.as_ref().filter(|t| !t.is_empty()) {
            let ok = match &value.tags {
                Some(tags) => patterns.iter().all(|(key, pattern)| {
                    tags.get(key).is_some_and(|v| pattern.is_match(v))
                }),
                None => absent,
            };
            if !ok {
                return false;
            }
        }

        true
    }
}

/// Creation-time window set from the command line
///
/// Checked on its own, after the include/exclude rules, so it only ever
/// narrows the selection. Both bounds are strict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeWindow {
    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
}

impl AgeWindow {
    /// A resource without a creation time is not filtered by age
    pub fn contains(&self, created: Option<DateTime<Utc>>) -> bool {
        let Some(created) = created else {
            return true;
        };
        self.created_before.is_none_or(|t| created < t)
            && self.created_after.is_none_or(|t| created > t)
    }
}

/// Include/exclude rules for one resource kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTypeConfig {
    pub include_rule: Option<FilterRule>,
    pub exclude_rule: Option<FilterRule>,
    pub age_window: Option<AgeWindow>,
}

impl ResourceTypeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, rule: FilterRule) -> Self {
        self.include_rule = Some(rule);
        self
    }

    pub fn exclude(mut self, rule: FilterRule) -> Self {
        self.exclude_rule = Some(rule);
        self
    }

    pub fn should_include(&self, value: &ResourceValue) -> bool {
        should_include(value, self)
    }
}

/// Decide whether a discovered resource is eligible for deletion
pub fn should_include(value: &ResourceValue, config: &ResourceTypeConfig) -> bool {
    if let Some(exclude) = &config.exclude_rule {
        if exclude.matches_for_exclude(value) {
            return false;
        }
    }

    if let Some(include) = &config.include_rule {
        if !include.matches_for_include(value) {
            return false;
        }
    }

    config
        .age_window
        .is_none_or(|window| window.contains(value.creation_time))
}

/// Filter configuration for every resource kind, keyed by kind name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    resources: HashMap<String, ResourceTypeConfig>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource_type: impl Into<String>, config: ResourceTypeConfig) {
        self.resources.insert(resource_type.into(), config);
    }

    pub fn with(mut self, resource_type: impl Into<String>, config: ResourceTypeConfig) -> Self {
        self.insert(resource_type, config);
        self
    }

    /// Rules for a kind; kinds without an entry get the empty (include all) config
    pub fn for_kind(&self, resource_type: &str) -> &ResourceTypeConfig {
        static EMPTY: ResourceTypeConfig = ResourceTypeConfig {
            include_rule: None,
            exclude_rule: None,
            age_window: None,
        };
        self.resources.get(resource_type).unwrap_or(&EMPTY)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(|k| k.as_str())
    }

    /// Apply `f` to the rules of every listed kind, creating entries as needed
    pub fn update_all<'a, F>(&mut self, kinds: impl IntoIterator<Item = &'a str>, mut f: F)
    where
        F: FnMut(&mut ResourceTypeConfig),
    {
        for kind in kinds {
            f(self.resources.entry(kind.to_string()).or_default());
        }
    }

    /// Keep only resources created before `time` in every listed kind
    ///
    /// Repeated calls keep the earliest bound.
    pub fn restrict_created_before<'a>(
        &mut self,
        kinds: impl IntoIterator<Item = &'a str>,
        time: DateTime<Utc>,
    ) {
        self.update_all(kinds, |c| {
            let window = c.age_window.get_or_insert_with(AgeWindow::default);
            window.created_before = Some(window.created_before.map_or(time, |t| t.min(time)));
        });
    }

    /// Keep only resources created after `time` in every listed kind
    ///
    /// Repeated calls keep the latest bound.
    pub fn restrict_created_after<'a>(
        &mut self,
        kinds: impl IntoIterator<Item = &'a str>,
        time: DateTime<Utc>,
    ) {
        self.update_all(kinds, |c| {
            let window = c.age_window.get_or_insert_with(AgeWindow::default);
            window.created_after = Some(window.created_after.map_or(time, |t| t.max(time)));
        });
    }
}
