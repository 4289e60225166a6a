//! Archive policy rules and the first-match rule matcher

use std::collections::BTreeSet;

use chrono::TimeDelta;
use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, Result};

/// Name of the fallback rule governing dashboards no configured rule matches.
pub const BUILTIN_RULE_NAME: &str = "Builtin";

/// Archive mode of a managed rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveMode {
    /// Archiving is forced on; the reconciler enables any unarchived match.
    Enabled,
    /// Archiving is left to the user.
    Manual,
}

/// Permissions and TTL carried by a rule that places dashboards under archive management
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedPolicy {
    pub mode: ArchiveMode,
    pub allow_activate: bool,
    pub allow_deactivate: bool,
    pub allow_delete: bool,
    /// Time after the last modification at which an active dashboard is deactivated.
    pub ttl: Option<TimeDelta>,
}

impl ManagedPolicy {
    /// A policy that allows every user-driven transition
    pub fn permissive(mode: ArchiveMode) -> Self {
        Self {
            mode,
            allow_activate: true,
            allow_deactivate: true,
            allow_delete: true,
            ttl: None,
        }
    }

    /// A policy that allows no user-driven transition
    pub fn locked(mode: ArchiveMode) -> Self {
        Self {
            mode,
            allow_activate: false,
            allow_deactivate: false,
            allow_delete: false,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// What a rule does with the dashboards it matches
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchivePolicy {
    /// No tier movement at all, automated or user-driven.
    Disabled,
    Managed(ManagedPolicy),
}

impl ArchivePolicy {
    pub fn is_disabled(&self) -> bool {
        matches!(self, ArchivePolicy::Disabled)
    }

    pub fn mode(&self) -> Option<ArchiveMode> {
        match self {
            ArchivePolicy::Disabled => None,
            ArchivePolicy::Managed(policy) => Some(policy.mode),
        }
    }
}

/// Match conditions of a rule, checked in field order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Matcher {
    pub match_all: bool,
    /// Matches only the on-demand dashboard itself.
    pub match_on_demand: bool,
    pub match_by_name: BTreeSet<String>,
}

impl Matcher {
    pub fn matches(&self, dashboard_name: &str, on_demand_name: &str) -> bool {
        if self.match_all {
            return true;
        }
        if self.match_on_demand && dashboard_name == on_demand_name {
            return true;
        }
        self.match_by_name.contains(dashboard_name)
    }
}

/// A single, immutable policy entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub struct Rule {
    pub rule_name: String,
    pub matcher: Matcher,
    pub policy: ArchivePolicy,
}

impl Rule {
    /// A rule that matches nothing until a matcher is added
    pub fn new(rule_name: impl Into<String>, policy: ArchivePolicy) -> Self {
        Self {
            rule_name: rule_name.into(),
            matcher: Matcher::default(),
            policy,
        }
    }

    pub fn disabled(rule_name: impl Into<String>) -> Self {
        Self::new(rule_name, ArchivePolicy::Disabled)
    }

    pub fn managed(rule_name: impl Into<String>, policy: ManagedPolicy) -> Self {
        Self::new(rule_name, ArchivePolicy::Managed(policy))
    }

    /// The fallback rule: matches everything, archiving disabled
    pub fn builtin() -> Self {
        Self::disabled(BUILTIN_RULE_NAME).match_all()
    }

    pub fn match_all(mut self) -> Self {
        self.matcher.match_all = true;
        self
    }

    pub fn match_on_demand(mut self) -> Self {
        self.matcher.match_on_demand = true;
        self
    }

    pub fn match_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.matcher
            .match_by_name
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn ttl(&self) -> Option<TimeDelta> {
        match &self.policy {
            ArchivePolicy::Disabled => None,
            ArchivePolicy::Managed(policy) => policy.ttl,
        }
    }
}

/// Select the governing rule for a dashboard.
///
/// The first rule in `rules` whose matcher holds wins. Falls back to
/// `default_rule` when none matches.
pub fn match_rule<'a>(
    dashboard_name: &str,
    on_demand_name: &str,
    rules: &'a [Rule],
    default_rule: &'a Rule,
) -> &'a Rule {
    rules
        .iter()
        .find(|rule| rule.matcher.matches(dashboard_name, on_demand_name))
        .unwrap_or(default_rule)
}

/// Parse an ordered rule list from its JSON configuration form
pub fn parse_rules(json: &str) -> Result<Vec<Rule>> {
    serde_json::from_str(json)
        .map_err(|e| Report::new(LifecycleError::Config(format!("unparsable rule list: {e}"))))
}

/// Serialized shape of a rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum ArchiveSetting {
    Disabled,
    Enabled,
    Manual,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    rule_name: String,
    archive: ArchiveSetting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_activate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_deactivate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    match_all: bool,
    #[serde(rename = "matchODD", default, skip_serializing_if = "std::ops::Not::not")]
    match_odd: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    match_by_name: Vec<String>,
}

impl TryFrom<RawRule> for Rule {
    type Error = LifecycleError;

    fn try_from(raw: RawRule) -> std::result::Result<Self, Self::Error> {
        let name = raw.rule_name;
        let policy = match raw.archive {
            ArchiveSetting::Disabled => {
                let has_payload = raw.allow_activate.is_some()
                    || raw.allow_deactivate.is_some()
                    || raw.allow_delete.is_some()
                    || raw.ttl.is_some();
                if has_payload {
                    return Err(LifecycleError::Config(format!(
                        "rule '{name}': a Disabled rule cannot carry allow flags or a ttl"
                    )));
                }
                ArchivePolicy::Disabled
            }
            setting => {
                let mode = if setting == ArchiveSetting::Enabled {
                    ArchiveMode::Enabled
                } else {
                    ArchiveMode::Manual
                };
                let required = |flag: Option<bool>, field: &str| {
                    flag.ok_or_else(|| {
                        LifecycleError::Config(format!("rule '{name}': missing '{field}'"))
                    })
                };
                let ttl = match raw.ttl {
                    Some(ms) if ms < 0 => {
                        return Err(LifecycleError::Config(format!(
                            "rule '{name}': ttl must not be negative"
                        )));
                    }
                    Some(ms) => Some(TimeDelta::milliseconds(ms)),
                    None => None,
                };
                ArchivePolicy::Managed(ManagedPolicy {
                    mode,
                    allow_activate: required(raw.allow_activate, "allowActivate")?,
                    allow_deactivate: required(raw.allow_deactivate, "allowDeactivate")?,
                    allow_delete: required(raw.allow_delete, "allowDelete")?,
                    ttl,
                })
            }
        };

        Ok(Rule {
            rule_name: name,
            matcher: Matcher {
                match_all: raw.match_all,
                match_on_demand: raw.match_odd,
                match_by_name: raw.match_by_name.into_iter().collect(),
            },
            policy,
        })
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        let (archive, allow_activate, allow_deactivate, allow_delete, ttl) = match rule.policy {
            ArchivePolicy::Disabled => (ArchiveSetting::Disabled, None, None, None, None),
            ArchivePolicy::Managed(policy) => (
                match policy.mode {
                    ArchiveMode::Enabled => ArchiveSetting::Enabled,
                    ArchiveMode::Manual => ArchiveSetting::Manual,
                },
                Some(policy.allow_activate),
                Some(policy.allow_deactivate),
                Some(policy.allow_delete),
                policy.ttl.map(|ttl| ttl.num_milliseconds()),
            ),
        };
        RawRule {
            rule_name: rule.rule_name,
            archive,
            allow_activate,
            allow_deactivate,
            allow_delete,
            ttl,
            match_all: rule.matcher.match_all,
            match_odd: rule.matcher.match_on_demand,
            match_by_name: rule.matcher.match_by_name.into_iter().collect(),
        }
    }
}
