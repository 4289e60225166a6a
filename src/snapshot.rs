//! Per-dashboard state derived from the two tier inventories

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::rule::{ArchiveMode, ArchivePolicy, Rule, match_rule};
use crate::store::DashboardEntry;

/// Whether a dashboard currently has an archive copy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ArchiveTier {
    Enabled,
    Disabled,
}

/// Lifecycle state of a dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LiveState {
    /// Not under archive management (no archive copy)
    Disabled,
    /// In both tiers
    Active,
    /// Archive only
    Inactive,
}

/// Derived view of one dashboard, recomputed on every pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub dashboard_name: String,
    pub archive_tier: ArchiveTier,
    pub live_state: LiveState,
    pub matched_rule_name: String,
    pub is_forced_enabled: bool,
    pub is_forced_disabled: bool,
    pub can_enable: bool,
    pub can_disable: bool,
    pub can_delete: bool,
    pub can_activate: bool,
    pub can_deactivate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivate_at: Option<DateTime<Utc>>,
}

/// Build the snapshot of a single dashboard from its entries in each tier
pub fn derive_snapshot(
    dashboard_name: &str,
    hot: Option<&DashboardEntry>,
    archive: Option<&DashboardEntry>,
    rule: &Rule,
) -> DashboardSnapshot {
    let has_hot = hot.is_some();
    let has_archive = archive.is_some();

    let live_state = match (has_archive, has_hot) {
        (false, _) => LiveState::Disabled,
        (true, true) => LiveState::Active,
        (true, false) => LiveState::Inactive,
    };
    let archive_tier = if has_archive {
        ArchiveTier::Enabled
    } else {
        ArchiveTier::Disabled
    };

    let is_forced_enabled = rule.policy.mode() == Some(ArchiveMode::Enabled);
    let is_forced_disabled = rule.policy.is_disabled();

    let updated_at = match (hot, archive) {
        (Some(hot), Some(archive)) => Some(hot.last_modified.max(archive.last_modified)),
        _ => None,
    };

    let mut snapshot = DashboardSnapshot {
        dashboard_name: dashboard_name.to_string(),
        archive_tier,
        live_state,
        matched_rule_name: rule.rule_name.clone(),
        is_forced_enabled,
        is_forced_disabled,
        can_enable: false,
        can_disable: false,
        can_delete: false,
        can_activate: false,
        can_deactivate: false,
        updated_at,
        deactivate_at: None,
    };

    if let ArchivePolicy::Managed(policy) = &rule.policy {
        snapshot.can_enable = has_hot && !has_archive && !is_forced_enabled;
        snapshot.can_disable = has_hot && has_archive && !is_forced_enabled;
        snapshot.can_delete = !has_hot && has_archive && policy.allow_delete;
        snapshot.can_activate = has_archive && !has_hot && policy.allow_activate;
        snapshot.can_deactivate = has_archive && has_hot && policy.allow_deactivate;
        // A deadline past the representable range never expires.
        snapshot.deactivate_at = updated_at
            .zip(policy.ttl)
            .and_then(|(at, ttl)| at.checked_add_signed(ttl));
    }

    snapshot
}

/// Derive one snapshot per dashboard found in either inventory.
///
/// The result is sorted with [`natural_cmp`]. When an inventory lists the
/// same name twice, its most recently modified entry is used.
pub fn derive_snapshots(
    hot: &[DashboardEntry],
    archive: &[DashboardEntry],
    rules: &[Rule],
    default_rule: &Rule,
    on_demand_name: &str,
) -> Vec<DashboardSnapshot> {
    type Pair<'a> = (Option<&'a DashboardEntry>, Option<&'a DashboardEntry>);
    let mut by_name: BTreeMap<&str, Pair<'_>> = BTreeMap::new();

    for entry in hot {
        let slot = &mut by_name.entry(entry.name.as_str()).or_default().0;
        *slot = Some(latest(*slot, entry));
    }
    for entry in archive {
        let slot = &mut by_name.entry(entry.name.as_str()).or_default().1;
        *slot = Some(latest(*slot, entry));
    }

    let mut snapshots: Vec<DashboardSnapshot> = by_name
        .into_iter()
        .map(|(name, (hot, archive))| {
            let rule = match_rule(name, on_demand_name, rules, default_rule);
            derive_snapshot(name, hot, archive, rule)
        })
        .collect();

    snapshots.sort_by(|a, b| natural_cmp(&a.dashboard_name, &b.dashboard_name));
    snapshots
}

fn latest<'a>(
    current: Option<&'a DashboardEntry>,
    candidate: &'a DashboardEntry,
) -> &'a DashboardEntry {
    match current {
        Some(current) if current.last_modified >= candidate.last_modified => current,
        _ => candidate,
    }
}

/// Numeric-aware, case-insensitive ordering ("dash2" < "dash10", "alpha" < "Beta").
///
/// Punctuation sorts before digits and digits before letters, so
/// "dash-old" < "dash1" < "dasha". Digit runs compare by value. Names that
/// only differ in case fall back to byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = split_runs(a);
    let right = split_runs(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = x.class.cmp(&y.class).then_with(|| match x.class {
            CharClass::Digit => compare_digits(x.text, y.text),
            CharClass::Punct | CharClass::Letter => x
                .text
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(y.text.chars().flat_map(char::to_lowercase)),
        });
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CharClass {
    Punct,
    Digit,
    Letter,
}

impl CharClass {
    fn of(ch: char) -> Self {
        if ch.is_ascii_digit() {
            CharClass::Digit
        } else if ch.is_alphanumeric() {
            CharClass::Letter
        } else {
            CharClass::Punct
        }
    }
}

struct Run<'a> {
    class: CharClass,
    text: &'a str,
}

fn split_runs(s: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current = None;

    for (idx, ch) in s.char_indices() {
        let class = CharClass::of(ch);
        match current {
            Some(prev) if prev != class => {
                runs.push(Run {
                    class: prev,
                    text: &s[start..idx],
                });
                start = idx;
            }
            _ => {}
        }
        current = Some(class);
    }
    if let Some(class) = current {
        runs.push(Run {
            class,
            text: &s[start..],
        });
    }
    runs
}

fn compare_digits(x: &str, y: &str) -> Ordering {
    let x_trimmed = x.trim_start_matches('0');
    let y_trimmed = y.trim_start_matches('0');
    x_trimmed
        .len()
        .cmp(&y_trimmed.len())
        .then_with(|| x_trimmed.cmp(y_trimmed))
        .then_with(|| x.len().cmp(&y.len()))
}
