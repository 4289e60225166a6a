//! Ready-made rule sets

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;

use crate::error::LifecycleError;
use crate::manager::DEFAULT_ON_DEMAND_NAME;
use crate::rule::{ArchiveMode, ManagedPolicy, Rule};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Manual archiving with a 3 minute TTL for the admin dashboard and `Dummy1`
    Demo1,
    /// Forced archiving without user control for the admin dashboard and `Dummy1`
    Demo2,
    AllManualExceptOdd,
    AllEnabledExceptOdd,
    AllEnabled,
    /// No rules: everything falls back to the builtin rule
    AllDisabled,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Demo1,
        Preset::Demo2,
        Preset::AllManualExceptOdd,
        Preset::AllEnabledExceptOdd,
        Preset::AllEnabled,
        Preset::AllDisabled,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Demo1 => "Demo1",
            Preset::Demo2 => "Demo2",
            Preset::AllManualExceptOdd => "AllManualExceptODD",
            Preset::AllEnabledExceptOdd => "AllEnabledExceptODD",
            Preset::AllEnabled => "AllEnabled",
            Preset::AllDisabled => "AllDisabled",
        }
    }

    pub fn rules(&self) -> Vec<Rule> {
        let demo_names = [DEFAULT_ON_DEMAND_NAME, "Dummy1"];
        let three_days = TimeDelta::days(3);
        let protect_odd = || Rule::disabled("Protect ODD").match_on_demand();

        match self {
            Preset::Demo1 => vec![
                Rule::managed(
                    "Manual",
                    ManagedPolicy::permissive(ArchiveMode::Manual).with_ttl(TimeDelta::minutes(3)),
                )
                .match_names(demo_names),
            ],
            Preset::Demo2 => vec![
                Rule::managed(
                    "Enabled without control",
                    ManagedPolicy::locked(ArchiveMode::Enabled).with_ttl(TimeDelta::minutes(3)),
                )
                .match_names(demo_names),
            ],
            Preset::AllManualExceptOdd => vec![
                protect_odd(),
                Rule::managed(
                    "All Manual",
                    ManagedPolicy::permissive(ArchiveMode::Manual).with_ttl(three_days),
                )
                .match_all(),
            ],
            Preset::AllEnabledExceptOdd => vec![
                protect_odd(),
                Rule::managed(
                    "All Enabled",
                    ManagedPolicy::permissive(ArchiveMode::Enabled).with_ttl(three_days),
                )
                .match_all(),
            ],
            Preset::AllEnabled => vec![
                Rule::managed(
                    "All Enabled",
                    ManagedPolicy::permissive(ArchiveMode::Enabled).with_ttl(three_days),
                )
                .match_all(),
            ],
            Preset::AllDisabled => Vec::new(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LifecycleError::Config(format!("unknown rule preset '{s}'")))
    }
}
