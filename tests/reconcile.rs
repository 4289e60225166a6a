use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ondemand_dashboard::prelude::*;

fn stores() -> (Arc<MemoryHotStore>, Arc<MemoryArchiveStore>) {
    (Arc::new(MemoryHotStore::new()), Arc::new(MemoryArchiveStore::new()))
}

fn manager(
    rules: Vec<Rule>,
    hot: &Arc<MemoryHotStore>,
    archive: &Arc<MemoryArchiveStore>,
) -> DashboardManager {
    DashboardManager::new(
        ManagerContext::new(rules, DEFAULT_ON_DEMAND_NAME),
        hot.clone(),
        archive.clone(),
    )
}

fn enabled_all() -> Rule {
    Rule::managed("All Enabled", ManagedPolicy::permissive(ArchiveMode::Enabled)).match_all()
}

fn manual_with_ttl(ms: i64) -> Rule {
    Rule::managed(
        "Manual",
        ManagedPolicy::permissive(ArchiveMode::Manual).with_ttl(TimeDelta::milliseconds(ms)),
    )
    .match_all()
}

fn find<'a>(snapshots: &'a [DashboardSnapshot], name: &str) -> &'a DashboardSnapshot {
    snapshots
        .iter()
        .find(|s| s.dashboard_name == name)
        .expect("snapshot present")
}

#[tokio::test]
async fn forced_enable_archives_hot_only_dashboard() {
    let (hot, archive) = stores();
    hot.insert_at("Dummy1", "body", Utc::now());
    let m = manager(vec![enabled_all()], &hot, &archive);

    let before = m.get_info().await.unwrap();
    let dummy = find(&before, "Dummy1");
    assert_eq!(dummy.live_state, LiveState::Disabled);
    assert!(dummy.is_forced_enabled);
    assert_eq!(plan_reconciliation(dummy, Utc::now()), Some(Action::enable("Dummy1")));

    assert!(m.apply_rules(&before, Utc::now()).await.unwrap());

    let after = m.get_info().await.unwrap();
    assert_eq!(find(&after, "Dummy1").live_state, LiveState::Active);
}

#[tokio::test]
async fn ttl_expiry_deactivates_after_deadline() {
    let (hot, archive) = stores();
    let t: DateTime<Utc> = Utc::now() - TimeDelta::hours(2);
    hot.insert_at("Dummy2", "body", t);
    archive.insert_at("Dummy2", "body", t - TimeDelta::seconds(5));
    let m = manager(vec![manual_with_ttl(180_000)], &hot, &archive);

    let before = m.get_info().await.unwrap();
    let dummy = find(&before, "Dummy2");
    assert_eq!(dummy.updated_at, Some(t));
    assert_eq!(dummy.deactivate_at, Some(t + TimeDelta::milliseconds(180_000)));

    let just_before = t + TimeDelta::milliseconds(179_999);
    assert!(!m.apply_rules(&before, just_before).await.unwrap());
    assert!(hot.contains("Dummy2"));

    let just_after = t + TimeDelta::milliseconds(180_001);
    assert!(m.apply_rules(&before, just_after).await.unwrap());

    let after = m.get_info().await.unwrap();
    assert_eq!(find(&after, "Dummy2").live_state, LiveState::Inactive);
    assert_eq!(archive.body("Dummy2").as_deref(), Some("body"));
}

#[tokio::test]
async fn forced_disable_pulls_dashboard_out_of_archive() {
    let (hot, archive) = stores();
    archive.insert_at("legacy", "archived", Utc::now());
    let m = manager(vec![], &hot, &archive);

    let info = m.get_stable_info().await.unwrap();

    let legacy = find(&info, "legacy");
    assert_eq!(legacy.live_state, LiveState::Disabled);
    assert_eq!(legacy.matched_rule_name, BUILTIN_RULE_NAME);
    assert_eq!(hot.body("legacy").as_deref(), Some("archived"));
    assert!(!archive.contains("legacy"));
}

#[tokio::test]
async fn stable_info_without_changes_is_returned_as_is() {
    let (hot, archive) = stores();
    hot.insert_at("dash10", "b", Utc::now());
    hot.insert_at("dash2", "b", Utc::now());
    let m = manager(vec![], &hot, &archive);

    let info = m.get_stable_info().await.unwrap();

    let names: Vec<_> = info.iter().map(|s| s.dashboard_name.as_str()).collect();
    assert_eq!(names, vec!["dash2", "dash10"]);
    assert!(info.iter().all(|s| s.live_state == LiveState::Disabled));
}

#[tokio::test]
async fn empty_inventory_changes_nothing() {
    let (hot, archive) = stores();
    let m = manager(vec![enabled_all()], &hot, &archive);
    assert!(m.get_stable_info().await.unwrap().is_empty());
    assert!(!m.apply_rules(&[], Utc::now()).await.unwrap());
}

#[tokio::test]
async fn scheduled_job_runs_a_reconciliation_pass() {
    let (hot, archive) = stores();
    hot.insert_at("a", "body", Utc::now());
    hot.insert_at(DEFAULT_ON_DEMAND_NAME, "admin", Utc::now());
    let rules = Preset::AllEnabledExceptOdd.rules();
    let m = manager(rules, &hot, &archive);

    m.execute(&Action::ScheduledJob).await.unwrap();

    assert_eq!(archive.body("a").as_deref(), Some("body"));
    assert!(!archive.contains(DEFAULT_ON_DEMAND_NAME));
}

#[tokio::test]
async fn reconciliation_failure_is_reported_after_other_dashboards() {
    let (hot, archive) = stores();
    hot.insert_at("a", "body-a", Utc::now());
    hot.insert_at("b", "body-b", Utc::now());
    let m = manager(vec![enabled_all()], &hot, &archive);

    let info = m.get_info().await.unwrap();
    archive.set_failing_for("a", true);
    let err = m.apply_rules(&info, Utc::now()).await.unwrap_err();

    assert_eq!(err.current_context(), &LifecycleError::Reconcile { failed: 1 });
    assert!(!archive.contains("a"));
    assert_eq!(archive.body("b").as_deref(), Some("body-b"));

    archive.set_failing_for("a", false);
    let after = m.get_stable_info().await.unwrap();
    assert!(after.iter().all(|s| s.live_state == LiveState::Active));
}

#[tokio::test]
async fn whole_store_outage_counts_every_dashboard() {
    let (hot, archive) = stores();
    hot.insert_at("a", "body", Utc::now());
    hot.insert_at("b", "body", Utc::now());
    let m = manager(vec![enabled_all()], &hot, &archive);

    let info = m.get_info().await.unwrap();
    archive.set_failing(true);
    let err = m.apply_rules(&info, Utc::now()).await.unwrap_err();

    assert_eq!(err.current_context(), &LifecycleError::Reconcile { failed: 2 });
}

#[tokio::test]
async fn unreachable_ttl_deadline_keeps_dashboard_active() {
    let (hot, archive) = stores();
    let t = Utc::now() - TimeDelta::hours(2);
    hot.insert_at("far", "body", t);
    archive.insert_at("far", "body", t);
    let rules = parse_rules(
        r#"[{"ruleName": "Forever", "archive": "Manual", "matchAll": true,
            "allowActivate": true, "allowDeactivate": true, "allowDelete": true,
            "ttl": 9000000000000000000}]"#,
    )
    .unwrap();
    let m = manager(rules, &hot, &archive);

    let info = m.get_stable_info().await.unwrap();
    m.execute(&Action::ScheduledJob).await.unwrap();

    let far = find(&info, "far");
    assert_eq!(far.live_state, LiveState::Active);
    assert_eq!(far.deactivate_at, None);
    assert!(hot.contains("far"));
}

#[tokio::test]
async fn inventory_failure_propagates() {
    let (hot, archive) = stores();
    hot.set_failing(true);
    let m = manager(vec![], &hot, &archive);
    assert!(m.get_stable_info().await.is_err());
}

#[tokio::test]
async fn policy_disabled_never_reports_permissions() {
    let (hot, archive) = stores();
    hot.insert_at(DEFAULT_ON_DEMAND_NAME, "admin", Utc::now());
    archive.insert_at("old", "x", Utc::now());
    let rules = vec![Rule::disabled("Protect ODD").match_on_demand(), manual_with_ttl(1)];
    let m = manager(rules, &hot, &archive);

    let info = m.get_info().await.unwrap();
    let odd = find(&info, DEFAULT_ON_DEMAND_NAME);
    assert!(odd.is_forced_disabled);
    assert!(!odd.can_enable && !odd.can_disable && !odd.can_delete);
    assert!(!odd.can_activate && !odd.can_deactivate);
    assert_eq!(odd.deactivate_at, None);

    let old = find(&info, "old");
    assert!(old.can_delete && old.can_activate);
}
