use std::sync::Arc;

use palaver::pool::MODIFIERS;
use palaver::stats::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn effects() -> Arc<StatusEffectDb> {
    let mut db = StatusEffectDb::new();
    db.register(
        StatusEffectData::new("poison")
            .with_duration(3.5)
            .with_tick(1.0)
            .with_behavior(DamageOverTime(5.0)),
    )
    .register(
        StatusEffectData::new("regen_sickness")
            .with_tick(1.0)
            .with_behavior(DamageOverTime(5.0)),
    )
    .register(
        StatusEffectData::new("guard")
            .with_duration_condition(
                Condition::hp_ratio(CompareOp::Less, 0.5).with_result(ResultType::DEACTIVATE),
            )
            .with_modifier(Modifier::pooled(StatType::Defense, ModOp::Add, 10.0)),
    )
    .register(
        StatusEffectData::new("rage")
            .with_duration(2.0)
            .with_modifier(Modifier::pooled(StatType::Attack, ModOp::PercentAdd, 0.5)),
    );
    Arc::new(db)
}

fn hero() -> Stats {
    let mut stats = Stats::new(effects());
    stats.add_base(StatType::MaxHp, 100.0);
    stats.add_base(StatType::Attack, 20.0);
    stats.set_hp(100.0);
    stats
}

#[test]
fn test_percent_add_compounds_additively() {
    let mut stats = Stats::default();
    stats.add_mod(Modifier::pooled(StatType::Attack, ModOp::BaseAdd, 100.0), None);
    stats.add_mod(Modifier::pooled(StatType::Attack, ModOp::PercentAdd, 0.1), None);
    stats.add_mod(Modifier::pooled(StatType::Attack, ModOp::PercentAdd, 0.2), None);
    assert!(approx(stats.calculate_stat(StatType::Attack, false), 130.0));
}

#[test]
fn test_pooled_modifier_is_reset() {
    let mut stats = Stats::default();
    let modifier = Modifier::pooled(StatType::Speed, ModOp::Replace, 9.0)
        .with_custom_value("haste")
        .with_condition(Condition::timed(10.0))
        .hidden();
    assert!(stats.add_mod(modifier, Some("boots")));
    assert!(stats.remove_mod(StatType::Speed, ModOp::Replace, 9.0, Some("boots")));

    let reused = MODIFIERS.get();
    assert_eq!(reused, Modifier::default());
    assert!(reused.is_active);
    assert!(!reused.is_registered);
    assert!(reused.source.is_none());
    assert!(reused.condition.is_none());
}

#[test]
fn test_deactivated_modifier_is_skipped_then_restored() {
    let mut stats = hero();
    // +50 defense while attack stays below 25
    let condition = Condition::stat_value(StatType::Attack, CompareOp::GreaterEquals, 25.0)
        .with_result(ResultType::DEACTIVATE);
    stats.add_mod(
        Modifier::pooled(StatType::Defense, ModOp::Add, 50.0).with_condition(condition),
        None,
    );
    assert_eq!(stats.get(StatType::Defense), 50.0);

    stats.add_mod(Modifier::pooled(StatType::Attack, ModOp::Add, 10.0), Some("sword"));
    assert_eq!(stats.get(StatType::Defense), 0.0);
    assert_eq!(stats.modifiers(StatType::Defense).len(), 1);

    stats.remove_mod(StatType::Attack, ModOp::Add, 10.0, Some("sword"));
    assert_eq!(stats.get(StatType::Defense), 50.0);
}

#[test]
fn test_removed_modifier_is_pruned_on_change() {
    let mut stats = hero();
    let condition = Condition::hp_ratio(CompareOp::Less, 0.5);
    stats.add_mod(
        Modifier::pooled(StatType::Attack, ModOp::Add, 5.0).with_condition(condition),
        Some("adrenaline"),
    );
    assert_eq!(stats.get(StatType::Attack), 25.0);
    stats.drain_events();

    stats.receive_damage(60.0, None);
    stats.process(0.0);
    assert_eq!(stats.hp(), 40.0);
    assert_eq!(stats.get(StatType::Attack), 20.0);
    assert_eq!(stats.modifiers(StatType::Attack).len(), 1);

    let events = stats.drain_events();
    assert!(events.contains(&StatsEvent::ModChanged(StatType::Attack)));
    assert!(events.iter().any(|e| matches!(e, StatsEvent::Damaged { hp, .. } if *hp == 40.0)));
}

#[test]
fn test_damage_over_time() {
    let mut stats = hero();
    stats.add_status_effect("poison").unwrap();

    for _ in 0..3 {
        stats.process(1.0);
    }
    assert_eq!(stats.hp(), 85.0);
    assert!(stats.has_status_effect("poison"));

    // duration runs out before the fourth tick
    stats.process(1.0);
    assert_eq!(stats.hp(), 85.0);
    assert!(!stats.has_status_effect("poison"));
}

#[test]
fn test_status_effect_modifiers() {
    let mut stats = hero();
    stats.add_status_effect("rage").unwrap();
    assert!(approx(stats.get(StatType::Attack), 30.0));

    // re-adding is a no-op, refreshing restarts the duration
    stats.process(1.5);
    stats.add_status_effect("rage").unwrap();
    assert_eq!(stats.modifiers(StatType::Attack).len(), 2);
    assert!(stats.refresh_status_effect("rage"));
    stats.process(1.5);
    assert!(stats.has_status_effect("rage"));

    stats.process(0.5);
    assert!(!stats.has_status_effect("rage"));
    assert_eq!(stats.get(StatType::Attack), 20.0);

    let events = stats.drain_events();
    assert!(events.contains(&StatsEvent::StatusEffectAdded("rage".into())));
    assert!(events.contains(&StatsEvent::StatusEffectRemoved("rage".into())));
}

#[test]
fn test_condition_json_on_modifier() {
    let json = r#"{
        "statType": "defense",
        "op": "percent_mult",
        "value": 0.5,
        "condition": {
            "predicate": { "kind": "damageCount", "payload": { "count": 2 } }
        }
    }"#;
    let modifier: Modifier = serde_json::from_str(json).unwrap();
    assert!(modifier.is_active);

    let mut stats = hero();
    stats.add_base(StatType::Defense, 10.0);
    assert!(stats.add_mod(modifier, Some("shield")));
    assert_eq!(stats.get(StatType::Defense), 15.0);

    stats.receive_damage(1.0, None);
    stats.receive_damage(1.0, None);
    stats.process(0.0);
    assert_eq!(stats.get(StatType::Defense), 10.0);
}

#[test]
fn test_expiring_effect_reevaluates_conditions() {
    let mut stats = hero();
    // +50 defense while attack stays below 25
    let condition = Condition::stat_value(StatType::Attack, CompareOp::GreaterEquals, 25.0)
        .with_result(ResultType::DEACTIVATE);
    stats.add_mod(
        Modifier::pooled(StatType::Defense, ModOp::Add, 50.0).with_condition(condition),
        None,
    );

    stats.add_status_effect("rage").unwrap();
    assert!(approx(stats.get(StatType::Attack), 30.0));
    assert_eq!(stats.get(StatType::Defense), 0.0);

    stats.process(2.0);
    assert!(!stats.has_status_effect("rage"));
    assert_eq!(stats.get(StatType::Attack), 20.0);
    assert_eq!(stats.get(StatType::Defense), 50.0);
}

#[test]
fn test_long_frame_fires_every_interval() {
    let mut stats = hero();
    stats.add_status_effect("regen_sickness").unwrap();

    stats.process(2.5);
    assert_eq!(stats.hp(), 90.0);
    // the half second left over completes the next interval
    stats.process(0.5);
    assert_eq!(stats.hp(), 85.0);
}

#[test]
fn test_duration_condition_suspends_effect() {
    let mut stats = hero();
    stats.add_status_effect("guard").unwrap();
    assert!(stats.has_status_effect("guard"));
    assert_eq!(stats.get(StatType::Defense), 10.0);

    stats.receive_damage(60.0, None);
    stats.process(0.0);
    assert!(!stats.has_status_effect("guard"));
    assert_eq!(stats.status_effects().count(), 1);
    assert_eq!(stats.get(StatType::Defense), 0.0);

    // still applied, so adding again does not stack
    stats.add_status_effect("guard").unwrap();
    assert_eq!(stats.get(StatType::Defense), 0.0);

    stats.set_hp(100.0);
    assert!(stats.has_status_effect("guard"));
    assert_eq!(stats.get(StatType::Defense), 10.0);

    assert!(stats.remove_status_effect("guard"));
    assert_eq!(stats.get(StatType::Defense), 0.0);
}
