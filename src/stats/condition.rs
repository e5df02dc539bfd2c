//! Conditions gating modifiers and status effects.
//!
//! A condition is a chain of predicate nodes joined by [`LogicOp`]. Every node
//! caches whether it is met and reports a change only on a transition, so
//! repeated updates without a state change are silent.

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::StatType;

bitflags! {
    /// What happens to the owner of a condition once the chain is met.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ResultType: u8 {
        const REMOVE     = 1 << 0;
        const DEACTIVATE = 1 << 1;
    }
}

bitflags! {
    /// Notifications a predicate needs to be re-evaluated on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ConditionTriggers: u8 {
        const TIME   = 1 << 0;
        const STATS  = 1 << 1;
        const DAMAGE = 1 << 2;
    }
}

/// A change notification delivered to conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionTrigger {
    /// Seconds elapsed since the last tick.
    Tick(f32),
    StatsChanged,
    /// Damage received by the owner.
    Damage(f32),
}

impl ConditionTrigger {
    pub fn flag(self) -> ConditionTriggers {
        match self {
            ConditionTrigger::Tick(_) => ConditionTriggers::TIME,
            ConditionTrigger::StatsChanged => ConditionTriggers::STATS,
            ConditionTrigger::Damage(_) => ConditionTriggers::DAMAGE,
        }
    }
}

/// Stat values conditions are evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatSnapshot {
    pub values: HashMap<StatType, f32>,
    pub hp: f32,
}

impl StatSnapshot {
    pub fn get(&self, stat: StatType) -> f32 {
        self.values.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn hp_ratio(&self) -> f32 {
        let max = self.get(StatType::MaxHp);
        if max <= 0.0 {
            0.0
        } else {
            self.hp / max
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicOp {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Less,
    LessEquals,
    Equals,
    NotEquals,
    GreaterEquals,
    Greater,
}

impl CompareOp {
    pub fn compare(self, lhs: f32, rhs: f32) -> bool {
        match self {
            CompareOp::Less => lhs < rhs,
            CompareOp::LessEquals => lhs <= rhs,
            CompareOp::Equals => (lhs - rhs).abs() <= f32::EPSILON,
            CompareOp::NotEquals => (lhs - rhs).abs() > f32::EPSILON,
            CompareOp::GreaterEquals => lhs >= rhs,
            CompareOp::Greater => lhs > rhs,
        }
    }
}

/// Predicate of a single condition node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum ConditionKind {
    /// Met once `seconds` have elapsed.
    Timed {
        seconds: f32,
        #[serde(skip)]
        elapsed: f32,
    },
    StatValue {
        stat: StatType,
        compare: CompareOp,
        value: f32,
    },
    /// Current HP over max HP.
    HpRatio { compare: CompareOp, ratio: f32 },
    /// Met once the owner was hit `count` times.
    DamageCount {
        count: u32,
        #[serde(skip)]
        received: u32,
    },
}

impl ConditionKind {
    pub fn subscriptions(&self) -> ConditionTriggers {
        match self {
            ConditionKind::Timed { .. } => ConditionTriggers::TIME,
            ConditionKind::StatValue { .. } => ConditionTriggers::STATS,
            ConditionKind::HpRatio { .. } => ConditionTriggers::STATS | ConditionTriggers::DAMAGE,
            ConditionKind::DamageCount { .. } => ConditionTriggers::DAMAGE,
        }
    }

    fn observe(&mut self, trigger: ConditionTrigger) {
        match (self, trigger) {
            (ConditionKind::Timed { elapsed, .. }, ConditionTrigger::Tick(delta)) => {
                *elapsed += delta;
            }
            (ConditionKind::DamageCount { received, .. }, ConditionTrigger::Damage(_)) => {
                *received += 1;
            }
            _ => {}
        }
    }

    fn check(&self, snapshot: &StatSnapshot) -> bool {
        match self {
            ConditionKind::Timed { seconds, elapsed } => elapsed >= seconds,
            ConditionKind::StatValue {
                stat,
                compare,
                value,
            } => compare.compare(snapshot.get(*stat), *value),
            ConditionKind::HpRatio { compare, ratio } => {
                compare.compare(snapshot.hp_ratio(), *ratio)
            }
            ConditionKind::DamageCount { count, received } => received >= count,
        }
    }

    /// Like [`reset`](Self::reset), but a timer keeps the time elapsed past
    /// its threshold.
    fn rewind(&mut self) {
        match self {
            ConditionKind::Timed { seconds, elapsed } => {
                *elapsed = (*elapsed - *seconds).max(0.0);
            }
            _ => self.reset(),
        }
    }

    fn reset(&mut self) {
        match self {
            ConditionKind::Timed { elapsed, .. } => *elapsed = 0.0,
            ConditionKind::DamageCount { received, .. } => *received = 0,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub predicate: ConditionKind,
    #[serde(default = "default_result_type")]
    pub result_type: ResultType,
    #[serde(default)]
    pub additional_logic_op: LogicOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_condition: Option<Box<Condition>>,
    #[serde(skip)]
    condition_met: bool,
}

fn default_result_type() -> ResultType {
    ResultType::REMOVE
}

impl Condition {
    pub fn new(predicate: ConditionKind) -> Self {
        Self {
            predicate,
            result_type: default_result_type(),
            additional_logic_op: LogicOp::default(),
            additional_condition: None,
            condition_met: false,
        }
    }

    pub fn timed(seconds: f32) -> Self {
        Self::new(ConditionKind::Timed {
            seconds,
            elapsed: 0.0,
        })
    }

    pub fn stat_value(stat: StatType, compare: CompareOp, value: f32) -> Self {
        Self::new(ConditionKind::StatValue {
            stat,
            compare,
            value,
        })
    }

    pub fn hp_ratio(compare: CompareOp, ratio: f32) -> Self {
        Self::new(ConditionKind::HpRatio { compare, ratio })
    }

    pub fn damage_count(count: u32) -> Self {
        Self::new(ConditionKind::DamageCount { count, received: 0 })
    }

    pub fn with_result(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    /// Appends `other` to the end of the chain.
    pub fn and(self, other: Condition) -> Self {
        self.chain(LogicOp::And, other)
    }

    pub fn or(self, other: Condition) -> Self {
        self.chain(LogicOp::Or, other)
    }

    fn chain(mut self, op: LogicOp, other: Condition) -> Self {
        match self.additional_condition.take() {
            Some(next) => self.additional_condition = Some(Box::new(next.chain(op, other))),
            None => {
                self.additional_logic_op = op;
                self.additional_condition = Some(Box::new(other));
            }
        }
        self
    }

    pub fn is_condition_met(&self) -> bool {
        self.condition_met
    }

    /// Triggers of every node in the chain.
    pub fn subscriptions(&self) -> ConditionTriggers {
        let own = self.predicate.subscriptions();
        match &self.additional_condition {
            Some(next) => own | next.subscriptions(),
            None => own,
        }
    }

    /// Evaluates this node alone, ignoring the chain and the cached state.
    pub fn check_if_condition_met(&self, snapshot: &StatSnapshot) -> bool {
        self.predicate.check(snapshot)
    }

    /// Re-evaluates this node. Returns `true` only if its state changed.
    pub fn update_condition(&mut self, snapshot: &StatSnapshot) -> bool {
        let met = self.check_if_condition_met(snapshot);
        if met == self.condition_met {
            return false;
        }
        self.condition_met = met;
        true
    }

    /// Re-evaluates every node of the chain.
    pub fn update_conditions(&mut self, snapshot: &StatSnapshot) -> bool {
        let changed = self.update_condition(snapshot);
        match self.additional_condition.as_deref_mut() {
            Some(next) => next.update_conditions(snapshot) || changed,
            None => changed,
        }
    }

    /// Delivers a trigger to the subscribed nodes of the chain. Returns `true`
    /// if any node changed state.
    pub fn notify(&mut self, trigger: ConditionTrigger, snapshot: &StatSnapshot) -> bool {
        let changed = if self.predicate.subscriptions().intersects(trigger.flag()) {
            self.predicate.observe(trigger);
            self.update_condition(snapshot)
        } else {
            false
        };
        match self.additional_condition.as_deref_mut() {
            Some(next) => next.notify(trigger, snapshot) || changed,
            None => changed,
        }
    }

    /// Result of the whole chain from the cached node states.
    pub fn check_if_conditions_met(&self) -> bool {
        match (self.additional_condition.as_deref(), self.additional_logic_op) {
            (Some(next), LogicOp::And) if self.condition_met => next.check_if_conditions_met(),
            (Some(next), LogicOp::Or) if !self.condition_met => next.check_if_conditions_met(),
            _ => self.condition_met,
        }
    }

    pub fn should_remove(&self) -> bool {
        self.result_type.contains(ResultType::REMOVE) && self.check_if_conditions_met()
    }

    pub fn should_deactivate(&self) -> bool {
        self.result_type.contains(ResultType::DEACTIVATE) && self.check_if_conditions_met()
    }

    /// Restarts the chain after it fired. Timers carry their overflow into
    /// the next period and every node is re-evaluated against `snapshot`.
    pub fn rewind(&mut self, snapshot: &StatSnapshot) {
        self.predicate.rewind();
        self.condition_met = self.check_if_condition_met(snapshot);
        if let Some(next) = self.additional_condition.as_deref_mut() {
            next.rewind(snapshot);
        }
    }

    /// Clears counters and cached states of the whole chain.
    pub fn reset(&mut self) {
        self.predicate.reset();
        self.condition_met = false;
        if let Some(next) = self.additional_condition.as_deref_mut() {
            next.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(attack: f32, hp: f32) -> StatSnapshot {
        StatSnapshot {
            values: HashMap::from([(StatType::Attack, attack), (StatType::MaxHp, 100.0)]),
            hp,
        }
    }

    #[test]
    fn test_update_is_debounced() {
        let mut condition = Condition::stat_value(StatType::Attack, CompareOp::Greater, 10.0);
        let high = snapshot(20.0, 100.0);
        assert!(condition.update_condition(&high));
        assert!(!condition.update_condition(&high));
        assert!(condition.update_condition(&snapshot(5.0, 100.0)));
    }

    #[test]
    fn test_chain_logic() {
        let s = snapshot(20.0, 30.0);
        let mut and = Condition::stat_value(StatType::Attack, CompareOp::Greater, 10.0)
            .and(Condition::hp_ratio(CompareOp::Less, 0.25));
        and.update_conditions(&s);
        assert!(!and.check_if_conditions_met());

        let mut or = Condition::stat_value(StatType::Attack, CompareOp::Less, 10.0)
            .or(Condition::hp_ratio(CompareOp::Less, 0.5));
        or.update_conditions(&s);
        assert!(or.check_if_conditions_met());

        let chained = Condition::timed(1.0)
            .and(Condition::timed(2.0))
            .or(Condition::damage_count(1));
        let tail = chained
            .additional_condition
            .as_deref()
            .and_then(|c| c.additional_condition.as_deref())
            .unwrap();
        assert_eq!(chained.additional_logic_op, LogicOp::And);
        assert!(matches!(tail.predicate, ConditionKind::DamageCount { count: 1, .. }));
    }

    #[test]
    fn test_notify_only_reaches_subscribers() {
        let s = StatSnapshot::default();
        let mut condition = Condition::timed(2.0).or(Condition::damage_count(2));
        assert_eq!(
            condition.subscriptions(),
            ConditionTriggers::TIME | ConditionTriggers::DAMAGE
        );
        assert!(!condition.notify(ConditionTrigger::Tick(1.0), &s));
        assert!(!condition.notify(ConditionTrigger::StatsChanged, &s));
        assert!(!condition.notify(ConditionTrigger::Damage(3.0), &s));
        assert!(condition.notify(ConditionTrigger::Damage(3.0), &s));
        assert!(condition.should_remove());
        assert!(!condition.should_deactivate());

        condition.reset();
        assert!(!condition.check_if_conditions_met());
        assert!(condition.notify(ConditionTrigger::Tick(2.0), &s));
    }

    #[test]
    fn test_rewind_keeps_overflow() {
        let s = StatSnapshot::default();
        let mut tick = Condition::timed(1.0);
        assert!(tick.notify(ConditionTrigger::Tick(2.5), &s));
        tick.rewind(&s);
        assert!(tick.check_if_conditions_met());
        tick.rewind(&s);
        assert!(!tick.check_if_conditions_met());
        assert!(tick.notify(ConditionTrigger::Tick(0.5), &s));
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "predicate": { "kind": "statValue", "payload": { "stat": "attack", "compare": "greater", "value": 3 } },
            "resultType": "DEACTIVATE",
            "additionalLogicOp": "or",
            "additionalCondition": { "predicate": { "kind": "timed", "payload": { "seconds": 5 } } }
        }"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(condition.result_type, ResultType::DEACTIVATE);
        assert_eq!(condition.additional_logic_op, LogicOp::Or);
        let next = condition.additional_condition.as_deref().unwrap();
        assert_eq!(next.result_type, ResultType::REMOVE);
        assert_eq!(
            next.predicate,
            ConditionKind::Timed {
                seconds: 5.0,
                elapsed: 0.0
            }
        );
    }
}
