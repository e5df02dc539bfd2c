//! Stat/modifier engine.
//!
//! A [`Stats`] instance belongs to one actor. Modifiers are kept per stat in
//! precedence order and folded on demand by [`Stats::calculate_stat`].
//! Conditions attached to modifiers and status effects are re-evaluated
//! synchronously whenever the actor's state changes.

pub mod bridge;
mod condition;
mod effect;
mod modifier;
mod stat_type;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use strum::IntoEnumIterator;

pub use self::condition::*;
pub use self::effect::*;
pub use self::modifier::*;
pub use self::stat_type::StatType;

pub use crate::error::StatsError;
use crate::pool::{MODIFIERS, MODIFIER_LISTS};

/// Upper bound on notification passes spent settling one mutation.
pub const MAX_NOTIFY_PASSES: usize = 8;

/// Upper bound on intervals a single tick condition fires per pass.
const MAX_INTERVALS_PER_PASS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct DamageData {
    pub amount: f32,
    pub source: Option<String>,
}

/// Changes reported to the owner, drained with [`Stats::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatsEvent {
    StatChanged(StatType),
    ModChanged(StatType),
    StatusEffectAdded(String),
    StatusEffectRemoved(String),
    Damaged {
        amount: f32,
        hp: f32,
        source: Option<String>,
    },
}

#[derive(Debug)]
pub struct Stats {
    modifiers: HashMap<StatType, Vec<Modifier>>,
    status_effects: BTreeMap<String, StatusEffect>,
    damage_to_process: VecDeque<DamageData>,
    effects_db: Arc<StatusEffectDb>,
    custom_values: HashMap<String, f32>,
    hp: f32,
    events: Vec<StatsEvent>,
    notifying: bool,
    stats_dirty: bool,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(Arc::default())
    }
}

impl Stats {
    pub fn new(effects_db: Arc<StatusEffectDb>) -> Self {
        Self {
            modifiers: HashMap::new(),
            status_effects: BTreeMap::new(),
            damage_to_process: VecDeque::new(),
            effects_db,
            custom_values: HashMap::new(),
            hp: 0.0,
            events: Vec::new(),
            notifying: false,
            stats_dirty: false,
        }
    }

    /// Adds a `BaseAdd` modifier owned by the `base` source.
    pub fn add_base(&mut self, stat: StatType, value: f32) -> bool {
        self.add_mod(Modifier::pooled(stat, ModOp::BaseAdd, value), Some("base"))
    }

    /// Registers `modifier` under `source`. An independent modifier (no
    /// source) whose condition already signals removal is rejected.
    pub fn add_mod(&mut self, mut modifier: Modifier, source: Option<&str>) -> bool {
        modifier.source = source.map(str::to_string);

        if let Some(condition) = modifier.condition.as_mut() {
            let snapshot = self.snapshot();
            condition.update_conditions(&snapshot);
        }
        if modifier.source.is_none() && modifier.should_remove() {
            log::debug!(
                "Rejected {} {} modifier, its condition is already met",
                modifier.stat_type,
                modifier.op
            );
            MODIFIERS.release(modifier);
            return false;
        }

        modifier.is_active = !modifier.should_deactivate();
        modifier.is_registered = true;

        let stat = modifier.stat_type;
        let list = self
            .modifiers
            .entry(stat)
            .or_insert_with(|| MODIFIER_LISTS.get());
        let at = list.partition_point(|m| m.op <= modifier.op);
        list.insert(at, modifier);

        self.mod_changed(stat);
        self.notify(ConditionTrigger::StatsChanged);
        true
    }

    /// Removes the first modifier matching `(op, value, source)` and returns it
    /// to the pool. Returns `false` if nothing matched.
    pub fn remove_mod(&mut self, stat: StatType, op: ModOp, value: f32, source: Option<&str>) -> bool {
        let Some(list) = self.modifiers.get_mut(&stat) else {
            return false;
        };
        let Some(index) = list.iter().position(|m| m.matches(op, value, source)) else {
            return false;
        };

        MODIFIERS.release(list.remove(index));
        self.prune(stat);
        self.mod_changed(stat);
        self.notify(ConditionTrigger::StatsChanged);
        true
    }

    /// Removes every modifier registered under `source`.
    pub fn remove_mods_from_source(&mut self, source: &str) -> usize {
        let mut changed = Vec::new();
        let mut removed = 0;
        for (stat, list) in self.modifiers.iter_mut() {
            let before = list.len();
            let mut kept = MODIFIER_LISTS.get();
            for modifier in list.drain(..) {
                if modifier.source.as_deref() == Some(source) {
                    MODIFIERS.release(modifier);
                } else {
                    kept.push(modifier);
                }
            }
            std::mem::swap(list, &mut kept);
            MODIFIER_LISTS.release(kept);
            if list.len() != before {
                removed += before - list.len();
                changed.push(*stat);
            }
        }

        for stat in changed.iter().copied() {
            self.prune(stat);
            self.mod_changed(stat);
        }
        if removed > 0 {
            self.notify(ConditionTrigger::StatsChanged);
        }
        removed
    }

    pub fn modifiers(&self, stat: StatType) -> &[Modifier] {
        self.modifiers.get(&stat).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Folds the active modifiers of `stat` starting from zero. Hidden
    /// modifiers are skipped when `ignore_hidden` is set.
    pub fn calculate_stat(&self, stat: StatType, ignore_hidden: bool) -> f32 {
        let Some(list) = self.modifiers.get(&stat) else {
            return 0.0;
        };
        fold_modifiers(
            0.0,
            list.iter()
                .filter(|m| m.is_active && !(ignore_hidden && m.is_hidden))
                .map(|m| (m.op, m.effective_value(&self.custom_values))),
        )
    }

    pub fn get(&self, stat: StatType) -> f32 {
        self.calculate_stat(stat, false)
    }

    pub fn set_custom_value(&mut self, id: impl Into<String>, value: f32) {
        let id = id.into();
        let stats: Vec<StatType> = self
            .modifiers
            .iter()
            .filter(|(_, list)| {
                list.iter()
                    .any(|m| m.custom_value_id.as_deref() == Some(id.as_str()))
            })
            .map(|(stat, _)| *stat)
            .collect();
        self.custom_values.insert(id, value);
        for stat in stats {
            self.events.push(StatsEvent::StatChanged(stat));
        }
        self.notify(ConditionTrigger::StatsChanged);
    }

    pub fn custom_value(&self, id: &str) -> Option<f32> {
        self.custom_values.get(id).copied()
    }

    pub fn hp(&self) -> f32 {
        self.hp
    }

    pub fn max_hp(&self) -> f32 {
        self.get(StatType::MaxHp)
    }

    pub fn set_hp(&mut self, hp: f32) {
        self.hp = hp.clamp(0.0, self.max_hp().max(0.0));
        self.notify(ConditionTrigger::StatsChanged);
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    pub fn add_status_effect(&mut self, id: &str) -> Result<(), StatsError> {
        if self.status_effects.contains_key(id) {
            log::debug!("Status effect {} already applied", id);
            return Ok(());
        }

        let data = self.effects_db.get(id)?;
        let snapshot = self.snapshot();
        let mut effect = StatusEffect::new(data.clone());
        for condition in effect.duration.iter_mut().chain(effect.tick.iter_mut()) {
            condition.update_conditions(&snapshot);
        }
        effect.is_active = !effect
            .duration
            .as_ref()
            .is_some_and(Condition::should_deactivate);
        let active = effect.is_active;
        self.status_effects.insert(id.to_string(), effect);
        self.events.push(StatsEvent::StatusEffectAdded(id.to_string()));
        if active {
            data.behavior.enter(self, &data);
        }
        Ok(())
    }

    /// Restarts the duration of an active effect.
    pub fn refresh_status_effect(&mut self, id: &str) -> bool {
        let snapshot = self.snapshot();
        let Some(effect) = self.status_effects.get_mut(id) else {
            return false;
        };
        effect.refresh();
        if let Some(duration) = effect.duration.as_mut() {
            duration.update_conditions(&snapshot);
        }

        let active = !effect
            .duration
            .as_ref()
            .is_some_and(Condition::should_deactivate);
        if active != effect.is_active {
            effect.is_active = active;
            let data = effect.data.clone();
            if active {
                data.behavior.enter(self, &data);
            } else {
                data.behavior.exit(self, &data);
            }
        }
        true
    }

    pub fn remove_status_effect(&mut self, id: &str) -> bool {
        let Some(effect) = self.status_effects.remove(id) else {
            return false;
        };
        let data = effect.data;
        if effect.is_active {
            data.behavior.exit(self, &data);
        }
        self.events.push(StatsEvent::StatusEffectRemoved(id.to_string()));
        true
    }

    /// Whether the effect is applied and not suspended by its duration
    /// condition.
    pub fn has_status_effect(&self, id: &str) -> bool {
        self.status_effects.get(id).is_some_and(|e| e.is_active)
    }

    pub fn status_effects(&self) -> impl Iterator<Item = &StatusEffect> {
        self.status_effects.values()
    }

    /// Queues damage for the next [`process`](Self::process).
    pub fn receive_damage(&mut self, amount: f32, source: Option<&str>) {
        self.damage_to_process.push_back(DamageData {
            amount,
            source: source.map(str::to_string),
        });
    }

    /// Advances time by `delta` seconds, then applies queued damage.
    pub fn process(&mut self, delta: f32) {
        self.notify(ConditionTrigger::Tick(delta));

        while let Some(damage) = self.damage_to_process.pop_front() {
            let max = self.max_hp().max(0.0);
            self.hp = (self.hp - damage.amount).clamp(0.0, max);
            log::trace!("Took {} damage, hp {}", damage.amount, self.hp);
            self.events.push(StatsEvent::Damaged {
                amount: damage.amount,
                hp: self.hp,
                source: damage.source,
            });
            self.notify(ConditionTrigger::Damage(damage.amount));
        }
    }

    pub fn snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            values: StatType::iter()
                .filter(|s| self.modifiers.contains_key(s))
                .map(|s| (s, self.get(s)))
                .collect(),
            hp: self.hp,
        }
    }

    pub fn drain_events(&mut self) -> Vec<StatsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Delivers `trigger` to every subscribed condition. Changes made while
    /// handling it are settled by further `StatsChanged` passes, up to
    /// [`MAX_NOTIFY_PASSES`].
    pub fn notify(&mut self, trigger: ConditionTrigger) {
        if self.notifying {
            self.stats_dirty = true;
            return;
        }
        self.notifying = true;

        self.notify_pass(trigger);
        let mut passes = 1;
        while std::mem::take(&mut self.stats_dirty) {
            if passes >= MAX_NOTIFY_PASSES {
                log::warn!("Conditions did not settle after {} passes", passes);
                break;
            }
            self.notify_pass(ConditionTrigger::StatsChanged);
            passes += 1;
        }

        self.notifying = false;
    }

    fn notify_pass(&mut self, trigger: ConditionTrigger) {
        let snapshot = self.snapshot();
        let flag = trigger.flag();

        let mut changed = Vec::new();
        for (stat, list) in self.modifiers.iter_mut() {
            let mut stat_changed = false;
            let mut i = 0;
            while i < list.len() {
                let Some(condition) = list[i].condition.as_mut() else {
                    i += 1;
                    continue;
                };
                if !condition.subscriptions().intersects(flag)
                    || !condition.notify(trigger, &snapshot)
                {
                    i += 1;
                    continue;
                }

                stat_changed = true;
                if condition.should_remove() {
                    MODIFIERS.release(list.remove(i));
                    continue;
                }
                let deactivate = condition.should_deactivate();
                list[i].is_active = !deactivate;
                i += 1;
            }
            if stat_changed {
                changed.push(*stat);
            }
        }
        if !changed.is_empty() {
            self.stats_dirty = true;
        }
        for stat in changed {
            self.prune(stat);
            self.mod_changed(stat);
        }

        let mut expired = Vec::new();
        let mut toggled = Vec::new();
        let mut intervals = Vec::new();
        for (id, effect) in self.status_effects.iter_mut() {
            if let Some(duration) = effect.duration.as_mut() {
                if duration.notify(trigger, &snapshot) {
                    if duration.should_remove() {
                        expired.push(id.clone());
                        continue;
                    }
                    let active = !duration.should_deactivate();
                    if active != effect.is_active {
                        effect.is_active = active;
                        toggled.push((effect.data.clone(), active));
                    }
                }
            }
            if !effect.is_active {
                continue;
            }
            if let Some(tick) = effect.tick.as_mut() {
                if tick.notify(trigger, &snapshot) && tick.check_if_conditions_met() {
                    let mut fired = 0;
                    while tick.check_if_conditions_met() && fired < MAX_INTERVALS_PER_PASS {
                        intervals.push(effect.data.clone());
                        tick.rewind(&snapshot);
                        fired += 1;
                    }
                    if fired == MAX_INTERVALS_PER_PASS {
                        tick.reset();
                    }
                }
            }
        }
        for (data, active) in toggled {
            log::debug!(
                "Status effect {} {}",
                data.id,
                if active { "resumed" } else { "suspended" }
            );
            if active {
                data.behavior.enter(self, &data);
            } else {
                data.behavior.exit(self, &data);
            }
        }
        for data in intervals {
            data.behavior.interval(self, &data);
        }
        for id in expired {
            self.remove_status_effect(&id);
        }
    }

    fn mod_changed(&mut self, stat: StatType) {
        self.events.push(StatsEvent::ModChanged(stat));
        self.events.push(StatsEvent::StatChanged(stat));
    }

    fn prune(&mut self, stat: StatType) {
        if self.modifiers.get(&stat).is_some_and(Vec::is_empty) {
            if let Some(list) = self.modifiers.remove(&stat) {
                MODIFIER_LISTS.release(list);
            }
        }
    }
}

impl Drop for Stats {
    fn drop(&mut self) {
        for (_, mut list) in self.modifiers.drain() {
            for modifier in list.drain(..) {
                MODIFIERS.release(modifier);
            }
            MODIFIER_LISTS.release(list);
        }
    }
}
