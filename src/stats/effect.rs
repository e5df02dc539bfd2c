use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Condition, Modifier, Stats, StatsError};

/// Hooks run by [`Stats`] over the life of a status effect.
pub trait EffectBehavior: Send + Sync + fmt::Debug {
    /// Applies the effect's modifier bundle.
    fn enter(&self, stats: &mut Stats, effect: &StatusEffectData) {
        let source = effect.source();
        for template in &effect.modifiers {
            stats.add_mod(template.pooled_copy(), Some(&source));
        }
    }

    fn exit(&self, stats: &mut Stats, effect: &StatusEffectData) {
        stats.remove_mods_from_source(&effect.source());
    }

    /// Runs every time the tick condition is met.
    fn interval(&self, _stats: &mut Stats, _effect: &StatusEffectData) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl EffectBehavior for DefaultBehavior {}

/// Queues `damage` against the owner on every tick.
#[derive(Debug, Clone, Copy)]
pub struct DamageOverTime(pub f32);

impl EffectBehavior for DamageOverTime {
    fn interval(&self, stats: &mut Stats, effect: &StatusEffectData) {
        stats.receive_damage(self.0, Some(&effect.source()));
    }
}

/// Immutable definition of a status effect, shared by every actor it is
/// applied to.
#[derive(Debug, Clone)]
pub struct StatusEffectData {
    pub id: String,
    /// Ends the effect once it signals removal.
    pub duration: Option<Condition>,
    /// Drives [`EffectBehavior::interval`]. Time past the threshold carries
    /// over, so one long frame can fire several intervals.
    pub tick: Option<Condition>,
    pub modifiers: Vec<Modifier>,
    pub behavior: Arc<dyn EffectBehavior>,
}

impl StatusEffectData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration: None,
            tick: None,
            modifiers: Vec::new(),
            behavior: Arc::new(DefaultBehavior),
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(Condition::timed(seconds));
        self
    }

    pub fn with_duration_condition(mut self, condition: Condition) -> Self {
        self.duration = Some(condition);
        self
    }

    pub fn with_tick(mut self, seconds: f32) -> Self {
        self.tick = Some(Condition::timed(seconds));
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_behavior(mut self, behavior: impl EffectBehavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    /// Source key of the modifiers and damage this effect produces.
    pub fn source(&self) -> String {
        format!("effect:{}", self.id)
    }
}

/// An effect applied to one actor.
#[derive(Debug, Clone)]
pub struct StatusEffect {
    pub data: Arc<StatusEffectData>,
    pub duration: Option<Condition>,
    pub tick: Option<Condition>,
    /// Cleared while a `DEACTIVATE` duration condition holds. A suspended
    /// effect has its modifiers withdrawn and does not tick.
    pub is_active: bool,
}

impl StatusEffect {
    pub fn new(data: Arc<StatusEffectData>) -> Self {
        let mut duration = data.duration.clone();
        let mut tick = data.tick.clone();
        for condition in duration.iter_mut().chain(tick.iter_mut()) {
            condition.reset();
        }
        Self {
            data,
            duration,
            tick,
            is_active: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Restarts the duration.
    pub fn refresh(&mut self) {
        if let Some(duration) = self.duration.as_mut() {
            duration.reset();
        }
    }
}

/// Registry of status effect definitions by id.
#[derive(Debug, Clone, Default)]
pub struct StatusEffectDb {
    effects: HashMap<String, Arc<StatusEffectData>>,
}

impl StatusEffectDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, data: StatusEffectData) -> &mut Self {
        if self.effects.contains_key(&data.id) {
            log::warn!("Status effect {} registered twice, replacing", data.id);
        }
        self.effects.insert(data.id.clone(), Arc::new(data));
        self
    }

    pub fn get(&self, id: &str) -> Result<Arc<StatusEffectData>, StatsError> {
        self.effects
            .get(id)
            .cloned()
            .ok_or_else(|| StatsError::UnknownStatusEffect(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }
}
