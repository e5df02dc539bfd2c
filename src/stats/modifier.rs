use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pool::{Poolable, MODIFIERS};

use super::{Condition, StatType};

/// Modifier operations, declared in the order they are folded.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModOp {
    #[default]
    BaseAdd,
    /// Consecutive entries are summed and applied as one multiplier.
    PercentAdd,
    Add,
    PercentMult,
    Negate,
    /// Lower bound.
    Min,
    /// Upper bound.
    Max,
    Replace,
    Zero,
    One,
}

impl ModOp {
    pub fn order_index(self) -> usize {
        self as usize
    }

    pub fn apply(self, acc: f32, value: f32) -> f32 {
        match self {
            ModOp::BaseAdd | ModOp::Add => acc + value,
            ModOp::PercentAdd | ModOp::PercentMult => acc * (1.0 + value),
            ModOp::Negate => -acc,
            ModOp::Min => acc.max(value),
            ModOp::Max => acc.min(value),
            ModOp::Replace => value,
            ModOp::Zero => 0.0,
            ModOp::One => 1.0,
        }
    }
}

/// Folds `(op, value)` pairs already sorted by precedence.
pub fn fold_modifiers(base: f32, modifiers: impl IntoIterator<Item = (ModOp, f32)>) -> f32 {
    let mut acc = base;
    let mut percent = None;

    for (op, value) in modifiers {
        if op == ModOp::PercentAdd {
            *percent.get_or_insert(0.0) += value;
            continue;
        }
        if let Some(sum) = percent.take() {
            acc *= 1.0 + sum;
        }
        acc = op.apply(acc, value);
    }

    if let Some(sum) = percent {
        acc *= 1.0 + sum;
    }
    acc
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Modifier {
    pub stat_type: StatType,
    pub op: ModOp,
    pub value: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Takes the value from the owner's custom values instead of `value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_value_id: Option<String>,
    pub is_hidden: bool,
    /// `None` for an independent modifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip)]
    pub is_active: bool,
    #[serde(skip)]
    pub is_registered: bool,
}

impl Default for Modifier {
    fn default() -> Self {
        Self {
            stat_type: StatType::default(),
            op: ModOp::default(),
            value: 0.0,
            condition: None,
            custom_value_id: None,
            is_hidden: false,
            source: None,
            is_active: true,
            is_registered: false,
        }
    }
}

impl Poolable for Modifier {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Modifier {
    /// Takes a modifier from [`MODIFIERS`] and initializes it.
    pub fn pooled(stat_type: StatType, op: ModOp, value: f32) -> Self {
        let mut modifier = MODIFIERS.get();
        modifier.init(stat_type, op, value);
        modifier
    }

    /// Pooled copy of `self`.
    pub fn pooled_copy(&self) -> Self {
        let mut modifier = MODIFIERS.get();
        modifier.clone_from(self);
        modifier.is_registered = false;
        modifier
    }

    pub fn init(&mut self, stat_type: StatType, op: ModOp, value: f32) -> &mut Self {
        *self = Self {
            stat_type,
            op,
            value,
            ..Self::default()
        };
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_custom_value(mut self, id: impl Into<String>) -> Self {
        self.custom_value_id = Some(id.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    pub fn effective_value(&self, custom_values: &HashMap<String, f32>) -> f32 {
        match &self.custom_value_id {
            Some(id) => custom_values.get(id).copied().unwrap_or_else(|| {
                log::warn!("Custom value {} not set", id);
                0.0
            }),
            None => self.value,
        }
    }

    pub fn should_remove(&self) -> bool {
        self.condition.as_ref().is_some_and(Condition::should_remove)
    }

    pub fn should_deactivate(&self) -> bool {
        self.condition
            .as_ref()
            .is_some_and(Condition::should_deactivate)
    }

    pub fn matches(&self, op: ModOp, value: f32, source: Option<&str>) -> bool {
        self.op == op && (self.value - value).abs() <= f32::EPSILON && self.source.as_deref() == source
    }
}
