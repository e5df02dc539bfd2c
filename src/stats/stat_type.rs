use serde::{Deserialize, Serialize};

/// Stats an actor can carry modifiers for.
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
pub enum StatType {
    #[default]
    MaxHp,
    MaxMp,
    Attack,
    Defense,
    MagicAttack,
    MagicDefense,
    Speed,
    MoveSpeed,
    Evade,
    CritChance,
    CritDamage,
    /// Multiplier on incoming damage, `0` means the actor takes none.
    DamageTaken,
}
