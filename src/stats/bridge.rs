//! Exposes an actor's [`Stats`] to dialog scripts.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bridge::Bridge;
use crate::value::{Value, VarType};

use super::{StatType, Stats};

/// Registers, for `prefix`:
///
/// * `{prefix}_hp`, a float property over current HP,
/// * `{prefix}_stat(name)`, the computed value of a stat,
/// * `{prefix}_has_effect(id)` and `{prefix}_add_effect(id)`.
pub fn register_stats(bridge: &mut Bridge, prefix: &str, stats: Arc<Mutex<Stats>>) {
    let (get, set) = (stats.clone(), stats.clone());
    bridge.register_float(
        format!("{prefix}_hp"),
        move || lock(&get).hp(),
        move |hp| lock(&set).set_hp(hp),
    );

    let s = stats.clone();
    bridge.register_method(
        format!("{prefix}_stat"),
        &[VarType::String],
        VarType::Float,
        move |args| {
            let name = args.first().map(Value::to_string).unwrap_or_default();
            match StatType::from_str(&name) {
                Ok(stat) => Value::Float(lock(&s).get(stat)),
                Err(_) => {
                    log::warn!("Unknown stat {}", name);
                    Value::Float(0.0)
                }
            }
        },
    );

    let s = stats.clone();
    bridge.register_method(
        format!("{prefix}_has_effect"),
        &[VarType::String],
        VarType::Bool,
        move |args| {
            let id = args.first().map(Value::to_string).unwrap_or_default();
            Value::Bool(lock(&s).has_status_effect(&id))
        },
    );

    bridge.register_method(
        format!("{prefix}_add_effect"),
        &[VarType::String],
        VarType::Bool,
        move |args| {
            let id = args.first().map(Value::to_string).unwrap_or_default();
            match lock(&stats).add_status_effect(&id) {
                Ok(()) => Value::Bool(true),
                Err(e) => {
                    log::warn!("{}", e);
                    Value::Bool(false)
                }
            }
        },
    );
}

fn lock(stats: &Mutex<Stats>) -> MutexGuard<'_, Stats> {
    stats.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{StatusEffectData, StatusEffectDb};

    #[test]
    fn test_register_stats() {
        let mut db = StatusEffectDb::new();
        db.register(StatusEffectData::new("haste"));
        let stats = Arc::new(Mutex::new(Stats::new(Arc::new(db))));
        lock(&stats).add_base(StatType::MaxHp, 40.0);
        lock(&stats).add_base(StatType::Attack, 12.0);

        let mut bridge = Bridge::new();
        register_stats(&mut bridge, "player", stats.clone());

        let hp = bridge.property("player_hp").unwrap();
        assert!(hp.set(Value::Float(25.0)));
        assert_eq!(hp.get(), Value::Float(25.0));

        let stat = bridge.method("player_stat").unwrap();
        assert_eq!(stat.call(&[Value::from("attack")]), Value::Float(12.0));
        assert_eq!(stat.call(&[Value::from("mana")]), Value::Float(0.0));

        let add = bridge.method("player_add_effect").unwrap();
        assert_eq!(add.call(&[Value::from("haste")]), Value::Bool(true));
        assert_eq!(add.call(&[Value::from("slow")]), Value::Bool(false));
        let has = bridge.method("player_has_effect").unwrap();
        assert_eq!(has.call(&[Value::from("haste")]), Value::Bool(true));
    }
}
