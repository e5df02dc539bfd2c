//! Host surface exposed to dialog scripts.
//!
//! Properties and methods are registered explicitly by name at startup. The
//! evaluator binds them by exact name match; anything unregistered resolves to
//! "not found" and variables fall back to the session storage.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::value::{Value, VarType};

pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;
pub type MethodFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct BridgeProperty {
    var_type: VarType,
    getter: Getter,
    setter: Option<Setter>,
}

impl BridgeProperty {
    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    pub fn get(&self) -> Value {
        (self.getter)().coerce(self.var_type)
    }

    /// Returns `false` if the property is read-only.
    pub fn set(&self, value: Value) -> bool {
        match &self.setter {
            Some(setter) => {
                setter(value.coerce(self.var_type));
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct BridgeMethod {
    params: Vec<VarType>,
    return_type: VarType,
    func: MethodFn,
}

impl BridgeMethod {
    pub fn params(&self) -> &[VarType] {
        &self.params
    }

    pub fn return_type(&self) -> VarType {
        self.return_type
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args).coerce(self.return_type)
    }
}

/// Registration table of named properties and methods.
#[derive(Clone, Default)]
pub struct Bridge {
    properties: HashMap<String, BridgeProperty>,
    methods: HashMap<String, BridgeMethod>,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_property(
        &mut self,
        name: impl Into<String>,
        var_type: VarType,
        getter: impl Fn() -> Value + Send + Sync + 'static,
        setter: Option<Setter>,
    ) -> &mut Self {
        let name = name.into();
        if self.properties.contains_key(&name) {
            log::warn!("Bridge property {} registered twice, replacing", name);
        }
        self.properties.insert(
            name,
            BridgeProperty {
                var_type,
                getter: Arc::new(getter),
                setter,
            },
        );
        self
    }

    pub fn register_float(
        &mut self,
        name: impl Into<String>,
        get: impl Fn() -> f32 + Send + Sync + 'static,
        set: impl Fn(f32) + Send + Sync + 'static,
    ) -> &mut Self {
        self.register_property(
            name,
            VarType::Float,
            move || Value::Float(get()),
            Some(Arc::new(move |v: Value| set(v.to_float()))),
        )
    }

    pub fn register_bool(
        &mut self,
        name: impl Into<String>,
        get: impl Fn() -> bool + Send + Sync + 'static,
        set: impl Fn(bool) + Send + Sync + 'static,
    ) -> &mut Self {
        self.register_property(
            name,
            VarType::Bool,
            move || Value::Bool(get()),
            Some(Arc::new(move |v: Value| set(v.to_bool()))),
        )
    }

    pub fn register_string(
        &mut self,
        name: impl Into<String>,
        get: impl Fn() -> String + Send + Sync + 'static,
        set: impl Fn(String) + Send + Sync + 'static,
    ) -> &mut Self {
        self.register_property(
            name,
            VarType::String,
            move || Value::String(get()),
            Some(Arc::new(move |v: Value| set(v.to_string()))),
        )
    }

    pub fn register_method(
        &mut self,
        name: impl Into<String>,
        params: &[VarType],
        return_type: VarType,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        let name = name.into();
        if self.methods.contains_key(&name) {
            log::warn!("Bridge method {} registered twice, replacing", name);
        }
        self.methods.insert(
            name,
            BridgeMethod {
                params: params.to_vec(),
                return_type,
                func: Arc::new(func),
            },
        );
        self
    }

    pub fn property(&self, name: &str) -> Option<&BridgeProperty> {
        self.properties.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&BridgeMethod> {
        self.methods.get(name)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let property = self.properties.remove(name).is_some();
        let method = self.methods.remove(name).is_some();
        property || method
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut properties: Vec<_> = self.properties.keys().collect();
        let mut methods: Vec<_> = self.methods.keys().collect();
        properties.sort();
        methods.sort();
        f.debug_struct("Bridge")
            .field("properties", &properties)
            .field("methods", &methods)
            .finish()
    }
}

/// A bridge table shared by every session, replaceable while sessions run.
#[derive(Debug)]
pub struct SharedBridge {
    inner: ArcSwap<Bridge>,
}

impl Default for SharedBridge {
    fn default() -> Self {
        Self::new(Bridge::new())
    }
}

impl SharedBridge {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            inner: ArcSwap::from_pointee(bridge),
        }
    }

    pub fn load(&self) -> Arc<Bridge> {
        self.inner.load_full()
    }

    pub fn store(&self, bridge: Bridge) {
        self.inner.store(Arc::new(bridge));
    }

    /// Copies the current table, applies `f` and publishes the result.
    pub fn update(&self, f: impl Fn(&mut Bridge)) {
        self.inner.rcu(|current| {
            let mut next = Bridge::clone(current);
            f(&mut next);
            next
        });
    }
}

impl From<Bridge> for SharedBridge {
    fn from(bridge: Bridge) -> Self {
        Self::new(bridge)
    }
}
