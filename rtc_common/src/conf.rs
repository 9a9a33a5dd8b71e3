//! Configuration variables.
//!
//! A component binds its variables to named parameters with
//! [`ConfigAdmin::bind_parameter`]. Values live in string form inside named
//! configuration sets; [`ConfigAdmin::update`] converts the active set and
//! writes it into every bound [`Param`] handle, rejecting values that fail
//! to parse or fall outside the declared [`Constraint`].
//!
//! Declarative metadata (`__type__`, `__widget__`, `__constraints__`) comes
//! from the module profile as [`ParamSpec`]s.

use crate::config::ConfigError;
use crate::consts::DEFAULT_CONFIG_SET;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Declared type of a configuration variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// 16-bit integer
    Short,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Free text
    String,
}

impl FromStr for ParamType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "short" => Ok(ParamType::Short),
            "int" => Ok(ParamType::Int),
            "long" => Ok(ParamType::Long),
            "float" => Ok(ParamType::Float),
            "double" => Ok(ParamType::Double),
            "string" => Ok(ParamType::String),
            other => Err(ConfigError::ParseError(format!(
                "unknown parameter type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Short => "short",
            ParamType::Int => "int",
            ParamType::Long => "long",
            ParamType::Float => "float",
            ParamType::Double => "double",
            ParamType::String => "string",
        };
        f.write_str(s)
    }
}

/// Editing widget hint for tools (`conf.__widget__.*`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    /// Plain text entry
    Text,
    /// Slider with step size
    Slider(f64),
    /// Spin box with step size
    Spin(f64),
    /// Radio buttons over an enumeration constraint
    Radio,
    /// Check boxes over an enumeration constraint
    Checkbox,
    /// Ordered list editor
    OrderedList,
    /// Anything else, kept verbatim
    Other(String),
}

impl Widget {
    /// Parse `slider.0.01`, `spin.1`, `text`, … Unknown kinds are kept as [`Widget::Other`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let (kind, arg) = match s.split_once('.') {
            Some((k, a)) => (k, Some(a)),
            None => (s, None),
        };
        let step = || arg.and_then(|a| a.parse::<f64>().ok()).unwrap_or(1.0);
        match kind {
            "text" => Widget::Text,
            "slider" => Widget::Slider(step()),
            "spin" => Widget::Spin(step()),
            "radio" => Widget::Radio,
            "checkbox" => Widget::Checkbox,
            "ordered_list" => Widget::OrderedList,
            _ => Widget::Other(s.to_string()),
        }
    }
}

/// One side of a range constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bound {
    /// Limit value
    pub value: f64,
    /// Whether the limit itself is allowed
    pub inclusive: bool,
}

/// Value constraint (`conf.__constraints__.*`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Numeric range with optional lower / upper bounds
    Range {
        /// Lower bound
        lower: Option<Bound>,
        /// Upper bound
        upper: Option<Bound>,
    },
    /// Allowed literal values
    Enumeration(Vec<String>),
}

impl Constraint {
    /// Parse a constraint expression.
    ///
    /// Accepted forms: `-1.5<x<1.5`, `0<=x`, `x<=100`, `x>0`, `10>x`, `(a,b,c)`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let s: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let bad = || ConfigError::ParseError(format!("invalid constraint '{text}'"));

        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let items: Vec<String> = inner
                .split(',')
                .filter(|i| !i.is_empty())
                .map(str::to_string)
                .collect();
            if items.is_empty() {
                return Err(bad());
            }
            return Ok(Constraint::Enumeration(items));
        }

        if s.matches('x').count() != 1 {
            return Err(bad());
        }
        let (left, right) = s.split_once('x').ok_or_else(bad)?;

        let mut lower = None;
        let mut upper = None;

        // "<lhs><op>x": lhs < x means a lower bound
        if !left.is_empty() {
            let (value, op) = split_trailing_op(left).ok_or_else(bad)?;
            let bound = parse_bound(value, op.ends_with('=')).ok_or_else(bad)?;
            if op.starts_with('<') {
                lower = Some(bound);
            } else {
                upper = Some(bound);
            }
        }

        // "x<op><rhs>": x < rhs means an upper bound
        if !right.is_empty() {
            let (op, value) = split_leading_op(right).ok_or_else(bad)?;
            let bound = parse_bound(value, op.ends_with('=')).ok_or_else(bad)?;
            let slot = if op.starts_with('<') {
                &mut upper
            } else {
                &mut lower
            };
            if slot.is_some() {
                return Err(bad());
            }
            *slot = Some(bound);
        }

        if lower.is_none() && upper.is_none() {
            return Err(bad());
        }
        Ok(Constraint::Range { lower, upper })
    }

    /// Check a raw value against the constraint.
    pub fn check(&self, raw: &str) -> bool {
        match self {
            Constraint::Enumeration(items) => items.iter().any(|i| i == raw.trim()),
            Constraint::Range { lower, upper } => {
                let Ok(v) = raw.trim().parse::<f64>() else {
                    return false;
                };
                if v.is_nan() {
                    return false;
                }
                let above =
                    lower.is_none_or(|b| if b.inclusive { v >= b.value } else { v > b.value });
                let below =
                    upper.is_none_or(|b| if b.inclusive { v <= b.value } else { v < b.value });
                above && below
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Enumeration(items) => write!(f, "({})", items.join(",")),
            Constraint::Range { lower, upper } => {
                if let Some(b) = lower {
                    write!(f, "{}{}", b.value, if b.inclusive { "<=" } else { "<" })?;
                }
                f.write_str("x")?;
                if let Some(b) = upper {
                    write!(f, "{}{}", if b.inclusive { "<=" } else { "<" }, b.value)?;
                }
                Ok(())
            }
        }
    }
}

fn split_trailing_op(s: &str) -> Option<(&str, &str)> {
    ["<=", ">=", "<", ">"]
        .into_iter()
        .find_map(|op| s.strip_suffix(op).map(|v| (v, op)))
}

fn split_leading_op(s: &str) -> Option<(&str, &str)> {
    ["<=", ">=", "<", ">"]
        .into_iter()
        .find_map(|op| s.strip_prefix(op).map(|v| (op, v)))
}

fn parse_bound(value: &str, inclusive: bool) -> Option<Bound> {
    let value = value.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(Bound { value, inclusive })
}

/// Declarative description of one configuration variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Variable name
    pub name: String,
    /// Default value string
    pub default: String,
    /// Declared type, if any
    pub ty: Option<ParamType>,
    /// Widget hint, if any
    pub widget: Option<Widget>,
    /// Value constraint, if any
    pub constraint: Option<Constraint>,
}

/// Rust types that can back a configuration variable.
pub trait ParamValue: Clone + Send + Sync + 'static {
    /// Matching declared type.
    const PARAM_TYPE: ParamType;

    /// Convert the string form. `None` if it does not parse.
    fn parse_value(raw: &str) -> Option<Self>;
}

macro_rules! impl_param_value {
    ($t:ty, $pt:expr) => {
        impl ParamValue for $t {
            const PARAM_TYPE: ParamType = $pt;

            fn parse_value(raw: &str) -> Option<Self> {
                raw.trim().parse::<$t>().ok()
            }
        }
    };
}

impl_param_value!(i16, ParamType::Short);
impl_param_value!(i32, ParamType::Int);
impl_param_value!(i64, ParamType::Long);
impl_param_value!(f32, ParamType::Float);
impl_param_value!(f64, ParamType::Double);

impl ParamValue for String {
    const PARAM_TYPE: ParamType = ParamType::String;

    fn parse_value(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

/// Shared handle to a bound configuration variable.
///
/// The component keeps one clone, the [`ConfigAdmin`] another; `update()`
/// writes through it.
#[derive(Debug, Clone)]
pub struct Param<T: ParamValue> {
    inner: Arc<RwLock<T>>,
}

impl<T: ParamValue> Param<T> {
    /// Create an unbound variable holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: T) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl<T: ParamValue + Default> Default for Param<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

trait Binding: Send + Sync {
    fn assign(&self, raw: &str) -> bool;
}

impl<T: ParamValue> Binding for Param<T> {
    fn assign(&self, raw: &str) -> bool {
        match T::parse_value(raw) {
            Some(v) => {
                self.set(v);
                true
            }
            None => false,
        }
    }
}

/// Configuration sets and bound variables of one component.
pub struct ConfigAdmin {
    specs: BTreeMap<String, ParamSpec>,
    sets: BTreeMap<String, BTreeMap<String, String>>,
    active: String,
    changed: bool,
    bindings: BTreeMap<String, Box<dyn Binding>>,
}

impl fmt::Debug for ConfigAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigAdmin")
            .field("specs", &self.specs)
            .field("sets", &self.sets)
            .field("active", &self.active)
            .field("changed", &self.changed)
            .field("bound", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ConfigAdmin {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ConfigAdmin {
    /// Create the admin and the `default` set from parameter specs.
    pub fn new(specs: &[ParamSpec]) -> Self {
        let default_set = specs
            .iter()
            .map(|s| (s.name.clone(), s.default.clone()))
            .collect();
        let mut sets = BTreeMap::new();
        sets.insert(DEFAULT_CONFIG_SET.to_string(), default_set);
        Self {
            specs: specs.iter().map(|s| (s.name.clone(), s.clone())).collect(),
            sets,
            active: DEFAULT_CONFIG_SET.to_string(),
            changed: true,
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `param` to the variable `name`, writing `default` into it.
    ///
    /// # Errors
    /// - `TypeMismatch` if the profile declares a different type
    /// - `InvalidValue` if `default` does not parse as `T`
    /// - `ValidationError` if `name` is already bound
    pub fn bind_parameter<T: ParamValue>(
        &mut self,
        name: &str,
        param: &Param<T>,
        default: &str,
    ) -> Result<(), ConfigError> {
        if self.bindings.contains_key(name) {
            return Err(ConfigError::ValidationError(format!(
                "'{name}' is already bound"
            )));
        }
        if let Some(declared) = self.specs.get(name).and_then(|s| s.ty) {
            if declared != T::PARAM_TYPE {
                return Err(ConfigError::TypeMismatch {
                    name: name.to_string(),
                    declared: declared.to_string(),
                    bound: T::PARAM_TYPE.to_string(),
                });
            }
        }
        let value = T::parse_value(default).ok_or_else(|| ConfigError::InvalidValue {
            name: name.to_string(),
            value: default.to_string(),
        })?;
        param.set(value);

        self.sets
            .entry(DEFAULT_CONFIG_SET.to_string())
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| default.to_string());
        self.bindings.insert(name.to_string(), Box::new(param.clone()));
        debug!("Bound configuration variable '{}' (default {})", name, default);
        Ok(())
    }

    /// Add or replace a configuration set.
    pub fn add_configuration_set(&mut self, id: &str, values: BTreeMap<String, String>) {
        if id == self.active {
            self.changed = true;
        }
        self.sets.insert(id.to_string(), values);
    }

    /// Set one value in an existing configuration set.
    ///
    /// # Errors
    /// - `UnknownSet` if `set_id` does not exist
    /// - `UnknownParameter` if `name` is neither declared nor bound
    pub fn set_value(&mut self, set_id: &str, name: &str, value: &str) -> Result<(), ConfigError> {
        let known = self.specs.contains_key(name) || self.bindings.contains_key(name);
        let set = self
            .sets
            .get_mut(set_id)
            .ok_or_else(|| ConfigError::UnknownSet(set_id.to_string()))?;
        if !known {
            return Err(ConfigError::UnknownParameter(name.to_string()));
        }
        set.insert(name.to_string(), value.to_string());
        if set_id == self.active {
            self.changed = true;
        }
        Ok(())
    }

    /// Switch the active configuration set. Takes effect on the next `update()`.
    pub fn activate_configuration_set(&mut self, id: &str) -> Result<(), ConfigError> {
        if !self.sets.contains_key(id) {
            return Err(ConfigError::UnknownSet(id.to_string()));
        }
        info!("Activating configuration set '{}'", id);
        self.active = id.to_string();
        self.changed = true;
        Ok(())
    }

    /// Id of the active configuration set.
    pub fn active_set_id(&self) -> &str {
        &self.active
    }

    /// Values of a configuration set.
    pub fn configuration_set(&self, id: &str) -> Option<&BTreeMap<String, String>> {
        self.sets.get(id)
    }

    /// Ids of all configuration sets.
    pub fn set_ids(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }

    /// Spec of a variable.
    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.get(name)
    }

    /// True once the active set was modified or switched since the last update.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Names of bound variables.
    pub fn bound_names(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    /// Apply the active set to all bound variables.
    ///
    /// Valid values are always applied. Values that do not parse or violate
    /// their constraint leave the variable untouched and are reported
    /// together in one `ValidationError`.
    ///
    /// Returns the number of variables written.
    pub fn update(&mut self) -> Result<usize, ConfigError> {
        self.changed = false;
        let Some(set) = self.sets.get(&self.active) else {
            return Err(ConfigError::UnknownSet(self.active.clone()));
        };

        let mut applied = 0;
        let mut rejected = Vec::new();
        for (name, binding) in &self.bindings {
            let Some(raw) = set.get(name) else {
                continue;
            };
            let constraint = self.specs.get(name).and_then(|s| s.constraint.as_ref());
            if let Some(c) = constraint {
                if !c.check(raw) {
                    rejected.push(ConfigError::ConstraintViolation {
                        name: name.clone(),
                        value: raw.clone(),
                        constraint: c.to_string(),
                    });
                    continue;
                }
            }
            if binding.assign(raw) {
                applied += 1;
            } else {
                rejected.push(ConfigError::InvalidValue {
                    name: name.clone(),
                    value: raw.clone(),
                });
            }
        }

        if rejected.is_empty() {
            debug!("Configuration set '{}' applied ({} values)", self.active, applied);
            return Ok(applied);
        }
        for err in &rejected {
            warn!("Configuration set '{}': {}", self.active, err);
        }
        let msg = rejected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError(msg))
    }

    /// `update()` only when [`Self::is_changed`].
    pub fn update_if_changed(&mut self) -> Result<usize, ConfigError> {
        if !self.changed {
            return Ok(0);
        }
        self.update()
    }
}
