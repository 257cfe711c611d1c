use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

mod error;

pub use error::MacroError;

/// A runtime value of the macro language.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// A variable slot that has never been given a value, or the result of
    /// a subroutine that returns nothing.
    #[default]
    Undef,
    Int(i64),
    Str(String),
    Array(ArrayValue),
}

/// Key of an array element. Integer and string keys coexist in one array;
/// integers order before strings so iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArrayKey {
    Int(i64),
    Str(String),
}

impl ArrayKey {
    pub fn from_value(v: &Value) -> Result<ArrayKey, MacroError> {
        match v {
            Value::Int(i) => Ok(ArrayKey::Int(*i)),
            Value::Str(s) => Ok(ArrayKey::Str(s.clone())),
            other => Err(MacroError::runtime(format!(
                "{} cannot be used as an array index",
                other.kind_name()
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ArrayKey::Int(i) => Value::Int(*i),
            ArrayKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{}", i),
            ArrayKey::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// An associative array with by-value semantics for macro authors.
///
/// The backing map is shared on clone and copied on first mutation, so
/// assigning an array to a second variable is cheap and mutating through
/// one reference is never observable through another.
#[derive(Debug, Clone, Default)]
pub struct ArrayValue {
    entries: Rc<BTreeMap<ArrayKey, Value>>,
}

impl ArrayValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: ArrayKey, value: Value) {
        Rc::make_mut(&mut self.entries).insert(key, value);
    }

    pub fn remove(&mut self, key: &ArrayKey) -> Option<Value> {
        Rc::make_mut(&mut self.entries).remove(key)
    }

    pub fn contains(&self, key: &ArrayKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ArrayKey> {
        self.entries.keys()
    }

    /// The keys of this array as a new dense (0..n int-keyed) array.
    pub fn key_snapshot(&self) -> ArrayValue {
        let mut out = ArrayValue::new();
        for (i, key) in self.entries.keys().enumerate() {
            out.insert(ArrayKey::Int(i as i64), key.to_value());
        }
        out
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries) || self.entries == other.entries
    }
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undef => "an undefined value",
            Value::Int(_) => "an integer",
            Value::Str(_) => "a string",
            Value::Array(_) => "an array",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undef => false,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
        }
    }

    /// Numeric view: ints pass through, numeric-looking strings coerce.
    pub fn as_int(&self) -> Result<i64, MacroError> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Str(s) => s.trim().parse::<i64>().map_err(|_| {
                MacroError::runtime(format!("string {:?} is not a number", s))
            }),
            Value::Undef => Err(MacroError::runtime("operand has no value")),
            Value::Array(_) => Err(MacroError::runtime("array used as a number")),
        }
    }

    /// Text view used by concatenation and string-taking builtins.
    pub fn as_text(&self) -> Result<String, MacroError> {
        match self {
            Value::Int(i) => Ok(i.to_string()),
            Value::Str(s) => Ok(s.clone()),
            Value::Undef => Err(MacroError::runtime("operand has no value")),
            Value::Array(_) => Err(MacroError::runtime("array used as a string")),
        }
    }

    /// Lossless rendering for display (shell, dialogs, the REPL).
    pub fn to_string_value(&self) -> String {
        match self {
            Value::Undef => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
            Value::Array(items) => {
                let body = items
                    .entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_string_value()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_mutation_is_not_visible_through_older_reference() {
        let mut a = ArrayValue::new();
        a.insert(ArrayKey::Int(0), Value::Str("shared".into()));
        let b = a.clone();
        a.insert(ArrayKey::Int(1), Value::Int(9));
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(&ArrayKey::Int(0)), Some(&Value::Str("shared".into())));
    }

    #[test]
    fn int_keys_order_before_string_keys() {
        let mut a = ArrayValue::new();
        a.insert(ArrayKey::Str("name".into()), Value::Int(1));
        a.insert(ArrayKey::Int(2), Value::Int(2));
        a.insert(ArrayKey::Int(0), Value::Int(3));
        let keys: Vec<_> = a.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                ArrayKey::Int(0),
                ArrayKey::Int(2),
                ArrayKey::Str("name".into())
            ]
        );
    }

    #[test]
    fn numeric_string_coerces() {
        assert_eq!(Value::Str(" 42 ".into()).as_int().unwrap(), 42);
        assert!(Value::Str("4x".into()).as_int().is_err());
    }
}
