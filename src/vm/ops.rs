//! Value-level operation helpers for the instruction loop.

use crate::opcode::OpCode;
use crate::value::{ArrayKey, ArrayValue, MacroError, Value};

/// Integer arithmetic with wrap-around on overflow, the language's
/// documented numeric contract.
pub(super) fn arith(op: OpCode, a: &Value, b: &Value) -> Result<Value, MacroError> {
    let x = a.as_int()?;
    let y = b.as_int()?;
    let r = match op {
        OpCode::Add => x.wrapping_add(y),
        OpCode::Sub => x.wrapping_sub(y),
        OpCode::Mul => x.wrapping_mul(y),
        OpCode::Div => {
            if y == 0 {
                return Err(MacroError::runtime("division by zero"));
            }
            x.wrapping_div(y)
        }
        OpCode::Mod => {
            if y == 0 {
                return Err(MacroError::runtime("modulo by zero"));
            }
            x.wrapping_rem(y)
        }
        other => unreachable!("not an arithmetic op: {:?}", other),
    };
    Ok(Value::Int(r))
}

/// Comparisons yield integer 0/1. Two numeric operands compare as numbers,
/// otherwise both sides must render as text.
pub(super) fn compare(op: OpCode, a: &Value, b: &Value) -> Result<Value, MacroError> {
    use std::cmp::Ordering;
    let ordering = match (a.as_int(), b.as_int()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.as_text()?.cmp(&b.as_text()?),
    };
    let truth = match op {
        OpCode::Eq => ordering == Ordering::Equal,
        OpCode::Ne => ordering != Ordering::Equal,
        OpCode::Lt => ordering == Ordering::Less,
        OpCode::Le => ordering != Ordering::Greater,
        OpCode::Gt => ordering == Ordering::Greater,
        OpCode::Ge => ordering != Ordering::Less,
        other => unreachable!("not a comparison op: {:?}", other),
    };
    Ok(Value::Int(i64::from(truth)))
}

pub(super) fn array_get(arr: &Value, key: &Value) -> Result<Value, MacroError> {
    let Value::Array(items) = arr else {
        return Err(MacroError::runtime(format!(
            "{} cannot be indexed",
            arr.kind_name()
        )));
    };
    let key = ArrayKey::from_value(key)?;
    items.get(&key).cloned().ok_or_else(|| {
        MacroError::runtime(format!("array has no element [{}]", key))
    })
}

/// Element assignment; assigning into an undefined value creates the array.
pub(super) fn array_insert(arr: Value, key: &Value, value: Value) -> Result<Value, MacroError> {
    let mut items = match arr {
        Value::Array(items) => items,
        Value::Undef => ArrayValue::new(),
        other => {
            return Err(MacroError::runtime(format!(
                "{} cannot be indexed",
                other.kind_name()
            )))
        }
    };
    items.insert(ArrayKey::from_value(key)?, value);
    Ok(Value::Array(items))
}

pub(super) fn array_remove(arr: Value, key: &Value) -> Result<Value, MacroError> {
    let mut items = match arr {
        Value::Array(items) => items,
        other => {
            return Err(MacroError::runtime(format!(
                "{} cannot be indexed",
                other.kind_name()
            )))
        }
    };
    let key = ArrayKey::from_value(key)?;
    if items.remove(&key).is_none() {
        return Err(MacroError::runtime(format!(
            "array has no element [{}]",
            key
        )));
    }
    Ok(Value::Array(items))
}

pub(super) fn array_keys(arr: &Value) -> Result<Value, MacroError> {
    let Value::Array(items) = arr else {
        return Err(MacroError::runtime(format!(
            "{} cannot be iterated",
            arr.kind_name()
        )));
    };
    Ok(Value::Array(items.key_snapshot()))
}

pub(super) fn array_size(arr: &Value) -> Result<Value, MacroError> {
    let Value::Array(items) = arr else {
        return Err(MacroError::runtime(format!(
            "{} is not an array",
            arr.kind_name()
        )));
    };
    Ok(Value::Int(items.len() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_wraps_on_overflow() {
        let r = arith(OpCode::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert_eq!(r, Value::Int(i64::MIN));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(arith(OpCode::Div, &Value::Int(1), &Value::Int(0)).is_err());
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        let r = compare(OpCode::Lt, &Value::Str("9".into()), &Value::Int(10)).unwrap();
        assert_eq!(r, Value::Int(1));
    }

    #[test]
    fn missing_array_element_is_an_error() {
        let arr = Value::Array(ArrayValue::new());
        assert!(array_get(&arr, &Value::Int(0)).is_err());
    }

    #[test]
    fn element_assignment_creates_the_array() {
        let r = array_insert(Value::Undef, &Value::Int(0), Value::Int(5)).unwrap();
        assert_eq!(array_size(&r).unwrap(), Value::Int(1));
    }
}
