//! Pure subroutines: no document capability involved.

use super::{array_arg, int_arg, text_arg};
use crate::registry::{Arity, BuiltinOutcome, Registry};
use crate::value::{ArrayKey, ArrayValue, MacroError, Value};

fn done(v: Value) -> Result<BuiltinOutcome, MacroError> {
    Ok(BuiltinOutcome::Done(v))
}

pub(super) fn install(reg: &mut Registry) {
    reg.register("length", Arity::Exact(1), |_, args| {
        let s = text_arg("length", args, 0)?;
        done(Value::Int(s.chars().count() as i64))
    });

    reg.register("substring", Arity::Range(2, 3), |_, args| {
        let s = text_arg("substring", args, 0)?;
        let len = s.chars().count() as i64;
        let start = int_arg("substring", args, 1)?;
        let end = if args.len() == 3 {
            int_arg("substring", args, 2)?
        } else {
            len
        };
        if start < 0 || end < start || end > len {
            return Err(MacroError::runtime(format!(
                "substring range {}..{} is outside the string (length {})",
                start, end, len
            )));
        }
        let out: String = s
            .chars()
            .skip(start as usize)
            .take((end - start) as usize)
            .collect();
        done(Value::Str(out))
    });

    reg.register("toupper", Arity::Exact(1), |_, args| {
        done(Value::Str(text_arg("toupper", args, 0)?.to_uppercase()))
    });

    reg.register("tolower", Arity::Exact(1), |_, args| {
        done(Value::Str(text_arg("tolower", args, 0)?.to_lowercase()))
    });

    // Plain substring scan; pattern searching goes through the host's
    // search capability instead.
    reg.register("search_string", Arity::Range(2, 3), |_, args| {
        let s = text_arg("search_string", args, 0)?;
        let needle = text_arg("search_string", args, 1)?;
        let start = if args.len() == 3 {
            int_arg("search_string", args, 2)?.max(0) as usize
        } else {
            0
        };
        let tail: String = s.chars().skip(start).collect();
        let found = match tail.find(needle.as_str()) {
            Some(byte_pos) => (start + tail[..byte_pos].chars().count()) as i64,
            None => -1,
        };
        done(Value::Int(found))
    });

    reg.register("string_to_num", Arity::Exact(1), |_, args| {
        done(Value::Int(int_arg("string_to_num", args, 0)?))
    });

    reg.register("split", Arity::Exact(2), |_, args| {
        let s = text_arg("split", args, 0)?;
        let sep = text_arg("split", args, 1)?;
        if sep.is_empty() {
            return Err(MacroError::runtime("split separator must not be empty"));
        }
        let mut out = ArrayValue::new();
        for (i, piece) in s.split(sep.as_str()).enumerate() {
            out.insert(ArrayKey::Int(i as i64), Value::Str(piece.to_string()));
        }
        done(Value::Array(out))
    });

    reg.register("join", Arity::Exact(2), |_, args| {
        let items = array_arg("join", args, 0)?;
        let sep = text_arg("join", args, 1)?;
        let mut pieces = Vec::with_capacity(items.len());
        for key in items.keys() {
            let v = items.get(key).unwrap();
            pieces.push(v.as_text()?);
        }
        done(Value::Str(pieces.join(&sep)))
    });

    reg.register("max", Arity::AtLeast(2), |_, args| {
        let mut best = int_arg("max", args, 0)?;
        for i in 1..args.len() {
            best = best.max(int_arg("max", args, i)?);
        }
        done(Value::Int(best))
    });

    reg.register("min", Arity::AtLeast(2), |_, args| {
        let mut best = int_arg("min", args, 0)?;
        for i in 1..args.len() {
            best = best.min(int_arg("min", args, i)?);
        }
        done(Value::Int(best))
    });

    reg.register("array_size", Arity::Exact(1), |_, args| {
        done(Value::Int(array_arg("array_size", args, 0)?.len() as i64))
    });

    reg.register("array_has", Arity::Exact(2), |_, args| {
        let items = array_arg("array_has", args, 0)?;
        let key = ArrayKey::from_value(&args[1])?;
        done(Value::Int(i64::from(items.contains(&key))))
    });
}
