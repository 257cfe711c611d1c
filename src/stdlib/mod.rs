//! The standard subroutine set macros see: pure string/array helpers,
//! editor actions routed through the document's capability handle, and
//! the suspending operations (shell, dialog, search).

use crate::registry::Registry;
use crate::value::{ArrayValue, MacroError, Value};

mod editor;
mod strings;

/// A registry with the full standard set installed. Built once at process
/// start; immutable afterwards.
pub fn standard_registry() -> Registry {
    let mut reg = Registry::new();
    install(&mut reg);
    reg
}

pub fn install(reg: &mut Registry) {
    strings::install(reg);
    editor::install(reg);
}

// -- argument coercion helpers --

pub(crate) fn text_arg(name: &str, args: &[Value], i: usize) -> Result<String, MacroError> {
    args[i].as_text().map_err(|_| {
        MacroError::runtime(format!(
            "argument {} to {} must be a string, not {}",
            i + 1,
            name,
            args[i].kind_name()
        ))
    })
}

pub(crate) fn int_arg(name: &str, args: &[Value], i: usize) -> Result<i64, MacroError> {
    args[i].as_int().map_err(|_| {
        MacroError::runtime(format!(
            "argument {} to {} must be a number, not {}",
            i + 1,
            name,
            args[i].kind_name()
        ))
    })
}

pub(crate) fn array_arg<'a>(
    name: &str,
    args: &'a [Value],
    i: usize,
) -> Result<&'a ArrayValue, MacroError> {
    match &args[i] {
        Value::Array(items) => Ok(items),
        other => Err(MacroError::runtime(format!(
            "argument {} to {} must be an array, not {}",
            i + 1,
            name,
            other.kind_name()
        ))),
    }
}
