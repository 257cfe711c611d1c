//! Editor-action subroutines. Synchronous ones call straight through the
//! document handle; shell_command, dialog, and search start host-side work
//! and suspend the macro until the completion arrives.

use super::{int_arg, text_arg};
use crate::registry::{Arity, BuiltinOutcome, Registry};
use crate::value::{MacroError, Value};

fn done(v: Value) -> Result<BuiltinOutcome, MacroError> {
    Ok(BuiltinOutcome::Done(v))
}

pub(super) fn install(reg: &mut Registry) {
    reg.register("cursor", Arity::Exact(0), |host, _| {
        done(Value::Int(host.cursor()))
    });

    reg.register("set_cursor", Arity::Exact(1), |host, args| {
        host.set_cursor(int_arg("set_cursor", args, 0)?)?;
        done(Value::Undef)
    });

    reg.register("buffer_length", Arity::Exact(0), |host, _| {
        done(Value::Int(host.buffer_length()))
    });

    reg.register("get_range", Arity::Exact(2), |host, args| {
        let start = int_arg("get_range", args, 0)?;
        let end = int_arg("get_range", args, 1)?;
        done(Value::Str(host.get_range(start, end)?))
    });

    reg.register("replace_range", Arity::Exact(3), |host, args| {
        let start = int_arg("replace_range", args, 0)?;
        let end = int_arg("replace_range", args, 1)?;
        let text = text_arg("replace_range", args, 2)?;
        host.replace_range(start, end, &text)?;
        done(Value::Undef)
    });

    reg.register("insert_string", Arity::Exact(1), |host, args| {
        let text = text_arg("insert_string", args, 0)?;
        host.insert_string(&text)?;
        done(Value::Undef)
    });

    reg.register("select", Arity::Exact(2), |host, args| {
        let start = int_arg("select", args, 0)?;
        let end = int_arg("select", args, 1)?;
        host.select(start, end)?;
        done(Value::Undef)
    });

    reg.register("get_selection", Arity::Exact(0), |host, _| {
        done(Value::Str(host.selection_text().unwrap_or_default()))
    });

    reg.register("beep", Arity::Exact(0), |host, _| {
        host.beep();
        done(Value::Undef)
    });

    reg.register("set_auto_indent", Arity::Exact(1), |host, args| {
        let mode = text_arg("set_auto_indent", args, 0)?;
        match mode.as_str() {
            "on" => host.set_auto_indent(true),
            "off" => host.set_auto_indent(false),
            other => {
                return Err(MacroError::runtime(format!(
                    "set_auto_indent expects \"on\" or \"off\", got {:?}",
                    other
                )))
            }
        }
        done(Value::Undef)
    });

    reg.register("t_print", Arity::AtLeast(1), |host, args| {
        let mut out = String::new();
        for arg in args {
            out.push_str(&arg.to_string_value());
        }
        host.print_output(&out);
        done(Value::Undef)
    });

    // -- suspending subroutines --

    reg.register("shell_command", Arity::Exact(2), |host, args| {
        let command = text_arg("shell_command", args, 0)?;
        let input = text_arg("shell_command", args, 1)?;
        let token = host.begin_shell_command(&command, &input)?;
        Ok(BuiltinOutcome::Suspend(token))
    });

    reg.register("dialog", Arity::AtLeast(1), |host, args| {
        let message = text_arg("dialog", args, 0)?;
        let mut buttons = Vec::new();
        for i in 1..args.len() {
            buttons.push(text_arg("dialog", args, i)?);
        }
        if buttons.is_empty() {
            buttons.push("OK".to_string());
        }
        let token = host.begin_dialog(&message, &buttons)?;
        Ok(BuiltinOutcome::Suspend(token))
    });

    reg.register("search", Arity::Exact(2), |host, args| {
        let pattern = text_arg("search", args, 0)?;
        let start = int_arg("search", args, 1)?;
        let token = host.begin_search(&pattern, start)?;
        Ok(BuiltinOutcome::Suspend(token))
    });
}
