//! Interactive macro shell: compile each entered statement against the
//! standard registry and run it on a scratch document, driving suspending
//! calls (shell commands, dialogs, searches) to completion.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::host::{self, ScratchHost};
use crate::runtime::{DocumentId, MacroRuntime};
use crate::value::Value;

const SHELL_DOC: DocumentId = DocumentId(0);

/// Check if the input has unbalanced brackets or an explicit continuation,
/// suggesting more lines are coming.
fn is_incomplete(input: &str) -> bool {
    if input.ends_with('\\') {
        return true;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut prev = '\0';
    for ch in input.chars() {
        if in_string {
            if ch == '"' && prev != '\\' {
                in_string = false;
            }
            prev = ch;
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
        prev = ch;
    }
    depth > 0
}

/// Result of processing a single shell line.
enum LineResult {
    /// Need more input (incomplete statement).
    Continue,
    /// Line was processed (output may have been produced).
    Done,
}

/// Process one line of shell input. This is the testable core of the
/// loop — no terminal involved, only the runtime and the scratch host.
fn process_line(
    runtime: &mut MacroRuntime,
    scratch: &mut ScratchHost,
    accumulated: &mut String,
    line: &str,
) -> (LineResult, Option<String>) {
    if accumulated.is_empty() {
        *accumulated = line.to_string();
    } else {
        accumulated.push('\n');
        accumulated.push_str(line);
    }
    if is_incomplete(accumulated) {
        return (LineResult::Continue, None);
    }
    let source = std::mem::take(accumulated);
    if source.trim().is_empty() {
        return (LineResult::Done, None);
    }
    let outcome = runtime.run_source(SHELL_DOC, "shell", &source, scratch);
    let display = match host::run_to_completion(runtime, SHELL_DOC, scratch, outcome) {
        Ok(value) => {
            let mut text = scratch.take_output();
            if value != Value::Undef {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&value.to_string_value());
            }
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        Err(e) => Some(e.to_string()),
    };
    (LineResult::Done, display)
}

pub fn run_repl(runtime: &mut MacroRuntime, scratch: &mut ScratchHost) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("cannot start macro shell: {}", e);
            return;
        }
    };
    let mut accumulated = String::new();
    loop {
        let prompt = if accumulated.is_empty() {
            "macro> "
        } else {
            "   ... "
        };
        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                let (_state, display) =
                    process_line(runtime, scratch, &mut accumulated, &line);
                if let Some(text) = display {
                    println!("{}", text);
                }
            }
            Err(ReadlineError::Interrupted) => {
                accumulated.clear();
            }
            Err(ReadlineError::Eof) => return,
            Err(e) => {
                eprintln!("readline error: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_brace_waits_for_more_input() {
        assert!(is_incomplete("while (i < 3) {"));
        assert!(!is_incomplete("while (i < 3) { i += 1 }"));
        assert!(!is_incomplete("t_print(\"{\")"));
    }

    #[test]
    fn a_full_statement_runs_and_shows_its_value() {
        let mut runtime = MacroRuntime::new();
        let mut scratch = ScratchHost::new();
        let mut acc = String::new();
        let (_, display) = process_line(&mut runtime, &mut scratch, &mut acc, "2 + 3");
        assert_eq!(display.as_deref(), Some("5"));
    }

    #[test]
    fn multi_line_blocks_accumulate() {
        let mut runtime = MacroRuntime::new();
        let mut scratch = ScratchHost::new();
        let mut acc = String::new();
        let (_, none) = process_line(&mut runtime, &mut scratch, &mut acc, "x = 0; while (x < 3) {");
        assert!(none.is_none());
        let (_, none) = process_line(&mut runtime, &mut scratch, &mut acc, "x += 1");
        assert!(none.is_none());
        let (_, display) = process_line(&mut runtime, &mut scratch, &mut acc, "}");
        assert!(display.is_none());
        assert_eq!(runtime.global("x"), Some(&Value::Int(3)));
    }

    #[test]
    fn errors_come_back_as_display_text() {
        let mut runtime = MacroRuntime::new();
        let mut scratch = ScratchHost::new();
        let mut acc = String::new();
        let (_, display) = process_line(&mut runtime, &mut scratch, &mut acc, "1 / 0");
        let text = display.unwrap();
        assert!(text.contains("division by zero"), "{}", text);
    }
}
