use std::collections::VecDeque;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::registry::EventToken;
use crate::runtime::{DocumentId, MacroRuntime, RunOutcome};
use crate::value::{MacroError, Value};

/// Capability surface a document exposes to macro builtins. The VM never
/// touches buffer internals; everything goes through this handle.
///
/// Positions are 0-based character indices. The `begin_*` operations start
/// work that finishes later; they hand back the token the host will pass to
/// `on_external_event_complete`.
pub trait DocumentHost {
    fn cursor(&self) -> i64;
    fn set_cursor(&mut self, pos: i64) -> Result<(), MacroError>;
    fn buffer_length(&self) -> i64;
    fn get_range(&self, start: i64, end: i64) -> Result<String, MacroError>;
    fn replace_range(&mut self, start: i64, end: i64, text: &str) -> Result<(), MacroError>;
    /// Insert at the cursor, leaving the cursor after the insertion.
    fn insert_string(&mut self, text: &str) -> Result<(), MacroError>;
    fn select(&mut self, start: i64, end: i64) -> Result<(), MacroError>;
    fn selection_text(&self) -> Option<String>;
    fn beep(&mut self);
    fn set_auto_indent(&mut self, on: bool);
    fn print_output(&mut self, text: &str);

    fn begin_shell_command(&mut self, command: &str, input: &str)
        -> Result<EventToken, MacroError>;
    fn begin_dialog(&mut self, message: &str, buttons: &[String])
        -> Result<EventToken, MacroError>;
    fn begin_search(&mut self, pattern: &str, start: i64) -> Result<EventToken, MacroError>;
}

/// An asynchronous operation a `ScratchHost` has been asked to start.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub token: EventToken,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Shell { command: String, input: String },
    Dialog { message: String, buttons: Vec<String> },
    Search { pattern: String, start: i64 },
}

/// In-memory document used by the command line, the shell, and tests.
/// Asynchronous capabilities queue a `PendingRequest` instead of doing the
/// work, so a driver (or a test) decides how each one completes.
#[derive(Debug, Default)]
pub struct ScratchHost {
    text: String,
    cursor: i64,
    selection: Option<(i64, i64)>,
    auto_indent: bool,
    beeps: u32,
    output: String,
    next_token: u64,
    pending: VecDeque<PendingRequest>,
}

impl ScratchHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn beeps(&self) -> u32 {
        self.beeps
    }

    pub fn auto_indent(&self) -> bool {
        self.auto_indent
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn take_pending(&mut self) -> Option<PendingRequest> {
        self.pending.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn issue(&mut self, kind: RequestKind) -> EventToken {
        self.next_token += 1;
        let token = EventToken(self.next_token);
        self.pending.push_back(PendingRequest { token, kind });
        token
    }

    fn char_len(&self) -> i64 {
        self.text.chars().count() as i64
    }

    fn check_range(&self, start: i64, end: i64) -> Result<(usize, usize), MacroError> {
        let len = self.char_len();
        if start < 0 || end < start || end > len {
            return Err(MacroError::runtime(format!(
                "range {}..{} is outside the buffer (length {})",
                start, end, len
            )));
        }
        Ok((start as usize, end as usize))
    }

    fn byte_of_char(&self, idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(idx)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }
}

impl DocumentHost for ScratchHost {
    fn cursor(&self) -> i64 {
        self.cursor
    }

    fn set_cursor(&mut self, pos: i64) -> Result<(), MacroError> {
        if pos < 0 || pos > self.char_len() {
            return Err(MacroError::runtime(format!(
                "cursor position {} is outside the buffer",
                pos
            )));
        }
        self.cursor = pos;
        Ok(())
    }

    fn buffer_length(&self) -> i64 {
        self.char_len()
    }

    fn get_range(&self, start: i64, end: i64) -> Result<String, MacroError> {
        let (start, end) = self.check_range(start, end)?;
        Ok(self.text.chars().skip(start).take(end - start).collect())
    }

    fn replace_range(&mut self, start: i64, end: i64, text: &str) -> Result<(), MacroError> {
        let (start, end) = self.check_range(start, end)?;
        let from = self.byte_of_char(start);
        let to = self.byte_of_char(end);
        self.text.replace_range(from..to, text);
        self.cursor = self.cursor.min(self.char_len());
        Ok(())
    }

    fn insert_string(&mut self, text: &str) -> Result<(), MacroError> {
        let at = self.byte_of_char(self.cursor as usize);
        self.text.insert_str(at, text);
        self.cursor += text.chars().count() as i64;
        Ok(())
    }

    fn select(&mut self, start: i64, end: i64) -> Result<(), MacroError> {
        self.check_range(start, end)?;
        self.selection = Some((start, end));
        Ok(())
    }

    fn selection_text(&self) -> Option<String> {
        let (start, end) = self.selection?;
        self.get_range(start, end).ok()
    }

    fn beep(&mut self) {
        self.beeps += 1;
    }

    fn set_auto_indent(&mut self, on: bool) {
        self.auto_indent = on;
    }

    fn print_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn begin_shell_command(
        &mut self,
        command: &str,
        input: &str,
    ) -> Result<EventToken, MacroError> {
        Ok(self.issue(RequestKind::Shell {
            command: command.to_string(),
            input: input.to_string(),
        }))
    }

    fn begin_dialog(
        &mut self,
        message: &str,
        buttons: &[String],
    ) -> Result<EventToken, MacroError> {
        Ok(self.issue(RequestKind::Dialog {
            message: message.to_string(),
            buttons: buttons.to_vec(),
        }))
    }

    fn begin_search(&mut self, pattern: &str, start: i64) -> Result<EventToken, MacroError> {
        Ok(self.issue(RequestKind::Search {
            pattern: pattern.to_string(),
            start,
        }))
    }
}

/// Drive an already-started macro all the way to a value: service queued
/// host requests as the external layers would, and grant preempted macros
/// further slices via `poll`, until the outcome is final.
pub fn run_to_completion(
    runtime: &mut MacroRuntime,
    doc: DocumentId,
    host: &mut ScratchHost,
    first: Result<RunOutcome, MacroError>,
) -> Result<Value, MacroError> {
    let mut outcome = first;
    loop {
        match outcome? {
            RunOutcome::Finished(value) => return Ok(value),
            RunOutcome::Suspended => {
                if host.pending_len() > 0 {
                    outcome = service_pending(runtime, doc, host).ok_or_else(|| {
                        MacroError::runtime("pending operation had no waiting macro")
                    })?;
                } else if let Some(polled) = runtime.poll(doc, host) {
                    outcome = polled;
                } else {
                    return Err(MacroError::runtime(
                        "macro suspended with no way to continue",
                    ));
                }
            }
        }
    }
}

/// Drive a suspended macro to completion by servicing the host's queued
/// requests one at a time: shell commands run through `/bin/sh`, dialogs
/// auto-answer their first button, searches are plain substring scans.
/// This is the process/dialog layer the engine itself never contains.
pub fn service_pending(
    runtime: &mut MacroRuntime,
    doc: DocumentId,
    host: &mut ScratchHost,
) -> Option<Result<RunOutcome, MacroError>> {
    let mut last = None;
    while let Some(request) = host.take_pending() {
        let result = complete_request(host, &request.kind);
        let outcome = runtime.on_external_event_complete(request.token, result, host)?;
        let done = !matches!(outcome, Ok(RunOutcome::Suspended));
        last = Some(outcome);
        if done {
            break;
        }
    }
    last
}

fn complete_request(host: &ScratchHost, kind: &RequestKind) -> Result<Value, MacroError> {
    match kind {
        RequestKind::Shell { command, input } => run_shell(command, input),
        RequestKind::Dialog { message, buttons } => {
            // Headless driver: report the prompt and take the first button.
            let choice = buttons.first().map_or("OK", |b| b.as_str());
            eprintln!("[dialog] {} -> {}", message, choice);
            Ok(Value::Int(1))
        }
        RequestKind::Search { pattern, start } => {
            let skip = (*start).max(0) as usize;
            let tail: String = host.text().chars().skip(skip).collect();
            match tail.find(pattern.as_str()) {
                Some(byte_pos) => {
                    let chars_before = tail[..byte_pos].chars().count();
                    Ok(Value::Int((skip + chars_before) as i64))
                }
                None => Ok(Value::Int(-1)),
            }
        }
    }
}

fn run_shell(command: &str, input: &str) -> Result<Value, MacroError> {
    let mut child = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| MacroError::runtime(format!("cannot start shell: {}", e)))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| MacroError::runtime(format!("cannot write shell input: {}", e)))?;
    }
    let out = child
        .wait_with_output()
        .map_err(|e| MacroError::runtime(format!("shell command failed: {}", e)))?;
    Ok(Value::Str(String::from_utf8_lossy(&out.stdout).into_owned()))
}
