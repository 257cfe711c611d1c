use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::compiler::{compile, ensure_terminated};
use crate::config::MenuConfig;
use crate::host::DocumentHost;
use crate::opcode::Program;
use crate::recorder::Recorder;
use crate::registry::Registry;
use crate::repeat::{self, RepeatMode};
use crate::stdlib;
use crate::symbol::Symbol;
use crate::value::{MacroError, Value};

mod sched;

/// Opaque handle the host uses to tell documents apart. The runtime never
/// looks inside it; it only keys the one-macro-per-document discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc{}", self.0)
    }
}

/// How a macro invocation left the runtime: done with a value, or parked
/// (waiting on an external completion or on the next idle poll). A parked
/// macro is still running — UI affordances stay locked until a later
/// completion or poll returns `Finished` or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished(Value),
    Suspended,
}

/// The macro subsystem facade: owns the native subroutine registry, the
/// per-document execution states, the global variable table, the installed
/// macro subroutines, the keystroke recorder, the last dispatched command,
/// and the compiled macro-menu cache.
pub struct MacroRuntime {
    registry: Rc<Registry>,
    globals: HashMap<Symbol, Value>,
    subs: HashMap<Symbol, Rc<Program>>,
    docs: HashMap<DocumentId, sched::DocState>,
    recorder: Recorder,
    last_action: Option<(String, Vec<Value>)>,
    menu: HashMap<String, Rc<Program>>,
}

impl Default for MacroRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroRuntime {
    /// A runtime with the standard subroutine set installed.
    pub fn new() -> Self {
        Self::with_registry(stdlib::standard_registry())
    }

    /// A runtime over a caller-built registry (tests stub these out).
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry: Rc::new(registry),
            globals: HashMap::new(),
            subs: HashMap::new(),
            docs: HashMap::new(),
            recorder: Recorder::new(),
            last_action: None,
            menu: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compile macro source against this runtime's registry. The source
    /// must already be statement-terminated (see [`ensure_terminated`]).
    pub fn compile_source(&self, name: &str, source: &str) -> Result<Rc<Program>, MacroError> {
        compile(name, source, &self.registry)
    }

    /// Compile and run in one step, normalizing the trailing newline so a
    /// bare expression (command line, shell) is accepted.
    pub fn run_source(
        &mut self,
        doc: DocumentId,
        name: &str,
        source: &str,
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        let program = compile(name, &ensure_terminated(source), &self.registry)?;
        self.run_macro(doc, program, host)
    }

    // -- globals --

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(&Symbol::intern(name))
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(Symbol::intern(name), value);
    }

    // -- learn/replay --

    pub fn begin_learn(&mut self) -> Result<(), MacroError> {
        self.recorder.begin_learn()
    }

    pub fn finish_learn(&mut self) -> Result<(), MacroError> {
        self.recorder.finish_learn()
    }

    pub fn cancel_learn(&mut self) {
        self.recorder.cancel_learn()
    }

    pub fn is_learning(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn can_replay(&self) -> bool {
        self.recorder.has_recording()
    }

    /// Re-run the finished recording through the ordinary macro path,
    /// suspension protocol included.
    pub fn replay(
        &mut self,
        doc: DocumentId,
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        let program = self
            .recorder
            .replay()
            .ok_or_else(|| MacroError::runtime("no keystrokes have been recorded"))?;
        self.run_macro(doc, program, host)
    }

    // -- action dispatch / repeat --

    /// Entry point for live editor actions. The action is captured by an
    /// active learn session, remembered for Repeat, and executed as a
    /// one-call program through the VM.
    pub fn dispatch_action(
        &mut self,
        doc: DocumentId,
        name: &str,
        args: &[Value],
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        if self.recorder.is_recording() {
            self.recorder.record_action(name, args);
        }
        self.last_action = Some((name.to_string(), args.to_vec()));
        let program = repeat::synthesize(RepeatMode::Once, name, args);
        self.run_macro(doc, program, host)
    }

    pub fn last_action(&self) -> Option<(&str, &[Value])> {
        self.last_action
            .as_ref()
            .map(|(name, args)| (name.as_str(), args.as_slice()))
    }

    /// Re-run the last dispatched command under the given repeat mode.
    pub fn repeat_last(
        &mut self,
        doc: DocumentId,
        mode: RepeatMode,
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        let (name, args) = self
            .last_action
            .clone()
            .ok_or_else(|| MacroError::runtime("no previous command to repeat"))?;
        let program = repeat::synthesize(mode, &name, &args);
        self.run_macro(doc, program, host)
    }

    // -- macro menu --

    /// Compile every configured menu macro into the process-lifetime
    /// cache. A bad definition aborts the load, naming the macro.
    pub fn load_menu_config(&mut self, config: &MenuConfig) -> Result<(), MacroError> {
        for def in &config.macros {
            let source = ensure_terminated(&def.source);
            let program = compile(&def.name, &source, &self.registry).map_err(|e| match e {
                MacroError::Parse { offset, message } => MacroError::Parse {
                    offset,
                    message: format!("menu macro '{}': {}", def.name, message),
                },
                other => other,
            })?;
            self.menu.insert(def.name.clone(), program);
        }
        Ok(())
    }

    /// The cached program for a menu macro, if one is defined.
    pub fn menu_macro(&self, name: &str) -> Option<Rc<Program>> {
        self.menu.get(name).cloned()
    }

    pub fn run_menu_macro(
        &mut self,
        doc: DocumentId,
        name: &str,
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        let program = self
            .menu
            .get(name)
            .cloned()
            .ok_or_else(|| MacroError::runtime(format!("no macro named '{}'", name)))?;
        self.run_macro(doc, program, host)
    }
}
