use std::collections::HashMap;
use std::fmt;

use crate::host::DocumentHost;
use crate::symbol::Symbol;
use crate::value::{MacroError, Value};

/// Completion token handed out by a host capability when an operation will
/// finish later (shell exit, dialog choice, search result). The host passes
/// it back through `on_external_event_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventToken(pub u64);

impl fmt::Display for EventToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a native subroutine produced: a value now, or a promise that the
/// host will deliver one for `token` later. Failure travels through the
/// ordinary `Err` channel.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinOutcome {
    Done(Value),
    Suspend(EventToken),
}

/// Accepted argument counts of a native subroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub(crate) fn check(&self, name: Symbol, got: usize) -> Result<(), MacroError> {
        let ok = match *self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Range(min, max) => got >= min && got <= max,
        };
        if ok {
            return Ok(());
        }
        let expected = match *self {
            Arity::Exact(n) => format!("{}", n),
            Arity::AtLeast(n) => format!("at least {}", n),
            Arity::Range(min, max) => format!("{} to {}", min, max),
        };
        Err(MacroError::runtime(format!(
            "{} expects {} argument(s), got {}",
            name, expected, got
        )))
    }
}

type BuiltinFn = Box<dyn Fn(&mut dyn DocumentHost, &[Value]) -> Result<BuiltinOutcome, MacroError>>;

/// One registered native subroutine.
pub struct Builtin {
    pub name: Symbol,
    pub arity: Arity,
    func: BuiltinFn,
}

impl Builtin {
    pub fn call(
        &self,
        host: &mut dyn DocumentHost,
        args: &[Value],
    ) -> Result<BuiltinOutcome, MacroError> {
        (self.func)(host, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// The table of native subroutines available to macros. Populated once at
/// startup and never mutated afterwards, so the VM reads it without any
/// synchronization. The parser borrows it read-only to early-bind calls to
/// statically known names.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Builtin>,
    index: HashMap<Symbol, u16>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native subroutine. Names must be unique; a duplicate is a
    /// startup bug.
    pub fn register(
        &mut self,
        name: &str,
        arity: Arity,
        func: impl Fn(&mut dyn DocumentHost, &[Value]) -> Result<BuiltinOutcome, MacroError> + 'static,
    ) -> u16 {
        let sym = Symbol::intern(name);
        assert!(
            !self.index.contains_key(&sym),
            "duplicate builtin '{}'",
            name
        );
        let id = self.entries.len() as u16;
        self.entries.push(Builtin {
            name: sym,
            arity,
            func: Box::new(func),
        });
        self.index.insert(sym, id);
        id
    }

    pub fn lookup(&self, name: Symbol) -> Option<&Builtin> {
        self.index.get(&name).map(|&id| &self.entries[id as usize])
    }

    pub fn id(&self, name: Symbol) -> Option<u16> {
        self.index.get(&name).copied()
    }

    pub fn get(&self, id: u16) -> &Builtin {
        &self.entries[id as usize]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
