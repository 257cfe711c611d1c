use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

/// An interned name — a lightweight handle that supports O(1) equality
/// comparison, used for subroutine and variable names in compiled programs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

struct SymbolTable {
    str_to_id: HashMap<String, Symbol>,
    id_to_str: Vec<String>,
}

static GLOBAL_TABLE: OnceLock<RwLock<SymbolTable>> = OnceLock::new();

fn global_table() -> &'static RwLock<SymbolTable> {
    GLOBAL_TABLE.get_or_init(|| {
        RwLock::new(SymbolTable {
            str_to_id: HashMap::new(),
            id_to_str: Vec::new(),
        })
    })
}

impl Symbol {
    /// Intern a string and return its `Symbol`. Idempotent: interning the
    /// same string twice returns the same handle.
    pub fn intern(s: &str) -> Symbol {
        // Fast path: read lock only.
        {
            let table = global_table().read().unwrap();
            if let Some(&sym) = table.str_to_id.get(s) {
                return sym;
            }
        }
        let mut table = global_table().write().unwrap();
        // Double-check after acquiring write lock.
        if let Some(&sym) = table.str_to_id.get(s) {
            return sym;
        }
        let id = table.id_to_str.len() as u32;
        let sym = Symbol(id);
        table.id_to_str.push(s.to_owned());
        table.str_to_id.insert(s.to_owned(), sym);
        sym
    }

    /// Look up the original string for this symbol.
    pub fn resolve(&self) -> String {
        let table = global_table().read().unwrap();
        table.id_to_str[self.0 as usize].clone()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = global_table().read().unwrap();
        write!(f, "Symbol({}: {:?})", self.0, &table.id_to_str[self.0 as usize])
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = global_table().read().unwrap();
        f.write_str(&table.id_to_str[self.0 as usize])
    }
}
