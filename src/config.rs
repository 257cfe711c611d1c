//! Macro-menu configuration: named macro definitions supplied as TOML,
//! compiled once at startup and cached by name for the process lifetime.
//!
//! ```toml
//! [[macros]]
//! name = "Comment Line"
//! source = '''
//! insert_string("# ")
//! '''
//! ```

use serde::Deserialize;

use crate::value::MacroError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuConfig {
    #[serde(default)]
    pub macros: Vec<MenuMacroDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuMacroDef {
    pub name: String,
    pub source: String,
}

impl MenuConfig {
    pub fn from_toml(text: &str) -> Result<Self, MacroError> {
        toml::from_str(text)
            .map_err(|e| MacroError::runtime(format!("macro menu config: {}", e)))
    }
}
