//! Parameter and macro table.
//!
//! Entries are keyed by uppercase name plus arity, so `R` (a plain
//! parameter) and `R(1)` (a one-argument macro) can coexist. Insertion order
//! is preserved so tables print and iterate in definition order.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scan::is_quoted_expr;

/// Lookup key: uppercase name and, for macros, the number of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamKey {
    name: String,
    arity: Option<usize>,
}

impl ParamKey {
    pub fn new(name: &str, arity: Option<usize>) -> Self {
        Self {
            name: name.to_uppercase(),
            arity,
        }
    }

    /// Key of a plain parameter.
    pub fn param(name: &str) -> Self {
        Self::new(name, None)
    }

    /// Key of a macro taking `arity` arguments.
    pub fn macro_key(name: &str, arity: usize) -> Self {
        Self::new(name, Some(arity))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(n) => write!(f, "{}({})", self.name, n),
            None => f.write_str(&self.name),
        }
    }
}

/// One parameter or macro definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamEntry {
    /// Name as written in the definition.
    pub name: String,
    /// Substitution text.
    pub value: String,
    /// Formal argument names; `None` for plain parameters.
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Rejects redefinition and removal.
    #[serde(default)]
    pub read_only: bool,
    /// The value was a quoted expression that has since been folded to a
    /// literal.
    #[serde(default)]
    pub collapsed: bool,
}

impl ParamEntry {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            args: None,
            read_only: false,
            collapsed: false,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn key(&self) -> ParamKey {
        ParamKey::new(&self.name, self.args.as_ref().map(Vec::len))
    }

    /// True if the value is a single `'...'` or `{...}` group.
    pub fn is_quoted(&self) -> bool {
        is_quoted_expr(&self.value)
    }
}

/// Ordered table of parameters and macros.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    entries: IndexMap<ParamKey, ParamEntry>,
    /// Counter for generated macro names.
    pub(crate) promoted: usize,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a plain parameter.
    pub fn get(&self, name: &str) -> Option<&ParamEntry> {
        self.entries.get(&ParamKey::param(name))
    }

    /// Look up by key, including macros.
    pub fn get_key(&self, key: &ParamKey) -> Option<&ParamEntry> {
        self.entries.get(key)
    }

    pub(crate) fn get_key_mut(&mut self, key: &ParamKey) -> Option<&mut ParamEntry> {
        self.entries.get_mut(key)
    }

    /// True if `name` is defined with any arity.
    pub fn is_defined(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        self.entries.keys().any(|k| k.name == upper)
    }

    /// Entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &ParamEntry)> {
        self.entries.iter()
    }

    /// Insert or overwrite an entry in place. Fails if the existing entry
    /// is read-only.
    pub fn insert(&mut self, entry: ParamEntry) -> Result<()> {
        let key = entry.key();
        if let Some(existing) = self.entries.get_mut(&key) {
            if existing.read_only {
                return Err(Error::ReadOnly(key.to_string()));
            }
            log::debug!("redefine {} = {}", key, entry.value);
            *existing = entry;
        } else {
            log::debug!("define {} = {}", key, entry.value);
            self.entries.insert(key, entry);
        }
        Ok(())
    }

    /// Set a plain parameter.
    pub fn update(&mut self, name: &str, value: &str) -> Result<()> {
        self.insert(ParamEntry::new(name, value))
    }

    /// Define a macro with formal arguments.
    pub fn define_macro(&mut self, name: &str, args: &[&str], body: &str) -> Result<()> {
        let args = args.iter().map(|a| a.to_string()).collect();
        self.insert(ParamEntry::new(name, body).with_args(args))
    }

    /// Define a plain parameter that later definitions cannot change.
    pub fn define_readonly(&mut self, name: &str, value: &str) -> Result<()> {
        let mut entry = ParamEntry::new(name, value);
        entry.read_only = true;
        self.insert(entry)
    }

    /// Remove a plain parameter. Removing an unknown name is not an error.
    pub fn undefine(&mut self, name: &str) -> Result<Option<ParamEntry>> {
        let key = ParamKey::param(name);
        match self.entries.get(&key) {
            Some(entry) if entry.read_only => Err(Error::ReadOnly(key.to_string())),
            Some(_) => Ok(self.entries.shift_remove(&key)),
            None => Ok(None),
        }
    }
}
