//! Mapping tables: what an Option chord produces.

use crate::keycode;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a trigger chord does.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Mapping {
    /// Re-send the named key under right Alt, reusing the system layout's
    /// AltGr level (e.g. Option-5 -> AltGr-5 for `{` on AZERTY).
    Passthrough {
        /// Symbolic name of the key to tap.
        target: String,
    },
    /// Type one Unicode scalar.
    Unicode {
        /// The character to type.
        scalar: char,
    },
    /// Arm a dead key and type its glyph right away.
    DeadKey {
        /// Id of a [`DeadKeyDefinition`] in the same table.
        id: String,
        /// Glyph typed when the dead key is armed.
        base: String,
    },
}

impl Mapping {
    pub fn passthrough(target: impl Into<String>) -> Self {
        Mapping::Passthrough {
            target: target.into(),
        }
    }

    pub fn unicode(scalar: char) -> Self {
        Mapping::Unicode { scalar }
    }

    pub fn dead_key(id: impl Into<String>, base: impl Into<String>) -> Self {
        Mapping::DeadKey {
            id: id.into(),
            base: base.into(),
        }
    }
}

/// An accent that combines with the next typed key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeadKeyDefinition {
    /// Identifier referenced by [`Mapping::DeadKey`].
    pub id: String,
    /// The bare accent, typed before a key that has no combination.
    pub base: String,
    /// Symbolic key name -> combined text.
    #[cfg_attr(feature = "serde", serde(default))]
    pub combinations: HashMap<String, String>,
}

impl DeadKeyDefinition {
    pub fn new(id: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base: base.into(),
            combinations: HashMap::new(),
        }
    }

    /// Add a combination, builder style.
    pub fn combine(mut self, key: impl Into<String>, result: impl Into<String>) -> Self {
        self.combinations.insert(key.into(), result.into());
        self
    }

    /// Result of combining with the named key.
    pub fn combination(&self, key: &str) -> Option<&str> {
        self.combinations.get(key).map(String::as_str)
    }
}

/// A complete layout: Option and Shift-Option maps plus dead keys.
///
/// Tables are immutable once handed to the engine; a layout swap replaces
/// the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MappingTable {
    /// Layout name, e.g. `azerty-mac`.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Option + key.
    pub alt: HashMap<String, Mapping>,
    /// Shift + Option + key.
    pub shift_alt: HashMap<String, Mapping>,
    /// Dead keys referenced by [`Mapping::DeadKey`].
    pub dead_keys: Vec<DeadKeyDefinition>,
}

/// Something wrong with a table entry. The engine tolerates all of these at
/// runtime by forwarding or doing nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableProblem {
    /// A table key is not a known symbolic name and can never match.
    UnknownKey { table: &'static str, key: String },
    /// A passthrough target has no key code.
    UnknownTarget { key: String, target: String },
    /// A dead-key mapping refers to an undefined dead key.
    UndefinedDeadKey { key: String, id: String },
    /// Two dead-key definitions share an id.
    DuplicateDeadKey { id: String },
}

impl std::fmt::Display for TableProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableProblem::UnknownKey { table, key } => {
                write!(f, "{table} table: unknown key name {key:?}")
            }
            TableProblem::UnknownTarget { key, target } => {
                write!(f, "{key:?}: unknown passthrough target {target:?}")
            }
            TableProblem::UndefinedDeadKey { key, id } => {
                write!(f, "{key:?}: undefined dead key {id:?}")
            }
            TableProblem::DuplicateDeadKey { id } => write!(f, "dead key {id:?} defined twice"),
        }
    }
}

impl MappingTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an Option mapping, builder style.
    pub fn with_alt(mut self, key: impl Into<String>, mapping: Mapping) -> Self {
        self.alt.insert(key.into(), mapping);
        self
    }

    /// Add a Shift-Option mapping, builder style.
    pub fn with_shift_alt(mut self, key: impl Into<String>, mapping: Mapping) -> Self {
        self.shift_alt.insert(key.into(), mapping);
        self
    }

    /// Add a dead-key definition, builder style.
    pub fn with_dead_key(mut self, dead_key: DeadKeyDefinition) -> Self {
        self.dead_keys.push(dead_key);
        self
    }

    /// Mapping for the named key, from the Shift-Option table if `shift`.
    pub fn lookup(&self, key: &str, shift: bool) -> Option<&Mapping> {
        if shift {
            self.shift_alt.get(key)
        } else {
            self.alt.get(key)
        }
    }

    /// Dead-key definition by id.
    pub fn dead_key(&self, id: &str) -> Option<&DeadKeyDefinition> {
        self.dead_keys.iter().find(|dk| dk.id == id)
    }

    /// Every entry that can never take effect as written.
    pub fn problems(&self) -> Vec<TableProblem> {
        let mut problems = Vec::new();

        for (table, entries) in [("alt", &self.alt), ("shift_alt", &self.shift_alt)] {
            let mut keys: Vec<_> = entries.keys().collect();
            keys.sort();
            for key in keys {
                if keycode::key_code(key).is_none() {
                    problems.push(TableProblem::UnknownKey {
                        table,
                        key: key.clone(),
                    });
                }
                match &entries[key] {
                    Mapping::Passthrough { target } if keycode::key_code(target).is_none() => {
                        problems.push(TableProblem::UnknownTarget {
                            key: key.clone(),
                            target: target.clone(),
                        });
                    }
                    Mapping::DeadKey { id, .. } if self.dead_key(id).is_none() => {
                        problems.push(TableProblem::UndefinedDeadKey {
                            key: key.clone(),
                            id: id.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }

        for (i, dk) in self.dead_keys.iter().enumerate() {
            if self.dead_keys[..i].iter().any(|other| other.id == dk.id) {
                problems.push(TableProblem::DuplicateDeadKey { id: dk.id.clone() });
            }
        }

        problems
    }
}
