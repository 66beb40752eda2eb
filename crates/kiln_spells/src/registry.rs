//! Spell lookup by name.

use crate::spells::register_builtin_spells;
use crate::{EngineError, Spell};

/// Spells registered under unique names, in registration order.
#[derive(Default)]
pub struct SpellRegistry {
    spells: Vec<Box<dyn Spell>>,
}

impl SpellRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalogue.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtin_spells(&mut registry);
        registry
    }

    /// Registers a spell. Names must be unique.
    pub fn register(&mut self, spell: Box<dyn Spell>) -> Result<(), EngineError> {
        if self.get(spell.name()).is_some() {
            return Err(EngineError::DuplicateSpell(spell.name().to_string()));
        }
        self.spells.push(spell);
        Ok(())
    }

    /// Looks up a spell by name.
    pub fn get(&self, name: &str) -> Option<&dyn Spell> {
        self.spells.iter().find(|s| s.name() == name).map(|s| s.as_ref())
    }

    /// Looks up a pipeline, keeping the order of `names`.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&dyn Spell>, EngineError> {
        names
            .iter()
            .map(|n| {
                self.get(n.as_ref())
                    .ok_or_else(|| EngineError::UnknownSpell(n.as_ref().to_string()))
            })
            .collect()
    }

    /// Registered spells in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Spell> {
        self.spells.iter().map(|s| s.as_ref())
    }

    /// Number of registered spells.
    pub fn len(&self) -> usize {
        self.spells.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}
