//! Name-based lookup of interpreter definitions.

use std::sync::Arc;

use indexmap::IndexMap;

use super::Interpreter;
use super::builtin::{Irb, Python3};
use crate::error::{Result, SessionError};

/// Registry of interpreters keyed by name, in registration order.
#[derive(Default)]
pub struct InterpreterRegistry {
    interpreters: IndexMap<String, Arc<dyn Interpreter>>,
}

impl InterpreterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in interpreters.
    ///
    /// `python` is an alias of `python3`, `ruby` an alias of `irb`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let python: Arc<dyn Interpreter> = Arc::new(Python3::new());
        let irb: Arc<dyn Interpreter> = Arc::new(Irb::new());
        registry.insert("python3", python.clone());
        registry.insert("python", python);
        registry.insert("irb", irb.clone());
        registry.insert("ruby", irb);
        registry
    }

    fn insert(&mut self, name: &str, interpreter: Arc<dyn Interpreter>) {
        self.interpreters.insert(name.to_string(), interpreter);
    }

    /// Register an interpreter under its own name, replacing any previous one.
    pub fn register(&mut self, interpreter: Arc<dyn Interpreter>) {
        let name = interpreter.name().to_string();
        self.interpreters.insert(name, interpreter);
    }

    /// Get an interpreter by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Interpreter>> {
        self.interpreters.get(name).cloned()
    }

    /// Get an interpreter by name or fail with [`SessionError::UnknownInterpreter`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Interpreter>> {
        self.get(name).ok_or_else(|| {
            SessionError::UnknownInterpreter {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Check if an interpreter is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.interpreters.contains_key(name)
    }

    /// List all registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.interpreters.keys().map(String::as_str)
    }
}

/// Look up a built-in interpreter by name.
pub fn by_name(name: &str) -> Option<Arc<dyn Interpreter>> {
    InterpreterRegistry::with_builtins().get(name)
}
