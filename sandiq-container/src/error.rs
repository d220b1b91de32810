//! Error types for container operations.
//!
//! Both conditions described here are programming errors in the factory
//! graph. The resolution engine logs them and panics with their `Display`
//! output; they are never handed back to calling code as recoverable values.

use std::fmt;

use sandiq_support::rendering::{render_chain, shorten_type_name};

use crate::key::Key;

/// Main error type for container operations.
#[derive(Debug, thiserror::Error)]
pub enum SandiqError {
    /// A registration transitively resolved itself.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A stored factory or cached value has a different type than requested.
    #[error("{}", .0)]
    TypeMismatch(TypeMismatchError),
}

/// Error when a key is resolved while it is already being resolved.
///
/// Carries the resolution path so the cycle can be read off directly.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The keys on the resolution path, ending with the repeated key.
    /// Example: `["four", "five", "four"]`
    pub chain: Vec<Key>,
}

impl CircularDependencyError {
    /// Builds the error from the current resolution stack and the key that
    /// was about to be pushed again.
    pub(crate) fn from_stack(stack: &[Key], key: Key) -> Self {
        let start = stack.iter().position(|k| *k == key).unwrap_or(0);
        let mut chain = stack[start..].to_vec();
        chain.push(key);
        Self { chain }
    }

    /// The key that closed the cycle.
    pub fn key(&self) -> Option<Key> {
        self.chain.last().copied()
    }
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "Circular dependency detected for {key}:\n  ")?,
            None => write!(f, "Circular dependency detected:\n  ")?,
        }
        write!(f, "{}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: a factory must not resolve a registration that is still being built"
        )
    }
}

/// Where a type mismatch was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Factory,
    CachedValue,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Factory => write!(f, "factory"),
            Slot::CachedValue => write!(f, "cached value"),
        }
    }
}

/// Error when the value stored under a key was registered for another type.
#[derive(Debug)]
pub struct TypeMismatchError {
    pub key: Key,
    /// The type the caller asked for.
    pub expected: &'static str,
    pub slot: Slot,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type mismatch for {}: stored {} does not produce {}",
            self.key,
            self.slot,
            shorten_type_name(self.expected),
        )?;
        write!(
            f,
            "\n  Hint: every key must be declared with exactly one type"
        )
    }
}

/// Convenient Result type for container operations.
pub type Result<T> = std::result::Result<T, SandiqError>;
