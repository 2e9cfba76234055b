//! Compile-time lexical scope.

use indexmap::IndexMap;
use maki_vm::error::{Error, Result};

/// Locals per function body.
pub const SCOPE_SIZE: usize = 256;

#[derive(Debug)]
struct Local {
    name: String,
    modifiable: bool,
    depth: u32,
}

/// The local stack plus the global name registry. Locals resolve to stack
/// slots at compile time; the registry only records which globals exist and
/// whether they are modifiable (their storage lives in the VM).
#[derive(Debug, Default)]
pub struct Scope {
    locals: Vec<Local>,
    depth: u32,
    globals: IndexMap<String, bool>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any leftover locals from an aborted compile. The global registry
    /// is kept so a REPL can detect redeclarations across lines.
    pub fn reset_locals(&mut self) {
        self.locals.clear();
        self.depth = 0;
    }

    pub fn is_local(&self) -> bool {
        self.depth > 0
    }

    pub fn begin(&mut self) {
        self.depth += 1;
    }

    pub fn end(&mut self) {
        self.depth -= 1;
    }

    /// Declare a local at the current depth. Redeclaring a name within the
    /// same depth is an error; shadowing an outer depth is fine.
    pub fn add_local(&mut self, name: &str, modifiable: bool, line: u32) -> Result<()> {
        if self.locals.len() >= SCOPE_SIZE {
            return Err(Error::compile("too many variables in local scope", line));
        }

        for local in self.locals.iter().rev() {
            if local.depth < self.depth {
                break;
            }
            if local.name == name {
                return Err(Error::compile(
                    format!("variable '{}' is already defined in this scope", name),
                    line,
                ));
            }
        }

        self.locals.push(Local {
            name: name.to_string(),
            modifiable,
            depth: self.depth,
        });
        Ok(())
    }

    /// Walk the local stack newest to oldest; a hit yields the slot and its
    /// mutability.
    pub fn resolve(&self, name: &str) -> Option<(u8, bool)> {
        self.locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot as u8, local.modifiable))
    }

    /// Remove locals that fell out of scope; returns how many were dropped
    /// (the emitter pops one stack slot per local).
    pub fn drop_to_depth(&mut self) -> usize {
        let mut dropped = 0;
        while self
            .locals
            .last()
            .map_or(false, |local| local.depth > self.depth)
        {
            self.locals.pop();
            dropped += 1;
        }
        dropped
    }

    pub fn is_global_declared(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    pub fn declare_global(&mut self, name: &str, modifiable: bool) {
        self.globals.insert(name.to_string(), modifiable);
    }

    pub fn global_modifiable(&self, name: &str) -> Option<bool> {
        self.globals.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_newest_binding_first() {
        let mut scope = Scope::new();
        scope.begin();
        scope.add_local("x", true, 1).unwrap();
        scope.begin();
        scope.add_local("x", false, 2).unwrap();

        assert_eq!(scope.resolve("x"), Some((1, false)));

        scope.end();
        assert_eq!(scope.drop_to_depth(), 1);
        assert_eq!(scope.resolve("x"), Some((0, true)));
    }

    #[test]
    fn rejects_same_depth_redeclaration() {
        let mut scope = Scope::new();
        scope.begin();
        scope.add_local("x", true, 1).unwrap();
        assert!(scope.add_local("x", true, 2).is_err());
    }

    #[test]
    fn caps_locals_at_256() {
        let mut scope = Scope::new();
        scope.begin();
        for i in 0..SCOPE_SIZE {
            scope.add_local(&format!("v{}", i), true, 1).unwrap();
        }
        let err = scope.add_local("overflow", true, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "compile error, too many variables in local scope [line 1]"
        );
    }

    #[test]
    fn global_registry_tracks_mutability() {
        let mut scope = Scope::new();
        scope.declare_global("a", true);
        scope.declare_global("b", false);

        assert!(scope.is_global_declared("a"));
        assert_eq!(scope.global_modifiable("b"), Some(false));
        assert_eq!(scope.global_modifiable("missing"), None);
    }
}
