//! References: name occurrences relevant to dataflow.

use std::sync::Arc;

use serde::Serialize;

use crate::python::ast::Location;
use crate::set::{KeyedSet, SetMember};
use crate::specs::TypeSpec;

/// What kind of symbol a reference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Variable,
    Class,
    Function,
    Import,
    /// An argument or receiver mutated by a call.
    Mutation,
    /// A definition declared by a rewritten interactive directive.
    Magic,
}

/// How a reference touches its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefLevel {
    Definition,
    Update,
    Use,
}

impl RefLevel {
    pub const ALL: [RefLevel; 3] = [RefLevel::Definition, RefLevel::Update, RefLevel::Use];

    fn tag(self) -> &'static str {
        match self {
            RefLevel::Definition => "def",
            RefLevel::Update => "upd",
            RefLevel::Use => "use",
        }
    }
}

/// A single name occurrence.
///
/// Identity inside a set is `(name, level, location)`. The `node` field is
/// the opaque handle to the owning statement (its location, unique per cell
/// parse) and becomes the endpoint of dataflow edges.
#[derive(Debug, Clone, Serialize)]
pub struct Ref {
    pub name: String,
    pub kind: RefKind,
    pub level: RefLevel,
    pub location: Location,
    /// Location of the statement this reference was gathered from.
    pub node: Location,
    /// Type handle attached when an assignment's right-hand side is a call
    /// whose spec declares a return type.
    #[serde(skip)]
    pub inferred_type: Option<Arc<TypeSpec>>,
}

impl Ref {
    /// Create a reference; the inferred type starts empty.
    pub fn new(
        name: impl Into<String>,
        kind: RefKind,
        level: RefLevel,
        location: Location,
        node: Location,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            level,
            location,
            node,
            inferred_type: None,
        }
    }

    /// Same reference at a different level.
    pub fn at_level(&self, level: RefLevel) -> Self {
        let mut cloned = self.clone();
        cloned.level = level;
        cloned
    }
}

impl SetMember for Ref {
    fn key(&self) -> String {
        format!("{}|{}|{}", self.name, self.level.tag(), self.location.canonical())
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

/// Keyed set of references.
pub type RefSet = KeyedSet<Ref>;

#[cfg(test)]
mod tests {
    use super::*;

    fn some_ref(name: &str, level: RefLevel, line: usize) -> Ref {
        Ref::new(
            name,
            RefKind::Variable,
            level,
            Location::new(line, 0, line, 4),
            Location::new(line, 0, line, 10),
        )
    }

    #[test]
    fn test_identity_is_name_level_location() {
        let a = some_ref("x", RefLevel::Definition, 1);
        let b = some_ref("x", RefLevel::Definition, 1);
        let c = some_ref("x", RefLevel::Use, 1);
        let d = some_ref("x", RefLevel::Definition, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_refset_deduplicates() {
        let mut set = RefSet::new();
        set.add(some_ref("x", RefLevel::Definition, 1));
        set.add(some_ref("x", RefLevel::Definition, 1));
        set.add(some_ref("y", RefLevel::Definition, 1));
        assert_eq!(set.size(), 2);
    }

    #[test]
    fn test_at_level() {
        let use_ref = some_ref("x", RefLevel::Use, 3).at_level(RefLevel::Update);
        assert_eq!(use_ref.level, RefLevel::Update);
        assert_eq!(use_ref.name, "x");
    }
}
