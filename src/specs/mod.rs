//! Library specs: external descriptions of module, type, and function
//! behavior for the subject language's ecosystem.
//!
//! Specs tell the extractor whether a call mutates its arguments (the
//! `updates` list) and what type it returns (so later method calls on the
//! result can be resolved). They are plain JSON data shipped with the crate;
//! loading normalises the two shorthand forms:
//!
//! - a function given as a bare string becomes `{name, reads: [], updates: []}`;
//! - a `returns` type name is resolved against the enclosing module's `types`
//!   map into a shared [`TypeSpec`] handle.

pub mod table;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::Result;

pub use table::SymbolTable;

/// One entry of a function's `updates` list: a positional argument (1-based,
/// 0 denotes the receiver) or a global variable name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UpdateTarget {
    Position(usize),
    Global(String),
}

/// Behavioral description of a function or method.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    /// Argument positions or global names this function mutates.
    pub updates: Vec<UpdateTarget>,
    /// Global names this function reads.
    pub reads: Vec<String>,
    /// Declared return type name, when any.
    pub returns: Option<String>,
    /// Resolved return type, when `returns` named a type of the enclosing
    /// module.
    pub returns_type: Option<Arc<TypeSpec>>,
    /// Position of a function-valued argument, for higher-order functions.
    /// Parsed from the JSON contract; carried as data.
    pub higher_order: Option<usize>,
}

impl FunctionSpec {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            updates: Vec::new(),
            reads: Vec::new(),
            returns: None,
            returns_type: None,
            higher_order: None,
        }
    }

    /// Positional update entries.
    pub fn updated_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.updates.iter().filter_map(|u| match u {
            UpdateTarget::Position(p) => Some(*p),
            UpdateTarget::Global(_) => None,
        })
    }
}

/// A type: a named collection of method specs.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    methods: FxHashMap<String, Arc<FunctionSpec>>,
}

impl TypeSpec {
    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<Arc<FunctionSpec>> {
        self.methods.get(name).cloned()
    }

    /// All methods of this type.
    pub fn methods(&self) -> impl Iterator<Item = &Arc<FunctionSpec>> {
        self.methods.values()
    }
}

/// A module: functions, types, and nested modules.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    pub name: String,
    functions: FxHashMap<String, Arc<FunctionSpec>>,
    types: FxHashMap<String, Arc<TypeSpec>>,
    modules: FxHashMap<String, Arc<ModuleSpec>>,
}

impl ModuleSpec {
    /// Look up a function of this module.
    pub fn function(&self, name: &str) -> Option<Arc<FunctionSpec>> {
        self.functions.get(name).cloned()
    }

    /// Look up a type of this module.
    pub fn type_spec(&self, name: &str) -> Option<Arc<TypeSpec>> {
        self.types.get(name).cloned()
    }

    /// Look up a nested module.
    pub fn submodule(&self, name: &str) -> Option<Arc<ModuleSpec>> {
        self.modules.get(name).cloned()
    }

    /// All functions of this module.
    pub fn functions(&self) -> impl Iterator<Item = &Arc<FunctionSpec>> {
        self.functions.values()
    }

    /// All types of this module.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeSpec>> {
        self.types.values()
    }
}

/// A bundle of top-level module specs.
#[derive(Debug, Clone, Default)]
pub struct SpecBundle {
    modules: FxHashMap<String, Arc<ModuleSpec>>,
}

impl SpecBundle {
    /// Load a bundle from a JSON document mapping module names to specs.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, RawModuleSpec> = serde_json::from_str(json)?;
        let mut bundle = Self::default();
        for (name, spec) in raw {
            bundle
                .modules
                .insert(name.clone(), Arc::new(normalize_module(&name, spec)));
        }
        Ok(bundle)
    }

    /// Merge another bundle into this one (later modules win).
    pub fn merge(&mut self, other: SpecBundle) {
        self.modules.extend(other.modules);
    }

    /// Resolve a dotted module path.
    pub fn resolve(&self, path: &str) -> Option<Arc<ModuleSpec>> {
        let mut segments = path.split('.');
        let mut module = self.modules.get(segments.next()?)?.clone();
        for segment in segments {
            module = module.submodule(segment)?;
        }
        Some(module)
    }

    /// Top-level module by name.
    pub fn module(&self, name: &str) -> Option<Arc<ModuleSpec>> {
        self.modules.get(name).cloned()
    }
}

// =============================================================================
// Raw JSON model
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawModuleSpec {
    #[serde(default)]
    functions: Vec<RawFunctionSpec>,
    #[serde(default)]
    types: HashMap<String, Vec<RawFunctionSpec>>,
    #[serde(default)]
    modules: HashMap<String, RawModuleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFunctionSpec {
    Name(String),
    Full(RawFunctionDetails),
}

#[derive(Debug, Deserialize)]
struct RawFunctionDetails {
    name: String,
    #[serde(default)]
    updates: Vec<UpdateTarget>,
    #[serde(default)]
    reads: Vec<String>,
    #[serde(default)]
    returns: Option<String>,
    #[serde(default, rename = "higherorder")]
    higher_order: Option<usize>,
}

fn normalize_function(raw: RawFunctionSpec) -> FunctionSpec {
    match raw {
        RawFunctionSpec::Name(name) => FunctionSpec::named(&name),
        RawFunctionSpec::Full(details) => FunctionSpec {
            name: details.name,
            updates: details.updates,
            reads: details.reads,
            returns: details.returns,
            returns_type: None,
            higher_order: details.higher_order,
        },
    }
}

fn normalize_module(name: &str, raw: RawModuleSpec) -> ModuleSpec {
    // Types first, so function return names can resolve against them.
    let mut types = FxHashMap::default();
    for (type_name, methods) in raw.types {
        let methods: FxHashMap<String, Arc<FunctionSpec>> = methods
            .into_iter()
            .map(normalize_function)
            .map(|f| (f.name.clone(), Arc::new(f)))
            .collect();
        types.insert(
            type_name.clone(),
            Arc::new(TypeSpec {
                name: type_name,
                methods,
            }),
        );
    }

    // Method return types resolve against the same module's types map.
    let resolved_types: FxHashMap<String, Arc<TypeSpec>> = types
        .iter()
        .map(|(type_name, type_spec)| {
            let methods = type_spec
                .methods
                .iter()
                .map(|(method_name, method)| {
                    let mut method = (**method).clone();
                    method.returns_type = method
                        .returns
                        .as_ref()
                        .and_then(|r| types.get(r))
                        .cloned();
                    (method_name.clone(), Arc::new(method))
                })
                .collect();
            (
                type_name.clone(),
                Arc::new(TypeSpec {
                    name: type_spec.name.clone(),
                    methods,
                }),
            )
        })
        .collect();

    let functions: FxHashMap<String, Arc<FunctionSpec>> = raw
        .functions
        .into_iter()
        .map(normalize_function)
        .map(|mut f| {
            f.returns_type = f.returns.as_ref().and_then(|r| resolved_types.get(r)).cloned();
            (f.name.clone(), Arc::new(f))
        })
        .collect();

    let modules: FxHashMap<String, Arc<ModuleSpec>> = raw
        .modules
        .into_iter()
        .map(|(sub_name, sub)| {
            let normalized = normalize_module(&sub_name, sub);
            (sub_name, Arc::new(normalized))
        })
        .collect();

    ModuleSpec {
        name: name.to_string(),
        functions,
        types: resolved_types,
        modules,
    }
}

// =============================================================================
// Default bundle
// =============================================================================

static DEFAULT_SPECS: Lazy<SpecBundle> = Lazy::new(|| {
    let sources = [
        include_str!("data/__builtins__.json"),
        include_str!("data/random.json"),
        include_str!("data/matplotlib.json"),
        include_str!("data/pandas.json"),
        include_str!("data/sklearn.json"),
        include_str!("data/numpy.json"),
    ];
    let mut bundle = SpecBundle::default();
    for source in sources {
        let parsed = SpecBundle::from_json(source).expect("bundled spec files are well-formed");
        bundle.merge(parsed);
    }
    bundle
});

/// The default spec bundle: built-ins plus the common data-science stack.
pub fn default_specs() -> &'static SpecBundle {
    &DEFAULT_SPECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_shorthand_normalises() {
        let bundle = SpecBundle::from_json(r#"{"m": {"functions": ["f"]}}"#).unwrap();
        let f = bundle.module("m").unwrap().function("f").unwrap();
        assert!(f.updates.is_empty());
        assert!(f.reads.is_empty());
        assert!(f.returns.is_none());
    }

    #[test]
    fn test_returns_resolves_against_module_types() {
        let bundle = SpecBundle::from_json(
            r#"{"m": {
                "functions": [{"name": "make", "returns": "T"}],
                "types": {"T": [{"name": "mutate", "updates": [0]}, "peek"]}
            }}"#,
        )
        .unwrap();
        let make = bundle.module("m").unwrap().function("make").unwrap();
        let t = make.returns_type.as_ref().expect("resolved type");
        assert_eq!(t.name, "T");
        assert!(t.method("mutate").is_some());
        assert!(t.method("peek").unwrap().updates.is_empty());
    }

    #[test]
    fn test_update_targets_numbers_and_globals() {
        let bundle = SpecBundle::from_json(
            r#"{"m": {"functions": [{"name": "f", "updates": [0, 2, "state"]}]}}"#,
        )
        .unwrap();
        let f = bundle.module("m").unwrap().function("f").unwrap();
        let positions: Vec<usize> = f.updated_positions().collect();
        assert_eq!(positions, vec![0, 2]);
        assert!(f
            .updates
            .contains(&UpdateTarget::Global("state".to_string())));
    }

    #[test]
    fn test_nested_module_resolution() {
        let bundle = SpecBundle::from_json(
            r#"{"a": {"modules": {"b": {"modules": {"c": {"functions": ["f"]}}}}}}"#,
        )
        .unwrap();
        assert!(bundle.resolve("a.b.c").unwrap().function("f").is_some());
        assert!(bundle.resolve("a.x").is_none());
    }

    #[test]
    fn test_default_bundle_loads() {
        let specs = default_specs();
        assert!(specs.module("__builtins__").is_some());
        let pandas = specs.module("pandas").unwrap();
        let read_csv = pandas.function("read_csv").unwrap();
        assert_eq!(
            read_csv.returns_type.as_ref().map(|t| t.name.as_str()),
            Some("DataFrame")
        );
        let df = pandas.type_spec("DataFrame").unwrap();
        let positions: Vec<usize> = df.method("pop").unwrap().updated_positions().collect();
        assert_eq!(positions, vec![0]);
        assert!(specs.resolve("sklearn.cluster").is_some());
        assert!(specs.resolve("matplotlib.pyplot").unwrap().function("scatter").is_some());
    }
}
