//! Symbol table: the set of modules, functions, and types visible to the
//! analysis at a program point.
//!
//! One table lives inside each analyzer instance. Import statements grow it
//! as they are analysed; function definitions store their inferred specs
//! into it so later calls resolve. Built-ins are preloaded at construction.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::specs::{FunctionSpec, ModuleSpec, SpecBundle, TypeSpec, UpdateTarget};

/// A name requested by a from-import: `{path, name}` pairs where a path of
/// `"*"` imports everything.
#[derive(Debug, Clone)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Mutable collection of currently-visible modules, functions, and types.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    specs: SpecBundle,
    modules: FxHashMap<String, Arc<ModuleSpec>>,
    functions: FxHashMap<String, Arc<FunctionSpec>>,
    types: FxHashMap<String, Arc<TypeSpec>>,
}

impl SymbolTable {
    /// Create a table over a spec bundle, preloading `__builtins__`.
    pub fn new(specs: SpecBundle) -> Self {
        let mut table = Self {
            specs,
            modules: FxHashMap::default(),
            functions: FxHashMap::default(),
            types: FxHashMap::default(),
        };
        table.import_everything_from("__builtins__");
        table
    }

    /// Register a module under a dotted path, and under an alias if given.
    ///
    /// Unknown modules are logged and ignored: an import of a library we
    /// have no spec for must not fail the analysis.
    pub fn import_module(&mut self, path: &str, alias: Option<&str>) {
        let Some(module) = self.specs.resolve(path) else {
            warn!(module = path, "no spec for imported module");
            return;
        };
        self.modules.insert(path.to_string(), module.clone());
        if let Some(alias) = alias {
            self.modules.insert(alias.to_string(), module);
        }
    }

    /// Register selected definitions of a module (a from-import).
    pub fn import_module_definitions(&mut self, path: &str, imports: &[ImportedName]) {
        let Some(module) = self.specs.resolve(path) else {
            warn!(module = path, "no spec for imported module");
            return;
        };
        for import in imports {
            if import.name == "*" {
                self.import_all(&module);
                continue;
            }
            let bound = import.bound_name().to_string();
            if let Some(function) = module.function(&import.name) {
                self.functions.insert(bound, function);
            } else if let Some(type_spec) = module.type_spec(&import.name) {
                self.types.insert(bound, type_spec);
            } else if let Some(submodule) = module.submodule(&import.name) {
                // `from sklearn import datasets` binds the submodule itself.
                self.modules.insert(bound, submodule);
            } else {
                warn!(module = path, name = %import.name, "unknown name in from-import");
            }
        }
    }

    /// Import every function and type of a module into the globals.
    pub fn import_everything_from(&mut self, path: &str) {
        let Some(module) = self.specs.resolve(path) else {
            warn!(module = path, "no spec for imported module");
            return;
        };
        self.import_all(&module);
    }

    fn import_all(&mut self, module: &Arc<ModuleSpec>) {
        for function in module.functions() {
            self.functions
                .insert(function.name.clone(), function.clone());
        }
        for type_spec in module.types() {
            self.types.insert(type_spec.name.clone(), type_spec.clone());
        }
    }

    /// Store a locally-defined function's spec (from parameter side-effect
    /// analysis of a `def` body).
    pub fn put_function(&mut self, spec: FunctionSpec) {
        self.functions.insert(spec.name.clone(), Arc::new(spec));
    }

    /// A currently-imported module by path or alias.
    pub fn module(&self, name: &str) -> Option<Arc<ModuleSpec>> {
        self.modules.get(name).cloned()
    }

    /// A globally-visible type by name.
    pub fn type_spec(&self, name: &str) -> Option<Arc<TypeSpec>> {
        self.types.get(name).cloned()
    }

    /// Resolve a bare function name.
    ///
    /// Falls back to a synthetic constructor when the name is a known type:
    /// calling a type constructs an instance of it, mutating the receiver.
    pub fn lookup_function(&self, name: &str) -> Option<Arc<FunctionSpec>> {
        if let Some(function) = self.functions.get(name) {
            return Some(function.clone());
        }
        self.types.get(name).map(|t| {
            Arc::new(FunctionSpec {
                name: "__init__".to_string(),
                updates: vec![UpdateTarget::Position(0)],
                reads: Vec::new(),
                returns: Some(t.name.clone()),
                returns_type: Some(t.clone()),
                higher_order: None,
            })
        })
    }

    /// Resolve a `module.function` reference.
    pub fn lookup_module_function(
        &self,
        module: &str,
        function: &str,
    ) -> Option<Arc<FunctionSpec>> {
        self.modules.get(module)?.function(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::default_specs;

    fn table() -> SymbolTable {
        SymbolTable::new(default_specs().clone())
    }

    #[test]
    fn test_builtins_preloaded() {
        let t = table();
        assert!(t.lookup_function("print").is_some());
        assert!(t.lookup_function("len").is_some());
        assert!(t.lookup_function("definitely_not_builtin").is_none());
    }

    #[test]
    fn test_import_module_with_alias() {
        let mut t = table();
        t.import_module("pandas", Some("pd"));
        assert!(t.module("pandas").is_some());
        assert!(t.lookup_module_function("pd", "read_csv").is_some());
    }

    #[test]
    fn test_import_dotted_module() {
        let mut t = table();
        t.import_module("matplotlib.pyplot", Some("plt"));
        assert!(t.lookup_module_function("plt", "scatter").is_some());
    }

    #[test]
    fn test_unknown_module_is_noop() {
        let mut t = table();
        t.import_module("does.not.exist", Some("x"));
        assert!(t.module("x").is_none());
    }

    #[test]
    fn test_from_import_function_and_type() {
        let mut t = table();
        t.import_module_definitions(
            "matplotlib.pyplot",
            &[ImportedName::plain("scatter")],
        );
        assert!(t.lookup_function("scatter").is_some());

        t.import_module_definitions("sklearn.cluster", &[ImportedName::plain("KMeans")]);
        let ctor = t.lookup_function("KMeans").expect("constructor synthesized");
        assert_eq!(ctor.name, "__init__");
        assert_eq!(
            ctor.returns_type.as_ref().map(|t| t.name.as_str()),
            Some("KMeans")
        );
    }

    #[test]
    fn test_from_import_submodule() {
        let mut t = table();
        t.import_module_definitions("sklearn", &[ImportedName::plain("datasets")]);
        assert!(t.lookup_module_function("datasets", "load_iris").is_some());
    }

    #[test]
    fn test_wildcard_import() {
        let mut t = table();
        t.import_module_definitions(
            "matplotlib.pyplot",
            &[ImportedName::plain("*")],
        );
        assert!(t.lookup_function("scatter").is_some());
        assert!(t.lookup_function("xlabel").is_some());
    }

    #[test]
    fn test_put_function_overrides() {
        let mut t = table();
        t.put_function(FunctionSpec {
            name: "helper".to_string(),
            updates: vec![UpdateTarget::Position(1)],
            reads: Vec::new(),
            returns: None,
            returns_type: None,
            higher_order: None,
        });
        let spec = t.lookup_function("helper").unwrap();
        assert_eq!(spec.updated_positions().collect::<Vec<_>>(), vec![1]);
    }
}
