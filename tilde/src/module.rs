use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

/// A callable exported by a native module. Errors are plain messages; the
/// interpreter prefixes them with `module.function`.
pub trait NativeFunction {
    fn call(&mut self, args: &[Value]) -> Result<Value, String>;
}

pub type StaticNativeFunction = fn(&[Value]) -> Result<Value, String>;

struct StaticNative(StaticNativeFunction);

impl NativeFunction for StaticNative {
    fn call(&mut self, args: &[Value]) -> Result<Value, String> {
        (self.0)(args)
    }
}

/// A loaded module. Resolution happens once per function name; the
/// interpreter caches what this returns.
pub trait NativeModule {
    fn resolve(&mut self, name: &str) -> Option<Box<dyn NativeFunction>>;
}

pub trait ModuleLoader {
    fn load(&mut self, name: &str) -> Option<Box<dyn NativeModule>>;
}

type NativeFactory = dyn Fn() -> Box<dyn NativeFunction> + Send + Sync;

enum NativeEntry {
    Factory(Box<NativeFactory>),
    Static(StaticNativeFunction),
}

#[derive(Clone, Default)]
struct ModuleDef {
    entries: HashMap<String, Arc<NativeEntry>>,
}

/// In-process module loader. Modules are collections of named functions
/// registered either as plain fns or as factories producing stateful
/// callables.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<ModuleDef>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, module: impl Into<String>, function: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NativeFunction> + Send + Sync + 'static,
    {
        self.insert(module.into(), function.into(), NativeEntry::Factory(Box::new(factory)));
    }

    pub fn register_static(
        &mut self,
        module: impl Into<String>,
        function: impl Into<String>,
        callable: StaticNativeFunction,
    ) {
        self.insert(module.into(), function.into(), NativeEntry::Static(callable));
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn function_names(&self, module: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .modules
            .get(module)
            .map(|def| def.entries.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    // Modules already handed out keep the entries they were loaded with.
    fn insert(&mut self, module: String, function: String, entry: NativeEntry) {
        let def = self.modules.entry(module).or_default();
        Arc::make_mut(def).entries.insert(function, Arc::new(entry));
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&mut self, name: &str) -> Option<Box<dyn NativeModule>> {
        let def = self.modules.get(name)?;
        Some(Box::new(LoadedModule {
            def: Arc::clone(def),
        }))
    }
}

struct LoadedModule {
    def: Arc<ModuleDef>,
}

impl NativeModule for LoadedModule {
    fn resolve(&mut self, name: &str) -> Option<Box<dyn NativeFunction>> {
        let entry = self.def.entries.get(name)?;
        Some(match entry.as_ref() {
            NativeEntry::Factory(factory) => factory(),
            NativeEntry::Static(callable) => Box::new(StaticNative(*callable)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(args: &[Value]) -> Result<Value, String> {
        match args {
            [Value::Int(v)] => Ok(Value::Int(v * 2)),
            _ => Err("expected one int".to_string()),
        }
    }

    struct Counter {
        calls: i64,
    }

    impl NativeFunction for Counter {
        fn call(&mut self, _args: &[Value]) -> Result<Value, String> {
            self.calls += 1;
            Ok(Value::Int(self.calls))
        }
    }

    #[test]
    fn static_functions_resolve_through_loaded_module() {
        let mut registry = ModuleRegistry::new();
        registry.register_static("util", "double", double);

        let mut module = registry.load("util").expect("util should load");
        let mut callable = module.resolve("double").expect("double should resolve");
        assert_eq!(callable.call(&[Value::Int(21)]), Ok(Value::Int(42)));
        assert_eq!(
            callable.call(&[]),
            Err("expected one int".to_string())
        );
        assert!(module.resolve("triple").is_none());
    }

    #[test]
    fn factories_produce_independent_state() {
        let mut registry = ModuleRegistry::new();
        registry.register("util", "counter", || Box::new(Counter { calls: 0 }));

        let mut module = registry.load("util").expect("util should load");
        let mut first = module.resolve("counter").expect("counter should resolve");
        let mut second = module.resolve("counter").expect("counter should resolve");
        assert_eq!(first.call(&[]), Ok(Value::Int(1)));
        assert_eq!(first.call(&[]), Ok(Value::Int(2)));
        assert_eq!(second.call(&[]), Ok(Value::Int(1)));
    }

    #[test]
    fn unknown_module_does_not_load() {
        let mut registry = ModuleRegistry::new();
        registry.register_static("util", "double", double);
        assert!(registry.contains("util"));
        assert!(registry.load("missing").is_none());
    }

    #[test]
    fn registering_after_load_keeps_loaded_module_stable() {
        let mut registry = ModuleRegistry::new();
        registry.register_static("util", "double", double);
        let mut module = registry.load("util").expect("util should load");

        registry.register_static("util", "again", double);
        assert!(module.resolve("again").is_none());
        assert_eq!(registry.function_names("util"), vec!["again", "double"]);
    }
}
