use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{ScalarType, Value};

/// Handle into the scope arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeLink {
    Global,
    /// A scope without parent resolves unknown names against the global scope.
    Child(Option<ScopeId>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: String,
    pub ty: ScalarType,
    /// `None` until the first successful assignment.
    pub value: Option<Value>,
}

#[derive(Debug)]
struct Frame {
    link: ScopeLink,
    bindings: Vec<Binding>,
}

/// Arena of scopes. Scopes are created and discarded in LIFO order, so a
/// scope is released by truncating the arena back to its handle.
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<Frame>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                link: ScopeLink::Global,
                bindings: Vec::new(),
            }],
        }
    }

    pub fn push(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.frames.len());
        self.frames.push(Frame {
            link: ScopeLink::Child(parent),
            bindings: Vec::new(),
        });
        id
    }

    /// Opens a block scope below `current`. Blocks directly under the global
    /// scope get no parent and reach the globals through the fallback.
    pub fn push_block(&mut self, current: ScopeId) -> ScopeId {
        let parent = (current != ScopeId::GLOBAL).then_some(current);
        self.push(parent)
    }

    /// Discards `id` and every scope opened after it. The global scope stays.
    pub fn release(&mut self, id: ScopeId) {
        self.frames.truncate(id.0.max(1));
    }

    /// Drops every scope except the global one.
    pub fn unwind(&mut self) {
        self.frames.truncate(1);
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn link(&self, id: ScopeId) -> Option<ScopeLink> {
        self.frames.get(id.0).map(|frame| frame.link)
    }

    /// True when `name` is bound in `scope` itself, ignoring enclosing scopes.
    pub fn declared_in(&self, scope: ScopeId, name: &str) -> bool {
        self.frames
            .get(scope.0)
            .is_some_and(|frame| frame.bindings.iter().any(|binding| binding.name == name))
    }

    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: ScalarType,
        value: Option<Value>,
    ) -> RuntimeResult<()> {
        if self.declared_in(scope, name) {
            return Err(RuntimeError::Redeclaration(name.to_string()));
        }
        self.frames[scope.0].bindings.push(Binding {
            name: name.to_string(),
            ty,
            value,
        });
        Ok(())
    }

    pub fn get(&self, scope: ScopeId, name: &str) -> RuntimeResult<&Binding> {
        let (id, index) = self
            .resolve(scope, name)
            .ok_or_else(|| RuntimeError::UndeclaredVariable(name.to_string()))?;
        Ok(&self.frames[id.0].bindings[index])
    }

    pub fn get_mut(&mut self, scope: ScopeId, name: &str) -> RuntimeResult<&mut Binding> {
        let (id, index) = self
            .resolve(scope, name)
            .ok_or_else(|| RuntimeError::UndeclaredVariable(name.to_string()))?;
        Ok(&mut self.frames[id.0].bindings[index])
    }

    /// Value of an assigned binding.
    pub fn value(&self, scope: ScopeId, name: &str) -> RuntimeResult<Value> {
        self.get(scope, name)?
            .value
            .clone()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    fn resolve(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, usize)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = self.frames.get(id.0)?;
            if let Some(index) = frame.bindings.iter().position(|b| b.name == name) {
                return Some((id, index));
            }
            current = match frame.link {
                ScopeLink::Global => None,
                ScopeLink::Child(Some(parent)) => Some(parent),
                ScopeLink::Child(None) => Some(ScopeId::GLOBAL),
            };
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(scopes: &mut Scopes, scope: ScopeId, name: &str, value: Value) {
        scopes
            .get_mut(scope, name)
            .expect("binding should exist")
            .value = Some(value);
    }

    #[test]
    fn block_scope_sees_enclosing_bindings() {
        let mut scopes = Scopes::new();
        scopes
            .declare(ScopeId::GLOBAL, "x", ScalarType::Int, None)
            .expect("declare x");
        assign(&mut scopes, ScopeId::GLOBAL, "x", Value::Int(1));

        let outer = scopes.push_block(ScopeId::GLOBAL);
        scopes.declare(outer, "y", ScalarType::Int, None).expect("declare y");
        assign(&mut scopes, outer, "y", Value::Int(2));
        let inner = scopes.push_block(outer);

        assert_eq!(scopes.link(inner), Some(ScopeLink::Child(Some(outer))));
        assert_eq!(scopes.value(inner, "x"), Ok(Value::Int(1)));
        assert_eq!(scopes.value(inner, "y"), Ok(Value::Int(2)));
    }

    #[test]
    fn shadowing_is_allowed_but_redeclaration_is_not() {
        let mut scopes = Scopes::new();
        scopes
            .declare(ScopeId::GLOBAL, "x", ScalarType::Int, None)
            .expect("declare global x");
        let block = scopes.push_block(ScopeId::GLOBAL);
        scopes
            .declare(block, "x", ScalarType::String, None)
            .expect("shadow x");
        assert_eq!(
            scopes.declare(block, "x", ScalarType::Int, None),
            Err(RuntimeError::Redeclaration("x".to_string()))
        );
        assert_eq!(
            scopes.get(block, "x").map(|binding| binding.ty),
            Ok(ScalarType::String)
        );
    }

    #[test]
    fn parentless_scope_skips_to_globals() {
        let mut scopes = Scopes::new();
        scopes
            .declare(ScopeId::GLOBAL, "g", ScalarType::Bool, None)
            .expect("declare g");
        assign(&mut scopes, ScopeId::GLOBAL, "g", Value::Bool(true));

        let caller = scopes.push_block(ScopeId::GLOBAL);
        let caller_block = scopes.push_block(caller);
        scopes
            .declare(caller_block, "local", ScalarType::Int, None)
            .expect("declare local");

        let call = scopes.push(None);
        assert_eq!(scopes.value(call, "g"), Ok(Value::Bool(true)));
        assert_eq!(
            scopes.value(call, "local"),
            Err(RuntimeError::UndeclaredVariable("local".to_string()))
        );
    }

    #[test]
    fn unassigned_binding_is_undefined() {
        let mut scopes = Scopes::new();
        scopes
            .declare(ScopeId::GLOBAL, "s", ScalarType::String, None)
            .expect("declare s");
        assert_eq!(
            scopes.value(ScopeId::GLOBAL, "s"),
            Err(RuntimeError::UndefinedVariable("s".to_string()))
        );
    }

    #[test]
    fn release_drops_nested_scopes_but_keeps_globals() {
        let mut scopes = Scopes::new();
        let first = scopes.push(None);
        scopes.push_block(first);
        assert_eq!(scopes.depth(), 3);
        scopes.release(first);
        assert_eq!(scopes.depth(), 1);
        scopes.release(ScopeId::GLOBAL);
        assert_eq!(scopes.depth(), 1);
    }
}
