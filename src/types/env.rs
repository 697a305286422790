/// Scoped type environments.
///
/// A chain of maps to the enclosing scope. Each frame holds named bindings
/// (with mutability), declared types, the data-constructor table, the
/// trait-implementation table, the active-pattern registry, an optional
/// exposed-name set, and the declared return type of the enclosing function
/// (used by the `?` operator).
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::Type;
use crate::ast::ImplDecl;

#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: Type,
    pub mutable: bool,
}

/// A trait implementation as the checker records it: the impl AST plus the
/// environment at the impl site.
#[derive(Clone)]
pub struct ImplEntry {
    pub decl: Rc<ImplDecl>,
    pub env: TypeEnv,
}

#[derive(Clone)]
pub struct TypeEnv(Rc<RefCell<TypeEnvData>>);

struct TypeEnvData {
    store: HashMap<String, Binding>,
    /// Named type declarations (sums, records, traits).
    types: HashMap<String, Type>,
    /// Data-constructor name → function type. Constructors shadow bindings.
    ctors: HashMap<String, Type>,
    /// Base type name → trait implementations.
    impls: HashMap<String, Vec<ImplEntry>>,
    /// Active-pattern case name → the registered function type.
    active_patterns: HashMap<String, Type>,
    exposed: Option<HashSet<String>>,
    /// `None` when this frame is not a function scope; `Some(inner)` marks a
    /// function frame whose declared return type is `inner` (possibly
    /// undeclared). The distinction keeps an inner lambda from inheriting
    /// the enclosing function's declared return type.
    current_ret: Option<Option<Type>>,
    parent: Option<TypeEnv>,
}

impl fmt::Debug for TypeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeEnv({} bindings)", self.0.borrow().store.len())
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        TypeEnv::new()
    }
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv(Rc::new(RefCell::new(TypeEnvData {
            store: HashMap::new(),
            types: HashMap::new(),
            ctors: HashMap::new(),
            impls: HashMap::new(),
            active_patterns: HashMap::new(),
            exposed: None,
            current_ret: None,
            parent: None,
        })))
    }

    /// A fresh scope whose parent is `self`.
    pub fn child(&self) -> TypeEnv {
        let env = TypeEnv::new();
        env.0.borrow_mut().parent = Some(self.clone());
        env
    }

    pub fn ptr_eq(&self, other: &TypeEnv) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    pub fn define(&self, name: impl Into<String>, ty: Type, mutable: bool) {
        self.0
            .borrow_mut()
            .store
            .insert(name.into(), Binding { ty, mutable });
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        let data = self.0.borrow();
        if let Some(binding) = data.store.get(name) {
            return Some(binding.clone());
        }
        data.parent.as_ref().and_then(|p| p.get(name))
    }

    /// True when `name` is bound in this exact frame (not a parent).
    pub fn defined_locally(&self, name: &str) -> bool {
        self.0.borrow().store.contains_key(name)
    }

    // -----------------------------------------------------------------------
    // Named types and constructors
    // -----------------------------------------------------------------------

    pub fn define_type(&self, name: impl Into<String>, ty: Type) {
        self.0.borrow_mut().types.insert(name.into(), ty);
    }

    pub fn lookup_type(&self, name: &str) -> Option<Type> {
        let data = self.0.borrow();
        if let Some(ty) = data.types.get(name) {
            return Some(ty.clone());
        }
        data.parent.as_ref().and_then(|p| p.lookup_type(name))
    }

    pub fn define_ctor(&self, name: impl Into<String>, ty: Type) {
        self.0.borrow_mut().ctors.insert(name.into(), ty);
    }

    pub fn ctor(&self, name: &str) -> Option<Type> {
        let data = self.0.borrow();
        if let Some(ty) = data.ctors.get(name) {
            return Some(ty.clone());
        }
        data.parent.as_ref().and_then(|p| p.ctor(name))
    }

    // -----------------------------------------------------------------------
    // Trait implementations
    // -----------------------------------------------------------------------

    pub fn add_impl(&self, base: impl Into<String>, entry: ImplEntry) {
        self.0
            .borrow_mut()
            .impls
            .entry(base.into())
            .or_default()
            .push(entry);
    }

    /// All implementations registered for `base`, innermost scope first.
    pub fn impls_for(&self, base: &str) -> Vec<ImplEntry> {
        let mut entries = Vec::new();
        let data = self.0.borrow();
        if let Some(local) = data.impls.get(base) {
            entries.extend(local.iter().cloned());
        }
        if let Some(parent) = &data.parent {
            entries.extend(parent.impls_for(base));
        }
        entries
    }

    /// The full impl table of this frame, for merging into an importer.
    pub fn local_impls(&self) -> HashMap<String, Vec<ImplEntry>> {
        self.0.borrow().impls.clone()
    }

    // -----------------------------------------------------------------------
    // Active patterns
    // -----------------------------------------------------------------------

    pub fn register_active_pattern(&self, case: impl Into<String>, fn_ty: Type) {
        self.0.borrow_mut().active_patterns.insert(case.into(), fn_ty);
    }

    pub fn active_pattern(&self, case: &str) -> Option<Type> {
        let data = self.0.borrow();
        if let Some(ty) = data.active_patterns.get(case) {
            return Some(ty.clone());
        }
        data.parent.as_ref().and_then(|p| p.active_pattern(case))
    }

    // -----------------------------------------------------------------------
    // Exposure
    // -----------------------------------------------------------------------

    pub fn set_exposed(&self, names: Option<Vec<String>>) {
        self.0.borrow_mut().exposed = names.map(|ns| ns.into_iter().collect());
    }

    /// Absent set means everything is exposed.
    pub fn is_exposed(&self, name: &str) -> bool {
        match &self.0.borrow().exposed {
            Some(set) => set.contains(name),
            None => true,
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.get(name).is_some() || self.ctor(name).is_some() || self.lookup_type(name).is_some()
    }

    // -----------------------------------------------------------------------
    // Enclosing function return type
    // -----------------------------------------------------------------------

    /// Mark this frame as a function scope with declared return type `ty`
    /// (`None` when the function has no declared return type).
    pub fn set_current_ret(&self, ty: Option<Type>) {
        self.0.borrow_mut().current_ret = Some(ty);
    }

    /// The innermost enclosing function frame: `None` outside any function,
    /// `Some(None)` inside a function without a declared return type,
    /// `Some(Some(ty))` inside one that declares `ty`.
    pub fn current_ret(&self) -> Option<Option<Type>> {
        let data = self.0.borrow();
        if let Some(frame) = &data.current_ret {
            return Some(frame.clone());
        }
        data.parent.as_ref().and_then(|p| p.current_ret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_lookup_and_shadowing() {
        let outer = TypeEnv::new();
        outer.define("x", Type::Integer, false);
        let inner = outer.child();
        assert_eq!(inner.get("x").unwrap().ty, Type::Integer);
        inner.define("x", Type::Str, false);
        assert_eq!(inner.get("x").unwrap().ty, Type::Str);
        assert_eq!(outer.get("x").unwrap().ty, Type::Integer);
    }

    #[test]
    fn current_ret_found_through_chain() {
        let outer = TypeEnv::new();
        let fn_frame = outer.child();
        fn_frame.set_current_ret(Some(Type::Integer));
        let block = fn_frame.child();
        assert_eq!(block.current_ret(), Some(Some(Type::Integer)));
        assert_eq!(outer.current_ret(), None);
    }

    #[test]
    fn inner_function_frame_shadows_declared_ret() {
        let outer_fn = TypeEnv::new();
        outer_fn.set_current_ret(Some(Type::Integer));
        let inner_fn = outer_fn.child();
        inner_fn.set_current_ret(None);
        assert_eq!(inner_fn.current_ret(), Some(None));
    }

    #[test]
    fn exposure_defaults_to_everything() {
        let env = TypeEnv::new();
        assert!(env.is_exposed("anything"));
        env.set_exposed(Some(vec!["a".to_string()]));
        assert!(env.is_exposed("a"));
        assert!(!env.is_exposed("b"));
    }
}
