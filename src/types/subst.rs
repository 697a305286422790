/// Type-variable substitutions.
///
/// A substitution maps type-variable names to types. Unification extends a
/// substitution; `apply` replaces every free variable with its image,
/// following chains (`a := b`, `b := Integer` resolves `a` to `Integer`).
/// A visited-set guards chain application so cyclic bindings can never loop.
use std::collections::{HashMap, HashSet};

use super::Type;

#[derive(Debug, Clone, Default)]
pub struct Subst {
    map: HashMap<String, Type>,
}

impl Subst {
    pub fn new() -> Self {
        Subst {
            map: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: Type) {
        self.map.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.map.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Follow variable chains one level at a time until a non-variable type
    /// or an unbound variable is reached.
    pub fn resolve(&self, ty: &Type) -> Type {
        let mut seen = HashSet::new();
        let mut current = ty.clone();
        while let Type::Var { ref name, .. } = current {
            if !seen.insert(name.clone()) {
                break;
            }
            match self.map.get(name) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    /// Replace every free variable in `ty` with its image. Declaration
    /// bodies (sum variants, record fields) are not traversed: generic
    /// declarations carry their instantiation in `type_args`, which is what
    /// gets substituted.
    pub fn apply(&self, ty: &Type) -> Type {
        let mut guard = HashSet::new();
        self.apply_inner(ty, &mut guard)
    }

    fn apply_inner(&self, ty: &Type, guard: &mut HashSet<String>) -> Type {
        match ty {
            Type::Var { name, .. } => {
                if guard.contains(name) {
                    return ty.clone();
                }
                match self.map.get(name) {
                    Some(bound) => {
                        guard.insert(name.clone());
                        let result = self.apply_inner(bound, guard);
                        guard.remove(name);
                        result
                    }
                    None => ty.clone(),
                }
            }
            Type::Array(el) => Type::Array(Box::new(self.apply_inner(el, guard))),
            Type::Hash(k, v) => Type::Hash(
                Box::new(self.apply_inner(k, guard)),
                Box::new(self.apply_inner(v, guard)),
            ),
            Type::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|e| self.apply_inner(e, guard))
                    .collect(),
            ),
            Type::Function {
                params,
                ret,
                type_params,
            } => Type::Function {
                params: params
                    .iter()
                    .map(|p| self.apply_inner(p, guard))
                    .collect(),
                ret: Box::new(self.apply_inner(ret, guard)),
                type_params: type_params.clone(),
            },
            Type::Record { decl, type_args } => Type::Record {
                decl: decl.clone(),
                type_args: type_args
                    .iter()
                    .map(|a| self.apply_inner(a, guard))
                    .collect(),
            },
            Type::Sum { decl, type_args } => Type::Sum {
                decl: decl.clone(),
                type_args: type_args
                    .iter()
                    .map(|a| self.apply_inner(a, guard))
                    .collect(),
            },
            Type::Trait { decl, type_args } => Type::Trait {
                decl: decl.clone(),
                type_args: type_args
                    .iter()
                    .map(|a| self.apply_inner(a, guard))
                    .collect(),
            },
            _ => ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_simple_binding() {
        let mut s = Subst::new();
        s.insert("a", Type::Integer);
        assert_eq!(s.apply(&Type::var("a")), Type::Integer);
        assert_eq!(s.apply(&Type::var("b")), Type::var("b"));
    }

    #[test]
    fn follows_chains() {
        let mut s = Subst::new();
        s.insert("a", Type::var("b"));
        s.insert("b", Type::Integer);
        assert_eq!(s.apply(&Type::var("a")), Type::Integer);
        assert_eq!(s.resolve(&Type::var("a")), Type::Integer);
    }

    #[test]
    fn applies_inside_composites() {
        let mut s = Subst::new();
        s.insert("t", Type::Str);
        let fnty = Type::function(vec![Type::var("t")], Type::Array(Box::new(Type::var("t"))));
        assert_eq!(
            s.apply(&fnty),
            Type::function(vec![Type::Str], Type::Array(Box::new(Type::Str)))
        );
    }

    #[test]
    fn cyclic_bindings_terminate() {
        let mut s = Subst::new();
        s.insert("a", Type::var("b"));
        s.insert("b", Type::var("a"));
        // Resolution stops once a name repeats.
        let resolved = s.resolve(&Type::var("a"));
        assert!(matches!(resolved, Type::Var { .. }));
        let applied = s.apply(&Type::Array(Box::new(Type::var("a"))));
        assert!(matches!(applied, Type::Array(_)));
    }
}
