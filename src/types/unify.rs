/// Unification.
///
/// `unify(found, expected, σ)` attempts to make the two types structurally
/// equal by extending σ, returning whether it succeeded. `Any` absorbs
/// everything; an unresolved variable is bound to the other side; numeric
/// widening accepts an `Integer` wherever a `Double` is expected (one
/// direction only).
use std::collections::HashSet;

use super::subst::Subst;
use super::Type;

pub fn unify(found: &Type, expected: &Type, subst: &mut Subst) -> bool {
    let a = subst.resolve(found);
    let b = subst.resolve(expected);

    match (&a, &b) {
        (Type::Any, _) | (_, Type::Any) => true,
        (Type::Error { .. }, _) | (_, Type::Error { .. }) => true,

        (Type::Var { name: an, .. }, Type::Var { name: bn, .. }) if an == bn => true,
        (Type::Var { name, .. }, other) | (other, Type::Var { name, .. }) => {
            if occurs(name, other, subst) {
                return false;
            }
            subst.insert(name.clone(), other.clone());
            true
        }

        (Type::Integer, Type::Integer)
        | (Type::Double, Type::Double)
        | (Type::Boolean, Type::Boolean)
        | (Type::Str, Type::Str)
        | (Type::Null, Type::Null) => true,

        // Numeric relaxation: Integer is acceptable where Double is expected.
        (Type::Integer, Type::Double) => true,

        (Type::Array(ae), Type::Array(be)) => unify(ae, be, subst),
        (Type::Hash(ak, av), Type::Hash(bk, bv)) => {
            unify(ak, bk, subst) && unify(av, bv, subst)
        }
        (Type::Tuple(ae), Type::Tuple(be)) => {
            ae.len() == be.len() && ae.iter().zip(be).all(|(x, y)| unify(x, y, subst))
        }
        (
            Type::Function {
                params: ap,
                ret: ar,
                ..
            },
            Type::Function {
                params: bp,
                ret: br,
                ..
            },
        ) => {
            ap.len() == bp.len()
                && ap.iter().zip(bp).all(|(x, y)| unify(x, y, subst))
                && unify(ar, br, subst)
        }
        (
            Type::Sum {
                decl: ad,
                type_args: aa,
            },
            Type::Sum {
                decl: bd,
                type_args: ba,
            },
        ) => {
            ad.name == bd.name
                && aa.len() == ba.len()
                && aa.iter().zip(ba).all(|(x, y)| unify(x, y, subst))
        }
        (
            Type::Record {
                decl: ad,
                type_args: aa,
            },
            Type::Record {
                decl: bd,
                type_args: ba,
            },
        ) => {
            ad.name == bd.name
                && aa.len() == ba.len()
                && aa.iter().zip(ba).all(|(x, y)| unify(x, y, subst))
        }
        (
            Type::Trait {
                decl: ad,
                type_args: aa,
            },
            Type::Trait {
                decl: bd,
                type_args: ba,
            },
        ) => {
            ad.name == bd.name
                && aa.len() == ba.len()
                && aa.iter().zip(ba).all(|(x, y)| unify(x, y, subst))
        }
        (Type::Module { name: an, .. }, Type::Module { name: bn, .. }) => an == bn,

        _ => false,
    }
}

/// Occurs check over the resolved type; prevents binding a variable to a
/// type containing itself.
fn occurs(name: &str, ty: &Type, subst: &Subst) -> bool {
    let mut guard = HashSet::new();
    occurs_inner(name, ty, subst, &mut guard)
}

fn occurs_inner(name: &str, ty: &Type, subst: &Subst, guard: &mut HashSet<String>) -> bool {
    match ty {
        Type::Var { name: vn, .. } => {
            if vn == name {
                return true;
            }
            if !guard.insert(vn.clone()) {
                return false;
            }
            match subst.get(vn) {
                Some(bound) => occurs_inner(name, &bound.clone(), subst, guard),
                None => false,
            }
        }
        Type::Array(el) => occurs_inner(name, el, subst, guard),
        Type::Hash(k, v) => {
            occurs_inner(name, k, subst, guard) || occurs_inner(name, v, subst, guard)
        }
        Type::Tuple(elements) => elements
            .iter()
            .any(|e| occurs_inner(name, e, subst, guard)),
        Type::Function { params, ret, .. } => {
            params.iter().any(|p| occurs_inner(name, p, subst, guard))
                || occurs_inner(name, ret, subst, guard)
        }
        Type::Sum { type_args, .. }
        | Type::Record { type_args, .. }
        | Type::Trait { type_args, .. } => type_args
            .iter()
            .any(|a| occurs_inner(name, a, subst, guard)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unifies_identical_primitives() {
        let mut s = Subst::new();
        assert!(unify(&Type::Integer, &Type::Integer, &mut s));
        assert!(unify(&Type::Str, &Type::Str, &mut s));
        assert!(!unify(&Type::Str, &Type::Integer, &mut s));
    }

    #[test]
    fn widening_is_one_directional() {
        let mut s = Subst::new();
        assert!(unify(&Type::Integer, &Type::Double, &mut s));
        assert!(!unify(&Type::Double, &Type::Integer, &mut s));
    }

    #[test]
    fn binds_variables() {
        let mut s = Subst::new();
        assert!(unify(&Type::var("a"), &Type::Integer, &mut s));
        assert_eq!(s.resolve(&Type::var("a")), Type::Integer);
        // Bound variable now behaves as its image.
        assert!(!unify(&Type::var("a"), &Type::Str, &mut s));
    }

    #[test]
    fn unify_then_substitute_yields_equal_types() {
        // The unification law: success means substituted sides are equal.
        let mut s = Subst::new();
        let a = Type::function(
            vec![Type::var("x")],
            Type::Array(Box::new(Type::var("y"))),
        );
        let b = Type::function(vec![Type::Integer], Type::Array(Box::new(Type::Str)));
        assert!(unify(&a, &b, &mut s));
        assert_eq!(s.apply(&a), s.apply(&b));
    }

    #[test]
    fn rejects_occurs_violation() {
        let mut s = Subst::new();
        let inf = Type::Array(Box::new(Type::var("a")));
        assert!(!unify(&Type::var("a"), &inf, &mut s));
    }

    #[test]
    fn arity_mismatch_fails() {
        let mut s = Subst::new();
        let one = Type::function(vec![Type::Integer], Type::Integer);
        let two = Type::function(vec![Type::Integer, Type::Integer], Type::Integer);
        assert!(!unify(&one, &two, &mut s));
    }
}
