//! Overload selection by argument-type scoring.

use crate::analysis::CONSTRUCTOR_NAME;
use crate::registry::{MemberId, Registry, TypeId};

use super::tables::{param_score, EXACT, MISMATCH};

/// Selects the best-matching member among same-named candidates.
pub struct OverloadResolver<'r> {
    registry: &'r Registry,
}

impl<'r> OverloadResolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Mean per-position score of `args` against `params`, or `None` when
    /// the arity differs.
    pub fn match_score(params: &[String], args: &[String]) -> Option<f64> {
        if params.len() != args.len() {
            return None;
        }
        if params.is_empty() {
            return Some(EXACT);
        }
        let total: f64 = params
            .iter()
            .zip(args)
            .map(|(param, arg)| param_score(arg, param))
            .sum();
        Some(total / params.len() as f64)
    }

    /// Highest-scoring candidate; ties go to the earliest in `candidates`.
    /// A candidate must score above zero to be selected at all.
    pub fn best(&self, candidates: &[MemberId], args: &[String]) -> Option<MemberId> {
        let mut best: Option<(MemberId, f64)> = None;
        for &candidate in candidates {
            let params = &self.registry.member(candidate).params;
            let Some(score) = Self::match_score(params, args) else {
                continue;
            };
            if score <= MISMATCH {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((candidate, score)),
            }
        }
        best.map(|(member, _)| member)
    }

    /// Best method named `name` on `target` or its supertypes.
    pub fn select_method(&self, target: TypeId, name: &str, args: &[String]) -> Option<MemberId> {
        let candidates = self.registry.find_members(target, name, true);
        self.best(&candidates, args)
    }

    /// Best constructor declared on `target` itself.
    pub fn select_constructor(&self, target: TypeId, args: &[String]) -> Option<MemberId> {
        let candidates: Vec<MemberId> = self
            .registry
            .declared_members(target)
            .iter()
            .copied()
            .filter(|&m| self.registry.member(m).is_constructor())
            .collect();
        self.best(&candidates, args)
    }

    /// Target of a member reference. References carry no arguments, so the
    /// first declared member with the name wins; `new` is the first
    /// constructor.
    pub fn select_reference(&self, target: TypeId, name: &str) -> Option<MemberId> {
        if name == CONSTRUCTOR_NAME {
            return self
                .registry
                .declared_members(target)
                .iter()
                .copied()
                .find(|&m| self.registry.member(m).is_constructor());
        }
        self.registry
            .find_members(target, name, true)
            .into_iter()
            .next()
    }
}
