use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// The kind bound to a logic variable. `Any` is the lattice top: it is
/// compatible with every other concrete kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Entity,
    TextSpan,
    Temporal,
    PosTag,
    Dependency,
    Any,
}

impl VariableKind {
    /// Unify two producer kinds for the same variable name. Returns
    /// `None` when the two concrete kinds conflict (caller should then
    /// fail validation); `Any` never conflicts with anything.
    pub fn unify(self, other: VariableKind) -> Option<VariableKind> {
        use VariableKind::*;
        match (self, other) {
            (Any, k) | (k, Any) => Some(k),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }
}

/// Which condition kind produced or consumed a variable appearance,
/// used only for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Contains,
    Ner,
    Pos,
    Dependency,
    Temporal,
}

#[derive(Debug, Clone, PartialEq)]
struct Appearance {
    kind: VariableKind,
    condition: ConditionKind,
}

/// Tracks, for every variable name appearing in a query, the set of
/// conditions that produce it and the set that consume it.
///
/// Never a shared mutable graph between producer and consumer entries —
/// two parallel maps, per the Design Notes in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableRegistry {
    producers: FxHashMap<SmolStr, Vec<Appearance>>,
    consumers: FxHashMap<SmolStr, Vec<Appearance>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_producer(&mut self, name: impl Into<SmolStr>, kind: VariableKind, condition: ConditionKind) {
        self.producers
            .entry(name.into())
            .or_default()
            .push(Appearance { kind, condition });
    }

    pub fn register_consumer(&mut self, name: impl Into<SmolStr>, kind: VariableKind, condition: ConditionKind) {
        self.consumers
            .entry(name.into())
            .or_default()
            .push(Appearance { kind, condition });
    }

    pub fn has_producer(&self, name: &str) -> bool {
        self.producers.contains_key(name)
    }

    pub fn producer_count(&self, name: &str) -> usize {
        self.producers.get(name).map(Vec::len).unwrap_or(0)
    }

    /// Collapse all producer kinds for a variable. `None` if the
    /// variable has no producers at all; `Some(None)` is never returned
    /// — a kind conflict is reported through `conflicting_kind`.
    pub fn inferred_kind(&self, name: &str) -> Option<VariableKind> {
        let appearances = self.producers.get(name)?;
        let mut acc = appearances.first()?.kind;
        for appearance in &appearances[1..] {
            acc = acc.unify(appearance.kind)?;
        }
        Some(acc)
    }

    /// Returns `true` if two producers of `name` have concrete kinds
    /// that cannot unify.
    pub fn has_kind_conflict(&self, name: &str) -> bool {
        match self.producers.get(name) {
            None => false,
            Some(appearances) => {
                let mut acc = match appearances.first() {
                    Some(a) => a.kind,
                    None => return false,
                };
                for appearance in &appearances[1..] {
                    match acc.unify(appearance.kind) {
                        Some(next) => acc = next,
                        None => return true,
                    }
                }
                false
            }
        }
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.producers.keys().chain(
            self.consumers
                .keys()
                .filter(|k| !self.producers.contains_key(*k)),
        )
    }

    pub fn consumer_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.consumers.keys()
    }
}
