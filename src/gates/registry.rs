use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::gates::context::GateContext;
use crate::gates::errors::GateError;
use crate::gates::types::{GateOutcome, GateRef};
use crate::gates::RuleStore;

/// A unit of authorization logic.
///
/// Returning an error aborts the chain and is reported as a server error;
/// it is never treated as a deny.
#[async_trait]
pub trait Gate: Send + Sync {
    async fn pass_through(&self, ctx: &mut GateContext) -> anyhow::Result<GateOutcome>;
}

/// Adapts a plain closure into a [`Gate`].
pub struct FnGate<F>(F);

impl<F> FnGate<F>
where
    F: Fn(&mut GateContext) -> anyhow::Result<GateOutcome> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Gate for FnGate<F>
where
    F: Fn(&mut GateContext) -> anyhow::Result<GateOutcome> + Send + Sync,
{
    async fn pass_through(&self, ctx: &mut GateContext) -> anyhow::Result<GateOutcome> {
        (self.0)(ctx)
    }
}

/// Turns a gate reference from the rules into something runnable.
pub trait CheckRegistry: Send + Sync {
    fn resolve(&self, gate: &GateRef) -> Option<Arc<dyn Gate>>;
}

/// Name-keyed gate registry.
#[derive(Clone, Default)]
pub struct GateManager {
    gates: HashMap<String, Arc<dyn Gate>>,
}

impl GateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gate` under `name`, replacing any gate already there.
    pub fn register(&mut self, name: impl Into<String>, gate: impl Gate + 'static) -> &mut Self {
        self.gates.insert(name.into(), Arc::new(gate));
        self
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut GateContext) -> anyhow::Result<GateOutcome> + Send + Sync + 'static,
    {
        self.register(name, FnGate::new(f))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Fails on the first gate (in rule order) the rules reference but
    /// nobody registered.
    pub fn validate(&self, store: &RuleStore) -> Result<(), GateError> {
        for (location, rule) in store.rules() {
            if let Some(gate) = rule.gate_refs().into_iter().find(|g| !self.contains(g.name())) {
                return Err(GateError::UnknownGate {
                    gate: gate.clone(),
                    referenced_by: location,
                });
            }
        }
        Ok(())
    }
}

impl CheckRegistry for GateManager {
    fn resolve(&self, gate: &GateRef) -> Option<Arc<dyn Gate>> {
        self.gates.get(gate.name()).cloned()
    }
}

impl std::fmt::Debug for GateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.gates.keys().collect();
        names.sort();
        f.debug_struct("GateManager").field("gates", &names).finish()
    }
}
