use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gatehouse::gates::context::GateContext;
use gatehouse::gates::registry::{Gate, GateManager};
use gatehouse::gates::types::GateOutcome;

/// Gate that counts its invocations and then returns a fixed outcome.
#[derive(Clone)]
pub struct CountingGate {
    calls: Arc<AtomicUsize>,
    outcome: fn() -> anyhow::Result<GateOutcome>,
}

impl CountingGate {
    pub fn new(outcome: fn() -> anyhow::Result<GateOutcome>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Gate for CountingGate {
    async fn pass_through(&self, _ctx: &mut GateContext) -> anyhow::Result<GateOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }
}

/// Builder for gate registries used by the HTTP tests
pub struct GateManagerBuilder {
    manager: GateManager,
}

impl GateManagerBuilder {
    pub fn new() -> Self {
        Self {
            manager: GateManager::new(),
        }
    }

    pub fn with_builtin(mut self, admin_token: Option<&str>) -> Self {
        gatehouse::gates::builtin::register_builtin(
            &mut self.manager,
            admin_token.map(str::to_string),
        );
        self
    }

    pub fn with_gate(mut self, name: &str, gate: impl Gate + 'static) -> Self {
        self.manager.register(name, gate);
        self
    }

    pub fn build(self) -> GateManager {
        self.manager
    }
}

impl Default for GateManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
