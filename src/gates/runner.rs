use crate::gates::context::GateContext;
use crate::gates::errors::ErrorSink;
use crate::gates::invoker::CheckInvoker;
use crate::gates::registry::CheckRegistry;
use crate::gates::types::{ChainLink, Disposition, RuleValue};

/// Walks a rule value against one request.
///
/// Gates run one at a time, in order, and the walk stops at the first
/// element that does not pass: no later gate is ever invoked.
#[derive(Clone, Copy)]
pub struct GateRunner<'a> {
    invoker: CheckInvoker<'a>,
}

impl<'a> GateRunner<'a> {
    pub fn new(registry: &'a dyn CheckRegistry, sink: &'a dyn ErrorSink) -> Self {
        Self {
            invoker: CheckInvoker::new(registry, sink),
        }
    }

    pub async fn run(&self, ctx: &mut GateContext, rule: &RuleValue) -> Disposition {
        match rule {
            // No rules or an explicit false. Refuse.
            RuleValue::Deny => Disposition::Forbidden,
            RuleValue::Allow => Disposition::Continue,
            RuleValue::Single(gate) => self.invoker.invoke(ctx, gate).await,
            RuleValue::Chain(links) => self.run_chain(ctx, links).await,
        }
    }

    async fn run_chain(&self, ctx: &mut GateContext, links: &[ChainLink]) -> Disposition {
        for link in links {
            match link {
                ChainLink::Literal(true) => continue,
                ChainLink::Literal(false) => return Disposition::Forbidden,
                ChainLink::Gate(gate) => {
                    let disposition = self.invoker.invoke(ctx, gate).await;
                    if !disposition.is_continue() {
                        tracing::debug!(
                            dispatch = %ctx.dispatch(),
                            gate = %gate,
                            "gate chain stopped"
                        );
                        return disposition;
                    }
                }
            }
        }
        Disposition::Continue
    }
}
