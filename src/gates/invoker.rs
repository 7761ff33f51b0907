use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::gates::context::GateContext;
use crate::gates::errors::{ErrorSink, GateError};
use crate::gates::registry::CheckRegistry;
use crate::gates::types::{Disposition, Dispatch, GateOutcome, GateRef};

/// Runs a single gate and turns what it produced into a [`Disposition`].
#[derive(Clone, Copy)]
pub struct CheckInvoker<'a> {
    registry: &'a dyn CheckRegistry,
    sink: &'a dyn ErrorSink,
}

impl<'a> CheckInvoker<'a> {
    pub fn new(registry: &'a dyn CheckRegistry, sink: &'a dyn ErrorSink) -> Self {
        Self { registry, sink }
    }

    pub async fn invoke(&self, ctx: &mut GateContext, gate_ref: &GateRef) -> Disposition {
        let dispatch = ctx.dispatch().clone();

        let Some(gate) = self.registry.resolve(gate_ref) else {
            return self.report(GateError::InvalidGateType {
                dispatch,
                gate: gate_ref.clone(),
            });
        };

        let outcome = match AssertUnwindSafe(gate.pass_through(ctx)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(source)) => {
                return self.report(GateError::CheckFailed {
                    dispatch,
                    gate: gate_ref.clone(),
                    source,
                })
            }
            Err(panic) => {
                return self.report(GateError::CheckPanicked {
                    dispatch,
                    gate: gate_ref.clone(),
                    message: panic_message(panic.as_ref()),
                })
            }
        };

        match interpret(&dispatch, outcome) {
            Ok(disposition) => disposition,
            Err(error) => self.report(error),
        }
    }

    fn report(&self, error: GateError) -> Disposition {
        self.sink.error(&error.to_string(), &error);
        Disposition::ErrorReported(error)
    }
}

/// Map a gate's outcome onto a disposition. Only an unexpected outcome is
/// an error.
pub fn interpret(dispatch: &Dispatch, outcome: GateOutcome) -> Result<Disposition, GateError> {
    match outcome {
        GateOutcome::Enriched | GateOutcome::Pass => Ok(Disposition::Continue),
        GateOutcome::Deny => Ok(Disposition::Forbidden),
        GateOutcome::Respond(response) => Ok(Disposition::Respond(response)),
        GateOutcome::Unexpected(found) => Err(GateError::InvalidGateResult {
            dispatch: dispatch.clone(),
            found,
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
