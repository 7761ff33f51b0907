use crate::gates::types::{RuleValue, WILDCARD};
use crate::gates::RuleStore;

static DENY: RuleValue = RuleValue::Deny;

/// Find the rules that apply to `action` on `controller`.
///
/// First match wins: the exact action, then the controller's `*` action,
/// then the global `*` controller, then a hard deny.
pub fn applicable_gates<'a>(controller: &str, action: &str, store: &'a RuleStore) -> &'a RuleValue {
    let fallback = store.fallback.as_ref().unwrap_or(&DENY);

    let Some(table) = store.controllers.get(controller) else {
        return fallback;
    };

    table
        .get(action)
        .or_else(|| table.get(WILDCARD))
        .unwrap_or(fallback)
}
