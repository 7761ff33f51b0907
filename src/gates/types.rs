use axum::response::Response;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

use crate::gates::errors::GateError;

/// Reserved key matching any controller or any action not configured explicitly.
pub const WILDCARD: &str = "*";

/// Name of a gate registered with a [`CheckRegistry`](crate::gates::registry::CheckRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GateRef(String);

impl GateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GateRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GateRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One element of a gate chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChainLink {
    Literal(bool),
    Gate(GateRef),
}

impl From<bool> for ChainLink {
    fn from(value: bool) -> Self {
        ChainLink::Literal(value)
    }
}

impl From<&str> for ChainLink {
    fn from(value: &str) -> Self {
        ChainLink::Gate(GateRef::new(value))
    }
}

impl From<GateRef> for ChainLink {
    fn from(value: GateRef) -> Self {
        ChainLink::Gate(value)
    }
}

/// The rules attached to a controller/action pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Deny,
    Allow,
    Single(GateRef),
    Chain(Vec<ChainLink>),
}

impl RuleValue {
    pub fn gate(name: impl Into<String>) -> Self {
        RuleValue::Single(GateRef::new(name))
    }

    pub fn chain<I, L>(links: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<ChainLink>,
    {
        RuleValue::Chain(links.into_iter().map(Into::into).collect())
    }

    /// The rule as a flat list of chain links. A chain is returned as-is, so
    /// concatenating two flattened rules never nests.
    pub fn links(&self) -> Vec<ChainLink> {
        match self {
            RuleValue::Deny => vec![ChainLink::Literal(false)],
            RuleValue::Allow => vec![ChainLink::Literal(true)],
            RuleValue::Single(gate) => vec![ChainLink::Gate(gate.clone())],
            RuleValue::Chain(links) => links.clone(),
        }
    }

    /// Every gate this rule would invoke, in chain order.
    pub fn gate_refs(&self) -> Vec<&GateRef> {
        match self {
            RuleValue::Deny | RuleValue::Allow => Vec::new(),
            RuleValue::Single(gate) => vec![gate],
            RuleValue::Chain(links) => links
                .iter()
                .filter_map(|link| match link {
                    ChainLink::Gate(gate) => Some(gate),
                    ChainLink::Literal(_) => None,
                })
                .collect(),
        }
    }
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        if value {
            RuleValue::Allow
        } else {
            RuleValue::Deny
        }
    }
}

/// Serialized the way the rules are written: `false`, `true`, `"gate"` or a list.
impl Serialize for RuleValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleValue::Deny => serializer.serialize_bool(false),
            RuleValue::Allow => serializer.serialize_bool(true),
            RuleValue::Single(gate) => gate.serialize(serializer),
            RuleValue::Chain(links) => {
                let mut seq = serializer.serialize_seq(Some(links.len()))?;
                for link in links {
                    seq.serialize_element(link)?;
                }
                seq.end()
            }
        }
    }
}

/// action name (or `*`) -> rules, scoped to one controller
pub type RuleTable = HashMap<String, RuleValue>;

/// The controller and action the host resolved for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dispatch {
    pub controller: String,
    pub action: String,
}

impl Dispatch {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl std::fmt::Display for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.controller, self.action)
    }
}

/// What a single gate produced.
#[derive(Debug)]
pub enum GateOutcome {
    /// The gate only had a side effect (e.g. it enriched the context).
    Enriched,
    Pass,
    Deny,
    /// The gate decided the response itself.
    Respond(Response),
    /// Anything else; carries a description of what was produced.
    Unexpected(String),
}

impl From<bool> for GateOutcome {
    fn from(value: bool) -> Self {
        if value {
            GateOutcome::Pass
        } else {
            GateOutcome::Deny
        }
    }
}

impl From<()> for GateOutcome {
    fn from(_: ()) -> Self {
        GateOutcome::Enriched
    }
}

impl From<Response> for GateOutcome {
    fn from(value: Response) -> Self {
        GateOutcome::Respond(value)
    }
}

/// Dynamic results: `null` is a side-effect-only pass, booleans decide,
/// every other JSON value is unexpected.
impl From<Value> for GateOutcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => GateOutcome::Enriched,
            Value::Bool(b) => b.into(),
            Value::Number(n) => GateOutcome::Unexpected(format!("number ({n})")),
            Value::String(_) => GateOutcome::Unexpected("string".to_string()),
            Value::Array(_) => GateOutcome::Unexpected("array".to_string()),
            Value::Object(_) => GateOutcome::Unexpected("object".to_string()),
        }
    }
}

/// Result of running the rules for one request.
#[derive(Debug)]
pub enum Disposition {
    Continue,
    Forbidden,
    Respond(Response),
    ErrorReported(GateError),
}

impl Disposition {
    pub fn is_continue(&self) -> bool {
        matches!(self, Disposition::Continue)
    }
}

/// One `controller` node from a policy file, before composition.
#[derive(Debug, Clone, Default)]
pub struct ParsedController {
    pub controller: String,
    pub base: Option<RuleValue>,
    pub actions: RuleTable,
}

/// Intermediate result from parsing a single KDL file.
#[derive(Debug, Clone, Default)]
pub struct ParsedPolicy {
    /// Rules of `controller "*"`, if the file defines them
    pub fallback: Option<RuleValue>,
    pub controllers: Vec<ParsedController>,
}
