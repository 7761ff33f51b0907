use crate::gates::errors::GateError;
use crate::gates::types::*;
use kdl::{KdlDocument, KdlNode, KdlValue};

/// Parse a KDL document string into per-controller gate rules.
pub fn parse_kdl_document(source: &str) -> Result<ParsedPolicy, GateError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| GateError::KdlParse(e.to_string()))?;

    let mut policy = ParsedPolicy::default();

    for node in doc.nodes() {
        match node.name().value() {
            "controller" => {
                let controller = first_string_arg(node).ok_or_else(|| {
                    GateError::InvalidPolicy(
                        "controller node requires a string argument (e.g. controller \"users\")"
                            .into(),
                    )
                })?;

                if controller == WILDCARD {
                    if node.children().is_some() {
                        return Err(GateError::InvalidPolicy(
                            "`controller \"*\"` takes a rule value (e.g. controller \"*\" #false), not an action table"
                                .into(),
                        ));
                    }
                    policy.fallback = Some(rule_value(node, 1, WILDCARD)?);
                    continue;
                }

                let mut base = None;
                let mut actions = RuleTable::new();

                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "base" => {
                                base = Some(rule_value(child, 0, &format!("{controller} base"))?);
                            }
                            "action" => {
                                let action = first_string_arg(child).ok_or_else(|| {
                                    GateError::InvalidPolicy(format!(
                                        "action in controller `{controller}` requires a name (e.g. action \"show\" \"owner\")"
                                    ))
                                })?;
                                let rule = rule_value(child, 1, &format!("{controller}.{action}"))?;
                                actions.insert(action, rule);
                            }
                            other => {
                                return Err(GateError::InvalidPolicy(format!(
                                    "unexpected child `{other}` in controller `{controller}` (expected `base` or `action`)"
                                )));
                            }
                        }
                    }
                }

                policy.controllers.push(ParsedController {
                    controller,
                    base,
                    actions,
                });
            }
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(policy)
}

/// Read the rule carried by `node`: its positional arguments after the first
/// `skip`, followed by any dash-list children.
///
/// A single argument is a plain rule (`#true`, `#false` or one gate);
/// several arguments or a dash list make a chain.
fn rule_value(node: &KdlNode, skip: usize, target: &str) -> Result<RuleValue, GateError> {
    let mut links = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .skip(skip)
        .map(|e| chain_link(e.value(), target))
        .collect::<Result<Vec<_>, _>>()?;

    let mut listed = false;
    if let Some(children) = node.children() {
        for item in children.nodes() {
            if item.name().value() != "-" {
                return Err(GateError::InvalidPolicy(format!(
                    "unexpected child `{}` in rule for `{target}` (expected `- <gate>` items)",
                    item.name().value()
                )));
            }
            for entry in item.entries().iter().filter(|e| e.name().is_none()) {
                links.push(chain_link(entry.value(), target)?);
            }
            listed = true;
        }
    }

    if links.is_empty() {
        return Err(GateError::InvalidPolicy(format!(
            "rule for `{target}` has no value (use #true, #false or a gate name)"
        )));
    }

    if listed || links.len() > 1 {
        return Ok(RuleValue::Chain(links));
    }

    Ok(match links.remove(0) {
        ChainLink::Literal(b) => b.into(),
        ChainLink::Gate(gate) => RuleValue::Single(gate),
    })
}

fn chain_link(value: &KdlValue, target: &str) -> Result<ChainLink, GateError> {
    if let Some(b) = value.as_bool() {
        return Ok(ChainLink::Literal(b));
    }
    match value.as_string() {
        Some(name) if !name.is_empty() => Ok(ChainLink::Gate(GateRef::new(name))),
        _ => Err(GateError::InvalidRule {
            target: target.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}
