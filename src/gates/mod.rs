pub mod builtin;
pub mod compose;
pub mod context;
pub mod errors;
pub mod invoker;
pub mod loader;
pub mod middleware;
pub mod policy;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod types;
pub mod web;

use std::collections::HashMap;
use types::{RuleTable, RuleValue, WILDCARD};

/// Composed gate rules, loaded from KDL policy files.
/// Immutable after construction; configuration changes require a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleStore {
    /// controller -> action rules (base rules already composed in)
    pub controllers: HashMap<String, RuleTable>,
    /// Rules of the `*` controller, used when nothing more specific matches
    pub fallback: Option<RuleValue>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, rule: impl Into<RuleValue>) -> Self {
        self.fallback = Some(rule.into());
        self
    }

    /// Adds the output of [`compose::compose`].
    pub fn with_controller(mut self, (controller, table): (String, RuleTable)) -> Self {
        self.controllers.insert(controller, table);
        self
    }

    pub fn action_count(&self) -> usize {
        self.controllers.values().map(|t| t.len()).sum()
    }

    /// Every rule paired with where it lives ("controller.action", or `*`
    /// for the fallback), sorted by location.
    pub fn rules(&self) -> Vec<(String, &RuleValue)> {
        let mut rules: Vec<(String, &RuleValue)> = self
            .controllers
            .iter()
            .flat_map(|(controller, table)| {
                table
                    .iter()
                    .map(move |(action, rule)| (format!("{controller}.{action}"), rule))
            })
            .collect();
        if let Some(fallback) = &self.fallback {
            rules.push((WILDCARD.to_string(), fallback));
        }
        rules.sort_by(|a, b| a.0.cmp(&b.0));
        rules
    }
}
