use crate::gates::types::{RuleTable, RuleValue};

/// Pair a controller with its action rules, with `base_rules` (if any)
/// composed in front of every action. The result goes straight into
/// [`RuleStore::with_controller`](crate::gates::RuleStore::with_controller).
pub fn compose(
    controller: impl Into<String>,
    rules: &RuleTable,
    base_rules: Option<&RuleValue>,
) -> (String, RuleTable) {
    (controller.into(), compose_with_base_rules(rules, base_rules))
}

/// Returns a new table in which every action's rule is the chain
/// `base_rules ++ rule`. Both sides are flattened, so lists never nest.
///
/// A `false` base counts as no base rules: the action rules are returned
/// unchanged.
pub fn compose_with_base_rules(rules: &RuleTable, base_rules: Option<&RuleValue>) -> RuleTable {
    let base = match base_rules {
        None | Some(RuleValue::Deny) => return rules.clone(),
        Some(base) => base,
    };

    let base_links = base.links();
    rules
        .iter()
        .map(|(action, rule)| {
            let mut links = base_links.clone();
            links.extend(rule.links());
            (action.clone(), RuleValue::Chain(links))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::types::ChainLink;

    #[test]
    fn test_compose_without_base_keeps_rules() {
        let rules = RuleTable::from([
            ("show".to_string(), RuleValue::gate("b")),
            ("*".to_string(), RuleValue::Deny),
        ]);
        let (controller, table) = compose("users", &rules, None);
        assert_eq!(controller, "users");
        assert_eq!(table, rules);
    }

    #[test]
    fn test_compose_prefixes_base_rules() {
        let rules = RuleTable::from([("show".to_string(), RuleValue::gate("check_b"))]);
        let base = RuleValue::chain(["check_a"]);
        let (_, table) = compose("users", &rules, Some(&base));
        assert_eq!(table["show"], RuleValue::chain(["check_a", "check_b"]));
    }

    #[test]
    fn test_compose_flattens_lists() {
        let rules = RuleTable::from([(
            "edit".to_string(),
            RuleValue::Chain(vec![true.into(), "owner".into()]),
        )]);
        let base = RuleValue::chain(["authenticated", "active"]);
        let table = compose_with_base_rules(&rules, Some(&base));
        assert_eq!(
            table["edit"],
            RuleValue::Chain(vec![
                "authenticated".into(),
                "active".into(),
                ChainLink::Literal(true),
                "owner".into(),
            ])
        );
    }

    #[test]
    fn test_compose_boolean_rules() {
        let rules = RuleTable::from([
            ("index".to_string(), RuleValue::Allow),
            ("destroy".to_string(), RuleValue::Deny),
        ]);
        let table = compose_with_base_rules(&rules, Some(&RuleValue::gate("authenticated")));
        assert_eq!(
            table["index"],
            RuleValue::Chain(vec!["authenticated".into(), true.into()])
        );
        assert_eq!(
            table["destroy"],
            RuleValue::Chain(vec!["authenticated".into(), false.into()])
        );
    }

    #[test]
    fn test_compose_false_base_is_no_base() {
        let rules = RuleTable::from([
            ("show".to_string(), RuleValue::gate("owner")),
            ("index".to_string(), RuleValue::Allow),
        ]);
        let table = compose_with_base_rules(&rules, Some(&RuleValue::Deny));
        assert_eq!(table, rules);

        // a true base still composes
        let table = compose_with_base_rules(&rules, Some(&RuleValue::Allow));
        assert_eq!(table["show"], RuleValue::Chain(vec![true.into(), "owner".into()]));
    }

    #[test]
    fn test_compose_does_not_touch_input() {
        let rules = RuleTable::from([("show".to_string(), RuleValue::gate("b"))]);
        let before = rules.clone();
        let _ = compose_with_base_rules(&rules, Some(&RuleValue::gate("a")));
        assert_eq!(rules, before);
    }
}
