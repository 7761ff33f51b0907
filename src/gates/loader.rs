use std::path::Path;

use crate::gates::compose::compose;
use crate::gates::errors::GateError;
use crate::gates::policy::parse_kdl_document;
use crate::gates::types::*;
use crate::gates::RuleStore;

/// Load all `.kdl` policy files from the given directory and compose them
/// into a single immutable `RuleStore`.
pub fn load_policies(dir: &Path) -> Result<RuleStore, GateError> {
    if !dir.is_dir() {
        return Err(GateError::InvalidPolicy(format!(
            "policies directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut all_parsed = Vec::new();
    let mut file_count = 0;

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| GateError::PolicyLoadError {
                path: path.display().to_string(),
                source,
            })?;
        let parsed = parse_kdl_document(&contents)?;
        all_parsed.push(parsed);
        file_count += 1;
    }

    let store = compile_policies(all_parsed);

    tracing::info!(
        files = file_count,
        controllers = store.controllers.len(),
        actions = store.action_count(),
        fallback = ?store.fallback,
        "Loaded gate policies"
    );

    Ok(store)
}

/// Compose every parsed controller with its base rules and merge the
/// results. Later policies replace earlier definitions of the same controller.
pub fn compile_policies(parsed: Vec<ParsedPolicy>) -> RuleStore {
    let mut store = RuleStore::new();

    for p in parsed {
        if let Some(fallback) = p.fallback {
            if store.fallback.is_some() {
                tracing::warn!("`controller \"*\"` defined more than once; the last definition wins");
            }
            store.fallback = Some(fallback);
        }
        for c in p.controllers {
            let (controller, table) = compose(&c.controller, &c.actions, c.base.as_ref());
            if store.controllers.insert(controller.clone(), table).is_some() {
                tracing::warn!(%controller, "controller defined more than once; the last definition wins");
            }
        }
    }

    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::resolver::applicable_gates;

    fn users_policy() -> ParsedPolicy {
        ParsedPolicy {
            fallback: Some(RuleValue::Deny),
            controllers: vec![ParsedController {
                controller: "users".into(),
                base: Some(RuleValue::gate("authenticated")),
                actions: RuleTable::from([
                    ("show".to_string(), RuleValue::gate("owner")),
                    ("*".to_string(), RuleValue::Deny),
                ]),
            }],
        }
    }

    #[test]
    fn test_compile_composes_base_rules() {
        let store = compile_policies(vec![users_policy()]);
        assert_eq!(store.fallback, Some(RuleValue::Deny));
        assert_eq!(
            applicable_gates("users", "show", &store),
            &RuleValue::chain(["authenticated", "owner"])
        );
        assert_eq!(
            applicable_gates("users", "edit", &store),
            &RuleValue::Chain(vec!["authenticated".into(), false.into()])
        );
    }

    #[test]
    fn test_later_policy_wins() {
        let override_policy = ParsedPolicy {
            fallback: Some(RuleValue::Allow),
            controllers: vec![ParsedController {
                controller: "users".into(),
                base: None,
                actions: RuleTable::from([("show".to_string(), RuleValue::Allow)]),
            }],
        };
        let store = compile_policies(vec![users_policy(), override_policy]);
        assert_eq!(store.fallback, Some(RuleValue::Allow));
        assert_eq!(applicable_gates("users", "show", &store), &RuleValue::Allow);
        // the replaced table had a `*`; the new one does not
        assert_eq!(applicable_gates("users", "edit", &store), &RuleValue::Allow);
    }

    #[test]
    fn test_merge_multiple_files() {
        let reports = ParsedPolicy {
            fallback: None,
            controllers: vec![ParsedController {
                controller: "reports".into(),
                base: None,
                actions: RuleTable::from([("*".to_string(), RuleValue::gate("admin"))]),
            }],
        };
        let store = compile_policies(vec![users_policy(), reports]);
        assert_eq!(store.controllers.len(), 2);
        assert_eq!(store.fallback, Some(RuleValue::Deny));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join("00_default.kdl"),
            r#"
controller "*" #false
"#,
        )
        .unwrap();

        std::fs::write(
            dir.path().join("users.kdl"),
            r#"
controller "users" {
    base "authenticated"
    action "show" "owner"
    action "edit" {
        - "owner"
        - "admin"
    }
}

controller "sessions" {
    action "*" #true
}
"#,
        )
        .unwrap();

        // Also write a non-KDL file that should be ignored
        std::fs::write(dir.path().join("README.md"), "not a policy").unwrap();

        let store = load_policies(dir.path()).unwrap();
        assert_eq!(store.controllers.len(), 2);
        assert_eq!(store.fallback, Some(RuleValue::Deny));
        assert_eq!(
            applicable_gates("users", "edit", &store),
            &RuleValue::chain(["authenticated", "owner", "admin"])
        );
        assert_eq!(applicable_gates("sessions", "create", &store), &RuleValue::Allow);
        assert_eq!(applicable_gates("orders", "list", &store), &RuleValue::Deny);
    }

    #[test]
    fn test_load_nonexistent_directory() {
        let err = load_policies(Path::new("/nonexistent/path")).unwrap_err();
        assert!(matches!(err, GateError::InvalidPolicy(_)));
    }

    #[test]
    fn test_load_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.kdl"), "controller \"users\" {").unwrap();
        let err = load_policies(dir.path()).unwrap_err();
        assert!(matches!(err, GateError::KdlParse(_)));
    }
}
