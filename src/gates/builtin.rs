//! Gates shipped with the server, registered under the names the bundled
//! policies use.

use async_trait::async_trait;
use axum::response::{IntoResponse, Redirect};

use crate::gates::context::GateContext;
use crate::gates::registry::{Gate, GateManager};
use crate::gates::types::GateOutcome;

/// Key under which `authenticated` stores the bearer token.
pub const PRINCIPAL: &str = "principal";

/// Requires a bearer token and records it as the principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

#[async_trait]
impl Gate for Authenticated {
    async fn pass_through(&self, ctx: &mut GateContext) -> anyhow::Result<GateOutcome> {
        let Some(token) = ctx.bearer_token().map(str::to_string) else {
            return Ok(GateOutcome::Deny);
        };
        ctx.state_mut().insert(PRINCIPAL, token);
        Ok(GateOutcome::Enriched)
    }
}

/// Sends anonymous requests to the login page instead of refusing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginRedirect;

#[async_trait]
impl Gate for LoginRedirect {
    async fn pass_through(&self, ctx: &mut GateContext) -> anyhow::Result<GateOutcome> {
        if ctx.bearer_token().is_some() {
            return Ok(GateOutcome::Pass);
        }
        Ok(GateOutcome::Respond(Redirect::to("/login").into_response()))
    }
}

/// Lets through the principal matching the configured admin token.
/// Must run after `authenticated`.
#[derive(Debug, Clone, Default)]
pub struct Admin {
    pub token: Option<String>,
}

#[async_trait]
impl Gate for Admin {
    async fn pass_through(&self, ctx: &mut GateContext) -> anyhow::Result<GateOutcome> {
        let principal = principal(ctx, "admin")?;
        Ok(is_admin(self.token.as_deref(), principal).into())
    }
}

/// Lets through the principal named by the `{id}` path segment, and admins.
/// Must run after `authenticated`.
#[derive(Debug, Clone, Default)]
pub struct Owner {
    pub admin_token: Option<String>,
}

#[async_trait]
impl Gate for Owner {
    async fn pass_through(&self, ctx: &mut GateContext) -> anyhow::Result<GateOutcome> {
        let principal = principal(ctx, "owner")?;
        let owns = ctx.param("id") == Some(principal);
        Ok((owns || is_admin(self.admin_token.as_deref(), principal)).into())
    }
}

fn principal<'a>(ctx: &'a GateContext, gate: &str) -> anyhow::Result<&'a str> {
    ctx.state().get_str(PRINCIPAL).ok_or_else(|| {
        anyhow::anyhow!("`{gate}` gate ran without a principal; put `authenticated` before it")
    })
}

fn is_admin(token: Option<&str>, principal: &str) -> bool {
    token.is_some_and(|t| t == principal)
}

/// Register the built-in gates: `authenticated`, `login_redirect`, `admin`
/// and `owner`.
pub fn register_builtin(manager: &mut GateManager, admin_token: Option<String>) {
    manager
        .register("authenticated", Authenticated)
        .register("login_redirect", LoginRedirect)
        .register(
            "admin",
            Admin {
                token: admin_token.clone(),
            },
        )
        .register("owner", Owner { admin_token });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::types::Dispatch;
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

    fn ctx_with_token(token: Option<&'static str>) -> GateContext {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            );
        }
        GateContext::new(Dispatch::new("users", "show")).with_headers(headers)
    }

    #[tokio::test]
    async fn test_authenticated() {
        let mut anon = ctx_with_token(None);
        assert!(matches!(
            Authenticated.pass_through(&mut anon).await.unwrap(),
            GateOutcome::Deny
        ));

        let mut alice = ctx_with_token(Some("alice"));
        assert!(matches!(
            Authenticated.pass_through(&mut alice).await.unwrap(),
            GateOutcome::Enriched
        ));
        assert_eq!(alice.state().get_str(PRINCIPAL), Some("alice"));
    }

    #[tokio::test]
    async fn test_login_redirect() {
        let mut anon = ctx_with_token(None);
        match LoginRedirect.pass_through(&mut anon).await.unwrap() {
            GateOutcome::Respond(response) => {
                assert_eq!(response.status(), StatusCode::SEE_OTHER);
                assert_eq!(response.headers()[header::LOCATION], "/login");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_owner_and_admin() {
        let owner = Owner {
            admin_token: Some("root".into()),
        };

        let mut ctx = ctx_with_token(Some("alice")).with_param("id", "alice");
        Authenticated.pass_through(&mut ctx).await.unwrap();
        assert!(matches!(owner.pass_through(&mut ctx).await.unwrap(), GateOutcome::Pass));

        let mut ctx = ctx_with_token(Some("bob")).with_param("id", "alice");
        Authenticated.pass_through(&mut ctx).await.unwrap();
        assert!(matches!(owner.pass_through(&mut ctx).await.unwrap(), GateOutcome::Deny));

        let mut ctx = ctx_with_token(Some("root")).with_param("id", "alice");
        Authenticated.pass_through(&mut ctx).await.unwrap();
        assert!(matches!(owner.pass_through(&mut ctx).await.unwrap(), GateOutcome::Pass));

        let admin = Admin { token: None };
        assert!(matches!(admin.pass_through(&mut ctx).await.unwrap(), GateOutcome::Deny));
    }

    #[tokio::test]
    async fn test_requires_principal() {
        let mut ctx = ctx_with_token(Some("alice"));
        let err = Admin::default().pass_through(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("authenticated"));
    }

    #[test]
    fn test_register_builtin() {
        let mut manager = GateManager::new();
        register_builtin(&mut manager, None);
        for name in ["authenticated", "login_redirect", "admin", "owner"] {
            assert!(manager.contains(name), "missing {name}");
        }
    }
}
