//! Access policy guards.
//!
//! - No IO
//! - No panics
//! - Authorization is checked after authentication, never instead of it:
//!   every guard answers `Unauthenticated` when no principal is in scope.

use std::collections::HashMap;

use rollcall_core::{AppError, AppResult, Role, UnauthenticatedReason};

use crate::Principal;

/// Require an authenticated principal.
pub fn require_principal(principal: Option<&Principal>) -> AppResult<&Principal> {
    principal.ok_or_else(|| {
        tracing::info!("no principal in request scope");
        AppError::unauthenticated(UnauthenticatedReason::NotAuthenticated)
    })
}

/// Pass iff the principal's role is one of `allowed`.
pub fn authorize_roles(principal: Option<&Principal>, allowed: &[Role]) -> AppResult<()> {
    let principal = require_principal(principal)?;

    if allowed.contains(&principal.role) {
        tracing::debug!(user_id = %principal.id, role = %principal.role, "role check passed");
        return Ok(());
    }

    let allowed = join_roles(allowed);
    tracing::warn!(
        user_id = %principal.id,
        role = %principal.role,
        allowed = %allowed,
        "access denied: role not permitted"
    );
    Err(AppError::forbidden(format!(
        "This action requires one of these roles: {allowed}. Your role: {}",
        principal.role
    )))
}

/// Self-service access: staff pass, everyone else only for their own id.
pub fn check_ownership(principal: Option<&Principal>, resource_id: Option<&str>) -> AppResult<()> {
    let principal = require_principal(principal)?;

    if principal.role.has_staff_access() {
        tracing::debug!(user_id = %principal.id, role = %principal.role, "staff access granted");
        return Ok(());
    }

    match resource_id {
        Some(id) if principal.owns(id) => {
            tracing::debug!(user_id = %principal.id, "ownership verified");
            Ok(())
        }
        other => {
            tracing::warn!(
                user_id = %principal.id,
                resource_id = other.unwrap_or("<none>"),
                "ownership check failed"
            );
            Err(AppError::forbidden("You can only access your own resources"))
        }
    }
}

pub fn require_student(principal: Option<&Principal>) -> AppResult<()> {
    require_exactly(principal, Role::Student, "This action is only for students")
}

pub fn require_teacher(principal: Option<&Principal>) -> AppResult<()> {
    require_exactly(principal, Role::Teacher, "This action is only for teachers")
}

fn require_exactly(principal: Option<&Principal>, role: Role, message: &str) -> AppResult<()> {
    let principal = require_principal(principal)?;
    if principal.role == role {
        Ok(())
    } else {
        tracing::warn!(user_id = %principal.id, role = %principal.role, required = %role, "access denied");
        Err(AppError::forbidden(message))
    }
}

fn join_roles(roles: &[Role]) -> String {
    roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
}

/// A guard as a value, so route wiring can attach policies declaratively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Role allow-list.
    Roles(Vec<Role>),
    /// Ownership of the resource named by a path parameter.
    Ownership { param: &'static str },
    StudentOnly,
    TeacherOnly,
}

impl Guard {
    pub fn roles(roles: &[Role]) -> Self {
        Self::Roles(roles.to_vec())
    }

    pub fn ownership(param: &'static str) -> Self {
        Self::Ownership { param }
    }

    /// Evaluate the guard against the principal and the matched path parameters.
    pub fn check(
        &self,
        principal: Option<&Principal>,
        params: &HashMap<String, String>,
    ) -> AppResult<()> {
        match self {
            Guard::Roles(allowed) => authorize_roles(principal, allowed),
            Guard::Ownership { param } => {
                check_ownership(principal, params.get(*param).map(String::as_str))
            }
            Guard::StudentOnly => require_student(principal),
            Guard::TeacherOnly => require_teacher(principal),
        }
    }
}
