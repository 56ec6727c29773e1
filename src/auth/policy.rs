//! Role-scoped access policy.
//!
//! Every domain operation answers the same question here: may this actor
//! perform this action on this resource? The answer is computed from a
//! declarative rule table keyed by role and action, evaluated against a
//! [`ResourceScope`] the caller loads alongside the resource. Adding a role
//! or widening a rule is a table edit, not a change to call sites.
//!
//! The policy is fail-closed: an action is allowed only when at least one
//! rule for the actor's role matches the scope.

use crate::auth::jwt::Actor;
use crate::auth::models::Role;
use crate::domain::{OrganizationId, UserId};
use crate::errors::{Result, TaskplaneError};

/// The kind of operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// A single condition under which access is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// Unconditional access.
    Always,
    /// Actor and resource belong to the same organization. Never matches when
    /// either side has no organization.
    SameOrganization,
    /// Actor is a member of the team that owns the resource.
    TeamMembership,
    /// The resource is about the actor personally (their assignment, their
    /// own record).
    SelfScoped,
}

/// Everything the policy needs to know about a resource, loaded by the caller
/// before the check. A field left empty simply means the corresponding rule
/// cannot match.
#[derive(Debug, Clone, Default)]
pub struct ResourceScope {
    /// Organization that owns the resource.
    pub organization_id: Option<OrganizationId>,
    /// Members of the team that owns the resource.
    pub team_member_ids: Vec<UserId>,
    /// User the resource is assigned to, if any.
    pub assignee_id: Option<UserId>,
    /// User whose own record the resource is (profile, credentials), if the
    /// resource is about a user at all.
    pub subject_user_id: Option<UserId>,
}

/// Grant rules per role and action.
pub fn rules_for(role: Role, action: Action) -> &'static [ScopeRule] {
    match (role, action) {
        (Role::Admin, _) => &[ScopeRule::Always],
        (Role::Manager, _) => &[ScopeRule::SameOrganization],
        (Role::TeamLeader, _) => &[ScopeRule::TeamMembership],
        (Role::Member, Action::Read) => &[ScopeRule::SelfScoped, ScopeRule::TeamMembership],
        (Role::Member, Action::Write) => &[ScopeRule::SelfScoped],
    }
}

fn rule_matches(rule: ScopeRule, actor: &Actor, scope: &ResourceScope) -> bool {
    match rule {
        ScopeRule::Always => true,
        ScopeRule::SameOrganization => match (&actor.organization_id, &scope.organization_id) {
            (Some(actor_org), Some(resource_org)) => actor_org == resource_org,
            _ => false,
        },
        ScopeRule::TeamMembership => scope.team_member_ids.contains(&actor.user_id),
        ScopeRule::SelfScoped => {
            scope.assignee_id.as_ref() == Some(&actor.user_id)
                || scope.subject_user_id.as_ref() == Some(&actor.user_id)
        }
    }
}

/// Check whether the actor may perform `action` on a resource with the given
/// scope.
pub fn is_allowed(actor: &Actor, action: Action, scope: &ResourceScope) -> bool {
    rules_for(actor.role, action).iter().any(|rule| rule_matches(*rule, actor, scope))
}

/// Require access or return a 403 Forbidden error.
pub fn require_access(actor: &Actor, action: Action, scope: &ResourceScope) -> Result<()> {
    if is_allowed(actor, action, scope) {
        Ok(())
    } else {
        Err(TaskplaneError::forbidden("insufficient permissions for this resource"))
    }
}
