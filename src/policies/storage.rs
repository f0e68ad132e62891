use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::controls::find_control;
use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::{controls, policies, policy_controls};
use crate::core::shared::utils::DbConn;

use super::types::{CreatePolicyRequest, PolicyView, UpdatePolicyRequest};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = policies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbPolicy {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub template: String,
    pub content: String,
    pub visible: bool,
    pub created_at: NaiveDateTime,
}

fn require_name(name: &str) -> GrcResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GrcError::Validation("policy name is required".to_string()));
    }
    Ok(name)
}

pub fn find_policy(conn: &mut DbConn, policy_id: i32) -> GrcResult<DbPolicy> {
    policies::table
        .find(policy_id)
        .filter(policies::visible.eq(true))
        .select(DbPolicy::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("policy"))
}

pub fn list_policies(conn: &mut DbConn) -> GrcResult<Vec<DbPolicy>> {
    Ok(policies::table
        .filter(policies::visible.eq(true))
        .order(policies::id.asc())
        .select(DbPolicy::as_select())
        .load(conn)?)
}

/// Ids of the visible controls linked to a policy.
pub fn policy_control_ids(conn: &mut DbConn, policy_id: i32) -> GrcResult<Vec<i32>> {
    Ok(policy_controls::table
        .inner_join(controls::table)
        .filter(policy_controls::policy_id.eq(policy_id))
        .filter(controls::visible.eq(true))
        .order(controls::id.asc())
        .select(controls::id)
        .load(conn)?)
}

pub fn load_policy_view(conn: &mut DbConn, policy_id: i32) -> GrcResult<PolicyView> {
    let policy = find_policy(conn, policy_id)?;
    let controls = policy_control_ids(conn, policy.id)?;
    Ok(PolicyView { policy, controls })
}

pub fn create_policy(conn: &mut DbConn, req: &CreatePolicyRequest) -> GrcResult<DbPolicy> {
    let name = require_name(&req.name)?;
    Ok(diesel::insert_into(policies::table)
        .values((
            policies::name.eq(name),
            policies::description.eq(&req.description),
        ))
        .returning(DbPolicy::as_returning())
        .get_result(conn)?)
}

pub fn update_policy(
    conn: &mut DbConn,
    policy_id: i32,
    req: &UpdatePolicyRequest,
) -> GrcResult<DbPolicy> {
    let name = require_name(&req.name)?;
    diesel::update(policies::table.find(policy_id))
        .filter(policies::visible.eq(true))
        .set((
            policies::name.eq(name),
            policies::description.eq(&req.description),
            policies::template.eq(&req.template),
            policies::content.eq(&req.content),
        ))
        .returning(DbPolicy::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("policy"))
}

pub fn hide_policy(conn: &mut DbConn, policy_id: i32) -> GrcResult<()> {
    let updated = diesel::update(policies::table.find(policy_id))
        .filter(policies::visible.eq(true))
        .set(policies::visible.eq(false))
        .execute(conn)?;
    if updated == 0 {
        return Err(GrcError::not_found("policy"));
    }
    Ok(())
}

/// Linking an already linked control is a no-op.
pub fn add_policy_control(conn: &mut DbConn, policy_id: i32, control_id: i32) -> GrcResult<()> {
    find_policy(conn, policy_id)?;
    find_control(conn, control_id)?;
    diesel::insert_or_ignore_into(policy_controls::table)
        .values((
            policy_controls::policy_id.eq(policy_id),
            policy_controls::control_id.eq(control_id),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn remove_policy_control(conn: &mut DbConn, policy_id: i32, control_id: i32) -> GrcResult<()> {
    find_policy(conn, policy_id)?;
    diesel::delete(
        policy_controls::table
            .filter(policy_controls::policy_id.eq(policy_id))
            .filter(policy_controls::control_id.eq(control_id)),
    )
    .execute(conn)?;
    Ok(())
}
