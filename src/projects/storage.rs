use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::controls::find_control;
use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::{
    controls, evidence, project_controls, project_policies, project_policy_controls,
    project_subcontrols, projects, subcontrol_evidence, subcontrols,
};
use crate::core::shared::utils::DbConn;
use crate::evidence::DbEvidence;
use crate::frameworks::find_framework;
use crate::policies::find_policy;

use super::completion::{count_completion, ControlStatus, SubControlStatus};
use super::types::{
    CreateProjectRequest, ProjectControlView, ProjectPolicyView, ProjectSubControlView,
    ProjectSummary, ProjectView, UpdateProjectPolicyRequest, UpdateProjectSubControlRequest,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbProject {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub owner_id: Option<i32>,
    pub framework_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = project_policies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbProjectPolicy {
    pub id: i32,
    pub project_id: i32,
    pub policy_id: Option<i32>,
    pub name: String,
    pub description: String,
    pub template: String,
    pub content: String,
    pub public_viewable: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = project_controls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbProjectControl {
    pub id: i32,
    pub project_id: i32,
    pub control_id: i32,
    pub is_applicable: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = project_subcontrols)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbProjectSubControl {
    pub id: i32,
    pub project_id: i32,
    pub project_control_id: i32,
    pub subcontrol_id: i32,
    pub is_applicable: bool,
    pub implemented: i32,
    pub notes: Option<String>,
    pub auditor_feedback: Option<String>,
    pub created_at: NaiveDateTime,
}

// ============================================================================
// Projects
// ============================================================================

pub fn find_project(conn: &mut DbConn, project_id: i32) -> GrcResult<DbProject> {
    projects::table
        .find(project_id)
        .select(DbProject::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("project"))
}

/// Newest first.
pub fn list_recent_projects(conn: &mut DbConn, limit: i64) -> GrcResult<Vec<DbProject>> {
    Ok(projects::table
        .order(projects::id.desc())
        .limit(limit)
        .select(DbProject::as_select())
        .load(conn)?)
}

pub fn load_project_view(conn: &mut DbConn, project_id: i32) -> GrcResult<ProjectView> {
    let project = find_project(conn, project_id)?;
    let summary = project_summary(conn, project.id)?;
    Ok(ProjectView { project, summary })
}

/// Create a project, optionally importing every visible control of its
/// framework and copying in the listed policies. All or nothing.
pub fn create_project(
    conn: &mut DbConn,
    req: &CreateProjectRequest,
    owner_id: Option<i32>,
) -> GrcResult<i32> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(GrcError::Validation("project name is required".to_string()));
    }

    conn.transaction(|conn| {
        if let Some(framework_id) = req.framework_id {
            find_framework(conn, framework_id)?;
        }

        let project_id: i32 = diesel::insert_into(projects::table)
            .values((
                projects::name.eq(name),
                projects::description.eq(&req.description),
                projects::owner_id.eq(owner_id),
                projects::framework_id.eq(req.framework_id),
            ))
            .returning(projects::id)
            .get_result(conn)?;

        if let (Some(framework_id), true) = (req.framework_id, req.import_controls) {
            let control_ids: Vec<i32> = controls::table
                .filter(controls::framework_id.eq(framework_id))
                .filter(controls::visible.eq(true))
                .order(controls::id.asc())
                .select(controls::id)
                .load(conn)?;
            debug!(
                "Importing {} controls from framework {} into project {}",
                control_ids.len(),
                framework_id,
                project_id
            );
            for control_id in control_ids {
                add_control_to_project(conn, project_id, control_id)?;
            }
        }

        for &policy_id in &req.policies {
            add_policy_to_project(conn, project_id, policy_id)?;
        }

        Ok(project_id)
    })
}

/// Completion counters over the project's visible controls.
pub fn project_summary(conn: &mut DbConn, project_id: i32) -> GrcResult<ProjectSummary> {
    let tracked = visible_project_controls(conn, project_id)?;
    let control_ids: Vec<i32> = tracked.iter().map(|c| c.id).collect();

    let subcontrol_rows: Vec<(i32, i32, bool, i32)> = project_subcontrols::table
        .filter(project_subcontrols::project_control_id.eq_any(control_ids))
        .select((
            project_subcontrols::id,
            project_subcontrols::project_control_id,
            project_subcontrols::is_applicable,
            project_subcontrols::implemented,
        ))
        .load(conn)?;

    let subcontrol_ids: Vec<i32> = subcontrol_rows.iter().map(|row| row.0).collect();
    let evidence_counts: HashMap<i32, i64> = subcontrol_evidence::table
        .filter(subcontrol_evidence::project_subcontrol_id.eq_any(subcontrol_ids))
        .group_by(subcontrol_evidence::project_subcontrol_id)
        .select((subcontrol_evidence::project_subcontrol_id, count_star()))
        .load::<(i32, i64)>(conn)?
        .into_iter()
        .collect();

    let mut by_control: HashMap<i32, Vec<SubControlStatus>> = HashMap::new();
    for (id, control_id, is_applicable, implemented) in subcontrol_rows {
        by_control.entry(control_id).or_default().push(SubControlStatus {
            is_applicable,
            implemented,
            evidence_count: evidence_counts
                .get(&id)
                .map_or(0, |&n| usize::try_from(n).unwrap_or(usize::MAX)),
        });
    }

    let statuses: Vec<ControlStatus> = tracked
        .iter()
        .map(|c| ControlStatus {
            is_applicable: c.is_applicable,
            subcontrols: by_control.remove(&c.id).unwrap_or_default(),
        })
        .collect();

    let policies: i64 = project_policies::table
        .filter(project_policies::project_id.eq(project_id))
        .count()
        .get_result(conn)?;

    Ok(ProjectSummary {
        controls: tracked.len() as i64,
        policies,
        completion: count_completion(&statuses),
    })
}

// ============================================================================
// Project controls
// ============================================================================

fn visible_project_controls(conn: &mut DbConn, project_id: i32) -> GrcResult<Vec<DbProjectControl>> {
    Ok(project_controls::table
        .inner_join(controls::table)
        .filter(project_controls::project_id.eq(project_id))
        .filter(controls::visible.eq(true))
        .order(project_controls::id.asc())
        .select(DbProjectControl::as_select())
        .load(conn)?)
}

fn evidence_by_subcontrol(
    conn: &mut DbConn,
    project_subcontrol_ids: Vec<i32>,
) -> GrcResult<HashMap<i32, Vec<DbEvidence>>> {
    let rows: Vec<(i32, DbEvidence)> = subcontrol_evidence::table
        .inner_join(evidence::table)
        .filter(subcontrol_evidence::project_subcontrol_id.eq_any(project_subcontrol_ids))
        .order(evidence::id.asc())
        .select((subcontrol_evidence::project_subcontrol_id, DbEvidence::as_select()))
        .load(conn)?;

    let mut grouped: HashMap<i32, Vec<DbEvidence>> = HashMap::new();
    for (subcontrol_id, item) in rows {
        grouped.entry(subcontrol_id).or_default().push(item);
    }
    Ok(grouped)
}

fn load_subcontrol_views(
    conn: &mut DbConn,
    project_control_ids: Vec<i32>,
    include_evidence: bool,
) -> GrcResult<Vec<ProjectSubControlView>> {
    let rows: Vec<(DbProjectSubControl, String, String)> = project_subcontrols::table
        .inner_join(subcontrols::table)
        .filter(project_subcontrols::project_control_id.eq_any(project_control_ids))
        .order((
            project_subcontrols::project_control_id.asc(),
            project_subcontrols::id.asc(),
        ))
        .select((
            DbProjectSubControl::as_select(),
            subcontrols::name,
            subcontrols::ref_code,
        ))
        .load(conn)?;

    let mut evidence = if include_evidence {
        evidence_by_subcontrol(conn, rows.iter().map(|row| row.0.id).collect())?
    } else {
        HashMap::new()
    };

    Ok(rows
        .into_iter()
        .map(|(subcontrol, name, ref_code)| {
            let linked = include_evidence
                .then(|| evidence.remove(&subcontrol.id).unwrap_or_default());
            ProjectSubControlView {
                subcontrol,
                name,
                ref_code,
                evidence: linked,
            }
        })
        .collect())
}

/// Every project subcontrol whose control is still visible.
pub fn list_all_project_subcontrols(conn: &mut DbConn) -> GrcResult<Vec<ProjectSubControlView>> {
    let control_ids: Vec<i32> = project_controls::table
        .inner_join(controls::table)
        .filter(controls::visible.eq(true))
        .select(project_controls::id)
        .load(conn)?;
    load_subcontrol_views(conn, control_ids, false)
}

/// Subcontrols of every control in the project, with their evidence.
pub fn project_subcontrols_with_evidence(
    conn: &mut DbConn,
    project_id: i32,
) -> GrcResult<Vec<ProjectSubControlView>> {
    find_project(conn, project_id)?;
    let control_ids = visible_project_controls(conn, project_id)?
        .into_iter()
        .map(|c| c.id)
        .collect();
    load_subcontrol_views(conn, control_ids, true)
}

pub fn find_project_control(conn: &mut DbConn, project_control_id: i32) -> GrcResult<DbProjectControl> {
    project_controls::table
        .find(project_control_id)
        .select(DbProjectControl::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("control"))
}

pub fn load_project_control_view(
    conn: &mut DbConn,
    project_id: i32,
    project_control_id: i32,
) -> GrcResult<ProjectControlView> {
    let (project_control, name, control_ref, description) = project_controls::table
        .inner_join(controls::table)
        .filter(project_controls::id.eq(project_control_id))
        .filter(project_controls::project_id.eq(project_id))
        .filter(controls::visible.eq(true))
        .select((
            DbProjectControl::as_select(),
            controls::name,
            controls::control_ref,
            controls::description,
        ))
        .first::<(DbProjectControl, String, String, String)>(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("control"))?;

    let subcontrols = load_subcontrol_views(conn, vec![project_control.id], true)?;
    Ok(ProjectControlView {
        project_control,
        name,
        control_ref,
        description,
        subcontrols,
    })
}

/// Adds the control and one project subcontrol per catalogue subcontrol.
/// Returns the existing project control when the control is already there.
pub fn add_control_to_project(conn: &mut DbConn, project_id: i32, control_id: i32) -> GrcResult<i32> {
    conn.transaction(|conn| {
        find_project(conn, project_id)?;
        let control = find_control(conn, control_id)?;

        let existing: Option<i32> = project_controls::table
            .filter(project_controls::project_id.eq(project_id))
            .filter(project_controls::control_id.eq(control.id))
            .select(project_controls::id)
            .first(conn)
            .optional()?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let project_control_id: i32 = diesel::insert_into(project_controls::table)
            .values((
                project_controls::project_id.eq(project_id),
                project_controls::control_id.eq(control.id),
            ))
            .returning(project_controls::id)
            .get_result(conn)?;

        let subcontrol_ids: Vec<i32> = subcontrols::table
            .filter(subcontrols::control_id.eq(control.id))
            .order(subcontrols::id.asc())
            .select(subcontrols::id)
            .load(conn)?;
        let rows: Vec<_> = subcontrol_ids
            .into_iter()
            .map(|subcontrol_id| {
                (
                    project_subcontrols::project_id.eq(project_id),
                    project_subcontrols::project_control_id.eq(project_control_id),
                    project_subcontrols::subcontrol_id.eq(subcontrol_id),
                )
            })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(project_subcontrols::table)
                .values(&rows)
                .execute(conn)?;
        }

        Ok(project_control_id)
    })
}

pub fn remove_project_control(
    conn: &mut DbConn,
    project_id: i32,
    project_control_id: i32,
) -> GrcResult<()> {
    let deleted = diesel::delete(
        project_controls::table
            .filter(project_controls::id.eq(project_control_id))
            .filter(project_controls::project_id.eq(project_id)),
    )
    .execute(conn)?;
    if deleted == 0 {
        return Err(GrcError::not_found("control"));
    }
    Ok(())
}

/// Applies to the control and every one of its subcontrols.
pub fn set_control_applicability(
    conn: &mut DbConn,
    project_control_id: i32,
    applicable: bool,
) -> GrcResult<()> {
    conn.transaction(|conn| {
        let updated = diesel::update(project_controls::table.find(project_control_id))
            .set(project_controls::is_applicable.eq(applicable))
            .execute(conn)?;
        if updated == 0 {
            return Err(GrcError::not_found("control"));
        }
        diesel::update(
            project_subcontrols::table
                .filter(project_subcontrols::project_control_id.eq(project_control_id)),
        )
        .set(project_subcontrols::is_applicable.eq(applicable))
        .execute(conn)?;
        Ok(())
    })
}

pub fn update_project_subcontrol(
    conn: &mut DbConn,
    project_control_id: i32,
    project_subcontrol_id: i32,
    req: &UpdateProjectSubControlRequest,
) -> GrcResult<()> {
    if !(0..=100).contains(&req.implemented) {
        return Err(GrcError::Validation(format!(
            "implemented must be between 0 and 100, got {}",
            req.implemented
        )));
    }
    let evidence_ids: BTreeSet<i32> = req.evidence.iter().copied().collect();

    conn.transaction(|conn| {
        let updated = diesel::update(
            project_subcontrols::table
                .filter(project_subcontrols::id.eq(project_subcontrol_id))
                .filter(project_subcontrols::project_control_id.eq(project_control_id)),
        )
        .set((
            project_subcontrols::is_applicable.eq(req.applicable),
            project_subcontrols::implemented.eq(req.implemented),
            project_subcontrols::notes.eq(req.notes.as_deref()),
            project_subcontrols::auditor_feedback.eq(req.feedback.as_deref()),
        ))
        .execute(conn)?;
        if updated == 0 {
            return Err(GrcError::not_found("subcontrol"));
        }

        let found: i64 = evidence::table
            .filter(evidence::id.eq_any(evidence_ids.iter().copied().collect::<Vec<_>>()))
            .count()
            .get_result(conn)?;
        if found != evidence_ids.len() as i64 {
            return Err(GrcError::not_found("evidence"));
        }

        diesel::delete(
            subcontrol_evidence::table
                .filter(subcontrol_evidence::project_subcontrol_id.eq(project_subcontrol_id)),
        )
        .execute(conn)?;
        let rows: Vec<_> = evidence_ids
            .iter()
            .map(|&evidence_id| {
                (
                    subcontrol_evidence::project_subcontrol_id.eq(project_subcontrol_id),
                    subcontrol_evidence::evidence_id.eq(evidence_id),
                )
            })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(subcontrol_evidence::table)
                .values(&rows)
                .execute(conn)?;
        }
        Ok(())
    })
}

// ============================================================================
// Project policies
// ============================================================================

pub fn find_project_policy(
    conn: &mut DbConn,
    project_id: i32,
    project_policy_id: i32,
) -> GrcResult<DbProjectPolicy> {
    project_policies::table
        .filter(project_policies::id.eq(project_policy_id))
        .filter(project_policies::project_id.eq(project_id))
        .select(DbProjectPolicy::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("policy"))
}

fn project_policy_control_ids(conn: &mut DbConn, project_policy_id: i32) -> GrcResult<Vec<i32>> {
    Ok(project_policy_controls::table
        .filter(project_policy_controls::project_policy_id.eq(project_policy_id))
        .order(project_policy_controls::project_control_id.asc())
        .select(project_policy_controls::project_control_id)
        .load(conn)?)
}

pub fn load_project_policy_view(
    conn: &mut DbConn,
    project_id: i32,
    project_policy_id: i32,
) -> GrcResult<ProjectPolicyView> {
    let policy = find_project_policy(conn, project_id, project_policy_id)?;
    let controls = project_policy_control_ids(conn, policy.id)?;
    Ok(ProjectPolicyView { policy, controls })
}

/// Copies the policy text into the project. Returns the existing copy when
/// the policy was added before.
pub fn add_policy_to_project(conn: &mut DbConn, project_id: i32, policy_id: i32) -> GrcResult<i32> {
    conn.transaction(|conn| {
        find_project(conn, project_id)?;
        let policy = find_policy(conn, policy_id)?;

        let existing: Option<i32> = project_policies::table
            .filter(project_policies::project_id.eq(project_id))
            .filter(project_policies::policy_id.eq(policy.id))
            .select(project_policies::id)
            .first(conn)
            .optional()?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        Ok(diesel::insert_into(project_policies::table)
            .values((
                project_policies::project_id.eq(project_id),
                project_policies::policy_id.eq(policy.id),
                project_policies::name.eq(&policy.name),
                project_policies::description.eq(&policy.description),
                project_policies::template.eq(&policy.template),
                project_policies::content.eq(&policy.content),
            ))
            .returning(project_policies::id)
            .get_result(conn)?)
    })
}

pub fn update_project_policy(
    conn: &mut DbConn,
    project_id: i32,
    project_policy_id: i32,
    req: &UpdateProjectPolicyRequest,
) -> GrcResult<DbProjectPolicy> {
    if req.name.trim().is_empty() {
        return Err(GrcError::Validation("policy name is required".to_string()));
    }
    diesel::update(
        project_policies::table
            .filter(project_policies::id.eq(project_policy_id))
            .filter(project_policies::project_id.eq(project_id)),
    )
    .set((
        project_policies::name.eq(req.name.trim()),
        project_policies::description.eq(&req.description),
        project_policies::template.eq(&req.template),
        project_policies::content.eq(&req.content),
        project_policies::public_viewable.eq(req.public),
    ))
    .returning(DbProjectPolicy::as_returning())
    .get_result(conn)
    .optional()?
    .ok_or_else(|| GrcError::not_found("policy"))
}

pub fn remove_project_policy(
    conn: &mut DbConn,
    project_id: i32,
    project_policy_id: i32,
) -> GrcResult<()> {
    let deleted = diesel::delete(
        project_policies::table
            .filter(project_policies::id.eq(project_policy_id))
            .filter(project_policies::project_id.eq(project_id)),
    )
    .execute(conn)?;
    if deleted == 0 {
        return Err(GrcError::not_found("policy"));
    }
    Ok(())
}

/// Both the policy copy and the project control must belong to `project_id`.
pub fn add_project_policy_control(
    conn: &mut DbConn,
    project_id: i32,
    project_policy_id: i32,
    project_control_id: i32,
) -> GrcResult<()> {
    let policy = find_project_policy(conn, project_id, project_policy_id)?;
    let control = find_project_control(conn, project_control_id)?;
    if control.project_id != project_id {
        return Err(GrcError::not_found("control"));
    }
    diesel::insert_or_ignore_into(project_policy_controls::table)
        .values((
            project_policy_controls::project_policy_id.eq(policy.id),
            project_policy_controls::project_control_id.eq(control.id),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn remove_project_policy_control(
    conn: &mut DbConn,
    project_id: i32,
    project_policy_id: i32,
    project_control_id: i32,
) -> GrcResult<()> {
    let policy = find_project_policy(conn, project_id, project_policy_id)?;
    diesel::delete(
        project_policy_controls::table
            .filter(project_policy_controls::project_policy_id.eq(policy.id))
            .filter(project_policy_controls::project_control_id.eq(project_control_id)),
    )
    .execute(conn)?;
    Ok(())
}
