use chrono::NaiveDateTime;
use diesel::prelude::*;
use log::debug;
use serde::Serialize;

use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::{control_tags, controls, frameworks, subcontrols, tags};
use crate::core::shared::utils::DbConn;
use crate::tags::find_or_create_tag;

use super::types::{ControlView, CreateControlRequest};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = controls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbControl {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub control_ref: String,
    pub category: String,
    pub subcategory: String,
    pub criteria: String,
    pub framework_id: Option<i32>,
    pub visible: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = subcontrols)]
#[diesel(belongs_to(DbControl, foreign_key = control_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbSubControl {
    pub id: i32,
    pub control_id: i32,
    pub name: String,
    pub description: String,
    pub ref_code: String,
    pub mitigation: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = controls)]
struct NewControl<'a> {
    name: &'a str,
    description: &'a str,
    control_ref: &'a str,
    category: &'a str,
    subcategory: &'a str,
    criteria: &'a str,
    framework_id: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subcontrols)]
struct NewSubControl<'a> {
    control_id: i32,
    name: &'a str,
    description: &'a str,
    ref_code: &'a str,
    mitigation: &'a str,
}

pub fn find_control(conn: &mut DbConn, control_id: i32) -> GrcResult<DbControl> {
    controls::table
        .find(control_id)
        .filter(controls::visible.eq(true))
        .select(DbControl::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("control"))
}

pub fn control_subcontrols(conn: &mut DbConn, control: &DbControl) -> GrcResult<Vec<DbSubControl>> {
    Ok(DbSubControl::belonging_to(control)
        .order(subcontrols::id.asc())
        .select(DbSubControl::as_select())
        .load(conn)?)
}

pub fn control_tag_names(conn: &mut DbConn, control_id: i32) -> GrcResult<Vec<String>> {
    Ok(control_tags::table
        .inner_join(tags::table)
        .filter(control_tags::control_id.eq(control_id))
        .order(tags::name.asc())
        .select(tags::name)
        .load(conn)?)
}

pub fn load_control_view(conn: &mut DbConn, control_id: i32) -> GrcResult<ControlView> {
    let control = find_control(conn, control_id)?;
    let subcontrols = control_subcontrols(conn, &control)?;
    let tags = control_tag_names(conn, control.id)?;
    Ok(ControlView {
        control,
        subcontrols,
        tags,
    })
}

/// Insert a control together with its subcontrols and tags. Nothing is
/// written unless every part succeeds.
pub fn create_control(conn: &mut DbConn, req: &CreateControlRequest) -> GrcResult<i32> {
    if req.name.trim().is_empty() {
        return Err(GrcError::Validation("control name is required".to_string()));
    }
    if let Some(sub) = req.subcontrols.iter().find(|s| s.name.trim().is_empty()) {
        return Err(GrcError::Validation(format!(
            "subcontrol name is required (ref_code {:?})",
            sub.ref_code
        )));
    }

    conn.transaction(|conn| {
        if let Some(framework_id) = req.framework_id {
            let exists: i64 = frameworks::table
                .find(framework_id)
                .count()
                .get_result(conn)?;
            if exists == 0 {
                return Err(GrcError::not_found("framework"));
            }
        }

        let control_id: i32 = diesel::insert_into(controls::table)
            .values(&NewControl {
                name: req.name.trim(),
                description: &req.description,
                control_ref: &req.control_ref,
                category: &req.category,
                subcategory: &req.subcategory,
                criteria: &req.criteria,
                framework_id: req.framework_id,
            })
            .returning(controls::id)
            .get_result(conn)?;

        let new_subcontrols: Vec<NewSubControl<'_>> = req
            .subcontrols
            .iter()
            .map(|s| NewSubControl {
                control_id,
                name: s.name.trim(),
                description: &s.description,
                ref_code: &s.ref_code,
                mitigation: &s.mitigation,
            })
            .collect();
        if !new_subcontrols.is_empty() {
            diesel::insert_into(subcontrols::table)
                .values(&new_subcontrols)
                .execute(conn)?;
        }

        for tag in &req.tags {
            let tag_id = find_or_create_tag(conn, tag)?;
            diesel::insert_or_ignore_into(control_tags::table)
                .values((
                    control_tags::control_id.eq(control_id),
                    control_tags::tag_id.eq(tag_id),
                ))
                .execute(conn)?;
        }

        debug!(
            "Created control {} with {} subcontrols",
            control_id,
            new_subcontrols.len()
        );
        Ok(control_id)
    })
}

pub fn hide_control(conn: &mut DbConn, control_id: i32) -> GrcResult<()> {
    let updated = diesel::update(controls::table.find(control_id))
        .filter(controls::visible.eq(true))
        .set(controls::visible.eq(false))
        .execute(conn)?;
    if updated == 0 {
        return Err(GrcError::not_found("control"));
    }
    Ok(())
}
