use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::{policy_labels, tags};
use crate::core::shared::utils::DbConn;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbTag {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = policy_labels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbPolicyLabel {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = policy_labels)]
pub struct CreateLabelRequest {
    pub key: String,
    pub value: String,
}

/// Names keep the caller's casing; the column is `COLLATE NOCASE`, so
/// uniqueness and lookups ignore case.
fn clean_tag_name(name: &str) -> GrcResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GrcError::Validation("tag name is required".to_string()));
    }
    Ok(name.to_string())
}

pub fn list_tags(conn: &mut DbConn) -> GrcResult<Vec<DbTag>> {
    Ok(tags::table
        .order(tags::name.asc())
        .select(DbTag::as_select())
        .load(conn)?)
}

pub fn create_tag(conn: &mut DbConn, name: &str) -> GrcResult<DbTag> {
    let name = clean_tag_name(name)?;
    Ok(diesel::insert_into(tags::table)
        .values(tags::name.eq(name))
        .returning(DbTag::as_returning())
        .get_result(conn)?)
}

/// Tag id for `name`, creating the tag on first use.
pub fn find_or_create_tag(conn: &mut DbConn, name: &str) -> GrcResult<i32> {
    let name = clean_tag_name(name)?;
    diesel::insert_or_ignore_into(tags::table)
        .values(tags::name.eq(&name))
        .execute(conn)?;
    Ok(tags::table
        .filter(tags::name.eq(&name))
        .select(tags::id)
        .first(conn)?)
}

/// Returns false when no tag had this id.
pub fn delete_tag(conn: &mut DbConn, tag_id: i32) -> GrcResult<bool> {
    let deleted = diesel::delete(tags::table.find(tag_id)).execute(conn)?;
    Ok(deleted > 0)
}

pub fn list_labels(conn: &mut DbConn) -> GrcResult<Vec<DbPolicyLabel>> {
    Ok(policy_labels::table
        .order((policy_labels::key.asc(), policy_labels::value.asc()))
        .select(DbPolicyLabel::as_select())
        .load(conn)?)
}

pub fn create_label(conn: &mut DbConn, req: CreateLabelRequest) -> GrcResult<DbPolicyLabel> {
    if req.key.trim().is_empty() {
        return Err(GrcError::Validation("label key is required".to_string()));
    }
    let req = CreateLabelRequest {
        key: req.key.trim().to_string(),
        value: req.value.trim().to_string(),
    };
    Ok(diesel::insert_into(policy_labels::table)
        .values(&req)
        .returning(DbPolicyLabel::as_returning())
        .get_result(conn)?)
}

pub fn delete_label(conn: &mut DbConn, label_id: i32) -> GrcResult<bool> {
    let deleted = diesel::delete(policy_labels::table.find(label_id)).execute(conn)?;
    Ok(deleted > 0)
}
