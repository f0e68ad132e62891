use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::users;
use crate::core::shared::utils::DbConn;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbUser {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub roles: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl DbUser {
    pub fn role_list(&self) -> Vec<String> {
        parse_roles(&self.roles)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub roles: String,
}

pub fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect()
}

pub fn create_user(
    conn: &mut DbConn,
    email: &str,
    username: &str,
    roles: &[String],
) -> GrcResult<DbUser> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(GrcError::Validation(format!("invalid email: {email:?}")));
    }
    if username.trim().is_empty() {
        return Err(GrcError::Validation("username is required".to_string()));
    }

    let new_user = NewUser {
        email,
        username: username.trim(),
        roles: parse_roles(&roles.join(",")).join(","),
    };

    Ok(diesel::insert_into(users::table)
        .values(&new_user)
        .returning(DbUser::as_returning())
        .get_result(conn)?)
}

pub fn find_active_user(conn: &mut DbConn, user_id: i32) -> GrcResult<Option<DbUser>> {
    Ok(users::table
        .find(user_id)
        .filter(users::is_active.eq(true))
        .select(DbUser::as_select())
        .first(conn)
        .optional()?)
}

pub fn count_users(conn: &mut DbConn) -> GrcResult<i64> {
    Ok(users::table.count().get_result(conn)?)
}
