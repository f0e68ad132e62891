use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::frameworks;
use crate::core::shared::utils::DbConn;

use super::types::CreateFrameworkRequest;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = frameworks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbFramework {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub reference_link: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = frameworks)]
pub struct NewFramework {
    pub name: String,
    pub description: Option<String>,
    pub reference_link: Option<String>,
}

pub fn find_framework(conn: &mut DbConn, framework_id: i32) -> GrcResult<DbFramework> {
    frameworks::table
        .find(framework_id)
        .select(DbFramework::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("framework"))
}

pub fn list_frameworks(conn: &mut DbConn) -> GrcResult<Vec<DbFramework>> {
    Ok(frameworks::table
        .order(frameworks::name.asc())
        .select(DbFramework::as_select())
        .load(conn)?)
}

pub fn create_framework(conn: &mut DbConn, req: CreateFrameworkRequest) -> GrcResult<DbFramework> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(GrcError::Validation("framework name is required".to_string()));
    }

    let new_framework = NewFramework {
        name,
        description: req.description,
        reference_link: req.link,
    };

    Ok(diesel::insert_into(frameworks::table)
        .values(&new_framework)
        .returning(DbFramework::as_returning())
        .get_result(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::utils::open_memory_pool;

    fn request(name: &str) -> CreateFrameworkRequest {
        CreateFrameworkRequest {
            name: name.to_string(),
            description: Some("baseline".to_string()),
            link: Some("https://example.com/soc2".to_string()),
        }
    }

    #[test]
    fn test_create_and_find_framework() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();

        let created = create_framework(&mut conn, request("SOC2")).unwrap();
        let found = find_framework(&mut conn, created.id).unwrap();
        assert_eq!(found.name, "SOC2");
        assert_eq!(found.reference_link.as_deref(), Some("https://example.com/soc2"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        assert!(matches!(
            create_framework(&mut conn, request("  ")),
            Err(GrcError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_framework() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let err = find_framework(&mut conn, 99).unwrap_err();
        assert_eq!(err.to_string(), "framework not found");
    }

    #[test]
    fn test_list_sorted_by_name() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        create_framework(&mut conn, request("NIST")).unwrap();
        create_framework(&mut conn, request("CMMC")).unwrap();
        let names: Vec<String> = list_frameworks(&mut conn)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["CMMC", "NIST"]);
    }
}
