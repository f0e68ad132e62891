use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::{evidence, evidence_files, project_subcontrols, subcontrol_evidence};
use crate::core::shared::utils::DbConn;

use super::types::{EvidenceDownload, EvidenceRequest};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = evidence)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbEvidence {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = evidence)]
struct EvidenceChanges<'a> {
    name: &'a str,
    description: &'a str,
    content: &'a str,
}

impl<'a> EvidenceChanges<'a> {
    fn from_request(req: &'a EvidenceRequest) -> GrcResult<Self> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(GrcError::Validation("evidence name is required".to_string()));
        }
        Ok(Self {
            name,
            description: &req.description,
            content: &req.content,
        })
    }
}

pub fn find_evidence(conn: &mut DbConn, evidence_id: i32) -> GrcResult<DbEvidence> {
    evidence::table
        .find(evidence_id)
        .select(DbEvidence::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("evidence"))
}

pub fn evidence_exists(conn: &mut DbConn, evidence_id: i32) -> GrcResult<bool> {
    let count: i64 = evidence::table.find(evidence_id).count().get_result(conn)?;
    Ok(count > 0)
}

pub fn create_evidence(conn: &mut DbConn, req: &EvidenceRequest) -> GrcResult<DbEvidence> {
    Ok(diesel::insert_into(evidence::table)
        .values(EvidenceChanges::from_request(req)?)
        .returning(DbEvidence::as_returning())
        .get_result(conn)?)
}

pub fn update_evidence(
    conn: &mut DbConn,
    evidence_id: i32,
    req: &EvidenceRequest,
) -> GrcResult<DbEvidence> {
    diesel::update(evidence::table.find(evidence_id))
        .set(EvidenceChanges::from_request(req)?)
        .returning(DbEvidence::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("evidence"))
}

/// Files and control links go with it.
pub fn delete_evidence(conn: &mut DbConn, evidence_id: i32) -> GrcResult<()> {
    let deleted = diesel::delete(evidence::table.find(evidence_id)).execute(conn)?;
    if deleted == 0 {
        return Err(GrcError::not_found("evidence"));
    }
    Ok(())
}

pub fn list_file_ids(conn: &mut DbConn, evidence_id: i32) -> GrcResult<Vec<i32>> {
    if !evidence_exists(conn, evidence_id)? {
        return Err(GrcError::not_found("evidence"));
    }
    Ok(evidence_files::table
        .filter(evidence_files::evidence_id.eq(evidence_id))
        .order(evidence_files::id.asc())
        .select(evidence_files::id)
        .load(conn)?)
}

pub fn add_file(conn: &mut DbConn, evidence_id: i32, name: &str, data: &[u8]) -> GrcResult<i32> {
    if !evidence_exists(conn, evidence_id)? {
        return Err(GrcError::not_found("evidence"));
    }
    Ok(diesel::insert_into(evidence_files::table)
        .values((
            evidence_files::evidence_id.eq(evidence_id),
            evidence_files::name.eq(name),
            evidence_files::data.eq(data),
        ))
        .returning(evidence_files::id)
        .get_result(conn)?)
}

pub fn load_file(conn: &mut DbConn, file_id: i32) -> GrcResult<EvidenceDownload> {
    let (name, data) = evidence_files::table
        .find(file_id)
        .select((evidence_files::name, evidence_files::data))
        .first::<(String, Vec<u8>)>(conn)
        .optional()?
        .ok_or_else(|| GrcError::not_found("file"))?;
    Ok(EvidenceDownload { name, data })
}

pub fn delete_file(conn: &mut DbConn, file_id: i32) -> GrcResult<()> {
    let deleted = diesel::delete(evidence_files::table.find(file_id)).execute(conn)?;
    if deleted == 0 {
        return Err(GrcError::not_found("file"));
    }
    Ok(())
}

/// Replace the set of project subcontrols this evidence supports.
pub fn set_evidence_links(
    conn: &mut DbConn,
    evidence_id: i32,
    project_subcontrol_ids: &[i32],
) -> GrcResult<()> {
    let wanted: BTreeSet<i32> = project_subcontrol_ids.iter().copied().collect();

    conn.transaction(|conn| {
        if !evidence_exists(conn, evidence_id)? {
            return Err(GrcError::not_found("evidence"));
        }

        let found: i64 = project_subcontrols::table
            .filter(project_subcontrols::id.eq_any(wanted.iter().copied().collect::<Vec<_>>()))
            .count()
            .get_result(conn)?;
        if found != wanted.len() as i64 {
            return Err(GrcError::not_found("subcontrol"));
        }

        diesel::delete(
            subcontrol_evidence::table.filter(subcontrol_evidence::evidence_id.eq(evidence_id)),
        )
        .execute(conn)?;

        let rows: Vec<_> = wanted
            .iter()
            .map(|&id| {
                (
                    subcontrol_evidence::project_subcontrol_id.eq(id),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::utils::open_memory_pool;

    fn request(name: &str) -> EvidenceRequest {
        EvidenceRequest {
            name: name.to_string(),
            description: "screenshot of MFA settings".to_string(),
            content: "see attachment".to_string(),
        }
    }

    #[test]
    fn test_evidence_crud() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();

        let created = create_evidence(&mut conn, &request("MFA")).unwrap();
        let updated = update_evidence(&mut conn, created.id, &request("MFA enforced")).unwrap();
        assert_eq!(updated.name, "MFA enforced");

        delete_evidence(&mut conn, created.id).unwrap();
        assert!(matches!(find_evidence(&mut conn, created.id), Err(GrcError::NotFound(_))));
        assert!(matches!(
            update_evidence(&mut conn, created.id, &request("gone")),
            Err(GrcError::NotFound(_))
        ));
    }

    #[test]
    fn test_files_follow_evidence() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let ev = create_evidence(&mut conn, &request("Logs")).unwrap();

        let file_id = add_file(&mut conn, ev.id, "audit.log", b"line one\n").unwrap();
        assert_eq!(list_file_ids(&mut conn, ev.id).unwrap(), vec![file_id]);
        let download = load_file(&mut conn, file_id).unwrap();
        assert_eq!(download.name, "audit.log");
        assert_eq!(download.data, b"line one\n");

        delete_evidence(&mut conn, ev.id).unwrap();
        assert_eq!(
            load_file(&mut conn, file_id).unwrap_err().to_string(),
            "file not found"
        );
    }

    #[test]
    fn test_add_file_requires_evidence() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        assert!(matches!(
            add_file(&mut conn, 7, "x.txt", b"x"),
            Err(GrcError::NotFound(_))
        ));
        assert!(matches!(delete_file(&mut conn, 7), Err(GrcError::NotFound(_))));
    }

    #[test]
    fn test_links_reject_unknown_subcontrols() {
        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let ev = create_evidence(&mut conn, &request("Policy doc")).unwrap();

        set_evidence_links(&mut conn, ev.id, &[]).unwrap();
        assert!(matches!(
            set_evidence_links(&mut conn, ev.id, &[41, 42]),
            Err(GrcError::NotFound(_))
        ));
    }

    #[test]
    fn test_links_are_replaced_wholesale() {
        use crate::controls::storage::tests::sample_control;
        use crate::controls::create_control;
        use crate::projects::{
            add_control_to_project, create_project, project_subcontrols_with_evidence,
            CreateProjectRequest,
        };

        let pool = open_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let control_id = create_control(&mut conn, &sample_control("Backups", "Ops", 2)).unwrap();
        let project_id = create_project(
            &mut conn,
            &CreateProjectRequest {
                name: "Audit".to_string(),
                description: String::new(),
                framework_id: None,
                import_controls: false,
                policies: Vec::new(),
            },
            None,
        )
        .unwrap();
        add_control_to_project(&mut conn, project_id, control_id).unwrap();

        let linked_names = |conn: &mut DbConn| -> Vec<Vec<String>> {
            project_subcontrols_with_evidence(conn, project_id)
                .unwrap()
                .into_iter()
                .map(|s| s.evidence.unwrap_or_default().into_iter().map(|e| e.name).collect())
                .collect()
        };
        let subs = project_subcontrols_with_evidence(&mut conn, project_id).unwrap();
        let (first, second) = (subs[0].subcontrol.id, subs[1].subcontrol.id);
        let ev = create_evidence(&mut conn, &request("Restore test")).unwrap();

        set_evidence_links(&mut conn, ev.id, &[first]).unwrap();
        assert_eq!(linked_names(&mut conn), vec![vec!["Restore test".to_string()], vec![]]);

        // One unknown id rejects the whole replacement.
        assert!(matches!(
            set_evidence_links(&mut conn, ev.id, &[second, 999]),
            Err(GrcError::NotFound(_))
        ));
        assert_eq!(linked_names(&mut conn), vec![vec!["Restore test".to_string()], vec![]]);

        set_evidence_links(&mut conn, ev.id, &[second]).unwrap();
        assert_eq!(linked_names(&mut conn), vec![vec![], vec!["Restore test".to_string()]]);
    }
}
