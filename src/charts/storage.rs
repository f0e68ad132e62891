use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Serialize;

use crate::core::error::GrcResult;
use crate::core::shared::schema::{controls, frameworks, policies, projects, subcontrols};
use crate::core::shared::utils::DbConn;
use crate::core::users::count_users;
use crate::projects::{list_recent_projects, project_summary};

pub const RECENT_PROJECTS: i64 = 5;

pub const TENANT_CATEGORIES: [&str; 5] = ["Projects", "Controls", "Policies", "Subcontrols", "Users"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectSummaries {
    pub categories: Vec<String>,
    pub controls: Vec<i64>,
    pub policies: Vec<i64>,
    pub complete: Vec<usize>,
    pub not_implemented: Vec<usize>,
    pub missing_evidence: Vec<usize>,
}

/// Parallel `categories`/`data` arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub categories: Vec<String>,
    pub data: Vec<i64>,
}

impl FromIterator<(String, i64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        let (categories, data) = iter.into_iter().unzip();
        Self { categories, data }
    }
}

pub fn project_summaries(conn: &mut DbConn) -> GrcResult<ProjectSummaries> {
    let mut chart = ProjectSummaries::default();
    for project in list_recent_projects(conn, RECENT_PROJECTS)? {
        let summary = project_summary(conn, project.id)?;
        chart.categories.push(project.name);
        chart.controls.push(summary.controls);
        chart.policies.push(summary.policies);
        chart.complete.push(summary.completion.complete);
        chart.not_implemented.push(summary.completion.not_implemented);
        chart.missing_evidence.push(summary.completion.missing_evidence);
    }
    Ok(chart)
}

pub fn tenant_summary(conn: &mut DbConn) -> GrcResult<CategoryCounts> {
    let projects: i64 = projects::table.count().get_result(conn)?;
    let controls: i64 = controls::table
        .filter(controls::visible.eq(true))
        .count()
        .get_result(conn)?;
    let policies: i64 = policies::table
        .filter(policies::visible.eq(true))
        .count()
        .get_result(conn)?;
    let subcontrols: i64 = subcontrols::table
        .inner_join(controls::table)
        .filter(controls::visible.eq(true))
        .count()
        .get_result(conn)?;
    let users = count_users(conn)?;

    Ok(TENANT_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .zip([projects, controls, policies, subcontrols, users])
        .collect())
}

pub fn controls_by_framework(conn: &mut DbConn) -> GrcResult<CategoryCounts> {
    let rows: Vec<(String, i64)> = controls::table
        .inner_join(frameworks::table)
        .filter(controls::visible.eq(true))
        .group_by(frameworks::name)
        .select((frameworks::name, count_star()))
        .order(frameworks::name.asc())
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

pub fn controls_by_category(conn: &mut DbConn) -> GrcResult<CategoryCounts> {
    let rows: Vec<(String, i64)> = controls::table
        .filter(controls::visible.eq(true))
        .group_by(controls::category)
        .select((controls::category, count_star()))
        .order(controls::category.asc())
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

pub fn controls_by_subcategory(conn: &mut DbConn) -> GrcResult<CategoryCounts> {
    let rows: Vec<(String, i64)> = controls::table
        .filter(controls::visible.eq(true))
        .group_by(controls::subcategory)
        .select((controls::subcategory, count_star()))
        .order(controls::subcategory.asc())
        .load(conn)?;
    Ok(rows.into_iter().collect())
}
