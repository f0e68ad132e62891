/// Route paths, relative to [`ApiUrls::PREFIX`].
#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    pub const PREFIX: &'static str = "/api/v1";

    pub const HEALTH: &'static str = "/health";

    // Projects
    pub const PROJECTS: &'static str = "/projects";
    pub const PROJECT_BY_ID: &'static str = "/projects/:id";
    pub const PROJECTS_SUBCONTROLS: &'static str = "/projects/subcontrols";
    pub const PROJECT_CONTROLS: &'static str = "/projects/:id/controls";
    pub const PROJECT_CONTROL_BY_ID: &'static str = "/projects/:id/controls/:cid";
    pub const PROJECT_POLICY_BY_ID: &'static str = "/projects/:id/policies/:pid";
    pub const PROJECT_POLICY_CONTROL: &'static str = "/projects/:id/policies/:pid/controls/:cid";
    pub const PROJECT_CONTROL_SUBCONTROL: &'static str = "/project-controls/:cid/subcontrols/:sid";
    pub const PROJECT_CONTROL_APPLICABILITY: &'static str = "/project-controls/:cid/applicability";

    // Policies
    pub const POLICIES: &'static str = "/policies";
    pub const POLICY_BY_ID: &'static str = "/policies/:id";
    pub const POLICY_CONTROL: &'static str = "/policies/:id/controls/:cid";
    pub const POLICY_PROJECT: &'static str = "/policies/:id/projects/:project_id";

    // Frameworks
    pub const FRAMEWORKS: &'static str = "/frameworks";
    pub const FRAMEWORK_BY_ID: &'static str = "/frameworks/:id";

    // Evidence
    pub const EVIDENCE: &'static str = "/evidence";
    pub const EVIDENCE_BY_ID: &'static str = "/evidence/:id";
    pub const EVIDENCE_FILES: &'static str = "/evidence/:id/files";
    pub const EVIDENCE_ADD_FILE: &'static str = "/evidence/:id/add_file";
    pub const EVIDENCE_FILE_BY_ID: &'static str = "/evidence/file/:id";
    pub const EVIDENCE_CONTROLS: &'static str = "/evidence/:id/controls";

    // Controls
    pub const CONTROLS: &'static str = "/controls";
    pub const CONTROL_BY_ID: &'static str = "/controls/:id";
    pub const CONTROL_PROJECT: &'static str = "/controls/:id/projects/:project_id";
    pub const QUERY_CONTROLS: &'static str = "/query/controls";

    // Tags and labels
    pub const TAGS: &'static str = "/tags";
    pub const TAG_BY_ID: &'static str = "/tags/:id";
    pub const LABELS: &'static str = "/labels";
    pub const LABEL_BY_ID: &'static str = "/labels/:id";

    // Charts
    pub const CHART_PROJECT_SUMMARIES: &'static str = "/charts/project-summaries";
    pub const CHART_TENANT_SUMMARY: &'static str = "/charts/tenant-summary";
    pub const CHART_CONTROLS_BY_FRAMEWORK: &'static str = "/charts/controls-by-framework";
    pub const CHART_CONTROLS_BY_CATEGORY: &'static str = "/charts/controls-by-category";
    pub const CHART_CONTROLS_BY_SUBCATEGORY: &'static str = "/charts/controls-by-subcategory";
}
