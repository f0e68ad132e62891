pub mod catalog;
pub mod core;
pub mod evidence_store;
pub mod project;

pub use self::catalog::*;
pub use self::core::*;
pub use self::evidence_store::*;
pub use self::project::*;

diesel::joinable!(controls -> frameworks (framework_id));
diesel::joinable!(subcontrols -> controls (control_id));
diesel::joinable!(control_tags -> controls (control_id));
diesel::joinable!(control_tags -> tags (tag_id));
diesel::joinable!(policy_controls -> policies (policy_id));
diesel::joinable!(policy_controls -> controls (control_id));
diesel::joinable!(project_controls -> projects (project_id));
diesel::joinable!(project_controls -> controls (control_id));
diesel::joinable!(project_policies -> projects (project_id));
diesel::joinable!(project_subcontrols -> project_controls (project_control_id));
diesel::joinable!(project_subcontrols -> subcontrols (subcontrol_id));
diesel::joinable!(project_policy_controls -> project_policies (project_policy_id));
diesel::joinable!(evidence_files -> evidence (evidence_id));
diesel::joinable!(subcontrol_evidence -> evidence (evidence_id));
diesel::joinable!(subcontrol_evidence -> project_subcontrols (project_subcontrol_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    frameworks,
    controls,
    subcontrols,
    tags,
    control_tags,
    policy_labels,
    policies,
    policy_controls,
    projects,
    project_policies,
    project_controls,
    project_subcontrols,
    project_policy_controls,
    evidence,
    evidence_files,
    subcontrol_evidence,
);
