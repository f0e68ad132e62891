diesel::table! {
    projects (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        owner_id -> Nullable<Integer>,
        framework_id -> Nullable<Integer>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    project_policies (id) {
        id -> Integer,
        project_id -> Integer,
        policy_id -> Nullable<Integer>,
        name -> Text,
        description -> Text,
        template -> Text,
        content -> Text,
        public_viewable -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    project_controls (id) {
        id -> Integer,
        project_id -> Integer,
        control_id -> Integer,
        is_applicable -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    project_subcontrols (id) {
        id -> Integer,
        project_id -> Integer,
        project_control_id -> Integer,
        subcontrol_id -> Integer,
        is_applicable -> Bool,
        implemented -> Integer,
        notes -> Nullable<Text>,
        auditor_feedback -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    project_policy_controls (id) {
        id -> Integer,
        project_policy_id -> Integer,
        project_control_id -> Integer,
    }
}
