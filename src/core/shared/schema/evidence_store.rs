diesel::table! {
    evidence (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        content -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    evidence_files (id) {
        id -> Integer,
        evidence_id -> Integer,
        name -> Text,
        data -> Binary,
        created_at -> Timestamp,
    }
}

diesel::table! {
    subcontrol_evidence (id) {
        id -> Integer,
        project_subcontrol_id -> Integer,
        evidence_id -> Integer,
    }
}
