diesel::table! {
    frameworks (id) {
        id -> Integer,
        name -> Text,
        description -> Nullable<Text>,
        reference_link -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    controls (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        control_ref -> Text,
        category -> Text,
        subcategory -> Text,
        criteria -> Text,
        framework_id -> Nullable<Integer>,
        visible -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    subcontrols (id) {
        id -> Integer,
        control_id -> Integer,
        name -> Text,
        description -> Text,
        ref_code -> Text,
        mitigation -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    tags (id) {
        id -> Integer,
        name -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    control_tags (id) {
        id -> Integer,
        control_id -> Integer,
        tag_id -> Integer,
    }
}

diesel::table! {
    policy_labels (id) {
        id -> Integer,
        key -> Text,
        value -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    policies (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        template -> Text,
        content -> Text,
        visible -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    policy_controls (id) {
        id -> Integer,
        policy_id -> Integer,
        control_id -> Integer,
    }
}
