diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        username -> Text,
        roles -> Text,
        is_active -> Bool,
        created_at -> Timestamp,
    }
}
