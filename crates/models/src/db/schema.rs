table! {
    use diesel::sql_types::*;
    use crate::db::types::Content_kind;

    contents (id) {
        id -> Int4,
        module -> Int4,
        kind -> Content_kind,
        item -> Int4,
        order -> Int4,
    }
}

table! {
    courses (id) {
        id -> Int4,
        owner -> Int4,
        subject -> Int4,
        title -> Varchar,
        slug -> Varchar,
        overview -> Text,
        created -> Timestamptz,
    }
}

table! {
    file_items (id) {
        id -> Int4,
        owner -> Int4,
        title -> Varchar,
        created -> Timestamptz,
        updated -> Timestamptz,
        file -> Int4,
    }
}

table! {
    files (id) {
        id -> Int4,
        mime -> Varchar,
        path -> Varchar,
        hash -> Bytea,
    }
}

table! {
    image_items (id) {
        id -> Int4,
        owner -> Int4,
        title -> Varchar,
        created -> Timestamptz,
        updated -> Timestamptz,
        file -> Int4,
    }
}

table! {
    modules (id) {
        id -> Int4,
        course -> Int4,
        title -> Varchar,
        description -> Text,
        order -> Int4,
    }
}

table! {
    sessions (id) {
        id -> Int4,
        user -> Int4,
        expires -> Timestamptz,
        last_used -> Timestamptz,
        permissions -> Int4,
    }
}

table! {
    subjects (id) {
        id -> Int4,
        title -> Varchar,
        slug -> Varchar,
    }
}

table! {
    text_items (id) {
        id -> Int4,
        owner -> Int4,
        title -> Varchar,
        created -> Timestamptz,
        updated -> Timestamptz,
        content -> Text,
    }
}

table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        name -> Varchar,
        password -> Bytea,
        salt -> Bytea,
        is_super -> Bool,
        permissions -> Int4,
    }
}

table! {
    video_items (id) {
        id -> Int4,
        owner -> Int4,
        title -> Varchar,
        created -> Timestamptz,
        updated -> Timestamptz,
        url -> Varchar,
    }
}

joinable!(contents -> modules (module));
joinable!(courses -> subjects (subject));
joinable!(courses -> users (owner));
joinable!(file_items -> files (file));
joinable!(image_items -> files (file));
joinable!(modules -> courses (course));
joinable!(sessions -> users (user));

allow_tables_to_appear_in_same_query!(
    contents,
    courses,
    file_items,
    files,
    image_items,
    modules,
    sessions,
    subjects,
    text_items,
    users,
    video_items,
);
