//! Round trips against a real SQLite database file.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use dbschema::{
    DialectCatalog, FieldDescriptor, RelationType, Schema, SchemaConfig, SchemaError, SimpleType,
    SqliteConnection, TableDescriptor,
};
use tempfile::TempDir;

fn open() -> (TempDir, Schema) {
    let dir = tempfile::tempdir().unwrap();
    let conn = Arc::new(SqliteConnection::open(dir.path().join("app.db")).unwrap());
    let schema = Schema::from_config(
        SchemaConfig::for_dialect("sqlite"),
        &DialectCatalog::with_builtins(),
        conn,
    )
    .unwrap();
    (dir, schema)
}

fn blog_tables() -> Vec<TableDescriptor> {
    let mut title = FieldDescriptor::new("title", "string");
    title.length = Some(120);
    title.allow_null = Some(false);
    let mut author = FieldDescriptor::new("user_id", "reference");
    author.ref_table = Some("users".into());
    author.ref_field = Some("id".into());
    vec![
        TableDescriptor::new(
            "users",
            vec![
                FieldDescriptor::new("id", "id"),
                FieldDescriptor::new("name", "string"),
            ],
        ),
        TableDescriptor::new("posts", vec![FieldDescriptor::new("id", "id"), title, author]),
    ]
}

#[test]
fn test_created_tables_read_back() {
    let (_dir, schema) = open();
    let results = schema.update_schema(&blog_tables(), false, false, true).unwrap();
    assert_eq!(results.len(), 2);

    assert!(schema.does_table_exist("POSTS").unwrap());
    let posts = schema.get_table("posts", false).unwrap().unwrap();
    assert_eq!(posts.column_names(), vec!["id", "title", "user_id"]);

    let id = posts.column("id").unwrap();
    assert_eq!(id.column_type, SimpleType::Id);
    assert!(id.is_primary_key);

    let title = posts.column("title").unwrap();
    assert_eq!(title.column_type, SimpleType::String);
    assert_eq!(title.size, Some(120));
    assert!(!title.allow_null);

    let user_id = posts.column("user_id").unwrap();
    assert!(user_id.is_foreign_key);
    assert_eq!(user_id.column_type, SimpleType::Reference);
}

#[test]
fn test_inline_foreign_key_relations() {
    let (_dir, schema) = open();
    schema.update_schema(&blog_tables(), false, false, true).unwrap();

    let posts = schema.get_table("posts", false).unwrap().unwrap();
    let author = posts.relation("users_by_user_id").unwrap();
    assert_eq!(author.relation_type, RelationType::BelongsTo);

    let users = schema.get_table("users", false).unwrap().unwrap();
    let written = users.relation("posts_by_user_id").unwrap();
    assert_eq!(written.relation_type, RelationType::HasMany);
    assert_eq!(written.ref_field, "user_id");
}

#[test]
fn test_add_and_rename_columns() {
    let (_dir, schema) = open();
    schema.update_schema(&blog_tables(), false, false, true).unwrap();

    schema
        .update_fields("users", vec![FieldDescriptor::new("age", "integer")], false)
        .unwrap();
    schema.rename_column("users", "age", "years").unwrap();

    let users = schema.get_table("users", false).unwrap().unwrap();
    assert!(users.column("age").is_none());
    assert_eq!(users.column("years").unwrap().column_type, SimpleType::Integer);
}

#[test]
fn test_redefining_a_column_is_not_implemented() {
    let (_dir, schema) = open();
    schema.update_schema(&blog_tables(), false, false, true).unwrap();

    let err = schema
        .update_fields("users", vec![FieldDescriptor::new("name", "integer")], false)
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotImplemented { .. }));
}

#[test]
fn test_drop_table() {
    let (_dir, schema) = open();
    schema.update_schema(&blog_tables(), false, false, true).unwrap();

    schema.drop_table("posts").unwrap();
    assert!(!schema.does_table_exist("posts").unwrap());
    assert!(schema.does_table_exist("users").unwrap());
}
