//! End-to-end tests for `Schema` over recording connections.
//!
//! Catalog queries are answered by fragment, so each test registers the
//! rows a real server would return and then inspects the DDL issued.

use std::sync::Arc;

use dbschema::core::ParamType;
use dbschema::extras::FieldExtras;
use dbschema::{
    CallArgs, DialectCatalog, DryRunConnection, ExtrasStore, FieldDescriptor, MemoryCache,
    MemoryExtrasStore, ProcedureResult, RelationType, Row, Schema, SchemaConfig, SchemaError,
    SimpleType, TableDescriptor, UpdateResult, Value,
};

fn mysql_schema() -> (Arc<DryRunConnection>, Schema) {
    let conn = Arc::new(DryRunConnection::new("mysql"));
    conn.respond(
        "SELECT DATABASE()",
        vec![Row::from_pairs([("schema_name", "app")])],
    );
    let schema = Schema::from_config(
        SchemaConfig::for_dialect("mysql"),
        &DialectCatalog::with_builtins(),
        conn.clone(),
    )
    .unwrap();
    (conn, schema)
}

fn table_rows(names: &[&str]) -> Vec<Row> {
    names
        .iter()
        .map(|n| Row::from_pairs([("table_name", *n), ("table_type", "BASE TABLE")]))
        .collect()
}

fn column(name: &str, db_type: &str, allow_null: bool, auto: bool, pk: bool) -> Row {
    Row::from_pairs([
        ("column_name", Value::from(name)),
        ("db_type", Value::from(db_type)),
        ("allow_null", Value::from(allow_null)),
        ("auto_increment", Value::from(auto)),
        ("is_primary_key", Value::from(pk)),
    ])
}

fn foreign_key(name: &str, table: &str, col: &str, ref_table: &str) -> Row {
    Row::from_pairs([
        ("constraint_name", name),
        ("table_schema", "app"),
        ("table_name", table),
        ("column_name", col),
        ("referenced_table_schema", "app"),
        ("referenced_table_name", ref_table),
        ("referenced_column_name", "id"),
        ("update_rule", "NO ACTION"),
        ("delete_rule", "CASCADE"),
    ])
}

/// `users(id, name, email)` as reported by INFORMATION_SCHEMA.
fn respond_users(conn: &DryRunConnection) {
    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["users"]));
    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("id", "int(11)", false, true, true),
            column("name", "varchar(100)", true, false, false),
            column("email", "varchar(255)", true, false, false),
        ],
    );
}

fn position(statements: &[String], needle: &str) -> usize {
    statements
        .iter()
        .position(|s| s.contains(needle))
        .unwrap_or_else(|| panic!("no statement containing {:?} in {:#?}", needle, statements))
}

// =============================================================================
// Table creation
// =============================================================================

#[test]
fn test_mysql_create_table_definitions() {
    let (conn, schema) = mysql_schema();
    let mut name = FieldDescriptor::new("name", "string");
    name.length = Some(100);
    let desc = TableDescriptor::new("t1", vec![FieldDescriptor::new("id", "id"), name]);

    let result = schema.create_table(&desc).unwrap();
    assert_eq!(result, UpdateResult::Updated { name: "t1".into() });

    let statements = conn.statements();
    assert_eq!(statements.len(), 1, "{:#?}", statements);
    assert!(statements[0].starts_with("CREATE TABLE `t1`"));
    assert!(statements[0].contains("`id` int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY"));
    assert!(statements[0].contains("`name` varchar(100) NULL"));
}

#[test]
fn test_create_existing_table_requires_merge() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    let err = schema
        .create_table(&TableDescriptor::new(
            "USERS",
            vec![FieldDescriptor::new("id", "id")],
        ))
        .unwrap_err();
    assert!(matches!(err, SchemaError::AlreadyExists(_)));
    assert!(conn.statements().is_empty());
}

#[test]
fn test_foreign_keys_deferred_until_batch_tables_exist() {
    let (conn, schema) = mysql_schema();
    let mut owner = FieldDescriptor::new("user_id", "reference");
    owner.ref_table = Some("users".into());
    owner.ref_field = Some("id".into());
    let tables = vec![
        TableDescriptor::new("posts", vec![FieldDescriptor::new("id", "id"), owner]),
        TableDescriptor::new("users", vec![FieldDescriptor::new("id", "id")]),
    ];

    let results = schema.update_schema(&tables, false, false, false).unwrap();
    assert!(results.iter().all(|r| !r.is_error()));

    let statements = conn.statements();
    let fk = position(&statements, "FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)");
    assert!(fk > position(&statements, "CREATE TABLE `posts`"));
    assert!(fk > position(&statements, "CREATE TABLE `users`"));
    assert!(statements[fk].starts_with("ALTER TABLE `posts` ADD CONSTRAINT"));
}

#[test]
fn test_batch_failures_are_isolated_per_table() {
    let (conn, schema) = mysql_schema();
    let tables = vec![
        TableDescriptor::new("empty", Vec::new()),
        TableDescriptor::new("tags", vec![FieldDescriptor::new("id", "id")]),
    ];

    let results = schema.update_schema(&tables, false, false, false).unwrap();
    match &results[0] {
        UpdateResult::Failed { error } => assert_eq!(error.code, "invalid_schema"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(results[1], UpdateResult::Updated { name: "tags".into() });
    assert_eq!(conn.statements().len(), 1);
}

#[test]
fn test_rollback_aborts_on_first_failure() {
    let (conn, schema) = mysql_schema();
    let tables = vec![
        TableDescriptor::new("empty", Vec::new()),
        TableDescriptor::new("tags", vec![FieldDescriptor::new("id", "id")]),
    ];

    let err = schema.update_schema(&tables, false, false, true).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSchema(_)));
    assert!(conn.statements().is_empty());
}

#[test]
fn test_database_error_reported_per_table() {
    let (conn, schema) = mysql_schema();
    conn.fail_on("CREATE TABLE `broken`", "table is read only");
    let tables = vec![
        TableDescriptor::new("broken", vec![FieldDescriptor::new("id", "id")]),
        TableDescriptor::new("tags", vec![FieldDescriptor::new("id", "id")]),
    ];

    let results = schema.update_schema(&tables, false, false, false).unwrap();
    assert!(results[0].is_error());
    assert!(!results[1].is_error());
}

// =============================================================================
// Altering tables
// =============================================================================

#[test]
fn test_unchanged_descriptor_issues_no_ddl() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    schema
        .update_fields(
            "users",
            vec![
                FieldDescriptor::new("id", "id"),
                FieldDescriptor::new("name", "string"),
            ],
            false,
        )
        .unwrap();
    assert!(conn.statements().is_empty(), "{:#?}", conn.statements());
}

#[test]
fn test_introspected_columns_round_trip_without_changes() {
    let (conn, schema) = mysql_schema();
    let store = Arc::new(MemoryExtrasStore::new());
    let schema = schema.with_extras(store.clone());
    respond_users(&conn);

    let users = schema.get_table("users", false).unwrap().unwrap();
    let fields: Vec<FieldDescriptor> = users
        .columns
        .iter()
        .map(|c| serde_json::from_value(c.to_array()).unwrap())
        .collect();
    assert_eq!(fields[1].label.as_deref(), Some("Name"));

    schema.update_fields("users", fields, false).unwrap();
    assert!(conn.statements().is_empty(), "{:#?}", conn.statements());
    assert!(store.is_empty());
}

#[test]
fn test_untyped_field_rejected_before_any_drop() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);
    let fields = vec![
        FieldDescriptor::new("id", "id"),
        FieldDescriptor::new("name", "string"),
        FieldDescriptor {
            name: "age".into(),
            ..Default::default()
        },
    ];

    let err = schema.update_fields("users", fields, true).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSchema(_)));
    assert!(err.to_string().contains("no type element for field 'age'"));
    assert!(conn.statements().is_empty(), "{:#?}", conn.statements());
}

#[test]
fn test_dropping_foreign_key_column_drops_constraint_first() {
    let (conn, schema) = mysql_schema();
    respond_blog(&conn);
    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("id", "int(11)", false, true, true),
            column("user_id", "int(11)", true, false, false),
        ],
    );

    schema.drop_column("posts", "user_id").unwrap();
    assert_eq!(
        conn.statements(),
        vec![
            "ALTER TABLE `posts` DROP FOREIGN KEY `fk_posts_user`".to_string(),
            "ALTER TABLE `posts` DROP COLUMN `user_id`".to_string(),
        ]
    );
}

#[test]
fn test_add_column_to_existing_table() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    schema
        .update_fields("users", vec![FieldDescriptor::new("age", "integer")], false)
        .unwrap();
    let statements = conn.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("ALTER TABLE `users` ADD"));
    assert!(statements[0].contains("`age`"));
}

#[test]
fn test_columns_dropped_only_with_allow_delete() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);
    let keep = vec![
        FieldDescriptor::new("id", "id"),
        FieldDescriptor::new("name", "string"),
    ];

    schema.update_fields("users", keep.clone(), false).unwrap();
    assert!(conn.statements().is_empty());

    schema.update_fields("users", keep, true).unwrap();
    assert_eq!(
        conn.statements(),
        vec!["ALTER TABLE `users` DROP COLUMN `email`".to_string()]
    );
}

#[test]
fn test_update_missing_table_is_not_found() {
    let (_conn, schema) = mysql_schema();
    let err = schema
        .update_fields("ghost", vec![FieldDescriptor::new("id", "id")], false)
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotFound(_)));
}

#[test]
fn test_virtual_field_cannot_shadow_physical_column() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    let err = schema
        .update_fields("users", vec![FieldDescriptor::new("name", "virtual")], false)
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSchema(_)));
    assert!(conn.statements().is_empty());
}

#[test]
fn test_virtual_field_lives_in_extras_only() {
    let (conn, schema) = mysql_schema();
    let store = Arc::new(MemoryExtrasStore::new());
    let schema = schema.with_extras(store.clone());
    respond_users(&conn);

    let mut summary = FieldDescriptor::new("summary", "virtual");
    summary.label = Some("Summary".into());
    schema.update_fields("users", vec![summary], false).unwrap();
    assert!(conn.statements().is_empty());

    let extras = store.get_field_extras("users", &[]).unwrap();
    assert_eq!(extras.len(), 1);
    assert_eq!(extras[0].label.as_deref(), Some("Summary"));

    let users = schema.get_table("users", false).unwrap().unwrap();
    let column = users.column("summary").unwrap();
    assert!(column.is_virtual);
    assert_eq!(column.label.as_deref(), Some("Summary"));
}

#[test]
fn test_drop_table_removes_extras() {
    let (conn, schema) = mysql_schema();
    let store = Arc::new(MemoryExtrasStore::new());
    let schema = schema.with_extras(store.clone());
    respond_users(&conn);

    let mut name = FieldDescriptor::new("name", "string");
    name.label = Some("Full name".into());
    schema.update_fields("users", vec![name], false).unwrap();
    assert!(!store.is_empty());

    schema.drop_table("users").unwrap();
    assert_eq!(conn.statements(), vec!["DROP TABLE `users`".to_string()]);
    assert!(store.get_field_extras("users", &[]).unwrap().is_empty());
}

// =============================================================================
// Discovery
// =============================================================================

#[test]
fn test_table_lookup_ignores_case() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    assert!(schema.does_table_exist("USERS").unwrap());
    assert!(schema.does_table_exist("app.Users").unwrap());
    assert!(!schema.does_table_exist("orders").unwrap());
    assert_eq!(
        schema.table_exists_name("Users").unwrap(),
        Some("users".to_string())
    );

    let lower = schema.get_table("users", false).unwrap().unwrap();
    let upper = schema.get_table("USERS", false).unwrap().unwrap();
    assert!(Arc::ptr_eq(&lower, &upper));
}

#[test]
fn test_discovered_table_types_and_keys() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    let users = schema.get_table("users", false).unwrap().unwrap();
    assert!(users.discovery_completed);
    assert_eq!(users.column_names(), vec!["id", "name", "email"]);
    let id = users.column("id").unwrap();
    assert_eq!(id.column_type, SimpleType::Id);
    assert!(id.is_primary_key);
    assert!(id.auto_increment);
    let name = users.column("NAME").unwrap();
    assert_eq!(name.column_type, SimpleType::String);
    assert_eq!(name.size, Some(100));
    assert!(name.allow_null);
}

#[test]
fn test_table_names_cached_until_refresh() {
    let (conn, schema) = mysql_schema();
    let schema = schema.with_cache(Arc::new(MemoryCache::new()));
    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["users", "posts"]));

    let names = schema.get_table_names(None, false, false).unwrap();
    assert_eq!(names.keys().collect::<Vec<_>>(), vec!["posts", "users"]);
    schema.get_table_names(None, false, false).unwrap();
    assert_eq!(conn.query_count("INFORMATION_SCHEMA.TABLES"), 1);

    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["users"]));
    schema.refresh().unwrap();
    let names = schema.get_table_names(None, false, false).unwrap();
    assert_eq!(conn.query_count("INFORMATION_SCHEMA.TABLES"), 2);
    assert_eq!(names.len(), 1);
}

#[test]
fn test_schema_update_invalidates_table_names() {
    let (conn, schema) = mysql_schema();
    assert!(!schema.does_table_exist("tags").unwrap());

    schema
        .create_table(&TableDescriptor::new(
            "tags",
            vec![FieldDescriptor::new("id", "id")],
        ))
        .unwrap();
    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["tags"]));
    assert!(schema.does_table_exist("tags").unwrap());
}

#[test]
fn test_views_filtered_by_flag() {
    let (conn, schema) = mysql_schema();
    conn.respond(
        "INFORMATION_SCHEMA.TABLES",
        vec![
            Row::from_pairs([("table_name", "users"), ("table_type", "BASE TABLE")]),
            Row::from_pairs([("table_name", "active_users"), ("table_type", "VIEW")]),
        ],
    );

    assert_eq!(schema.get_table_names(None, false, false).unwrap().len(), 1);
    let all = schema.get_table_names(None, true, false).unwrap();
    assert!(all["active_users"].is_view);
}

#[test]
fn test_listing_views_overrides_configuration() {
    let conn = Arc::new(DryRunConnection::new("mysql"));
    conn.respond(
        "INFORMATION_SCHEMA.TABLES",
        vec![
            Row::from_pairs([("table_name", "users"), ("table_type", "BASE TABLE")]),
            Row::from_pairs([("table_name", "active_users"), ("table_type", "VIEW")]),
        ],
    );
    conn.respond("TABLE_TYPE = 'BASE TABLE'", table_rows(&["users"]));
    let mut config = SchemaConfig::for_dialect("mysql");
    config.include_views = false;
    let schema =
        Schema::from_config(config, &DialectCatalog::with_builtins(), conn.clone()).unwrap();

    let all = schema.get_table_names(None, true, false).unwrap();
    assert!(all["active_users"].is_view);
    let tables = schema.get_table_names(None, false, false).unwrap();
    assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["users"]);
}

// =============================================================================
// Relations
// =============================================================================

/// users <- posts <- post_tags -> tags
fn respond_blog(conn: &DryRunConnection) {
    conn.respond(
        "INFORMATION_SCHEMA.TABLES",
        table_rows(&["users", "posts", "tags", "post_tags"]),
    );
    conn.respond(
        "INFORMATION_SCHEMA.KEY_COLUMN_USAGE",
        vec![
            foreign_key("fk_posts_user", "posts", "user_id", "users"),
            foreign_key("fk_pt_post", "post_tags", "post_id", "posts"),
            foreign_key("fk_pt_tag", "post_tags", "tag_id", "tags"),
        ],
    );
}

#[test]
fn test_belongs_to_and_has_many_are_symmetric() {
    let (conn, schema) = mysql_schema();
    respond_blog(&conn);

    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![column("id", "int(11)", false, true, true)],
    );
    let users = schema.get_table("users", false).unwrap().unwrap();
    let has_many = users.relation("posts_by_user_id").unwrap();
    assert_eq!(has_many.relation_type, RelationType::HasMany);
    assert_eq!(has_many.field, "id");
    assert_eq!(has_many.ref_table, "posts");
    assert_eq!(has_many.ref_field, "user_id");

    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("id", "int(11)", false, true, true),
            column("user_id", "int(11)", true, false, false),
        ],
    );
    let posts = schema.get_table("posts", false).unwrap().unwrap();
    let belongs_to = posts.relation("users_by_user_id").unwrap();
    assert_eq!(belongs_to.relation_type, RelationType::BelongsTo);
    assert_eq!(belongs_to.field, "user_id");
    assert_eq!(belongs_to.ref_table, "users");
    assert_eq!(belongs_to.ref_on_delete.as_deref(), Some("CASCADE"));

    let user_id = posts.column("user_id").unwrap();
    assert!(user_id.is_foreign_key);
    assert_eq!(user_id.column_type, SimpleType::Reference);
    assert_eq!(user_id.ref_table.as_deref(), Some("users"));
}

#[test]
fn test_many_many_through_junction() {
    let (conn, schema) = mysql_schema();
    respond_blog(&conn);
    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("id", "int(11)", false, true, true),
            column("title", "varchar(200)", false, false, false),
        ],
    );

    let posts = schema.get_table("posts", false).unwrap().unwrap();
    let tags = posts.relation("tags_by_post_tags").unwrap();
    assert_eq!(tags.relation_type, RelationType::ManyMany);
    assert_eq!(tags.ref_table, "tags");
    assert_eq!(tags.junction_table.as_deref(), Some("post_tags"));
    assert_eq!(tags.junction_field.as_deref(), Some("post_id"));
    assert_eq!(tags.junction_ref_field.as_deref(), Some("tag_id"));

    let tags_table = schema.get_table("tags", false).unwrap().unwrap();
    let posts_rel = tags_table.relation("posts_by_post_tags").unwrap();
    assert_eq!(posts_rel.ref_table, "posts");
}

#[test]
fn test_composite_foreign_key_infers_no_relation() {
    let (conn, schema) = mysql_schema();
    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["lines", "orders"]));
    conn.respond(
        "INFORMATION_SCHEMA.KEY_COLUMN_USAGE",
        vec![
            foreign_key("fk_lines_order", "lines", "order_id", "orders"),
            foreign_key("fk_lines_order", "lines", "order_rev", "orders"),
        ],
    );
    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("order_id", "int(11)", false, false, false),
            column("order_rev", "int(11)", false, false, false),
        ],
    );

    let lines = schema.get_table("lines", false).unwrap().unwrap();
    assert!(lines.relations.is_empty());
    assert!(lines.column("order_id").unwrap().is_foreign_key);
    assert!(lines.column("order_rev").unwrap().is_foreign_key);
}

#[test]
fn test_drop_virtual_relationship() {
    let (conn, schema) = mysql_schema();
    let store = Arc::new(MemoryExtrasStore::new());
    let schema = schema.with_extras(store.clone());
    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["users", "posts"]));
    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("id", "int(11)", false, true, true),
            column("user_id", "int(11)", true, false, false),
        ],
    );
    store
        .set_field_extras(vec![FieldExtras {
            table: "posts".into(),
            field: "user_id".into(),
            is_virtual_foreign_key: true,
            ref_table: Some("users".into()),
            ref_field: Some("id".into()),
            ..Default::default()
        }])
        .unwrap();

    let posts = schema.get_table("posts", false).unwrap().unwrap();
    assert!(posts.relation("users_by_user_id").unwrap().is_virtual);

    schema.drop_relationship("posts", "users_by_user_id").unwrap();
    let posts = schema.get_table("posts", false).unwrap().unwrap();
    assert!(posts.relation("users_by_user_id").is_none());
    assert!(!posts.column("user_id").unwrap().is_virtual_foreign_key);
    assert!(conn.statements().is_empty());
}

#[test]
fn test_physical_relationship_cannot_be_dropped() {
    let (conn, schema) = mysql_schema();
    let schema = schema.with_extras(Arc::new(MemoryExtrasStore::new()));
    respond_blog(&conn);
    conn.respond(
        "INFORMATION_SCHEMA.COLUMNS",
        vec![
            column("id", "int(11)", false, true, true),
            column("user_id", "int(11)", true, false, false),
        ],
    );

    let err = schema
        .drop_relationship("posts", "users_by_user_id")
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSchema(_)));
    let err = schema.drop_relationship("posts", "nothing").unwrap_err();
    assert!(matches!(err, SchemaError::NotFound(_)));
}

// =============================================================================
// Sequences and integrity
// =============================================================================

#[test]
fn test_reset_sequence_reseeds_auto_increment() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    schema.reset_sequence("users", Some(100)).unwrap();
    let statements = conn.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("ALTER TABLE"));
    assert!(statements[0].ends_with("AUTO_INCREMENT = 100"));

    let err = schema.reset_sequence("ghost", None).unwrap_err();
    assert!(matches!(err, SchemaError::NotFound(_)));
}

#[test]
fn test_check_integrity_toggles_foreign_key_checks() {
    let (conn, schema) = mysql_schema();
    respond_users(&conn);

    schema.check_integrity(false, None).unwrap();
    schema.check_integrity(true, Some("users")).unwrap();
    assert_eq!(
        conn.statements(),
        vec![
            "SET FOREIGN_KEY_CHECKS = 0".to_string(),
            "SET FOREIGN_KEY_CHECKS = 1".to_string(),
        ]
    );
}

// =============================================================================
// Stored routines
// =============================================================================

fn parameter(name: &str, position: i64, mode: &str, db_type: &str) -> Row {
    Row::from_pairs([
        ("parameter_name", Value::from(name)),
        ("ordinal_position", Value::Int(position)),
        ("parameter_mode", Value::from(mode)),
        ("db_type", Value::from(db_type)),
    ])
}

/// `order_totals(IN order_id int, INOUT running int, OUT total int)`
fn respond_order_totals(conn: &DryRunConnection) {
    conn.respond(
        "INFORMATION_SCHEMA.ROUTINES",
        vec![Row::from_pairs([("routine_name", "order_totals")])],
    );
    conn.respond(
        "INFORMATION_SCHEMA.PARAMETERS",
        vec![
            parameter("order_id", 1, "IN", "int"),
            parameter("running", 2, "INOUT", "int"),
            parameter("total", 3, "OUT", "int"),
        ],
    );
}

#[test]
fn test_procedure_discovery() {
    let (conn, schema) = mysql_schema();
    respond_order_totals(&conn);

    let names = schema.get_procedure_names(false).unwrap();
    assert_eq!(names.keys().collect::<Vec<_>>(), vec!["order_totals"]);

    let routine = schema.get_procedure("ORDER_TOTALS", false).unwrap().unwrap();
    assert!(routine.discovery_completed);
    let modes: Vec<ParamType> = routine.parameters.iter().map(|p| p.param_type).collect();
    assert_eq!(modes, vec![ParamType::In, ParamType::Inout, ParamType::Out]);
    assert_eq!(routine.parameter("total").unwrap().value_type, SimpleType::Integer);

    assert!(schema.get_procedure("missing", false).unwrap().is_none());
}

#[test]
fn test_procedure_out_parameters_read_from_session_variables() {
    let (conn, schema) = mysql_schema();
    respond_order_totals(&conn);
    conn.respond(
        "CALL ",
        vec![Row::from_pairs([("line", Value::Int(1))])],
    );
    conn.respond(
        "SELECT @running",
        vec![Row::from_pairs([
            ("running", Value::from("15")),
            ("total", Value::from("42")),
        ])],
    );

    let args = CallArgs::from([
        ("order_id".to_string(), Value::Int(7)),
        ("@Running".to_string(), Value::Int(10)),
    ]);
    let out = schema.call_procedure("order_totals", &args).unwrap();

    assert_eq!(conn.statements(), vec!["SET @running = ?".to_string()]);
    let call = position(&conn.queries(), "CALL ");
    assert!(conn.queries()[call].ends_with("(?, @running, @total)"));
    assert_eq!(out.result.rows().len(), 1);
    assert_eq!(out.out_params["running"], Value::Int(15));
    assert_eq!(out.out_params["total"], Value::Int(42));
    assert!(out.value.is_none());
}

#[test]
fn test_procedure_without_result_sets_still_reads_out_parameters() {
    let (conn, schema) = mysql_schema();
    respond_order_totals(&conn);
    conn.fail_on("CALL ", "SQLSTATE[HY000]: General error");
    conn.respond(
        "SELECT @running",
        vec![Row::from_pairs([
            ("running", Value::Int(1)),
            ("total", Value::Int(2)),
        ])],
    );

    let out = schema.call_procedure("order_totals", &CallArgs::new()).unwrap();
    assert_eq!(out.result, ProcedureResult::Rows(Vec::new()));
    assert_eq!(out.out_params["total"], Value::Int(2));
}

#[test]
fn test_procedure_database_errors_propagate() {
    let (conn, schema) = mysql_schema();
    respond_order_totals(&conn);
    conn.fail_on("CALL ", "PROCEDURE app.order_totals raised an error");

    let err = schema
        .call_procedure("order_totals", &CallArgs::new())
        .unwrap_err();
    assert!(matches!(err, SchemaError::Database { .. }));
}

#[test]
fn test_unknown_procedure_is_not_found() {
    let (_conn, schema) = mysql_schema();
    let err = schema
        .call_procedure("nothing", &CallArgs::new())
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotFound(_)));
}

fn mssql_schema() -> (Arc<DryRunConnection>, Schema) {
    let conn = Arc::new(DryRunConnection::new("sqlsrv"));
    let schema = Schema::from_config(
        SchemaConfig::for_dialect("sqlsrv"),
        &DialectCatalog::with_builtins(),
        conn.clone(),
    )
    .unwrap();
    (conn, schema)
}

#[test]
fn test_mssql_out_parameters_from_last_result_set() {
    let (conn, schema) = mssql_schema();
    conn.respond(
        "INFORMATION_SCHEMA.ROUTINES",
        vec![Row::from_pairs([("routine_name", "customer_report")])],
    );
    conn.respond(
        "INFORMATION_SCHEMA.PARAMETERS",
        vec![
            parameter("@customer", 1, "IN", "int"),
            parameter("@order_count", 2, "OUT", "int"),
        ],
    );
    conn.respond_sets(
        "EXEC ",
        vec![
            vec![Row::from_pairs([("name", "Ada")])],
            vec![
                Row::from_pairs([("order_id", Value::Int(1))]),
                Row::from_pairs([("order_id", Value::Int(2))]),
            ],
            vec![Row::from_pairs([("order_count", Value::from("2"))])],
        ],
    );

    let args = CallArgs::from([("customer".to_string(), Value::Int(5))]);
    let out = schema.call_procedure("customer_report", &args).unwrap();

    let call = &conn.queries()[position(&conn.queries(), "EXEC ")];
    assert!(call.contains("@order_count = @order_count OUTPUT"));
    assert_eq!(out.result.set_count(), 2);
    match &out.result {
        ProcedureResult::Sets(sets) => assert_eq!(sets[1].len(), 2),
        other => panic!("expected separate result sets, got {:?}", other),
    }
    assert_eq!(out.out_params["order_count"], Value::Int(2));
}

#[test]
fn test_mssql_function_returns_formatted_value() {
    let (conn, schema) = mssql_schema();
    conn.respond(
        "INFORMATION_SCHEMA.ROUTINES",
        vec![Row::from_pairs([("routine_name", "add_one")])],
    );
    conn.respond(
        "INFORMATION_SCHEMA.PARAMETERS",
        vec![
            parameter("", 0, "RETURN", "int"),
            parameter("@n", 1, "IN", "int"),
        ],
    );
    conn.respond(
        "AS [value]",
        vec![Row::from_pairs([("value", Value::from("8"))])],
    );

    let function = schema.get_function("add_one", false).unwrap().unwrap();
    assert_eq!(function.return_type, Some(SimpleType::Integer));
    assert_eq!(function.parameters.len(), 1);

    let args = CallArgs::from([("n".to_string(), Value::Int(7))]);
    let out = schema.call_function("add_one", &args).unwrap();
    assert_eq!(out.value, Some(Value::Int(8)));
    assert!(out.out_params.is_empty());
}

// =============================================================================
// Type round trips
// =============================================================================

const ROUND_TRIP_TYPES: [SimpleType; 13] = [
    SimpleType::String,
    SimpleType::Text,
    SimpleType::Integer,
    SimpleType::Bigint,
    SimpleType::Boolean,
    SimpleType::Float,
    SimpleType::Double,
    SimpleType::Decimal,
    SimpleType::Binary,
    SimpleType::Date,
    SimpleType::Time,
    SimpleType::Datetime,
    SimpleType::Timestamp,
];

/// `(column, native type)` for one column per round-trip type, as the
/// dialect would render it in a CREATE TABLE.
fn rendered_types(schema: &Schema) -> Vec<(String, String)> {
    ROUND_TRIP_TYPES
        .iter()
        .map(|t| {
            let name = format!("c_{}", t.as_str());
            let definition = schema
                .dialect()
                .column_definition(&FieldDescriptor::new(&name, t.as_str()), None)
                .unwrap();
            let native = definition.split_whitespace().next().unwrap().to_string();
            (name, native)
        })
        .collect()
}

fn assert_types_round_trip(schema: &Schema, table: &str) {
    let discovered = schema.get_table(table, false).unwrap().unwrap();
    for t in ROUND_TRIP_TYPES {
        let column = discovered.column(&format!("c_{}", t.as_str())).unwrap();
        assert_eq!(column.column_type, t, "{} came back as {:?}", column.db_type, column.column_type);
    }
}

#[test]
fn test_mysql_types_round_trip() {
    let (conn, schema) = mysql_schema();
    conn.respond("INFORMATION_SCHEMA.TABLES", table_rows(&["samples"]));
    let rows = rendered_types(&schema)
        .iter()
        .map(|(name, native)| column(name, native, true, false, false))
        .collect();
    conn.respond("INFORMATION_SCHEMA.COLUMNS", rows);

    assert_types_round_trip(&schema, "samples");
}

#[test]
fn test_sqlite_types_round_trip() {
    let (conn, schema) = sqlite_schema();
    conn.respond(
        "sqlite_master",
        vec![Row::from_pairs([("table_name", "samples"), ("table_type", "table")])],
    );
    conn.respond("pragma_foreign_key_list", Vec::new());
    let rows = rendered_types(&schema)
        .iter()
        .map(|(name, native)| {
            Row::from_pairs([
                ("column_name", Value::from(name.as_str())),
                ("db_type", Value::from(native.as_str())),
            ])
        })
        .collect();
    conn.respond("FROM pragma_table_info(?1) c", rows);

    assert_types_round_trip(&schema, "samples");
}

// =============================================================================
// Dialect capabilities
// =============================================================================

fn sqlite_schema() -> (Arc<DryRunConnection>, Schema) {
    let conn = Arc::new(DryRunConnection::new("sqlite"));
    let schema = Schema::from_config(
        SchemaConfig::for_dialect("sqlite"),
        &DialectCatalog::with_builtins(),
        conn.clone(),
    )
    .unwrap();
    (conn, schema)
}

#[test]
fn test_sqlite_alter_column_not_implemented() {
    let (conn, schema) = sqlite_schema();
    conn.respond(
        "sqlite_master",
        vec![Row::from_pairs([("table_name", "notes"), ("table_type", "table")])],
    );
    conn.respond("pragma_foreign_key_list", Vec::new());
    conn.respond(
        "FROM pragma_table_info(?1) c",
        vec![Row::from_pairs([
            ("column_name", Value::from("body")),
            ("db_type", Value::from("TEXT")),
        ])],
    );

    let err = schema
        .update_fields("notes", vec![FieldDescriptor::new("body", "integer")], false)
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotImplemented { .. }));
    assert!(conn.statements().is_empty());
}

#[test]
fn test_sqlite_has_no_procedures() {
    let (_conn, schema) = sqlite_schema();
    let err = schema.get_procedure_names(false).unwrap_err();
    assert!(matches!(err, SchemaError::NotImplemented { .. }));
}

#[test]
fn test_unknown_dialect_rejected() {
    let conn = Arc::new(DryRunConnection::new("mongodb"));
    let err = Schema::from_config(
        SchemaConfig::for_dialect("mongodb"),
        &DialectCatalog::with_builtins(),
        conn,
    )
    .unwrap_err();
    assert!(matches!(err, SchemaError::Config(_)));
}
