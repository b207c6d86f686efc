//! Relationship inference from flat foreign key rows.
//!
//! Given every FK row of a schema, a table gets:
//!
//! - `belongs_to` for each single-column FK it owns,
//! - `has_many` for each single-column FK pointing at it,
//! - `many_many` for each junction: a table J with an FK to this table and
//!   another FK to some table B yields this ↔ B through J.
//!
//! Composite (multi-column) constraints flag their columns and fill the
//! `foreign_keys` map but produce no relations. Junctions linking a table to
//! itself are ignored. When a self-referencing FK gives a `belongs_to` and a
//! `has_many` the same name, the `belongs_to` is kept.

use std::collections::HashMap;

use crate::core::{
    ConstraintRow, ForeignKeyRef, PrimaryKey, RelationSchema, SimpleType, TableSchema,
};

/// Public name of a referenced table relative to the default schema.
fn public_name(schema: &str, table: &str, default_schema: &str) -> String {
    if schema.is_empty() || schema.eq_ignore_ascii_case(default_schema) {
        table.to_string()
    } else {
        format!("{}.{}", schema, table)
    }
}

fn constraint_key(row: &ConstraintRow) -> (String, String, String) {
    (
        row.table_schema.to_ascii_lowercase(),
        row.table_name.to_ascii_lowercase(),
        row.constraint_name.to_ascii_lowercase(),
    )
}

/// Rows belonging to single-column constraints.
///
/// Rows without a constraint name are treated as single-column.
fn single_column_rows(constraints: &[ConstraintRow]) -> Vec<&ConstraintRow> {
    let mut counts: HashMap<(String, String, String), usize> = HashMap::new();
    for row in constraints.iter().filter(|r| !r.constraint_name.is_empty()) {
        *counts.entry(constraint_key(row)).or_default() += 1;
    }
    constraints
        .iter()
        .filter(|r| {
            r.constraint_name.is_empty()
                || counts.get(&constraint_key(r)).copied().unwrap_or(0) <= 1
        })
        .collect()
}

fn same_table(schema_a: &str, table_a: &str, schema_b: &str, table_b: &str) -> bool {
    schema_a.eq_ignore_ascii_case(schema_b) && table_a.eq_ignore_ascii_case(table_b)
}

/// Flag FK columns, fill `foreign_keys` and add inferred relations to `table`.
pub fn build_table_relations(
    table: &mut TableSchema,
    constraints: &[ConstraintRow],
    default_schema: &str,
) {
    // Column flags for every constraint on this table, composite included.
    let owned: Vec<&ConstraintRow> = constraints.iter().filter(|r| r.is_on(table)).collect();
    for row in owned {
        let ref_table = public_name(
            &row.referenced_table_schema,
            &row.referenced_table_name,
            default_schema,
        );
        if let Some(column) = table.column(&row.column_name).cloned() {
            let mut column = column;
            column.is_foreign_key = true;
            column.ref_table = Some(ref_table.clone());
            column.ref_field = Some(row.referenced_column_name.clone());
            column.ref_on_update = row.update_rule.clone();
            column.ref_on_delete = row.delete_rule.clone();
            table.add_column(column);
        }
        table.foreign_keys.insert(
            row.column_name.to_ascii_lowercase(),
            ForeignKeyRef {
                constraint_name: row.constraint_name.clone(),
                ref_table,
                ref_field: row.referenced_column_name.clone(),
            },
        );
    }
    promote_key_types(table);

    let singles = single_column_rows(constraints);
    let (owned, referencing): (Vec<&ConstraintRow>, Vec<&ConstraintRow>) = (
        singles.iter().copied().filter(|r| r.is_on(table)).collect(),
        singles.iter().copied().filter(|r| r.references(table)).collect(),
    );

    for row in owned {
        let mut rel = RelationSchema::belongs_to(
            &row.column_name,
            &public_name(
                &row.referenced_table_schema,
                &row.referenced_table_name,
                default_schema,
            ),
            &row.referenced_column_name,
        );
        rel.ref_on_update = row.update_rule.clone();
        rel.ref_on_delete = row.delete_rule.clone();
        table.add_relation(rel);
    }

    for row in referencing {
        let junction = public_name(&row.table_schema, &row.table_name, default_schema);
        let rel = RelationSchema::has_many(
            &row.referenced_column_name,
            &junction,
            &row.column_name,
        );
        add_if_absent(table, rel);

        // The referencing table is a junction candidate unless it is this table.
        if row.is_on(table) {
            continue;
        }
        for other in singles.iter().filter(|o| {
            same_table(&o.table_schema, &o.table_name, &row.table_schema, &row.table_name)
                && !o.column_name.eq_ignore_ascii_case(&row.column_name)
        }) {
            if same_table(
                &other.referenced_table_schema,
                &other.referenced_table_name,
                &table.schema_name,
                &table.table_name,
            ) {
                continue;
            }
            let rel = RelationSchema::many_many(
                &row.referenced_column_name,
                &public_name(
                    &other.referenced_table_schema,
                    &other.referenced_table_name,
                    default_schema,
                ),
                &other.referenced_column_name,
                &junction,
                &row.column_name,
                &other.column_name,
            );
            add_if_absent(table, rel);
        }
    }
}

fn add_if_absent(table: &mut TableSchema, rel: RelationSchema) {
    if table.relation(&rel.name).is_none() {
        table.add_relation(rel);
    }
}

/// Integer single-column primary keys become `id`; integer FK columns become
/// `reference`. A column that is both stays `id`.
pub fn promote_key_types(table: &mut TableSchema) {
    let single_pk = match &table.primary_key {
        PrimaryKey::Single(name) => Some(name.to_ascii_lowercase()),
        _ => None,
    };
    for column in table.columns.iter_mut() {
        if column.column_type != SimpleType::Integer {
            continue;
        }
        let is_single_pk = single_pk
            .as_deref()
            .map(|pk| column.name.eq_ignore_ascii_case(pk))
            .unwrap_or(false);
        if is_single_pk && column.is_primary_key {
            column.column_type = SimpleType::Id;
        } else if column.is_foreign_key {
            column.column_type = SimpleType::Reference;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnSchema, RelationType};

    fn fk(name: &str, table: &str, column: &str, ref_table: &str, ref_column: &str) -> ConstraintRow {
        ConstraintRow {
            constraint_name: name.into(),
            table_schema: "app".into(),
            table_name: table.into(),
            column_name: column.into(),
            referenced_table_schema: "app".into(),
            referenced_table_name: ref_table.into(),
            referenced_column_name: ref_column.into(),
            update_rule: Some("NO ACTION".into()),
            delete_rule: Some("CASCADE".into()),
        }
    }

    fn table(name: &str, columns: &[&str]) -> TableSchema {
        let mut t = TableSchema::stub("app", name, "app", false);
        for c in columns {
            let mut col = ColumnSchema::new(*c);
            col.apply_db_type("int(11)");
            if *c == "id" {
                col.is_primary_key = true;
                col.auto_increment = true;
            }
            t.add_column(col);
        }
        if t.column("id").is_some() {
            t.primary_key = PrimaryKey::Single("id".into());
        }
        t
    }

    #[test]
    fn test_belongs_to_and_has_many_symmetry() {
        let rows = vec![fk("fk_a_x", "a", "x", "b", "id")];

        let mut a = table("a", &["id", "x"]);
        build_table_relations(&mut a, &rows, "app");
        assert_eq!(a.relation_names(), vec!["b_by_x"]);
        let rel = a.relation("b_by_x").unwrap();
        assert_eq!(rel.relation_type, RelationType::BelongsTo);
        assert_eq!(rel.ref_on_delete.as_deref(), Some("CASCADE"));
        let x = a.column("x").unwrap();
        assert!(x.is_foreign_key);
        assert_eq!(x.column_type, SimpleType::Reference);
        assert_eq!(a.column("id").unwrap().column_type, SimpleType::Id);
        assert_eq!(a.foreign_keys["x"].ref_table, "b");

        let mut b = table("b", &["id"]);
        build_table_relations(&mut b, &rows, "app");
        assert_eq!(b.relation_names(), vec!["a_by_x"]);
        assert_eq!(b.relations[0].relation_type, RelationType::HasMany);
        assert_eq!(b.relations[0].field, "id");
        assert_eq!(b.relations[0].ref_field, "x");
    }

    #[test]
    fn test_many_many_through_junction() {
        let rows = vec![
            fk("fk_j_a", "j", "a_id", "a", "id"),
            fk("fk_j_b", "j", "b_id", "b", "id"),
        ];

        let mut a = table("a", &["id"]);
        build_table_relations(&mut a, &rows, "app");
        let mm = a.relation("b_by_j").unwrap();
        assert_eq!(mm.relation_type, RelationType::ManyMany);
        assert_eq!(mm.junction_field.as_deref(), Some("a_id"));
        assert_eq!(mm.junction_ref_field.as_deref(), Some("b_id"));
        assert!(mm.validate().is_ok());
        assert!(a.relation("j_by_a_id").is_some());

        let mut b = table("b", &["id"]);
        build_table_relations(&mut b, &rows, "app");
        let mm = b.relation("a_by_j").unwrap();
        assert_eq!(mm.junction_field.as_deref(), Some("b_id"));
    }

    #[test]
    fn test_composite_constraints_infer_no_relations() {
        let rows = vec![
            fk("fk_line_order", "line", "order_id", "orders", "id"),
            fk("fk_line_order", "line", "order_rev", "orders", "rev"),
        ];
        let mut line = table("line", &["id", "order_id", "order_rev"]);
        build_table_relations(&mut line, &rows, "app");
        assert!(line.relations.is_empty());
        assert!(line.column("order_id").unwrap().is_foreign_key);
        assert_eq!(line.foreign_keys.len(), 2);
    }

    #[test]
    fn test_self_reference_keeps_belongs_to() {
        let rows = vec![
            fk("fk_emp_mgr", "employee", "manager_id", "employee", "id"),
            fk("fk_emp_dept", "employee", "dept_id", "dept", "id"),
        ];
        let mut emp = table("employee", &["id", "manager_id", "dept_id"]);
        build_table_relations(&mut emp, &rows, "app");
        let names = emp.relation_names();
        assert!(names.contains(&"employee_by_manager_id"));
        assert_eq!(
            emp.relation("employee_by_manager_id").unwrap().relation_type,
            RelationType::BelongsTo
        );
        // employee is not a junction for itself.
        assert!(emp.relation("dept_by_employee").is_none());
    }

    #[test]
    fn test_other_schema_names_are_qualified() {
        let mut row = fk("fk_a_x", "a", "x", "b", "id");
        row.referenced_table_schema = "crm".into();
        let mut a = table("a", &["id", "x"]);
        build_table_relations(&mut a, &[row], "app");
        assert_eq!(a.relation_names(), vec!["crm.b_by_x"]);
    }
}
