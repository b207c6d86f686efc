//! Overlaying stored extras onto discovered tables.
//!
//! Every function here is pure: it takes the discovered table and the extras
//! rows and returns the merged table. The [`Schema`](super::Schema) fetches
//! the rows and decides when to merge.

use crate::core::{ColumnSchema, RelationSchema, TableSchema};
use crate::extras::{FieldExtras, RelatedExtras, TableExtras};

/// Overlay field extras of this table.
///
/// Physical columns keep their catalog attributes. Virtual column extras with
/// no physical counterpart become virtual columns, quoted with `quote`. Every
/// virtual foreign key yields a virtual `belongs_to` relation.
pub fn merge_field_extras(
    table: &TableSchema,
    extras: &[FieldExtras],
    quote: impl Fn(&str) -> String,
) -> TableSchema {
    let mut out = table.clone();
    for extra in extras {
        let column = match out.column(&extra.field) {
            Some(existing) => existing.merge_extras(extra),
            None if extra.is_virtual_column() => {
                ColumnSchema::from_virtual_extras(extra, quote(&extra.field))
            }
            // Extras for a column that no longer exists.
            None => continue,
        };
        out.add_column(column);

        if extra.is_virtual_foreign_key {
            if let Some(ref_table) = extra.ref_table.as_deref() {
                let mut rel = RelationSchema::belongs_to(
                    &extra.field,
                    ref_table,
                    extra.ref_field.as_deref().unwrap_or("id"),
                )
                .into_virtual(foreign_service(extra));
                rel.ref_on_update = extra.ref_on_update.clone();
                rel.ref_on_delete = extra.ref_on_delete.clone();
                out.add_relation(rel);
            }
        }
    }
    out
}

/// Reciprocal relations for virtual foreign keys on other tables that point
/// at this one.
///
/// `referenced` holds those foreign keys; `junction_extras` returns the field
/// extras of a referencing table, used to find a second virtual foreign key
/// that turns it into a junction.
pub fn merge_referenced_extras(
    table: &TableSchema,
    referenced: &[FieldExtras],
    junction_extras: impl Fn(&str) -> Vec<FieldExtras>,
) -> TableSchema {
    let mut out = table.clone();
    for extra in referenced.iter().filter(|e| e.is_virtual_foreign_key) {
        let field = extra.ref_field.as_deref().unwrap_or("id");
        let rel = RelationSchema::has_many(field, &extra.table, &extra.field).into_virtual(None);
        if out.relation(&rel.name).is_none() {
            out.add_relation(rel);
        }

        // A junction linking the table to itself is ignored.
        if extra.table.eq_ignore_ascii_case(&table.name) {
            continue;
        }
        for other in junction_extras(&extra.table).iter().filter(|o| {
            o.is_virtual_foreign_key
                && !o.field.eq_ignore_ascii_case(&extra.field)
                && o.ref_table
                    .as_deref()
                    .map(|t| !t.eq_ignore_ascii_case(&table.name))
                    .unwrap_or(false)
        }) {
            let Some(ref_table) = other.ref_table.as_deref() else {
                continue;
            };
            let rel = RelationSchema::many_many(
                field,
                ref_table,
                other.ref_field.as_deref().unwrap_or("id"),
                &extra.table,
                &extra.field,
                &other.field,
            )
            .into_virtual(foreign_service(other));
            if out.relation(&rel.name).is_none() {
                out.add_relation(rel);
            }
        }
    }
    out
}

/// Overlay relationship extras by relation name.
pub fn merge_related_extras(table: &TableSchema, extras: &[RelatedExtras]) -> TableSchema {
    let mut out = table.clone();
    for extra in extras {
        if let Some(rel) = out.relation(&extra.relationship) {
            let merged = rel.merge_extras(extra);
            out.add_relation(merged);
        }
    }
    out
}

/// Overlay the table-level extras row for this table, if one is present.
pub fn apply_table_extras(table: &TableSchema, extras: &[TableExtras]) -> TableSchema {
    match extras
        .iter()
        .find(|e| e.table.eq_ignore_ascii_case(&table.name))
    {
        Some(extra) => table.merge_extras(extra),
        None => table.clone(),
    }
}

fn foreign_service(extra: &FieldExtras) -> Option<String> {
    if extra.is_foreign_ref_service {
        extra.ref_service.clone()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbFunction, RelationType, SimpleType};

    fn users() -> TableSchema {
        let mut t = TableSchema::stub("", "users", "", false);
        let mut id = ColumnSchema::new("id");
        id.apply_db_type("int");
        id.is_primary_key = true;
        t.add_column(id);
        let mut team = ColumnSchema::new("team_id");
        team.apply_db_type("int");
        t.add_column(team);
        t
    }

    fn virtual_fk(table: &str, field: &str, ref_table: &str) -> FieldExtras {
        FieldExtras {
            table: table.into(),
            field: field.into(),
            is_virtual_foreign_key: true,
            ref_table: Some(ref_table.into()),
            ref_field: Some("id".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_field_extras_keep_physical_attributes() {
        let extra = FieldExtras {
            table: "users".into(),
            field: "ID".into(),
            label: Some("Key".into()),
            ..Default::default()
        };
        let merged = merge_field_extras(&users(), &[extra], |n| format!("`{}`", n));
        let id = merged.column("id").unwrap();
        assert_eq!(id.label.as_deref(), Some("Key"));
        assert!(id.is_primary_key);
        assert_eq!(merged.columns.len(), 2);
    }

    #[test]
    fn test_virtual_column_and_virtual_fk() {
        let full_name = FieldExtras {
            table: "users".into(),
            field: "full_name".into(),
            extra_type: Some(SimpleType::Virtual),
            db_function: Some(DbFunction {
                function: "CONCAT(first, last)".into(),
                return_type: Some(SimpleType::String),
                aggregate: false,
            }),
            ..Default::default()
        };
        let extras = vec![full_name, virtual_fk("users", "team_id", "teams")];
        let merged = merge_field_extras(&users(), &extras, |n| format!("`{}`", n));

        let col = merged.column("full_name").unwrap();
        assert!(col.is_virtual);
        assert_eq!(col.quoted_name, "`full_name`");

        let rel = merged.relation("teams_by_team_id").unwrap();
        assert!(rel.is_virtual);
        assert_eq!(rel.relation_type, RelationType::BelongsTo);
        assert!(merged.column("team_id").unwrap().is_virtual_foreign_key);
    }

    #[test]
    fn test_extras_for_missing_physical_column_are_ignored() {
        let extra = FieldExtras {
            table: "users".into(),
            field: "gone".into(),
            label: Some("Gone".into()),
            ..Default::default()
        };
        let merged = merge_field_extras(&users(), &[extra], |n| n.to_string());
        assert!(merged.column("gone").is_none());
    }

    #[test]
    fn test_referenced_extras_build_has_many_and_many_many() {
        let teams = TableSchema::stub("", "teams", "", false);
        let referenced = vec![virtual_fk("membership", "team_id", "teams")];
        let junction = vec![
            virtual_fk("membership", "team_id", "teams"),
            virtual_fk("membership", "user_id", "users"),
        ];
        let merged = merge_referenced_extras(&teams, &referenced, |t| {
            assert_eq!(t, "membership");
            junction.clone()
        });
        assert!(merged.relation("membership_by_team_id").is_some());
        let mm = merged.relation("users_by_membership").unwrap();
        assert_eq!(mm.relation_type, RelationType::ManyMany);
        assert_eq!(mm.junction_field.as_deref(), Some("team_id"));
        assert_eq!(mm.junction_ref_field.as_deref(), Some("user_id"));
    }

    #[test]
    fn test_related_and_table_extras() {
        let mut t = users();
        t.add_relation(RelationSchema::belongs_to("team_id", "teams", "id"));
        let related = RelatedExtras {
            table: "users".into(),
            relationship: "TEAMS_BY_TEAM_ID".into(),
            always_fetch: true,
            ..Default::default()
        };
        let t = merge_related_extras(&t, &[related]);
        assert!(t.fetch_requires_relations());

        let extras = TableExtras {
            table: "Users".into(),
            label: Some("People".into()),
            ..Default::default()
        };
        let t = apply_table_extras(&t, &[extras]);
        assert_eq!(t.display_label(), "People");
    }
}
