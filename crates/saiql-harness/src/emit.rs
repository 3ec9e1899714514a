//! Target-side DDL composition from the dialect-neutral IR.
//!
//! Emission goes through the type registry for every column; the harness
//! never copies native type strings between engines.

use saiql_adapters::DialectAdapter;
use saiql_core::{registry, Dialect, ForeignKey, IndexDef, TableSchema};

/// Build a `CREATE TABLE` statement for the target dialect.
///
/// Primary keys are declared inline when `with_constraints` is set. SQLite
/// additionally gets its foreign keys inline, because it cannot add them
/// after the fact.
pub fn build_create_table(
    target: Dialect,
    table: &str,
    schema: &TableSchema,
    with_constraints: bool,
) -> String {
    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|column| {
            let rendered = registry::render_type(target, &column.type_info);
            let nullability = if column.nullable { "" } else { " NOT NULL" };
            format!("    {} {}{}", column.name, rendered, nullability)
        })
        .collect();

    if with_constraints && !schema.pk.is_empty() {
        parts.push(format!("    PRIMARY KEY ({})", schema.pk.join(", ")));
    }
    if with_constraints && target == Dialect::Sqlite {
        for fk in &schema.fks {
            parts.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, fk.ref_table, fk.ref_column
            ));
        }
    }

    format!("CREATE TABLE {} (\n{}\n)", table, parts.join(",\n"))
}

/// Build a `CREATE INDEX` statement. Primary-key indexes are never emitted;
/// the table declaration owns those.
pub fn build_create_index(table: &str, index: &IndexDef) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        index.name,
        table,
        index.columns.join(", ")
    )
}

/// Build an `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` statement for
/// targets that support post-hoc constraints.
pub fn build_add_foreign_key(table: &str, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
        table, fk.constraint_name, fk.column, fk.ref_table, fk.ref_column
    )
}

/// Build a parameterised INSERT in the adapter's placeholder style.
pub fn build_insert(adapter: &dyn DialectAdapter, table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len())
        .map(|idx| adapter.placeholder(idx))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use saiql_core::{Column, IrType, TypeInfo};

    fn sample_schema() -> TableSchema {
        TableSchema {
            columns: vec![
                Column {
                    name: "id".into(),
                    native_type: "integer".into(),
                    type_info: TypeInfo::new(IrType::Integer),
                    nullable: false,
                    default: None,
                    is_unsupported: false,
                },
                Column {
                    name: "email".into(),
                    native_type: "varchar(100)".into(),
                    type_info: TypeInfo::new(IrType::Varchar).with_length(100),
                    nullable: true,
                    default: None,
                    is_unsupported: false,
                },
            ],
            pk: vec!["id".into()],
            fks: vec![ForeignKey {
                constraint_name: "fk_orders_customer".into(),
                column: "id".into(),
                ref_table: "customers".into(),
                ref_column: "id".into(),
            }],
            unique_constraints: vec![],
            indexes: vec![],
        }
    }

    #[test]
    fn test_create_table_postgres() {
        let sql = build_create_table(Dialect::Postgres, "orders", &sample_schema(), true);
        assert!(sql.contains("id INTEGER NOT NULL"));
        assert!(sql.contains("email VARCHAR(100)"));
        assert!(sql.contains("PRIMARY KEY (id)"));
        // Postgres foreign keys are added post-hoc, not inline.
        assert!(!sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_create_table_sqlite_inlines_foreign_keys() {
        let sql = build_create_table(Dialect::Sqlite, "orders", &sample_schema(), true);
        assert!(sql.contains("FOREIGN KEY (id) REFERENCES customers(id)"));
        // Types collapse to storage classes.
        assert!(sql.contains("email TEXT"));
    }

    #[test]
    fn test_create_table_without_constraints() {
        let sql = build_create_table(Dialect::Postgres, "orders", &sample_schema(), false);
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_create_index() {
        let index = IndexDef {
            name: "ix_orders_email".into(),
            columns: vec!["email".into()],
            unique: true,
            primary: false,
        };
        assert_eq!(
            build_create_index("orders", &index),
            "CREATE UNIQUE INDEX ix_orders_email ON orders (email)"
        );
    }

    #[test]
    fn test_add_foreign_key() {
        let fk = ForeignKey {
            constraint_name: "fk_orders_customer".into(),
            column: "customer_id".into(),
            ref_table: "customers".into(),
            ref_column: "id".into(),
        };
        assert_eq!(
            build_add_foreign_key("orders", &fk),
            "ALTER TABLE orders ADD CONSTRAINT fk_orders_customer \
             FOREIGN KEY (customer_id) REFERENCES customers(id)"
        );
    }
}
