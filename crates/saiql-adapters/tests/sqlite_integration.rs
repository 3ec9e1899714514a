//! End-to-end SQLite scenarios over a real database file per test.

use saiql_adapters::{DialectAdapter, SqliteAdapter};
use saiql_core::{MigrationLevel, TriggerTiming};

fn employee_db() -> SqliteAdapter {
    let mut adapter = SqliteAdapter::open_in_memory().unwrap();
    let setup = r#"
        CREATE TABLE departments (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE employees (
            id INTEGER PRIMARY KEY,
            dept_id INTEGER REFERENCES departments(id),
            name TEXT,
            email TEXT,
            salary NUMERIC(10,2),
            active INTEGER DEFAULT 1
        );
        CREATE TABLE projects (
            id INTEGER PRIMARY KEY,
            dept_id INTEGER REFERENCES departments(id),
            title TEXT
        );
        INSERT INTO departments VALUES (1, 'eng'), (2, 'ops');
        INSERT INTO employees VALUES
            (1, 1, 'Alice', 'alice@x.io', 120000, 1),
            (2, 1, 'Bob', 'bob@x.io', 90000, 1),
            (3, 2, 'Charlie', 'charlie@x.io', 60000, 0);
        INSERT INTO projects VALUES (1, 1, 'migration');
    "#;
    let result = adapter.execute_raw(setup);
    assert!(result.success, "{:?}", result.error);
    adapter
}

/// The five-view fixture: one view reads another, the rest stand alone.
fn create_five_views(adapter: &mut SqliteAdapter) {
    let views = r#"
        CREATE VIEW v_active_employees AS
            SELECT id, name, email, salary FROM employees WHERE active = 1;
        CREATE VIEW v_employee_details AS
            SELECT e.id, e.name, d.name AS dept_name
            FROM employees e INNER JOIN departments d ON e.dept_id = d.id;
        CREATE VIEW v_high_salary_employees AS
            SELECT id, name, salary FROM v_active_employees WHERE salary > 100000;
        CREATE VIEW v_dept_employee_count AS
            SELECT dept_id, COUNT(*) AS n FROM employees GROUP BY dept_id;
        CREATE VIEW v_project_summary AS
            SELECT p.id, p.title FROM projects p;
    "#;
    let result = adapter.execute_raw(views);
    assert!(result.success, "{:?}", result.error);
}

#[test]
fn test_list_views_returns_exactly_the_fixture() {
    let mut adapter = employee_db();
    create_five_views(&mut adapter);

    let views = adapter.list_views(None).unwrap();
    let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "v_active_employees",
            "v_dept_employee_count",
            "v_employee_details",
            "v_high_salary_employees",
            "v_project_summary",
        ]
    );
}

#[test]
fn test_topological_order_places_dependency_first() {
    let mut adapter = employee_db();
    create_five_views(&mut adapter);

    let ordered = adapter.topologically_order_views(None).unwrap();
    let names: Vec<&str> = ordered.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names.len(), 5);
    let active = names.iter().position(|n| *n == "v_active_employees").unwrap();
    let high = names
        .iter()
        .position(|n| *n == "v_high_salary_employees")
        .unwrap();
    assert!(active < high, "dependency must be created first: {names:?}");
}

#[test]
fn test_bulk_recreate_all_views_succeeds() {
    let mut adapter = employee_db();
    create_five_views(&mut adapter);

    let views = adapter.list_views(None).unwrap();
    for view in &views {
        let dropped = adapter.drop_view(&view.name);
        assert!(dropped.success, "{:?}", dropped.error);
    }
    assert!(adapter.list_views(None).unwrap().is_empty());

    let outcome = adapter.bulk_create_views_in_order(&views);
    assert!(outcome.success(), "failed: {:?}", outcome.failed);
    assert_eq!(outcome.created.len(), 5);
    assert_eq!(adapter.list_views(None).unwrap().len(), 5);
}

#[test]
fn test_view_definition_round_trip_preserves_results() {
    let mut adapter = employee_db();
    create_five_views(&mut adapter);

    let before = adapter
        .extract_data("v_active_employees", Some("id"), 100)
        .unwrap();

    let definition = adapter
        .get_view_definition("v_active_employees")
        .unwrap()
        .unwrap();
    // v_high_salary_employees depends on it; drop that first.
    assert!(adapter.drop_view("v_high_salary_employees").success);
    assert!(adapter.drop_view("v_active_employees").success);
    assert!(adapter.execute_raw(&definition).success);

    let after = adapter
        .extract_data("v_active_employees", Some("id"), 100)
        .unwrap();
    assert_eq!(before.rows, after.rows);
    assert_eq!(before.stats.row_count, 2);
}

#[test]
fn test_dependencies_distinguish_views_from_tables() {
    let mut adapter = employee_db();
    create_five_views(&mut adapter);

    let deps = adapter.get_view_dependencies("v_high_salary_employees").unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].name, "v_active_employees");
    assert_eq!(deps[0].kind, saiql_core::DependencyKind::View);

    let deps = adapter.get_view_dependencies("v_employee_details").unwrap();
    let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["departments", "employees"]);
    assert!(deps
        .iter()
        .all(|d| d.kind == saiql_core::DependencyKind::Table));
}

#[test]
fn test_behavioural_lowercase_email_trigger() {
    let mut adapter = employee_db();
    // SQLite cannot assign NEW columns in BEFORE triggers; the normalizing
    // write happens in an AFTER trigger instead.
    let normalize = r#"
        CREATE TRIGGER trg_lowercase_email
        AFTER INSERT ON employees
        FOR EACH ROW
        BEGIN
            UPDATE employees SET email = LOWER(email) WHERE id = NEW.id;
        END;
    "#;
    assert!(adapter.execute_raw(normalize).success);

    let insert = adapter.execute_raw(
        "INSERT INTO employees (id, dept_id, name, email) \
         VALUES (10, 1, 'Test', 'TEST_UPPER_10@EXAMPLE.COM')",
    );
    assert!(insert.success, "{:?}", insert.error);

    let extract = adapter.extract_data("employees", Some("id"), 100).unwrap();
    let stored = extract
        .rows
        .iter()
        .find(|r| r.get("id").and_then(|v| v.as_i64()) == Some(10))
        .and_then(|r| r.get("email"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();
    assert_eq!(stored, "test_upper_10@example.com");
}

#[test]
fn test_audit_trigger_listed_as_skipped_with_after_reason() {
    let mut adapter = employee_db();
    let audit = r#"
        CREATE TABLE audit_log (id INTEGER PRIMARY KEY, operation TEXT, row_id INTEGER);
        CREATE TRIGGER trg_audit_employees
        AFTER INSERT ON employees
        FOR EACH ROW
        BEGIN
            INSERT INTO audit_log (operation, row_id) VALUES ('INSERT', NEW.id);
        END;
    "#;
    assert!(adapter.execute_raw(audit).success);

    let skipped = adapter.list_skipped_triggers(None).unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].name, "trg_audit_employees");
    assert_eq!(skipped[0].timing, TriggerTiming::After);
    assert!(skipped[0]
        .classification
        .reason_codes
        .iter()
        .any(|c| c.as_str() == "after trigger"));
}

#[test]
fn test_after_audit_trigger_writes_exactly_one_row() {
    let mut adapter = employee_db();
    let audit = r#"
        CREATE TABLE audit_log (id INTEGER PRIMARY KEY, operation TEXT, new_id INTEGER);
        CREATE TRIGGER trg_audit_employees
        AFTER INSERT ON employees
        FOR EACH ROW
        BEGIN
            INSERT INTO audit_log (operation, new_id) VALUES ('INSERT', NEW.id);
        END;
    "#;
    assert!(adapter.execute_raw(audit).success);

    let insert =
        adapter.execute_raw("INSERT INTO employees (id, dept_id, name) VALUES (42, 1, 'Dana')");
    assert!(insert.success);

    let log = adapter.extract_data("audit_log", Some("id"), 100).unwrap();
    assert_eq!(log.stats.row_count, 1);
    assert_eq!(
        log.rows[0].get("operation").and_then(|v| v.as_str()),
        Some("INSERT")
    );
    assert_eq!(log.rows[0].get("new_id").and_then(|v| v.as_i64()), Some(42));
}

#[test]
fn test_sqlite_l3_dependency_analysis() {
    let adapter = SqliteAdapter::open_in_memory().unwrap();

    let analysis = adapter
        .analyze_function_dependencies("SELECT JSON_OBJECT('key', value), UPPER(name) FROM t");
    assert_eq!(analysis.json_extension, vec!["json_object"]);
    assert_eq!(analysis.builtin, vec!["upper"]);
    assert!(analysis.is_safe);
    assert!(analysis.needs_extension);

    let analysis = adapter.analyze_function_dependencies("SELECT my_custom_udf(v) FROM t");
    assert!(!analysis.is_safe);
    assert_eq!(analysis.unknown, vec!["my_custom_udf"]);
}

#[test]
fn test_all_function_dependencies_keyed_by_object() {
    let mut adapter = employee_db();
    assert!(adapter
        .execute_raw("CREATE VIEW v_upper AS SELECT UPPER(name) AS n FROM employees")
        .success);

    let all = adapter.all_function_dependencies().unwrap();
    let view = all.get("v_upper").unwrap();
    assert_eq!(view.builtin, vec!["upper"]);
    assert!(view.is_safe);
}

#[test]
fn test_timeout_free_repeat_extraction_is_bit_identical() {
    let mut adapter = employee_db();
    let a = adapter.extract_data("employees", None, 2).unwrap();
    let b = adapter.extract_data("employees", None, 2).unwrap();
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.stats.order_key_used, b.stats.order_key_used);
    // Chunked: 3 rows at chunk size 2 means two fetches.
    assert_eq!(a.stats.chunks, 2);
}

#[test]
fn test_unsupported_l3_surface_is_flagged_not_thrown() {
    let mut adapter = employee_db();
    assert!(!adapter.supports(MigrationLevel::L3));
    let err = adapter.list_routines(None).unwrap_err();
    assert!(err.to_string().contains("does not support l3"));
}
