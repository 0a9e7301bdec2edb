use chrono::{Duration, NaiveDateTime};
use labsql::error::{ErrorKind, LabError};
use labsql::prelude::*;
use labsql::sqlite_functions::register_functions;
use labsql::transpiler::params::{count_markers, EMBEDDED_MARKER};
use pretty_assertions::assert_eq;
use rusqlite::Connection;

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const START: &str = "2023-01-01 00:00:00";

fn connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    register_functions(&conn).unwrap();
    conn.execute_batch(
        "create table runs (id integer, started_at text, ended_at text);
         insert into runs values (1, '2023-01-01 00:00:00', '2023-01-01 00:01:00');",
    )
    .unwrap();
    conn
}

fn eval<T: rusqlite::types::FromSql>(conn: &Connection, sql: &str) -> T {
    conn.query_row(sql, [], |r| r.get(0)).unwrap()
}

fn shifted(seconds: i64) -> String {
    let start = NaiveDateTime::parse_from_str(START, FORMAT).unwrap();
    (start + Duration::seconds(seconds)).format(FORMAT).to_string()
}

fn kind(err: LabError) -> ErrorKind {
    match err {
        LabError::Translation { source, .. } => source.kind(),
        other => panic!("expected a translation error, got {other}"),
    }
}

#[test]
fn test_clean_queries_unchanged() {
    let clean = [
        "select id, started_at from runs where id = 1",
        "select count(*) from runs group by id having count(*) > 1 order by id desc",
        "insert into runs (id, started_at) values (2, '2023-02-01')",
        "select 'hte_data' as schema_name, a -- b from runs",
    ];
    for sql in clean {
        assert_eq!(labsql::translate(sql).unwrap(), sql);
    }
}

#[test]
fn test_interval_matches_mysql_semantics() {
    let sql = labsql::translate("select (started_at + interval 30 second) from runs").unwrap();
    assert_eq!(
        sql,
        "select datetime(started_at, '+' || 30 || ' seconds') from runs"
    );

    let conn = connection();
    assert_eq!(eval::<String>(&conn, &sql), shifted(30));
}

#[test]
fn test_chained_intervals_apply_in_order() {
    let sql =
        labsql::translate("select (started_at - interval 5 second - interval 2 second) from runs").unwrap();
    assert_eq!(
        sql,
        "select datetime(started_at, '-' || 5 || ' seconds', '-' || 2 || ' seconds') from runs"
    );

    let conn = connection();
    assert_eq!(eval::<String>(&conn, &sql), shifted(-7));
}

#[test]
fn test_timestampdiff_seconds() {
    let sql =
        labsql::translate("select timestampdiff(SECOND, started_at, ended_at) from runs").unwrap();
    assert_eq!(
        sql,
        "select ((julianday(ended_at) - julianday(started_at)) * 86400) from runs"
    );

    let conn = connection();
    let seconds: f64 = eval(&conn, &sql);
    assert!((seconds - 60.0).abs() < 1e-3, "got {seconds}");
}

#[test]
fn test_timestampdiff_other_units_rejected() {
    for unit in ["MINUTE", "HOUR", "DAY"] {
        let query = format!("select timestampdiff({unit}, started_at, ended_at) from runs");
        let err = labsql::translate(&query).unwrap_err();
        assert_eq!(kind(err), ErrorKind::UnsupportedConstruct, "{unit}");
    }
}

#[test]
fn test_quoted_comment_marker_protected() {
    let conn = connection();

    let sql = labsql::translate("SELECT '#notacomment' AS x # real comment").unwrap();
    assert_eq!(sql, "SELECT '#notacomment' AS x /* real comment*/");
    assert_eq!(eval::<String>(&conn, &sql), "#notacomment");

    // already a SQLite comment: nothing to do
    let sql = labsql::translate("SELECT '#notacomment' AS x -- real #comment").unwrap();
    assert_eq!(sql, "SELECT '#notacomment' AS x -- real #comment");
    assert_eq!(eval::<String>(&conn, &sql), "#notacomment");
}

#[test]
fn test_block_comment_with_marker_keeps_statement() {
    let db = EmbeddedDb::open_in_memory(Translator::default()).unwrap();
    db.connection()
        .execute_batch("create table runs (t text); insert into runs values ('a'), ('b');")
        .unwrap();

    let rows = db
        .query("/* see issue #12 */ select t from hte_data.runs order by t", &[])
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = db
        .query("select t # add an interval later\nfrom runs where t = %s", &[LabValue::from("b")])
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_negative_interval_amounts() {
    let conn = connection();
    let cases = [
        ("(started_at - interval -5 second)", 5),
        ("(started_at + interval -5 second)", -5),
        ("(started_at - interval (id - 11) second)", 10),
        ("(started_at + interval id second - interval -id second)", 2),
    ];
    for (expr, seconds) in cases {
        let sql = labsql::translate(&format!("select {expr} from runs")).unwrap();
        assert_eq!(eval::<String>(&conn, &sql), shifted(seconds), "{sql}");
    }
}

#[test]
fn test_marker_count_preserved() {
    for n in 0..8 {
        let conditions: Vec<String> = (0..n).map(|i| format!("c{i} = %s")).collect();
        let filters: String = conditions.iter().map(|c| format!(" and {c}")).collect();
        let query = format!("select * from hte_data.runs where 1 = 1{filters}");
        let sql = labsql::translate(&query).unwrap();
        assert_eq!(count_markers(&query), n);
        assert_eq!(sql.matches(EMBEDDED_MARKER).count(), n);
        assert_eq!(count_markers(&sql), 0);
    }
}

#[test]
fn test_stdev_aggregate_through_translation() {
    let db = EmbeddedDb::open_in_memory(Translator::default()).unwrap();
    db.connection()
        .execute_batch(
            "create table v (x real);
             insert into v values (2), (4), (4), (4), (5), (5), (7), (9);",
        )
        .unwrap();

    let row = db.query_one("select std(x) as sd from hte_data.v", &[]).unwrap();
    let sd = row["sd"].as_f64().unwrap();
    assert!((sd - (32.0f64 / 6.0).sqrt()).abs() < 1e-9);

    let row = db
        .query_one("select stddev(x) as sd from hte_data.v where x < %s", &[LabValue::Int(4)])
        .unwrap();
    assert_eq!(row["sd"], serde_json::Value::Null);
}

#[test]
fn test_schema_qualifier_stripped() {
    assert_eq!(
        labsql::translate("select * from hte_data.exp_sfc").unwrap(),
        "select * from exp_sfc"
    );
    let untouched = "select * from hte_data_exp_sfc, my_hte_data";
    assert_eq!(labsql::translate(untouched).unwrap(), untouched);
}

#[test]
fn test_batch_isolation_left_to_caller() {
    let db = EmbeddedDb::open_in_memory(Translator::default()).unwrap();
    let statements = [
        "select 1",
        "select timestampdiff(HOUR, a, b)",
        "select if(1, 'y', 'n')",
    ];
    let results: Vec<_> = statements.iter().map(|s| db.verify(s)).collect();

    assert!(results[0].is_ok());
    match &results[1] {
        Err(LabError::Translation { query, .. }) => assert_eq!(query, statements[1]),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(results[2].as_deref().unwrap(), "select iif(1, 'y', 'n')");
}

#[test]
fn test_view_ported_into_embedded_db() {
    let db = EmbeddedDb::open_in_memory(Translator::default()).unwrap();
    db.connection()
        .execute_batch("create table runs (id integer, ok integer); insert into runs values (1, 1), (2, 0);")
        .unwrap();
    let sql = db
        .create_view(
            "CREATE ALGORITHM=UNDEFINED DEFINER=`lab`@`%` SQL SECURITY DEFINER VIEW `hte_data`.`v_runs` AS \
             select `r`.`id` AS `id`,if(`r`.`ok`,'ok','failed') AS `state` from `hte_data`.`runs` `r`",
        )
        .unwrap();
    assert!(sql.starts_with("CREATE VIEW `v_runs` AS"));

    let rows = db.query("select state from hte_data.v_runs order by id", &[]).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["state"], "failed");
}
