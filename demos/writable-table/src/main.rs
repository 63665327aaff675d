mod cli;

use crate::cli::Args;
use clap::Parser;
use log::{debug, info, warn};
use osquery_writable_table::plugin::Operator;
use osquery_writable_table::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type Row = BTreeMap<String, String>;

struct Store {
    rows: BTreeMap<u64, Row>,
    next_id: u64,
}

impl Store {
    fn insert(&mut self, row: Row) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row);
        id
    }
}

/// In-memory `example_table`, seeded with a single row.
struct ExampleTable {
    store: Mutex<Store>,
}

impl ExampleTable {
    fn new() -> Self {
        let mut store = Store {
            rows: BTreeMap::new(),
            next_id: 1,
        };
        store.insert(row(&[
            ("text", "hello world"),
            ("integer", "123"),
            ("big_int", "-1234567890"),
            ("double", "3.14159"),
        ]));

        Self {
            store: Mutex::new(store),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, CallbackError> {
        self.store
            .lock()
            .map_err(|_| CallbackError::failed("table storage is poisoned"))
    }
}

impl WritableTable for ExampleTable {
    fn name(&self) -> String {
        "example_table".to_string()
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::text("text"),
            ColumnDef::integer("integer"),
            ColumnDef::big_int("big_int"),
            ColumnDef::double("double"),
        ]
    }

    fn generate(&self, ctx: &CallContext, query: QueryContext) -> TableResult {
        ctx.check()?;
        debug!("generating example_table, columns used: {:?}", query.columns_used());

        Ok(self.store()?.rows.values().cloned().collect())
    }

    fn insert(&self, ctx: &CallContext, values: ValueArrayJson) -> TableResult {
        ctx.check()?;
        info!("inserting item: {:?}", values.values());

        let columns = self.columns();
        if values.len() != columns.len() {
            return Err(CallbackError::failed(format!(
                "expected {} values, got {}",
                columns.len(),
                values.len()
            )));
        }

        let new_row = values
            .with_columns(&columns)
            .map(|(column, value)| Ok((column.name().to_string(), render(column, value)?)))
            .collect::<Result<Row, CallbackError>>()?;

        let id = self.store()?.insert(new_row);
        Ok(vec![row(&[("id", id.to_string().as_str()), ("status", "success")])])
    }

    fn delete(&self, ctx: &CallContext, query: QueryContext) -> TableResult {
        ctx.check()?;
        info!("deleting from example_table: {query:?}");

        let mut store = self.store()?;
        let mut doomed = Vec::new();
        for (id, stored) in &store.rows {
            if matches_equalities(&query, stored)? {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            store.rows.remove(id);
        }
        debug!("deleted {} rows", doomed.len());

        Ok(vec![row(&[("status", "success")])])
    }
}

fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Renders one inserted value in the textual form osquery reads rows in.
fn render(column: &ColumnDef, value: &Value) -> Result<String, CallbackError> {
    let mismatch = || {
        CallbackError::failed(format!(
            "column {}: expected {}, got {value}",
            column.name(),
            column.column_type()
        ))
    };

    match (column.column_type(), value) {
        (_, Value::Null) => Ok(String::new()),
        (ColumnType::Text, Value::String(s)) => Ok(s.clone()),
        (ColumnType::Text, other) => Ok(other.to_string()),
        (ColumnType::Integer, Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(|v| v.to_string())
            .ok_or_else(mismatch),
        (ColumnType::Integer, Value::String(s)) => s
            .parse::<i32>()
            .map(|v| v.to_string())
            .map_err(|_| mismatch()),
        (ColumnType::BigInt, Value::Number(n)) => {
            n.as_i64().map(|v| v.to_string()).ok_or_else(mismatch)
        }
        (ColumnType::BigInt, Value::String(s)) => s
            .parse::<i64>()
            .map(|v| v.to_string())
            .map_err(|_| mismatch()),
        (ColumnType::Double, Value::Number(n)) => {
            n.as_f64().map(|v| v.to_string()).ok_or_else(mismatch)
        }
        (ColumnType::Double, Value::String(s)) => s
            .parse::<f64>()
            .map(|v| v.to_string())
            .map_err(|_| mismatch()),
        _ => Err(mismatch()),
    }
}

// A row matches when every constraint holds. Operators other than equality
// are an error.
fn matches_equalities(query: &QueryContext, stored: &Row) -> Result<bool, CallbackError> {
    for (column, list) in query.constraints() {
        for constraint in list.iter() {
            if constraint.op() != Operator::Equals {
                return Err(CallbackError::failed(format!(
                    "unsupported delete constraint {:?} on column {column}",
                    constraint.op()
                )));
            }
            if stored.get(column).map(String::as_str) != Some(constraint.expr()) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn call_context(timeout: Option<Duration>) -> CallContext {
    match timeout {
        Some(timeout) => CallContext::new().with_timeout(timeout),
        None => CallContext::new(),
    }
}

fn write_response<W: Write>(out: &mut W, response: &ExtensionResponse) -> io::Result<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()
}

/// Answers every newline-delimited JSON request from `input`, one response per line.
fn serve<R: BufRead, W: Write>(
    plugin: &TablePlugin,
    timeout: Option<Duration>,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ExtensionPluginRequest>(&line) {
            Ok(request) => plugin.call(&call_context(timeout), &request),
            Err(e) => {
                warn!("Skipping malformed request line: {e}");
                ExtensionResponse::new(
                    ExtensionStatus::new(1, format!("error parsing request JSON: {e}"), None),
                    vec![],
                )
            }
        };
        write_response(out, &response)?;
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    let plugin = TablePlugin::from_writable_table(ExampleTable::new());
    info!(
        "Serving {} table {} with {} columns",
        plugin.registry(),
        plugin.name(),
        plugin.columns().len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.request() {
        Some(request) => {
            let response = plugin.call(&call_context(args.timeout()), &request);
            write_response(&mut out, &response)?;
        }
        None => serve(&plugin, args.timeout(), io::stdin().lock(), &mut out)?,
    }

    plugin.shutdown();
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plugin() -> TablePlugin {
        TablePlugin::from_writable_table(ExampleTable::new())
    }

    fn call(plugin: &TablePlugin, pairs: &[(&str, &str)]) -> ExtensionResponse {
        plugin.call(&CallContext::new(), &row(pairs))
    }

    #[test]
    fn test_table_schema() {
        let table = ExampleTable::new();
        assert_eq!(table.name(), "example_table");
        let names: Vec<String> = table.columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["text", "integer", "big_int", "double"]);
    }

    #[test]
    fn test_generate_returns_seed_row() {
        let response = call(&plugin(), &[("action", "generate")]);

        assert_eq!(response.code(), Some(0));
        let rows = response.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["text"], "hello world");
        assert_eq!(rows[0]["big_int"], "-1234567890");
    }

    #[test]
    fn test_insert_then_generate() {
        let plugin = plugin();
        let values = json!(["new", 7, "9000000000", 1.5]).to_string();

        let response = call(
            &plugin,
            &[("action", "insert"), ("json_value_array", values.as_str())],
        );
        assert_eq!(response.code(), Some(0));
        assert_eq!(response.rows()[0]["status"], "success");
        assert_eq!(response.rows()[0]["id"], "2");

        let rows = call(&plugin, &[("action", "generate")]).rows().to_vec();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["text"], "new");
        assert_eq!(rows[1]["integer"], "7");
        assert_eq!(rows[1]["big_int"], "9000000000");
        assert_eq!(rows[1]["double"], "1.5");
    }

    #[test]
    fn test_insert_rejects_wrong_arity() {
        let response = call(
            &plugin(),
            &[("action", "insert"), ("json_value_array", r#"["only text"]"#)],
        );
        assert_eq!(response.code(), Some(1));
        assert_eq!(
            response.message(),
            Some("error generating table: expected 4 values, got 1")
        );
    }

    #[test]
    fn test_insert_rejects_integer_overflow() {
        let values = json!(["x", 5_000_000_000_i64, 1, 1.0]).to_string();
        let response = call(
            &plugin(),
            &[("action", "insert"), ("json_value_array", values.as_str())],
        );
        assert_eq!(response.code(), Some(1));
        assert!(response.message().unwrap().contains("column integer: expected INTEGER"));
    }

    #[test]
    fn test_render_nulls_and_text() {
        assert_eq!(render(&ColumnDef::double("d"), &Value::Null).unwrap(), "");
        assert_eq!(render(&ColumnDef::text("t"), &json!(12)).unwrap(), "12");
        assert!(render(&ColumnDef::big_int("b"), &json!("nope")).is_err());
        assert!(render(&ColumnDef::integer("i"), &json!(true)).is_err());
    }

    #[test]
    fn test_delete_by_equality() {
        let plugin = plugin();
        let values = json!(["keep", 1, 1, 1.0]).to_string();
        call(
            &plugin,
            &[("action", "insert"), ("json_value_array", values.as_str())],
        );

        let context = r#"{"constraints":[{"name":"text","affinity":"TEXT","list":[{"op":2,"expr":"hello world"}]}]}"#;
        let response = call(&plugin, &[("action", "delete"), ("context", context)]);
        assert_eq!(response.code(), Some(0));
        assert_eq!(response.rows(), &[row(&[("status", "success")])]);

        let rows = call(&plugin, &[("action", "generate")]).rows().to_vec();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["text"], "keep");
    }

    #[test]
    fn test_delete_without_constraints_clears_table() {
        let plugin = plugin();
        call(&plugin, &[("action", "delete")]);
        assert!(call(&plugin, &[("action", "generate")]).rows().is_empty());
    }

    #[test]
    fn test_delete_with_array_context_keeps_rows() {
        let plugin = plugin();
        for context in ["[]", r#"[[], ["text"], 5]"#] {
            let response = call(&plugin, &[("action", "delete"), ("context", context)]);
            assert_eq!(response.code(), Some(1));
            assert!(response
                .message()
                .unwrap()
                .starts_with("error parsing context JSON: "));
        }
        assert_eq!(call(&plugin, &[("action", "generate")]).rows().len(), 1);
    }

    #[test]
    fn test_delete_refuses_non_equality() {
        let query = QueryContext::parse(
            r#"{"constraints":[{"name":"integer","affinity":"INTEGER","list":[{"op":4,"expr":"1"}]}]}"#,
        )
        .unwrap();
        let err = ExampleTable::new()
            .delete(&CallContext::new(), query)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported delete constraint"));
    }

    #[test]
    fn test_cancelled_call_fails() {
        let ctx = CallContext::new();
        ctx.cancel();
        let err = ExampleTable::new()
            .generate(&ctx, QueryContext::default())
            .unwrap_err();
        assert!(matches!(err, CallbackError::Cancelled));
    }

    #[test]
    fn test_serve_answers_each_line() {
        let plugin = plugin();
        let input = concat!(
            "{\"action\":\"generate\"}\n",
            "\n",
            "not json\n",
            "{\"action\":\"bogus\"}\n",
        );
        let mut out = Vec::new();

        serve(&plugin, None, input.as_bytes(), &mut out).unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"]["code"], 0);
        assert_eq!(lines[0]["response"][0]["text"], "hello world");
        assert_eq!(lines[1]["status"]["code"], 1);
        assert_eq!(lines[2]["status"]["message"], "unknown action: bogus");
    }
}
