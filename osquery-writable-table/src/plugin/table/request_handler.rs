/// Request handling logic for table operations
use crate::context::CallContext;
use crate::plugin::_enums::response::ExtensionResponseEnum;
use crate::plugin::table::error::{CallbackError, DispatchError};
use crate::plugin::table::query_context::QueryContext;
use crate::plugin::table::table_plugin::TablePlugin;
use crate::plugin::table::traits::TableResult;
use crate::plugin::table::value_array::ValueArrayJson;
use crate::plugin::OsqueryPlugin;
use crate::protocol::{ExtensionPluginRequest, ExtensionPluginResponse, ExtensionResponse};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

impl TablePlugin {
    /// Dispatch a request on its `action` field and wrap the outcome into a
    /// response. Never panics: every failure becomes a status-`1` response.
    pub fn parse_request(
        &self,
        ctx: &CallContext,
        req: &ExtensionPluginRequest,
    ) -> ExtensionResponse {
        let action = req.get("action").map(String::as_str).unwrap_or("");
        log::trace!("Table {}: action {action:?}, request {req:?}", self.name());

        match self.dispatch(action, ctx, req) {
            Ok(rows) => ExtensionResponseEnum::Success(rows).into(),
            Err(e) => {
                log::warn!("Table {}: {e}", self.name());
                ExtensionResponseEnum::Failure(e.to_string()).into()
            }
        }
    }

    fn dispatch(
        &self,
        action: &str,
        ctx: &CallContext,
        req: &ExtensionPluginRequest,
    ) -> Result<ExtensionPluginResponse, DispatchError> {
        match action {
            "columns" => Ok(self.routes()),
            "generate" => self.handle_generate(ctx, req),
            "insert" => self.handle_insert(ctx, req),
            "delete" => self.handle_delete(ctx, req),
            _ => Err(DispatchError::UnknownAction(action.to_string())),
        }
    }

    fn handle_generate(
        &self,
        ctx: &CallContext,
        req: &ExtensionPluginRequest,
    ) -> Result<ExtensionPluginResponse, DispatchError> {
        let query = query_context(req)?;
        run_callback(|| (self.generate)(ctx, query))
    }

    fn handle_insert(
        &self,
        ctx: &CallContext,
        req: &ExtensionPluginRequest,
    ) -> Result<ExtensionPluginResponse, DispatchError> {
        // "json_value_array": "[1,\"lol\"]"
        let raw = req.get("json_value_array").map(String::as_str).unwrap_or("");
        let values = ValueArrayJson::parse(raw).map_err(DispatchError::ValueArray)?;
        run_callback(|| (self.insert)(ctx, values))
    }

    fn handle_delete(
        &self,
        ctx: &CallContext,
        req: &ExtensionPluginRequest,
    ) -> Result<ExtensionPluginResponse, DispatchError> {
        let query = query_context(req)?;
        run_callback(|| (self.delete)(ctx, query))
    }
}

// A request without a context is a query without constraints.
fn query_context(req: &ExtensionPluginRequest) -> Result<QueryContext, DispatchError> {
    match req.get("context") {
        Some(raw) => QueryContext::parse(raw).map_err(DispatchError::Context),
        None => Ok(QueryContext::default()),
    }
}

fn run_callback<F>(callback: F) -> Result<ExtensionPluginResponse, DispatchError>
where
    F: FnOnce() -> TableResult,
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(result) => result.map_err(DispatchError::Callback),
        Err(payload) => Err(DispatchError::Callback(CallbackError::Panicked(
            panic_message(payload.as_ref()),
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::plugin::table::column_def::ColumnDef;
    use crate::plugin::table::query_context::Operator;
    use crate::plugin::table::traits::MockWritableTable;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn request(pairs: &[(&str, &str)]) -> ExtensionPluginRequest {
        row(pairs)
    }

    fn mock_table() -> MockWritableTable {
        let mut table = MockWritableTable::new();
        table.expect_name().return_const("mock_table".to_string());
        table
            .expect_columns()
            .returning(|| vec![ColumnDef::text("text"), ColumnDef::integer("integer")]);
        table
    }

    fn call(table: MockWritableTable, req: &ExtensionPluginRequest) -> ExtensionResponse {
        TablePlugin::from_writable_table(table).parse_request(&CallContext::new(), req)
    }

    #[test]
    fn test_columns_action_returns_routes() {
        let plugin = TablePlugin::from_writable_table(mock_table());
        let response = plugin.parse_request(&CallContext::new(), &request(&[("action", "columns")]));

        assert_eq!(response.code(), Some(0));
        assert_eq!(response.message(), Some("OK"));
        assert_eq!(response.rows(), plugin.routes().as_slice());
    }

    #[test]
    fn test_generate_without_context_uses_empty_query() {
        let mut table = mock_table();
        table
            .expect_generate()
            .withf(|_, query| *query == QueryContext::default())
            .times(1)
            .returning(|_, _| Ok(vec![row(&[("text", "hello world"), ("integer", "123")])]));

        let response = call(table, &request(&[("action", "generate")]));

        assert_eq!(response.code(), Some(0));
        assert_eq!(response.message(), Some("OK"));
        assert_eq!(
            response.rows(),
            &[row(&[("text", "hello world"), ("integer", "123")])]
        );
    }

    #[test]
    fn test_generate_passes_parsed_context() {
        let mut table = mock_table();
        table
            .expect_generate()
            .withf(|_, query| {
                query.limit() == Some(5)
                    && query
                        .constraint_list("text")
                        .is_some_and(|l| l.expressions(Operator::Equals).eq(["a"]))
            })
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let context = r#"{"constraints":[{"name":"text","affinity":"TEXT","list":[{"op":2,"expr":"a"}]}],"limit":5}"#;
        let response = call(table, &request(&[("action", "generate"), ("context", context)]));

        assert_eq!(response.code(), Some(0));
        assert!(response.rows().is_empty());
    }

    #[test]
    fn test_generate_with_malformed_context_skips_callback() {
        let mut table = mock_table();
        table.expect_generate().times(0);

        let response = call(table, &request(&[("action", "generate"), ("context", "{")]));

        assert_eq!(response.code(), Some(1));
        assert!(response
            .message()
            .unwrap()
            .starts_with("error parsing context JSON: "));
        assert!(response.rows().is_empty());
    }

    #[test]
    fn test_generate_callback_error() {
        let mut table = mock_table();
        table
            .expect_generate()
            .returning(|_, _| Err(CallbackError::failed("backend offline")));

        let response = call(table, &request(&[("action", "generate")]));

        assert_eq!(response.code(), Some(1));
        assert_eq!(
            response.message(),
            Some("error generating table: backend offline")
        );
        assert!(response.rows().is_empty());
    }

    #[test]
    fn test_insert_passes_values_in_order() {
        let mut table = mock_table();
        table
            .expect_insert()
            .withf(|_, values| values.values() == [json!("a"), json!(1)])
            .times(1)
            .returning(|_, _| Ok(vec![row(&[("id", "1"), ("status", "success")])]));

        let response = call(
            table,
            &request(&[("action", "insert"), ("json_value_array", r#"["a",1]"#)]),
        );

        assert_eq!(response.code(), Some(0));
        assert_eq!(response.rows(), &[row(&[("id", "1"), ("status", "success")])]);
    }

    #[test]
    fn test_insert_with_missing_values_returns_error() {
        let mut table = mock_table();
        table.expect_insert().times(0);

        let response = call(table, &request(&[("action", "insert")]));

        assert_eq!(response.code(), Some(1));
        assert!(response
            .message()
            .unwrap()
            .starts_with("error parsing value array json: "));
    }

    #[test]
    fn test_insert_with_non_array_returns_error() {
        let mut table = mock_table();
        table.expect_insert().times(0);

        let response = call(
            table,
            &request(&[("action", "insert"), ("json_value_array", r#"{"a":1}"#)]),
        );

        assert_eq!(response.code(), Some(1));
        assert!(response
            .message()
            .unwrap()
            .starts_with("error parsing value array json: unmarshaling values JSON: "));
    }

    #[test]
    fn test_insert_callback_error_uses_generate_prefix() {
        let mut table = mock_table();
        table
            .expect_insert()
            .returning(|_, _| Err(CallbackError::failed("duplicate key")));

        let response = call(
            table,
            &request(&[("action", "insert"), ("json_value_array", "[]")]),
        );

        assert_eq!(response.code(), Some(1));
        assert_eq!(response.message(), Some("error generating table: duplicate key"));
    }

    #[test]
    fn test_delete_passes_context() {
        let mut table = mock_table();
        table
            .expect_delete()
            .withf(|_, query| query.constraint_list("integer").is_some())
            .times(1)
            .returning(|_, _| Ok(vec![row(&[("status", "success")])]));
        table.expect_generate().times(0);

        let context = r#"{"constraints":[{"name":"integer","affinity":"INTEGER","list":[{"op":2,"expr":"1"}]}]}"#;
        let response = call(table, &request(&[("action", "delete"), ("context", context)]));

        assert_eq!(response.code(), Some(0));
        assert_eq!(response.rows(), &[row(&[("status", "success")])]);
    }

    #[test]
    fn test_delete_with_malformed_context() {
        let mut table = mock_table();
        table.expect_delete().times(0);

        let response = call(table, &request(&[("action", "delete"), ("context", "[1,2]")]));

        assert_eq!(response.code(), Some(1));
        assert!(response
            .message()
            .unwrap()
            .starts_with("error parsing context JSON: "));
    }

    #[test]
    fn test_delete_callback_error_uses_generate_prefix() {
        let mut table = mock_table();
        table
            .expect_delete()
            .returning(|_, _| Err(CallbackError::failed("row is locked")));

        let response = call(table, &request(&[("action", "delete"), ("context", "{}")]));

        assert_eq!(response.code(), Some(1));
        assert_eq!(response.message(), Some("error generating table: row is locked"));
    }

    #[test]
    fn test_invalid_action_returns_error() {
        let response = call(mock_table(), &request(&[("action", "frobnicate")]));

        assert_eq!(response.code(), Some(1));
        assert_eq!(response.message(), Some("unknown action: frobnicate"));
        assert_eq!(response.response, Some(vec![]));
    }

    #[test]
    fn test_missing_action_returns_error() {
        let response = call(mock_table(), &request(&[("context", "{}")]));

        assert_eq!(response.code(), Some(1));
        assert_eq!(response.message(), Some("unknown action: "));
    }

    #[test]
    fn test_action_is_case_sensitive() {
        let response = call(mock_table(), &request(&[("action", "GENERATE")]));
        assert_eq!(response.message(), Some("unknown action: GENERATE"));
    }

    #[test]
    fn test_panicking_callback_becomes_error_response() {
        let plugin = TablePlugin::new(
            "exploding_table",
            vec![ColumnDef::text("text")],
            |_: &CallContext, _| -> TableResult { panic!("table exploded") },
            |_: &CallContext, _| Ok(vec![]),
            |_: &CallContext, _| Ok(vec![]),
        );

        let response = plugin.parse_request(&CallContext::new(), &request(&[("action", "generate")]));

        assert_eq!(response.code(), Some(1));
        assert_eq!(
            response.message(),
            Some("error generating table: callback panicked: table exploded")
        );
    }

    #[test]
    fn test_cancelled_context_reaches_callback() {
        let mut table = mock_table();
        table
            .expect_generate()
            .times(1)
            .returning(|ctx, _| ctx.check().map(|_| vec![]));

        let plugin = TablePlugin::from_writable_table(table);
        let ctx = CallContext::new();
        ctx.cancel();

        let response = plugin.parse_request(&ctx, &request(&[("action", "generate")]));

        assert_eq!(response.code(), Some(1));
        assert_eq!(response.message(), Some("error generating table: call cancelled"));
    }

    #[test]
    fn test_call_delegates_to_parse_request() {
        let plugin = TablePlugin::from_writable_table(mock_table());
        let req = request(&[("action", "columns")]);

        let via_trait = plugin.call(&CallContext::new(), &req);
        let direct = plugin.parse_request(&CallContext::new(), &req);

        assert_eq!(via_trait, direct);
        assert_eq!(via_trait.rows().len(), 2);
    }

    #[test]
    fn test_panic_message_payloads() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new("owned".to_string());
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(static_str.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
