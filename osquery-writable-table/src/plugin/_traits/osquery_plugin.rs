use crate::context::CallContext;
use crate::plugin::Registry;
use crate::protocol::{
    ExtensionPluginRequest, ExtensionPluginResponse, ExtensionResponse, ExtensionStatus,
};

/// The surface an osquery transport needs from a plugin.
pub trait OsqueryPlugin: Send + Sync {
    // Name the plugin is registered under (e.g. the table name).
    fn name(&self) -> String;

    // Registry the plugin is added to.
    fn registry(&self) -> Registry;

    // Routes describe the interface the plugin exposes; for tables, one
    // entry per column.
    fn routes(&self) -> ExtensionPluginResponse;

    // Health check. A healthy plugin answers with status code 0.
    fn ping(&self) -> ExtensionStatus;

    // Perform the requested action. Failures are reported through the
    // response status, never by panicking.
    fn call(&self, ctx: &CallContext, request: &ExtensionPluginRequest) -> ExtensionResponse;

    // Notifies the plugin that the extension is stopping.
    fn shutdown(&self);
}
