use osquery_writable_table::ExtensionPluginRequest;
use std::time::Duration;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Without --action, newline-delimited JSON requests are read from stdin.")]
pub struct Args {
    /// Action to run once: generate, insert, delete or columns.
    #[arg(long)]
    pub action: Option<String>,

    /// Query context JSON for generate and delete.
    #[arg(long, value_name = "JSON", requires = "action")]
    pub context: Option<String>,

    /// Row values JSON array for insert.
    #[arg(long, value_name = "JSON", requires = "action")]
    pub json_value_array: Option<String>,

    /// Seconds a single call may run before it is cancelled. 0 disables the deadline.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Enable verbose informational messages.
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }

    /// The single request described by the flags, if `--action` was given.
    pub fn request(&self) -> Option<ExtensionPluginRequest> {
        let action = self.action.as_ref()?;

        let mut request = ExtensionPluginRequest::new();
        request.insert("action".to_string(), action.clone());
        if let Some(context) = &self.context {
            request.insert("context".to_string(), context.clone());
        }
        if let Some(values) = &self.json_value_array {
            request.insert("json_value_array".to_string(), values.clone());
        }
        Some(request)
    }
}
