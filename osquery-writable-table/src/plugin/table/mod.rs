pub(crate) mod column_def;
pub(crate) mod error;
pub(crate) mod query_context;
mod request_handler;
pub(crate) mod table_plugin;
pub(crate) mod traits;
pub(crate) mod value_array;

pub use column_def::{ColumnDef, ColumnType};
pub use error::{CallbackError, DispatchError, ParseError};
pub use query_context::{Constraint, ConstraintList, Operator, QueryConstraints, QueryContext};
pub use table_plugin::TablePlugin;
pub use traits::{TableResult, WritableTable};
pub use value_array::ValueArrayJson;
