use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

// Route `op` value. osquery reserves the field; this crate never filters on it.
const COLUMN_OP: &str = "0";

// ColumnDef defines a column used in a table plugin.
// Prefer using the helper functions to create a ColumnDef.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    t: ColumnType,
}

#[derive(Clone, Copy, Display, EnumString, Debug, PartialEq, Eq, Hash)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ColumnType {
    // TEXT: containing strings
    Text,
    // INTEGER: containing integers
    Integer,
    // BIGINT: containing large integers
    BigInt,
    // DOUBLE: containing floating point values
    Double,
}

impl ColumnDef {
    pub fn new(name: &str, t: ColumnType) -> Self {
        ColumnDef {
            name: name.to_owned(),
            t,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn big_int(name: &str) -> Self {
        Self::new(name, ColumnType::BigInt)
    }

    pub fn double(name: &str) -> Self {
        Self::new(name, ColumnType::Double)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.t
    }

    /// The route entry osquery expects for this column.
    pub(crate) fn route(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("id".to_string(), "column".to_string()),
            ("name".to_string(), self.name.clone()),
            ("type".to_string(), self.t.to_string()),
            ("op".to_string(), COLUMN_OP.to_string()),
        ])
    }
}
