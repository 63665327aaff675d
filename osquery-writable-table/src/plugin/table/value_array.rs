use crate::plugin::table::column_def::ColumnDef;
use crate::plugin::table::error::ParseError;
use serde_json::Value;
use std::str::FromStr;

/// The row values osquery sends with an `INSERT`, decoded from the request's
/// `json_value_array` field.
///
/// Values stay untyped: osquery sends them in column order, and it is up to
/// the insert callback to interpret each position against the table's
/// columns, e.g. with [`ValueArrayJson::with_columns`]. The sequence mirrors
/// the JSON array exactly, nulls included.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueArrayJson {
    values: Vec<Value>,
}

impl ValueArrayJson {
    /// Decode a JSON array. Anything other than an array is an error.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let values = serde_json::from_str::<Vec<Value>>(raw).map_err(ParseError::Values)?;
        Ok(Self { values })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pairs each column with the value at its position.
    ///
    /// Stops at the shorter of the two sequences; compare [`Self::len`] with
    /// the column count first if a full row is required.
    pub fn with_columns<'a>(
        &'a self,
        columns: &'a [ColumnDef],
    ) -> impl Iterator<Item = (&'a ColumnDef, &'a Value)> {
        columns.iter().zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl FromStr for ValueArrayJson {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueArrayJson::parse(s)
    }
}

impl From<Vec<Value>> for ValueArrayJson {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}
