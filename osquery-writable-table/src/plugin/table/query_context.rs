use crate::plugin::table::column_def::ColumnType;
use crate::plugin::table::error::ParseError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;

// QueryConstraints contains the constraints from the WHERE clause of the query,
// that can optionally be used to optimize the table generation. Note that the
// osquery SQLite engine will perform the filtering with these constraints, so
// it is not mandatory that they be used in table generation.
// QueryConstraints is a map from column name to the details of the
// constraints on that column.
pub type QueryConstraints = HashMap<String, ConstraintList>;

/// Everything osquery tells a table about the query being run.
///
/// Parsed once per call from the request's `context` payload and handed to
/// the generate and delete callbacks as is. Nothing in this crate filters rows
/// with it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryContext {
    constraints: QueryConstraints,
    columns_used: Option<Vec<String>>,
    limit: Option<u64>,
}

impl QueryContext {
    /// Parse the JSON osquery sends in the `context` request field.
    ///
    /// ```
    /// use osquery_writable_table::plugin::{Operator, QueryContext};
    ///
    /// let ctx = QueryContext::parse(
    ///     r#"{"constraints":[{"name":"path","affinity":"TEXT","list":[{"op":2,"expr":"/tmp"}]}]}"#,
    /// )?;
    /// let path = ctx.constraint_list("path").map(|l| l.expressions(Operator::Equals).collect::<Vec<_>>());
    /// assert_eq!(path, Some(vec!["/tmp"]));
    /// # Ok::<(), osquery_writable_table::plugin::ParseError>(())
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(raw).map_err(ParseError::Context)?;
        let parsed: QueryContextJson = from_object(value).map_err(ParseError::Context)?;

        let mut constraints = QueryConstraints::new();
        for entry in parsed.constraints {
            let json: ConstraintListJson =
                from_object(Value::Object(entry)).map_err(ParseError::Context)?;
            let parsed_list = ConstraintList::try_from_json(&json)?;

            // Repeated entries for one column accumulate.
            match constraints.entry(json.name) {
                Entry::Occupied(mut existing) => {
                    existing.get_mut().constraints.extend(parsed_list.constraints)
                }
                Entry::Vacant(slot) => {
                    slot.insert(parsed_list);
                }
            }
        }

        Ok(Self {
            constraints,
            columns_used: parsed.cols_used,
            limit: parsed.limit,
        })
    }

    pub fn constraints(&self) -> &QueryConstraints {
        &self.constraints
    }

    pub fn constraint_list(&self, column: &str) -> Option<&ConstraintList> {
        self.constraints.get(column)
    }

    /// Columns the query references, when osquery reports them.
    pub fn columns_used(&self) -> Option<&[String]> {
        self.columns_used.as_deref()
    }

    /// Row-limit hint for the query, if any.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

impl FromStr for QueryContext {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryContext::parse(s)
    }
}

// ConstraintList contains the details of the constraints for the given column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintList {
    affinity: ColumnType,
    constraints: Vec<Constraint>,
}

impl ConstraintList {
    /// Create a new ConstraintList with the given column type
    pub fn new(affinity: ColumnType) -> Self {
        Self {
            affinity,
            constraints: Vec::new(),
        }
    }

    /// Add a constraint to this list
    pub fn add_constraint(&mut self, op: Operator, expr: String) {
        self.constraints.push(Constraint { op, expr });
    }

    /// Get the column type affinity
    pub fn affinity(&self) -> ColumnType {
        self.affinity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Expressions of every constraint using `op`, in query order.
    pub fn expressions(&self, op: Operator) -> impl Iterator<Item = &str> {
        self.constraints
            .iter()
            .filter(move |c| c.op == op)
            .map(|c| c.expr.as_str())
    }

    /// Get the number of constraints
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Check if there are no constraints
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    fn try_from_json(json: &ConstraintListJson) -> Result<Self, ParseError> {
        let invalid = |reason: String| ParseError::Constraint {
            column: json.name.clone(),
            reason,
        };

        let affinity = match json.affinity.as_deref() {
            None | Some("") => ColumnType::Text,
            Some(affinity) => ColumnType::from_str(affinity)
                .map_err(|_| invalid(format!("unknown affinity {affinity:?}")))?,
        };

        let mut list = ConstraintList::new(affinity);
        match &json.list {
            // osquery sends a string (usually "") for a column without constraints
            Value::Null | Value::String(_) => {}
            Value::Array(entries) => {
                for entry in entries {
                    let Value::Object(entry) = entry else {
                        return Err(invalid(format!("constraint is not an object: {entry}")));
                    };
                    let op = operator(entry.get("op")).map_err(invalid)?;
                    let expr = match entry.get("expr") {
                        None | Some(Value::Null) => String::new(),
                        Some(Value::String(expr)) => expr.clone(),
                        Some(other) => other.to_string(),
                    };
                    list.add_constraint(op, expr);
                }
            }
            other => return Err(invalid(format!("constraint list is not an array: {other}"))),
        }

        Ok(list)
    }
}

// Constraint contains both an operator and an expression that are applied as
// constraints in the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    op: Operator,
    expr: String,
}

impl Constraint {
    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }
}

/// Operators for query constraints, mapping to osquery's constraint operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Unique constraint (code 1)
    Unique = 1,
    /// Equality constraint (code 2)
    Equals = 2,
    /// Greater than constraint (code 4)
    GreaterThan = 4,
    /// Less than or equals constraint (code 8)
    LessThanOrEquals = 8,
    /// Less than constraint (code 16)
    LessThan = 16,
    /// Greater than or equals constraint (code 32)
    GreaterThanOrEquals = 32,
    /// Match constraint (code 64)
    Match = 64,
    /// Like constraint (code 65)
    Like = 65,
    /// Glob constraint (code 66)
    Glob = 66,
    /// Regexp constraint (code 67)
    Regexp = 67,
}

impl TryFrom<i32> for Operator {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Operator::Unique),
            2 => Ok(Operator::Equals),
            4 => Ok(Operator::GreaterThan),
            8 => Ok(Operator::LessThanOrEquals),
            16 => Ok(Operator::LessThan),
            32 => Ok(Operator::GreaterThanOrEquals),
            64 => Ok(Operator::Match),
            65 => Ok(Operator::Like),
            66 => Ok(Operator::Glob),
            67 => Ok(Operator::Regexp),
            _ => Err(format!("unknown operator code: {value}")),
        }
    }
}

// Operator codes arrive as numbers or as numeric strings.
fn operator(code: Option<&Value>) -> Result<Operator, String> {
    let parsed = match code {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(parsed) = parsed else {
        return Err(match code {
            Some(other) => format!("operator code is not an integer: {other}"),
            None => "missing operator code".to_string(),
        });
    };
    i32::try_from(parsed)
        .map_err(|_| format!("unknown operator code: {parsed}"))
        .and_then(Operator::try_from)
}

// Derived struct impls also accept JSON arrays; only objects are valid here.
fn from_object<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    if !value.is_object() {
        return Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {value}"
        )));
    }
    serde_json::from_value(value)
}

// Wire shapes of the context JSON.

#[derive(Deserialize)]
struct QueryContextJson {
    #[serde(default)]
    constraints: Vec<Map<String, Value>>,
    #[serde(default, rename = "colsUsed")]
    cols_used: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<u64>,
}

#[derive(Deserialize)]
struct ConstraintListJson {
    name: String,
    #[serde(default)]
    affinity: Option<String>,
    #[serde(default)]
    list: Value,
}
