//! Declarative control query.
//!
//! Accepts the rule tree produced by jQuery QueryBuilder, checks every field
//! against an allow-list and translates it into a diesel expression over the
//! `controls` table. Only visible controls are ever returned.

use diesel::dsl::not;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{GrcError, GrcResult};
use crate::core::shared::schema::controls;
use crate::core::shared::utils::DbConn;

use super::storage::DbControl;

pub type BoxedCondition = Box<dyn BoxableExpression<controls::table, Sqlite, SqlType = Bool>>;

pub const DEFAULT_FIELDS: [&str; 3] = ["id", "criteria", "control_ref"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {0} cannot be filtered")]
    NotFilterable(String),
    #[error("operator {operator} is not supported for field {field}")]
    UnsupportedOperator { field: String, operator: String },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<FilterError> for GrcError {
    fn from(e: FilterError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Condition {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    In,
    NotIn,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Between,
    NotBetween,
    BeginsWith,
    NotBeginsWith,
    Contains,
    NotContains,
    EndsWith,
    NotEndsWith,
    IsEmpty,
    IsNotEmpty,
    IsNull,
    IsNotNull,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Less => "less",
            Self::LessOrEqual => "less_or_equal",
            Self::Greater => "greater",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::BeginsWith => "begins_with",
            Self::NotBeginsWith => "not_begins_with",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::EndsWith => "ends_with",
            Self::NotEndsWith => "not_ends_with",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }
}

/// One node of a QueryBuilder tree. Unrecognised keys (`id`, `type`,
/// `input`, `valid`) are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group {
        condition: Condition,
        #[serde(default)]
        rules: Vec<FilterNode>,
        #[serde(default)]
        not: bool,
    },
    Rule {
        field: String,
        operator: Operator,
        #[serde(default)]
        value: Value,
    },
}

impl FilterNode {
    pub fn default_filter() -> Self {
        Self::Group {
            condition: Condition::Or,
            rules: vec![Self::Rule {
                field: "controls.id".to_string(),
                operator: Operator::IsNotNull,
                value: Value::Null,
            }],
            not: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub filter: Option<FilterNode>,
    pub fields: Option<Vec<String>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMeta {
    pub data: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub data: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnMeta>>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    Id,
    Name,
    Description,
    ControlRef,
    Category,
    Subcategory,
    Criteria,
    FrameworkId,
    CreatedAt,
}

impl ControlField {
    /// Accepts bare names and names qualified with `controls.`.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let name = match raw.split_once('.') {
            Some(("controls", column)) => column,
            Some(_) => return Err(FilterError::UnknownField(raw.to_string())),
            None => raw,
        };
        match name {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "control_ref" => Ok(Self::ControlRef),
            "category" => Ok(Self::Category),
            "subcategory" => Ok(Self::Subcategory),
            "criteria" => Ok(Self::Criteria),
            "framework_id" => Ok(Self::FrameworkId),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(FilterError::UnknownField(raw.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::ControlRef => "control_ref",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Criteria => "criteria",
            Self::FrameworkId => "framework_id",
            Self::CreatedAt => "created_at",
        }
    }

    /// `control_ref` -> `Control Ref`
    pub fn title(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn value(self, control: &DbControl) -> Value {
        match self {
            Self::Id => Value::from(control.id),
            Self::Name => Value::from(control.name.clone()),
            Self::Description => Value::from(control.description.clone()),
            Self::ControlRef => Value::from(control.control_ref.clone()),
            Self::Category => Value::from(control.category.clone()),
            Self::Subcategory => Value::from(control.subcategory.clone()),
            Self::Criteria => Value::from(control.criteria.clone()),
            Self::FrameworkId => control.framework_id.map_or(Value::Null, Value::from),
            Self::CreatedAt => Value::from(control.created_at.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

pub fn resolve_fields(fields: &[String]) -> Result<Vec<ControlField>, FilterError> {
    let mut resolved = Vec::with_capacity(fields.len());
    for field in fields {
        let field = ControlField::parse(field)?;
        if !resolved.contains(&field) {
            resolved.push(field);
        }
    }
    Ok(resolved)
}

// ============================================================================
// Values
// ============================================================================

fn invalid(field: ControlField, reason: impl Into<String>) -> FilterError {
    FilterError::InvalidValue {
        field: field.name().to_string(),
        reason: reason.into(),
    }
}

fn text_value(field: ControlField, value: &Value) -> Result<String, FilterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) if items.len() == 1 => text_value(field, &items[0]),
        _ => Err(invalid(field, "expected a string")),
    }
}

fn integer_value(field: ControlField, value: &Value) -> Result<i32, FilterError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid(field, format!("{n} is not a 32-bit integer"))),
        Value::Array(items) if items.len() == 1 => integer_value(field, &items[0]),
        _ => Err(invalid(field, "expected an integer")),
    }
}

fn list_of<T>(
    field: ControlField,
    value: &Value,
    item: fn(ControlField, &Value) -> Result<T, FilterError>,
) -> Result<Vec<T>, FilterError> {
    match value {
        Value::Array(items) => items.iter().map(|v| item(field, v)).collect(),
        Value::Null => Err(invalid(field, "a value is required")),
        scalar => Ok(vec![item(field, scalar)?]),
    }
}

fn pair_of<T>(
    field: ControlField,
    value: &Value,
    item: fn(ControlField, &Value) -> Result<T, FilterError>,
) -> Result<(T, T), FilterError> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok((item(field, &items[0])?, item(field, &items[1])?)),
        _ => Err(invalid(field, "expected two values")),
    }
}

// ============================================================================
// Translation
// ============================================================================

macro_rules! text_rule {
    ($column:expr, $field:expr, $op:expr, $value:expr) => {{
        let column = $column;
        let (field, value) = ($field, $value);
        let condition: BoxedCondition = match $op {
            Operator::Equal => Box::new(column.eq(text_value(field, value)?)),
            Operator::NotEqual => Box::new(column.ne(text_value(field, value)?)),
            Operator::In => Box::new(column.eq_any(list_of(field, value, text_value)?)),
            Operator::NotIn => Box::new(column.ne_all(list_of(field, value, text_value)?)),
            Operator::Less => Box::new(column.lt(text_value(field, value)?)),
            Operator::LessOrEqual => Box::new(column.le(text_value(field, value)?)),
            Operator::Greater => Box::new(column.gt(text_value(field, value)?)),
            Operator::GreaterOrEqual => Box::new(column.ge(text_value(field, value)?)),
            Operator::Between => {
                let (low, high) = pair_of(field, value, text_value)?;
                Box::new(column.between(low, high))
            }
            Operator::NotBetween => {
                let (low, high) = pair_of(field, value, text_value)?;
                Box::new(column.not_between(low, high))
            }
            Operator::BeginsWith => Box::new(column.like(format!("{}%", text_value(field, value)?))),
            Operator::NotBeginsWith => {
                Box::new(column.not_like(format!("{}%", text_value(field, value)?)))
            }
            Operator::Contains => Box::new(column.like(format!("%{}%", text_value(field, value)?))),
            Operator::NotContains => {
                Box::new(column.not_like(format!("%{}%", text_value(field, value)?)))
            }
            Operator::EndsWith => Box::new(column.like(format!("%{}", text_value(field, value)?))),
            Operator::NotEndsWith => {
                Box::new(column.not_like(format!("%{}", text_value(field, value)?)))
            }
            Operator::IsEmpty => Box::new(column.eq("")),
            Operator::IsNotEmpty => Box::new(column.ne("")),
            Operator::IsNull => Box::new(column.is_null()),
            Operator::IsNotNull => Box::new(column.is_not_null()),
        };
        condition
    }};
}

macro_rules! integer_rule {
    ($column:expr, $field:expr, $op:expr, $value:expr) => {{
        let column = $column;
        let (field, value) = ($field, $value);
        let condition: BoxedCondition = match $op {
            Operator::Equal => Box::new(column.eq(integer_value(field, value)?)),
            Operator::NotEqual => Box::new(column.ne(integer_value(field, value)?)),
            Operator::In => Box::new(column.eq_any(list_of(field, value, integer_value)?)),
            Operator::NotIn => Box::new(column.ne_all(list_of(field, value, integer_value)?)),
            Operator::Less => Box::new(column.lt(integer_value(field, value)?)),
            Operator::LessOrEqual => Box::new(column.le(integer_value(field, value)?)),
            Operator::Greater => Box::new(column.gt(integer_value(field, value)?)),
            Operator::GreaterOrEqual => Box::new(column.ge(integer_value(field, value)?)),
            Operator::Between => {
                let (low, high) = pair_of(field, value, integer_value)?;
                Box::new(column.between(low, high))
            }
            Operator::NotBetween => {
                let (low, high) = pair_of(field, value, integer_value)?;
                Box::new(column.not_between(low, high))
            }
            Operator::IsNull => Box::new(column.is_null()),
            Operator::IsNotNull => Box::new(column.is_not_null()),
            other => {
                return Err(FilterError::UnsupportedOperator {
                    field: field.name().to_string(),
                    operator: other.as_str().to_string(),
                })
            }
        };
        condition
    }};
}

fn rule_condition(field: &str, operator: Operator, value: &Value) -> Result<BoxedCondition, FilterError> {
    let field = ControlField::parse(field)?;
    let condition = match field {
        ControlField::Id => integer_rule!(controls::id, field, operator, value),
        // NULL framework ids compare as unknown, which filters them out
        // exactly like the nullable comparison would.
        ControlField::FrameworkId => {
            integer_rule!(controls::framework_id.assume_not_null(), field, operator, value)
        }
        ControlField::Name => text_rule!(controls::name, field, operator, value),
        ControlField::Description => text_rule!(controls::description, field, operator, value),
        ControlField::ControlRef => text_rule!(controls::control_ref, field, operator, value),
        ControlField::Category => text_rule!(controls::category, field, operator, value),
        ControlField::Subcategory => text_rule!(controls::subcategory, field, operator, value),
        ControlField::Criteria => text_rule!(controls::criteria, field, operator, value),
        ControlField::CreatedAt => {
            return Err(FilterError::NotFilterable(field.name().to_string()));
        }
    };
    Ok(condition)
}

/// Translate a filter tree into a boolean expression over `controls`.
pub fn build_condition(node: &FilterNode) -> Result<BoxedCondition, FilterError> {
    match node {
        FilterNode::Rule {
            field,
            operator,
            value,
        } => rule_condition(field, *operator, value),
        FilterNode::Group {
            condition,
            rules,
            not: negate,
        } => {
            let mut combined: Option<BoxedCondition> = None;
            for rule in rules {
                let next = build_condition(rule)?;
                let merged: BoxedCondition = match combined {
                    None => next,
                    Some(prev) => match condition {
                        Condition::And => Box::new(prev.and(next)),
                        Condition::Or => Box::new(prev.or(next)),
                    },
                };
                combined = Some(merged);
            }

            // An empty group matches everything.
            let group: BoxedCondition = match combined {
                Some(group) => group,
                None => Box::new(controls::id.is_not_null()),
            };
            if *negate {
                let negated: BoxedCondition = Box::new(not(group));
                Ok(negated)
            } else {
                Ok(group)
            }
        }
    }
}

/// Run a query against visible controls.
pub fn run_query(conn: &mut DbConn, request: &QueryRequest, include_columns: bool) -> GrcResult<QueryResponse> {
    let default_filter;
    let filter = match &request.filter {
        Some(filter) => filter,
        None => {
            default_filter = FilterNode::default_filter();
            &default_filter
        }
    };

    let fields = match &request.fields {
        Some(fields) if !fields.is_empty() => resolve_fields(fields)?,
        _ => DEFAULT_FIELDS
            .iter()
            .map(|f| ControlField::parse(f))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let limit = request.limit.unwrap_or(i64::MAX);
    let offset = request.offset.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(GrcError::Validation("limit and offset must not be negative".to_string()));
    }

    let total: i64 = controls::table
        .filter(controls::visible.eq(true))
        .filter(build_condition(filter)?)
        .count()
        .get_result(conn)?;

    let rows: Vec<DbControl> = controls::table
        .filter(controls::visible.eq(true))
        .filter(build_condition(filter)?)
        .order(controls::id.asc())
        .limit(limit)
        .offset(offset)
        .select(DbControl::as_select())
        .load(conn)?;

    let data = rows
        .iter()
        .map(|row| {
            fields
                .iter()
                .map(|f| (f.name().to_string(), f.value(row)))
                .collect::<Map<String, Value>>()
        })
        .collect();

    let columns = include_columns.then(|| {
        fields
            .iter()
            .map(|f| ColumnMeta {
                data: f.name().to_string(),
                title: f.title(),
            })
            .collect()
    });

    Ok(QueryResponse { data, columns, total })
}
