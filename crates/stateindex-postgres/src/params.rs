//! Bind parameters for generated statements.
//!
//! Every [`Value`] maps losslessly onto a Postgres parameter. Unsigned kinds
//! widen to the next signed type; `uint64`, `integer` and `decimal` are bound
//! as text and cast to `NUMERIC` by their placeholder.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

use stateindex_schema::{Kind, Value};

use crate::error::PostgresError;

/// The bind type of a SQL `NULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Bytes,
    SmallInt,
    Int,
    BigInt,
    Bool,
    Real,
    Double,
    Timestamp,
    Json,
}

impl ParamType {
    pub fn for_kind(kind: Kind) -> Result<Self, PostgresError> {
        Ok(match kind {
            Kind::String
            | Kind::Uint64
            | Kind::Integer
            | Kind::Decimal
            | Kind::Enum => ParamType::Text,
            Kind::Bytes | Kind::Address => ParamType::Bytes,
            Kind::Int8 | Kind::Uint8 | Kind::Int16 => ParamType::SmallInt,
            Kind::Uint16 | Kind::Int32 => ParamType::Int,
            Kind::Uint32 | Kind::Int64 | Kind::Duration => ParamType::BigInt,
            Kind::Bool => ParamType::Bool,
            Kind::Float32 => ParamType::Real,
            Kind::Float64 => ParamType::Double,
            Kind::Time => ParamType::Timestamp,
            Kind::Json => ParamType::Json,
            Kind::Invalid => {
                return Err(PostgresError::unsupported("cannot bind a value of the invalid kind"))
            }
        })
    }
}

/// One positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null(ParamType),
    Text(String),
    Bytes(Vec<u8>),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Bool(bool),
    Real(f32),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl SqlParam {
    /// Converts `value` for a column of `kind`. The kind only matters for
    /// `Null`, which carries the column's bind type.
    pub fn from_value(kind: Kind, value: &Value) -> Result<Self, PostgresError> {
        Ok(match value {
            Value::Null => SqlParam::Null(ParamType::for_kind(kind)?),
            Value::String(s) | Value::Integer(s) | Value::Decimal(s) | Value::Enum(s) => {
                SqlParam::Text(s.clone())
            }
            Value::Bytes(b) | Value::Address(b) => SqlParam::Bytes(b.clone()),
            Value::Int8(v) => SqlParam::SmallInt(i16::from(*v)),
            Value::Uint8(v) => SqlParam::SmallInt(i16::from(*v)),
            Value::Int16(v) => SqlParam::SmallInt(*v),
            Value::Uint16(v) => SqlParam::Int(i32::from(*v)),
            Value::Int32(v) => SqlParam::Int(*v),
            Value::Uint32(v) => SqlParam::BigInt(i64::from(*v)),
            Value::Int64(v) | Value::Duration(v) => SqlParam::BigInt(*v),
            Value::Uint64(v) => SqlParam::Text(v.to_string()),
            Value::Bool(v) => SqlParam::Bool(*v),
            Value::Time(t) => SqlParam::Timestamp(*t),
            Value::Float32(v) => SqlParam::Real(*v),
            Value::Float64(v) => SqlParam::Double(*v),
            Value::Json(v) => SqlParam::Json(v.clone()),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Null(_))
    }

    pub(crate) fn bind_to<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlParam::Null(ty) => match ty {
                ParamType::Text => query.bind(None::<String>),
                ParamType::Bytes => query.bind(None::<Vec<u8>>),
                ParamType::SmallInt => query.bind(None::<i16>),
                ParamType::Int => query.bind(None::<i32>),
                ParamType::BigInt => query.bind(None::<i64>),
                ParamType::Bool => query.bind(None::<bool>),
                ParamType::Real => query.bind(None::<f32>),
                ParamType::Double => query.bind(None::<f64>),
                ParamType::Timestamp => query.bind(None::<DateTime<Utc>>),
                ParamType::Json => query.bind(None::<serde_json::Value>),
            },
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Bytes(b) => query.bind(b.as_slice()),
            SqlParam::SmallInt(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::BigInt(v) => query.bind(*v),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Real(v) => query.bind(*v),
            SqlParam::Double(v) => query.bind(*v),
            SqlParam::Timestamp(t) => query.bind(*t),
            SqlParam::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

/// Builds a query with `params` bound in order.
pub(crate) fn bind_all<'q>(
    sql: &'q str,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| param.bind_to(query))
}
