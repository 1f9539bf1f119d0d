//! Column types and identifier quoting.

use std::fmt::{self, Write};

use stateindex_schema::{Field, Kind};

use crate::enums::enum_type_name;
use crate::error::PostgresError;

/// Wraps an identifier in double quotes, doubling any embedded quote.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted SQL string literal.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Storage type of a field's column. Enum columns use the module-qualified
/// enum type.
pub fn column_type(module_name: &str, field: &Field) -> Result<String, PostgresError> {
    let ty = match field.kind {
        Kind::String => "TEXT",
        Kind::Bytes | Kind::Address => "BYTEA",
        Kind::Int8 | Kind::Uint8 | Kind::Int16 => "SMALLINT",
        Kind::Uint16 | Kind::Int32 => "INTEGER",
        Kind::Uint32 | Kind::Int64 | Kind::Duration => "BIGINT",
        Kind::Uint64 | Kind::Integer | Kind::Decimal => "NUMERIC",
        Kind::Bool => "BOOLEAN",
        Kind::Time => "TIMESTAMPTZ",
        Kind::Float32 => "REAL",
        Kind::Float64 => "DOUBLE PRECISION",
        Kind::Json => "JSONB",
        Kind::Enum => {
            let def = field.enum_definition.as_ref().ok_or_else(|| {
                PostgresError::unsupported(format!("enum field {:?} has no definition", field.name))
            })?;
            return Ok(quote_identifier(&enum_type_name(module_name, &def.name)));
        }
        Kind::Invalid => {
            return Err(PostgresError::unsupported(format!(
                "field {:?} has no column type",
                field.name
            )))
        }
    };
    Ok(ty.to_string())
}

/// Writes `"name" TYPE [NOT NULL],\n\t`.
pub(crate) fn write_column_def(
    w: &mut impl Write,
    module_name: &str,
    field: &Field,
) -> Result<(), PostgresError> {
    write!(
        w,
        "{} {}",
        quote_identifier(&field.name),
        column_type(module_name, field)?
    )?;
    if !field.nullable {
        w.write_str(" NOT NULL")?;
    }
    w.write_str(",\n\t")?;
    Ok(())
}

/// Writes the `$n` placeholder for a field, with the cast its column needs
/// when the parameter is bound as text.
pub(crate) fn write_placeholder(
    w: &mut impl Write,
    module_name: &str,
    field: &Field,
    index: usize,
) -> fmt::Result {
    write!(w, "${index}")?;
    match field.kind {
        Kind::Uint64 | Kind::Integer | Kind::Decimal => w.write_str("::NUMERIC"),
        Kind::Enum => match &field.enum_definition {
            Some(def) => write!(w, "::{}", quote_identifier(&enum_type_name(module_name, &def.name))),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stateindex_schema::EnumDefinition;

    #[test]
    fn quoting() {
        assert_eq!(quote_identifier("bank_balance"), "\"bank_balance\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn column_types_by_kind() {
        let cases = [
            (Kind::String, "TEXT"),
            (Kind::Address, "BYTEA"),
            (Kind::Uint8, "SMALLINT"),
            (Kind::Uint16, "INTEGER"),
            (Kind::Uint32, "BIGINT"),
            (Kind::Uint64, "NUMERIC"),
            (Kind::Time, "TIMESTAMPTZ"),
            (Kind::Float64, "DOUBLE PRECISION"),
            (Kind::Json, "JSONB"),
        ];
        for (kind, want) in cases {
            assert_eq!(column_type("m", &Field::new("f", kind)).unwrap(), want, "{kind:?}");
        }
        assert!(column_type("m", &Field::new("f", Kind::Invalid)).is_err());
    }

    #[test]
    fn enum_column_uses_module_type() {
        let f = Field::enumeration("status", EnumDefinition::new("status", ["on", "off"]));
        assert_eq!(column_type("gov", &f).unwrap(), "\"gov_status\"");

        let mut s = String::new();
        write_placeholder(&mut s, "gov", &f, 3).unwrap();
        assert_eq!(s, "$3::\"gov_status\"");
    }

    #[test]
    fn nullable_columns_drop_not_null() {
        let mut s = String::new();
        write_column_def(&mut s, "m", &Field::new("memo", Kind::String).nullable()).unwrap();
        write_column_def(&mut s, "m", &Field::new("amount", Kind::Integer)).unwrap();
        assert_eq!(s, "\"memo\" TEXT,\n\t\"amount\" NUMERIC NOT NULL,\n\t");
    }
}
