use std::fmt;

/// Quotes an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes an SQL string literal, doubling embedded apostrophes.
pub fn quote_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A relational table reference, optionally schema qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_identifier(schema))?;
        }
        f.write_str(&quote_identifier(&self.name))
    }
}

/// One SQL column expression produced or consumed by a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    /// A physical column of the mapped table; rendered quoted.
    Table(String),
    /// A constant SQL value, already rendered (e.g. `'42'::integer`).
    Constant(String),
    /// An arbitrary SQL expression, already rendered.
    Expression(String),
}

impl Column {
    pub fn is_constant(&self) -> bool {
        matches!(self, Column::Constant(_))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Table(name) => f.write_str(&quote_identifier(name)),
            Column::Constant(sql) | Column::Expression(sql) => f.write_str(sql),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("id"), "\"id\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn string_literals_double_apostrophes() {
        assert_eq!(quote_string_literal("O'Neil"), "'O''Neil'");
    }

    #[test]
    fn table_rendering() {
        assert_eq!(Table::new("compound").to_string(), "\"compound\"");
        assert_eq!(
            Table::with_schema("pubchem", "compound").to_string(),
            "\"pubchem\".\"compound\""
        );
    }
}
