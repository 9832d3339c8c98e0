//! SQL expression builder.
//!
//! A [`SqlExpression`] keeps raw SQL text, identifiers and bound values apart until it is
//! compiled, so that identifiers are always quoted and values never end up inlined in the
//! query text.

use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use itertools::Itertools;
use serde_json_bytes::Value;

use crate::selection::ProjectedFields;

#[derive(Debug, Clone, PartialEq)]
enum SqlItem {
    Raw(String),
    Identifier(Vec<String>),
    Value(Value),
}

/// An opaque SQL expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlExpression {
    items: Vec<SqlItem>,
}

/// The result of [`SqlExpression::compile`]: query text with positional placeholders, and the
/// values to bind to them.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub text: String,
    pub values: Vec<Value>,
}

impl SqlExpression {
    /// Raw SQL text, inserted as is.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            items: vec![SqlItem::Raw(text.into())],
        }
    }

    /// A possibly qualified identifier such as `"posts"."title"`.
    pub fn identifier<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: vec![SqlItem::Identifier(
                path.into_iter().map(Into::into).collect(),
            )],
        }
    }

    /// A value bound as a query parameter.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            items: vec![SqlItem::Value(value.into())],
        }
    }

    /// Appends `other` after this expression.
    pub fn append(mut self, other: SqlExpression) -> Self {
        self.items.extend(other.items);
        self
    }

    /// Appends raw text after this expression.
    pub fn append_raw(self, text: impl Into<String>) -> Self {
        self.append(SqlExpression::raw(text))
    }

    /// Joins expressions with a raw separator.
    pub fn join<I>(expressions: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = SqlExpression>,
    {
        let mut joined = SqlExpression::default();
        for (index, expression) in expressions.into_iter().enumerate() {
            if index > 0 {
                joined = joined.append_raw(separator);
            }
            joined = joined.append(expression);
        }
        joined
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Renders the query text, numbering bound values `$1..$n` in order of appearance.
    pub fn compile(&self) -> CompiledQuery {
        let mut text = String::new();
        let mut values = Vec::new();
        for item in &self.items {
            match item {
                SqlItem::Raw(raw) => text.push_str(raw),
                SqlItem::Identifier(path) => {
                    text.push_str(&path.iter().map(|name| quote_identifier(name)).join("."))
                }
                SqlItem::Value(value) => {
                    values.push(value.clone());
                    text.push('$');
                    text.push_str(&values.len().to_string());
                }
            }
        }
        CompiledQuery { text, values }
    }
}

impl Display for SqlExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.compile().text)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `to_json("alias")`: the whole row serialized as JSON.
pub fn to_json(alias: &str) -> SqlExpression {
    SqlExpression::raw("to_json(")
        .append(SqlExpression::identifier([alias]))
        .append_raw(")")
}

/// Pairs per object-building call. PostgreSQL rejects calls with more than 100 arguments.
const MAX_FIELDS_PER_CALL: usize = 50;

/// `json_build_object('key', expression, ...)` over the projected fields, in order.
///
/// More fields than fit in one call are built in groups with `jsonb_build_object` and
/// concatenated with `||`, which makes the result `jsonb`.
pub fn json_build_object(fields: &ProjectedFields) -> SqlExpression {
    if fields.len() <= MAX_FIELDS_PER_CALL {
        return build_object("json_build_object", fields.iter());
    }
    let fields: Vec<_> = fields.iter().collect();
    let groups = fields
        .chunks(MAX_FIELDS_PER_CALL)
        .map(|group| build_object("jsonb_build_object", group.iter().copied()));
    SqlExpression::raw("(")
        .append(SqlExpression::join(groups, " || "))
        .append_raw(")")
}

fn build_object<'a>(
    function: &str,
    fields: impl Iterator<Item = (&'a Name, &'a SqlExpression)>,
) -> SqlExpression {
    let arguments = fields.map(|(key, expression)| {
        SqlExpression::raw(quote_literal(key))
            .append_raw(", ")
            .append(expression.clone())
    });
    SqlExpression::raw(format!("{function}("))
        .append(SqlExpression::join(arguments, ", "))
        .append_raw(")")
}
