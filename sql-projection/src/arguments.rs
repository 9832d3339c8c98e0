//! Conversion of field arguments from the query AST into JSON values.

use apollo_compiler::Node;
use apollo_compiler::ast;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::error::ProjectionError;

/// Parsed field arguments, keyed by argument name.
pub type Arguments = JsonMap<ByteString, Value>;

/// Runtime variable values, keyed by variable name.
pub type Variables = JsonMap<ByteString, Value>;

pub(crate) struct ArgumentParser<'a> {
    variables: &'a Variables,
    strict_variables: bool,
}

impl<'a> ArgumentParser<'a> {
    pub(crate) fn new(variables: &'a Variables, strict_variables: bool) -> Self {
        Self {
            variables,
            strict_variables,
        }
    }

    /// Parses every argument of a field.
    ///
    /// An argument referencing a variable missing from the variable table is left out.
    pub(crate) fn parse(
        &self,
        arguments: &[Node<ast::Argument>],
    ) -> Result<Arguments, ProjectionError> {
        let mut parsed = Arguments::new();
        for argument in arguments {
            if let Some(value) = self.parse_value(&argument.name, &argument.value)? {
                parsed.insert(argument.name.as_str(), value);
            }
        }
        Ok(parsed)
    }

    /// Converts one value. `None` when it references a variable absent from the variable table.
    pub(crate) fn parse_value(
        &self,
        argument: &str,
        value: &ast::Value,
    ) -> Result<Option<Value>, ProjectionError> {
        Ok(Some(match value {
            ast::Value::Variable(name) => return self.variable(name),
            ast::Value::Null => Value::Null,
            ast::Value::Boolean(b) => Value::Bool(*b),
            ast::Value::String(s) => Value::String(s.as_str().into()),
            ast::Value::Enum(name) => Value::String(name.as_str().into()),
            ast::Value::Int(i) => {
                let s = i.as_str();
                s.parse::<i64>()
                    .map(Value::from)
                    .or_else(|_| s.parse::<u64>().map(Value::from))
                    .map_err(|_| invalid_argument(argument, format!("{s} is not an integer")))?
            }
            ast::Value::Float(f) => {
                let float = f
                    .try_to_f64()
                    .map_err(|_| invalid_argument(argument, format!("{} overflows", f.as_str())))?;
                if !float.is_finite() {
                    return Err(invalid_argument(
                        argument,
                        format!("{} is not finite", f.as_str()),
                    ));
                }
                Value::from(float)
            }
            ast::Value::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Ok(self.parse_value(argument, item)?.unwrap_or(Value::Null)))
                    .collect::<Result<_, ProjectionError>>()?,
            ),
            ast::Value::Object(fields) => {
                let mut object = JsonMap::new();
                for (name, field) in fields {
                    if let Some(value) = self.parse_value(argument, field)? {
                        object.insert(name.as_str(), value);
                    }
                }
                Value::Object(object)
            }
        }))
    }

    fn variable(&self, name: &str) -> Result<Option<Value>, ProjectionError> {
        match self.variables.get(name) {
            Some(value) => Ok(Some(value.clone())),
            None if self.strict_variables => Err(ProjectionError::UnknownVariable(name.to_owned())),
            None => {
                tracing::debug!("variable '${name}' is absent from the variable table");
                Ok(None)
            }
        }
    }
}

fn invalid_argument(argument: &str, reason: String) -> ProjectionError {
    ProjectionError::InvalidArgument {
        argument: argument.to_owned(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use apollo_compiler::executable::Selection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json_bytes::json;

    use super::*;

    const SDL: &str = r#"
        enum Order { ASC DESC }
        input Filter { title: String, tags: [String], minScore: Float }
        type Query {
          posts(limit: Int, offset: Int, score: Float, draft: Boolean, title: String,
                order: Order, filter: Filter, ids: [Int]): [String]
        }
    "#;

    fn parse(arguments: &str, variables: Value, strict: bool) -> Result<Arguments, ProjectionError> {
        let schema = Schema::parse_and_validate(SDL, "schema.graphql").unwrap();
        let definitions: Vec<&str> = [("$limit", "$limit: Int"), ("$title", "$title: String")]
            .into_iter()
            .filter(|(variable, _)| arguments.contains(variable))
            .map(|(_, definition)| definition)
            .collect();
        let header = if definitions.is_empty() {
            String::new()
        } else {
            format!("({})", definitions.join(", "))
        };
        let source = format!("query{header} {{ posts{arguments} }}");
        let document =
            ExecutableDocument::parse_and_validate(&schema, source, "query.graphql").unwrap();
        let operation = document.operations.get(None).unwrap();
        let Selection::Field(field) = &operation.selection_set.selections[0] else {
            panic!("expected a field");
        };
        let variables = variables.as_object().cloned().unwrap_or_default();
        ArgumentParser::new(&variables, strict).parse(&field.arguments)
    }

    #[rstest]
    #[case::int("(limit: 5)", json!({ "limit": 5 }))]
    #[case::negative_int("(offset: -3)", json!({ "offset": -3 }))]
    #[case::float("(score: 1.5)", json!({ "score": 1.5 }))]
    #[case::boolean("(draft: false)", json!({ "draft": false }))]
    #[case::string("(title: \"hello\")", json!({ "title": "hello" }))]
    #[case::null("(title: null)", json!({ "title": null }))]
    #[case::enum_value("(order: DESC)", json!({ "order": "DESC" }))]
    #[case::list("(ids: [1, 2, 3])", json!({ "ids": [1, 2, 3] }))]
    #[case::object(
        "(filter: { title: \"a\", tags: [\"x\"], minScore: 2.5 })",
        json!({ "filter": { "title": "a", "tags": ["x"], "minScore": 2.5 } })
    )]
    fn converts_literals(#[case] arguments: &str, #[case] expected: Value) {
        let parsed = parse(arguments, json!({}), false).unwrap();
        assert_eq!(Value::Object(parsed), expected);
    }

    #[test]
    fn integer_literal_is_a_number() {
        let parsed = parse("(limit: 5)", json!({}), false).unwrap();
        assert_eq!(parsed.get("limit"), Some(&json!(5)));
        assert_ne!(parsed.get("limit"), Some(&json!("5")));
    }

    #[test]
    fn resolves_variables() {
        let parsed = parse(
            "(limit: $limit, title: $title)",
            json!({ "limit": 10, "title": "rust" }),
            false,
        )
        .unwrap();
        assert_eq!(Value::Object(parsed), json!({ "limit": 10, "title": "rust" }));
    }

    #[test]
    fn absent_variable_is_left_out() {
        let parsed = parse("(limit: $limit, offset: 2)", json!({}), false).unwrap();
        assert_eq!(parsed.get("limit"), None);
        assert_eq!(parsed.get("offset"), Some(&json!(2)));
    }

    #[test]
    fn absent_variable_in_a_list_is_null() {
        let parsed = parse("(ids: [1, $limit])", json!({}), false).unwrap();
        assert_eq!(parsed.get("ids"), Some(&json!([1, null])));
    }

    #[test]
    fn strict_variables_reject_absent_variables() {
        let err = parse("(limit: $limit)", json!({}), true).unwrap_err();
        assert_eq!(err, ProjectionError::UnknownVariable("limit".to_string()));
    }
}
