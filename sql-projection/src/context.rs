//! The resolve info handed to a projection: which field is resolved, with which selections
//! and variables.
//!
//! [`ResolveInfo::for_root_field`] and [`ResolveInfo::child`] build it from an executable
//! document the way a query engine collects fields: fields reached through fragments count,
//! and variables missing from the request take their declared default.

use std::borrow::Cow;
use std::collections::HashSet;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::executable;
use apollo_compiler::executable::FragmentMap;
use apollo_compiler::executable::Selection;

use crate::arguments::ArgumentParser;
use crate::arguments::Variables;
use crate::error::ProjectionError;

/// What the query engine knows about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolveInfo<'a> {
    /// The type declaring the requested field.
    pub parent_type: Name,
    /// Every node selecting the field under the same response key.
    pub field_nodes: Vec<&'a Node<executable::Field>>,
    pub fragments: &'a FragmentMap,
    pub variables: Cow<'a, Variables>,
}

impl<'a> ResolveInfo<'a> {
    pub fn new(
        parent_type: Name,
        field_nodes: Vec<&'a Node<executable::Field>>,
        fragments: &'a FragmentMap,
        variables: &'a Variables,
    ) -> Self {
        Self {
            parent_type,
            field_nodes,
            fragments,
            variables: Cow::Borrowed(variables),
        }
    }

    /// The resolve info of the root field selected as `response_key` by an operation.
    ///
    /// Variables declared with a default value and absent from `variables` take the default.
    pub fn for_root_field(
        document: &'a ExecutableDocument,
        operation_name: Option<&str>,
        response_key: &str,
        variables: &'a Variables,
    ) -> Result<Self, ProjectionError> {
        let operation = document.operations.get(operation_name).map_err(|_| {
            ProjectionError::UnknownOperation(operation_name.unwrap_or_default().to_owned())
        })?;
        let selection_set = &operation.selection_set;
        let field_nodes =
            collect_field_nodes(&selection_set.selections, response_key, &document.fragments);
        if field_nodes.is_empty() {
            return Err(ProjectionError::missing_field(
                &selection_set.ty,
                response_key,
            ));
        }
        Ok(Self {
            parent_type: selection_set.ty.clone(),
            field_nodes,
            fragments: &document.fragments,
            variables: with_default_values(&operation.variables, variables)?,
        })
    }

    /// The resolve info of a sub-field selected under this field, directly or through
    /// fragments.
    ///
    /// Returns `None` when no node selects `response_key`.
    pub fn child(&self, response_key: &str) -> Option<ResolveInfo<'a>> {
        let parent = self.field_nodes.first()?;
        let field_nodes: Vec<_> = self
            .field_nodes
            .iter()
            .flat_map(|&node| {
                collect_field_nodes(&node.selection_set.selections, response_key, self.fragments)
            })
            .collect();
        if field_nodes.is_empty() {
            return None;
        }
        Some(Self {
            parent_type: parent.selection_set.ty.clone(),
            field_nodes,
            fragments: self.fragments,
            variables: self.variables.clone(),
        })
    }

    /// The schema name of the requested field.
    pub fn field_name(&self) -> Option<&Name> {
        self.field_nodes.first().map(|node| &node.name)
    }

    /// The alias of the requested field, or its name.
    pub fn response_key(&self) -> Option<&Name> {
        self.field_nodes.first().map(|node| node.response_key())
    }
}

/// Fields selected as `response_key`, including those nested in inline fragments and fragment
/// spreads.
///
/// Every fragment is walked at most once. In a valid document a fragment selected on an object
/// type always applies to it, so type conditions are not checked; spreads of unknown fragments
/// are left for the resolution pass to report.
fn collect_field_nodes<'a>(
    selections: &'a [Selection],
    response_key: &str,
    fragments: &'a FragmentMap,
) -> Vec<&'a Node<executable::Field>> {
    let mut field_nodes = Vec::new();
    let mut visited_fragments = HashSet::new();
    collect_field_nodes_into(
        selections,
        response_key,
        fragments,
        &mut visited_fragments,
        &mut field_nodes,
    );
    field_nodes
}

fn collect_field_nodes_into<'a>(
    selections: &'a [Selection],
    response_key: &str,
    fragments: &'a FragmentMap,
    visited_fragments: &mut HashSet<&'a Name>,
    field_nodes: &mut Vec<&'a Node<executable::Field>>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                if field.response_key().as_str() == response_key {
                    field_nodes.push(field);
                }
            }
            Selection::InlineFragment(inline_fragment) => collect_field_nodes_into(
                &inline_fragment.selection_set.selections,
                response_key,
                fragments,
                visited_fragments,
                field_nodes,
            ),
            Selection::FragmentSpread(spread) => {
                if !visited_fragments.insert(&spread.fragment_name) {
                    continue;
                }
                if let Some(fragment) = fragments.get(&spread.fragment_name) {
                    collect_field_nodes_into(
                        &fragment.selection_set.selections,
                        response_key,
                        fragments,
                        visited_fragments,
                        field_nodes,
                    );
                }
            }
        }
    }
}

/// `variables` completed with the default values of the variables it lacks.
fn with_default_values<'a>(
    definitions: &[Node<executable::VariableDefinition>],
    variables: &'a Variables,
) -> Result<Cow<'a, Variables>, ProjectionError> {
    let mut variables = Cow::Borrowed(variables);
    // Default values are constants.
    let no_variables = Variables::new();
    let parser = ArgumentParser::new(&no_variables, false);
    for definition in definitions {
        let Some(default_value) = &definition.default_value else {
            continue;
        };
        if variables.contains_key(definition.name.as_str()) {
            continue;
        }
        if let Some(value) = parser.parse_value(&definition.name, default_value)? {
            variables.to_mut().insert(definition.name.as_str(), value);
        }
    }
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Schema;
    use pretty_assertions::assert_eq;
    use serde_json_bytes::Value;
    use serde_json_bytes::json;

    use super::*;

    const SDL: &str = r#"
        type Query { post(id: Int!): Post, posts(first: Int, offset: Int): [Post!]! }
        type Post { id: Int!, title: String!, author: Author }
        type Author { name: String! }
    "#;

    const QUERY: &str = r#"
        query One {
          first: post(id: 1) { title author { name } }
          first: post(id: 1) { id }
        }
        query Many { posts { title } }
    "#;

    fn parse(source: &str) -> apollo_compiler::validation::Valid<ExecutableDocument> {
        let schema = Schema::parse_and_validate(SDL, "schema.graphql").unwrap();
        ExecutableDocument::parse_and_validate(&schema, source, "query.graphql").unwrap()
    }

    fn document() -> apollo_compiler::validation::Valid<ExecutableDocument> {
        parse(QUERY)
    }

    #[test]
    fn collects_every_node_of_a_root_field() {
        let document = document();
        let variables = Variables::new();
        let info = ResolveInfo::for_root_field(&document, Some("One"), "first", &variables)
            .unwrap();
        assert_eq!(info.parent_type.as_str(), "Query");
        assert_eq!(info.field_nodes.len(), 2);
        assert_eq!(info.field_name().unwrap().as_str(), "post");
        assert_eq!(info.response_key().unwrap().as_str(), "first");
    }

    #[test]
    fn descends_into_children() {
        let document = document();
        let variables = Variables::new();
        let info = ResolveInfo::for_root_field(&document, Some("One"), "first", &variables)
            .unwrap();
        let author = info.child("author").unwrap();
        assert_eq!(author.parent_type.as_str(), "Post");
        assert_eq!(author.field_nodes.len(), 1);
        assert!(info.child("comments").is_none());
    }

    #[test]
    fn reports_unknown_operations_and_fields() {
        let document = document();
        let variables = Variables::new();
        let err = ResolveInfo::for_root_field(&document, Some("Other"), "posts", &variables)
            .unwrap_err();
        assert_eq!(err, ProjectionError::UnknownOperation("Other".to_string()));
        let err = ResolveInfo::for_root_field(&document, Some("Many"), "post", &variables)
            .unwrap_err();
        assert_eq!(err, ProjectionError::missing_field("Query", "post"));
    }

    #[test]
    fn finds_fields_selected_through_fragments() {
        let document = parse(
            r#"
            query { ...Root }
            fragment Root on Query { post(id: 1) { ...PostParts ... on Post { author { name } } } }
            fragment PostParts on Post { id author { name } }
            "#,
        );
        let variables = Variables::new();
        let info = ResolveInfo::for_root_field(&document, None, "post", &variables).unwrap();
        assert_eq!(info.field_nodes.len(), 1);

        let author = info.child("author").unwrap();
        assert_eq!(author.parent_type.as_str(), "Post");
        assert_eq!(author.field_nodes.len(), 2);
        assert_eq!(info.child("id").unwrap().field_nodes.len(), 1);
        assert!(info.child("title").is_none());
    }

    #[test]
    fn fills_in_variable_defaults() {
        let document = parse(
            r#"
            query($first: Int = 10, $offset: Int = 0) {
              posts(first: $first, offset: $offset) { author { name } }
            }
            "#,
        );
        let variables = json!({ "offset": 5 }).as_object().cloned().unwrap();
        let info = ResolveInfo::for_root_field(&document, None, "posts", &variables).unwrap();
        assert_eq!(
            Value::Object(info.variables.clone().into_owned()),
            json!({ "offset": 5, "first": 10 })
        );
        let author = info.child("author").unwrap();
        assert_eq!(author.variables.get("first"), Some(&json!(10)));
    }

    #[test]
    fn variables_without_defaults_are_borrowed() {
        let document = document();
        let variables = Variables::new();
        let info = ResolveInfo::for_root_field(&document, Some("Many"), "posts", &variables)
            .unwrap();
        assert!(matches!(info.variables, Cow::Borrowed(_)));
        assert!(info.variables.is_empty());
    }
}
