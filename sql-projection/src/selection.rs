//! Resolution of a GraphQL selection into the SQL expressions it needs.
//!
//! Only leaf expressions of the resolved type are collected: a selected field either has an
//! expression builder, in which case its expression is added under the field's response key,
//! or it is skipped. Fragments are flattened into the selection when their type condition
//! applies to the resolved type. Connection fields (`edges { node { ... } }`) are resolved
//! against the node type.

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::executable;
use apollo_compiler::executable::FragmentMap;
use apollo_compiler::executable::Selection;
use indexmap::IndexMap;

use crate::arguments::ArgumentParser;
use crate::configuration::Configuration;
use crate::configuration::DuplicateFields;
use crate::context::ResolveInfo;
use crate::error::ProjectionError;
use crate::schema::ObjectType;
use crate::schema::ProjectionSchema;
use crate::schema::TypeRef;
use crate::sql;
use crate::sql::SqlExpression;

const TYPENAME: &str = "__typename";
const EDGES: &str = "edges";
const NODE: &str = "node";

/// SQL expressions keyed by response key, in selection order.
pub type ProjectedFields = IndexMap<Name, SqlExpression>;

/// Turns resolve info into the projection of one aliased row.
#[derive(Debug, Clone)]
pub struct Projector {
    schema: Arc<ProjectionSchema>,
    configuration: Configuration,
}

impl Projector {
    pub fn new(schema: Arc<ProjectionSchema>, configuration: Configuration) -> Self {
        Self {
            schema,
            configuration,
        }
    }

    pub fn schema(&self) -> &ProjectionSchema {
        &self.schema
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The expression projecting the row `alias` as a JSON object holding the requested fields.
    ///
    /// Without resolve info the whole row is serialized, unless
    /// [`Configuration::require_resolve_info`] is set.
    pub fn select_fragment(
        &self,
        info: Option<&ResolveInfo<'_>>,
        alias: &str,
    ) -> Result<SqlExpression, ProjectionError> {
        let Some(info) = info else {
            if self.configuration.require_resolve_info {
                return Err(ProjectionError::MissingResolveInfo);
            }
            tracing::warn!(
                "no resolve info supplied for '{alias}', projecting the whole row; \
                this fallback is deprecated"
            );
            return Ok(sql::to_json(alias));
        };
        let fields = self.collect_fields(info, alias)?;
        Ok(sql::json_build_object(&fields))
    }

    /// Collects the expressions of every field requested under the resolved field.
    #[tracing::instrument(skip_all, level = "trace", fields(parent_type = %info.parent_type, alias = %alias))]
    pub fn collect_fields(
        &self,
        info: &ResolveInfo<'_>,
        alias: &str,
    ) -> Result<ProjectedFields, ProjectionError> {
        let parent_type = self.object_type(&info.parent_type)?;
        let mut pass = ResolutionPass {
            schema: &self.schema,
            configuration: &self.configuration,
            alias,
            fragments: info.fragments,
            arguments: ArgumentParser::new(&info.variables, self.configuration.strict_variables),
            fields: ProjectedFields::new(),
        };
        for field_node in &info.field_nodes {
            let field = parent_type.field(&field_node.name).ok_or_else(|| {
                ProjectionError::missing_field(&parent_type.name, &field_node.name)
            })?;
            let field_type = field.ty.strip_non_null();
            match self.connection_node_type(field_type) {
                Some(node_type) => {
                    for node in connection_nodes(&field_node.selection_set.selections) {
                        pass.add_selections(&node.selection_set.selections, node_type, 0)?;
                    }
                }
                None => pass.add_selections(
                    &field_node.selection_set.selections,
                    field_type.inner_named_type(),
                    0,
                )?,
            }
        }
        Ok(pass.fields)
    }

    fn object_type(&self, name: &str) -> Result<&ObjectType, ProjectionError> {
        self.schema
            .get_type(name)
            .ok_or_else(|| ProjectionError::UnknownType(name.to_owned()))
    }

    /// The node type of a connection: a type with an `edges` list whose items have a `node`.
    fn connection_node_type(&self, ty: &TypeRef) -> Option<&Name> {
        let TypeRef::Named(name) = ty else {
            return None;
        };
        let edges = self.schema.get_type(name)?.field(EDGES)?;
        let edge_type = edges.ty.list_item()?.inner_named_type();
        let node = self.schema.get_type(edge_type)?.field(NODE)?;
        Some(node.ty.strip_non_null().inner_named_type())
    }
}

/// Every `node` field selected under an `edges` field.
fn connection_nodes(
    selections: &[Selection],
) -> impl Iterator<Item = &Node<executable::Field>> {
    fields_named(selections, EDGES)
        .flat_map(|edges| fields_named(&edges.selection_set.selections, NODE))
}

fn fields_named<'a>(
    selections: &'a [Selection],
    name: &'a str,
) -> impl Iterator<Item = &'a Node<executable::Field>> {
    selections.iter().filter_map(move |selection| match selection {
        Selection::Field(field) if field.name.as_str() == name => Some(field),
        _ => None,
    })
}

/// The state of one resolution: owns the accumulator, never shared across passes.
struct ResolutionPass<'a> {
    schema: &'a ProjectionSchema,
    configuration: &'a Configuration,
    alias: &'a str,
    fragments: &'a FragmentMap,
    arguments: ArgumentParser<'a>,
    fields: ProjectedFields,
}

impl<'a> ResolutionPass<'a> {
    fn add_selections(
        &mut self,
        selections: &[Selection],
        type_name: &str,
        depth: usize,
    ) -> Result<(), ProjectionError> {
        if selections.is_empty() {
            return Ok(());
        }
        let object_type = self
            .schema
            .get_type(type_name)
            .ok_or_else(|| ProjectionError::UnknownType(type_name.to_owned()))?;
        self.add_selections_of(selections, object_type, depth)
    }

    fn add_selections_of(
        &mut self,
        selections: &[Selection],
        object_type: &'a ObjectType,
        depth: usize,
    ) -> Result<(), ProjectionError> {
        if depth > self.configuration.recursion_limit {
            tracing::error!(
                "selection processing recursion limit({}) exceeded",
                self.configuration.recursion_limit
            );
            return Err(ProjectionError::RecursionLimitExceeded(
                self.configuration.recursion_limit,
            ));
        }
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    if field.name.as_str() == TYPENAME {
                        tracing::debug!("'{TYPENAME}' has no SQL expression, skipping");
                        continue;
                    }
                    let definition = object_type.field(&field.name).ok_or_else(|| {
                        ProjectionError::missing_field(&object_type.name, &field.name)
                    })?;
                    let arguments = self.arguments.parse(&field.arguments)?;
                    match definition.sql_expression(self.alias, &arguments) {
                        Some(expression) => {
                            tracing::trace!(
                                "projecting {}.{}: {}",
                                object_type.name,
                                field.name,
                                definition.ty.strip_non_null()
                            );
                            self.insert(field.response_key(), expression)?;
                        }
                        None => tracing::warn!(
                            "no SQL expression for '{}.{}', skipping",
                            object_type.name,
                            field.name
                        ),
                    }
                }
                Selection::InlineFragment(inline_fragment) => {
                    // Without a type condition the fragment applies to the enclosing type.
                    let applies = inline_fragment
                        .type_condition
                        .as_ref()
                        .is_none_or(|condition| object_type.matches_type_condition(condition));
                    if applies {
                        self.add_selections_of(
                            &inline_fragment.selection_set.selections,
                            object_type,
                            depth + 1,
                        )?;
                    } else {
                        tracing::debug!(
                            "inline fragment does not apply to '{}', skipping",
                            object_type.name
                        );
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let fragment = self.fragments.get(&spread.fragment_name).ok_or_else(|| {
                        ProjectionError::UnknownFragment(spread.fragment_name.to_string())
                    })?;
                    if object_type.matches_type_condition(fragment.type_condition()) {
                        self.add_selections_of(
                            &fragment.selection_set.selections,
                            object_type,
                            depth + 1,
                        )?;
                    } else {
                        tracing::debug!(
                            "fragment {} does not apply to '{}', skipping",
                            spread.fragment_name,
                            object_type.name
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, key: &Name, expression: SqlExpression) -> Result<(), ProjectionError> {
        match self.fields.get(key) {
            // The same field selected twice, merged.
            Some(existing) if *existing == expression => return Ok(()),
            Some(_) => match self.configuration.duplicate_fields {
                DuplicateFields::Warn => tracing::warn!(
                    "field '{key}' is selected more than once with different expressions, \
                    keeping the last one; alias the selections to keep both"
                ),
                DuplicateFields::Reject => {
                    return Err(ProjectionError::DuplicateField(key.to_string()));
                }
            },
            None => {}
        }
        self.fields.insert(key.clone(), expression);
        Ok(())
    }
}
