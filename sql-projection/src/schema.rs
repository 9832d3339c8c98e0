//! The schema model consulted during projection.
//!
//! It mirrors the object and interface types of a GraphQL schema, and attaches to each field
//! the function building its SQL expression. It is built once and only read afterwards.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::arguments::Arguments;
use crate::error::SchemaError;
use crate::sql::SqlExpression;

/// Builds the SQL expression of a field from the row alias and the parsed field arguments.
pub type ExpressionBuilder = Arc<dyn Fn(&str, &Arguments) -> SqlExpression + Send + Sync>;

/// A type reference, as declared on a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(Name),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    /// Removes one level of non-null wrapping.
    pub fn strip_non_null(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }

    /// The named type at the bottom of the wrappers.
    ///
    /// Example: for `[Comment!]!` it returns `Comment`.
    pub fn inner_named_type(&self) -> &Name {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.inner_named_type(),
        }
    }

    /// The item type if this is a (possibly non-null) list.
    pub fn list_item(&self) -> Option<&TypeRef> {
        match self.strip_non_null() {
            TypeRef::List(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl From<&'_ ast::Type> for TypeRef {
    fn from(ty: &'_ ast::Type) -> Self {
        match ty {
            ast::Type::Named(name) => TypeRef::Named(name.clone()),
            ast::Type::NonNullNamed(name) => {
                TypeRef::NonNull(Box::new(TypeRef::Named(name.clone())))
            }
            ast::Type::List(inner) => TypeRef::List(Box::new((&**inner).into())),
            ast::Type::NonNullList(inner) => TypeRef::NonNull(Box::new(TypeRef::List(Box::new(
                (&**inner).into(),
            )))),
        }
    }
}

/// A field of an [`ObjectType`].
#[derive(Clone)]
pub struct FieldDefinition {
    pub name: Name,
    pub ty: TypeRef,
    pub(crate) sql_expression: Option<ExpressionBuilder>,
}

impl FieldDefinition {
    pub fn new(name: Name, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            sql_expression: None,
        }
    }

    pub fn with_expression<F>(mut self, builder: F) -> Self
    where
        F: Fn(&str, &Arguments) -> SqlExpression + Send + Sync + 'static,
    {
        self.sql_expression = Some(Arc::new(builder));
        self
    }

    pub fn has_expression(&self) -> bool {
        self.sql_expression.is_some()
    }

    /// Invokes the expression builder, if the field has one.
    pub fn sql_expression(&self, alias: &str, arguments: &Arguments) -> Option<SqlExpression> {
        self.sql_expression
            .as_ref()
            .map(|builder| builder(alias, arguments))
    }
}

impl Debug for FieldDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("sql_expression", &self.sql_expression.is_some())
            .finish()
    }
}

/// An object or interface type.
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: Name,
    pub fields: IndexMap<Name, FieldDefinition>,
    pub interfaces: IndexSet<Name>,
}

impl ObjectType {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            fields: IndexMap::new(),
            interfaces: IndexSet::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_interface(mut self, interface: Name) -> Self {
        self.interfaces.insert(interface);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.contains(interface)
    }

    /// Whether a fragment with this type condition applies to values of this type.
    pub fn matches_type_condition(&self, type_condition: &str) -> bool {
        self.name == type_condition || self.implements(type_condition)
    }
}

/// The registry of types and field expressions.
#[derive(Debug, Clone, Default)]
pub struct ProjectionSchema {
    types: IndexMap<Name, ObjectType>,
}

impl ProjectionSchema {
    /// Mirrors every object and interface type of `schema`. No field has an expression yet.
    pub fn from_schema(schema: &Valid<Schema>) -> Self {
        let mut types = IndexMap::new();
        for (name, extended_type) in &schema.types {
            if extended_type.is_built_in() {
                continue;
            }
            let (fields, interfaces) = match extended_type {
                ExtendedType::Object(object) => (&object.fields, &object.implements_interfaces),
                ExtendedType::Interface(interface) => {
                    (&interface.fields, &interface.implements_interfaces)
                }
                _ => continue,
            };
            let mut object_type = ObjectType::new(name.clone());
            for (field_name, field) in fields {
                object_type = object_type
                    .with_field(FieldDefinition::new(field_name.clone(), (&field.ty).into()));
            }
            for interface in interfaces {
                object_type = object_type.with_interface(interface.name.clone());
            }
            types.insert(name.clone(), object_type);
        }
        Self { types }
    }

    pub fn with_type(mut self, object_type: ObjectType) -> Self {
        self.types.insert(object_type.name.clone(), object_type);
        self
    }

    pub fn get_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    /// Attaches an expression builder to `type_name.field_name`.
    pub fn register_expression<F>(
        &mut self,
        type_name: &str,
        field_name: &str,
        builder: F,
    ) -> Result<&mut Self, SchemaError>
    where
        F: Fn(&str, &Arguments) -> SqlExpression + Send + Sync + 'static,
    {
        let object_type = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_owned()))?;
        let field = object_type.fields.get_mut(field_name).ok_or_else(|| {
            SchemaError::UnknownField {
                type_name: type_name.to_owned(),
                field: field_name.to_owned(),
            }
        })?;
        field.sql_expression = Some(Arc::new(builder));
        Ok(self)
    }

    /// Maps `type_name.field_name` to the column `column` of the aliased row.
    pub fn register_column(
        &mut self,
        type_name: &str,
        field_name: &str,
        column: &str,
    ) -> Result<&mut Self, SchemaError> {
        let column = column.to_owned();
        self.register_expression(type_name, field_name, move |alias, _| {
            SqlExpression::identifier([alias, column.as_str()])
        })
    }
}
