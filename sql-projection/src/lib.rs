//! Resolves the selection a GraphQL client makes on a field into the SQL expressions needed to
//! project one row, so that only the requested columns are read from the database.
//!
//! ## Usage
//!
//! A [`ProjectionSchema`] mirrors the GraphQL schema and holds, for each field that maps to the
//! database, the function building its SQL expression. A [`Projector`] then walks the
//! selection of a field described by a [`ResolveInfo`] and builds the
//! `json_build_object(...)` expression of the aliased row:
//!
//! ```ignore
//! let mut schema = ProjectionSchema::from_schema(&graphql_schema);
//! schema.register_column("Post", "title", "title")?;
//! let projector = Projector::new(Arc::new(schema), Configuration::default());
//! let info = ResolveInfo::for_root_field(&document, None, "post", &variables)?;
//! let expression = projector.select_fragment(Some(&info), "post")?;
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod arguments;
mod configuration;
mod context;
pub mod error;
mod schema;
mod selection;
pub mod sql;

pub use crate::arguments::Arguments;
pub use crate::arguments::Variables;
pub use crate::configuration::Configuration;
pub use crate::configuration::DuplicateFields;
pub use crate::configuration::generate_config_schema;
pub use crate::context::ResolveInfo;
pub use crate::error::ProjectionError;
pub use crate::error::SchemaError;
pub use crate::schema::ExpressionBuilder;
pub use crate::schema::FieldDefinition;
pub use crate::schema::ObjectType;
pub use crate::schema::ProjectionSchema;
pub use crate::schema::TypeRef;
pub use crate::selection::ProjectedFields;
pub use crate::selection::Projector;
pub use crate::sql::CompiledQuery;
pub use crate::sql::SqlExpression;
