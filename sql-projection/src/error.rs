//! Projection errors.
use displaydoc::Display;
use thiserror::Error;

/// Errors raised while resolving a selection into SQL expressions.
///
/// Every variant aborts the resolution pass; the caller is expected to fail the
/// enclosing request.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProjectionError {
    /// cannot query field '{field}' on type '{type_name}'
    MissingField {
        /// The type the field was looked up on.
        type_name: String,
        /// The requested field.
        field: String,
    },
    /// unknown fragment "{0}"
    UnknownFragment(String),
    /// type '{0}' is not part of the projection schema
    UnknownType(String),
    /// unknown operation named "{0}"
    UnknownOperation(String),
    /// variable '${0}' is not defined in the variable table
    UnknownVariable(String),
    /// invalid value for argument '{argument}': {reason}
    InvalidArgument {
        /// The argument name.
        argument: String,
        /// Why the literal could not be converted.
        reason: String,
    },
    /// field '{0}' is selected more than once with different expressions; alias one of them
    DuplicateField(String),
    /// selection processing recursion limit({0}) exceeded
    RecursionLimitExceeded(usize),
    /// no resolve info was supplied and whole-row projection is disabled
    MissingResolveInfo,
}

impl ProjectionError {
    /// A stable machine readable code for this error.
    pub fn extension_code(&self) -> &'static str {
        match self {
            ProjectionError::MissingField { .. } => "MISSING_FIELD",
            ProjectionError::UnknownFragment(_) => "UNKNOWN_FRAGMENT",
            ProjectionError::UnknownType(_) => "UNKNOWN_TYPE",
            ProjectionError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            ProjectionError::UnknownVariable(_) => "UNKNOWN_VARIABLE",
            ProjectionError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            ProjectionError::DuplicateField(_) => "DUPLICATE_FIELD",
            ProjectionError::RecursionLimitExceeded(_) => "RECURSION_LIMIT_EXCEEDED",
            ProjectionError::MissingResolveInfo => "MISSING_RESOLVE_INFO",
        }
    }

    pub(crate) fn missing_field(type_name: &str, field: &str) -> Self {
        ProjectionError::MissingField {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
        }
    }
}

/// Errors raised while registering expressions on a [`ProjectionSchema`].
///
/// [`ProjectionSchema`]: crate::ProjectionSchema
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// type '{0}' is not an object or interface type of the schema
    UnknownType(String),
    /// type '{type_name}' has no field '{field}'
    UnknownField {
        /// The type the field was looked up on.
        type_name: String,
        /// The missing field.
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_items() {
        let err = ProjectionError::missing_field("Post", "author");
        assert_eq!(err.to_string(), "cannot query field 'author' on type 'Post'");
        assert_eq!(err.extension_code(), "MISSING_FIELD");

        let err = ProjectionError::UnknownFragment("PostParts".to_string());
        assert_eq!(err.to_string(), "unknown fragment \"PostParts\"");

        let err = ProjectionError::RecursionLimitExceeded(3);
        assert_eq!(
            err.to_string(),
            "selection processing recursion limit(3) exceeded"
        );
    }
}
