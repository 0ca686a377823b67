use thiserror::Error;

/// Registry-build failures. All of them abort engine initialization: no
/// partial registry is ever produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "the same processor instance has been registered by dialect \"{first}\" and dialect \
         \"{second}\"; processor instances must be unique among all configured dialects"
    )]
    DuplicateProcessor { first: String, second: String },

    #[error(
        "conflicting execution attribute: dialects \"{first}\" and \"{second}\" both declare an \
         execution attribute named \"{name}\""
    )]
    ConflictingExecutionAttribute {
        name: String,
        first: String,
        second: String,
    },

    #[error(
        "duplicate expression object: dialects \"{first}\" and \"{second}\" both register an \
         expression object named \"{name}\""
    )]
    DuplicateExpressionObject {
        name: String,
        first: String,
        second: String,
    },
}
