pub mod category;
pub mod field;
pub mod rule;

pub use category::CategorySpec;
pub use field::{
    CategoryId, ConditionalField, FieldDefinition, FieldId, FieldType, REQUIRED_MESSAGE,
    SpecError, derive_name,
};
pub use rule::{RuleKind, RuleValue, ValidationRule};
