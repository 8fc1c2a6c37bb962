//! Persistence and workflow layer for category application forms: the
//! [`FieldStore`] port with in-memory and JSON-file adapters, the admin
//! [`FieldConfigService`], and the applicant [`ApplicationSession`].

pub mod admin;
pub mod catalog;
pub mod json_file;
pub mod memory;
pub mod port;
pub mod session;

pub use admin::{AdminError, FieldConfigService, Notice, NoticeLevel};
pub use catalog::Catalog;
pub use json_file::JsonFileFieldStore;
pub use memory::InMemoryFieldStore;
pub use port::{CategoryRow, FieldPatch, FieldStore, StoreError, StoreResult};
pub use session::{
    ApplicationSession, ApplicationSink, ApplicationSubmission, InMemoryApplicationSink,
    SessionError,
};
