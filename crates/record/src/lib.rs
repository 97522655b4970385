//! # Strata Record
//!
//! Small fixed-field value objects, defined at runtime from a list of field
//! names. Types carry optional per-field defaults and a mutability switch
//! chosen when the type is defined.
//!
//! Layered maps store records as opaque values and only ever compare them
//! with `==`.

pub mod error;
pub mod record;
pub mod schema;

pub use error::{RecordError, Result};
pub use record::Record;
pub use schema::{RecordType, RecordTypeBuilder};
