//! Noun schemas.
//!
//! A schema is an ordered mapping of field name to field definition. Field
//! definitions are written as short strings and parsed once per schema load:
//!
//! ```ignore
//! {
//!     "name": "string",
//!     "status": "draft | published",
//!     "publishedAt": "datetime?",
//!     "author": "->User",
//!     "tags": ["->Tag"],
//!     "comments": "<-Comment",
//! }
//! ```

pub mod field;
pub mod noun;

pub use field::{FieldDef, FieldKind, Primitive, RelationOp};
pub use noun::{NounSchema, RelationField};
