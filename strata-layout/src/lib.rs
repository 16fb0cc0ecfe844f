//! Table-layout compiler and validator for the strata wide-column store.
//!
//! Strata uses the term *layout* to describe the structure of a table, to
//! avoid confusion with the cell value schemas stored inside it. A layout
//! descriptor ([`TableLayoutDesc`]) declares the table's locality groups,
//! the column families inside each group, and the columns inside each
//! group-type family. [`TableLayout`] compiles a descriptor into a frozen
//! concrete layout with strict validation, and provides accessors to
//! navigate the result.
//!
//! # Descriptors
//!
//! Descriptors come in two flavors:
//!
//! - **Concrete layouts** stand alone: every locality group, family, and
//!   column carries an assigned ID, and no prior layout is needed.
//! - **Update descriptors** build on a prior concrete layout and describe
//!   modifications to apply on it: entities may be added, deleted
//!   (`delete: true`), renamed (`renamed_from`), or modified in place.
//!   Applying an update on a concrete layout yields a new concrete layout.
//!
//! # Validation rules
//!
//! - Table, locality group, family, and column names must be valid
//!   identifiers; map-type family qualifiers are free-form and never appear
//!   in a layout.
//! - Locality group names and aliases must be unique within the table; so
//!   must family names and aliases. Column names and aliases must be unique
//!   within their group-type family.
//! - The kind of a family (map-type or group-type) cannot change, a family
//!   cannot move between locality groups, the row-key encoding of the table
//!   cannot change, and the cell storage (hash, UID, final) cannot change.
//! - Every entity of the prior layout must be accounted for in the update:
//!   kept, renamed, or explicitly deleted.
//!
//! # Short IDs
//!
//! For storage efficiency, locality group, family, and column names are
//! translated into short on-disk identifiers ([`ColumnId`]). IDs are
//! assigned automatically, are stable across layout updates, and may also
//! be supplied explicitly in the descriptor, in which case the compiler
//! checks their consistency. An ID change is equivalent to deleting the
//! entity and re-creating it empty, so IDs never change.
//!
//! The compiler is a pure synchronous function of
//! `(descriptor, optional prior layout)`; the frozen result is deeply
//! immutable and can be shared across threads freely.

#![forbid(unsafe_code)]

pub mod column_name;
pub mod descriptor;
pub mod id;
pub mod layout;
pub mod name;
pub mod schema;

pub use column_name::ColumnName;
pub use descriptor::{
    CellSchema, ColumnDesc, CompressionType, FamilyDesc, LocalityGroupDesc, RowKeyEncoding,
    SchemaStorage, SchemaType, TableLayoutDesc,
};
pub use id::{ColumnId, IdNameMap};
pub use layout::{ColumnLayout, FamilyLayout, LocalityGroupLayout, TableLayout};
pub use schema::{
    CellFormat, EmptyRegistry, RecordField, SchemaRegistry, StaticRegistry, ValueSchema,
};

pub use strata_result::{Error, Result};
