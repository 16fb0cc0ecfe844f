//! Concrete, frozen layouts.
//!
//! Each level wraps its normalized descriptor and the indices derived from
//! it. Builders run bottom-up through crate-private `Pending*` stages:
//! children are compiled and reconciled against the prior layout first,
//! then the parent assigns the remaining IDs and freezes them. Nothing in
//! a frozen layout is mutable.

mod column;
mod family;
mod locality_group;
mod table;

pub use column::ColumnLayout;
pub use family::FamilyLayout;
pub use locality_group::LocalityGroupLayout;
pub use table::TableLayout;
