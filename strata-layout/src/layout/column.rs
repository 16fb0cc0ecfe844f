use rustc_hash::FxHashSet;

use crate::descriptor::{CellSchema, ColumnDesc};
use crate::id::ColumnId;
use crate::name::{is_valid_alias, is_valid_layout_name};
use crate::schema::{validate_cell_schema, SchemaRegistry};
use strata_result::{Error, Result};

/// Concrete layout of a column inside a group-type family.
#[derive(Clone, Debug)]
pub struct ColumnLayout {
    desc: ColumnDesc,
    names: FxHashSet<String>,
    id: ColumnId,
    family: String,
}

impl ColumnLayout {
    /// The normalized descriptor for this column.
    pub fn desc(&self) -> &ColumnDesc {
        &self.desc
    }

    /// The primary name of the column.
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// The primary name and aliases of the column.
    pub fn names(&self) -> &FxHashSet<String> {
        &self.names
    }

    /// The short ID assigned to this column.
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// The schema of the cells in this column.
    pub fn column_schema(&self) -> &CellSchema {
        &self.desc.column_schema
    }

    /// Primary name of the group-type family this column belongs to.
    pub fn family(&self) -> &str {
        &self.family
    }
}

/// Column being compiled; frozen by the family builder once every sibling
/// has an ID.
pub(super) struct PendingColumn {
    desc: ColumnDesc,
    names: FxHashSet<String>,
    id: Option<ColumnId>,
}

impl PendingColumn {
    /// Compiles one column descriptor, reconciling it with the matching
    /// column of the prior family when there is one.
    pub(super) fn build(
        family: &str,
        mut desc: ColumnDesc,
        reference: Option<&ColumnLayout>,
        registry: &dyn SchemaRegistry,
    ) -> Result<Self> {
        let mut names = FxHashSet::default();
        names.insert(desc.name.clone());
        names.extend(desc.aliases.iter().cloned());

        if !is_valid_layout_name(&desc.name) {
            return Err(Error::InvalidLayout(format!(
                "Invalid column name: '{}'.",
                desc.name
            )));
        }
        for name in &names {
            if !is_valid_alias(name) {
                return Err(Error::InvalidLayout(format!(
                    "Invalid column alias: '{name}'."
                )));
            }
        }

        let mut id = (desc.id > 0).then(|| ColumnId::new(desc.id));

        if let Some(reference) = reference {
            if let Some(id) = id {
                if id != reference.id() {
                    return Err(Error::InvalidLayout(format!(
                        "Descriptor for column '{}:{}' has ID {} but prior ID is {}.",
                        family,
                        desc.name,
                        id,
                        reference.id()
                    )));
                }
            }
            id = Some(reference.id());
            desc.id = reference.id().value();

            if desc.column_schema.storage != reference.desc.column_schema.storage {
                return Err(Error::InvalidLayout(format!(
                    "Invalid layout update for column '{}:{}' from cell storage {} to {}.",
                    family, desc.name, reference.desc.column_schema.storage,
                    desc.column_schema.storage
                )));
            }
        }

        validate_cell_schema(&desc.column_schema, registry)?;

        Ok(Self { desc, names, id })
    }

    pub(super) fn name(&self) -> &str {
        &self.desc.name
    }

    pub(super) fn names(&self) -> &FxHashSet<String> {
        &self.names
    }

    pub(super) fn id(&self) -> Option<ColumnId> {
        self.id
    }

    /// Binds the allocator-chosen ID, recording it in the descriptor.
    pub(super) fn assign_id(&mut self, id: ColumnId) {
        debug_assert!(self.id.is_none());
        self.id = Some(id);
        self.desc.id = id.value();
    }

    pub(super) fn freeze(self, family: &str) -> Result<ColumnLayout> {
        let id = self.id.ok_or_else(|| {
            Error::Internal(format!("column '{}' has no ID at freeze", self.desc.name))
        })?;
        Ok(ColumnLayout {
            desc: self.desc,
            names: self.names,
            id,
            family: family.to_string(),
        })
    }
}
