use rustc_hash::{FxHashMap, FxHashSet};

use super::column::{ColumnLayout, PendingColumn};
use crate::descriptor::{CellSchema, FamilyDesc};
use crate::id::{ColumnId, IdAllocator, IdNameMap};
use crate::name::{is_valid_alias, is_valid_layout_name};
use crate::schema::{validate_cell_schema, SchemaRegistry};
use strata_result::{Error, Result};

/// Concrete layout of a column family.
///
/// A family is either *group-type* (a fixed set of named columns) or
/// *map-type* (free-form qualifiers sharing a single value schema). The
/// kind is immutable across layout updates.
#[derive(Clone, Debug)]
pub struct FamilyLayout {
    desc: FamilyDesc,
    names: FxHashSet<String>,
    id: ColumnId,
    columns: Vec<ColumnLayout>,
    /// Column name or alias → position in `columns`.
    column_index: FxHashMap<String, usize>,
    column_ids: IdNameMap,
    locality_group: String,
}

impl FamilyLayout {
    /// The normalized descriptor for this family.
    pub fn desc(&self) -> &FamilyDesc {
        &self.desc
    }

    /// The primary name of the family.
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// The primary name and aliases of the family.
    pub fn names(&self) -> &FxHashSet<String> {
        &self.names
    }

    /// The short ID assigned to this family.
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// Whether this is a map-type family.
    pub fn is_map_type(&self) -> bool {
        self.desc.map_schema.is_some()
    }

    /// Whether this is a group-type family.
    pub fn is_group_type(&self) -> bool {
        !self.is_map_type()
    }

    /// The value schema shared by the cells of a map-type family.
    pub fn map_schema(&self) -> Option<&CellSchema> {
        self.desc.map_schema.as_ref()
    }

    /// The columns of this family, in declaration order. Empty for
    /// map-type families.
    pub fn columns(&self) -> &[ColumnLayout] {
        &self.columns
    }

    /// Looks up a column by primary name or alias.
    pub fn column(&self, name_or_alias: &str) -> Option<&ColumnLayout> {
        self.column_index
            .get(name_or_alias)
            .map(|&index| &self.columns[index])
    }

    /// Bidirectional mapping between column IDs and primary names.
    pub fn column_ids(&self) -> &IdNameMap {
        &self.column_ids
    }

    /// Primary name of the locality group this family belongs to.
    pub fn locality_group(&self) -> &str {
        &self.locality_group
    }
}

/// Family being compiled; frozen by the locality-group builder once every
/// sibling has an ID.
pub(super) struct PendingFamily {
    desc: FamilyDesc,
    names: FxHashSet<String>,
    id: Option<ColumnId>,
    columns: Vec<ColumnLayout>,
    column_index: FxHashMap<String, usize>,
    column_ids: IdNameMap,
}

impl PendingFamily {
    /// Compiles one family descriptor, reconciling its columns with the
    /// matching family of the prior locality group when there is one.
    pub(super) fn build(
        mut desc: FamilyDesc,
        reference: Option<&FamilyLayout>,
        registry: &dyn SchemaRegistry,
    ) -> Result<Self> {
        if !desc.columns.is_empty() && desc.map_schema.is_some() {
            return Err(Error::InvalidLayout(format!(
                "Invalid family '{}' with both map-type schema and columns.",
                desc.name
            )));
        }

        let mut names = FxHashSet::default();
        names.insert(desc.name.clone());
        names.extend(desc.aliases.iter().cloned());

        if !is_valid_layout_name(&desc.name) {
            return Err(Error::InvalidLayout(format!(
                "Invalid family name: '{}'.",
                desc.name
            )));
        }
        for name in &names {
            if !is_valid_alias(name) {
                return Err(Error::InvalidLayout(format!(
                    "Invalid family alias: '{name}'."
                )));
            }
        }

        let mut id = (desc.id > 0).then(|| ColumnId::new(desc.id));

        if let Some(reference) = reference {
            if let Some(id) = id {
                if id != reference.id() {
                    return Err(Error::InvalidLayout(format!(
                        "Descriptor for family '{}' has ID {} but prior ID is {}.",
                        desc.name,
                        id,
                        reference.id()
                    )));
                }
            }
            id = Some(reference.id());
            desc.id = reference.id().value();

            // The family kind cannot change across updates.
            if reference.is_map_type() != desc.map_schema.is_some() {
                let kind = |map: bool| if map { "map" } else { "group" };
                return Err(Error::InvalidLayout(format!(
                    "Invalid layout update for family '{}' from {}-type to {}-type.",
                    desc.name,
                    kind(reference.is_map_type()),
                    kind(desc.map_schema.is_some())
                )));
            }

            if let (Some(new_schema), Some(prior_schema)) =
                (&desc.map_schema, &reference.desc.map_schema)
            {
                if new_schema.storage != prior_schema.storage {
                    return Err(Error::InvalidLayout(format!(
                        "Invalid layout update for family '{}' from cell storage {} to {}.",
                        desc.name, prior_schema.storage, new_schema.storage
                    )));
                }
            }
        }

        if let Some(map_schema) = &desc.map_schema {
            validate_cell_schema(map_schema, registry)?;
        }

        // Columns of the prior family, keyed by primary name. Entries are
        // removed as descriptors account for them; whatever remains at the
        // end was neither kept, renamed, nor deleted.
        let mut remaining: FxHashMap<String, ColumnId> = reference
            .map(|family| family.column_ids.name_to_id().clone())
            .unwrap_or_default();

        let mut pending: Vec<PendingColumn> = Vec::new();
        let mut column_index: FxHashMap<String, usize> = FxHashMap::default();
        let mut column_ids = IdNameMap::default();
        let mut unassigned: Vec<usize> = Vec::new();

        for mut column_desc in std::mem::take(&mut desc.columns) {
            let renamed_from = column_desc.renamed_from.take();
            let lookup_name = renamed_from
                .clone()
                .unwrap_or_else(|| column_desc.name.clone());

            if renamed_from.is_some() && reference.is_none() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid renaming: cannot find prior family for column '{}:{}'.",
                    desc.name, lookup_name
                )));
            }
            let reference_column = reference.and_then(|family| family.column(&lookup_name));
            if renamed_from.is_some() && reference_column.is_none() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid renaming: cannot find column '{}:{}' in prior family.",
                    desc.name, lookup_name
                )));
            }

            let prior_id = remaining.remove(&lookup_name);

            if column_desc.delete {
                if prior_id.is_none() {
                    return Err(Error::InvalidLayout(format!(
                        "Deleted column '{}:{}' does not exist in prior layout.",
                        desc.name, lookup_name
                    )));
                }
                // Deletions are dropped from the normalized descriptor.
                continue;
            }

            let column = PendingColumn::build(&desc.name, column_desc, reference_column, registry)?;
            let index = pending.len();
            for name in column.names() {
                if column_index.insert(name.clone(), index).is_some() {
                    return Err(Error::InvalidLayout(format!(
                        "Family '{}' contains duplicate column qualifier '{}'.",
                        desc.name, name
                    )));
                }
            }
            match column.id() {
                Some(id) => {
                    if let Some(previous) = column_ids.insert(id, column.name().to_string()) {
                        return Err(Error::InvalidLayout(format!(
                            "Duplicate column ID {} associated to '{}' and '{}'.",
                            id,
                            column.name(),
                            previous
                        )));
                    }
                }
                None => unassigned.push(index),
            }
            pending.push(column);
        }

        if !remaining.is_empty() {
            let mut missing: Vec<String> = remaining.into_keys().collect();
            missing.sort();
            return Err(Error::InvalidLayout(format!(
                "Descriptor for family '{}' is missing columns: {}.",
                desc.name,
                missing.join(", ")
            )));
        }

        // Assign the smallest free IDs to the remaining columns, in
        // declaration order.
        let mut allocator = IdAllocator::new();
        for &index in &unassigned {
            let id = allocator.next_free(&column_ids);
            column_ids.insert(id, pending[index].name().to_string());
            pending[index].assign_id(id);
        }

        let mut columns = Vec::with_capacity(pending.len());
        for column in pending {
            columns.push(column.freeze(&desc.name)?);
        }
        desc.columns = columns.iter().map(|column| column.desc().clone()).collect();

        Ok(Self {
            desc,
            names,
            id,
            columns,
            column_index,
            column_ids,
        })
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

    pub(super) fn freeze(self, locality_group: &str) -> Result<FamilyLayout> {
        let id = self.id.ok_or_else(|| {
            Error::Internal(format!("family '{}' has no ID at freeze", self.desc.name))
        })?;
        Ok(FamilyLayout {
            desc: self.desc,
            names: self.names,
            id,
            columns: self.columns,
            column_index: self.column_index,
            column_ids: self.column_ids,
            locality_group: locality_group.to_string(),
        })
    }
}
