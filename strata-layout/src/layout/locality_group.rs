use rustc_hash::{FxHashMap, FxHashSet};

use super::family::{FamilyLayout, PendingFamily};
use crate::descriptor::{CompressionType, LocalityGroupDesc};
use crate::id::{ColumnId, IdAllocator, IdNameMap};
use crate::name::{is_valid_alias, is_valid_layout_name};
use crate::schema::SchemaRegistry;
use strata_result::{Error, Result};

/// Concrete layout of a locality group.
///
/// All families inside a locality group share its retention, compression,
/// versioning, and memory-vs-disk placement.
#[derive(Clone, Debug)]
pub struct LocalityGroupLayout {
    desc: LocalityGroupDesc,
    names: FxHashSet<String>,
    id: ColumnId,
    families: Vec<FamilyLayout>,
    /// Family name or alias → position in `families`.
    family_index: FxHashMap<String, usize>,
    family_ids: IdNameMap,
}

impl LocalityGroupLayout {
    /// The normalized descriptor for this locality group.
    pub fn desc(&self) -> &LocalityGroupDesc {
        &self.desc
    }

    /// The primary name of the locality group.
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// The primary name and aliases of the locality group.
    pub fn names(&self) -> &FxHashSet<String> {
        &self.names
    }

    /// The short ID assigned to this locality group.
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// Whether the group's data is pinned in memory.
    pub fn in_memory(&self) -> bool {
        self.desc.in_memory
    }

    /// Data retention lifetime, in seconds.
    pub fn ttl_seconds(&self) -> i32 {
        self.desc.ttl_seconds
    }

    /// Maximum number of cell versions retained.
    pub fn max_versions(&self) -> i32 {
        self.desc.max_versions
    }

    /// Block compression applied to the group's stored files.
    pub fn compression(&self) -> CompressionType {
        self.desc.compression
    }

    /// The families in this locality group, in declaration order.
    pub fn families(&self) -> &[FamilyLayout] {
        &self.families
    }

    /// Looks up a family by primary name or alias.
    pub fn family(&self, name_or_alias: &str) -> Option<&FamilyLayout> {
        self.family_index
            .get(name_or_alias)
            .map(|&index| &self.families[index])
    }

    /// Bidirectional mapping between family IDs and primary names.
    ///
    /// Family IDs are scoped to their locality group, not to the table.
    pub fn family_ids(&self) -> &IdNameMap {
        &self.family_ids
    }
}

/// Locality group being compiled; frozen by the table builder once every
/// sibling has an ID.
pub(super) struct PendingLocalityGroup {
    desc: LocalityGroupDesc,
    names: FxHashSet<String>,
    id: Option<ColumnId>,
    families: Vec<FamilyLayout>,
    family_index: FxHashMap<String, usize>,
    family_ids: IdNameMap,
}

impl PendingLocalityGroup {
    /// Compiles one locality-group descriptor, reconciling its families
    /// with the matching group of the prior layout when there is one.
    pub(super) fn build(
        mut desc: LocalityGroupDesc,
        reference: Option<&LocalityGroupLayout>,
        registry: &dyn SchemaRegistry,
    ) -> Result<Self> {
        let mut names = FxHashSet::default();
        names.insert(desc.name.clone());
        names.extend(desc.aliases.iter().cloned());

        if !is_valid_layout_name(&desc.name) {
            return Err(Error::InvalidLayout(format!(
                "Invalid locality group name: '{}'.",
                desc.name
            )));
        }
        for name in &names {
            if !is_valid_alias(name) {
                return Err(Error::InvalidLayout(format!(
                    "Invalid locality group alias: '{name}'."
                )));
            }
        }

        if desc.ttl_seconds <= 0 {
            return Err(Error::InvalidLayout(format!(
                "Invalid TTL seconds for locality group '{}': TTL must be positive, got {}.",
                desc.name, desc.ttl_seconds
            )));
        }
        if desc.max_versions <= 0 {
            return Err(Error::InvalidLayout(format!(
                "Invalid max versions for locality group '{}': max versions must be positive, got {}.",
                desc.name, desc.max_versions
            )));
        }

        let mut id = (desc.id > 0).then(|| ColumnId::new(desc.id));

        if let Some(reference) = reference {
            if let Some(id) = id {
                if id != reference.id() {
                    return Err(Error::InvalidLayout(format!(
                        "Descriptor for locality group '{}' has ID {} but prior ID is {}.",
                        desc.name,
                        id,
                        reference.id()
                    )));
                }
            }
            id = Some(reference.id());
            desc.id = reference.id().value();
        }

        // Families of the prior locality group, keyed by primary name.
        // Entries are removed as descriptors account for them; whatever
        // remains at the end was neither kept, renamed, nor deleted.
        let mut remaining: FxHashMap<String, ColumnId> = reference
            .map(|group| group.family_ids.name_to_id().clone())
            .unwrap_or_default();

        let mut pending: Vec<PendingFamily> = Vec::new();
        let mut family_index: FxHashMap<String, usize> = FxHashMap::default();
        let mut family_ids = IdNameMap::default();
        let mut unassigned: Vec<usize> = Vec::new();

        for mut family_desc in std::mem::take(&mut desc.families) {
            let renamed_from = family_desc.renamed_from.take();
            let lookup_name = renamed_from
                .clone()
                .unwrap_or_else(|| family_desc.name.clone());

            if renamed_from.is_some() && reference.is_none() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid rename: no prior locality group '{}' for family '{}'.",
                    desc.name, lookup_name
                )));
            }
            let reference_family = reference.and_then(|group| group.family(&lookup_name));
            if renamed_from.is_some() && reference_family.is_none() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid rename: cannot find prior family '{}' in locality group '{}'.",
                    lookup_name, desc.name
                )));
            }

            let prior_id = remaining.remove(&lookup_name);

            if family_desc.delete {
                if prior_id.is_none() {
                    return Err(Error::InvalidLayout(format!(
                        "Deleted family '{}' unknown in prior locality group '{}'.",
                        lookup_name, desc.name
                    )));
                }
                // Deletions are dropped from the normalized descriptor.
                continue;
            }

            let family = PendingFamily::build(family_desc, reference_family, registry)?;
            let index = pending.len();
            for name in family.names() {
                if family_index.insert(name.clone(), index).is_some() {
                    return Err(Error::InvalidLayout(format!(
                        "Duplicate family name: '{name}'."
                    )));
                }
            }
            match family.id() {
                Some(id) => {
                    if let Some(previous) = family_ids.insert(id, family.name().to_string()) {
                        return Err(Error::InvalidLayout(format!(
                            "Duplicate family ID {} associated to '{}' and '{}'.",
                            id,
                            family.name(),
                            previous
                        )));
                    }
                }
                None => unassigned.push(index),
            }
            pending.push(family);
        }

        if !remaining.is_empty() {
            let mut missing: Vec<String> = remaining.into_keys().collect();
            missing.sort();
            return Err(Error::InvalidLayout(format!(
                "Descriptor for locality group '{}' is missing families: {}.",
                desc.name,
                missing.join(", ")
            )));
        }

        // Assign the smallest free IDs to the remaining families, in
        // declaration order.
        let mut allocator = IdAllocator::new();
        for &index in &unassigned {
            let id = allocator.next_free(&family_ids);
            family_ids.insert(id, pending[index].name().to_string());
            pending[index].assign_id(id);
        }

        let mut families = Vec::with_capacity(pending.len());
        for family in pending {
            families.push(family.freeze(&desc.name)?);
        }
        desc.families = families.iter().map(|family| family.desc().clone()).collect();

        Ok(Self {
            desc,
            names,
            id,
            families,
            family_index,
            family_ids,
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

    /// The families of this group, already frozen.
    pub(super) fn families(&self) -> &[FamilyLayout] {
        &self.families
    }

    /// Binds the allocator-chosen ID, recording it in the descriptor.
    pub(super) fn assign_id(&mut self, id: ColumnId) {
        debug_assert!(self.id.is_none());
        self.id = Some(id);
        self.desc.id = id.value();
    }

    pub(super) fn freeze(self) -> Result<LocalityGroupLayout> {
        let id = self.id.ok_or_else(|| {
            Error::Internal(format!(
                "locality group '{}' has no ID at freeze",
                self.desc.name
            ))
        })?;
        Ok(LocalityGroupLayout {
            desc: self.desc,
            names: self.names,
            id,
            families: self.families,
            family_index: self.family_index,
            family_ids: self.family_ids,
        })
    }
}
