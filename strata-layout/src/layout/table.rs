use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::family::FamilyLayout;
use super::locality_group::{LocalityGroupLayout, PendingLocalityGroup};
use crate::column_name::ColumnName;
use crate::descriptor::{CellSchema, RowKeyEncoding, TableLayoutDesc};
use crate::id::{ColumnId, IdAllocator, IdNameMap};
use crate::name::is_valid_layout_name;
use crate::schema::{read_value_schema, CellFormat, EmptyRegistry, SchemaRegistry, ValueSchema};
use strata_result::{Error, Result};

/// Concrete layout of a strata table, frozen after construction.
///
/// Compiling a descriptor validates it in full and assigns a short ID to
/// every locality group, family, and column. When a prior layout is given,
/// the descriptor is applied as an update: renames bind to the prior
/// entity, deletions remove it, IDs carry over, and any prior entity left
/// unaccounted for is an error. The result owns a normalized descriptor
/// (`renamed_from` cleared, deletions dropped, IDs filled in) and derived
/// lookup indices; the caller's descriptor is never touched.
///
/// A frozen layout is deeply immutable and can be shared across threads
/// without synchronisation. Equality and hashing are structural on the
/// normalized descriptor.
#[derive(Clone, Debug)]
pub struct TableLayout {
    desc: TableLayoutDesc,
    locality_groups: Vec<LocalityGroupLayout>,
    /// Locality group name or alias → position in `locality_groups`.
    locality_group_index: FxHashMap<String, usize>,
    locality_group_ids: IdNameMap,
    /// Family name or alias → (group position, family position).
    family_locations: FxHashMap<String, (usize, usize)>,
    /// Primary column names, including one unqualified entry per map-type
    /// family.
    column_names: BTreeSet<ColumnName>,
    registry: Arc<dyn SchemaRegistry>,
}

impl TableLayout {
    /// Compiles `desc`, optionally as an update on top of `reference`.
    ///
    /// Uses the default (empty) schema-class registry: `CLASS` cell schemas
    /// validate as long as the class name is well-formed.
    pub fn new(desc: TableLayoutDesc, reference: Option<&TableLayout>) -> Result<Self> {
        Self::with_registry(desc, reference, Arc::new(EmptyRegistry))
    }

    /// Compiles `desc` with an explicit schema-class registry.
    ///
    /// The registry is consulted for every `CLASS` cell schema during
    /// validation and retained for query-time [`TableLayout::schema`]
    /// calls.
    pub fn with_registry(
        mut desc: TableLayoutDesc,
        reference: Option<&TableLayout>,
        registry: Arc<dyn SchemaRegistry>,
    ) -> Result<Self> {
        if !is_valid_layout_name(&desc.name) {
            return Err(Error::InvalidLayout(format!(
                "Invalid table name: '{}'.",
                desc.name
            )));
        }

        if let Some(reference) = reference {
            if desc.name != reference.name() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid layout update: layout name '{}' does not match prior layout name '{}'.",
                    desc.name,
                    reference.name()
                )));
            }
            if desc.keys_format != reference.desc.keys_format {
                return Err(Error::InvalidLayout(format!(
                    "Invalid layout update from row key encoding '{}' to '{}'.",
                    reference.desc.keys_format, desc.keys_format
                )));
            }
        }

        // Layout ID: kept verbatim when supplied, otherwise the successor
        // of the prior layout's (or "1" for a brand-new table).
        if desc.layout_id.is_none() {
            let prior = match reference {
                None => 0,
                Some(reference) => {
                    let raw = reference.desc.layout_id.as_deref().unwrap_or("");
                    raw.parse::<i64>().map_err(|_| {
                        Error::InvalidLayout(format!(
                            "Prior layout for table '{}' has an invalid layout ID: '{raw}'.",
                            desc.name
                        ))
                    })?
                }
            };
            desc.layout_id = Some((prior + 1).to_string());
        }

        // Locality groups of the prior layout, keyed by primary name.
        // Entries are removed as descriptors account for them; whatever
        // remains at the end was neither kept, renamed, nor deleted.
        let mut remaining: FxHashMap<String, ColumnId> = reference
            .map(|layout| layout.locality_group_ids.name_to_id().clone())
            .unwrap_or_default();

        let mut pending: Vec<PendingLocalityGroup> = Vec::new();
        let mut locality_group_index: FxHashMap<String, usize> = FxHashMap::default();
        let mut locality_group_ids = IdNameMap::default();
        let mut unassigned: Vec<usize> = Vec::new();
        let mut family_locations: FxHashMap<String, (usize, usize)> = FxHashMap::default();
        let mut column_names: BTreeSet<ColumnName> = BTreeSet::new();

        for mut group_desc in std::mem::take(&mut desc.locality_groups) {
            let renamed_from = group_desc.renamed_from.take();
            let lookup_name = renamed_from
                .clone()
                .unwrap_or_else(|| group_desc.name.clone());

            if renamed_from.is_some() && reference.is_none() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid rename: no prior table layout for locality group '{lookup_name}'."
                )));
            }
            let reference_group =
                reference.and_then(|layout| layout.locality_group(&lookup_name));
            if renamed_from.is_some() && reference_group.is_none() {
                return Err(Error::InvalidLayout(format!(
                    "Invalid rename: cannot find prior locality group '{lookup_name}'."
                )));
            }

            let prior_id = remaining.remove(&lookup_name);

            if group_desc.delete {
                if prior_id.is_none() {
                    return Err(Error::InvalidLayout(format!(
                        "Attempting to delete locality group '{lookup_name}' unknown in prior layout."
                    )));
                }
                // Deletions are dropped from the normalized descriptor.
                continue;
            }

            let group = PendingLocalityGroup::build(group_desc, reference_group, registry.as_ref())?;
            let index = pending.len();
            for name in group.names() {
                if locality_group_index.insert(name.clone(), index).is_some() {
                    return Err(Error::InvalidLayout(format!(
                        "Duplicate locality group name: '{name}'."
                    )));
                }
            }
            match group.id() {
                Some(id) => {
                    if let Some(previous) =
                        locality_group_ids.insert(id, group.name().to_string())
                    {
                        return Err(Error::InvalidLayout(format!(
                            "Duplicate locality group ID {} associated to '{}' and '{}'.",
                            id,
                            group.name(),
                            previous
                        )));
                    }
                }
                None => unassigned.push(index),
            }

            // Accumulate the table-wide indices: family names and aliases
            // are unique across the whole table, not just their group.
            for (family_position, family) in group.families().iter().enumerate() {
                for name in family.names() {
                    if family_locations
                        .insert(name.clone(), (index, family_position))
                        .is_some()
                    {
                        return Err(Error::InvalidLayout(format!(
                            "Layout for table '{}' contains duplicate family name '{}'.",
                            desc.name, name
                        )));
                    }
                }
                if family.is_map_type() {
                    column_names.insert(ColumnName::family_only(family.name()));
                } else {
                    for column in family.columns() {
                        column_names.insert(ColumnName::qualified(family.name(), column.name()));
                    }
                }
            }

            pending.push(group);
        }

        if !remaining.is_empty() {
            let mut missing: Vec<String> = remaining.into_keys().collect();
            missing.sort();
            return Err(Error::InvalidLayout(format!(
                "Missing descriptor(s) for locality group(s): {}.",
                missing.join(", ")
            )));
        }

        // Assign the smallest free IDs to the remaining locality groups,
        // in declaration order.
        let mut allocator = IdAllocator::new();
        for &index in &unassigned {
            let id = allocator.next_free(&locality_group_ids);
            locality_group_ids.insert(id, pending[index].name().to_string());
            pending[index].assign_id(id);
        }

        let mut locality_groups = Vec::with_capacity(pending.len());
        for group in pending {
            locality_groups.push(group.freeze()?);
        }
        desc.locality_groups = locality_groups
            .iter()
            .map(|group| group.desc().clone())
            .collect();

        Ok(Self {
            desc,
            locality_groups,
            locality_group_index,
            locality_group_ids,
            family_locations,
            column_names,
            registry,
        })
    }

    /// Loads a table layout from JSON text with no prior layout.
    ///
    /// Reads `reader` to the end; the reader is consumed and dropped on
    /// all paths.
    pub fn from_effective_json(reader: impl io::Read) -> Result<Self> {
        let desc = TableLayoutDesc::from_json_reader(reader)?;
        Self::new(desc, None)
    }

    /// Loads a table layout from the JSON file at `path`.
    pub fn from_effective_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_effective_json(file)
    }

    /// The normalized descriptor for this layout.
    pub fn desc(&self) -> &TableLayoutDesc {
        &self.desc
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// The layout identifier. Always present on a frozen layout.
    pub fn layout_id(&self) -> &str {
        self.desc.layout_id.as_deref().unwrap_or_default()
    }

    /// How row keys are encoded in the underlying row store.
    pub fn keys_format(&self) -> RowKeyEncoding {
        self.desc.keys_format
    }

    /// The locality groups in the table, in declaration order.
    pub fn locality_groups(&self) -> &[LocalityGroupLayout] {
        &self.locality_groups
    }

    /// Looks up a locality group by primary name or alias.
    pub fn locality_group(&self, name_or_alias: &str) -> Option<&LocalityGroupLayout> {
        self.locality_group_index
            .get(name_or_alias)
            .map(|&index| &self.locality_groups[index])
    }

    /// Bidirectional mapping between locality group IDs and primary names.
    pub fn locality_group_ids(&self) -> &IdNameMap {
        &self.locality_group_ids
    }

    /// All the families in the table, grouped by locality group.
    pub fn families(&self) -> Vec<&FamilyLayout> {
        self.locality_groups
            .iter()
            .flat_map(|group| group.families())
            .collect()
    }

    /// Looks up a family anywhere in the table by primary name or alias.
    pub fn family(&self, name_or_alias: &str) -> Option<&FamilyLayout> {
        self.family_locations
            .get(name_or_alias)
            .map(|&(group, family)| &self.locality_groups[group].families()[family])
    }

    /// All primary column names in the table, ordered. Map-type families
    /// contribute one unqualified entry each.
    pub fn column_names(&self) -> &BTreeSet<ColumnName> {
        &self.column_names
    }

    /// The cell schema of a column.
    ///
    /// Map-type families answer for any qualifier with their shared value
    /// schema. Group-type families require a qualifier
    /// (`InvalidArgumentError` otherwise) naming an existing column.
    ///
    /// # Errors
    ///
    /// `NoSuchColumn` if the family or the qualified column does not exist.
    pub fn cell_schema(&self, column: &ColumnName) -> Result<&CellSchema> {
        let family = self.family(column.family()).ok_or_else(|| {
            Error::NoSuchColumn(format!(
                "Table '{}' has no family '{}'.",
                self.name(),
                column.family()
            ))
        })?;

        if let Some(map_schema) = family.map_schema() {
            return Ok(map_schema);
        }

        let qualifier = column.qualifier().ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "Cannot get cell schema for entire group-type family: '{column}'."
            ))
        })?;
        let column_layout = family.column(qualifier).ok_or_else(|| {
            Error::NoSuchColumn(format!(
                "Table '{}' has no column '{column}'.",
                self.name()
            ))
        })?;
        Ok(&column_layout.desc().column_schema)
    }

    /// The resolved value schema of a column; `None` for counters.
    pub fn schema(&self, column: &ColumnName) -> Result<Option<ValueSchema>> {
        read_value_schema(self.cell_schema(column)?, self.registry.as_ref())
    }

    /// The cell format of a column, derived from its storage variant.
    pub fn cell_format(&self, column: &ColumnName) -> Result<CellFormat> {
        Ok(CellFormat::from_storage(self.cell_schema(column)?.storage))
    }

    /// Whether a column exists.
    ///
    /// Unknown families answer `false`. Map-type families admit any
    /// qualifier. An unqualified name over a group-type family answers
    /// `true` (the family exists); a qualified one checks the column.
    pub fn exists(&self, column: &ColumnName) -> bool {
        match self.family(column.family()) {
            None => false,
            Some(family) if family.is_map_type() => true,
            Some(family) => match column.qualifier() {
                None => true,
                Some(qualifier) => family.column(qualifier).is_some(),
            },
        }
    }

    /// Serializes the normalized descriptor to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.desc.to_json()
    }
}

impl PartialEq for TableLayout {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc
    }
}

impl Eq for TableLayout {}

impl Hash for TableLayout {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.desc.hash(state);
    }
}

impl fmt::Display for TableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.desc) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}
