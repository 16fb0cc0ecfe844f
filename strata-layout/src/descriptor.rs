//! Layout descriptor records.
//!
//! Descriptors are the serialized form of a table layout: a nested record
//! the compiler consumes and, once frozen, the only state a [`TableLayout`]
//! retains. JSON field names are the Rust field names; enum values are
//! SCREAMING_SNAKE_CASE (`"HASH_PREFIXED"`, `"FINAL"`, ...).
//!
//! A descriptor is either *concrete* (every entity carries a positive `id`,
//! no prior layout required) or an *update* relative to a prior layout, in
//! which case `renamed_from` and `delete` drive the differential rules and
//! `id = 0` means "assign one for me".
//!
//! [`TableLayout`]: crate::TableLayout

use std::io::Read;

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_result::Result;

/// How logical row keys map to keys of the underlying row store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowKeyEncoding {
    /// The store key is exactly the logical row key.
    Raw,
    /// The store key is a hash of the logical row key.
    Hashed,
    /// The store key is a hash of the logical row key followed by the key
    /// itself.
    HashPrefixed,
}

impl fmt::Display for RowKeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowKeyEncoding::Raw => "RAW",
            RowKeyEncoding::Hashed => "HASHED",
            RowKeyEncoding::HashPrefixed => "HASH_PREFIXED",
        })
    }
}

/// Block compression applied to a locality group's stored files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
    Lz4,
    Snappy,
}

/// Which form a cell schema takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaType {
    /// `value` holds a schema literal.
    Inline,
    /// `value` holds the fully-qualified name of a compiled value class.
    Class,
    /// No value schema; cells hold 64-bit big-endian integers.
    Counter,
}

/// How a decoded value is prefixed inside a cell on disk.
///
/// Immutable across layout updates: changing the storage of existing cells
/// would make previously written data unreadable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaStorage {
    /// Cell = schema hash + encoded value.
    #[default]
    Hash,
    /// Cell = schema unique ID + encoded value.
    Uid,
    /// Cell = encoded value only.
    Final,
}

impl fmt::Display for SchemaStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaStorage::Hash => "HASH",
            SchemaStorage::Uid => "UID",
            SchemaStorage::Final => "FINAL",
        })
    }
}

/// Schema of the cells in a column or map-type family.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Schema literal for `INLINE`, class name for `CLASS`, absent for
    /// `COUNTER`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub storage: SchemaStorage,
}

impl CellSchema {
    /// An inline schema from a literal such as `"\"string\""`.
    pub fn inline(literal: impl Into<String>) -> Self {
        Self {
            schema_type: SchemaType::Inline,
            value: Some(literal.into()),
            storage: SchemaStorage::default(),
        }
    }

    /// A schema derived from a named compiled value class.
    pub fn class(class_name: impl Into<String>) -> Self {
        Self {
            schema_type: SchemaType::Class,
            value: Some(class_name.into()),
            storage: SchemaStorage::default(),
        }
    }

    /// A counter cell (no value schema).
    pub fn counter() -> Self {
        Self {
            schema_type: SchemaType::Counter,
            value: None,
            storage: SchemaStorage::Final,
        }
    }

    /// Replaces the storage variant.
    pub fn with_storage(mut self, storage: SchemaStorage) -> Self {
        self.storage = storage;
        self
    }
}

/// Descriptor of a column inside a group-type family.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Assigned short ID; `0` requests automatic assignment.
    #[serde(default)]
    pub id: i32,
    /// In an update, the prior primary name of this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// In an update, deletes the named column from the prior layout.
    #[serde(default)]
    pub delete: bool,
    pub column_schema: CellSchema,
}

impl ColumnDesc {
    /// A column descriptor with defaults for everything but name and schema.
    pub fn new(name: impl Into<String>, column_schema: CellSchema) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            id: 0,
            renamed_from: None,
            delete: false,
            column_schema,
        }
    }
}

/// Descriptor of a column family.
///
/// A family is map-type when `map_schema` is present and group-type
/// otherwise; supplying both `map_schema` and `columns` is invalid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyDesc {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Assigned short ID; `0` requests automatic assignment.
    #[serde(default)]
    pub id: i32,
    /// In an update, the prior primary name of this family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// In an update, deletes the named family from the prior layout.
    #[serde(default)]
    pub delete: bool,
    /// Value schema shared by all cells of a map-type family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_schema: Option<CellSchema>,
    /// Columns of a group-type family.
    #[serde(default)]
    pub columns: Vec<ColumnDesc>,
}

impl FamilyDesc {
    /// A group-type family descriptor with the given columns.
    pub fn group(name: impl Into<String>, columns: Vec<ColumnDesc>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            id: 0,
            renamed_from: None,
            delete: false,
            map_schema: None,
            columns,
        }
    }

    /// A map-type family descriptor with the given value schema.
    pub fn map(name: impl Into<String>, map_schema: CellSchema) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            id: 0,
            renamed_from: None,
            delete: false,
            map_schema: Some(map_schema),
            columns: Vec::new(),
        }
    }
}

/// Descriptor of a locality group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalityGroupDesc {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Whether the group's data is pinned in memory rather than on disk.
    #[serde(default)]
    pub in_memory: bool,
    /// Data retention lifetime, in seconds. Must be positive.
    pub ttl_seconds: i32,
    /// Maximum number of cell versions retained. Must be positive.
    pub max_versions: i32,
    #[serde(default)]
    pub compression: CompressionType,
    /// Assigned short ID; `0` requests automatic assignment.
    #[serde(default)]
    pub id: i32,
    /// In an update, the prior primary name of this locality group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// In an update, deletes the named locality group from the prior layout.
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub families: Vec<FamilyDesc>,
}

impl LocalityGroupDesc {
    /// A locality group descriptor with the given retention settings and
    /// defaults everywhere else.
    pub fn new(
        name: impl Into<String>,
        ttl_seconds: i32,
        max_versions: i32,
        families: Vec<FamilyDesc>,
    ) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            in_memory: false,
            ttl_seconds,
            max_versions,
            compression: CompressionType::default(),
            id: 0,
            renamed_from: None,
            delete: false,
            families,
        }
    }
}

/// Descriptor of a whole table layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableLayoutDesc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub keys_format: RowKeyEncoding,
    /// Monotonically increasing layout identifier. When absent, the
    /// compiler derives the successor of the prior layout's ID (or `"1"`
    /// for a brand-new table); when supplied, it is kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub locality_groups: Vec<LocalityGroupDesc>,
    /// In an update, the `layout_id` of the prior layout this descriptor
    /// builds on. Carried verbatim; concurrency control around it happens
    /// in the layout store, not in the compiler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_layout: Option<String>,
}

impl TableLayoutDesc {
    /// A table descriptor with defaults for everything but name, row-key
    /// encoding, and locality groups.
    pub fn new(
        name: impl Into<String>,
        keys_format: RowKeyEncoding,
        locality_groups: Vec<LocalityGroupDesc>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            keys_format,
            layout_id: None,
            locality_groups,
            reference_layout: None,
        }
    }

    /// Decodes a table layout descriptor from its JSON serialized form.
    ///
    /// Reads `reader` to the end; the reader is dropped on all paths.
    pub fn from_json_reader(mut reader: impl Read) -> Result<Self> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Serializes the descriptor to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
