//! Cell schema resolution.
//!
//! A [`CellSchema`] descriptor names the schema of the values stored in a
//! column (or shared by a map-type family) in one of three forms: an inline
//! schema literal, the name of a compiled value class, or a counter. This
//! module resolves descriptors to [`ValueSchema`] values and validates them
//! during layout construction.
//!
//! Class resolution depends on the ambient type-loading environment, which
//! is injected as a [`SchemaRegistry`]. Layouts are routinely validated on
//! nodes that do not carry the user's compiled classes, so an unresolvable
//! class is tolerated during construction (a debug line is logged); reading
//! such a column's schema at query time is an error.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::descriptor::{CellSchema, SchemaStorage, SchemaType};
use crate::name::is_valid_layout_name;
use strata_result::{Error, Result};

/// Resolved shape of the values stored in a cell.
///
/// Inline literals are JSON schema literals: a primitive name
/// (`"\"string\""`), a union (`["null", "long"]`), or an object form for
/// arrays, maps, records, enums, and fixed-size byte blocks.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// Homogeneous list; the payload is the item schema.
    Array(Box<ValueSchema>),
    /// String-keyed map; the payload is the value schema.
    Map(Box<ValueSchema>),
    /// Untagged union of the branch schemas.
    Union(Vec<ValueSchema>),
    Record {
        name: String,
        fields: Vec<RecordField>,
    },
    Enum {
        name: String,
        symbols: Vec<String>,
    },
    Fixed {
        name: String,
        size: u32,
    },
}

/// One field of a [`ValueSchema::Record`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: ValueSchema,
}

fn invalid_schema(detail: impl std::fmt::Display) -> Error {
    Error::InvalidLayout(format!("Invalid schema: {detail}"))
}

impl ValueSchema {
    /// Parses a schema literal.
    ///
    /// # Errors
    ///
    /// Any malformed literal yields `InvalidLayout("Invalid schema: ...")`.
    pub fn parse(literal: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(literal).map_err(invalid_schema)?;
        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Self::primitive(name),
            Value::Array(branches) => {
                if branches.is_empty() {
                    return Err(invalid_schema("union must have at least one branch"));
                }
                let branches = branches
                    .iter()
                    .map(Self::from_value)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ValueSchema::Union(branches))
            }
            Value::Object(fields) => Self::from_object(fields),
            other => Err(invalid_schema(format!(
                "schema literal must be a string, array, or object, got {other}"
            ))),
        }
    }

    fn primitive(name: &str) -> Result<Self> {
        match name {
            "null" => Ok(ValueSchema::Null),
            "boolean" => Ok(ValueSchema::Boolean),
            "int" => Ok(ValueSchema::Int),
            "long" => Ok(ValueSchema::Long),
            "float" => Ok(ValueSchema::Float),
            "double" => Ok(ValueSchema::Double),
            "bytes" => Ok(ValueSchema::Bytes),
            "string" => Ok(ValueSchema::String),
            other => Err(invalid_schema(format!("unknown type '{other}'"))),
        }
    }

    fn from_object(fields: &serde_json::Map<String, Value>) -> Result<Self> {
        let type_name = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_schema("object form requires a string 'type'"))?;
        match type_name {
            "array" => {
                let items = fields
                    .get("items")
                    .ok_or_else(|| invalid_schema("array requires 'items'"))?;
                Ok(ValueSchema::Array(Box::new(Self::from_value(items)?)))
            }
            "map" => {
                let values = fields
                    .get("values")
                    .ok_or_else(|| invalid_schema("map requires 'values'"))?;
                Ok(ValueSchema::Map(Box::new(Self::from_value(values)?)))
            }
            "record" => {
                let name = Self::named_type_name(fields, "record")?;
                let fields = fields
                    .get("fields")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid_schema("record requires a 'fields' array"))?
                    .iter()
                    .map(Self::record_field)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ValueSchema::Record { name, fields })
            }
            "enum" => {
                let name = Self::named_type_name(fields, "enum")?;
                let symbols = fields
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid_schema("enum requires a 'symbols' array"))?
                    .iter()
                    .map(|symbol| {
                        symbol
                            .as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid_schema("enum symbols must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ValueSchema::Enum { name, symbols })
            }
            "fixed" => {
                let name = Self::named_type_name(fields, "fixed")?;
                let size = fields
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| invalid_schema("fixed requires a positive 'size'"))?;
                let size = u32::try_from(size)
                    .map_err(|_| invalid_schema("fixed 'size' is out of range"))?;
                Ok(ValueSchema::Fixed { name, size })
            }
            // {"type": "string"} and friends.
            primitive => Self::primitive(primitive),
        }
    }

    fn named_type_name(fields: &serde_json::Map<String, Value>, kind: &str) -> Result<String> {
        fields
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| invalid_schema(format!("{kind} requires a string 'name'")))
    }

    fn record_field(field: &Value) -> Result<RecordField> {
        let field = field
            .as_object()
            .ok_or_else(|| invalid_schema("record fields must be objects"))?;
        let name = field
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_schema("record field requires a string 'name'"))?;
        let schema = field
            .get("type")
            .ok_or_else(|| invalid_schema(format!("record field '{name}' requires a 'type'")))?;
        Ok(RecordField {
            name: name.to_string(),
            schema: Self::from_value(schema)?,
        })
    }
}

/// Ambient environment resolving named schema classes.
///
/// The registry stands in for whatever type-loading machinery the process
/// carries. Implementations must be cheap to query; the compiler consults
/// the registry once per `CLASS` cell schema.
pub trait SchemaRegistry: std::fmt::Debug + Send + Sync {
    /// The schema derived from the named compiled value class, if the
    /// environment can locate it.
    fn lookup(&self, class_name: &str) -> Option<ValueSchema>;
}

/// Registry with no classes; the default environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyRegistry;

impl SchemaRegistry for EmptyRegistry {
    fn lookup(&self, _class_name: &str) -> Option<ValueSchema> {
        None
    }
}

/// In-memory registry backed by a class-name → schema map.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    classes: FxHashMap<String, ValueSchema>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` under `class_name`, replacing any previous entry.
    pub fn register(&mut self, class_name: impl Into<String>, schema: ValueSchema) {
        self.classes.insert(class_name.into(), schema);
    }
}

impl SchemaRegistry for StaticRegistry {
    fn lookup(&self, class_name: &str) -> Option<ValueSchema> {
        self.classes.get(class_name).cloned()
    }
}

/// How a decoded value is laid out inside a cell on disk.
///
/// Mirrors [`SchemaStorage`], which is the wire-level spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellFormat {
    /// Schema hash, then the encoded value.
    Hash,
    /// Schema unique ID, then the encoded value.
    Uid,
    /// The encoded value alone.
    Final,
}

impl CellFormat {
    pub fn from_storage(storage: SchemaStorage) -> Self {
        match storage {
            SchemaStorage::Hash => CellFormat::Hash,
            SchemaStorage::Uid => CellFormat::Uid,
            SchemaStorage::Final => CellFormat::Final,
        }
    }
}

impl From<SchemaStorage> for CellFormat {
    fn from(storage: SchemaStorage) -> Self {
        CellFormat::from_storage(storage)
    }
}

enum ReadSchemaError {
    /// The named class is absent from the registry.
    ClassNotFound(String),
    Layout(Error),
}

fn is_valid_class_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_valid_layout_name)
}

fn read_schema(
    cell: &CellSchema,
    registry: &dyn SchemaRegistry,
) -> std::result::Result<Option<ValueSchema>, ReadSchemaError> {
    match cell.schema_type {
        SchemaType::Inline => {
            let literal = cell
                .value
                .as_deref()
                .ok_or_else(|| ReadSchemaError::Layout(invalid_schema("missing inline literal")))?;
            ValueSchema::parse(literal)
                .map(Some)
                .map_err(ReadSchemaError::Layout)
        }
        SchemaType::Class => {
            let class_name = cell.value.as_deref().ok_or_else(|| {
                ReadSchemaError::Layout(Error::InvalidLayout(
                    "Schema with type 'class' is missing the class name.".to_string(),
                ))
            })?;
            if !is_valid_class_name(class_name) {
                return Err(ReadSchemaError::Layout(Error::InvalidLayout(
                    "Schema with type 'class' must be a valid fully-qualified class name."
                        .to_string(),
                )));
            }
            match registry.lookup(class_name) {
                Some(schema) => Ok(Some(schema)),
                None => Err(ReadSchemaError::ClassNotFound(class_name.to_string())),
            }
        }
        // Counters carry no value schema; cells hold 64-bit big-endian
        // integers.
        SchemaType::Counter => Ok(None),
    }
}

/// Resolves a cell schema descriptor to the schema of its values.
///
/// Returns `None` for counters. A `CLASS` schema whose class the registry
/// cannot locate is an `InvalidLayout` here; construction-time validation
/// goes through [`validate_cell_schema`] instead, which tolerates it.
pub fn read_value_schema(
    cell: &CellSchema,
    registry: &dyn SchemaRegistry,
) -> Result<Option<ValueSchema>> {
    read_schema(cell, registry).map_err(|err| match err {
        ReadSchemaError::ClassNotFound(class) => Error::InvalidLayout(format!(
            "Schema class '{class}' was not found in the registry."
        )),
        ReadSchemaError::Layout(err) => err,
    })
}

/// Validates a cell schema descriptor during layout construction.
///
/// An unresolvable (but well-formed) class name is not fatal: the layout may
/// be validated on a node that does not carry the user's value classes.
pub(crate) fn validate_cell_schema(
    cell: &CellSchema,
    registry: &dyn SchemaRegistry,
) -> Result<()> {
    match read_schema(cell, registry) {
        Ok(_) => Ok(()),
        Err(ReadSchemaError::ClassNotFound(class)) => {
            tracing::debug!(class = %class, "schema class not found in registry");
            Ok(())
        }
        Err(ReadSchemaError::Layout(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(ValueSchema::parse("\"string\"").unwrap(), ValueSchema::String);
        assert_eq!(ValueSchema::parse("\"long\"").unwrap(), ValueSchema::Long);
        assert_eq!(
            ValueSchema::parse("{\"type\": \"bytes\"}").unwrap(),
            ValueSchema::Bytes
        );
    }

    #[test]
    fn test_parse_union_and_containers() {
        assert_eq!(
            ValueSchema::parse("[\"null\", \"string\"]").unwrap(),
            ValueSchema::Union(vec![ValueSchema::Null, ValueSchema::String])
        );
        assert_eq!(
            ValueSchema::parse("{\"type\": \"array\", \"items\": \"int\"}").unwrap(),
            ValueSchema::Array(Box::new(ValueSchema::Int))
        );
        assert_eq!(
            ValueSchema::parse("{\"type\": \"map\", \"values\": \"double\"}").unwrap(),
            ValueSchema::Map(Box::new(ValueSchema::Double))
        );
    }

    #[test]
    fn test_parse_named_types() {
        let record = ValueSchema::parse(
            r#"{"type": "record", "name": "Address",
                "fields": [{"name": "street", "type": "string"},
                           {"name": "zip", "type": "int"}]}"#,
        )
        .unwrap();
        assert_eq!(
            record,
            ValueSchema::Record {
                name: "Address".to_string(),
                fields: vec![
                    RecordField {
                        name: "street".to_string(),
                        schema: ValueSchema::String,
                    },
                    RecordField {
                        name: "zip".to_string(),
                        schema: ValueSchema::Int,
                    },
                ],
            }
        );

        let fixed = ValueSchema::parse(r#"{"type": "fixed", "name": "Md5", "size": 16}"#).unwrap();
        assert_eq!(
            fixed,
            ValueSchema::Fixed {
                name: "Md5".to_string(),
                size: 16,
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_literals() {
        for literal in [
            "not json",
            "\"no_such_type\"",
            "42",
            "[]",
            "{\"type\": \"record\", \"name\": \"R\"}",
            "{\"items\": \"int\"}",
        ] {
            let err = ValueSchema::parse(literal).unwrap_err();
            assert!(
                err.to_string().starts_with("Invalid schema:"),
                "unexpected error for {literal:?}: {err}"
            );
        }
    }

    #[test]
    fn test_counter_resolves_to_none() {
        let schema = read_value_schema(&CellSchema::counter(), &EmptyRegistry).unwrap();
        assert_eq!(schema, None);
    }

    #[test]
    fn test_class_not_found_tolerated_only_during_validation() {
        let cell = CellSchema::class("com.example.UserRecord");
        assert!(validate_cell_schema(&cell, &EmptyRegistry).is_ok());
        assert!(matches!(
            read_value_schema(&cell, &EmptyRegistry),
            Err(Error::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_class_resolves_through_registry() {
        let mut registry = StaticRegistry::new();
        registry.register("com.example.UserRecord", ValueSchema::String);

        let cell = CellSchema::class("com.example.UserRecord");
        assert_eq!(
            read_value_schema(&cell, &registry).unwrap(),
            Some(ValueSchema::String)
        );
    }

    #[test]
    fn test_malformed_class_name_is_fatal() {
        let cell = CellSchema::class("not a class!");
        assert!(matches!(
            validate_cell_schema(&cell, &EmptyRegistry),
            Err(Error::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_cell_format_mirrors_storage() {
        assert_eq!(CellFormat::from_storage(SchemaStorage::Hash), CellFormat::Hash);
        assert_eq!(CellFormat::from_storage(SchemaStorage::Uid), CellFormat::Uid);
        assert_eq!(CellFormat::from(SchemaStorage::Final), CellFormat::Final);
    }
}
