use std::collections::HashSet;

use crate::basic::{ConvertedType, LogicalType, PhysicalType, Repetition, TimeUnit};
use crate::format::SchemaElement;
use crate::{ParquetError, Result};

/// Core schema representation for Parquet files
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub root: SchemaNode,
}

/// Represents a node in the Parquet schema tree
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// A group of named fields
    Group {
        name: String,
        repetition: Repetition,
        logical_type: Option<LogicalType>,
        converted_type: Option<ConvertedType>,
        fields: Vec<SchemaNode>,
    },
    /// A leaf column
    Primitive {
        name: String,
        repetition: Repetition,
        physical_type: PhysicalType,
        /// Byte length, FIXED_LEN_BYTE_ARRAY only
        type_length: Option<i32>,
        logical_type: Option<LogicalType>,
        converted_type: Option<ConvertedType>,
    },
}

impl SchemaNode {
    pub fn primitive<S: Into<String>>(
        name: S,
        repetition: Repetition,
        physical_type: PhysicalType,
    ) -> Self {
        SchemaNode::Primitive {
            name: name.into(),
            repetition,
            physical_type,
            type_length: None,
            logical_type: None,
            converted_type: None,
        }
    }

    /// A FIXED_LEN_BYTE_ARRAY leaf of `length` bytes.
    pub fn fixed<S: Into<String>>(name: S, repetition: Repetition, length: i32) -> Self {
        SchemaNode::Primitive {
            name: name.into(),
            repetition,
            physical_type: PhysicalType::FixedLenByteArray,
            type_length: Some(length),
            logical_type: None,
            converted_type: None,
        }
    }

    /// A UTF-8 annotated BYTE_ARRAY leaf.
    pub fn string<S: Into<String>>(name: S, repetition: Repetition) -> Self {
        SchemaNode::primitive(name, repetition, PhysicalType::ByteArray)
            .with_logical_type(LogicalType::String)
    }

    pub fn group<S: Into<String>>(name: S, repetition: Repetition, fields: Vec<SchemaNode>) -> Self {
        SchemaNode::Group {
            name: name.into(),
            repetition,
            logical_type: None,
            converted_type: None,
            fields,
        }
    }

    /// Canonical three-level LIST: `<name> (LIST) { repeated group list { element } }`.
    ///
    /// `element` is renamed to `element` and keeps its repetition.
    pub fn list<S: Into<String>>(name: S, repetition: Repetition, element: SchemaNode) -> Self {
        let list = SchemaNode::group("list", Repetition::Repeated, vec![element.renamed("element")]);
        SchemaNode::group(name, repetition, vec![list]).with_logical_type(LogicalType::List)
    }

    /// Canonical MAP: `<name> (MAP) { repeated group key_value { required key; value } }`.
    pub fn map<S: Into<String>>(
        name: S,
        repetition: Repetition,
        key: SchemaNode,
        value: SchemaNode,
    ) -> Self {
        let key = key.renamed("key").with_repetition(Repetition::Required);
        let key_value = SchemaNode::group(
            "key_value",
            Repetition::Repeated,
            vec![key, value.renamed("value")],
        );
        SchemaNode::group(name, repetition, vec![key_value]).with_logical_type(LogicalType::Map)
    }

    /// Sets the logical type and the matching legacy converted type.
    pub fn with_logical_type(mut self, logical: LogicalType) -> Self {
        let converted = converted_for(&logical);
        match &mut self {
            SchemaNode::Group {
                logical_type,
                converted_type,
                ..
            }
            | SchemaNode::Primitive {
                logical_type,
                converted_type,
                ..
            } => {
                *logical_type = Some(logical);
                *converted_type = converted;
            }
        }
        self
    }

    pub fn with_converted_type(mut self, converted: ConvertedType) -> Self {
        match &mut self {
            SchemaNode::Group { converted_type, .. }
            | SchemaNode::Primitive { converted_type, .. } => *converted_type = Some(converted),
        }
        self
    }

    pub fn with_repetition(mut self, rep: Repetition) -> Self {
        match &mut self {
            SchemaNode::Group { repetition, .. } | SchemaNode::Primitive { repetition, .. } => {
                *repetition = rep
            }
        }
        self
    }

    pub fn renamed<S: Into<String>>(mut self, new_name: S) -> Self {
        match &mut self {
            SchemaNode::Group { name, .. } | SchemaNode::Primitive { name, .. } => {
                *name = new_name.into()
            }
        }
        self
    }

    /// Get the name of this schema node
    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Group { name, .. } => name,
            SchemaNode::Primitive { name, .. } => name,
        }
    }

    pub fn repetition(&self) -> Repetition {
        match self {
            SchemaNode::Group { repetition, .. } => *repetition,
            SchemaNode::Primitive { repetition, .. } => *repetition,
        }
    }

    /// Check if this node is nullable
    pub fn is_nullable(&self) -> bool {
        self.repetition() == Repetition::Optional
    }

    pub fn is_group(&self) -> bool {
        matches!(self, SchemaNode::Group { .. })
    }

    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            SchemaNode::Group { logical_type, .. } => *logical_type,
            SchemaNode::Primitive { logical_type, .. } => *logical_type,
        }
    }

    pub fn converted_type(&self) -> Option<ConvertedType> {
        match self {
            SchemaNode::Group { converted_type, .. } => *converted_type,
            SchemaNode::Primitive { converted_type, .. } => *converted_type,
        }
    }

    /// Children of a group; empty for leaves.
    pub fn fields(&self) -> &[SchemaNode] {
        match self {
            SchemaNode::Group { fields, .. } => fields,
            SchemaNode::Primitive { .. } => &[],
        }
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        match self {
            SchemaNode::Primitive { physical_type, .. } => Some(*physical_type),
            SchemaNode::Group { .. } => None,
        }
    }

    fn validate(&self, path: &str) -> Result<()> {
        if self.name().is_empty() {
            return Err(ParquetError::schema(format!(
                "field under '{}' has an empty name",
                path
            )));
        }
        let path = if path.is_empty() {
            self.name().to_string()
        } else {
            format!("{}.{}", path, self.name())
        };
        match self {
            SchemaNode::Group {
                fields,
                logical_type,
                converted_type,
                ..
            } => {
                if fields.is_empty() {
                    return Err(ParquetError::schema(format!(
                        "group '{}' has no fields",
                        path
                    )));
                }
                let mut seen = HashSet::new();
                for field in fields {
                    if !seen.insert(field.name()) {
                        return Err(ParquetError::schema(format!(
                            "duplicate field '{}' in '{}'",
                            field.name(),
                            path
                        )));
                    }
                    field.validate(&path)?;
                }
                let is_list = matches!(logical_type, Some(LogicalType::List))
                    || matches!(converted_type, Some(ConvertedType::List));
                let is_map = matches!(logical_type, Some(LogicalType::Map))
                    || matches!(
                        converted_type,
                        Some(ConvertedType::Map) | Some(ConvertedType::MapKeyValue)
                    );
                if is_list {
                    validate_list_shape(&path, fields)?;
                } else if is_map {
                    validate_map_shape(&path, fields)?;
                } else if let Some(logical) = logical_type {
                    return Err(ParquetError::schema(format!(
                        "logical type {:?} cannot annotate group '{}'",
                        logical, path
                    )));
                }
                Ok(())
            }
            SchemaNode::Primitive {
                physical_type,
                type_length,
                logical_type,
                ..
            } => {
                if *physical_type == PhysicalType::FixedLenByteArray
                    && type_length.is_none_or(|len| len <= 0)
                {
                    return Err(ParquetError::schema(format!(
                        "fixed length byte array '{}' needs a positive length",
                        path
                    )));
                }
                if let Some(logical) = logical_type {
                    if !logical_fits(logical, *physical_type, *type_length) {
                        return Err(ParquetError::schema(format!(
                            "logical type {:?} cannot annotate {} column '{}'",
                            logical, physical_type, path
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

/// A LIST group wraps exactly one repeated field named `list`.
///
/// Only schemas built with [`SchemaBuilder`] are checked; footers written by
/// other tools may use legacy wrapper names and are read as plain groups.
fn validate_list_shape(path: &str, fields: &[SchemaNode]) -> Result<()> {
    match fields {
        [inner] if inner.repetition() == Repetition::Repeated && inner.name() == "list" => Ok(()),
        _ => Err(ParquetError::schema(format!(
            "LIST '{}' must hold exactly one repeated field named 'list'",
            path
        ))),
    }
}

/// A MAP group wraps one repeated `key_value` group holding a required
/// primitive key and an optional value. Same scope as [`validate_list_shape`].
fn validate_map_shape(path: &str, fields: &[SchemaNode]) -> Result<()> {
    let key_value = match fields {
        [kv] if kv.repetition() == Repetition::Repeated && kv.is_group() && kv.name() == "key_value" => kv,
        _ => {
            return Err(ParquetError::schema(format!(
                "MAP '{}' must hold exactly one repeated group named 'key_value'",
                path
            )))
        }
    };
    match key_value.fields() {
        [key] | [key, _] if key.repetition() == Repetition::Required && !key.is_group() => Ok(()),
        _ => Err(ParquetError::schema(format!(
            "MAP '{}' needs a required primitive key and at most one value",
            path
        ))),
    }
}

fn logical_fits(logical: &LogicalType, physical: PhysicalType, type_length: Option<i32>) -> bool {
    use PhysicalType::*;
    match logical {
        LogicalType::String | LogicalType::Enum | LogicalType::Json | LogicalType::Bson => {
            physical == ByteArray
        }
        LogicalType::Uuid => physical == FixedLenByteArray && type_length == Some(16),
        LogicalType::Decimal { .. } => {
            matches!(physical, Int32 | Int64 | ByteArray | FixedLenByteArray)
        }
        LogicalType::Date => physical == Int32,
        LogicalType::Time { unit, .. } => match unit {
            TimeUnit::Millis => physical == Int32,
            TimeUnit::Micros | TimeUnit::Nanos => physical == Int64,
        },
        LogicalType::Timestamp { .. } => physical == Int64,
        LogicalType::Integer { bit_width, .. } => match bit_width {
            8 | 16 | 32 => physical == Int32,
            64 => physical == Int64,
            _ => false,
        },
        LogicalType::Unknown => true,
        LogicalType::Map | LogicalType::List => false,
    }
}

/// Legacy converted type written next to a logical type.
fn converted_for(logical: &LogicalType) -> Option<ConvertedType> {
    Some(match logical {
        LogicalType::String => ConvertedType::Utf8,
        LogicalType::Map => ConvertedType::Map,
        LogicalType::List => ConvertedType::List,
        LogicalType::Enum => ConvertedType::Enum,
        LogicalType::Decimal { .. } => ConvertedType::Decimal,
        LogicalType::Date => ConvertedType::Date,
        LogicalType::Time { unit, .. } => match unit {
            TimeUnit::Millis => ConvertedType::TimeMillis,
            TimeUnit::Micros => ConvertedType::TimeMicros,
            TimeUnit::Nanos => return None,
        },
        LogicalType::Timestamp { unit, .. } => match unit {
            TimeUnit::Millis => ConvertedType::TimestampMillis,
            TimeUnit::Micros => ConvertedType::TimestampMicros,
            TimeUnit::Nanos => return None,
        },
        LogicalType::Integer {
            bit_width,
            is_signed,
        } => match (bit_width, is_signed) {
            (8, true) => ConvertedType::Int8,
            (16, true) => ConvertedType::Int16,
            (32, true) => ConvertedType::Int32,
            (64, true) => ConvertedType::Int64,
            (8, false) => ConvertedType::Uint8,
            (16, false) => ConvertedType::Uint16,
            (32, false) => ConvertedType::Uint32,
            (64, false) => ConvertedType::Uint64,
            _ => return None,
        },
        LogicalType::Json => ConvertedType::Json,
        LogicalType::Bson => ConvertedType::Bson,
        LogicalType::Unknown | LogicalType::Uuid => return None,
    })
}

impl Schema {
    /// Checks names, group shapes and type annotations.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_group() {
            return Err(ParquetError::schema("schema root must be a group"));
        }
        self.root.validate("")
    }

    /// Top-level fields.
    pub fn fields(&self) -> &[SchemaNode] {
        self.root.fields()
    }

    /// Flattens the tree in pre-order, the layout stored in the footer.
    pub fn to_elements(&self) -> Vec<SchemaElement> {
        let mut out = Vec::new();
        out.push(SchemaElement {
            name: self.root.name().to_string(),
            num_children: Some(self.root.fields().len() as i32),
            ..Default::default()
        });
        for field in self.root.fields() {
            flatten(field, &mut out);
        }
        out
    }

    /// Rebuilds the tree from footer elements.
    pub fn from_elements(elements: &[SchemaElement]) -> Result<Schema> {
        let root = elements
            .first()
            .ok_or_else(|| ParquetError::format("footer schema is empty"))?;
        let mut next = 1;
        let num_children = child_count(root, root.num_children.unwrap_or(0), elements, next)?;
        let mut fields = Vec::with_capacity(num_children);
        for _ in 0..num_children {
            fields.push(unflatten(elements, &mut next, 1)?);
        }
        if next != elements.len() {
            return Err(ParquetError::format(format!(
                "footer schema has {} elements but the tree uses {}",
                elements.len(),
                next
            )));
        }
        Ok(Schema {
            root: SchemaNode::Group {
                name: root.name.clone(),
                repetition: Repetition::Required,
                logical_type: None,
                converted_type: None,
                fields,
            },
        })
    }
}

fn flatten(node: &SchemaNode, out: &mut Vec<SchemaElement>) {
    match node {
        SchemaNode::Group {
            name,
            repetition,
            logical_type,
            converted_type,
            fields,
        } => {
            out.push(SchemaElement {
                name: name.clone(),
                repetition: Some(*repetition),
                num_children: Some(fields.len() as i32),
                converted_type: *converted_type,
                logical_type: *logical_type,
                ..Default::default()
            });
            for field in fields {
                flatten(field, out);
            }
        }
        SchemaNode::Primitive {
            name,
            repetition,
            physical_type,
            type_length,
            logical_type,
            converted_type,
        } => {
            let (scale, precision) = match logical_type {
                Some(LogicalType::Decimal { scale, precision }) => (Some(*scale), Some(*precision)),
                _ => (None, None),
            };
            out.push(SchemaElement {
                name: name.clone(),
                repetition: Some(*repetition),
                physical_type: Some(*physical_type),
                type_length: *type_length,
                converted_type: *converted_type,
                logical_type: *logical_type,
                scale,
                precision,
                ..Default::default()
            });
        }
    }
}

/// Deepest group nesting accepted from a footer.
const MAX_SCHEMA_DEPTH: usize = 1024;

/// Validates a declared child count against the elements left to consume.
fn child_count(
    element: &SchemaElement,
    declared: i32,
    elements: &[SchemaElement],
    next: usize,
) -> Result<usize> {
    let remaining = elements.len().saturating_sub(next);
    match usize::try_from(declared) {
        Ok(n) if n <= remaining => Ok(n),
        _ => Err(ParquetError::format(format!(
            "schema element '{}' declares {} children, {} elements remain",
            element.name, declared, remaining
        ))),
    }
}

fn unflatten(elements: &[SchemaElement], next: &mut usize, depth: usize) -> Result<SchemaNode> {
    if depth > MAX_SCHEMA_DEPTH {
        return Err(ParquetError::format(format!(
            "footer schema nests deeper than {} levels",
            MAX_SCHEMA_DEPTH
        )));
    }
    let element = elements.get(*next).ok_or_else(|| {
        ParquetError::format(format!(
            "schema element {} is out of bounds ({} elements)",
            *next,
            elements.len()
        ))
    })?;
    *next += 1;
    let repetition = element.repetition.ok_or_else(|| {
        ParquetError::format(format!("schema element '{}' has no repetition", element.name))
    })?;

    match (element.physical_type, element.num_children) {
        (None, Some(n)) => {
            let n = child_count(element, n, elements, *next)?;
            let mut fields = Vec::with_capacity(n);
            for _ in 0..n {
                fields.push(unflatten(elements, next, depth + 1)?);
            }
            Ok(SchemaNode::Group {
                name: element.name.clone(),
                repetition,
                logical_type: element.logical_type,
                converted_type: element.converted_type,
                fields,
            })
        }
        (Some(physical_type), None) | (Some(physical_type), Some(0)) => {
            let logical_type = match (element.logical_type, element.converted_type) {
                (Some(l), _) => Some(l),
                (None, Some(ConvertedType::Decimal)) => Some(LogicalType::Decimal {
                    scale: element.scale.unwrap_or(0),
                    precision: element.precision.unwrap_or(0),
                }),
                _ => None,
            };
            Ok(SchemaNode::Primitive {
                name: element.name.clone(),
                repetition,
                physical_type,
                type_length: element.type_length,
                logical_type,
                converted_type: element.converted_type,
            })
        }
        _ => Err(ParquetError::format(format!(
            "schema element '{}' is neither a group nor a leaf",
            element.name
        ))),
    }
}

/// Builder for creating schemas
pub struct SchemaBuilder {
    root: Option<SchemaNode>,
    fields: Vec<SchemaNode>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            root: None,
            fields: Vec::new(),
        }
    }

    /// Uses `root` as the whole tree; fields added with `with_field` are
    /// appended to it.
    pub fn with_root(mut self, root: SchemaNode) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_field(mut self, field: SchemaNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Schema> {
        let root = match self.root {
            Some(SchemaNode::Group {
                name,
                repetition,
                logical_type,
                converted_type,
                mut fields,
            }) => {
                fields.extend(self.fields);
                SchemaNode::Group {
                    name,
                    repetition,
                    logical_type,
                    converted_type,
                    fields,
                }
            }
            Some(SchemaNode::Primitive { .. }) => {
                return Err(ParquetError::schema("schema root must be a group"))
            }
            None if !self.fields.is_empty() => {
                SchemaNode::group("schema", Repetition::Required, self.fields)
            }
            None => return Err(ParquetError::schema("Schema must have a root node")),
        };
        let schema = Schema { root };
        schema.validate()?;
        Ok(schema)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
