use crate::{Schema, SchemaNode};

/// Trait for schema introspection
///
/// This trait provides methods for examining and querying schemas
/// without modifying them. Paths are dotted and exclude the root name.
pub trait SchemaInspector {
    /// Get the total number of fields (including nested, excluding the root)
    fn field_count(&self) -> usize;

    /// Get field by path (e.g., "address.city")
    fn get_field_by_path(&self, path: &str) -> Option<&SchemaNode>;

    /// Check if schema contains a specific field
    fn has_field(&self, name: &str) -> bool;

    /// Get all field paths in the schema, groups included, in pre-order
    fn all_field_paths(&self) -> Vec<String>;

    /// Paths of the leaf columns, in the order their chunks are stored
    fn leaf_paths(&self) -> Vec<String>;
}

impl SchemaInspector for Schema {
    fn field_count(&self) -> usize {
        self.root.fields().iter().map(count_fields).sum()
    }

    fn get_field_by_path(&self, path: &str) -> Option<&SchemaNode> {
        let mut node = &self.root;
        for part in path.split('.') {
            node = node.fields().iter().find(|f| f.name() == part)?;
        }
        Some(node)
    }

    fn has_field(&self, name: &str) -> bool {
        self.get_field_by_path(name).is_some()
    }

    fn all_field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for field in self.root.fields() {
            collect_field_paths(field, "", &mut paths, false);
        }
        paths
    }

    fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for field in self.root.fields() {
            collect_field_paths(field, "", &mut paths, true);
        }
        paths
    }
}

// Helper functions for schema inspection
fn count_fields(node: &SchemaNode) -> usize {
    1 + node.fields().iter().map(count_fields).sum::<usize>()
}

fn collect_field_paths(node: &SchemaNode, prefix: &str, paths: &mut Vec<String>, leaves_only: bool) {
    let current_path = if prefix.is_empty() {
        node.name().to_string()
    } else {
        format!("{}.{}", prefix, node.name())
    };

    if !leaves_only || !node.is_group() {
        paths.push(current_path.clone());
    }
    for field in node.fields() {
        collect_field_paths(field, &current_path, paths, leaves_only);
    }
}
