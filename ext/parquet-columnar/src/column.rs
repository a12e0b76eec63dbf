//! Runtime view of a schema: every node annotated with its maximum
//! repetition and definition levels, every leaf numbered in the order its
//! column chunk is stored.

use std::sync::Arc;

use crate::basic::{ConvertedType, LogicalType, PhysicalType, Repetition};
use crate::{ParquetError, Result, Schema, SchemaNode};

/// Static description of one leaf column.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafDescriptor {
    /// Path components from the first level below the root.
    pub path: Vec<String>,
    pub physical_type: PhysicalType,
    /// Byte length for FIXED_LEN_BYTE_ARRAY, 0 otherwise.
    pub type_length: usize,
    pub repetition: Repetition,
    pub logical_type: Option<LogicalType>,
    pub converted_type: Option<ConvertedType>,
    pub max_rep_level: u8,
    pub max_def_level: u8,
}

impl LeafDescriptor {
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone)]
pub enum ColumnKind {
    Group(Vec<Column>),
    /// Index into [`ColumnTree::leaves`].
    Leaf(usize),
}

#[derive(Debug, Clone)]
pub struct Column {
    name: Arc<str>,
    repetition: Repetition,
    max_rep_level: u8,
    max_def_level: u8,
    kind: ColumnKind,
    /// Whether any leaf at or below this node is projected.
    selected: bool,
}

impl Column {
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    pub fn max_rep_level(&self) -> u8 {
        self.max_rep_level
    }

    pub fn max_def_level(&self) -> u8 {
        self.max_def_level
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn children(&self) -> &[Column] {
        match &self.kind {
            ColumnKind::Group(children) => children,
            ColumnKind::Leaf(_) => &[],
        }
    }

    /// Every leaf below this node, selected or not.
    pub fn collect_leaves(&self, out: &mut Vec<usize>) {
        match &self.kind {
            ColumnKind::Leaf(idx) => out.push(*idx),
            ColumnKind::Group(children) => children.iter().for_each(|c| c.collect_leaves(out)),
        }
    }

    /// The first projected leaf below this node.
    pub fn first_selected_leaf(&self) -> Option<usize> {
        if !self.selected {
            return None;
        }
        match &self.kind {
            ColumnKind::Leaf(idx) => Some(*idx),
            ColumnKind::Group(children) => children.iter().find_map(Column::first_selected_leaf),
        }
    }

    /// Projected leaves below this node.
    pub fn collect_selected_leaves(&self, out: &mut Vec<usize>) {
        if !self.selected {
            return;
        }
        match &self.kind {
            ColumnKind::Leaf(idx) => out.push(*idx),
            ColumnKind::Group(children) => children
                .iter()
                .for_each(|c| c.collect_selected_leaves(out)),
        }
    }

    fn refresh_selection(&mut self, selected: &[bool]) -> bool {
        self.selected = match &mut self.kind {
            ColumnKind::Leaf(idx) => selected[*idx],
            ColumnKind::Group(children) => children
                .iter_mut()
                .fold(false, |any, c| c.refresh_selection(selected) || any),
        };
        self.selected
    }
}

/// Column tree of a schema, plus the projection applied when reading.
#[derive(Debug, Clone)]
pub struct ColumnTree {
    fields: Vec<Column>,
    leaves: Vec<LeafDescriptor>,
    selected: Vec<bool>,
}

impl ColumnTree {
    pub fn new(schema: &Schema) -> Result<Self> {
        schema.validate()?;
        let mut leaves = Vec::new();
        let mut path = Vec::new();
        let fields = schema
            .fields()
            .iter()
            .map(|f| build(f, 0, 0, &mut path, &mut leaves))
            .collect::<Result<Vec<_>>>()?;
        let selected = vec![true; leaves.len()];
        let mut tree = ColumnTree {
            fields,
            leaves,
            selected,
        };
        tree.refresh();
        Ok(tree)
    }

    pub fn fields(&self) -> &[Column] {
        &self.fields
    }

    pub fn leaves(&self) -> &[LeafDescriptor] {
        &self.leaves
    }

    pub fn leaf(&self, index: usize) -> Option<&LeafDescriptor> {
        self.leaves.get(index)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaf_index(&self, dotted_path: &str) -> Option<usize> {
        self.leaves.iter().position(|l| l.dotted_path() == dotted_path)
    }

    pub fn is_selected(&self, leaf: usize) -> bool {
        self.selected.get(leaf).copied().unwrap_or(false)
    }

    pub fn selected_leaves(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.leaves.len()).filter(move |&i| self.selected[i])
    }

    /// Restricts reading to the leaves named by `paths`. A path selects the
    /// leaf it names, or every leaf below the group it names.
    pub fn project<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<()> {
        let mut selected = vec![false; self.leaves.len()];
        for path in paths {
            let path = path.as_ref();
            let prefix = format!("{}.", path);
            let mut matched = false;
            for (i, leaf) in self.leaves.iter().enumerate() {
                let dotted = leaf.dotted_path();
                if dotted == path || dotted.starts_with(&prefix) {
                    selected[i] = true;
                    matched = true;
                }
            }
            if !matched {
                return Err(ParquetError::invalid_argument(format!(
                    "projected column '{}' is not in the schema",
                    path
                )));
            }
        }
        self.selected = selected;
        self.refresh();
        Ok(())
    }

    /// Selects every leaf again.
    pub fn clear_projection(&mut self) {
        self.selected = vec![true; self.leaves.len()];
        self.refresh();
    }

    fn refresh(&mut self) {
        let selected = &self.selected;
        for field in &mut self.fields {
            field.refresh_selection(selected);
        }
    }
}

fn build(
    node: &SchemaNode,
    parent_rep: u8,
    parent_def: u8,
    path: &mut Vec<String>,
    leaves: &mut Vec<LeafDescriptor>,
) -> Result<Column> {
    let overflow = || {
        ParquetError::schema(format!(
            "schema nesting under '{}' is too deep",
            path.join(".")
        ))
    };
    let (max_rep_level, max_def_level) = match node.repetition() {
        Repetition::Required => (parent_rep, parent_def),
        Repetition::Optional => (parent_rep, parent_def.checked_add(1).ok_or_else(overflow)?),
        Repetition::Repeated => (
            parent_rep.checked_add(1).ok_or_else(overflow)?,
            parent_def.checked_add(1).ok_or_else(overflow)?,
        ),
    };

    path.push(node.name().to_string());
    let kind = match node {
        SchemaNode::Group { fields, .. } => {
            let children = fields
                .iter()
                .map(|f| build(f, max_rep_level, max_def_level, path, leaves))
                .collect::<Result<Vec<_>>>()?;
            ColumnKind::Group(children)
        }
        SchemaNode::Primitive {
            physical_type,
            type_length,
            logical_type,
            converted_type,
            ..
        } => {
            leaves.push(LeafDescriptor {
                path: path.clone(),
                physical_type: *physical_type,
                type_length: type_length.unwrap_or(0).max(0) as usize,
                repetition: node.repetition(),
                logical_type: *logical_type,
                converted_type: *converted_type,
                max_rep_level,
                max_def_level,
            });
            ColumnKind::Leaf(leaves.len() - 1)
        }
    };
    path.pop();

    Ok(Column {
        name: Arc::from(node.name()),
        repetition: node.repetition(),
        max_rep_level,
        max_def_level,
        kind,
        selected: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::dremel_schema;

    #[test]
    fn levels_follow_repetition() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let expected = [
            ("DocId", 0, 0),
            ("Links.Backward", 1, 2),
            ("Links.Forward", 1, 2),
            ("Name.Language.Code", 2, 2),
            ("Name.Language.Country", 2, 3),
            ("Name.URL", 1, 2),
        ];
        assert_eq!(tree.leaf_count(), expected.len());
        for (i, (path, r, d)) in expected.iter().enumerate() {
            let leaf = tree.leaf(i).unwrap();
            assert_eq!(leaf.dotted_path(), *path);
            assert_eq!((leaf.max_rep_level, leaf.max_def_level), (*r, *d), "{path}");
            assert_eq!(tree.leaf_index(path), Some(i));
        }
    }

    #[test]
    fn projection_by_leaf_and_group() {
        let mut tree = ColumnTree::new(&dremel_schema()).unwrap();
        tree.project(&["DocId", "Name.Language"]).unwrap();
        assert_eq!(tree.selected_leaves().collect::<Vec<_>>(), vec![0, 3, 4]);

        let links = &tree.fields()[1];
        assert!(!links.is_selected());
        assert_eq!(links.first_selected_leaf(), None);
        let name = &tree.fields()[2];
        assert!(name.is_selected());
        assert_eq!(name.first_selected_leaf(), Some(3));

        tree.clear_projection();
        assert_eq!(tree.selected_leaves().count(), 6);
    }

    #[test]
    fn prefix_match_respects_component_boundaries() {
        let mut tree = ColumnTree::new(&dremel_schema()).unwrap();
        assert!(tree.project(&["Doc"]).is_err());
        assert!(tree.project(&["Name.Lang"]).is_err());
        tree.project(&["Links"]).unwrap();
        assert_eq!(tree.selected_leaves().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn collects_all_leaves_under_a_group() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let mut out = Vec::new();
        tree.fields()[2].collect_leaves(&mut out);
        assert_eq!(out, vec![3, 4, 5]);
    }
}
