//! Category Tree

use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use super::{Category, CategoryTreeError, CategoryUuid};

new_key_type! {
    /// Category Key
    pub struct CategoryKey;
}

#[derive(Debug, Clone)]
struct CategoryNode {
    category: Category,
    parent: Option<CategoryKey>,
    children: SmallVec<[CategoryKey; 4]>,
}

/// Arena of categories with parent/child links, built once from a flat snapshot.
///
/// Construction never fails: categories whose parent is missing from the
/// snapshot become roots, and a parent link that would close a cycle is
/// dropped, turning that category into a root as well. Every walk over the
/// arena is therefore bounded by the number of nodes.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: SlotMap<CategoryKey, CategoryNode>,
    index: FxHashMap<CategoryUuid, CategoryKey>,
    roots: SmallVec<[CategoryKey; 8]>,
}

/// A category with its (sorted) children, as returned by [`CategoryTree::forest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTreeNode {
    /// The category itself
    pub category: Category,

    /// Child categories, ordered by `sort_order`
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryTree {
    /// Build the tree from a snapshot of category rows.
    ///
    /// Duplicate ids keep the first row seen. Siblings are sorted by
    /// `sort_order` ascending; ties keep snapshot order.
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut tree = Self::default();
        let mut insertion_order: Vec<CategoryKey> = Vec::new();

        for category in categories {
            if tree.index.contains_key(&category.uuid) {
                continue;
            }

            let uuid = category.uuid;

            let key = tree.nodes.insert(CategoryNode {
                category,
                parent: None,
                children: SmallVec::new(),
            });

            tree.index.insert(uuid, key);
            insertion_order.push(key);
        }

        for key in insertion_order {
            let parent = tree
                .nodes
                .get(key)
                .and_then(|node| node.category.parent)
                .and_then(|parent| tree.index.get(&parent).copied());

            match parent {
                Some(parent) if !tree.reaches(parent, key) => tree.link(key, parent),
                _ => tree.roots.push(key),
            }
        }

        tree.sort_siblings();

        tree
    }

    /// Number of categories in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no categories.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the category is part of the tree.
    pub fn contains(&self, uuid: CategoryUuid) -> bool {
        self.index.contains_key(&uuid)
    }

    /// Look up a category by id.
    pub fn get(&self, uuid: CategoryUuid) -> Option<&Category> {
        self.node(uuid).map(|(_, node)| &node.category)
    }

    /// Root categories, ordered by `sort_order`.
    pub fn roots(&self) -> impl Iterator<Item = &Category> {
        self.roots
            .iter()
            .filter_map(|key| self.nodes.get(*key))
            .map(|node| &node.category)
    }

    /// Direct children of a category, ordered by `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryTreeError::NotFound`] if the category is unknown.
    pub fn children(&self, uuid: CategoryUuid) -> Result<Vec<&Category>, CategoryTreeError> {
        let (_, node) = self.node(uuid).ok_or(CategoryTreeError::NotFound(uuid))?;

        Ok(node
            .children
            .iter()
            .filter_map(|key| self.nodes.get(*key))
            .map(|child| &child.category)
            .collect())
    }

    /// The path from the root of the category's tree down to the category.
    ///
    /// A root yields a single-element path.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryTreeError::NotFound`] if the category is unknown.
    pub fn ancestor_path(&self, uuid: CategoryUuid) -> Result<Vec<&Category>, CategoryTreeError> {
        let (key, _) = self.node(uuid).ok_or(CategoryTreeError::NotFound(uuid))?;

        let mut path: Vec<&Category> = self
            .walk_up(key)
            .filter_map(|key| self.nodes.get(key))
            .map(|node| &node.category)
            .collect();

        path.reverse();

        Ok(path)
    }

    /// The category followed by its parent, grandparent and so on up to the root.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryTreeError::NotFound`] if the category is unknown.
    pub fn lineage(
        &self,
        uuid: CategoryUuid,
    ) -> Result<SmallVec<[CategoryUuid; 8]>, CategoryTreeError> {
        let (key, _) = self.node(uuid).ok_or(CategoryTreeError::NotFound(uuid))?;

        Ok(self
            .walk_up(key)
            .filter_map(|key| self.nodes.get(key))
            .map(|node| node.category.uuid)
            .collect())
    }

    /// The category and every category below it.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryTreeError::NotFound`] if the category is unknown.
    pub fn subtree_ids(
        &self,
        uuid: CategoryUuid,
    ) -> Result<FxHashSet<CategoryUuid>, CategoryTreeError> {
        let (root, _) = self.node(uuid).ok_or(CategoryTreeError::NotFound(uuid))?;

        let mut ids = FxHashSet::default();
        let mut stack: SmallVec<[CategoryKey; 16]> = SmallVec::new();

        stack.push(root);

        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };

            if ids.insert(node.category.uuid) {
                stack.extend(node.children.iter().copied());
            }
        }

        Ok(ids)
    }

    /// The whole forest as nested nodes, roots and siblings ordered by `sort_order`.
    pub fn forest(&self) -> Vec<CategoryTreeNode> {
        self.roots
            .iter()
            .filter_map(|key| self.subtree(*key))
            .collect()
    }

    fn subtree(&self, key: CategoryKey) -> Option<CategoryTreeNode> {
        let node = self.nodes.get(key)?;

        Some(CategoryTreeNode {
            category: node.category.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.subtree(*child))
                .collect(),
        })
    }

    fn node(&self, uuid: CategoryUuid) -> Option<(CategoryKey, &CategoryNode)> {
        let key = *self.index.get(&uuid)?;

        self.nodes.get(key).map(|node| (key, node))
    }

    /// Iterate from `key` up through its linked parents.
    fn walk_up(&self, key: CategoryKey) -> impl Iterator<Item = CategoryKey> + '_ {
        let limit = self.nodes.len();

        std::iter::successors(Some(key), |key| {
            self.nodes.get(*key).and_then(|node| node.parent)
        })
        .take(limit)
    }

    /// Whether walking up from `from` reaches `target`.
    fn reaches(&self, from: CategoryKey, target: CategoryKey) -> bool {
        self.walk_up(from).any(|key| key == target)
    }

    fn link(&mut self, child: CategoryKey, parent: CategoryKey) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    fn sort_siblings(&mut self) {
        let mut roots = mem::take(&mut self.roots);
        sort_by_position(&self.nodes, &mut roots);
        self.roots = roots;

        let keys: Vec<CategoryKey> = self.nodes.keys().collect();

        for key in keys {
            let Some(mut children) = self
                .nodes
                .get_mut(key)
                .map(|node| mem::take(&mut node.children))
            else {
                continue;
            };

            sort_by_position(&self.nodes, &mut children);

            if let Some(node) = self.nodes.get_mut(key) {
                node.children = children;
            }
        }
    }
}

fn sort_by_position(nodes: &SlotMap<CategoryKey, CategoryNode>, keys: &mut [CategoryKey]) {
    keys.sort_by_key(|key| {
        nodes
            .get(*key)
            .map_or(i32::MAX, |node| node.category.sort_order)
    });
}

/// Group a flat list of categories into a sorted forest.
pub fn build_forest(categories: impl IntoIterator<Item = Category>) -> Vec<CategoryTreeNode> {
    CategoryTree::from_categories(categories).forest()
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn category(name: &str, parent: Option<CategoryUuid>, sort_order: i32) -> Category {
        Category {
            uuid: CategoryUuid::new(),
            name: name.to_string(),
            parent,
            sort_order,
        }
    }

    fn names(categories: &[&Category]) -> Vec<String> {
        categories.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn ancestor_path_of_root_is_single_element() -> TestResult {
        let root = category("Electronics", None, 0);
        let tree = CategoryTree::from_categories([root.clone()]);

        assert_eq!(tree.ancestor_path(root.uuid)?, vec![&root]);

        Ok(())
    }

    #[test]
    fn ancestor_path_runs_root_to_node() -> TestResult {
        let root = category("Electronics", None, 0);
        let phones = category("Phones", Some(root.uuid), 0);
        let android = category("Android", Some(phones.uuid), 0);

        // Deliberately out of order: children before parents.
        let tree =
            CategoryTree::from_categories([android.clone(), phones.clone(), root.clone()]);

        assert_eq!(
            names(&tree.ancestor_path(android.uuid)?),
            ["Electronics", "Phones", "Android"]
        );

        assert_eq!(
            tree.lineage(android.uuid)?.as_slice(),
            [android.uuid, phones.uuid, root.uuid]
        );

        Ok(())
    }

    #[test]
    fn unknown_category_is_not_found() {
        let tree = CategoryTree::from_categories([category("Electronics", None, 0)]);
        let missing = CategoryUuid::new();

        assert_eq!(
            tree.ancestor_path(missing),
            Err(CategoryTreeError::NotFound(missing))
        );
        assert_eq!(
            tree.subtree_ids(missing),
            Err(CategoryTreeError::NotFound(missing))
        );
    }

    #[test]
    fn subtree_contains_root_and_descendants_only() -> TestResult {
        let electronics = category("Electronics", None, 0);
        let phones = category("Phones", Some(electronics.uuid), 0);
        let android = category("Android", Some(phones.uuid), 0);
        let laptops = category("Laptops", Some(electronics.uuid), 1);
        let garden = category("Garden", None, 1);
        let tools = category("Tools", Some(garden.uuid), 0);

        let tree = CategoryTree::from_categories([
            electronics.clone(),
            phones.clone(),
            android.clone(),
            laptops.clone(),
            garden.clone(),
            tools.clone(),
        ]);

        let ids = tree.subtree_ids(electronics.uuid)?;

        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&electronics.uuid), "root must be included");
        assert!(ids.contains(&phones.uuid));
        assert!(ids.contains(&android.uuid));
        assert!(ids.contains(&laptops.uuid));
        assert!(!ids.contains(&garden.uuid));
        assert!(!ids.contains(&tools.uuid));

        let leaf = tree.subtree_ids(android.uuid)?;

        assert_eq!(leaf.len(), 1);
        assert!(leaf.contains(&android.uuid));

        Ok(())
    }

    #[test]
    fn forest_sorts_siblings_by_sort_order() {
        let b = category("B", None, 2);
        let a = category("A", None, 1);
        let a2 = category("A2", Some(a.uuid), 5);
        let a1 = category("A1", Some(a.uuid), -1);

        let forest = build_forest([b, a2, a, a1]);

        let roots: Vec<&str> = forest.iter().map(|n| n.category.name.as_str()).collect();

        assert_eq!(roots, ["A", "B"]);

        let children: Vec<&str> = forest
            .first()
            .map(|n| n.children.iter().map(|c| c.category.name.as_str()).collect())
            .unwrap_or_default();

        assert_eq!(children, ["A1", "A2"]);
    }

    #[test]
    fn equal_sort_orders_keep_snapshot_order() {
        let first = category("First", None, 0);
        let second = category("Second", None, 0);

        let forest = build_forest([first, second]);

        let roots: Vec<&str> = forest.iter().map(|n| n.category.name.as_str()).collect();

        assert_eq!(roots, ["First", "Second"]);
    }

    #[test]
    fn unknown_parent_becomes_root() -> TestResult {
        let orphan = category("Orphan", Some(CategoryUuid::new()), 0);
        let tree = CategoryTree::from_categories([orphan.clone()]);

        assert_eq!(tree.roots().count(), 1);
        assert_eq!(tree.ancestor_path(orphan.uuid)?, vec![&orphan]);

        Ok(())
    }

    #[test]
    fn cycles_are_broken_instead_of_looping() -> TestResult {
        let mut a = category("A", None, 0);
        let b = category("B", Some(a.uuid), 0);
        a.parent = Some(b.uuid);

        let tree = CategoryTree::from_categories([a.clone(), b.clone()]);

        // A is linked under B first; B's link back to A would close the cycle.
        assert_eq!(names(&tree.roots().collect::<Vec<_>>()), ["B"]);
        assert_eq!(names(&tree.ancestor_path(a.uuid)?), ["B", "A"]);
        assert_eq!(tree.subtree_ids(b.uuid)?.len(), 2);

        Ok(())
    }

    #[test]
    fn self_parent_becomes_root() -> TestResult {
        let mut looped = category("Loop", None, 0);
        looped.parent = Some(looped.uuid);

        let tree = CategoryTree::from_categories([looped.clone()]);

        assert_eq!(tree.ancestor_path(looped.uuid)?, vec![&looped]);
        assert_eq!(tree.forest().len(), 1);

        Ok(())
    }

    #[test]
    fn duplicate_rows_keep_the_first() {
        let first = category("First", None, 0);
        let mut duplicate = first.clone();
        duplicate.name = "Duplicate".to_string();

        let tree = CategoryTree::from_categories([first.clone(), duplicate]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(first.uuid), Some(&first));
    }

    #[test]
    fn children_are_sorted() -> TestResult {
        let root = category("Root", None, 0);
        let late = category("Late", Some(root.uuid), 10);
        let early = category("Early", Some(root.uuid), 1);

        let tree = CategoryTree::from_categories([root.clone(), late, early]);

        assert_eq!(names(&tree.children(root.uuid)?), ["Early", "Late"]);

        Ok(())
    }
}
