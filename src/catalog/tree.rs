//! Category tree expansion.
//!
//! Categories form a forest through `parent_id`. Listing the products of a
//! category includes every subcategory, so the category has to be expanded
//! to itself plus all of its transitive children.

use sqlx::SqliteConnection;
use std::collections::{BTreeSet, HashMap};

use crate::db::list_category_edges;

/// Parent to children index over the category forest
#[derive(Debug, Clone, Default)]
pub struct CategoryForest {
    children: HashMap<i64, Vec<i64>>,
}

impl CategoryForest {
    /// Build from `(id, parent_id)` pairs.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (i64, Option<i64>)>,
    {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for (id, parent_id) in edges {
            if let Some(parent_id) = parent_id {
                children.entry(parent_id).or_default().push(id);
            }
        }
        Self { children }
    }

    /// `root` plus every category reachable by following child links.
    ///
    /// Each id is expanded at most once, so a corrupt cyclic parent chain still
    /// terminates.
    pub fn descendants(&self, root: i64) -> BTreeSet<i64> {
        let mut visited = BTreeSet::from([root]);
        let mut frontier = vec![root];

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for id in frontier {
                for &child in self.children.get(&id).into_iter().flatten() {
                    if visited.insert(child) {
                        next.push(child);
                    }
                }
            }
            frontier = next;
        }

        visited
    }
}

/// Ids of `root_id` and all of its descendants, read from the `categories` table.
///
/// The caller is expected to have checked that `root_id` exists.
pub async fn resolve_descendant_ids(
    conn: &mut SqliteConnection,
    root_id: i64,
) -> Result<BTreeSet<i64>, sqlx::Error> {
    let edges = list_category_edges(conn).await?;
    Ok(CategoryForest::from_edges(edges).descendants(root_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_forest() -> Vec<(i64, Option<i64>)> {
        // 1 ─┬─ 2 ── 4
        //    └─ 3 ─┬─ 5
        //          └─ 6
        // 7 ── 8
        vec![
            (1, None),
            (2, Some(1)),
            (3, Some(1)),
            (4, Some(2)),
            (5, Some(3)),
            (6, Some(3)),
            (7, None),
            (8, Some(7)),
        ]
    }

    fn assert_closed(edges: &[(i64, Option<i64>)], result: &BTreeSet<i64>) {
        for &(id, parent) in edges {
            if let Some(parent) = parent {
                if result.contains(&parent) {
                    assert!(result.contains(&id), "child {} of {} missing", id, parent);
                }
            }
        }
    }

    #[test]
    fn test_expands_whole_subtree() {
        let forest = CategoryForest::from_edges(sample_forest());
        assert_eq!(forest.descendants(1), BTreeSet::from([1, 2, 3, 4, 5, 6]));
        assert_eq!(forest.descendants(3), BTreeSet::from([3, 5, 6]));
        assert_eq!(forest.descendants(7), BTreeSet::from([7, 8]));
    }

    #[test]
    fn test_leaf_and_unknown_roots() {
        let forest = CategoryForest::from_edges(sample_forest());
        assert_eq!(forest.descendants(4), BTreeSet::from([4]));
        assert_eq!(forest.descendants(99), BTreeSet::from([99]));
    }

    #[test]
    fn test_result_contains_root_and_is_closed_under_children() {
        let edges = sample_forest();
        let forest = CategoryForest::from_edges(edges.clone());
        for &(root, _) in &edges {
            let result = forest.descendants(root);
            assert!(result.contains(&root));
            assert_closed(&edges, &result);
        }
    }

    #[test]
    fn test_edge_order_does_not_matter() {
        let mut edges = sample_forest();
        let forward = CategoryForest::from_edges(edges.clone()).descendants(1);
        edges.reverse();
        let backward = CategoryForest::from_edges(edges).descendants(1);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_deep_chain() {
        let edges: Vec<(i64, Option<i64>)> = (1..=50)
            .map(|id| (id, if id == 1 { None } else { Some(id - 1) }))
            .collect();
        let forest = CategoryForest::from_edges(edges.clone());

        let result = forest.descendants(1);
        assert_eq!(result.len(), 50);
        assert_closed(&edges, &result);
        assert_eq!(forest.descendants(50), BTreeSet::from([50]));
    }

    #[test]
    fn test_cycle_terminates() {
        let forest = CategoryForest::from_edges(vec![(1, Some(3)), (2, Some(1)), (3, Some(2))]);
        assert_eq!(forest.descendants(1), BTreeSet::from([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_resolve_from_database() {
        let pool = crate::db::init_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        for (id, parent, slug) in [
            (1, None, "electronics"),
            (2, Some(1), "phones"),
            (3, Some(2), "smartphones"),
            (4, None, "books"),
        ] {
            sqlx::query("INSERT INTO categories (id, name, slug, parent_id) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(slug)
                .bind(slug)
                .bind(parent)
                .execute(&mut *conn)
                .await
                .unwrap();
        }
        // Soft-deleted categories still belong to the tree
        sqlx::query("UPDATE categories SET is_active = 0 WHERE id = 2")
            .execute(&mut *conn)
            .await
            .unwrap();

        let ids = resolve_descendant_ids(&mut conn, 1).await.unwrap();
        assert_eq!(ids, BTreeSet::from([1, 2, 3]));
    }
}
