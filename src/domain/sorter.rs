//! Sibling ordering with a replaceable comparator.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Node;

type Comparator = dyn Fn(&Node, &Node) -> Ordering + Send + Sync;

/// Built-in sort orders selectable from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Case-folded name, ascending
    #[default]
    NameCi,
    /// Exact name, ascending
    Name,
    /// Keep arrival order
    #[serde(rename = "none")]
    Arrival,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::NameCi => "name-ci",
            SortOrder::Name => "name",
            SortOrder::Arrival => "none",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name-ci" => Ok(SortOrder::NameCi),
            "name" => Ok(SortOrder::Name),
            "none" => Ok(SortOrder::Arrival),
            other => Err(format!("unknown sort order '{other}' (name-ci, name, none)")),
        }
    }
}

/// Orders sibling lists. Stable: equal keys keep their arrival order.
#[derive(Clone)]
pub struct Sorter {
    compare: Arc<Comparator>,
    label: &'static str,
}

impl Default for Sorter {
    fn default() -> Self {
        Self::from_order(SortOrder::default())
    }
}

impl fmt::Debug for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter").field("label", &self.label).finish()
    }
}

impl Sorter {
    pub fn from_order(order: SortOrder) -> Self {
        match order {
            SortOrder::NameCi => Self {
                compare: Arc::new(|a: &Node, b: &Node| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
                label: "name-ci",
            },
            SortOrder::Name => Self {
                compare: Arc::new(|a: &Node, b: &Node| a.name.cmp(&b.name)),
                label: "name",
            },
            SortOrder::Arrival => Self {
                compare: Arc::new(|_: &Node, _: &Node| Ordering::Equal),
                label: "none",
            },
        }
    }

    pub fn custom<F>(compare: F) -> Self
    where
        F: Fn(&Node, &Node) -> Ordering + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
            label: "custom",
        }
    }

    pub fn compare(&self, a: &Node, b: &Node) -> Ordering {
        (self.compare)(a, b)
    }

    /// Sort `children`; `sort_by` is stable so ties keep arrival order.
    pub fn sort(&self, mut children: Vec<Node>) -> Vec<Node> {
        children.sort_by(|a, b| self.compare(a, b));
        children
    }

    pub fn is_sorted(&self, children: &[Node]) -> bool {
        children
            .windows(2)
            .all(|w| self.compare(&w[0], &w[1]) != Ordering::Greater)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NodeKind;
    use rstest::rstest;

    fn node(id: &str, name: &str) -> Node {
        Node {
            id: id.into(),
            name: name.to_string(),
            kind: NodeKind::default(),
            parent: None,
            children: vec![],
            children_loaded: false,
            has_children: false,
        }
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn given_mixed_case_names_when_sorting_default_then_case_insensitive() {
        let sorted = Sorter::default().sort(vec![node("1", "B"), node("2", "a")]);
        assert_eq!(ids(&sorted), vec!["2", "1"]);
    }

    #[rstest]
    #[case(SortOrder::NameCi, vec!["2", "3", "1"])]
    #[case(SortOrder::Name, vec!["1", "2", "3"])]
    #[case(SortOrder::Arrival, vec!["1", "2", "3"])]
    fn given_order_when_sorting_then_expected_sequence(
        #[case] order: SortOrder,
        #[case] expected: Vec<&str>,
    ) {
        let input = vec![node("1", "Zeta"), node("2", "alpha"), node("3", "beta")];
        let sorted = Sorter::from_order(order).sort(input);
        assert_eq!(ids(&sorted), expected);
    }

    #[test]
    fn given_equal_keys_when_sorting_then_arrival_order_kept() {
        let input = vec![node("1", "same"), node("2", "SAME"), node("3", "Same")];
        let sorted = Sorter::default().sort(input);
        assert_eq!(ids(&sorted), vec!["1", "2", "3"]);
    }

    #[test]
    fn given_sorted_list_when_sorting_again_then_idempotent() {
        let sorter = Sorter::default();
        let once = sorter.sort(vec![node("1", "c"), node("2", "A"), node("3", "b")]);
        let twice = sorter.sort(once.clone());
        assert_eq!(once, twice);
        assert!(sorter.is_sorted(&twice));
    }

    #[test]
    fn given_custom_comparator_when_sorting_then_used() {
        let sorter = Sorter::custom(|a, b| b.name.cmp(&a.name));
        let sorted = sorter.sort(vec![node("1", "a"), node("2", "b")]);
        assert_eq!(ids(&sorted), vec!["2", "1"]);
    }
}
