use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    fmt,
    hash::Hash,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait DependencyId: Eq + PartialEq + Hash + Clone + fmt::Display {}
impl<T: Eq + PartialEq + Hash + Clone + fmt::Display> DependencyId for T {}

/// A reference to another item in the same profile.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct Dependent<T: DependencyId> {
    id: T,

    /// Skip this ordering constraint if the referenced item is not in the profile.
    #[serde(default)]
    optional: bool,
}

impl<T: DependencyId> Dependent<T> {
    pub fn new(id: T) -> Self {
        Self {
            id,
            optional: false,
        }
    }

    pub fn optional(id: T) -> Self {
        Self { id, optional: true }
    }

    pub fn id(&self) -> T {
        self.id.clone()
    }
}

pub enum DependencyOrder {
    Before,
    After,
}

pub struct DependencyLink<T: DependencyId> {
    optional: bool,
    order: DependencyOrder,
    id: T,
}

pub trait Dependency {
    type UniqueId: DependencyId;

    fn id(&self) -> Self::UniqueId;

    fn dependencies(&self) -> impl Iterator<Item = DependencyLink<Self::UniqueId>> {
        self.loads_after()
            .iter()
            .map(|dep| DependencyLink {
                optional: dep.optional,
                order: DependencyOrder::After,
                id: dep.id(),
            })
            .chain(self.loads_before().iter().map(|dep| DependencyLink {
                optional: dep.optional,
                order: DependencyOrder::Before,
                id: dep.id(),
            }))
    }

    fn loads_after(&self) -> &[Dependent<Self::UniqueId>];

    fn loads_before(&self) -> &[Dependent<Self::UniqueId>];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("{dependent} requires {dependency}, which is not part of the profile")]
    Missing {
        dependent: String,
        dependency: String,
    },

    #[error("{0} is declared more than once")]
    Duplicate(String),

    #[error("dependency graph has a cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Orders `items` so that every item comes after the items it loads after and before the items
/// it loads before. Items with no ordering constraint between them keep their declared order.
pub fn sort_dependencies<T: Dependency>(items: Vec<T>) -> Result<Vec<T>, DependencyError> {
    let mut declared = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        if declared.insert(item.id(), index).is_some() {
            return Err(DependencyError::Duplicate(item.id().to_string()));
        }
    }

    let mut successors = vec![Vec::new(); items.len()];
    let mut in_degree = vec![0usize; items.len()];

    for (index, item) in items.iter().enumerate() {
        for dep in item.dependencies() {
            let Some(&other) = declared.get(&dep.id) else {
                if !dep.optional {
                    return Err(DependencyError::Missing {
                        dependent: item.id().to_string(),
                        dependency: dep.id.to_string(),
                    });
                }

                continue;
            };

            let (prec, succ) = match dep.order {
                DependencyOrder::Before => (index, other),
                DependencyOrder::After => (other, index),
            };

            successors[prec].push(succ);
            in_degree[succ] += 1;
        }
    }

    // Always take the earliest declared item that is ready.
    let mut ready = (0..items.len())
        .filter(|index| in_degree[*index] == 0)
        .map(Reverse)
        .collect::<BinaryHeap<_>>();

    let mut order = Vec::with_capacity(items.len());

    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);

        for &succ in &successors[index] {
            in_degree[succ] -= 1;

            if in_degree[succ] == 0 {
                ready.push(Reverse(succ));
            }
        }
    }

    if order.len() < items.len() {
        let mut remaining = items
            .iter()
            .enumerate()
            .filter(|(index, _)| in_degree[*index] > 0)
            .map(|(_, item)| item.id().to_string())
            .collect::<Vec<_>>();

        remaining.sort();

        return Err(DependencyError::Cycle(remaining));
    }

    let mut slots = items.into_iter().map(Some).collect::<Vec<_>>();

    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

#[cfg(test)]
mod test {
    use expect_test::expect;

    use super::{sort_dependencies, Dependency, DependencyError, Dependent};

    #[derive(Debug)]
    struct Item {
        id: &'static str,
        after: Vec<Dependent<String>>,
        before: Vec<Dependent<String>>,
    }

    impl Item {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                after: vec![],
                before: vec![],
            }
        }

        fn after(mut self, id: &str) -> Self {
            self.after.push(Dependent::new(id.to_string()));
            self
        }

        fn before(mut self, dep: Dependent<String>) -> Self {
            self.before.push(dep);
            self
        }
    }

    impl Dependency for Item {
        type UniqueId = String;

        fn id(&self) -> String {
            self.id.to_string()
        }

        fn loads_after(&self) -> &[Dependent<String>] {
            &self.after
        }

        fn loads_before(&self) -> &[Dependent<String>] {
            &self.before
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.id).collect()
    }

    #[test]
    fn unconstrained_items_keep_declared_order() {
        let sorted =
            sort_dependencies(vec![Item::new("c"), Item::new("a"), Item::new("b")]).unwrap();

        expect![[r#"["c", "a", "b"]"#]].assert_eq(&format!("{:?}", ids(&sorted)));
    }

    #[test]
    fn load_after_and_before_are_respected() {
        let sorted = sort_dependencies(vec![
            Item::new("patch").after("ui"),
            Item::new("ui").after("base"),
            Item::new("base"),
            Item::new("early").before(Dependent::new("base".to_string())),
        ])
        .unwrap();

        expect![[r#"["early", "base", "ui", "patch"]"#]].assert_eq(&format!("{:?}", ids(&sorted)));
    }

    #[test]
    fn constrained_items_do_not_fall_behind_later_declarations() {
        let sorted = sort_dependencies(vec![
            Item::new("a"),
            Item::new("b").after("a"),
            Item::new("c"),
        ])
        .unwrap();

        assert_eq!(ids(&sorted), ["a", "b", "c"]);
    }

    #[test]
    fn dependencies_pull_items_forward_only_as_far_as_needed() {
        let sorted = sort_dependencies(vec![
            Item::new("x").after("z"),
            Item::new("y"),
            Item::new("z"),
        ])
        .unwrap();

        assert_eq!(ids(&sorted), ["y", "z", "x"]);
    }

    #[test]
    fn optional_dependencies_may_be_absent() {
        let sorted = sort_dependencies(vec![
            Item::new("a").before(Dependent::optional("missing".to_string())),
            Item::new("b"),
        ])
        .unwrap();

        assert_eq!(ids(&sorted), ["a", "b"]);
    }

    #[test]
    fn missing_required_dependency_is_an_error() {
        let error = sort_dependencies(vec![Item::new("a").after("missing")]).unwrap_err();

        assert_eq!(
            error,
            DependencyError::Missing {
                dependent: "a".to_string(),
                dependency: "missing".to_string()
            }
        );
    }

    #[test]
    fn cycles_are_reported() {
        let error = sort_dependencies(vec![
            Item::new("a").after("b"),
            Item::new("b").after("a"),
            Item::new("c"),
        ])
        .unwrap_err();

        assert_eq!(
            error,
            DependencyError::Cycle(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let error = sort_dependencies(vec![Item::new("a"), Item::new("a")]).unwrap_err();

        assert_eq!(error, DependencyError::Duplicate("a".to_string()));
    }
}
