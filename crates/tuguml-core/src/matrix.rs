//! Dependency matrix between project types.
//!
//! Rows and columns are the project's classes, interfaces and enums sorted by
//! qualified name. `cells[i][j]` counts the distinct relation edges from type
//! `i` to type `j`. Nesting edges and edges to external components are not
//! counted.

use serde::{Deserialize, Serialize};

use crate::model::{Component, ComponentId, SourceComponent};
use crate::visitor::{Relation, RelationExtractor, RelationKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMatrix {
    pub labels: Vec<String>,
    pub cells: Vec<Vec<u32>>,
}

impl DependencyMatrix {
    /// Matrix over every relation in `tree`.
    pub fn compute(tree: &SourceComponent) -> Self {
        DependencyMatrix::from_relations(tree, &RelationExtractor::extract(tree))
    }

    pub fn from_relations(tree: &SourceComponent, relations: &[Relation]) -> Self {
        let mut types: Vec<(String, ComponentId)> = tree
            .types()
            .iter()
            .map(|c| (c.qualified_name(), c.id()))
            .collect();
        types.sort();

        let index_of = |id: ComponentId| types.iter().position(|(_, t)| *t == id);
        let mut cells = vec![vec![0u32; types.len()]; types.len()];
        for relation in relations {
            if relation.kind == RelationKind::Nesting {
                continue;
            }
            if matches!(tree.get(relation.to), Some(Component::External(_))) {
                continue;
            }
            if let (Some(i), Some(j)) = (index_of(relation.from), index_of(relation.to)) {
                cells[i][j] += 1;
            }
        }

        DependencyMatrix {
            labels: types.into_iter().map(|(name, _)| name).collect(),
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == name)
    }

    /// Edge count from `from` to `to`, `None` if either is not a project type.
    ///
    /// A matrix loaded from storage may have fewer cells than labels; missing
    /// cells are `None` too.
    pub fn weight(&self, from: &str, to: &str) -> Option<u32> {
        self.cells.get(self.index(from)?)?.get(self.index(to)?).copied()
    }

    /// Types `name` depends on, with edge counts.
    pub fn dependencies_of(&self, name: &str) -> Vec<(&str, u32)> {
        let Some(row) = self.index(name).and_then(|i| self.cells.get(i)) else {
            return Vec::new();
        };
        self.labels
            .iter()
            .zip(row)
            .filter(|(_, count)| **count > 0)
            .map(|(label, count)| (label.as_str(), *count))
            .collect()
    }

    /// Types that depend on `name`, with edge counts.
    pub fn dependents_of(&self, name: &str) -> Vec<(&str, u32)> {
        let Some(j) = self.index(name) else {
            return Vec::new();
        };
        self.labels
            .iter()
            .zip(&self.cells)
            .filter_map(|(label, row)| Some((label.as_str(), *row.get(j)?)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{
        DeclarationKind, ResolvedField, ResolvedMethod, ResolvedParameter, ResolvedType,
        ResolvedTypeDeclaration, Visibility,
    };

    fn sample() -> SourceComponent {
        let base = ResolvedTypeDeclaration::new(DeclarationKind::Class, "z", "Base");
        let mut order = ResolvedTypeDeclaration::new(DeclarationKind::Class, "z", "Order");
        order.extends.push(ResolvedType::project("z.Base"));
        order.fields.push(ResolvedField::new(
            "customer",
            Visibility::Private,
            ResolvedType::project("z.Customer"),
        ));
        let mut assign = ResolvedMethod::new("assign", Visibility::Public, ResolvedType::Void);
        assign
            .parameters
            .push(ResolvedParameter::new("c", ResolvedType::project("z.Customer")));
        order.methods.push(assign);
        order.fields.push(ResolvedField::new(
            "note",
            Visibility::Private,
            ResolvedType::external("java.lang.String", "java.lang"),
        ));
        let mut customer = ResolvedTypeDeclaration::new(DeclarationKind::Class, "z", "Customer");
        let inner = ResolvedTypeDeclaration::nested_in(&customer, DeclarationKind::Enum, "Tier");
        customer.nested.push(inner);
        SourceComponent::build("z", vec![order, base, customer])
    }

    #[test]
    fn labels_are_sorted_project_types() {
        let matrix = DependencyMatrix::compute(&sample());
        assert_eq!(
            matrix.labels,
            vec!["z.Base", "z.Customer", "z.Customer.Tier", "z.Order"]
        );
        assert_eq!(matrix.cells.len(), 4);
        assert!(matrix.cells.iter().all(|row| row.len() == 4));
    }

    #[test]
    fn counts_distinct_edge_kinds() {
        let matrix = DependencyMatrix::compute(&sample());
        assert_eq!(matrix.weight("z.Order", "z.Base"), Some(1));
        assert_eq!(matrix.weight("z.Order", "z.Customer"), Some(2));
        assert_eq!(matrix.weight("z.Customer", "z.Order"), Some(0));
        assert_eq!(matrix.weight("z.Customer", "z.Customer.Tier"), Some(0));
        assert_eq!(matrix.weight("java.lang.String", "z.Order"), None);
    }

    #[test]
    fn dependency_queries() {
        let matrix = DependencyMatrix::compute(&sample());
        assert_eq!(
            matrix.dependencies_of("z.Order"),
            vec![("z.Base", 1), ("z.Customer", 2)]
        );
        assert_eq!(matrix.dependents_of("z.Customer"), vec![("z.Order", 2)]);
        assert!(matrix.dependencies_of("nope").is_empty());
    }

    #[test]
    fn ragged_matrix_does_not_panic() {
        let matrix: DependencyMatrix =
            serde_json::from_str(r#"{"labels": ["A", "B"], "cells": [[0, 3]]}"#).unwrap();
        assert_eq!(matrix.weight("A", "B"), Some(3));
        assert_eq!(matrix.weight("B", "A"), None);
        assert!(matrix.dependencies_of("B").is_empty());
        assert_eq!(matrix.dependents_of("B"), vec![("A", 3)]);
    }
}
