//! Registry-driven translation of caller input into criteria and predicates

use serde_json::Value;

use super::{FilterCriteria, FilterPredicate, Predicate, SortCriteria, SortDirection};
use crate::{DomainError, entities::Entity};

/// Stateless helper turning declarative criteria into predicates and sorts
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// Fold filter criteria into one predicate, strictly left to right
    ///
    /// The result is `((c1 op2 c2) op3 c3) ...` where `opN` is criterion N's
    /// operator (`And` when absent). The first criterion's operator is
    /// ignored. There is no grouping or precedence beyond that order.
    ///
    /// Returns `Ok(None)` for an empty slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use domain::SensitiveDatum;
    /// use domain::query::{FilterCriteria, FilterPredicate, QueryBuilder};
    ///
    /// let filters = [
    ///     FilterCriteria::new("Type", FilterPredicate::Equal, "Email"),
    ///     FilterCriteria::new("Name", FilterPredicate::Contains, "locataire 1").or(),
    /// ];
    /// let predicate = QueryBuilder::get_criteria::<SensitiveDatum>(&filters).unwrap();
    /// assert_eq!(predicate.unwrap().expr().leaf_count(), 2);
    /// ```
    pub fn get_criteria<E: Entity>(
        filters: &[FilterCriteria],
    ) -> Result<Option<Predicate<E>>, DomainError> {
        filters.iter().try_fold(None, |acc: Option<Predicate<E>>, criteria| -> Result<_, DomainError> {
            let next = Predicate::build(criteria)?;
            Ok(Some(match acc {
                None => next,
                Some(acc) => acc.combine(criteria.effective_operator(), next),
            }))
        })
    }

    /// Expand a global-search term and alias filters into criteria
    ///
    /// One `Or` criterion is emitted per globally searchable field when
    /// `global_search` is non-blank, followed by one criterion per input
    /// name matching a registered filter alias. `In` aliases take all the
    /// supplied values, others take the first. Names that are not aliases
    /// are skipped.
    pub fn get_filters<E: Entity>(
        global_search: Option<&str>,
        filters: &[(String, Vec<Value>)],
    ) -> Vec<FilterCriteria> {
        let registry = E::fields();
        let mut criteria = Vec::new();

        if let Some(term) = global_search.map(str::trim).filter(|t| !t.is_empty()) {
            criteria.extend(registry.global_search_fields().filter_map(|field| {
                field.global_search().map(|predicate| {
                    FilterCriteria::new(field.name(), predicate, term).or()
                })
            }));
        }

        for (name, values) in filters {
            let Some(field) = registry.filter_alias(name) else {
                continue;
            };
            let Some(capability) = field.filter_capability() else {
                continue;
            };
            if values.is_empty() {
                continue;
            }

            let criterion = if capability.predicate == FilterPredicate::In {
                FilterCriteria::any_of(field.name(), values.iter().cloned())
            } else {
                FilterCriteria::new(field.name(), capability.predicate, values[0].clone())
            };
            criteria.push(criterion.with_operator(capability.operator));
        }

        criteria
    }

    /// Sort criteria for every sortable field whose alias or group matches
    ///
    /// Matching ignores ASCII case; fields come back in declared order.
    pub fn get_sorts<E: Entity>(sort_column: Option<&str>, descending: bool) -> Vec<SortCriteria> {
        let Some(column) = sort_column.map(str::trim).filter(|c| !c.is_empty()) else {
            return Vec::new();
        };
        let direction = SortDirection::from_descending(descending);
        E::fields()
            .sort_matches(column)
            .into_iter()
            .map(|field| SortCriteria {
                field_name: field.name().to_string(),
                direction,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        SensitiveDatum,
        query::{Expr, FilterOperator},
    };

    #[test]
    fn empty_filters_yield_no_predicate() {
        assert!(QueryBuilder::get_criteria::<SensitiveDatum>(&[]).unwrap().is_none());
    }

    #[test]
    fn folds_strictly_left_to_right() {
        let filters = [
            FilterCriteria::new("Identifier", FilterPredicate::Equal, 1),
            FilterCriteria::new("Identifier", FilterPredicate::Equal, 2).or(),
            FilterCriteria::new("Identifier", FilterPredicate::Equal, 3),
        ];
        let predicate = QueryBuilder::get_criteria::<SensitiveDatum>(&filters)
            .unwrap()
            .unwrap();
        match predicate.expr() {
            Expr::And(left, _) => assert!(matches!(**left, Expr::Or(_, _))),
            other => unreachable!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_error_aborts_fold() {
        let filters = [
            FilterCriteria::new("Name", FilterPredicate::Equal, "x"),
            FilterCriteria::new("Nope", FilterPredicate::Equal, "y"),
        ];
        assert!(QueryBuilder::get_criteria::<SensitiveDatum>(&filters).is_err());
    }

    #[test]
    fn global_search_expands_to_or_criteria() {
        let criteria = QueryBuilder::get_filters::<SensitiveDatum>(Some(" locataire "), &[]);
        let names: Vec<_> = criteria.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(names, ["Name", "Content"]);
        assert!(criteria.iter().all(|c| c.operator == Some(FilterOperator::Or)));
        assert_eq!(criteria[0].value, Some(json!("locataire")));
    }

    #[test]
    fn blank_global_search_is_ignored() {
        assert!(QueryBuilder::get_filters::<SensitiveDatum>(Some("  "), &[]).is_empty());
    }

    #[test]
    fn alias_filters_use_declared_capability() {
        let input = vec![
            ("TYPE".to_string(), vec![json!("Email"), json!("Name")]),
            ("name".to_string(), vec![json!("Nom"), json!("ignored")]),
            ("colour".to_string(), vec![json!("red")]),
        ];
        let criteria = QueryBuilder::get_filters::<SensitiveDatum>(None, &input);
        assert_eq!(criteria.len(), 2);

        assert_eq!(criteria[0].field_name, "Type");
        assert_eq!(criteria[0].predicate, Some(FilterPredicate::In));
        assert_eq!(criteria[0].values.as_ref().map(Vec::len), Some(2));

        assert_eq!(criteria[1].field_name, "Name");
        assert_eq!(criteria[1].predicate, Some(FilterPredicate::Contains));
        assert_eq!(criteria[1].value, Some(json!("Nom")));
    }

    #[test]
    fn sorts_by_group_in_declared_order() {
        let sorts = QueryBuilder::get_sorts::<SensitiveDatum>(Some("Default"), true);
        assert_eq!(
            sorts,
            vec![SortCriteria::descending("Name"), SortCriteria::descending("Type")]
        );
    }

    #[test]
    fn sorts_by_alias() {
        let sorts = QueryBuilder::get_sorts::<SensitiveDatum>(Some("identifier"), false);
        assert_eq!(sorts, vec![SortCriteria::ascending("Identifier")]);
        assert!(QueryBuilder::get_sorts::<SensitiveDatum>(None, false).is_empty());
        assert!(QueryBuilder::get_sorts::<SensitiveDatum>(Some("Content"), false).is_empty());
    }
}
