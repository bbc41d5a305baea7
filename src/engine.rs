use rayon::prelude::*;
use deunicode::deunicode;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::trace;

use crate::dataset::{AirlineRecord, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    NameAscending,
    NameDescending,
    FieldCountDescending,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::NameAscending => SortKey::NameDescending,
            SortKey::NameDescending => SortKey::FieldCountDescending,
            SortKey::FieldCountDescending => SortKey::NameAscending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::NameAscending => "Name (A-Z)",
            SortKey::NameDescending => "Name (Z-A)",
            SortKey::FieldCountDescending => "Most Information",
        }
    }
}

/// A single user driven change to the [`ViewState`].
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    SetSearch(String),
    /// Flips every distinct field of the batch against the state before the batch.
    ToggleFields(Vec<String>),
    SelectFields(Vec<String>),
    ClearFields,
    SetSort(SortKey),
}

/// Everything the visitor can change. Never touches the dataset, a new value
/// is produced for every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub search_term: String,
    pub selected_fields: BTreeSet<String>,
    pub sort_key: SortKey,
}

impl ViewState {
    pub fn apply(&self, change: StateChange) -> ViewState {
        trace!("Apply {:?}", change);
        let mut next = self.clone();
        match change {
            StateChange::SetSearch(term) => next.search_term = term,
            StateChange::ToggleFields(batch) => {
                let batch: BTreeSet<String> = batch.into_iter().collect();
                next.selected_fields = self
                    .selected_fields
                    .symmetric_difference(&batch)
                    .cloned()
                    .collect();
            }
            StateChange::SelectFields(batch) => next.selected_fields.extend(batch),
            StateChange::ClearFields => next.selected_fields.clear(),
            StateChange::SetSort(key) => next.sort_key = key,
        }
        next
    }

    pub fn is_selected(&self, field: &str) -> bool {
        self.selected_fields.contains(field)
    }
}

/// Sort key for display names: accents folded and case ignored first, the
/// raw name second so the order is total.
pub fn collation_key(name: &str) -> (String, String) {
    (deunicode(name).to_lowercase(), name.to_string())
}

fn matches(record: &AirlineRecord, needle: &str, selected: &BTreeSet<String>) -> bool {
    let matches_search = needle.is_empty() || record.name().to_lowercase().contains(needle);
    let matches_fields = selected.is_empty() || selected.iter().any(|f| record.has_value(f));
    matches_search && matches_fields
}

/// Returns indices into the dataset of the records visible under `state`, in
/// display order.
pub fn filter_and_sort(dataset: &Dataset, state: &ViewState) -> Vec<usize> {
    let needle = state.search_term.to_lowercase();
    let records = dataset.records();

    let mut rows: Vec<usize> = (0..records.len())
        .into_par_iter()
        .filter(|&idx| matches(&records[idx], &needle, &state.selected_fields))
        .collect();

    match state.sort_key {
        SortKey::NameAscending => {
            rows.sort_by_cached_key(|&idx| collation_key(records[idx].name()))
        }
        SortKey::NameDescending => {
            rows.sort_by_cached_key(|&idx| Reverse(collation_key(records[idx].name())))
        }
        SortKey::FieldCountDescending => rows.sort_by_cached_key(|&idx| {
            (
                Reverse(records[idx].field_count()),
                collation_key(records[idx].name()),
            )
        }),
    }

    trace!(
        "Filter \"{}\" {:?} {:?} => {} of {}",
        state.search_term,
        state.selected_fields,
        state.sort_key,
        rows.len(),
        records.len()
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::{record, scenario};

    fn names(dataset: &Dataset, rows: &[usize]) -> Vec<String> {
        rows.iter()
            .map(|&i| dataset.get(i).unwrap().name().to_string())
            .collect()
    }

    fn fleet() -> Dataset {
        Dataset::from_records(
            "fleet",
            vec![
                record("delta", None, &[("baggage", "1pc"), ("visa", "esta")]),
                record("Aer Lingus", Some("http://a"), &[("dress_code", "smart")]),
                record(
                    "KLM",
                    None,
                    &[("baggage", "23kg"), ("listing", "24h"), ("visa", "schengen")],
                ),
                record("british airways", None, &[]),
                record("Cathay", None, &[("boarding", "loads"), ("visa", "twov")]),
            ],
        )
    }

    fn state(term: &str, fields: &[&str], sort_key: SortKey) -> ViewState {
        ViewState {
            search_term: term.to_string(),
            selected_fields: fields.iter().map(|f| f.to_string()).collect(),
            sort_key,
        }
    }

    #[test]
    fn scenario_search_is_case_insensitive() {
        let ds = scenario();
        let rows = filter_and_sort(&ds, &state("beta", &[], SortKey::NameAscending));
        assert_eq!(names(&ds, &rows), vec!["Beta Jet"]);
    }

    #[test]
    fn scenario_field_filter() {
        let ds = scenario();
        let rows = filter_and_sort(&ds, &state("", &["baggage"], SortKey::NameAscending));
        assert_eq!(names(&ds, &rows), vec!["Acme Air"]);
    }

    #[test]
    fn scenario_field_count_ties_fall_back_to_name() {
        // The link is not counted, both airlines carry a single field
        let ds = scenario();
        let rows = filter_and_sort(&ds, &state("", &[], SortKey::FieldCountDescending));
        assert_eq!(names(&ds, &rows), vec!["Acme Air", "Beta Jet"]);
    }

    #[test]
    fn empty_term_matches_all() {
        let ds = fleet();
        let rows = filter_and_sort(&ds, &ViewState::default());
        assert_eq!(rows.len(), ds.len());
    }

    #[test]
    fn search_results_contain_term_and_exclusions_do_not() {
        let ds = fleet();
        for term in ["a", "L", "air", "zz", "Cath"] {
            let rows = filter_and_sort(&ds, &state(term, &[], SortKey::NameAscending));
            let needle = term.to_lowercase();
            for (idx, r) in ds.records().iter().enumerate() {
                let hit = r.name().to_lowercase().contains(&needle);
                assert_eq!(rows.contains(&idx), hit, "term {term:?} record {}", r.name());
            }
        }
    }

    #[test]
    fn selected_fields_are_or_combined() {
        let ds = fleet();
        let rows = filter_and_sort(
            &ds,
            &state("", &["dress_code", "boarding"], SortKey::NameAscending),
        );
        assert_eq!(names(&ds, &rows), vec!["Aer Lingus", "Cathay"]);
        for &i in &rows {
            let r = ds.get(i).unwrap();
            assert!(r.has_value("dress_code") || r.has_value("boarding"));
        }
    }

    #[test]
    fn search_and_fields_combine() {
        let ds = fleet();
        let rows = filter_and_sort(&ds, &state("a", &["visa"], SortKey::NameAscending));
        assert_eq!(names(&ds, &rows), vec!["Cathay", "delta"]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let ds = fleet();
        let rows = filter_and_sort(&ds, &ViewState::default());
        assert_eq!(
            names(&ds, &rows),
            vec!["Aer Lingus", "british airways", "Cathay", "delta", "KLM"]
        );
    }

    #[test]
    fn name_sort_folds_accents() {
        let ds = Dataset::from_records(
            "t",
            vec![
                record("Zip Air", None, &[]),
                record("Åland Airways", None, &[]),
                record("Braathens", None, &[]),
                record("Éire Air", None, &[]),
            ],
        );
        let rows = filter_and_sort(&ds, &ViewState::default());
        assert_eq!(
            names(&ds, &rows),
            vec!["Åland Airways", "Braathens", "Éire Air", "Zip Air"]
        );
        let rows = filter_and_sort(&ds, &state("", &[], SortKey::NameDescending));
        assert_eq!(names(&ds, &rows)[0], "Zip Air");
    }

    #[test]
    fn collation_key_orders_case_variants_deterministically() {
        assert!(collation_key("aer") < collation_key("Braathens"));
        assert!(collation_key("Acme") < collation_key("acme"));
        assert_eq!(collation_key("Åland").0, "aland");
    }

    #[test]
    fn descending_is_reverse_of_ascending() {
        let ds = fleet();
        let mut asc = filter_and_sort(&ds, &state("", &[], SortKey::NameAscending));
        let desc = filter_and_sort(&ds, &state("", &[], SortKey::NameDescending));
        asc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn field_count_sort_orders_by_present_fields() {
        let ds = fleet();
        let rows = filter_and_sort(&ds, &state("", &[], SortKey::FieldCountDescending));
        assert_eq!(
            names(&ds, &rows),
            vec!["KLM", "Cathay", "delta", "Aer Lingus", "british airways"]
        );
    }

    #[test]
    fn toggling_twice_restores_selection() {
        let start = ViewState::default().apply(StateChange::SelectFields(vec!["visa".into()]));
        let once = start.apply(StateChange::ToggleFields(vec!["baggage".into()]));
        assert!(once.is_selected("baggage"));
        let twice = once.apply(StateChange::ToggleFields(vec!["baggage".into()]));
        assert_eq!(twice, start);
    }

    #[test]
    fn batch_toggle_is_one_transition() {
        let start = ViewState::default().apply(StateChange::SelectFields(vec!["visa".into()]));
        let next = start.apply(StateChange::ToggleFields(vec![
            "visa".into(),
            "baggage".into(),
            "baggage".into(),
        ]));
        assert_eq!(
            next.selected_fields.iter().collect::<Vec<_>>(),
            vec!["baggage"]
        );
        // The original value is untouched
        assert!(start.is_selected("visa"));
    }

    #[test]
    fn select_all_and_clear_all() {
        let ds = fleet();
        let start = ViewState::default().apply(StateChange::SelectFields(vec!["visa".into()]));
        let all = start.apply(StateChange::SelectFields(ds.fields().to_vec()));
        assert_eq!(all.selected_fields.len(), ds.fields().len());
        let none = all.apply(StateChange::ClearFields);
        assert!(none.selected_fields.is_empty());
    }

    #[test]
    fn sort_key_cycles() {
        let key = SortKey::default();
        assert_eq!(key, SortKey::NameAscending);
        assert_eq!(key.next().next().next(), key);
        assert_eq!(key.next().label(), "Name (Z-A)");
    }
}
