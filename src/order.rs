//! Emission order for loaded assets.
//!
//! The order is a reference-count heuristic, not a topological sort:
//!
//! 1. Count how many loaded assets require each name.
//! 2. Sort those names by count, descending; ties keep first-seen order.
//! 3. Emit the required names, then the loaded names, skipping duplicates.
//!
//! With no requirements at all the result is simply the load order. The
//! heuristic can place a requirement after one of its dependents when counts
//! tie unfavorably (e.g. a chain `c → b → a` where every name is required
//! once emits `b, a, c`). Output compatibility depends on this exact order,
//! so it is kept as is.

use indexmap::{IndexMap, IndexSet};

/// Final emission order for a `name -> requires` working set.
pub fn emission_order(to_render: &IndexMap<String, Vec<String>>) -> Vec<String> {
    let mut required_count: IndexMap<&str, usize> = IndexMap::new();
    for requires in to_render.values() {
        for name in requires {
            *required_count.entry(name.as_str()).or_insert(0) += 1;
        }
    }
    // stable: equal counts keep first-seen order
    required_count.sort_by(|_, a, _, b| b.cmp(a));

    let mut order: IndexSet<&str> = IndexSet::with_capacity(required_count.len() + to_render.len());
    order.extend(required_count.keys().copied());
    order.extend(to_render.keys().map(String::as_str));
    order.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn working_set(entries: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, reqs)| {
                (
                    name.to_string(),
                    reqs.iter().map(|r| r.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn no_requirements_keeps_insertion_order() {
        let set = working_set(&[("c", &[]), ("a", &[]), ("b", &[])]);
        assert_eq!(emission_order(&set), vec!["c", "a", "b"]);
    }

    #[test]
    fn shared_requirement_comes_first() {
        let set = working_set(&[("c", &["a"]), ("b", &["a"])]);
        assert_eq!(emission_order(&set), vec!["a", "c", "b"]);
    }

    #[test]
    fn loaded_requirement_not_duplicated() {
        let set = working_set(&[("b", &["a"]), ("a", &[])]);
        assert_eq!(emission_order(&set), vec!["a", "b"]);
    }

    #[test]
    fn higher_count_sorts_earlier() {
        let set = working_set(&[
            ("app", &["util", "jquery"]),
            ("menu", &["jquery"]),
            ("forms", &["jquery", "util"]),
            ("gallery", &["jquery"]),
        ]);
        assert_eq!(
            emission_order(&set),
            vec!["jquery", "util", "app", "menu", "forms", "gallery"]
        );
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let set = working_set(&[("x", &["b", "a"]), ("y", &["a", "b"])]);
        assert_eq!(emission_order(&set), vec!["b", "a", "x", "y"]);
    }

    #[test]
    fn chain_limitation_preserved() {
        // c requires b, b requires a: every count is 1, so first-seen order
        // of the requirements wins and a does not precede b.
        let set = working_set(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(emission_order(&set), vec!["b", "a", "c"]);
    }

    #[test]
    fn unloaded_requirement_is_included() {
        let set = working_set(&[("app", &["polyfill"])]);
        assert_eq!(emission_order(&set), vec!["polyfill", "app"]);
    }

    #[test]
    fn empty_set() {
        assert!(emission_order(&IndexMap::new()).is_empty());
    }
}
