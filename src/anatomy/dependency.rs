//! Declaration-order checks for virtual markers.
//!
//! A virtual marker may be built from other virtual markers, so the recipes form a
//! directed graph whose sources are the tracked markers. The declaration order of the
//! configuration is the synthesis order, so it must already be a topological order of
//! that graph: every component is a tracked marker or a virtual marker declared earlier.
//! A reference to a later recipe is rejected, and reported as a cycle when that later
//! recipe leads back to the referencing one.
use indexmap::IndexMap;

use crate::constants::MarkerName;
use crate::model_info::VirtualMarkerDefinition;
use crate::skelly_errors::SkellyError;

/// Check that every recipe only references tracked or earlier-declared markers.
///
/// Arguments
/// -----------------
/// * `is_tracked`: predicate telling whether a name is a tracked marker.
/// * `definitions`: the recipes, in declaration order.
///
/// Errors
/// ----------
/// * [`SkellyError::VirtualMarkerCycle`] if a recipe references itself, or references a
///   later recipe that depends back on it. The error lists the recipes of the cycle in
///   declaration order.
/// * [`SkellyError::UnresolvedMarker`] if a component is neither tracked nor declared
///   before the recipe using it.
pub(crate) fn check_declaration_order<F>(
    is_tracked: F,
    definitions: &IndexMap<MarkerName, VirtualMarkerDefinition>,
) -> Result<(), SkellyError>
where
    F: Fn(&str) -> bool,
{
    for (index, (name, definition)) in definitions.iter().enumerate() {
        for component in &definition.marker_names {
            if is_tracked(component.as_str()) {
                continue;
            }
            match definitions.get_index_of(component) {
                Some(earlier) if earlier < index => {}
                Some(later) => {
                    let mut visited = vec![false; definitions.len()];
                    if let Some(mut cycle) =
                        path_back(&is_tracked, definitions, later, index, &mut visited)
                    {
                        cycle.sort_unstable();
                        cycle.dedup();
                        return Err(SkellyError::VirtualMarkerCycle(
                            cycle
                                .into_iter()
                                .filter_map(|i| definitions.get_index(i).map(|(n, _)| n.clone()))
                                .collect(),
                        ));
                    }
                    return Err(SkellyError::UnresolvedMarker {
                        context: format!("virtual marker '{name}' (declared later)"),
                        marker: component.clone(),
                    });
                }
                None => {
                    return Err(SkellyError::UnresolvedMarker {
                        context: format!("virtual marker '{name}'"),
                        marker: component.clone(),
                    })
                }
            }
        }
    }
    Ok(())
}

/// Recipes on a reference path from `from` to `target`, both included.
fn path_back<F>(
    is_tracked: &F,
    definitions: &IndexMap<MarkerName, VirtualMarkerDefinition>,
    from: usize,
    target: usize,
    visited: &mut [bool],
) -> Option<Vec<usize>>
where
    F: Fn(&str) -> bool,
{
    if from == target {
        return Some(vec![target]);
    }
    if visited[from] {
        return None;
    }
    visited[from] = true;
    let (_, definition) = definitions.get_index(from)?;
    definition
        .marker_names
        .iter()
        .filter(|component| !is_tracked(component.as_str()))
        .filter_map(|component| definitions.get_index_of(component))
        .find_map(|next| path_back(is_tracked, definitions, next, target, visited))
        .map(|mut path| {
            path.push(from);
            path
        })
}

#[cfg(test)]
mod test_declaration_order {
    use super::*;

    fn recipe(names: &[&str]) -> VirtualMarkerDefinition {
        let w = 1.0 / names.len() as f64;
        VirtualMarkerDefinition {
            marker_names: names.iter().map(|s| s.to_string()).collect(),
            marker_weights: vec![w; names.len()],
        }
    }

    fn tracked(name: &str) -> bool {
        matches!(name, "a" | "b" | "c")
    }

    #[test]
    fn test_earlier_references_accepted() {
        let mut defs = IndexMap::new();
        defs.insert("m1".to_string(), recipe(&["a", "b"]));
        defs.insert("m2".to_string(), recipe(&["m1", "c"]));
        defs.insert("m3".to_string(), recipe(&["m2", "m1"]));
        assert_eq!(check_declaration_order(tracked, &defs), Ok(()));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut defs = IndexMap::new();
        defs.insert("outer".to_string(), recipe(&["inner", "a"]));
        defs.insert("other".to_string(), recipe(&["b"]));
        defs.insert("inner".to_string(), recipe(&["b", "c"]));
        assert_eq!(
            check_declaration_order(tracked, &defs),
            Err(SkellyError::UnresolvedMarker {
                context: "virtual marker 'outer' (declared later)".into(),
                marker: "inner".into()
            })
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut defs = IndexMap::new();
        defs.insert("free".to_string(), recipe(&["a"]));
        defs.insert("x".to_string(), recipe(&["y"]));
        defs.insert("y".to_string(), recipe(&["x"]));
        assert_eq!(
            check_declaration_order(tracked, &defs),
            Err(SkellyError::VirtualMarkerCycle(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn test_long_cycle_through_earlier_marker() {
        let mut defs = IndexMap::new();
        defs.insert("x".to_string(), recipe(&["a"]));
        defs.insert("y".to_string(), recipe(&["z", "x"]));
        defs.insert("w".to_string(), recipe(&["y"]));
        defs.insert("z".to_string(), recipe(&["w"]));
        assert_eq!(
            check_declaration_order(tracked, &defs),
            Err(SkellyError::VirtualMarkerCycle(vec![
                "y".into(),
                "w".into(),
                "z".into()
            ]))
        );
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut defs = IndexMap::new();
        defs.insert("x".to_string(), recipe(&["x", "a"]));
        assert_eq!(
            check_declaration_order(tracked, &defs),
            Err(SkellyError::VirtualMarkerCycle(vec!["x".into()]))
        );
    }

    #[test]
    fn test_unresolved_reference() {
        let mut defs = IndexMap::new();
        defs.insert("x".to_string(), recipe(&["a", "ghost"]));
        assert_eq!(
            check_declaration_order(tracked, &defs),
            Err(SkellyError::UnresolvedMarker {
                context: "virtual marker 'x'".into(),
                marker: "ghost".into()
            })
        );
    }
}
