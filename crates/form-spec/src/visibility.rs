use std::collections::{BTreeMap, HashMap, HashSet};

use crate::spec::field::{ConditionalField, FieldDefinition, FieldId};
use crate::value::ValueMap;

pub type VisibilityMap = BTreeMap<FieldId, bool>;

/// Where a dependency chain stopped while walking towards its root.
enum ChainEnd {
    /// The last field on the chain has no condition.
    Root,
    /// The last field depends on a field that has already been resolved.
    Resolved(bool),
    /// The last field depends on an id that is not among the definitions.
    Dangling,
    /// The chain ran back into itself.
    Cycle,
}

/// Decides which fields are currently shown.
///
/// A field with a condition is visible only when its source field is visible
/// and holds exactly the expected value. Each field has at most one source, so
/// following sources forms a chain; a chain that revisits a field is a cycle and
/// every field on it resolves hidden.
pub fn resolve_visibility(fields: &[FieldDefinition], values: &ValueMap) -> VisibilityMap {
    let index: HashMap<&str, &FieldDefinition> = fields
        .iter()
        .map(|field| (field.id.as_str(), field))
        .collect();
    let mut resolved: HashMap<&str, bool> = HashMap::with_capacity(fields.len());

    for field in fields {
        if resolved.contains_key(field.id.as_str()) {
            continue;
        }

        let mut chain: Vec<&FieldDefinition> = Vec::new();
        let mut on_chain: HashSet<&str> = HashSet::new();
        let mut current = field;
        let end = loop {
            if let Some(&visible) = resolved.get(current.id.as_str()) {
                break ChainEnd::Resolved(visible);
            }
            if !on_chain.insert(current.id.as_str()) {
                break ChainEnd::Cycle;
            }
            chain.push(current);
            match &current.conditional_field {
                None => break ChainEnd::Root,
                Some(condition) => match index.get(condition.field_id.as_str()) {
                    Some(source) => current = *source,
                    None => break ChainEnd::Dangling,
                },
            }
        };

        let mut upstream = match end {
            ChainEnd::Cycle => {
                for member in &chain {
                    resolved.insert(member.id.as_str(), false);
                }
                continue;
            }
            ChainEnd::Resolved(visible) => visible,
            ChainEnd::Root | ChainEnd::Dangling => true,
        };

        for member in chain.iter().rev() {
            let visible = match &member.conditional_field {
                None => true,
                Some(condition) => upstream && condition_holds(condition, values),
            };
            resolved.insert(member.id.as_str(), visible);
            upstream = visible;
        }
    }

    fields
        .iter()
        .map(|field| {
            let visible = resolved.get(field.id.as_str()).copied().unwrap_or(true);
            (field.id.clone(), visible)
        })
        .collect()
}

/// The visible subset of `fields`, in the order given.
pub fn visible_fields<'a>(
    fields: &'a [FieldDefinition],
    values: &ValueMap,
) -> Vec<&'a FieldDefinition> {
    let visibility = resolve_visibility(fields, values);
    fields
        .iter()
        .filter(|field| visibility.get(&field.id).copied().unwrap_or(true))
        .collect()
}

fn condition_holds(condition: &ConditionalField, values: &ValueMap) -> bool {
    values.get(&condition.field_id) == Some(&condition.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::FieldType;
    use crate::value::FieldValue;

    fn field(id: &str) -> FieldDefinition {
        FieldDefinition::new(id, FieldType::Text)
            .expect("field")
            .with_id(id)
    }

    #[test]
    fn unconditional_fields_are_visible() {
        let fields = vec![field("a"), field("b")];
        let map = resolve_visibility(&fields, &ValueMap::new());
        assert!(map.values().all(|visible| *visible));
    }

    #[test]
    fn condition_uses_strict_equality() {
        let fields = vec![
            FieldDefinition::new("Has degree", FieldType::Checkbox)
                .expect("field")
                .with_id("degree"),
            field("school").shown_when("degree", FieldValue::Boolean(true)),
        ];
        let mut values = ValueMap::new();
        values.set("degree", FieldValue::Text("true".into()));
        assert_eq!(resolve_visibility(&fields, &values)["school"], false);

        values.set("degree", FieldValue::Boolean(true));
        assert_eq!(resolve_visibility(&fields, &values)["school"], true);
    }

    #[test]
    fn hidden_source_hides_dependents_transitively() {
        // c depends on b, b depends on a; a hides b, so c is hidden even though
        // its own condition holds.
        let fields = vec![
            field("c").shown_when("b", FieldValue::Text("yes".into())),
            field("b").shown_when("a", FieldValue::Text("yes".into())),
            field("a"),
        ];
        let mut values = ValueMap::new();
        values.set("a", FieldValue::Text("no".into()));
        values.set("b", FieldValue::Text("yes".into()));
        let map = resolve_visibility(&fields, &values);
        assert!(map["a"]);
        assert!(!map["b"]);
        assert!(!map["c"]);

        values.set("a", FieldValue::Text("yes".into()));
        let map = resolve_visibility(&fields, &values);
        assert!(map["b"]);
        assert!(map["c"]);
    }

    #[test]
    fn cycles_resolve_hidden_without_looping() {
        let fields = vec![
            field("a").shown_when("b", FieldValue::Text("x".into())),
            field("b").shown_when("a", FieldValue::Text("x".into())),
            field("tail").shown_when("a", FieldValue::Text("x".into())),
            field("self").shown_when("self", FieldValue::Text("x".into())),
            field("free"),
        ];
        let values: ValueMap = ["a", "b", "tail", "self"]
            .into_iter()
            .map(|id| (id.to_string(), FieldValue::Text("x".into())))
            .collect();
        let map = resolve_visibility(&fields, &values);
        assert!(!map["a"]);
        assert!(!map["b"]);
        assert!(!map["tail"]);
        assert!(!map["self"]);
        assert!(map["free"]);
    }

    #[test]
    fn dangling_reference_checks_value_map_only() {
        let fields = vec![field("x").shown_when("ghost", FieldValue::Text("boo".into()))];
        let mut values = ValueMap::new();
        assert!(!resolve_visibility(&fields, &values)["x"]);
        values.set("ghost", FieldValue::Text("boo".into()));
        assert!(resolve_visibility(&fields, &values)["x"]);
    }
}
