use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::models::{Category, Person};

use super::ValidationError;

/// Fields every record must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "name", "category"];

/// Check a raw dataset: must be an array of objects carrying the required
/// fields with unique ids. Unrecognized categories only log a warning.
pub fn validate_data(value: &Value) -> Result<(), ValidationError> {
    let items = value.as_array().ok_or(ValidationError::NotAnArray)?;
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let record = item
            .as_object()
            .ok_or(ValidationError::NotAnObject { index })?;

        for field in REQUIRED_FIELDS {
            if !record.contains_key(field) {
                return Err(ValidationError::MissingField { field, index });
            }
        }

        let name = match &record["name"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let recognized = record["category"]
            .as_str()
            .map(|tag| Category::parse(tag).is_recognized())
            .unwrap_or(false);
        if !recognized {
            warn!(category = %record["category"], name = %name, "Unknown category");
        }

        let id = record["id"].to_string();
        if !seen.insert(id.clone()) {
            return Err(ValidationError::DuplicateId { id, name });
        }
    }

    Ok(())
}

/// Typed counterpart of [`validate_data`] for a dataset already decoded.
pub fn validate_people(people: &[Person]) -> Result<(), ValidationError> {
    let mut seen: HashSet<i64> = HashSet::with_capacity(people.len());
    for person in people {
        if !person.category.is_recognized() {
            warn!(category = %person.category, name = %person.name, "Unknown category");
        }
        if !seen.insert(person.id) {
            return Err(ValidationError::DuplicateId {
                id: person.id.to_string(),
                name: person.name.clone(),
            });
        }
    }
    Ok(())
}

/// Parse and validate a serialized dataset, e.g. an import file.
pub fn parse_dataset(json: &str) -> Result<Vec<Person>, ValidationError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    validate_data(&value)?;
    serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn well_formed() -> Value {
        json!([
            {"id": 1, "name": "A", "category": "media", "info": "a"},
            {"id": 2, "name": "B", "category": "fame", "info": "b"},
            {"id": 3, "name": "C", "category": "coder", "info": "c"}
        ])
    }

    #[test]
    fn test_well_formed_dataset_passes() {
        assert_eq!(validate_data(&well_formed()), Ok(()));
    }

    #[test]
    fn test_not_an_array_fails() {
        assert_eq!(
            validate_data(&json!({"id": 1})),
            Err(ValidationError::NotAnArray)
        );
    }

    #[test]
    fn test_non_object_element_fails() {
        assert_eq!(
            validate_data(&json!([{"id": 1, "name": "A", "category": "media"}, 5])),
            Err(ValidationError::NotAnObject { index: 1 })
        );
    }

    #[test]
    fn test_missing_field_fails() {
        let data = json!([
            {"id": 1, "name": "A", "category": "media"},
            {"id": 2, "category": "media"}
        ]);
        assert_eq!(
            validate_data(&data),
            Err(ValidationError::MissingField { field: "name", index: 1 })
        );
    }

    #[test]
    fn test_duplicate_id_fails() {
        let data = json!([
            {"id": 1, "name": "A", "category": "media"},
            {"id": 1, "name": "B", "category": "fame"}
        ]);
        assert!(matches!(
            validate_data(&data),
            Err(ValidationError::DuplicateId { ref id, .. }) if id == "1"
        ));
    }

    #[test]
    fn test_unknown_category_is_not_fatal() {
        let data = json!([{"id": 1, "name": "A", "category": "vip"}]);
        assert_eq!(validate_data(&data), Ok(()));
    }

    #[test]
    fn test_validate_people_duplicate() {
        let people = vec![
            Person::new(4, "A", Category::Media),
            Person::new(4, "B", Category::Media),
        ];
        assert!(matches!(
            validate_people(&people),
            Err(ValidationError::DuplicateId { ref name, .. }) if name == "B"
        ));
        assert_eq!(validate_people(&people[..1]), Ok(()));
    }

    #[test]
    fn test_parse_dataset() {
        let people = parse_dataset(&well_formed().to_string()).unwrap();
        assert_eq!(people.len(), 3);
        assert_eq!(people[2].category, Category::Coder);

        assert!(matches!(
            parse_dataset("not json"),
            Err(ValidationError::Malformed(_))
        ));
        // Passes shape checks but the id is not an integer
        assert!(matches!(
            parse_dataset(r#"[{"id": "x", "name": "A", "category": "media"}]"#),
            Err(ValidationError::Malformed(_))
        ));
    }
}
