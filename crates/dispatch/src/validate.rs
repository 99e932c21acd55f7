//! Declarative argument validation driven by tool descriptors.
//!
//! Runs before any handler or store I/O. Collects every violation found,
//! not just the first, so a caller gets the complete correction list in
//! one round trip. Unknown extra fields are allowed for forward
//! compatibility.

use std::fmt;

use serde_json::Value;

use crate::descriptor::{ParamSpec, ParamType, ToolDescriptor};

/// One validation failure, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub problem: String,
}

impl Violation {
    fn new(field: &str, problem: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            problem: problem.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// Check `args` against the descriptor's parameter contract.
pub fn validate(descriptor: &ToolDescriptor, args: &Value) -> Result<(), Vec<Violation>> {
    let object = match args {
        Value::Object(map) => Some(map),
        Value::Null => None,
        _ => {
            return Err(vec![Violation::new(
                "arguments",
                "expected a JSON object",
            )])
        }
    };

    let mut violations = Vec::new();

    for param in &descriptor.params {
        let value = object.and_then(|m| m.get(&param.name));
        match value {
            None | Some(Value::Null) => {
                if param.required {
                    violations.push(Violation::new(&param.name, "required field is missing"));
                }
            }
            Some(value) => check_value(param, value, &mut violations),
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_value(param: &ParamSpec, value: &Value, violations: &mut Vec<Violation>) {
    match param.kind {
        ParamType::String => match value.as_str() {
            Some(s) => {
                if param.required && s.trim().is_empty() {
                    violations.push(Violation::new(&param.name, "must not be empty"));
                } else if let Some(allowed) = &param.one_of {
                    if !allowed.iter().any(|a| a == s) {
                        violations.push(Violation::new(
                            &param.name,
                            format!("must be one of: {}", allowed.join(", ")),
                        ));
                    }
                }
            }
            None => violations.push(Violation::new(&param.name, "expected a string")),
        },
        ParamType::Integer => match value.as_i64() {
            Some(n) => {
                if let Some(min) = param.min {
                    if n < min {
                        violations.push(Violation::new(
                            &param.name,
                            format!("must be at least {min}"),
                        ));
                    }
                }
                if let Some(max) = param.max {
                    if n > max {
                        violations.push(Violation::new(
                            &param.name,
                            format!("must be at most {max}"),
                        ));
                    }
                }
            }
            None => violations.push(Violation::new(&param.name, "expected an integer")),
        },
        ParamType::Number => {
            if !value.is_number() {
                violations.push(Violation::new(&param.name, "expected a number"));
            }
        }
        ParamType::Boolean => {
            if !value.is_boolean() {
                violations.push(Violation::new(&param.name, "expected a boolean"));
            }
        }
        ParamType::Array => match value.as_array() {
            Some(items) => {
                if param.required && items.is_empty() {
                    violations.push(Violation::new(&param.name, "must not be empty"));
                }
            }
            None => violations.push(Violation::new(&param.name, "expected an array")),
        },
        ParamType::Object => {
            if !value.is_object() {
                violations.push(Violation::new(&param.name, "expected an object"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ParamSpec;
    use serde_json::json;

    fn author_descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "create_author",
            "Create a new author.",
            vec![
                ParamSpec::string("name", "Author name").required(),
                ParamSpec::string("email", "Contact email").required(),
                ParamSpec::string("bio", "Short biography"),
            ],
        )
    }

    #[test]
    fn test_valid_arguments_pass() {
        let args = json!({"name": "Jane Doe", "email": "jane@x.com"});
        assert!(validate(&author_descriptor(), &args).is_ok());
    }

    #[test]
    fn test_missing_required_field_named() {
        let args = json!({"name": "Jane Doe"});
        let violations = validate(&author_descriptor(), &args).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "email");
        assert_eq!(violations[0].problem, "required field is missing");
    }

    #[test]
    fn test_all_violations_collected() {
        // Both missing required fields and a type mismatch in one pass.
        let args = json!({"bio": 42});
        let violations = validate(&author_descriptor(), &args).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "bio"]);
    }

    #[test]
    fn test_empty_required_string_rejected() {
        let args = json!({"name": "  ", "email": "jane@x.com"});
        let violations = validate(&author_descriptor(), &args).unwrap_err();
        assert_eq!(violations[0].field, "name");
        assert_eq!(violations[0].problem, "must not be empty");
    }

    #[test]
    fn test_unknown_extra_fields_allowed() {
        let args = json!({"name": "Jane", "email": "j@x.com", "future_field": true});
        assert!(validate(&author_descriptor(), &args).is_ok());
    }

    #[test]
    fn test_null_arguments_only_required_violations() {
        let violations = validate(&author_descriptor(), &Value::Null).unwrap_err();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        let violations = validate(&author_descriptor(), &json!([1, 2])).unwrap_err();
        assert_eq!(violations[0].field, "arguments");
    }

    #[test]
    fn test_enum_membership() {
        let desc = ToolDescriptor::new(
            "update_book",
            "Update a book.",
            vec![ParamSpec::string("status", "Book status")
                .one_of(&["planned", "drafting", "editing", "published"])],
        );
        assert!(validate(&desc, &json!({"status": "drafting"})).is_ok());
        let violations = validate(&desc, &json!({"status": "done"})).unwrap_err();
        assert!(violations[0].problem.contains("must be one of"));
    }

    #[test]
    fn test_integer_range() {
        let desc = ToolDescriptor::new(
            "log_writing_session",
            "Record a session.",
            vec![ParamSpec::integer("focus_rating", "Focus level 1-10").range(1, 10)],
        );
        assert!(validate(&desc, &json!({"focus_rating": 7})).is_ok());
        let low = validate(&desc, &json!({"focus_rating": 0})).unwrap_err();
        assert_eq!(low[0].problem, "must be at least 1");
        let high = validate(&desc, &json!({"focus_rating": 11})).unwrap_err();
        assert_eq!(high[0].problem, "must be at most 10");
    }

    #[test]
    fn test_float_is_not_an_integer() {
        let desc = ToolDescriptor::new(
            "get_book",
            "Fetch a book.",
            vec![ParamSpec::integer("book_id", "Book id").required()],
        );
        let violations = validate(&desc, &json!({"book_id": 1.5})).unwrap_err();
        assert_eq!(violations[0].problem, "expected an integer");
    }

    #[test]
    fn test_required_array_must_be_non_empty() {
        let desc = ToolDescriptor::new(
            "reorder_scenes",
            "Renumber scenes.",
            vec![ParamSpec::array("order", "New ordering").required()],
        );
        let violations = validate(&desc, &json!({"order": []})).unwrap_err();
        assert_eq!(violations[0].problem, "must not be empty");
    }

    #[test]
    fn test_optional_null_is_ignored() {
        let args = json!({"name": "Jane", "email": "j@x.com", "bio": null});
        assert!(validate(&author_descriptor(), &args).is_ok());
    }
}
