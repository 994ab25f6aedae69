//! Declarative contact form validation.
//!
//! Each field carries an ordered list of rules. Evaluation short-circuits:
//! the first failing rule records its message and no further rules run for
//! that field. A field lands in exactly one of the two result maps — its
//! first error message, or its trimmed value in `clean`.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// The five declared contact form fields, in display order.
pub const CONTACT_FIELDS: [&str; 5] = ["name", "email", "email_cmp", "category", "body"];

/// Result of validating a submission.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// First failing rule message per invalid field.
    pub errors: BTreeMap<String, String>,

    /// Trimmed values of fields that passed every rule.
    pub clean: BTreeMap<String, String>,
}

impl Validation {
    /// The submission is valid iff no field failed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A single validation rule: predicate plus failure message.
struct Rule {
    message: &'static str,
    check: fn(value: &str, raw: &HashMap<String, String>) -> bool,
}

/// Ordered rules for one field.
struct FieldRules {
    field: &'static str,
    rules: &'static [Rule],
}

/// Deliberately permissive email syntax: one @, no whitespace, a dot in the
/// domain. The confirmation field and the auto-reply bounce catch typos
/// better than a stricter pattern would.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex literal"));

fn not_empty(value: &str, _raw: &HashMap<String, String>) -> bool {
    !value.is_empty()
}

fn max_50(value: &str, _raw: &HashMap<String, String>) -> bool {
    value.chars().count() <= 50
}

fn max_1000(value: &str, _raw: &HashMap<String, String>) -> bool {
    value.chars().count() <= 1000
}

fn valid_email(value: &str, _raw: &HashMap<String, String>) -> bool {
    EMAIL_RE.is_match(value)
}

fn matches_email(value: &str, raw: &HashMap<String, String>) -> bool {
    raw.get("email").map(|e| e.trim()) == Some(value)
}

/// Declared rule table for the contact form.
const CONTACT_RULES: [FieldRules; 5] = [
    FieldRules {
        field: "name",
        rules: &[
            Rule {
                message: "Please enter your name.",
                check: not_empty,
            },
            Rule {
                message: "Name must be 50 characters or fewer.",
                check: max_50,
            },
        ],
    },
    FieldRules {
        field: "email",
        rules: &[
            Rule {
                message: "Please enter your email address.",
                check: not_empty,
            },
            Rule {
                message: "Please enter a valid email address.",
                check: valid_email,
            },
        ],
    },
    FieldRules {
        field: "email_cmp",
        rules: &[
            Rule {
                message: "Please re-enter your email address.",
                check: not_empty,
            },
            Rule {
                message: "Email addresses do not match.",
                check: matches_email,
            },
        ],
    },
    FieldRules {
        field: "category",
        rules: &[Rule {
            message: "Please select a category.",
            check: not_empty,
        }],
    },
    FieldRules {
        field: "body",
        rules: &[
            Rule {
                message: "Please enter a message.",
                check: not_empty,
            },
            Rule {
                message: "Message must be 1000 characters or fewer.",
                check: max_1000,
            },
        ],
    },
];

/// Validate raw contact form fields.
pub fn validate_contact(raw: &HashMap<String, String>) -> Validation {
    let mut result = Validation::default();

    for field_rules in &CONTACT_RULES {
        let value = raw
            .get(field_rules.field)
            .map(|v| v.trim())
            .unwrap_or_default();

        let mut failure = None;
        for rule in field_rules.rules {
            if !(rule.check)(value, raw) {
                failure = Some(rule.message);
                break;
            }
        }

        match failure {
            Some(message) => {
                result
                    .errors
                    .insert(field_rules.field.to_string(), message.to_string());
            }
            None => {
                result
                    .clean
                    .insert(field_rules.field.to_string(), value.to_string());
            }
        }
    }

    result
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn submission(fields: &[(&str, &str)]) -> HashMap<String, String> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_submission() -> HashMap<String, String> {
        submission(&[
            ("name", "Jo"),
            ("email", "a@x.com"),
            ("email_cmp", "a@x.com"),
            ("category", "product"),
            ("body", "hi"),
        ])
    }

    #[test]
    fn valid_submission_cleans_all_five_fields() {
        let result = validate_contact(&valid_submission());

        assert!(result.is_valid());
        assert!(result.errors.is_empty());
        for field in CONTACT_FIELDS {
            assert!(result.clean.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn values_are_trimmed_into_clean() {
        let mut raw = valid_submission();
        raw.insert("name".to_string(), "  Jo  ".to_string());
        raw.insert("body".to_string(), "\nhi\t".to_string());

        let result = validate_contact(&raw);
        assert!(result.is_valid());
        assert_eq!(result.clean.get("name").unwrap(), "Jo");
        assert_eq!(result.clean.get("body").unwrap(), "hi");
    }

    #[test]
    fn missing_field_yields_first_declared_rule_message() {
        for field in CONTACT_FIELDS {
            let mut raw = valid_submission();
            raw.remove(field);
            // A removed email also fails email_cmp's equality rule; restore
            // the pair coherently when testing the other fields.
            if field != "email" && field != "email_cmp" {
                let result = validate_contact(&raw);
                assert!(!result.is_valid());
                assert!(result.errors.contains_key(field), "no error for {field}");
                assert!(!result.clean.contains_key(field));
            }
        }

        let mut raw = valid_submission();
        raw.remove("name");
        let result = validate_contact(&raw);
        assert_eq!(result.errors.get("name").unwrap(), "Please enter your name.");
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        let mut raw = valid_submission();
        raw.insert("name".to_string(), "   ".to_string());

        let result = validate_contact(&raw);
        assert_eq!(result.errors.get("name").unwrap(), "Please enter your name.");
    }

    #[test]
    fn field_appears_in_exactly_one_map() {
        let mut raw = valid_submission();
        raw.insert("email".to_string(), "not-an-email".to_string());

        let result = validate_contact(&raw);
        for field in CONTACT_FIELDS {
            let in_errors = result.errors.contains_key(field);
            let in_clean = result.clean.contains_key(field);
            assert!(in_errors != in_clean, "{field} must be in exactly one map");
        }
    }

    #[test]
    fn short_circuit_reports_only_first_failure() {
        // Empty name fails the required rule; the length rule never runs.
        let mut raw = valid_submission();
        raw.insert("name".to_string(), String::new());

        let result = validate_contact(&raw);
        assert_eq!(result.errors.get("name").unwrap(), "Please enter your name.");
    }

    #[test]
    fn name_over_50_chars_fails_length_rule() {
        let mut raw = valid_submission();
        raw.insert("name".to_string(), "x".repeat(51));

        let result = validate_contact(&raw);
        assert_eq!(
            result.errors.get("name").unwrap(),
            "Name must be 50 characters or fewer."
        );
    }

    #[test]
    fn body_over_1000_chars_fails_length_rule() {
        let mut raw = valid_submission();
        raw.insert("body".to_string(), "x".repeat(1001));

        let result = validate_contact(&raw);
        assert_eq!(
            result.errors.get("body").unwrap(),
            "Message must be 1000 characters or fewer."
        );
    }

    #[test]
    fn email_syntax_is_checked() {
        for bad in ["plain", "a@b", "a b@c.com", "@x.com", "a@"] {
            let mut raw = valid_submission();
            raw.insert("email".to_string(), bad.to_string());
            let result = validate_contact(&raw);
            assert!(
                result.errors.contains_key("email"),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn email_cmp_mismatch_is_an_error_never_a_silent_pass() {
        let mut raw = valid_submission();
        raw.insert("email_cmp".to_string(), "b@x.com".to_string());

        let result = validate_contact(&raw);
        assert_eq!(
            result.errors.get("email_cmp").unwrap(),
            "Email addresses do not match."
        );
        assert!(!result.clean.contains_key("email_cmp"));
    }

    #[test]
    fn email_cmp_compares_post_trim() {
        let mut raw = valid_submission();
        raw.insert("email".to_string(), " a@x.com ".to_string());
        raw.insert("email_cmp".to_string(), "a@x.com".to_string());

        let result = validate_contact(&raw);
        assert!(result.is_valid());
    }
}
