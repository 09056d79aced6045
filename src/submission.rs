//! Survey form validation and submission.
//!
//! Validation is the only gate in front of the store: a form that fails it is
//! never written, and a valid form is written in a single append.

use crate::models::{CategorySet, NewResponse, RecordId};
use crate::store::{DocumentStore, StoreError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::{info, warn};

/// Digits, spaces, `+`, `-` and parentheses, at least ten characters.
static CONTACT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\s()-]{10,}$").expect("contact pattern is a valid regex"));

/// Raw form input as typed by the respondent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub display_name: String,
    pub group: String,
    pub contact: String,
    pub category: String,
}

/// Form field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    DisplayName,
    Group,
    Contact,
    Category,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::DisplayName => write!(f, "display name"),
            Field::Group => write!(f, "group"),
            Field::Contact => write!(f, "contact"),
            Field::Category => write!(f, "category"),
        }
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Empty or whitespace only.
    Missing,
    /// Contact does not look like a phone number.
    InvalidContact,
    /// Category outside the configured set.
    UnknownCategory,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Missing => write!(f, "is required"),
            Reason::InvalidContact => write!(
                f,
                "must contain at least 10 digits, spaces, '+', '-' or parentheses"
            ),
            Reason::UnknownCategory => write!(f, "is not one of the offered options"),
        }
    }
}

/// A rejected submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: Field,
    pub reason: Reason,
}

impl ValidationError {
    fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }
}

/// Failure of a whole submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("could not save the response: {0}")]
    Write(#[from] StoreError),
}

impl SubmitError {
    /// Whether re-submitting the same form might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Write(_))
    }
}

/// Check a form and turn it into a response ready for the store.
///
/// Fields are trimmed. All required fields are checked for presence before the
/// contact pattern and the category are checked.
pub fn validate(
    form: &SubmissionForm,
    categories: &CategorySet,
) -> Result<NewResponse, ValidationError> {
    let display_name = form.display_name.trim();
    let group = form.group.trim();
    let contact = form.contact.trim();
    let category = form.category.trim();

    for (field, value) in [
        (Field::DisplayName, display_name),
        (Field::Group, group),
        (Field::Contact, contact),
        (Field::Category, category),
    ] {
        if value.is_empty() {
            return Err(ValidationError::new(field, Reason::Missing));
        }
    }

    if !is_valid_contact(contact) {
        return Err(ValidationError::new(Field::Contact, Reason::InvalidContact));
    }

    if !categories.contains(category) {
        return Err(ValidationError::new(Field::Category, Reason::UnknownCategory));
    }

    Ok(NewResponse {
        display_name: display_name.to_string(),
        group: group.to_string(),
        contact: contact.to_string(),
        category: category.to_string(),
    })
}

/// Whether `contact` matches the accepted phone-like pattern.
pub fn is_valid_contact(contact: &str) -> bool {
    CONTACT_PATTERN.is_match(contact)
}

/// Validate a form and append it to `collection`.
///
/// Nothing is written when validation fails. Write failures are not retried.
pub async fn submit(
    store: &dyn DocumentStore,
    collection: &str,
    form: &SubmissionForm,
    categories: &CategorySet,
) -> Result<RecordId, SubmitError> {
    let response =
        validate(form, categories).inspect_err(|e| warn!("Rejected submission: {}", e))?;

    let id = store.append(collection, response).await?;
    info!("Stored submission {} in {}", id, collection);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SnapshotOrder};

    fn categories() -> CategorySet {
        CategorySet::new(["Employee", "Public Service", "Own Business"]).unwrap()
    }

    fn make_form() -> SubmissionForm {
        SubmissionForm {
            display_name: "Sd Silva".to_string(),
            group: "1st Battery".to_string(),
            contact: "(11) 99999-9999".to_string(),
            category: "Employee".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let response = validate(&make_form(), &categories()).unwrap();
        assert_eq!(response.display_name, "Sd Silva");
        assert_eq!(response.category, "Employee");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let mut form = make_form();
        form.display_name = "  Sd Silva ".to_string();
        let response = validate(&form, &categories()).unwrap();
        assert_eq!(response.display_name, "Sd Silva");
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            (
                Field::DisplayName,
                SubmissionForm {
                    display_name: String::new(),
                    ..make_form()
                },
            ),
            (
                Field::Group,
                SubmissionForm {
                    group: "   ".to_string(),
                    ..make_form()
                },
            ),
            (
                Field::Contact,
                SubmissionForm {
                    contact: String::new(),
                    ..make_form()
                },
            ),
            (
                Field::Category,
                SubmissionForm {
                    category: String::new(),
                    ..make_form()
                },
            ),
        ];

        for (field, form) in cases {
            assert_eq!(
                validate(&form, &categories()),
                Err(ValidationError::new(field, Reason::Missing))
            );
        }
    }

    #[test]
    fn test_presence_checked_before_contact_pattern() {
        let form = SubmissionForm {
            contact: "abc".to_string(),
            category: String::new(),
            ..make_form()
        };
        assert_eq!(validate(&form, &categories()).unwrap_err().field, Field::Category);
    }

    #[test]
    fn test_contact_pattern() {
        assert!(is_valid_contact("(11) 99999-9999"));
        assert!(is_valid_contact("+55 11 98888-7777"));
        assert!(is_valid_contact("1199999999"));
        assert!(!is_valid_contact("abc"));
        assert!(!is_valid_contact("12345"));
        assert!(!is_valid_contact("11 9999x9999"));
    }

    #[test]
    fn test_invalid_contact_rejected() {
        let form = SubmissionForm {
            contact: "abc".to_string(),
            ..make_form()
        };
        assert_eq!(
            validate(&form, &categories()),
            Err(ValidationError::new(Field::Contact, Reason::InvalidContact))
        );
    }

    #[test]
    fn test_unknown_category_rejected() {
        let form = SubmissionForm {
            category: "Retired".to_string(),
            ..make_form()
        };
        assert_eq!(
            validate(&form, &categories()).unwrap_err().reason,
            Reason::UnknownCategory
        );
    }

    #[test]
    fn test_error_message() {
        let error = ValidationError::new(Field::DisplayName, Reason::Missing);
        assert_eq!(error.to_string(), "display name is required");
    }

    #[tokio::test]
    async fn test_invalid_submission_is_never_written() {
        let store = MemoryStore::new();
        let form = SubmissionForm {
            contact: "abc".to_string(),
            ..make_form()
        };

        let result = submit(&store, "responses", &form, &categories()).await;
        assert!(matches!(result, Err(SubmitError::Validation(_))));
        assert!(!result.unwrap_err().is_retryable());

        let snapshot = store
            .snapshot("responses", SnapshotOrder::Unordered)
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_valid_submission_is_stored() {
        let store = MemoryStore::new();

        let id = submit(&store, "responses", &make_form(), &categories())
            .await
            .unwrap();

        let snapshot = store
            .snapshot("responses", SnapshotOrder::Unordered)
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.records[0].id, id);
    }

    #[tokio::test]
    async fn test_write_failure_is_retryable() {
        let store = MemoryStore::new();
        store.reject_writes("network unreachable");

        let error = submit(&store, "responses", &make_form(), &categories())
            .await
            .unwrap_err();

        assert!(matches!(error, SubmitError::Write(_)));
        assert!(error.is_retryable());
    }
}
