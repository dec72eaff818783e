// engine/changes.rs - PUT /api/users/:id request body and its validated form

use serde::Deserialize;
use uuid::Uuid;

use super::error::EngineError;
use crate::database::models::{Role, UserStatus};

/// Requested change to a nullable reference field.
///
/// The wire format uses the sentinel string `"none"` (also `null` or the
/// empty string) to mean "explicitly unset"; an absent field means "leave
/// as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefChange {
    #[default]
    Keep,
    Clear,
    Set(Uuid),
}

impl RefChange {
    pub fn resolve(&self, current: Option<Uuid>) -> Option<Uuid> {
        match self {
            RefChange::Keep => current,
            RefChange::Clear => None,
            RefChange::Set(id) => Some(*id),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, RefChange::Keep)
    }

    fn parse(field: &str, raw: Option<&Option<String>>) -> Result<Self, EngineError> {
        match raw {
            None => Ok(RefChange::Keep),
            Some(None) => Ok(RefChange::Clear),
            Some(Some(s)) => match s.as_str() {
                "" | "none" => Ok(RefChange::Clear),
                other => Uuid::parse_str(other)
                    .map(RefChange::Set)
                    .map_err(|_| EngineError::Validation(format!("Invalid {}", field))),
            },
        }
    }
}

/// Raw `PUT /api/users/:id` body. All fields optional; nullable fields are
/// double-optional so an explicit JSON `null` is distinguishable from an
/// absent key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub company_id: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub department_id: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub mobile_number: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub manager_id: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub hod_id: Option<Option<String>>,
    pub status: Option<String>,
}

/// Present-but-null deserializer: an explicit `null` yields `Some(None)`,
/// while an absent key falls back to the field default of `None`.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Validated, typed change set consumed by the engine.
#[derive(Debug, Clone)]
pub struct Changes {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub company_id: Option<Uuid>,
    pub department_id: RefChange,
    pub manager_id: RefChange,
    /// Accepted for wire compatibility; the head relationship is derived
    /// from the department row, so this field is validated but not stored.
    pub hod_id: RefChange,
    pub phone: Option<Option<String>>,
    pub mobile_number: Option<Option<String>>,
    pub status: Option<UserStatus>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<Changes, EngineError> {
        let first_name = match self.first_name {
            Some(s) if s.trim().is_empty() => {
                return Err(EngineError::Validation("First name cannot be empty".into()))
            }
            other => other.map(|s| s.trim().to_string()),
        };
        let last_name = match self.last_name {
            Some(s) if s.trim().is_empty() => {
                return Err(EngineError::Validation("Last name cannot be empty".into()))
            }
            other => other.map(|s| s.trim().to_string()),
        };

        let email = match self.email {
            Some(s) => {
                let s = s.trim().to_ascii_lowercase();
                if !is_plausible_email(&s) {
                    return Err(EngineError::Validation("Valid email is required".into()));
                }
                Some(s)
            }
            None => None,
        };

        let role = match self.role.as_deref() {
            // Blank values from frontends must not trigger "Invalid role"
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<Role>()
                    .map_err(|_| EngineError::Validation("Invalid role".into()))?,
            ),
        };

        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => Some(
                raw.parse::<UserStatus>()
                    .map_err(|_| EngineError::Validation("Invalid status".into()))?,
            ),
        };

        let company_id = match self.company_id.as_deref() {
            None => None,
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| EngineError::Validation("Invalid company ID".into()))?,
            ),
        };

        let phone = validate_phone("phone number", self.phone)?;
        let mobile_number = validate_phone("mobile number", self.mobile_number)?;

        let department_id = RefChange::parse("department ID", self.department_id.as_ref())?;
        let manager_id = RefChange::parse("manager ID", self.manager_id.as_ref())?;
        let hod_id = RefChange::parse("HOD ID", self.hod_id.as_ref())?;

        Ok(Changes {
            first_name,
            last_name,
            email,
            role,
            company_id,
            department_id,
            manager_id,
            hod_id,
            phone,
            mobile_number,
            status,
        })
    }
}

fn validate_phone(
    label: &str,
    raw: Option<Option<String>>,
) -> Result<Option<Option<String>>, EngineError> {
    match raw {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Some(None));
            }
            let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
            let shape_ok = trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
            if !shape_ok || !(7..=15).contains(&digits) {
                return Err(EngineError::Validation(format!("Invalid {}", label)));
            }
            Ok(Some(Some(trimmed.to_string())))
        }
    }
}

impl Changes {
    /// The role the user will hold after this update.
    pub fn effective_role(&self, current: Role) -> Role {
        self.role.unwrap_or(current)
    }
}

fn is_plausible_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_body(body: &str) -> Result<Changes, EngineError> {
        let request: UpdateUserRequest = serde_json::from_str(body).unwrap();
        request.validate()
    }

    #[test]
    fn absent_reference_field_is_keep() {
        let changes = parse_body(r#"{"firstName":"Ada"}"#).unwrap();
        assert_eq!(changes.department_id, RefChange::Keep);
        assert_eq!(changes.manager_id, RefChange::Keep);
    }

    #[test]
    fn none_sentinel_and_null_clear_references() {
        let changes =
            parse_body(r#"{"departmentId":"none","managerId":null,"hodId":""}"#).unwrap();
        assert_eq!(changes.department_id, RefChange::Clear);
        assert_eq!(changes.manager_id, RefChange::Clear);
        assert_eq!(changes.hod_id, RefChange::Clear);
    }

    #[test]
    fn uuid_reference_is_set() {
        let id = Uuid::new_v4();
        let changes = parse_body(&format!(r#"{{"managerId":"{}"}}"#, id)).unwrap();
        assert_eq!(changes.manager_id, RefChange::Set(id));
    }

    #[test]
    fn malformed_reference_is_rejected() {
        let err = parse_body(r#"{"departmentId":"not-a-uuid"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn role_is_parsed_case_insensitively_and_blank_is_ignored() {
        let changes = parse_body(r#"{"role":"Department_Head"}"#).unwrap();
        assert_eq!(changes.role, Some(Role::DepartmentHead));

        let changes = parse_body(r#"{"role":""}"#).unwrap();
        assert_eq!(changes.role, None);

        let err = parse_body(r#"{"role":"team_lead"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = parse_body(r#"{"firstName":"  "}"#).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn email_is_normalized_and_checked() {
        let changes = parse_body(r#"{"email":"Ada@Example.COM"}"#).unwrap();
        assert_eq!(changes.email.as_deref(), Some("ada@example.com"));

        let err = parse_body(r#"{"email":"not-an-email"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn empty_phone_clears_and_bad_phone_is_rejected() {
        let changes = parse_body(r#"{"phone":""}"#).unwrap();
        assert_eq!(changes.phone, Some(None));

        let changes = parse_body(r#"{"phone":"+1 (555) 123-4567"}"#).unwrap();
        assert_eq!(changes.phone, Some(Some("+1 (555) 123-4567".to_string())));

        let err = parse_body(r#"{"phone":"call me maybe"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
