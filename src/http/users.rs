//! Staff account endpoints

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::app::AppState;
use crate::store::profiles::{NewProfile, Profile, Role};
use crate::validate::{self, ValidationError};

use super::error::AppError;
use super::middleware::AuthenticatedUser;

const GENERATED_PASSWORD_LEN: usize = 16;
const MIN_PASSWORD_LEN: usize = 8;

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    role: Role,
    #[serde(default)]
    password: Option<String>,
}

/// Validated account draft; `generated` is set when the password was made up here
struct AccountDraft {
    email: String,
    full_name: Option<String>,
    role: Role,
    password: String,
    generated: bool,
}

impl CreateUserRequest {
    fn into_draft(self) -> Result<AccountDraft, ValidationError> {
        let email = validate::email("email", &self.email)?;
        let (password, generated) = match self.password {
            Some(password) if password.chars().count() < MIN_PASSWORD_LEN => {
                return Err(ValidationError::new(
                    "password",
                    format!("must be at least {} characters", MIN_PASSWORD_LEN),
                ));
            }
            Some(password) => (password, false),
            None => (generate_password(), true),
        };

        Ok(AccountDraft {
            email,
            full_name: validate::optional_text(self.full_name.as_deref()),
            role: self.role,
            password,
            generated,
        })
    }
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    profile: Profile,
    /// Only present when the server generated the password
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_password: Option<String>,
}

pub async fn create_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AppError> {
    auth.require(Role::Admin)?;
    let draft = req.into_draft()?;

    let user = state
        .auth_admin
        .create_user(&draft.email, &draft.password, draft.full_name.as_deref())
        .await?;

    let profile = state
        .profile_store
        .create_profile(&NewProfile {
            id: user.id,
            full_name: draft.full_name,
            email: draft.email,
            role: draft.role,
        })
        .await
        .map_err(|e| {
            error!(user_id = %user.id, error = %e, "Auth user created but profile insert failed");
            e
        })?;

    info!(
        admin_id = %auth.user_id,
        user_id = %profile.id,
        role = %profile.role,
        "Staff account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            profile,
            temporary_password: draft.generated.then_some(draft.password),
        }),
    ))
}

pub async fn me_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .profile_store
        .get_profile(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> CreateUserRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn generated_passwords_are_alphanumeric() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password());
    }

    #[test]
    fn missing_password_is_generated() {
        let draft = request(json!({ "email": "Line@Bistro.example", "role": "staff" }))
            .into_draft()
            .unwrap();
        assert!(draft.generated);
        assert_eq!(draft.email, "line@bistro.example");
        assert_eq!(draft.role, Role::Staff);
    }

    #[test]
    fn supplied_password_is_kept() {
        let draft = request(json!({
            "email": "sous@bistro.example",
            "role": "manager",
            "full_name": " Sam ",
            "password": "correct-horse"
        }))
        .into_draft()
        .unwrap();
        assert!(!draft.generated);
        assert_eq!(draft.password, "correct-horse");
        assert_eq!(draft.full_name.as_deref(), Some("Sam"));
    }

    #[test]
    fn short_password_and_bad_email_are_rejected() {
        let err = request(json!({ "email": "a@b.example", "role": "staff", "password": "short" }))
            .into_draft()
            .err()
            .expect("draft should be rejected");
        assert_eq!(err.field, "password");

        let err = request(json!({ "email": "nobody", "role": "staff" }))
            .into_draft()
            .err()
            .expect("draft should be rejected");
        assert_eq!(err.field, "email");
    }

    #[test]
    fn unknown_role_fails_to_parse() {
        let parsed = serde_json::from_value::<CreateUserRequest>(json!({
            "email": "a@b.example",
            "role": "owner"
        }));
        assert!(parsed.is_err());
    }
}
