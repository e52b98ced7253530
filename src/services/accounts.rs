//! Account registration, login, email verification and password reset

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{non_blank, Notifier, WorkflowConfig};
use crate::auth::{PasswordHasher, TokenIssuer};
use crate::domain::auth::{LoginResponse, RegisterRequest};
use crate::domain::{
    is_valid_email, normalize_email, BusinessDetails, DocumentStatus, IndividualDetails, Profile,
    ProfileDetails, User, UserResponse, UserType,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Store, UserUpdate};

pub(crate) fn hash_password(hasher: &PasswordHasher, password: &str) -> ServiceResult<String> {
    hasher
        .hash(password)
        .map_err(|e| ServiceError::Crypto(e.to_string()))
}

pub(crate) fn check_password_policy(config: &WorkflowConfig, password: &str) -> ServiceResult<()> {
    if password.chars().count() < config.password_min_length {
        return Err(ServiceError::validation(format!(
            "Password must be at least {} characters",
            config.password_min_length
        )));
    }
    Ok(())
}

pub(crate) fn checked_email(email: &str) -> ServiceResult<String> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ServiceError::validation("A valid email is required"));
    }
    Ok(email)
}

fn reset_code_digest(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create a non-admin account with its profile and send the verification
/// email.
pub async fn register(
    store: &dyn Store,
    hasher: &PasswordHasher,
    notifier: &Notifier,
    config: &WorkflowConfig,
    req: RegisterRequest,
) -> ServiceResult<(User, Profile)> {
    let email = checked_email(&req.email)?;
    check_password_policy(config, &req.password)?;
    let phone = non_blank(Some(req.phone.as_str()))
        .ok_or_else(|| ServiceError::validation("Phone number is required"))?;

    let details = match req.user_type {
        UserType::Individual => {
            let full_name = non_blank(req.full_name.as_deref())
                .ok_or_else(|| ServiceError::validation("Full name is required"))?;
            ProfileDetails::Individual(IndividualDetails {
                full_name,
                personal_email: Some(email.clone()),
                ..Default::default()
            })
        }
        UserType::Business => {
            let company_name = non_blank(req.company_name.as_deref())
                .ok_or_else(|| ServiceError::validation("Company name is required"))?;
            ProfileDetails::Business(BusinessDetails {
                company_name,
                company_email: Some(email.clone()),
                contact_person_name: non_blank(req.contact_person_name.as_deref()),
                ..Default::default()
            })
        }
        UserType::Admin => {
            return Err(ServiceError::validation(
                "Admin accounts cannot be self-registered",
            ))
        }
    };

    let now = Utc::now();
    let token = Uuid::new_v4().to_string();
    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(hasher, &req.password)?,
        user_type: req.user_type,
        admin_type: None,
        is_verified: false,
        document_status: DocumentStatus::Pending,
        document_rejection_reason: None,
        permissions: Default::default(),
        verification_token: Some(token.clone()),
        verification_token_expires: Some(now + config.verification_token_ttl),
        reset_code_hash: None,
        reset_code_expires: None,
        created_at: now,
        updated_at: now,
    };
    let profile = Profile::new(user.id, phone, details);

    store.create_account(&user, &profile).await?;
    tracing::info!(user_id = %user.id, user_type = %user.user_type, "User registered");

    notifier.send_verification(&user.email, &token).await;
    Ok((user, profile))
}

/// Exchange credentials for a bearer token.
pub async fn login(
    store: &dyn Store,
    hasher: &PasswordHasher,
    tokens: &TokenIssuer,
    email: &str,
    password: &str,
) -> ServiceResult<LoginResponse> {
    let email = normalize_email(email);
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(ServiceError::InvalidCredentials)?;

    let matches = hasher
        .verify(password, &user.password_hash)
        .map_err(|e| ServiceError::Crypto(e.to_string()))?;
    if !matches {
        tracing::warn!(user_id = %user.id, "Login failed");
        return Err(ServiceError::InvalidCredentials);
    }
    if !user.is_verified && !user.is_admin() {
        return Err(ServiceError::EmailNotVerified);
    }

    let issued = tokens
        .issue(&user)
        .map_err(|e| ServiceError::Crypto(e.to_string()))?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        user: UserResponse::from(&user),
    })
}

pub async fn verify_email(store: &dyn Store, token: &str) -> ServiceResult<User> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ServiceError::InvalidToken);
    }
    let user = store
        .find_user_by_verification_token(token)
        .await?
        .ok_or(ServiceError::InvalidToken)?;

    let expired = user.verification_token_expires.map_or(true, |exp| exp < Utc::now());
    if expired {
        return Err(ServiceError::InvalidToken);
    }

    let user = store.update_user(user.id, &UserUpdate::EmailVerified).await?;

    tracing::info!(user_id = %user.id, "Email verified");
    Ok(user)
}

pub async fn resend_verification(
    store: &dyn Store,
    notifier: &Notifier,
    config: &WorkflowConfig,
    email: &str,
) -> ServiceResult<()> {
    let email = normalize_email(email);
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    if user.is_verified {
        return Err(ServiceError::AlreadyVerified);
    }

    let token = Uuid::new_v4().to_string();
    let change = UserUpdate::VerificationToken {
        token: token.clone(),
        expires: Utc::now() + config.verification_token_ttl,
    };
    store.update_user(user.id, &change).await?;

    tracing::info!(user_id = %user.id, "Verification token rotated");
    notifier.send_verification(&user.email, &token).await;
    Ok(())
}

/// Issue a reset code. Unknown addresses succeed without doing anything so
/// the endpoint cannot be used to probe for accounts.
pub async fn forgot_password(
    store: &dyn Store,
    notifier: &Notifier,
    config: &WorkflowConfig,
    email: &str,
) -> ServiceResult<()> {
    let email = normalize_email(email);
    let Some(user) = store.find_user_by_email(&email).await? else {
        tracing::info!("Password reset requested for unknown email");
        return Ok(());
    };

    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
    let change = UserUpdate::ResetCode {
        hash: reset_code_digest(&code),
        expires: Utc::now() + config.password_reset_ttl,
    };
    store.update_user(user.id, &change).await?;

    tracing::info!(user_id = %user.id, "Password reset code issued");
    notifier
        .send_password_reset_code(&user.email, &code, config.password_reset_ttl.num_minutes())
        .await;
    Ok(())
}

async fn user_with_valid_code(store: &dyn Store, email: &str, code: &str) -> ServiceResult<User> {
    let email = normalize_email(email);
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(ServiceError::InvalidToken)?;

    let unexpired = user.reset_code_expires.is_some_and(|exp| exp >= Utc::now());
    let matches = user.reset_code_hash.as_deref() == Some(reset_code_digest(code).as_str());
    if !(unexpired && matches) {
        return Err(ServiceError::InvalidToken);
    }
    Ok(user)
}

pub async fn verify_reset_code(store: &dyn Store, email: &str, code: &str) -> ServiceResult<()> {
    user_with_valid_code(store, email, code).await.map(|_| ())
}

pub async fn reset_password(
    store: &dyn Store,
    hasher: &PasswordHasher,
    config: &WorkflowConfig,
    email: &str,
    code: &str,
    new_password: &str,
) -> ServiceResult<()> {
    let user = user_with_valid_code(store, email, code).await?;
    check_password_policy(config, new_password)?;

    let change = UserUpdate::Password(hash_password(hasher, new_password)?);
    store.update_user(user.id, &change).await?;

    tracing::info!(user_id = %user.id, "Password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::MockEmailSender;
    use crate::services::testing;
    use std::sync::{Arc, Mutex};

    fn individual_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "correct-horse".into(),
            phone: "+97455501234".into(),
            user_type: UserType::Individual,
            full_name: Some("Mariam Al-Thani".into()),
            company_name: None,
            contact_person_name: None,
        }
    }

    /// Notifier whose sender records every HTML body it is given.
    fn capturing_notifier() -> (Notifier, Arc<Mutex<Vec<String>>>) {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let sink = bodies.clone();
        let mut sender = MockEmailSender::new();
        sender.expect_send_email().returning(move |_, _, body| {
            sink.lock().unwrap().push(body.to_string());
            Ok(())
        });
        (Notifier::new(Arc::new(sender), "http://localhost"), bodies)
    }

    #[tokio::test]
    async fn register_then_verify_then_login() {
        let store = testing::store();
        let hasher = testing::hasher();
        let tokens = TokenIssuer::new("secret", "tenderhub", 3600);

        let (user, profile) = register(
            &store,
            &hasher,
            &testing::notifier(),
            &testing::config(),
            individual_request("New.User@Example.com"),
        )
        .await
        .unwrap();
        assert_eq!(user.email, "new.user@example.com");
        assert_eq!(profile.details.user_type(), UserType::Individual);

        let err = login(&store, &hasher, &tokens, "new.user@example.com", "correct-horse")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailNotVerified));

        let token = user.verification_token.clone().unwrap();
        let verified = verify_email(&store, &token).await.unwrap();
        assert!(verified.is_verified);
        assert!(verified.verification_token.is_none());

        let response = login(&store, &hasher, &tokens, "NEW.USER@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(response.user.id, user.id);
        assert_eq!(response.token_type, "Bearer");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = testing::store();
        let hasher = testing::hasher();
        let notifier = testing::notifier();
        let config = testing::config();
        register(&store, &hasher, &notifier, &config, individual_request("dup@example.com"))
            .await
            .unwrap();
        let err = register(&store, &hasher, &notifier, &config, individual_request("DUP@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken));
    }

    #[tokio::test]
    async fn registration_requires_type_fields() {
        let store = testing::store();
        let mut req = individual_request("biz@example.com");
        req.user_type = UserType::Business;
        let err = register(&store, &testing::hasher(), &testing::notifier(), &testing::config(), req)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("Company name")));

        let mut req = individual_request("root@example.com");
        req.user_type = UserType::Admin;
        let err = register(&store, &testing::hasher(), &testing::notifier(), &testing::config(), req)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let store = testing::store();
        let hasher = testing::hasher();
        let tokens = TokenIssuer::new("secret", "tenderhub", 3600);
        let err = login(&store, &hasher, &tokens, "nobody@example.com", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn expired_verification_token_is_rejected() {
        let store = testing::store();
        let user = testing::individual(&store, DocumentStatus::Pending).await;
        let change = UserUpdate::VerificationToken {
            token: "stale".into(),
            expires: Utc::now() - chrono::Duration::minutes(1),
        };
        store.update_user(user.id, &change).await.unwrap();

        let err = verify_email(&store, "stale").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken));
    }

    #[tokio::test]
    async fn resend_on_verified_account_conflicts() {
        let store = testing::store();
        let user = testing::individual(&store, DocumentStatus::Pending).await;
        let err = resend_verification(&store, &testing::notifier(), &testing::config(), &user.email)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyVerified));
    }

    #[tokio::test]
    async fn password_reset_flow() {
        let store = testing::store();
        let hasher = testing::hasher();
        let config = testing::config();
        let user = testing::individual(&store, DocumentStatus::Pending).await;
        let change = UserUpdate::Password(hasher.hash("old-password").unwrap());
        let user = store.update_user(user.id, &change).await.unwrap();

        let (notifier, bodies) = capturing_notifier();
        forgot_password(&store, &notifier, &config, &user.email).await.unwrap();

        let body = bodies.lock().unwrap().pop().unwrap();
        let code: String = body
            .split("<strong>")
            .nth(1)
            .and_then(|rest| rest.split("</strong>").next())
            .unwrap()
            .to_string();
        assert_eq!(code.len(), 6);

        let err = verify_reset_code(&store, &user.email, "not-it").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken));
        verify_reset_code(&store, &user.email, &code).await.unwrap();

        reset_password(&store, &hasher, &config, &user.email, &code, "new-password")
            .await
            .unwrap();
        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert!(hasher.verify("new-password", &stored.password_hash).unwrap());
        assert!(stored.reset_code_hash.is_none());

        // Codes are single use
        let err = verify_reset_code(&store, &user.email, &code).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_succeeds() {
        let store = testing::store();
        let mut sender = MockEmailSender::new();
        sender.expect_send_email().times(0);
        let notifier = Notifier::new(Arc::new(sender), "http://localhost");
        forgot_password(&store, &notifier, &testing::config(), "ghost@example.com")
            .await
            .unwrap();
    }
}
