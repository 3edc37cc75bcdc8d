use super::{
    config::Config,
    db_ops::{GetUserQuery, UserStore},
    errors::ApiError,
    models::{AuthPayload, User},
    pw, session,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;
const BAD_CREDENTIALS: &str = "Invalid email or password";

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    })
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{name} is required"))),
    }
}

fn issue_token(
    config: &Config,
    user: User,
    now: DateTime<Utc>,
) -> Result<AuthPayload, ApiError> {
    let token = session::serialize_session(
        &session::Session::new(user.id, now),
        &config.session_secret,
    )
    .map_err(anyhow::Error::from)?;

    Ok(AuthPayload { token, user })
}

pub async fn register(
    users: &dyn UserStore,
    config: &Config,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    now: DateTime<Utc>,
) -> Result<AuthPayload, ApiError> {
    let username = required(username, "Username")?;
    let email = required(email, "Email")?.to_lowercase();
    if username.contains('@') {
        return Err(ApiError::Validation("Username cannot contain @".into()));
    }
    // passwords are taken verbatim; only the emptiness check trims
    let password = password.unwrap_or_default();
    if password.trim().is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }
    if !email_pattern().is_match(&email) {
        return Err(ApiError::Validation("Email is invalid".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
    };
    let digest = pw::hash_blocking(password).await?;
    if !users.create(&user, &digest).await? {
        return Err(ApiError::Conflict(
            "User with that email or username already exists".into(),
        ));
    }
    info!(user = %user.id, "registered user");

    issue_token(config, user, now)
}

/// `identifier` may be either the account's email or its username.
pub async fn authenticate(
    users: &dyn UserStore,
    config: &Config,
    identifier: Option<String>,
    password: Option<String>,
    now: DateTime<Utc>,
) -> Result<AuthPayload, ApiError> {
    let identifier = required(identifier, "Email")?;
    let password = password.unwrap_or_default();
    if password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }

    let bad_credentials = || ApiError::Auth(BAD_CREDENTIALS.into());
    let user = match users
        .get(&GetUserQuery::Email(&identifier.to_lowercase()))
        .await?
    {
        Some(user) => Some(user),
        None => users.get(&GetUserQuery::Username(&identifier)).await?,
    };
    let truth = match &user {
        Some(user) => users.get_password_hash(user.id).await?,
        None => None,
    };

    let (user, truth) = match (user, truth) {
        (Some(user), Some(truth)) => (user, truth),
        _ => {
            let _ = pw::check_dummy(password).await;
            return Err(bad_credentials());
        }
    };

    if pw::check_blocking(password, truth).await.is_ok() {
        issue_token(config, user, now)
    } else {
        warn!(user = %user.id, "failed login");
        Err(bad_credentials())
    }
}

/// Turn a bearer token back into the user it was issued to.
pub async fn resolve_token(
    users: &dyn UserStore,
    config: &Config,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User, ApiError> {
    let session = session::deserialize_session(token, &config.session_secret)
        .map_err(|e| ApiError::Auth(format!("Not authorized, {e}")))?;
    if session.is_expired(now, config.token_ttl) {
        return Err(ApiError::Auth("Not authorized, token expired".into()));
    }

    users
        .get(&GetUserQuery::Id(session.user_id))
        .await?
        .ok_or_else(|| ApiError::Auth("Not authorized, user not found".into()))
}
