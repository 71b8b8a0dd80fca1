//! Account, session and profile handlers

use auth::{
    ONE_TIME_TOKEN_TTL, OneTimeToken, hash_token,
    validation::{validate_email, validate_password, validate_required, validate_username},
};
use axum::{
    Extension,
    extract::{Path, State},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use common::store::{Document, Update};
use media::MediaKind;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::discard_media;
use crate::{
    error::{ApiError, ApiResult, FieldErrors},
    extract::{AppJson, MultipartForm},
    mail::{password_reset_email, verification_email},
    middleware::{ACCESS_TOKEN_COOKIE, CurrentUser, REFRESH_TOKEN_COOKIE},
    models::{PublicUser, User},
    read_models::channels,
    response::ApiResponse,
    session::SessionTokens,
    state::AppState,
};

fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

fn with_session_cookies(jar: CookieJar, tokens: &SessionTokens, secure: bool) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        secure,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        secure,
    ))
}

fn normalize_login(value: &str) -> String {
    value.trim().to_lowercase()
}

async fn lookup_account(state: &AppState, username_or_email: &str) -> ApiResult<Option<User>> {
    Ok(state
        .repos
        .users
        .find_by_username_or_email(&normalize_login(username_or_email))
        .await?)
}

const UNKNOWN_ACCOUNT: &str = "User with username or email does not exists";

fn verification_link(state: &AppState, token: &str) -> String {
    format!(
        "{}/api/v1/users/verify-email/{}",
        state.config.public_base_url, token
    )
}

/// Register a new account and send the verification email
pub async fn register(
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> ApiResult<ApiResponse<PublicUser>> {
    let fullname = form.text("fullname");
    let username = form.text("username");
    let email = form.text("email").to_lowercase();
    let password = form.text("password");

    let mut errors = FieldErrors::new();
    errors.check("fullname", validate_required("fullname", &fullname));
    errors.check("username", validate_username(&username));
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(&password));
    errors.finish()?;

    let avatar = form
        .take_file("avatar")
        .ok_or_else(|| ApiError::BadRequest("Avatar file is required".to_string()))?;
    let cover_image = form.take_file("coverImage");

    if state
        .repos
        .users
        .username_or_email_taken(&username, &email)
        .await?
    {
        return Err(ApiError::Conflict(
            "User with username or email already exists".to_string(),
        ));
    }

    let avatar = state
        .media
        .upload(avatar.into_upload(MediaKind::Image))
        .await?;
    let cover_image = match cover_image {
        Some(file) => Some(state.media.upload(file.into_upload(MediaKind::Image)).await?.url),
        None => None,
    };

    let password = state.hasher.hash(&password).await?;
    let verification = OneTimeToken::generate(ONE_TIME_TOKEN_TTL);

    let mut user = User::new(username, email, fullname, avatar.url, cover_image, password);
    user.email_verification_token = Some(verification.hashed.clone());
    user.email_verification_expiry = Some(verification.expires_at);
    let user = state.repos.users.create(&user).await?;

    let link = verification_link(&state, &verification.plain);
    state
        .mailer
        .send(verification_email(&user.email, &user.username, &link))
        .await?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(ApiResponse::created(
        user.into(),
        "User registered successfully and verification email has been sent on user's email",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username_or_email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<LoginResponse>)> {
    let mut errors = FieldErrors::new();
    errors.check(
        "usernameOrEmail",
        validate_required("usernameOrEmail", &payload.username_or_email),
    );
    errors.check("password", validate_required("password", &payload.password));
    errors.finish()?;

    let user = state
        .repos
        .users
        .find_by_username_or_email(&normalize_login(&payload.username_or_email))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("User with username or email does not exists".to_string())
        })?;

    if !user.is_email_verified {
        return Err(ApiError::Forbidden(
            "Email is not verified. Please verify your email first".to_string(),
        ));
    }

    if !user.password.verify(&payload.password).await? {
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    let tokens = state.sessions.issue(&user).await?;
    let jar = with_session_cookies(jar, &tokens, state.config.cookie_secure);

    info!("User {} logged in", user.id);
    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: user.into(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let user = state
        .repos
        .users
        .find_by_verification_token(&hash_token(token.trim()))
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("Verification token is invalid or expired".to_string())
        })?;

    state
        .repos
        .users
        .update(
            user.id,
            &[
                Update::set("isEmailVerified", true),
                Update::Unset("emailVerificationToken".to_string()),
                Update::Unset("emailVerificationExpiry".to_string()),
            ],
        )
        .await?;

    info!("Verified email of user {}", user.id);
    Ok(ApiResponse::ok(
        json!({"isEmailVerified": true, "message": "Email is verified"}),
        "Email verified successfully",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLookup {
    #[serde(default)]
    pub username_or_email: String,
}

impl AccountLookup {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        errors.check(
            "usernameOrEmail",
            validate_required("usernameOrEmail", &self.username_or_email),
        );
        errors.finish()
    }
}

pub async fn resend_verification(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AccountLookup>,
) -> ApiResult<ApiResponse<Value>> {
    payload.validate()?;
    let user = lookup_account(&state, &payload.username_or_email)
        .await?
        .ok_or_else(|| ApiError::NotFound(UNKNOWN_ACCOUNT.to_string()))?;

    if user.is_email_verified {
        return Err(ApiError::Conflict("Email is already verified".to_string()));
    }

    let verification = OneTimeToken::generate(ONE_TIME_TOKEN_TTL);
    state
        .repos
        .users
        .update(
            user.id,
            &[
                Update::set("emailVerificationToken", verification.hashed.clone()),
                Update::set("emailVerificationExpiry", verification.expires_at),
            ],
        )
        .await?;

    let link = verification_link(&state, &verification.plain);
    state
        .mailer
        .send(verification_email(&user.email, &user.username, &link))
        .await?;

    Ok(ApiResponse::ok(
        json!({"message": "Email verification mail send successfully"}),
        "Mail has been sent to your email Id",
    ))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AccountLookup>,
) -> ApiResult<ApiResponse<Value>> {
    payload.validate()?;
    // An unknown account is a bad request here, unlike resend-verification
    let user = lookup_account(&state, &payload.username_or_email)
        .await?
        .ok_or_else(|| ApiError::BadRequest(UNKNOWN_ACCOUNT.to_string()))?;

    let reset = OneTimeToken::generate(ONE_TIME_TOKEN_TTL);
    state
        .repos
        .users
        .update(
            user.id,
            &[
                Update::set("forgotPasswordToken", reset.hashed.clone()),
                Update::set("forgotPasswordExpiry", reset.expires_at),
            ],
        )
        .await?;

    let link = format!(
        "{}/{}",
        state.config.forgot_password_redirect_url, reset.plain
    );
    state
        .mailer
        .send(password_reset_email(&user.email, &user.username, &link))
        .await?;

    info!("Password reset requested for user {}", user.id);
    Ok(ApiResponse::ok(
        json!({"message": "Password reset mail send successfully"}),
        "Mail has been sent to your email Id",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let mut errors = FieldErrors::new();
    errors.check("newPassword", validate_password(&payload.new_password));
    errors.finish()?;

    let user = state
        .repos
        .users
        .find_by_reset_token(&hash_token(token.trim()))
        .await?
        .ok_or_else(|| ApiError::NotFound("Reset token is invalid or expired".to_string()))?;

    let password = state.hasher.hash(&payload.new_password).await?;
    state
        .repos
        .users
        .update(
            user.id,
            &[
                Update::set("password", password.as_str()),
                Update::Unset("forgotPasswordToken".to_string()),
                Update::Unset("forgotPasswordExpiry".to_string()),
            ],
        )
        .await?;
    state.sessions.revoke(user.id).await?;

    info!("Password reset for user {}", user.id);
    Ok(ApiResponse::ok(json!({}), "Password reset successfully"))
}

pub async fn current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user, "Current user fetched successfully")
}

pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<Document>> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::invalid("username", "Username is missing"));
    }

    let profile = channels::profile(state.store.as_ref(), &username, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exists".to_string()))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

pub async fn watch_history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ApiResponse<Vec<Value>>> {
    let history = channels::watch_history(state.store.as_ref(), user.id()).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Rotate the session; the token comes from the cookie or the JSON body
pub async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<AppJson<RefreshRequest>>,
) -> ApiResult<(CookieJar, ApiResponse<RefreshResponse>)> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|AppJson(body)| body.refresh_token))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(ApiError::unauthorized)?;

    let (_, tokens) = state.sessions.rotate(&presented).await?;
    let jar = with_session_cookies(jar, &tokens, state.config.cookie_secure);

    Ok((
        jar,
        ApiResponse::ok(
            RefreshResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let mut errors = FieldErrors::new();
    errors.check(
        "oldPassword",
        validate_required("oldPassword", &payload.old_password),
    );
    errors.check("newPassword", validate_password(&payload.new_password));
    errors.finish()?;

    let user = state
        .repos
        .users
        .find_by_id(current.id())
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    if !user.password.verify(&payload.old_password).await? {
        return Err(ApiError::BadRequest("Incorrect old password".to_string()));
    }

    let password = state.hasher.hash(&payload.new_password).await?;
    state
        .repos
        .users
        .update(user.id, &[Update::set("password", password.as_str())])
        .await?;

    info!("Password changed for user {}", user.id);
    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// Upload a new profile image into `field`, then drop the previous one
async fn replace_profile_image(
    state: &AppState,
    current: &CurrentUser,
    form: &mut MultipartForm,
    form_field: &str,
    missing_message: &str,
) -> ApiResult<PublicUser> {
    let file = form
        .take_file(form_field)
        .ok_or_else(|| ApiError::BadRequest(missing_message.to_string()))?;

    let stored = state.media.upload(file.into_upload(MediaKind::Image)).await?;
    let previous = match form_field {
        "avatar" => Some(current.0.avatar.clone()),
        _ => current.0.cover_image.clone(),
    };

    let user = state
        .repos
        .users
        .update(current.id(), &[Update::set(form_field, stored.url)])
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    if let Some(previous) = previous {
        discard_media(state, &previous).await;
    }
    Ok(user.into())
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut form: MultipartForm,
) -> ApiResult<ApiResponse<PublicUser>> {
    let user =
        replace_profile_image(&state, &current, &mut form, "avatar", "Avatar file is required")
            .await?;
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut form: MultipartForm,
) -> ApiResult<ApiResponse<PublicUser>> {
    let user = replace_profile_image(
        &state,
        &current,
        &mut form,
        "coverImage",
        "Cover image file is required",
    )
    .await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub fullname: Option<String>,
    pub username: Option<String>,
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<UpdateAccountRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let fullname = payload
        .fullname
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let username = payload
        .username
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    if fullname.is_none() && username.is_none() {
        return Err(ApiError::invalid(
            "fullname",
            "Either fullname or username is required",
        ));
    }

    let mut updates = Vec::new();
    if let Some(username) = username {
        validate_username(&username).map_err(|message| ApiError::invalid("username", message))?;
        if let Some(existing) = state.repos.users.find_by_username(&username).await? {
            if existing.id != current.id() {
                return Err(ApiError::Conflict("Username is already taken".to_string()));
            }
        }
        updates.push(Update::set("username", username));
    }
    if let Some(fullname) = fullname {
        updates.push(Update::set("fullname", fullname));
    }

    let user = state
        .repos
        .users
        .update(current.id(), &updates)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    Ok(ApiResponse::ok(
        user.into(),
        "Account details updated successfully",
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<Value>)> {
    state.sessions.revoke(current.id()).await?;

    let jar = jar
        .remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"));

    info!("User {} logged out", current.id());
    Ok((jar, ApiResponse::ok(json!({}), "User logged out successfully")))
}
