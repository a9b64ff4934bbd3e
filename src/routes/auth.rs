use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{
        EmailRequest, ForgotPasswordRequest, LoginForm, ResetPasswordRequest, SignupRequest,
        TokenResponse, UserEnvelope,
    },
    services::{account, auth},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/google/login", get(google_login))
        .route("/google/callback", get(google_callback))
        .route("/signup", post(signup))
        .route("/token", post(login))
        .route("/verify-email", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

async fn google_login(State(state): State<AppState>) -> Redirect {
    Redirect::to(&auth::google_login_url(&state.config))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
}

async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> AppResult<Json<TokenResponse>> {
    let response =
        auth::authenticate_google_user(&state.users, &state.config, &params.code).await?;
    Ok(Json(response))
}

async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let user = account::signup(&state.users, &state.mailer, request).await?;

    Ok(Json(UserEnvelope {
        user,
        message: "User created. Please verify your email.".to_string(),
    }))
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let response =
        auth::authenticate_user(&state.users, &state.config, &form.username, &form.password)
            .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: String,
}

async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<TokenQuery>,
) -> AppResult<Html<&'static str>> {
    auth::verify_email(&state.users, &state.config, &params.token).await?;

    Ok(Html(
        "<html><body><h1>Email verified</h1>\
         <p>Your email address has been verified. You can close this tab and log in.</p>\
         </body></html>",
    ))
}

async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let response =
        auth::resend_verification_email(&state.users, &state.mailer, &request.email).await?;
    Ok(Json(response))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let response = auth::forgot_password(&state.users, &state.mailer, &request.email).await?;
    Ok(Json(response))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let response = auth::reset_password(&state.users, &state.config, request).await?;
    Ok(Json(response))
}
