use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use tracing::error;
use warp::{
    body::BodyDeserializeError,
    http::{header, HeaderMap, HeaderValue},
    hyper::StatusCode,
    path,
    reject::PayloadTooLarge,
    Filter, Rejection, Reply,
};

use crate::{
    auth::CredentialService,
    case_insensitive_string_ext::CaseInsensitiveStringExt,
    error::AuthError,
    types::{IssuedToken, Username},
};

/// Name of the http-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "auth_token";

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// `POST /signup`, `POST /login` and the `GET /` liveness route.
pub fn build_api_route_filter(
    service: &CredentialService,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let signup = path!("signup")
        .and(warp::post())
        .and(credentials_body())
        .and(with_service(service.clone()))
        .and_then(user_signup);

    let login = path!("login")
        .and(warp::post())
        .and(credentials_body())
        .and(with_service(service.clone()))
        .and_then(user_login);

    let index = warp::path::end()
        .and(warp::get())
        .map(|| "Hello World!");

    index.or(signup).or(login)
}

/// The API routes with error recovery, CORS, security headers and request tracing applied.
pub fn build_server_filter(
    service: &CredentialService,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type", "authorization"]);

    build_api_route_filter(service)
        .recover(handle_auth_errors)
        .with(warp::reply::with::headers(security_headers()))
        .with(cors)
        .with(warp::trace::request())
}

/// Extracts the username of an authenticated caller, from either a bearer token or the
/// session cookie.
pub fn with_session(
    service: &CredentialService,
) -> impl Filter<Extract = (Username,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and(with_service(service.clone()))
        .and_then(session_check)
}

pub async fn handle_auth_errors(err: Rejection) -> Result<impl Reply, Rejection> {
    let (status, message) = if let Some(auth_error) = err.find::<AuthError>() {
        if auth_error.status().is_server_error() {
            error!(error = ?auth_error, "request failed");
        }
        (auth_error.status(), auth_error.public_message())
    } else if err.find::<BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "invalid request body".to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body too large".to_string(),
        )
    } else {
        return Err(err);
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&MessageResponse { message }),
        status,
    ))
}

/// Request body of both `/signup` and `/login`. Absent fields deserialize to `None` so the
/// service can report them as a validation failure.
#[derive(Debug, Deserialize)]
pub struct CredentialsQuery {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsQuery {
    fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

async fn user_signup(
    input: CredentialsQuery,
    service: CredentialService,
) -> Result<impl Reply, Rejection> {
    service.register(input.username(), input.password()).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&MessageResponse {
            message: "User created successfully".into(),
        }),
        StatusCode::CREATED,
    ))
}

async fn user_login(
    input: CredentialsQuery,
    service: CredentialService,
) -> Result<impl Reply, Rejection> {
    let issued = service
        .authenticate(input.username(), input.password())
        .await?;

    let cookie = session_cookie(&issued);

    let body = warp::reply::json(&LoginResponse {
        message: "Login successful".into(),
        token: issued.token,
    });

    Ok(warp::reply::with_header(body, "set-cookie", cookie))
}

async fn session_check(
    authorization: Option<String>,
    cookie: Option<String>,
    service: CredentialService,
) -> Result<Username, Rejection> {
    // a bearer token wins over the cookie; any other authorization scheme is ignored
    let bearer = authorization
        .as_deref()
        .and_then(|value| value.strip_prefix_ignore_ascii_case("bearer "));

    let token = bearer
        .or(cookie.as_deref())
        .ok_or(AuthError::Token { source: None })?;

    Ok(service.verify_session(token)?)
}

fn session_cookie(issued: &IssuedToken) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, issued.token, issued.expires_in
    )
}

fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers
}

fn credentials_body() -> impl Filter<Extract = (CredentialsQuery,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

// functor that adds a handle to the credential service into the filter chain
fn with_service(
    service: CredentialService,
) -> impl Filter<Extract = (CredentialService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}
