//! Login and registration against the VocalxLocal backend.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use crate::capabilities::{HttpClient, HttpError, HttpRequest, HttpResponse, ValidatedUrl};
use crate::{ApiErrorResponse, AppError, ErrorKind, DEFAULT_REQUEST_TIMEOUT};

pub const LOGIN_PATH: &str = "/api/login";
pub const REGISTER_PATH: &str = "/api/register";

pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields";
const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your credentials.";
const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";
const REGISTRATION_SUCCEEDED_MESSAGE: &str = "Registration successful";
const NETWORK_MESSAGE: &str = "Network error. Please check your connection and server URL.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("required fields are missing")]
    MissingFields,

    #[error("password and confirmation do not match")]
    PasswordMismatch,

    #[error("login rejected: {message}")]
    InvalidCredentials { message: String },

    #[error("registration rejected: {message}")]
    RegistrationRejected { message: String },

    #[error("malformed auth response: {reason}")]
    MalformedResponse { reason: String },

    #[error("auth request timed out")]
    Timeout,

    #[error("network error: {message}")]
    Network { message: String },
}

impl AuthError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingFields => MISSING_FIELDS_MESSAGE.to_string(),
            Self::PasswordMismatch => "Passwords do not match".to_string(),
            Self::InvalidCredentials { message } | Self::RegistrationRejected { message } => {
                message.clone()
            }
            Self::MalformedResponse { .. } | Self::Timeout | Self::Network { .. } => {
                NETWORK_MESSAGE.to_string()
            }
        }
    }
}

impl From<HttpError> for AuthError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout { .. } => Self::Timeout,
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let kind = match &e {
            AuthError::MissingFields | AuthError::PasswordMismatch => ErrorKind::Validation,
            AuthError::InvalidCredentials { .. } => ErrorKind::Authentication,
            AuthError::RegistrationRejected { .. } => ErrorKind::Conflict,
            AuthError::MalformedResponse { .. } => ErrorKind::Deserialization,
            AuthError::Timeout => ErrorKind::Timeout,
            AuthError::Network { .. } => ErrorKind::Network,
        };
        AppError::new(kind, e.user_message()).with_internal(e.to_string())
    }
}

fn required(value: &str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingFields);
    }
    Ok(trimmed.to_string())
}

fn required_secret(value: SecretString) -> Result<SecretString, AuthError> {
    if value.expose_secret().is_empty() {
        return Err(AuthError::MissingFields);
    }
    Ok(value)
}

#[derive(Clone)]
pub struct LoginCredentials {
    email: String,
    password: SecretString,
}

impl LoginCredentials {
    pub fn new(email: &str, password: SecretString) -> Result<Self, AuthError> {
        Ok(Self {
            email: required(email)?,
            password: required_secret(password)?,
        })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct Registration {
    user_name: String,
    email: String,
    password: SecretString,
    confirm_password: SecretString,
}

impl Registration {
    pub fn new(
        user_name: &str,
        email: &str,
        password: SecretString,
        confirm_password: SecretString,
    ) -> Result<Self, AuthError> {
        let registration = Self {
            user_name: required(user_name)?,
            email: required(email)?,
            password: required_secret(password)?,
            confirm_password: required_secret(confirm_password)?,
        };
        if registration.password.expose_secret() != registration.confirm_password.expose_secret()
        {
            return Err(AuthError::PasswordMismatch);
        }
        Ok(registration)
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("user_name_len", &self.user_name.len())
            .field("email", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "username")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Signed-in session. The token is only reachable through
/// [`AuthSession::token`].
#[derive(Clone)]
pub struct AuthSession {
    token: SecretString,
    user: Option<UserProfile>,
}

impl AuthSession {
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("has_user", &self.user.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub message: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    user_name: &'a str,
    email: &'a str,
    password: &'a str,
    confirm_password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    existing_user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    message: Option<String>,
}

pub struct AuthClient<C> {
    client: C,
    login_url: ValidatedUrl,
    register_url: ValidatedUrl,
    timeout: Duration,
}

impl<C: HttpClient> AuthClient<C> {
    pub fn new(client: C, server_url: &ValidatedUrl) -> Result<Self, HttpError> {
        Ok(Self {
            client,
            login_url: server_url.join(LOGIN_PATH)?,
            register_url: server_url.join(REGISTER_PATH)?,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        let body = LoginBody {
            email: &credentials.email,
            password: credentials.password.expose_secret(),
        };
        let response = self.post(&self.login_url, &body).await?;

        if response.status() != 200 {
            tracing::info!(status = response.status(), "login rejected");
            return Err(AuthError::InvalidCredentials {
                message: Self::server_message(&response, LOGIN_FAILED_MESSAGE),
            });
        }

        let parsed: LoginResponse = response.json().map_err(|e| AuthError::MalformedResponse {
            reason: e.to_string(),
        })?;
        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse {
                reason: "response has no token".to_string(),
            })?;

        tracing::info!("login succeeded");
        Ok(AuthSession {
            token: SecretString::new(token),
            user: parsed.user.or(parsed.existing_user),
        })
    }

    #[instrument(skip_all)]
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<RegistrationReceipt, AuthError> {
        let body = RegisterBody {
            user_name: &registration.user_name,
            email: &registration.email,
            password: registration.password.expose_secret(),
            confirm_password: registration.confirm_password.expose_secret(),
        };
        let response = self.post(&self.register_url, &body).await?;

        if response.status() != 201 {
            tracing::info!(status = response.status(), "registration rejected");
            return Err(AuthError::RegistrationRejected {
                message: Self::server_message(&response, REGISTRATION_FAILED_MESSAGE),
            });
        }

        let message = response
            .json::<RegisterResponse>()
            .ok()
            .and_then(|r| r.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| REGISTRATION_SUCCEEDED_MESSAGE.to_string());
        Ok(RegistrationReceipt { message })
    }

    async fn post<T: Serialize>(
        &self,
        url: &ValidatedUrl,
        body: &T,
    ) -> Result<HttpResponse, AuthError> {
        let request = HttpRequest::post(url.clone())
            .with_timeout(self.timeout)?
            .with_json(body)?;
        self.client.send(request).await.map_err(|e| {
            tracing::warn!(error = %e, "auth request failed");
            AuthError::from(e)
        })
    }

    fn server_message(response: &HttpResponse, fallback: &str) -> String {
        ApiErrorResponse::message_from_body(response.body()).unwrap_or_else(|| fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{HttpHeaders, HttpResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        status: u16,
        body: &'static str,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for Canned {
        async fn send(&self, request: HttpRequest) -> HttpResult {
            let id = request.request_id().to_string();
            self.sent.lock().unwrap().push(request);
            Ok(HttpResponse::new(
                self.status,
                HttpHeaders::new(),
                self.body.as_bytes().to_vec(),
                id,
                1,
            ))
        }
    }

    struct Offline;

    #[async_trait]
    impl HttpClient for Offline {
        async fn send(&self, _request: HttpRequest) -> HttpResult {
            Err(HttpError::Connection {
                host: "localhost".into(),
                message: "connection refused".into(),
            })
        }
    }

    fn secret(s: &str) -> SecretString {
        SecretString::new(s.to_string())
    }

    fn server() -> ValidatedUrl {
        ValidatedUrl::new("http://192.168.1.20:4000").unwrap()
    }

    fn credentials() -> LoginCredentials {
        LoginCredentials::new(" asha@example.org ", secret("hunter2")).unwrap()
    }

    mod input_tests {
        use super::*;

        #[test]
        fn test_login_requires_all_fields() {
            assert_eq!(
                LoginCredentials::new("  ", secret("x")).unwrap_err(),
                AuthError::MissingFields
            );
            assert_eq!(
                LoginCredentials::new("a@b.c", secret("")).unwrap_err(),
                AuthError::MissingFields
            );
            assert_eq!(credentials().email(), "asha@example.org");
            assert_eq!(AuthError::MissingFields.user_message(), "Please fill in all fields");
        }

        #[test]
        fn test_registration_checks_confirmation() {
            let err = Registration::new("asha", "a@b.c", secret("one"), secret("two")).unwrap_err();
            assert_eq!(err, AuthError::PasswordMismatch);

            let err = Registration::new("", "a@b.c", secret("one"), secret("one")).unwrap_err();
            assert_eq!(err, AuthError::MissingFields);
        }

        #[test]
        fn test_debug_never_shows_secrets() {
            let debug = format!("{:?}", credentials());
            assert!(!debug.contains("hunter2"));
            assert!(!debug.contains("asha"));
        }
    }

    mod login_tests {
        use super::*;

        #[tokio::test]
        async fn test_login_reads_token_and_user() {
            let client = AuthClient::new(
                Canned::new(200, r#"{"token":"jwt-1","user":{"_id":"u1","userName":"asha"}}"#),
                &server(),
            )
            .unwrap();

            let session = client.login(&credentials()).await.unwrap();
            assert_eq!(session.token().expose_secret(), "jwt-1");
            assert_eq!(session.user().unwrap().user_name.as_deref(), Some("asha"));
            assert!(!format!("{session:?}").contains("jwt-1"));

            let sent = client.client.sent.lock().unwrap();
            assert_eq!(sent[0].url().as_str(), "http://192.168.1.20:4000/api/login");
            let body: serde_json::Value = serde_json::from_slice(sent[0].body().unwrap()).unwrap();
            assert_eq!(body["email"], "asha@example.org");
            assert!(sent[0].headers().get("authorization").is_none());
        }

        #[tokio::test]
        async fn test_login_accepts_existing_user_field() {
            let client = AuthClient::new(
                Canned::new(200, r#"{"token":"jwt-2","existingUser":{"email":"a@b.c"}}"#),
                &server(),
            )
            .unwrap();
            let session = client.login(&credentials()).await.unwrap();
            assert_eq!(session.user().unwrap().email.as_deref(), Some("a@b.c"));
        }

        #[tokio::test]
        async fn test_login_failure_message_precedence() {
            let client = AuthClient::new(
                Canned::new(401, r#"{"error":"Invalid email or password"}"#),
                &server(),
            )
            .unwrap();
            let err = client.login(&credentials()).await.unwrap_err();
            assert_eq!(err.user_message(), "Invalid email or password");

            let client = AuthClient::new(Canned::new(500, "oops"), &server()).unwrap();
            let err = client.login(&credentials()).await.unwrap_err();
            assert_eq!(err.user_message(), LOGIN_FAILED_MESSAGE);
            assert_eq!(AppError::from(err).kind, ErrorKind::Authentication);
        }

        #[tokio::test]
        async fn test_missing_token_is_malformed() {
            let client = AuthClient::new(Canned::new(200, r#"{"user":{}}"#), &server()).unwrap();
            assert!(matches!(
                client.login(&credentials()).await,
                Err(AuthError::MalformedResponse { .. })
            ));
        }

        #[tokio::test]
        async fn test_network_failure() {
            let client = AuthClient::new(Offline, &server()).unwrap();
            let err = client.login(&credentials()).await.unwrap_err();
            assert!(matches!(err, AuthError::Network { .. }));
            assert_eq!(err.user_message(), NETWORK_MESSAGE);
        }
    }

    mod register_tests {
        use super::*;

        fn registration() -> Registration {
            Registration::new("asha", "asha@example.org", secret("pw"), secret("pw")).unwrap()
        }

        #[tokio::test]
        async fn test_register_created() {
            let client = AuthClient::new(
                Canned::new(201, r#"{"message":"User registered successfully"}"#),
                &server(),
            )
            .unwrap();
            let receipt = client.register(&registration()).await.unwrap();
            assert_eq!(receipt.message, "User registered successfully");

            let sent = client.client.sent.lock().unwrap();
            let body: serde_json::Value = serde_json::from_slice(sent[0].body().unwrap()).unwrap();
            assert_eq!(body["userName"], "asha");
            assert_eq!(body["confirmPassword"], "pw");
        }

        #[tokio::test]
        async fn test_register_only_201_is_success() {
            let client = AuthClient::new(
                Canned::new(200, r#"{"message":"Account already exists"}"#),
                &server(),
            )
            .unwrap();
            let err = client.register(&registration()).await.unwrap_err();
            assert_eq!(
                err,
                AuthError::RegistrationRejected {
                    message: "Account already exists".into()
                }
            );
        }
    }
}
