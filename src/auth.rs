//! Email/password and social sign-in against the Firebase Identity Toolkit.
//!
//! Form validation happens locally before any request is sent. Provider
//! error codes, both the JS SDK style (`auth/wrong-password`) and the REST
//! style (`INVALID_PASSWORD`), are mapped to a closed set of kinds with fixed
//! user-facing messages.

use config::ConfigError;
use log::{debug, error, info};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::config::FirebaseConfig;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}$";
const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// The user action an auth error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    SignIn,
    SignUp,
    Google,
    Facebook,
}

impl AuthFlow {
    /// Message shown when the error kind has no specific message
    pub fn fallback_message(&self) -> &'static str {
        match self {
            AuthFlow::SignIn => "Login failed. Please try again.",
            AuthFlow::SignUp => "Signup failed. Please try again.",
            AuthFlow::Google => "Google sign in failed. Please try again.",
            AuthFlow::Facebook => "Facebook sign in failed. Please try again.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Local form validation failed
    Validation(String),
    InvalidEmail,
    UserDisabled,
    UserNotFound,
    WrongPassword,
    InvalidCredentials,
    EmailAlreadyInUse,
    OperationNotAllowed,
    WeakPassword,
    TooManyAttempts,
    PopupClosed,
    PopupBlocked,
    PopupCancelled,
    /// The identity provider could not be reached
    Network,
    /// Unmapped provider code, with the provider's own message
    Unknown(String),
}

impl AuthErrorKind {
    /// Map a provider error code. `message` is kept for unmapped codes.
    pub fn from_code(code: &str, message: &str) -> Self {
        // REST errors may carry detail after the code, e.g. "WEAK_PASSWORD : Password should be..."
        let code = code.split(" : ").next().unwrap_or(code).trim();
        match code {
            "auth/invalid-email" | "INVALID_EMAIL" => AuthErrorKind::InvalidEmail,
            "auth/user-disabled" | "USER_DISABLED" => AuthErrorKind::UserDisabled,
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => AuthErrorKind::UserNotFound,
            "auth/wrong-password" | "INVALID_PASSWORD" => AuthErrorKind::WrongPassword,
            "auth/invalid-credential" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthErrorKind::InvalidCredentials
            }
            "auth/email-already-in-use" | "EMAIL_EXISTS" => AuthErrorKind::EmailAlreadyInUse,
            "auth/operation-not-allowed" | "OPERATION_NOT_ALLOWED" => {
                AuthErrorKind::OperationNotAllowed
            }
            "auth/weak-password" | "WEAK_PASSWORD" => AuthErrorKind::WeakPassword,
            "auth/too-many-requests" | "TOO_MANY_ATTEMPTS_TRY_LATER" => {
                AuthErrorKind::TooManyAttempts
            }
            "auth/popup-closed-by-user" => AuthErrorKind::PopupClosed,
            "auth/popup-blocked" => AuthErrorKind::PopupBlocked,
            "auth/cancelled-popup-request" => AuthErrorKind::PopupCancelled,
            "auth/network-request-failed" => AuthErrorKind::Network,
            _ => AuthErrorKind::Unknown(message.to_string()),
        }
    }

    /// User-facing message, `None` when the flow's fallback should be shown
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            AuthErrorKind::Validation(message) => message.as_str(),
            AuthErrorKind::InvalidEmail => "Invalid email address.",
            AuthErrorKind::UserDisabled => "This account has been disabled.",
            AuthErrorKind::UserNotFound => "No account found with this email.",
            AuthErrorKind::WrongPassword => "Incorrect password.",
            AuthErrorKind::InvalidCredentials => "Incorrect email or password.",
            AuthErrorKind::EmailAlreadyInUse => "This email is already registered.",
            AuthErrorKind::OperationNotAllowed => "Email/password accounts are not enabled.",
            AuthErrorKind::WeakPassword => "Password is too weak.",
            AuthErrorKind::TooManyAttempts => "Too many attempts. Please try again later.",
            AuthErrorKind::PopupClosed => "Sign in was cancelled.",
            AuthErrorKind::PopupBlocked => "Sign in popup was blocked by the browser.",
            AuthErrorKind::PopupCancelled => "Another sign in request is in progress.",
            AuthErrorKind::Network => return None,
            AuthErrorKind::Unknown(message) => message.as_str(),
        };
        Some(message).filter(|m| !m.trim().is_empty())
    }
}

/// A failed auth attempt, displayed as the message to show the user
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthError {
    pub flow: AuthFlow,
    pub kind: AuthErrorKind,
    /// Raw provider code, when the provider returned one
    pub code: Option<String>,
    pub message: String,
}

impl AuthError {
    pub fn new(flow: AuthFlow, kind: AuthErrorKind, code: Option<String>) -> Self {
        let message = kind
            .message()
            .unwrap_or_else(|| flow.fallback_message())
            .to_string();
        AuthError {
            flow,
            kind,
            code,
            message,
        }
    }

    /// Error for a provider code as returned by the SDK or REST API
    pub fn from_code(flow: AuthFlow, code: &str, message: &str) -> Self {
        Self::new(
            flow,
            AuthErrorKind::from_code(code, message),
            Some(code.to_string()),
        )
    }

    fn validation(flow: AuthFlow, message: &str) -> Self {
        Self::new(flow, AuthErrorKind::Validation(message.to_string()), None)
    }
}

/// Check a sign-in form before submitting it
pub fn validate_login(email: &str, password: &str) -> Result<(), AuthError> {
    let flow = AuthFlow::SignIn;
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::validation(flow, "Please fill in all fields"));
    }
    if !email_regex().is_match(email) {
        return Err(AuthError::validation(flow, "Invalid email format"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(
            flow,
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

/// Check a sign-up form before submitting it
pub fn validate_signup(email: &str, password: &str, confirm_password: &str) -> Result<(), AuthError> {
    let flow = AuthFlow::SignUp;
    if email.is_empty() || password.is_empty() || confirm_password.is_empty() {
        return Err(AuthError::validation(flow, "Please fill in all fields."));
    }
    if !email_regex().is_match(email) {
        return Err(AuthError::validation(flow, "Invalid email format."));
    }
    if password != confirm_password {
        return Err(AuthError::validation(flow, "Passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(
            flow,
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

/// Credential obtained from a social provider by the host shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpCredential {
    Google { id_token: String },
    Facebook { access_token: String },
}

impl IdpCredential {
    fn flow(&self) -> AuthFlow {
        match self {
            IdpCredential::Google { .. } => AuthFlow::Google,
            IdpCredential::Facebook { .. } => AuthFlow::Facebook,
        }
    }

    /// Form-encoded `postBody` for `signInWithIdp`
    fn post_body(&self) -> String {
        let (field, token, provider) = match self {
            IdpCredential::Google { id_token } => ("id_token", id_token, "google.com"),
            IdpCredential::Facebook { access_token } => {
                ("access_token", access_token, "facebook.com")
            }
        };
        reqwest::Url::parse_with_params(
            "http://localhost/",
            &[(field, token.as_str()), ("providerId", provider)],
        )
        .ok()
        .and_then(|url| url.query().map(str::to_string))
        .unwrap_or_default()
    }
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    #[serde(rename = "localId")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds
    #[serde(default, deserialize_with = "seconds_from_string")]
    pub expires_in: Option<u64>,
}

fn seconds_from_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        _ => None,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Firebase Identity Toolkit REST client
pub struct FirebaseAuthClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirebaseAuthClient {
    pub fn new(config: &FirebaseConfig, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::NotFound("firebase.api_key".to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(FirebaseAuthClient {
            client: builder
                .build()
                .map_err(|e| ConfigError::Message(e.to_string()))?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Validate the form, then sign in with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        validate_login(email, password)?;
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let session = self
            .call(AuthFlow::SignIn, "accounts:signInWithPassword", &body)
            .await?;
        info!("Signed in {}", email);
        Ok(session)
    }

    /// Validate the form, then create an account
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<AuthSession, AuthError> {
        validate_signup(email, password, confirm_password)?;
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let session = self.call(AuthFlow::SignUp, "accounts:signUp", &body).await?;
        info!("Created account for {}", email);
        Ok(session)
    }

    /// Exchange a Google or Facebook credential for a session
    pub async fn sign_in_with_idp(&self, credential: &IdpCredential) -> Result<AuthSession, AuthError> {
        let post_body = credential.post_body();
        let body = IdpRequest {
            post_body: &post_body,
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        self.call(credential.flow(), "accounts:signInWithIdp", &body)
            .await
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        flow: AuthFlow,
        method: &str,
        body: &B,
    ) -> Result<AuthSession, AuthError> {
        let url = format!("{}/v1/{}", self.base_url, method);
        debug!("Calling identity provider {}", method);

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Identity provider unreachable: {}", e);
                AuthError::new(flow, AuthErrorKind::Network, None)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Identity provider error ({}): {}", status, error_text);
            let code = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_default();
            return Err(AuthError::from_code(flow, &code, &code));
        }

        response.json::<AuthSession>().await.map_err(|e| {
            error!("Unexpected identity provider response: {}", e);
            AuthError::new(flow, AuthErrorKind::Unknown(String::new()), None)
        })
    }
}
