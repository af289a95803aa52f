//! Conversions from external infrastructure errors into domain errors.

use actionarc_common::auth::{OAuthClientError, TokenManagerError, TokenStoreError};
use actionarc_domain::ActionArcError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ActionArcError);

impl From<InfraError> for ActionArcError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ActionArcError> for InfraError {
    fn from(value: ActionArcError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoActionArcError {
    fn into_actionarc(self) -> ActionArcError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ActionArcError */
/* -------------------------------------------------------------------------- */

impl IntoActionArcError for HttpError {
    fn into_actionarc(self) -> ActionArcError {
        if self.is_timeout() {
            return ActionArcError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return ActionArcError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return ActionArcError::Internal(format!("failed to decode HTTP response: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => ActionArcError::Auth(message),
                _ => ActionArcError::Api { status: code, message },
            };
        }

        ActionArcError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_actionarc())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io / serde_json / toml → ActionArcError */
/* -------------------------------------------------------------------------- */

impl IntoActionArcError for std::io::Error {
    fn into_actionarc(self) -> ActionArcError {
        match self.kind() {
            std::io::ErrorKind::NotFound => ActionArcError::NotFound(self.to_string()),
            std::io::ErrorKind::PermissionDenied => ActionArcError::Security(self.to_string()),
            _ => ActionArcError::Internal(format!("I/O error: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_actionarc())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(ActionArcError::InvalidInput(format!("invalid JSON: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(ActionArcError::Config(format!("Invalid TOML format: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* OAuth core errors → ActionArcError */
/* -------------------------------------------------------------------------- */

impl IntoActionArcError for OAuthClientError {
    fn into_actionarc(self) -> ActionArcError {
        match self {
            OAuthClientError::RequestFailed(e) => InfraError::from(e).0,
            OAuthClientError::OAuth(e) => ActionArcError::Auth(e.to_string()),
            OAuthClientError::StateMismatch { expected, received } => ActionArcError::Security(
                format!("OAuth state mismatch (expected {expected}, received {received})"),
            ),
            OAuthClientError::Parse(msg) => ActionArcError::InvalidInput(msg),
            OAuthClientError::NoRefreshToken => {
                ActionArcError::Auth("no refresh token issued".into())
            }
            OAuthClientError::Config(msg) => ActionArcError::Config(msg),
            OAuthClientError::DeviceCodeExpired => {
                ActionArcError::Auth("device code expired before sign-in completed".into())
            }
        }
    }
}

impl From<OAuthClientError> for InfraError {
    fn from(value: OAuthClientError) -> Self {
        InfraError(value.into_actionarc())
    }
}

impl IntoActionArcError for TokenStoreError {
    fn into_actionarc(self) -> ActionArcError {
        match self {
            TokenStoreError::InvalidAccount(name) => {
                ActionArcError::InvalidInput(format!("invalid account name: {name}"))
            }
            other => ActionArcError::Internal(other.to_string()),
        }
    }
}

impl From<TokenStoreError> for InfraError {
    fn from(value: TokenStoreError) -> Self {
        InfraError(value.into_actionarc())
    }
}

impl IntoActionArcError for TokenManagerError {
    fn into_actionarc(self) -> ActionArcError {
        match self {
            TokenManagerError::Store(inner) => inner.into_actionarc(),
            TokenManagerError::OAuth(inner) => inner.into_actionarc(),
            TokenManagerError::NotAuthenticated => {
                ActionArcError::Auth("not signed in; run `actionarc login` first".into())
            }
            TokenManagerError::RefreshFailed { attempts, last } => {
                ActionArcError::Auth(format!("token refresh failed after {attempts} attempts: {last}"))
            }
            TokenManagerError::NoRefreshToken => {
                ActionArcError::Auth("missing refresh token; sign in again".into())
            }
        }
    }
}

impl From<TokenManagerError> for InfraError {
    fn from(value: TokenManagerError) -> Self {
        InfraError(value.into_actionarc())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
