//! Credential bootstrap for the calendar API.

use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Where the calendar access token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// OAuth client secret plus an on-disk token cache
    InstalledFlow {
        client_secret: PathBuf,
        token_cache: PathBuf,
    },
    /// Service-account key file
    ServiceAccount { key: PathBuf },
}

impl CredentialSource {
    /// Pick the mode. A service-account key wins over the installed flow
    /// defaults; supplying it together with an explicit client secret is an error.
    pub fn from_args(
        credentials: Option<PathBuf>,
        token: PathBuf,
        service_account: Option<PathBuf>,
    ) -> Result<Self> {
        match (service_account, credentials) {
            (Some(_), Some(_)) => Err(AppError::config(
                "--service-account cannot be combined with --credentials",
            )),
            (Some(key), None) => Ok(Self::ServiceAccount { key }),
            (None, client_secret) => Ok(Self::InstalledFlow {
                client_secret: client_secret.unwrap_or_else(|| PathBuf::from("credentials.json")),
                token_cache: token,
            }),
        }
    }

    /// Obtain one access token with the calendar scope.
    pub async fn access_token(&self) -> Result<String> {
        let scopes = [CALENDAR_SCOPE];

        let token = match self {
            Self::InstalledFlow {
                client_secret,
                token_cache,
            } => {
                if !client_secret.exists() {
                    return Err(AppError::config(format!(
                        "Credentials file not found: {}",
                        client_secret.display()
                    )));
                }
                let secret = yup_oauth2::read_application_secret(client_secret)
                    .await
                    .map_err(|e| AppError::auth(format!("Failed to read OAuth credentials: {e}")))?;
                let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
                    secret,
                    yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
                )
                .persist_tokens_to_disk(token_cache)
                .build()
                .await
                .map_err(|e| AppError::auth(format!("Failed to build authenticator: {e}")))?;
                auth.token(&scopes).await.map_err(AppError::auth)?
            }
            Self::ServiceAccount { key } => {
                if !key.exists() {
                    return Err(AppError::config(format!(
                        "Service account key not found: {}",
                        key.display()
                    )));
                }
                let key = yup_oauth2::read_service_account_key(key)
                    .await
                    .map_err(|e| AppError::auth(format!("Failed to read service account key: {e}")))?;
                let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(|e| AppError::auth(format!("Failed to build authenticator: {e}")))?;
                auth.token(&scopes).await.map_err(AppError::auth)?
            }
        };

        log::info!("Google Calendar authentication successful");
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| AppError::auth("token response carried no access token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installed_flow_defaults() {
        let source = CredentialSource::from_args(None, "token.json".into(), None).unwrap();
        assert_eq!(
            source,
            CredentialSource::InstalledFlow {
                client_secret: "credentials.json".into(),
                token_cache: "token.json".into(),
            }
        );
    }

    #[test]
    fn test_service_account_mode() {
        let source =
            CredentialSource::from_args(None, "token.json".into(), Some("sa.json".into())).unwrap();
        assert_eq!(
            source,
            CredentialSource::ServiceAccount {
                key: "sa.json".into()
            }
        );
    }

    #[test]
    fn test_modes_are_exclusive() {
        let err = CredentialSource::from_args(
            Some("credentials.json".into()),
            "token.json".into(),
            Some("sa.json".into()),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_missing_key_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = CredentialSource::ServiceAccount {
            key: dir.path().join("absent.json"),
        };
        assert!(source.access_token().await.unwrap_err().is_configuration());
    }
}
