use async_trait::async_trait;

use super::meta_ads::{MetaError, GRAPH_API_VERSION};
use crate::core::accounts::MetaLink;
use crate::core::config::{optional, EnvSource};

pub const OAUTH_SCOPES: &str = "ads_management,business_management";

/// Meta app credentials. Every field is optional so the service can start
/// without them; the OAuth routes report `NotConfigured` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaAppConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl MetaAppConfig {
    pub fn from_env(env: &dyn EnvSource) -> Self {
        Self {
            app_id: optional(env, "META_APP_ID"),
            app_secret: optional(env, "META_APP_SECRET"),
            redirect_uri: optional(env, "META_REDIRECT_URI"),
        }
    }

    /// Login dialog URL. `state` carries our user id through the redirect.
    pub fn auth_url(&self, state: &str) -> Result<String, MetaError> {
        let (Some(app_id), Some(redirect)) = (&self.app_id, &self.redirect_uri) else {
            return Err(MetaError::NotConfigured);
        };
        Ok(format!(
            "https://www.facebook.com/{GRAPH_API_VERSION}/dialog/oauth?client_id={app_id}&redirect_uri={redirect}&state={state}&scope={OAUTH_SCOPES}"
        ))
    }

    pub fn credentials(&self) -> Result<AppCredentials<'_>, MetaError> {
        match (&self.app_id, &self.app_secret, &self.redirect_uri) {
            (Some(app_id), Some(app_secret), Some(redirect_uri)) => Ok(AppCredentials {
                app_id,
                app_secret,
                redirect_uri,
            }),
            _ => Err(MetaError::NotConfigured),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AppCredentials<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
    pub redirect_uri: &'a str,
}

#[async_trait]
pub trait MetaOAuth: Send + Sync {
    async fn exchange_code(&self, app: AppCredentials<'_>, code: &str) -> Result<String, MetaError>;
    async fn long_lived_token(&self, app: AppCredentials<'_>, token: &str) -> Result<String, MetaError>;
    /// Meta user id of the token's owner.
    async fn me(&self, token: &str) -> Result<String, MetaError>;
}

/// Code → short token → long-lived token → `/me`.
pub async fn link_account(
    oauth: &dyn MetaOAuth,
    config: &MetaAppConfig,
    code: &str,
) -> Result<MetaLink, MetaError> {
    let app = config.credentials()?;
    let short = oauth.exchange_code(app, code).await?;
    let access_token = oauth.long_lived_token(app, &short).await?;
    let meta_user_id = oauth.me(&access_token).await?;
    Ok(MetaLink {
        access_token,
        meta_user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapEnv;

    struct StubOAuth;

    #[async_trait]
    impl MetaOAuth for StubOAuth {
        async fn exchange_code(&self, _app: AppCredentials<'_>, code: &str) -> Result<String, MetaError> {
            Ok(format!("short-{code}"))
        }
        async fn long_lived_token(&self, _app: AppCredentials<'_>, token: &str) -> Result<String, MetaError> {
            Ok(format!("long-{token}"))
        }
        async fn me(&self, token: &str) -> Result<String, MetaError> {
            assert_eq!(token, "long-short-abc");
            Ok("fb-42".to_string())
        }
    }

    #[test]
    fn auth_url_carries_state_and_scopes() {
        let config = MetaAppConfig::from_env(
            &MapEnv::new()
                .with("META_APP_ID", "app")
                .with("META_REDIRECT_URI", "https://hub/cb"),
        );
        let url = config.auth_url("user-7").unwrap();
        assert!(url.starts_with("https://www.facebook.com/v18.0/dialog/oauth?client_id=app"));
        assert!(url.contains("&state=user-7&scope=ads_management,business_management"));
    }

    #[tokio::test]
    async fn unconfigured_app_cannot_link() {
        let config = MetaAppConfig::default();
        assert!(matches!(config.auth_url("u"), Err(MetaError::NotConfigured)));
        assert!(matches!(
            link_account(&StubOAuth, &config, "abc").await,
            Err(MetaError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn link_exchanges_for_long_lived_token() {
        let config = MetaAppConfig {
            app_id: Some("app".into()),
            app_secret: Some("secret".into()),
            redirect_uri: Some("https://hub/cb".into()),
        };
        let linked = link_account(&StubOAuth, &config, "abc").await.unwrap();
        assert_eq!(linked.access_token, "long-short-abc");
        assert_eq!(linked.meta_user_id, "fb-42");
    }
}
