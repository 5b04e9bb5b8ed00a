//! Sign-in, callback, refresh, sign-out and per-request authorization.

use authgate_access::{
    AuthenticatedUser, AuthenticationError, IdentityResolver, Provider, SessionManager,
    SessionMetadata,
};
use authgate_core::DeviceId;
use authgate_credentials::{StateTokens, TokenKind, TokenPair, TokenService};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::instrument;

use super::provider::IdentityProviders;

/// Orchestrates the authentication flows over the access and credential
/// components. Every dependency is handed in at construction.
pub struct AuthService {
    state_tokens: StateTokens,
    tokens: TokenService,
    providers: Arc<dyn IdentityProviders>,
    resolver: IdentityResolver,
    sessions: SessionManager,
}

/// Returns the token of a `Bearer <token>` header value. The scheme is
/// matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl AuthService {
    pub fn new(
        state_tokens: StateTokens,
        tokens: TokenService,
        providers: Arc<dyn IdentityProviders>,
        resolver: IdentityResolver,
        sessions: SessionManager,
    ) -> Self {
        Self {
            state_tokens,
            tokens,
            providers,
            resolver,
            sessions,
        }
    }

    /// Returns the provider redirect URL carrying a fresh state token.
    #[instrument(skip(self))]
    pub fn sign_in_url(&self, provider: &str) -> Result<String, Report<AuthenticationError>> {
        let provider = Provider::parse(provider)?;
        let state = self
            .state_tokens
            .generate()
            .map_err(|e| e.context(AuthenticationError::TokenIssue))?;

        self.providers.sign_in_url(provider, &state)
    }

    /// Completes the OAuth round-trip and issues a credential pair for the
    /// (user, device) session.
    #[instrument(skip_all, fields(provider = %provider, device_id = %device_id))]
    pub async fn callback(
        &self,
        provider: &str,
        state: &str,
        code: &str,
        device_id: DeviceId,
        metadata: SessionMetadata,
    ) -> Result<TokenPair, Report<AuthenticationError>> {
        let provider = Provider::parse(provider)?;

        if state.is_empty() || code.is_empty() {
            return Err(AuthenticationError::InvalidRequest {
                reason: "state and code are required".to_string(),
            }
            .into());
        }
        self.state_tokens
            .check(state)
            .map_err(|e| e.context(AuthenticationError::InvalidState))?;

        let provider_token = self.providers.exchange_code(provider, code).await?;
        let profile = self
            .providers
            .fetch_profile(provider, &provider_token)
            .await?;

        let user = self.resolver.resolve(&profile, provider).await?;
        let session = self
            .sessions
            .create_or_get(user.id(), device_id, metadata)
            .await?;

        let pair = self
            .tokens
            .issue_pair(user.id(), session.id(), user.email())
            .map_err(|e| e.context(AuthenticationError::TokenIssue))?;

        tracing::info!(user_id = %user.id(), session_id = %session.id(), "signed in");
        Ok(pair)
    }

    /// Issues a new pair bound to the same session as `refresh_token`.
    ///
    /// The previous pair is not invalidated; it stays usable until it expires.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Report<AuthenticationError>> {
        if refresh_token.is_empty() {
            return Err(AuthenticationError::InvalidRequest {
                reason: "refresh_token is required".to_string(),
            }
            .into());
        }

        let claims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| e.context(AuthenticationError::InvalidToken))?;
        let session = self.sessions.get_by_id(claims.session_id).await?;

        self.tokens
            .issue_pair(claims.user_id, session.id(), &claims.email)
            .map_err(|e| e.context(AuthenticationError::TokenIssue))
    }

    /// Resolves the `Authorization` header of a request to its user and live
    /// session.
    pub async fn authorize(
        &self,
        header: Option<&str>,
    ) -> Result<AuthenticatedUser, Report<AuthenticationError>> {
        let token = header
            .and_then(bearer_token)
            .ok_or(AuthenticationError::MissingCredentials)?;

        let claims = self
            .tokens
            .verify(token, TokenKind::Access)
            .map_err(|e| e.context(AuthenticationError::InvalidToken))?;
        let session = self.sessions.get_by_id(claims.session_id).await?;
        let user = self.resolver.find_active(claims.user_id).await?;

        Ok(AuthenticatedUser::new(session, user))
    }

    /// Revokes the caller's session on `device_id`, or on the device of the
    /// authenticated session when no device is given.
    #[instrument(skip_all, fields(user_id = %auth.user_id()))]
    pub async fn sign_out(
        &self,
        auth: &AuthenticatedUser,
        device_id: Option<DeviceId>,
    ) -> Result<(), Report<AuthenticationError>> {
        let device_id = device_id.unwrap_or_else(|| auth.session().device_id().clone());
        self.sessions.revoke_by(auth.user_id(), &device_id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use authgate_access::memory::InMemoryStore;
    use authgate_access::{ErrorKind, GeoError, Geolocator, ProviderProfile};
    use authgate_core::Secret;
    use chrono::Duration;
    use std::collections::HashMap;

    /// Provider stub mapping authorization codes to canned profiles.
    #[derive(Default)]
    pub(crate) struct StubProviders {
        pub(crate) profiles: HashMap<String, ProviderProfile>,
    }

    impl StubProviders {
        pub(crate) fn with_profile(mut self, code: &str, profile: ProviderProfile) -> Self {
            self.profiles.insert(code.to_string(), profile);
            self
        }
    }

    #[async_trait]
    impl IdentityProviders for StubProviders {
        fn sign_in_url(
            &self,
            provider: Provider,
            state: &str,
        ) -> Result<String, Report<AuthenticationError>> {
            Ok(format!("https://{provider}.example/authorize?state={state}"))
        }

        async fn exchange_code(
            &self,
            provider: Provider,
            code: &str,
        ) -> Result<Secret, Report<AuthenticationError>> {
            if self.profiles.contains_key(code) {
                Ok(Secret::new(code))
            } else {
                Err(AuthenticationError::ProviderError {
                    provider,
                    reason: "bad_verification_code".to_string(),
                }
                .into())
            }
        }

        async fn fetch_profile(
            &self,
            provider: Provider,
            token: &Secret,
        ) -> Result<ProviderProfile, Report<AuthenticationError>> {
            self.profiles.get(token.expose()).cloned().ok_or_else(|| {
                AuthenticationError::ProviderError {
                    provider,
                    reason: "unknown token".to_string(),
                }
                .into()
            })
        }
    }

    pub(crate) struct NoGeo;

    #[async_trait]
    impl Geolocator for NoGeo {
        async fn locate(&self, ip: &str) -> Result<String, Report<GeoError>> {
            Err(GeoError::Lookup {
                ip: ip.to_string(),
                reason: "offline".to_string(),
            }
            .into())
        }
    }

    pub(crate) const TEST_SECRET: &str = "authgate-test-secret";

    pub(crate) fn service_with(
        providers: StubProviders,
        store: InMemoryStore,
    ) -> AuthService {
        let secret = Secret::new(TEST_SECRET);
        let store = Arc::new(store);
        AuthService::new(
            StateTokens::new(&secret, Duration::minutes(15)),
            TokenService::new(&secret, Duration::minutes(60), Duration::days(7)),
            Arc::new(providers),
            IdentityResolver::new(store.clone()),
            SessionManager::new(store, Arc::new(NoGeo)),
        )
    }

    fn bob() -> ProviderProfile {
        ProviderProfile::new("g-1", "bob@x.com").with_name(Some("Bob".to_string()))
    }

    fn state_for(service: &AuthService) -> String {
        service.state_tokens.generate().expect("state")
    }

    async fn sign_in(service: &AuthService, code: &str, device: &str) -> TokenPair {
        let state = state_for(service);
        service
            .callback(
                "google",
                &state,
                code,
                DeviceId::new(device),
                SessionMetadata::new("203.0.113.7", "test-agent"),
            )
            .await
            .expect("callback")
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER  abc "), Some("abc"));
        assert_eq!(bearer_token(""), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic xyz"), None);
    }

    #[test]
    fn unsupported_provider_fails_before_any_call() {
        let service = service_with(StubProviders::default(), InMemoryStore::new());
        let err = service.sign_in_url("myspace").unwrap_err();
        assert_eq!(err.current_context().kind(), ErrorKind::OAuth);
    }

    #[test]
    fn sign_in_url_carries_valid_state() {
        let service = service_with(StubProviders::default(), InMemoryStore::new());
        let url = service.sign_in_url("github").expect("url");
        let state = url.split("state=").nth(1).expect("state param");
        assert!(service.state_tokens.validate(state));
    }

    #[tokio::test]
    async fn forged_state_aborts_before_exchange() {
        let store = InMemoryStore::new();
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            store.clone(),
        );

        let err = service
            .callback(
                "google",
                "forged",
                "code-1",
                DeviceId::new("d1"),
                SessionMetadata::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.current_context(), &AuthenticationError::InvalidState);
        assert_eq!(store.user_count().await, 0);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn provider_is_checked_before_state() {
        let service = service_with(StubProviders::default(), InMemoryStore::new());

        let err = service
            .callback(
                "myspace",
                "forged",
                "code-1",
                DeviceId::new("d1"),
                SessionMetadata::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            AuthenticationError::UnsupportedProvider { .. }
        ));
        assert_eq!(err.current_context().kind(), ErrorKind::OAuth);
    }

    #[tokio::test]
    async fn missing_code_is_invalid_input() {
        let service = service_with(StubProviders::default(), InMemoryStore::new());
        let state = state_for(&service);
        let err = service
            .callback("google", &state, "", DeviceId::new("d1"), SessionMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(err.current_context().kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn failed_exchange_is_oauth_error() {
        let service = service_with(StubProviders::default(), InMemoryStore::new());
        let state = state_for(&service);
        let err = service
            .callback("google", &state, "nope", DeviceId::new("d1"), SessionMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(err.current_context().kind(), ErrorKind::OAuth);
    }

    #[tokio::test]
    async fn repeat_sign_in_from_same_device_reuses_session() {
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            InMemoryStore::new(),
        );

        let first = sign_in(&service, "code-1", "d1").await;
        let second = sign_in(&service, "code-1", "d1").await;

        let a = service
            .tokens
            .verify(&first.access_token, TokenKind::Access)
            .expect("first");
        let b = service
            .tokens
            .verify(&second.access_token, TokenKind::Access)
            .expect("second");
        assert_eq!(a.session_id, b.session_id);
        assert_eq!(a.user_id, b.user_id);
    }

    #[tokio::test]
    async fn authorize_resolves_user_and_session() {
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            InMemoryStore::new(),
        );
        let pair = sign_in(&service, "code-1", "d1").await;

        let auth = service
            .authorize(Some(&format!("Bearer {}", pair.access_token)))
            .await
            .expect("authorize");
        assert_eq!(auth.user().email(), "bob@x.com");
        assert_eq!(auth.session().device_id().as_str(), "d1");
        assert_eq!(auth.session().ip_address(), "203.0.113.7");
    }

    #[tokio::test]
    async fn malformed_headers_are_unauthorized() {
        let service = service_with(StubProviders::default(), InMemoryStore::new());
        for header in [None, Some(""), Some("Bearer"), Some("Basic xyz"), Some("Bearer junk")] {
            let err = service.authorize(header).await.unwrap_err();
            assert_eq!(err.current_context().kind(), ErrorKind::Unauthorized);
        }
    }

    #[tokio::test]
    async fn refresh_token_cannot_authorize_requests() {
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            InMemoryStore::new(),
        );
        let pair = sign_in(&service, "code-1", "d1").await;

        let err = service
            .authorize(Some(&format!("Bearer {}", pair.refresh_token)))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &AuthenticationError::InvalidToken);
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            InMemoryStore::new(),
        );
        let pair = sign_in(&service, "code-1", "d1").await;

        let err = service.refresh(&pair.access_token).await.unwrap_err();
        assert_eq!(err.current_context().kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn refresh_keeps_session_and_old_access_token() {
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            InMemoryStore::new(),
        );
        let pair = sign_in(&service, "code-1", "d1").await;

        let refreshed = service.refresh(&pair.refresh_token).await.expect("refresh");
        let old = service
            .tokens
            .verify(&pair.access_token, TokenKind::Access)
            .expect("old");
        let new = service
            .tokens
            .verify(&refreshed.access_token, TokenKind::Access)
            .expect("new");
        assert_eq!(old.session_id, new.session_id);

        service
            .authorize(Some(&format!("Bearer {}", pair.access_token)))
            .await
            .expect("old access token still valid");
    }

    #[tokio::test]
    async fn sign_out_revokes_outstanding_tokens() {
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            InMemoryStore::new(),
        );
        let pair = sign_in(&service, "code-1", "d1").await;
        let header = format!("Bearer {}", pair.access_token);

        let auth = service.authorize(Some(&header)).await.expect("authorize");
        service.sign_out(&auth, None).await.expect("sign out");

        let err = service.authorize(Some(&header)).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::SessionNotFound { .. }
        ));
        let err = service.refresh(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.current_context().kind(), ErrorKind::Unauthorized);

        service.sign_out(&auth, None).await.expect("idempotent");
    }

    #[tokio::test]
    async fn deleted_user_is_unauthorized() {
        let store = InMemoryStore::new();
        let service = service_with(
            StubProviders::default().with_profile("code-1", bob()),
            store.clone(),
        );
        let pair = sign_in(&service, "code-1", "d1").await;
        let claims = service
            .tokens
            .verify(&pair.access_token, TokenKind::Access)
            .expect("claims");
        store.soft_delete_user(claims.user_id).await;

        let err = service
            .authorize(Some(&format!("Bearer {}", pair.access_token)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::UserNotFound { .. }
        ));
    }
}
