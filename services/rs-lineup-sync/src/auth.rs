//!
//! src/auth.rs  Andrew Belles  Sept 14th, 2025
//!
//! Credential acquisition helpers for the implicit grant: build the
//! authorization url, then turn the redirect the browser lands on into a
//! Token. Nothing in the sync core calls into this module
//!

use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::config::CatalogConfig;
use crate::errors::SyncError;
use crate::token::Token;

/// Random CSRF state for one authorization round trip
pub fn new_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// GET {auth_url}?client_id=&response_type=token&redirect_uri=&state=&scope=
pub fn authorize_url(cfg: &CatalogConfig, state: &str) -> Result<Url, SyncError> {
    let client_id = cfg.client_id.as_deref()
        .ok_or_else(|| SyncError::Config("SPOTIFY_CLIENT_ID was not set".to_string()))?;

    let mut url = cfg.auth_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "token")
        .append_pair("redirect_uri", &cfg.redirect_uri)
        .append_pair("state", state)
        .append_pair("scope", &cfg.scopes);
    Ok(url)
}

/// Accepts either the full redirect url or just its fragment
/// (`access_token=...&expires_in=...&state=...`)
pub fn parse_redirect(
    redirect: &str,
    expected_state: Option<&str>,
    now: DateTime<Utc>
) -> Result<Token, SyncError> {
    let redirect = redirect.trim();
    let fragment = match Url::parse(redirect) {
        Ok(url) => url.fragment()
            .map(str::to_string)
            .or_else(|| url.query().map(str::to_string))
            .unwrap_or_default(),
        Err(_) => redirect.trim_start_matches('#').to_string(),
    };

    let mut access_token = None;
    let mut expires_in = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "expires_in" => expires_in = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(SyncError::Config(format!("authorization denied: {error}")));
    }
    if let Some(expected) = expected_state {
        if state.as_deref() != Some(expected) {
            return Err(SyncError::Config(
                "state mismatch, authorize again".to_string()
            ));
        }
    }

    let access_token = access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SyncError::Parse("redirect has no access_token".to_string()))?;
    let expires_in: i64 = expires_in
        .ok_or_else(|| SyncError::Parse("redirect has no expires_in".to_string()))?
        .parse()
        .map_err(|e| SyncError::Parse(format!("expires_in: {e}")))?;

    Ok(Token::expiring_in(access_token, Duration::seconds(expires_in), now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from;

    fn catalog(client_id: Option<&str>) -> CatalogConfig {
        let mut cfg = load_config_from(&|_: &str| None).unwrap().catalog;
        cfg.client_id = client_id.map(str::to_string);
        cfg
    }

    #[test]
    fn authorize_url_carries_grant_parameters() {
        let url = authorize_url(&catalog(Some("client-1")), "st4te").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(url.as_str().starts_with("https://accounts.spotify.com/authorize?"));
        assert!(pairs.contains(&("client_id".into(), "client-1".into())));
        assert!(pairs.contains(&("response_type".into(), "token".into())));
        assert!(pairs.contains(&("state".into(), "st4te".into())));
        assert!(pairs.iter().any(|(k, v)| k == "scope" && v.contains("playlist-modify-private")));
    }

    #[test]
    fn authorize_url_requires_client_id() {
        assert!(matches!(authorize_url(&catalog(None), "s"), Err(SyncError::Config(_))));
    }

    #[test]
    fn redirect_fragment_becomes_token() {
        let now = Utc::now();
        let token = parse_redirect(
            "http://localhost:8888/callback#access_token=BQD&token_type=Bearer&expires_in=3600&state=abc",
            Some("abc"),
            now
        ).unwrap();
        assert_eq!(token.access_token, "BQD");
        assert_eq!(token.expires_at, now + Duration::seconds(3600));
    }

    #[test]
    fn bare_fragment_is_accepted() {
        let token = parse_redirect("#access_token=xyz&expires_in=60", None, Utc::now()).unwrap();
        assert_eq!(token.access_token, "xyz");
    }

    #[test]
    fn state_mismatch_and_denial_are_rejected() {
        let now = Utc::now();
        let err = parse_redirect("#access_token=a&expires_in=60&state=evil", Some("good"), now);
        assert!(matches!(err, Err(SyncError::Config(_))));

        let err = parse_redirect("http://localhost/callback?error=access_denied&state=s", None, now);
        assert!(matches!(err, Err(SyncError::Config(_))));

        let err = parse_redirect("#expires_in=60", None, now);
        assert!(matches!(err, Err(SyncError::Parse(_))));
    }

    #[test]
    fn states_are_unique() {
        assert_ne!(new_state(), new_state());
    }
}
