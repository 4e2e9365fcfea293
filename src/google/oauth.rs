//! OAuth 2.0 authorization code flow for installed apps. The refresh
//! token is kept and exchanged for a short lived access token on
//! every use.

use serde::Deserialize;

use super::{GoogleApiError, checked_text};

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

pub fn authorization_url(client_id: &str, redirect_uri: &str, scope: &str) -> String {
    format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(scope)
    )
}

pub async fn exchange_code_for_token(
    oauth_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthToken, GoogleApiError> {
    let url = format!("{}/token", oauth_url.trim_end_matches('/'));
    let res = reqwest::Client::new()
        .post(url)
        .form(&[
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;
    let body = checked_text(res).await?;
    Ok(serde_json::from_str(&body)?)
}

pub async fn refresh_access_token(
    oauth_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<OAuthToken, GoogleApiError> {
    let url = format!("{}/token", oauth_url.trim_end_matches('/'));
    let res = reqwest::Client::new()
        .post(url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    // Google answers 400 invalid_grant for revoked or expired refresh
    // tokens, which is an auth problem rather than a backend one
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    if status.is_client_error() {
        return Err(GoogleApiError::Unauthorized {
            status: status.as_u16(),
            body,
        });
    }
    if !status.is_success() {
        return Err(GoogleApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_is_encoded() {
        let url = authorization_url("id 1", "urn:ietf:wg:oauth:2.0:oob", super::super::CALENDAR_SCOPE);
        assert!(url.contains("client_id=id%201"));
        assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "rt-123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "at-456", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let token = refresh_access_token(&server.url(), "id", "secret", "rt-123")
            .await
            .unwrap();
        assert_eq!(token.access_token, "at-456");
        assert_eq!(token.refresh_token, None);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_is_an_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let err = refresh_access_token(&server.url(), "id", "secret", "revoked")
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_exchange_code_for_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "authorization_code".into(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token": "at", "refresh_token": "rt", "expires_in": 3599}"#)
            .create_async()
            .await;

        let token = exchange_code_for_token(&server.url(), "id", "secret", "code", "urn:ietf:wg:oauth:2.0:oob")
            .await
            .unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
    }
}
