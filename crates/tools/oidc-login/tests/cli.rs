use clap::Parser;
use oidc_login::cli::Args;
use oidc_login::error::CliError;
use ras_identity_oidc::TOKEN_EXCHANGE_MESSAGE;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_provider() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": server.uri(),
            "authorization_endpoint": "http://test.int/authorize",
            "token_endpoint": format!("{}/token", server.uri()),
            "jwks_uri": format!("{}/jwks", server.uri())
        })))
        .mount(&server)
        .await;

    server
}

fn settings_file(server: &MockServer) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        r#"
client_id = "1234"
client_secret = "5678"
metadata_url = "{}/.well-known/openid-configuration"

[http]
timeout_ms = 500

[http.retry]
max_retries = 0
"#,
        server.uri()
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_authorize_url_command() -> Result<(), Box<dyn std::error::Error>> {
    let server = mock_provider().await;
    let settings = settings_file(&server);

    let args = Args::try_parse_from([
        "oidc-login",
        "--config",
        settings.path().to_str().unwrap(),
        "authorize-url",
        "--redirect-uri",
        "http://test.int/session",
        "--state",
        "123",
    ])?;
    let output = args.run().await?;

    assert_eq!(
        output,
        "http://test.int/authorize?client_id=1234&redirect_uri=http%3A%2F%2Ftest.int%2Fsession&scope=openid%20profile%20email&state=123&response_mode=query&response_type=code"
    );
    Ok(())
}

#[tokio::test]
async fn test_authorize_url_with_scope() -> Result<(), Box<dyn std::error::Error>> {
    let server = mock_provider().await;
    let settings = settings_file(&server);

    let args = Args::try_parse_from([
        "oidc-login",
        "authorize-url",
        "--redirect-uri",
        "http://test.int/session",
        "--state",
        "abc",
        "--scope",
        "openid",
        "--config",
        settings.path().to_str().unwrap(),
    ])?;
    let output = args.run().await?;

    assert!(output.contains("&scope=openid&state=abc&"));
    Ok(())
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let server = mock_provider().await;
    let settings = settings_file(&server);

    let args = Args::try_parse_from([
        "oidc-login",
        "--config",
        settings.path().to_str().unwrap(),
        "callback",
        "--base-url",
        "http://localhost:3000",
        "--path",
        "/session",
        "--error",
        "access_denied",
        "--error-description",
        "User cancelled",
    ])
    .unwrap();

    match args.run().await {
        Err(CliError::AuthenticationFailed(message)) => {
            assert!(message.contains("User cancelled"));
            assert!(message.contains("access_denied"));
        }
        other => panic!("Expected authentication failure, got {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_with_rejected_code() {
    let server = mock_provider().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let settings = settings_file(&server);

    let args = Args::try_parse_from([
        "oidc-login",
        "--config",
        settings.path().to_str().unwrap(),
        "callback",
        "--base-url",
        "http://localhost:3000",
        "--path",
        "/session",
        "--code",
        "expired-code",
    ])
    .unwrap();

    match args.run().await {
        Err(CliError::AuthenticationFailed(message)) => {
            assert_eq!(message, TOKEN_EXCHANGE_MESSAGE);
        }
        other => panic!("Expected authentication failure, got {other:?}"),
    }
}

#[test]
fn test_callback_requires_code_or_error() {
    let missing = Args::try_parse_from([
        "oidc-login",
        "callback",
        "--base-url",
        "http://localhost:3000",
    ]);
    assert!(missing.is_err());

    let both = Args::try_parse_from([
        "oidc-login",
        "callback",
        "--base-url",
        "http://localhost:3000",
        "--code",
        "abc",
        "--error",
        "access_denied",
    ]);
    assert!(both.is_err());

    let description_alone = Args::try_parse_from([
        "oidc-login",
        "callback",
        "--base-url",
        "http://localhost:3000",
        "--code",
        "abc",
        "--error-description",
        "User cancelled",
    ]);
    assert!(description_alone.is_err());
}
