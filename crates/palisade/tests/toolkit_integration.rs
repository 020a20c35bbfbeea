//! Toolkit integration tests: configuration from a file, a login route that
//! issues a cookie, and a protected route that accepts it.

use bytes::Bytes;
use http::header::{COOKIE, SET_COOKIE};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use palisade::prelude::*;
use palisade::Toolkit;
use serde_json::{json, Value};
use std::io::Write;

fn toolkit_from_file(contents: &str) -> Toolkit {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    Toolkit::load(ConfigLoader::new().without_env().with_file(file.path()).unwrap()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn test_file_configuration() {
    let toolkit = toolkit_from_file(
        r#"
NODE_ENV = "production"
JWT_SECRET = "from-file"
JWT_EXPIRATION = "2h"
MAX_AGE = 12
"#,
    );

    let config = toolkit.config();
    assert!(config.is_production());
    assert_eq!(config.jwt_secret, "from-file");
    assert_eq!(config.cookie_max_age_millis(), 12 * 3600 * 1000);
    assert!(toolkit.cookie_options().secure);
}

#[tokio::test]
async fn test_login_then_protected_route() {
    let toolkit = toolkit_from_file("JWT_SECRET = \"integration\"\n");

    // Login handler issues the cookie.
    let mut login = send_response(json!({"message": "Logged in"}));
    let token = toolkit
        .sign_cookie(
            &mut login,
            &json!({"sub": "u1", "role": ["editor", "admin"]}),
            &SignCookieOptions::default(),
        )
        .unwrap();
    let set_cookie = login.headers()[SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with(&format!("token={token}; ")));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));

    let pipeline = Pipeline::builder()
        .stage(toolkit.request_id())
        .stage(toolkit.auth_guard())
        .stage(toolkit.authorize(["admin"]))
        .stage(toolkit.validate_source(
            rules::object().field("page", rules::string("page")),
            RequestSource::Query,
        ))
        .build();

    let request: Request = http::Request::builder()
        .uri("/reports?page=2")
        .header(COOKIE, format!("token={token}"))
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = pipeline
        .process(MiddlewareContext::new(), request, |ctx, _req| {
            let subject = ctx.claims().and_then(|c| c.subject()).map(String::from);
            let query = ctx.get_extension::<ValidatedFragment>().map(|f| f.value.clone());
            Box::pin(async move { send_response(json!({"subject": subject, "query": query})) })
        })
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        body_json(response).await,
        json!({
            "status": 200,
            "success": true,
            "message": "Success",
            "subject": "u1",
            "query": {"page": "2"}
        })
    );
}

#[tokio::test]
async fn test_handler_errors_render_like_stage_errors() {
    let response = catch(async {
        Err(PipelineError::from(
            AppError::conflict("Email already registered").with_detail("field", json!("email")),
        ))
    })
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await,
        json!({"status": 409, "message": "Email already registered", "field": "email"})
    );
}
