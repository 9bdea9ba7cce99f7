//! Token function demo.
//!
//! Runs three invocations against the token handler: a valid request, one
//! missing `name`, and a CORS preflight.
//!
//! ```bash
//! cargo run -p cirrus --example token
//! ```

use bytes::Bytes;
use cirrus::prelude::*;
use http::Method;
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};

fn token<'a>(
    req: &'a mut RequestContext,
    res: &'a mut ResponseContext,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let schema = Schema::builder()
            .property_with_format("name", FieldType::String, "nonEmptyOrBlank")
            .property("age", FieldType::Number)
            .required("name")
            .build();

        let body = req.json().cloned().unwrap_or(Value::Null);
        validate(&schema, &body)?;
        req.log(format!("issuing token for {}", body["name"]));

        res.set_header("Authorization", "token")?;
        res.send(&json!({"data": "token generated"}))?;
        Ok(())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_development()
        .with_optional_file("function.toml")?
        .with_env_prefix("CIRRUS")
        .load()?;
    init_logging(&config.logging.to_log_config())?;

    let function = Function::with_config(token, Metadata::new().with("route", "token"), &config)?;
    let entrypoint = function.entrypoint();

    let requests = [
        (Method::POST, json!({"name": "Ada", "age": 36}).to_string()),
        (Method::POST, json!({"age": 36}).to_string()),
        (Method::OPTIONS, String::new()),
    ];

    for (method, body) in requests {
        let request = http::Request::builder()
            .method(method.clone())
            .uri("/api/token")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))?;

        let response = entrypoint(request, InvocationContext::new("token")).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        println!("{method} -> {status} {}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
