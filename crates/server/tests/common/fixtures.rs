//! Test fixtures for building requests.

use axum::body::Body;
use axum::http::Request;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use optipredict_core::config::AuthConfig;
use optipredict_server::auth::Claims;
use serde_json::Value;

const BOUNDARY: &str = "optipredict-test-boundary";

/// Sign a token with the test secret.
#[allow(dead_code)]
pub fn token_for(user_id: i64) -> String {
    sign_token(user_id, &AuthConfig::for_testing().jwt_secret, 3600)
}

/// Sign a token that expired an hour ago.
#[allow(dead_code)]
pub fn expired_token_for(user_id: i64) -> String {
    sign_token(user_id, &AuthConfig::for_testing().jwt_secret, -3600)
}

/// Sign a token with an explicit secret and lifetime in seconds.
pub fn sign_token(user_id: i64, secret: &str, ttl_secs: i64) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        id: user_id,
        exp: (now + ttl_secs) as u64,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// A CSV body with a header and `rows` data rows.
#[allow(dead_code)]
pub fn csv_rows(rows: usize) -> Vec<u8> {
    let mut data = String::from("timestamp,snr,rsrp,rsrq\n");
    for i in 0..rows {
        data.push_str(&format!("2024-01-01T00:{:02}:00,{},-{},-{}\n", i % 60, 10 + i % 5, 90 + i % 10, 8 + i % 3));
    }
    data.into_bytes()
}

/// Build a multipart body with one part per `(field, filename, data)`.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                         Content-Type: text/csv\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a single file to the batch endpoint.
#[allow(dead_code)]
pub fn upload_request(filename: &str, data: &[u8], token: Option<&str>) -> Request<Body> {
    multipart_request(&[("file", Some(filename), data)], token)
}

/// POST an arbitrary multipart body to the batch endpoint.
pub fn multipart_request(parts: &[(&str, Option<&str>, &[u8])], token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/predict-file")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// Exact length of a request body built from in-memory bytes.
#[allow(dead_code)]
pub fn multipart_body_len(request: &Request<Body>) -> u64 {
    use axum::body::HttpBody;
    request
        .body()
        .size_hint()
        .exact()
        .expect("in-memory body has an exact length")
}

/// Build a request with an optional JSON body and bearer token.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

/// An ML reply with `rows` result rows.
#[allow(dead_code)]
pub fn ml_prediction(rows: u64) -> Value {
    let results: Vec<Value> = (0..rows)
        .map(|i| serde_json::json!({"row": i, "throughput": 12.5}))
        .collect();
    serde_json::json!({
        "success": true,
        "message": "Prediksi berhasil",
        "total_rows": rows,
        "processed_rows": rows,
        "valid_rows": rows,
        "processing_time": 1.25,
        "results": results,
    })
}
