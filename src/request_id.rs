use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Makes sure every request carries an `x-request-id`, reusing the client's
/// when it sent one, and echoes it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let Ok(value) = HeaderValue::from_str(&request_id) else {
        return next.run(req).await;
    };
    req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());

    let mut response = next.run(req).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, value);
    response
}

/// Request id as set by [`request_id_middleware`], for span fields.
pub fn request_id_of<B>(req: &http::Request<B>) -> &str {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    // Echoes the id the handler sees so tests can compare it with the response header.
    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|req: Request| async move { request_id_of(&req).to_string() }),
            )
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn call(request: http::Request<Body>) -> (String, String) {
        let response = app().oneshot(request).await.unwrap();
        let header = response.headers()[REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn generated_id_reaches_handler_and_response() {
        let (header, seen) = call(http::Request::builder().uri("/").body(Body::empty()).unwrap()).await;
        assert_eq!(header, seen);
        assert!(Uuid::parse_str(&header).is_ok());
    }

    #[tokio::test]
    async fn client_id_is_kept() {
        let request = http::Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "trace-42")
            .body(Body::empty())
            .unwrap();
        let (header, seen) = call(request).await;
        assert_eq!(header, "trace-42");
        assert_eq!(seen, "trace-42");
    }

    #[test]
    fn missing_id_reads_unknown() {
        let request = http::Request::builder().body(()).unwrap();
        assert_eq!(request_id_of(&request), "unknown");
    }
}
