use crate::{model::ModelService, pipeline, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::instrument;

#[instrument(skip(state, payload))]
pub async fn predict_image<M: ModelService>(
    State(state): State<AppState<M>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(payload)) = payload else {
        return missing_image_response();
    };
    let Some(image_base64) = payload.get("image").and_then(Value::as_str) else {
        return missing_image_response();
    };

    match pipeline::predict(
        state.model.as_deref(),
        &state.assets,
        &state.model_config,
        image_base64,
    ) {
        Ok(prediction) => {
            tracing::debug!(
                "Predicted {} with confidence {:.3}",
                prediction.predicted_label,
                prediction.confidence
            );
            (StatusCode::OK, Json(prediction)).into_response()
        }
        Err(e) => {
            tracing::error!("Prediction error: {}", e);
            e.into_response()
        }
    }
}

fn missing_image_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "No image data provided in JSON." })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{test_router, MockModelService};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use http_body_util::BodyExt;
    use image::{ImageBuffer, Rgb};
    use serde_json::Value;
    use std::io::Cursor;
    use tower::ServiceExt;

    fn png_payload() -> String {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(32, 32, Rgb([0, 200, 100]));
        let mut image_data: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut image_data);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        BASE64.encode(cursor.get_ref())
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_routes_serve_html() {
        for uri in ["/", "/predict"] {
            let router = test_router(Some(MockModelService { logits: vec![1.0] }));
            let response = router
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn post_without_image_key_returns_400() {
        let router = test_router(Some(MockModelService { logits: vec![1.0] }));
        let response = router.oneshot(json_request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No image data provided in JSON.");
    }

    #[tokio::test]
    async fn post_with_unparseable_body_returns_400() {
        let router = test_router(Some(MockModelService { logits: vec![1.0] }));
        let response = router.oneshot(json_request("not json at all")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No image data provided in JSON.");
    }

    #[tokio::test]
    async fn post_with_invalid_base64_returns_500_with_error_key() {
        let router = test_router(Some(MockModelService { logits: vec![1.0] }));
        let response = router
            .oneshot(json_request(r#"{"image": "not-base64!!"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn post_without_loaded_model_returns_fixed_500() {
        let router = test_router(None);
        let body = format!(r#"{{"image": "{}"}}"#, png_payload());
        let response = router.oneshot(json_request(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "AI model not loaded. Please check server logs.");
    }

    #[tokio::test]
    async fn post_with_valid_image_returns_prediction() {
        let router = test_router(Some(MockModelService {
            logits: vec![0.1, 0.2, 5.0],
        }));
        let body = format!(r#"{{"image": "{}"}}"#, png_payload());
        let response = router.oneshot(json_request(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["predicted_label"], "plastic");
        assert_eq!(body["category"], "Recyclable");
        assert_eq!(body["instructions"], "Rinse and squash.");
        assert_eq!(body["bin_color"], "yellow");
        let confidence = body["confidence"].as_f64().unwrap();
        assert!(confidence > 0.9 && confidence <= 1.0);
    }
}
