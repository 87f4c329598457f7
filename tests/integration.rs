use google_genai_nodes::ai::vertex::EndpointId;
use google_genai_nodes::ai::{MockImageSynthesisClient, MockTextClient, StaticBackends};
use google_genai_nodes::credentials::{CredentialSources, CredentialStore, API_KEY_PLACEHOLDER};
use google_genai_nodes::failure::TEXT_ERROR_MARKER;
use google_genai_nodes::image::codec::encode_png;
use google_genai_nodes::image::{decode_to_image, encode_from_image, ImageBatch, ImageTensor};
use google_genai_nodes::nodes::{NodeInputs, NodeOutput, NodeRegistry};
use google_genai_nodes::request::build_image_synthesis_request;
use google_genai_nodes::settings::Settings;
use google_genai_nodes::FailureKind;
use ndarray::{Array2, Array3, Array4};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PRIVATE_KEY: &str = include_str!("../data/test/service_account_key.pem");

fn png_bytes(value: u8) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(32, 24, image::Rgb([value; 3]));
    encode_png(&image).unwrap()
}

fn text_inputs(prompt: &str) -> NodeInputs {
    NodeRegistry::specs()[0]
        .default_inputs()
        .with_string("prompt", prompt)
}

fn imagen_inputs(prompt: &str) -> NodeInputs {
    NodeRegistry::specs()[2]
        .default_inputs()
        .with_string("prompt", prompt)
}

fn write_settings(dir: &TempDir, contents: &str) -> CredentialSources {
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, contents).unwrap();
    CredentialSources {
        settings: Settings::load(&config_path),
        env_api_key: None,
    }
}

#[test]
fn test_configure_key_client_runs_once() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(write_settings(
        &dir,
        "[API]\nGOOGLE_API_KEY = \"real-key\"\n",
    ));

    let readiness: Vec<bool> = (0..10).map(|_| store.configure_key_client()).collect();

    assert!(readiness.iter().all(|&ready| ready));
    assert_eq!(store.key_client_configurations(), 1);
}

#[tokio::test]
async fn test_placeholder_key_wins_over_environment() {
    let dir = TempDir::new().unwrap();
    let mut sources = write_settings(
        &dir,
        &format!("[API]\nGOOGLE_API_KEY = \"{}\"\n", API_KEY_PLACEHOLDER),
    );
    sources.env_api_key = Some("env-key".to_string());
    let store = Arc::new(CredentialStore::new(sources));

    assert!(store.resolve_key_credential().is_none());
    assert!(!store.configure_key_client());

    let registry = NodeRegistry::new(store);
    let output = registry
        .create("LLM_google")
        .unwrap()
        .run(&text_inputs("hello"))
        .await;
    assert!(output.as_text().unwrap().starts_with(TEXT_ERROR_MARKER));
}

#[test]
fn test_missing_settings_file_leaves_everything_unconfigured() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(CredentialSources {
        settings: Settings::load(&dir.path().join("absent.toml")),
        env_api_key: None,
    });

    assert!(!store.configure_key_client());
    assert!(store.get_service_account_client_and_endpoint().is_none());
}

#[test]
fn test_codec_round_trip_is_lossy_within_one_step() {
    let original = Array4::from_shape_fn((1, 5, 7, 3), |(_, y, x, c)| {
        ((y * 31 + x * 17 + c * 7) % 100) as f32 / 99.0
    });

    let image = decode_to_image(&ImageTensor::from(original.clone())).unwrap();
    let restored = encode_from_image(&image);

    for (a, b) in original.iter().zip(restored.as_array().iter()) {
        assert!((a - b).abs() <= 1.0 / 255.0, "{} vs {}", a, b);
    }
}

#[test]
fn test_shape_normalization() {
    let batched = ImageTensor::from(Array4::<f32>::zeros((1, 6, 4, 3)));
    let channel_first = ImageTensor::Float(Array3::<f32>::zeros((3, 6, 4)).into_dyn());
    let grayscale = ImageTensor::Float(Array2::<f32>::zeros((6, 4)).into_dyn());

    for tensor in [batched, channel_first, grayscale] {
        let image = decode_to_image(&tensor).unwrap();
        assert_eq!(image.dimensions(), (4, 6));
    }

    let short = Array4::from_shape_fn((1, 3, 4, 3), |(_, y, x, c)| {
        ((y * 4 + x) * 3 + c) as f32 / 35.0
    });
    let image = decode_to_image(&ImageTensor::from(short.clone())).unwrap();
    assert_eq!(image.dimensions(), (4, 3));
    let restored = encode_from_image(&image);
    assert_eq!(restored.as_array().shape(), short.shape());
    for (a, b) in short.iter().zip(restored.as_array().iter()) {
        assert!((a - b).abs() <= 1.0 / 255.0, "{} vs {}", a, b);
    }

    let unsupported = ImageTensor::Float(Array4::<f32>::zeros((2, 6, 4, 3)).into_dyn());
    let err = decode_to_image(&unsupported).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Conversion);
}

#[tokio::test]
async fn test_partial_success_keeps_decodable_images_in_order() {
    let client = Arc::new(
        MockImageSynthesisClient::new()
            .with_image_bytes(&png_bytes(0))
            .with_prediction(serde_json::json!({ "raiFilteredReason": "blocked" }))
            .with_image_bytes(&png_bytes(255)),
    );
    let endpoint = EndpointId::publisher_model("proj", "us-central1", "imagen-test");
    let registry = NodeRegistry::new(Arc::new(
        StaticBackends::new().with_image(client.clone(), endpoint),
    ));

    let output = registry
        .create("Imagen_google")
        .unwrap()
        .run(&imagen_inputs("a cat").with_int("num_images", 3))
        .await;

    let batch = output.as_image().unwrap();
    assert_eq!(batch.as_array().shape(), &[2, 24, 32, 3]);
    assert_eq!(batch.image(0)[[0, 0, 0]], 0.0);
    assert_eq!(batch.image(1)[[0, 0, 0]], 1.0);
    assert_eq!(client.get_call_count(), 1);
}

#[tokio::test]
async fn test_all_predictions_missing_degrades_to_placeholder() {
    let client = Arc::new(
        MockImageSynthesisClient::new()
            .with_prediction(serde_json::json!({}))
            .with_prediction(serde_json::json!({}))
            .with_prediction(serde_json::json!({})),
    );
    let endpoint = EndpointId::publisher_model("proj", "us-central1", "imagen-test");
    let registry = NodeRegistry::new(Arc::new(StaticBackends::new().with_image(client, endpoint)));

    let output = registry
        .create("Imagen_google")
        .unwrap()
        .run(&imagen_inputs("a cat"))
        .await;

    assert_eq!(output, NodeOutput::Image(ImageBatch::solid(512, 512, [0.0; 3])));
}

#[tokio::test]
async fn test_remote_failures_degrade_per_output_type() {
    let endpoint = EndpointId::publisher_model("proj", "us-central1", "imagen-test");
    let backends = StaticBackends::new()
        .with_text(Arc::new(
            MockTextClient::new().with_failure("connection reset".to_string()),
        ))
        .with_image(
            Arc::new(MockImageSynthesisClient::new().with_failure("deadline".to_string())),
            endpoint,
        );
    let registry = NodeRegistry::new(Arc::new(backends));

    let text = registry
        .create("LLM_google")
        .unwrap()
        .run(&text_inputs("hello").with_string("model", "gemini-1.5-pro"))
        .await;
    let text = text.as_text().unwrap();
    assert!(text.contains(TEXT_ERROR_MARKER));
    assert!(text.contains("gemini-1.5-pro"));

    let image = registry
        .create("Imagen_google")
        .unwrap()
        .run(&imagen_inputs("a cat"))
        .await;
    let batch = image.as_image().unwrap();
    assert_eq!(batch.as_array().shape(), &[1, 512, 512, 3]);
    assert!(batch.as_array().iter().all(|&v| v == 0.0));
}

#[test]
fn test_synthesis_request_scenario() {
    let request = build_image_synthesis_request("a cat", "", 1024, 1024, 2, 42).unwrap();
    let payload = serde_json::to_value(request.to_predict_request()).unwrap();

    assert_eq!(payload["parameters"]["sampleCount"], 2);
    assert_eq!(payload["parameters"]["width"], 1024);
    assert_eq!(payload["parameters"]["height"], 1024);
    assert_eq!(payload["parameters"]["seed"], 42);
    assert_eq!(payload["instances"][0]["prompt"], "a cat");
}

#[tokio::test]
async fn test_llm_node_end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "real-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Bonjour" }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(write_settings(
        &dir,
        "[API]\nGOOGLE_API_KEY = \"real-key\"\n",
    ))
    .with_gemini_base_url(server.uri());
    let registry = NodeRegistry::new(Arc::new(store));

    let output = registry
        .create("LLM_google")
        .unwrap()
        .run(&text_inputs("Say hello in French"))
        .await;

    assert_eq!(output.as_text(), Some("Bonjour"));
}

#[tokio::test]
async fn test_imagen_node_end_to_end_over_http() {
    use base64::Engine as _;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(
            r"^/v1/projects/proj/locations/us-central1/publishers/google/models/[^/]+:predict$",
        ))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "predictions": [{
                "bytesBase64Encoded": base64::engine::general_purpose::STANDARD.encode(png_bytes(200)),
                "mimeType": "image/png"
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let key_file = serde_json::json!({
        "type": "service_account",
        "private_key_id": "key-1",
        "private_key": TEST_PRIVATE_KEY,
        "client_email": "nodes@proj.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri()),
    });
    fs::write(dir.path().join("sa.json"), key_file.to_string()).unwrap();
    let store = CredentialStore::new(write_settings(
        &dir,
        "[VERTEX_AI]\nPROJECT_ID = \"proj\"\nLOCATION = \"us-central1\"\nSERVICE_ACCOUNT_FILE = \"sa.json\"\n",
    ))
    .with_vertex_base_url(server.uri());
    let registry = NodeRegistry::new(Arc::new(store));
    let node = registry.create("Imagen_google").unwrap();

    for _ in 0..2 {
        let output = node.run(&imagen_inputs("a lighthouse")).await;
        let batch = output.as_image().unwrap();
        assert_eq!(batch.as_array().shape(), &[1, 24, 32, 3]);
    }
}
