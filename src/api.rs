// API client module: a small blocking HTTP client that talks to the image
// backend. Every command issues at most one request, so the client stays
// synchronous and keeps no state beyond the base URL.

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while talking to the backend. None of these are printed
/// here; command handlers translate them into user-facing messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Image file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Non-2xx status. `body` is whatever the server sent back, possibly empty.
    #[error("{status} - {body}")]
    Status { status: StatusCode, body: String },

    /// Connection failures, timeouts and unreadable bodies.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Per-call timeout classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Ordinary backend calls.
    Baseline,
    /// AI jobs that are expected to run for minutes.
    Extended,
    /// Direct content fetches.
    Short,
}

impl TimeoutClass {
    pub fn duration(self) -> Duration {
        match self {
            TimeoutClass::Baseline => Duration::from_secs(300),
            TimeoutClass::Extended => Duration::from_secs(600),
            TimeoutClass::Short => Duration::from_secs(60),
        }
    }
}

/// How a request body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `multipart/form-data`
    Multipart,
}

impl Encoding {
    /// Files always force multipart. Without files, `use_form_data` picks a
    /// URL-encoded form over a JSON document; some endpoints (watermark)
    /// only accept form fields.
    pub fn select(has_files: bool, use_form_data: bool) -> Self {
        match (has_files, use_form_data) {
            (true, _) => Encoding::Multipart,
            (false, true) => Encoding::Form,
            (false, false) => Encoding::Json,
        }
    }
}

/// A scalar request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Text(String),
    Int(i64),
}

impl Field {
    fn to_json(&self) -> Value {
        match self {
            Field::Text(s) => Value::String(s.clone()),
            Field::Int(n) => Value::from(*n),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Field::Text(s) => s.clone(),
            Field::Int(n) => n.to_string(),
        }
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

impl From<i64> for Field {
    fn from(n: i64) -> Self {
        Field::Int(n)
    }
}

impl From<u32> for Field {
    fn from(n: u32) -> Self {
        Field::Int(n.into())
    }
}

/// A local file sent as a multipart part named `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: &'static str,
    pub path: PathBuf,
}

/// Everything needed to issue one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub method: Method,
    pub fields: Vec<(&'static str, Field)>,
    pub files: Vec<Attachment>,
    pub timeout: TimeoutClass,
    pub use_form_data: bool,
}

impl ApiRequest {
    /// A POST to `endpoint` with no payload and the baseline timeout.
    pub fn post(endpoint: impl Into<String>) -> Self {
        ApiRequest {
            endpoint: endpoint.into(),
            method: Method::POST,
            fields: Vec::new(),
            files: Vec::new(),
            timeout: TimeoutClass::Baseline,
            use_form_data: false,
        }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<Field>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn file(mut self, field: &'static str, path: impl Into<PathBuf>) -> Self {
        self.files.push(Attachment {
            field,
            path: path.into(),
        });
        self
    }

    pub fn timeout(mut self, timeout: TimeoutClass) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn form_data(mut self) -> Self {
        self.use_form_data = true;
        self
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::select(!self.files.is_empty(), self.use_form_data)
    }

    fn json_body(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }

    fn form_pairs(&self) -> Vec<(&'static str, String)> {
        self.fields
            .iter()
            .map(|(name, value)| (*name, value.to_text()))
            .collect()
    }
}

/// Outcome of an action endpoint, decided by its `success` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResponse {
    Success { image_url: Option<String> },
    Failure { message: String },
}

impl ActionResponse {
    /// Only a literal `"success": true` counts as success. A failure without
    /// an `error` field gets a generic message.
    pub fn from_value(value: &Value) -> Self {
        if value.get("success").and_then(Value::as_bool) == Some(true) {
            let image_url = value
                .get("image_url")
                .and_then(Value::as_str)
                .map(str::to_string);
            return ActionResponse::Success { image_url };
        }
        let message = match value.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        };
        ActionResponse::Failure { message }
    }
}

/// Body returned by `/upload`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub image_id: Option<String>,
    pub image_url: Option<String>,
    pub error: Option<String>,
}

impl UploadResponse {
    /// Each field is read on its own, so an odd `error` never hides a usable
    /// `image_id`. Numeric IDs are kept as their decimal text; a body that is
    /// not an object yields no fields at all.
    pub fn from_value(value: &Value) -> Self {
        UploadResponse {
            image_id: value.get("image_id").and_then(scalar_text),
            image_url: value.get("image_url").and_then(scalar_text),
            error: match value.get("error") {
                Some(Value::Null) | None => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            },
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Blocking client bound to one backend base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue `req` against the backend and parse the JSON body. Attachments
    /// are checked before anything is sent.
    pub fn request(&self, req: &ApiRequest) -> Result<Value, ApiError> {
        for attachment in &req.files {
            if !attachment.path.exists() {
                return Err(ApiError::FileNotFound(attachment.path.clone()));
            }
        }

        let url = format!("{}{}", self.base_url, req.endpoint);
        let encoding = req.encoding();
        debug!("{} {} ({:?}, timeout {:?})", req.method, url, encoding, req.timeout.duration());

        let builder = self
            .client
            .request(req.method.clone(), &url)
            .timeout(req.timeout.duration());
        let builder = match encoding {
            Encoding::Json => builder.json(&req.json_body()),
            Encoding::Form => builder.form(&req.form_pairs()),
            Encoding::Multipart => builder.multipart(multipart_form(req)?),
        };

        let res = check_status(builder.send()?)?;
        let body: Value = res.json()?;
        debug!("{} answered {}", url, body);
        Ok(body)
    }

    /// Call an action endpoint and interpret its `success` flag.
    pub fn action(&self, req: &ApiRequest) -> Result<ActionResponse, ApiError> {
        let body = self.request(req)?;
        Ok(ActionResponse::from_value(&body))
    }

    /// Upload a local image to `/upload` as the multipart part `image`.
    pub fn upload(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let req = ApiRequest::post("/upload").file("image", path);
        let body = self.request(&req)?;
        let parsed = UploadResponse::from_value(&body);
        info!("Uploaded {} as {:?}", path.display(), parsed.image_id);
        Ok(parsed)
    }

    /// Fetch `url` (any host) and write the raw bytes to `output`. Returns
    /// the number of bytes written.
    pub fn download(&self, url: &str, output: &Path) -> Result<u64, ApiError> {
        debug!("GET {}", url);
        let res = self
            .client
            .get(url)
            .timeout(TimeoutClass::Short.duration())
            .send()?;
        let bytes = check_status(res)?.bytes()?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ApiError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(output, &bytes).map_err(|source| ApiError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        info!("Wrote {} bytes to {}", bytes.len(), output.display());
        Ok(bytes.len() as u64)
    }
}

fn check_status(res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    Err(ApiError::Status {
        status,
        body: body.trim().to_string(),
    })
}

fn multipart_form(req: &ApiRequest) -> Result<multipart::Form, ApiError> {
    let mut form = multipart::Form::new();
    for (name, value) in req.form_pairs() {
        form = form.text(name, value);
    }
    for attachment in &req.files {
        let file = File::open(&attachment.path).map_err(|source| ApiError::Read {
            path: attachment.path.clone(),
            source,
        })?;
        let file_name = attachment
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        let part = multipart::Part::reader(file).file_name(file_name);
        form = form.part(attachment.field, part);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(&server.url()).unwrap()
    }

    #[test]
    fn encoding_selection() {
        assert_eq!(Encoding::select(true, false), Encoding::Multipart);
        assert_eq!(Encoding::select(true, true), Encoding::Multipart);
        assert_eq!(Encoding::select(false, true), Encoding::Form);
        assert_eq!(Encoding::select(false, false), Encoding::Json);
    }

    #[test]
    fn timeout_classes() {
        assert_eq!(TimeoutClass::Baseline.duration(), Duration::from_secs(300));
        assert_eq!(TimeoutClass::Extended.duration(), Duration::from_secs(600));
        assert_eq!(TimeoutClass::Short.duration(), Duration::from_secs(60));
    }

    #[test]
    fn request_builder_defaults_to_json_post() {
        let req = ApiRequest::post("/toBW").field("image_id", "abc");
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.timeout, TimeoutClass::Baseline);
        assert_eq!(req.encoding(), Encoding::Json);
        assert_eq!(req.form_data().encoding(), Encoding::Form);
    }

    #[test]
    fn action_response_success() {
        let body = json!({"success": true, "image_url": "https://x/y.png"});
        let resp = ActionResponse::from_value(&body);
        assert_eq!(
            resp,
            ActionResponse::Success {
                image_url: Some("https://x/y.png".into())
            }
        );
    }

    #[test]
    fn action_response_failure_uses_error_field() {
        let resp = ActionResponse::from_value(&json!({"success": false, "error": "bad dims"}));
        assert_eq!(
            resp,
            ActionResponse::Failure {
                message: "bad dims".into()
            }
        );
    }

    #[test]
    fn action_response_without_flag_is_failure() {
        let resp = ActionResponse::from_value(&json!({"image_url": "https://x/y.png"}));
        assert_eq!(
            resp,
            ActionResponse::Failure {
                message: "Unknown error".into()
            }
        );
    }

    #[test]
    fn upload_response_reads_fields_independently() {
        let resp = UploadResponse::from_value(&json!({
            "image_id": "img-9",
            "image_url": "https://cdn/img-9.png",
            "error": {"code": 0}
        }));
        assert_eq!(resp.image_id.as_deref(), Some("img-9"));
        assert_eq!(resp.image_url.as_deref(), Some("https://cdn/img-9.png"));
        assert_eq!(resp.error.as_deref(), Some(r#"{"code":0}"#));

        let numeric = UploadResponse::from_value(&json!({"image_id": 42}));
        assert_eq!(numeric.image_id.as_deref(), Some("42"));

        assert_eq!(UploadResponse::from_value(&json!(["img-1"])), UploadResponse::default());
        assert_eq!(UploadResponse::from_value(&json!("img-1")), UploadResponse::default());
    }

    #[test]
    fn json_request_sends_json_document() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/resize")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"image_id": "abc", "width": 640, "height": 480})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "image_url": "https://x/y.png"}"#)
            .create();

        let req = ApiRequest::post("/resize")
            .field("image_id", "abc")
            .field("width", 640u32)
            .field("height", 480u32);
        let body = client_for(&server).request(&req).unwrap();

        mock.assert();
        assert_eq!(body["image_url"], "https://x/y.png");
    }

    #[test]
    fn form_flag_sends_urlencoded_fields() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/watermark")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("image_id".into(), "abc".into()),
                Matcher::UrlEncoded("watermark".into(), "hello world".into()),
                Matcher::UrlEncoded("position".into(), "top-left".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"success": true, "image_url": "u"}"#)
            .create();

        let req = ApiRequest::post("/watermark")
            .field("image_id", "abc")
            .field("watermark", "hello world")
            .field("position", "top-left")
            .form_data();
        client_for(&server).request(&req).unwrap();
        mock.assert();
    }

    #[test]
    fn files_force_multipart_even_with_form_flag() {
        let dir = tempfile::tempdir().unwrap();
        let bg = dir.path().join("bg.png");
        fs::write(&bg, b"not really a png").unwrap();

        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/replace-bg")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image_id""#.into()),
                Matcher::Regex(r#"name="bg"; filename="bg.png""#.into()),
                Matcher::Regex("not really a png".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"success": true, "image_url": "u"}"#)
            .create();

        let req = ApiRequest::post("/replace-bg")
            .field("image_id", "abc")
            .file("bg", &bg)
            .form_data();
        client_for(&server).request(&req).unwrap();
        mock.assert();
    }

    #[test]
    fn missing_attachment_fails_before_sending() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/upload").expect(0).create();

        let err = client_for(&server)
            .upload(Path::new("/definitely/not/here.png"))
            .unwrap_err();

        mock.assert();
        assert!(matches!(err, ApiError::FileNotFound(_)));
        assert_eq!(err.to_string(), "Image file not found: /definitely/not/here.png");
    }

    #[test]
    fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/rotate")
            .with_status(500)
            .with_body("boom")
            .create();

        let err = client_for(&server)
            .request(&ApiRequest::post("/rotate"))
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn upload_parses_id_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("cat.jpg");
        fs::write(&img, b"jpeg bytes").unwrap();

        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/upload")
            .match_body(Matcher::Regex(r#"name="image"; filename="cat.jpg""#.into()))
            .with_status(200)
            .with_body(r#"{"image_id": "id-42", "image_url": "https://cdn/id-42.jpg"}"#)
            .create();

        let resp = client_for(&server).upload(&img).unwrap();
        mock.assert();
        assert_eq!(resp.image_id.as_deref(), Some("id-42"));
        assert_eq!(resp.image_url.as_deref(), Some("https://cdn/id-42.jpg"));
    }

    #[test]
    fn download_writes_bytes_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b").join("out.png");

        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/files/out.png")
            .with_status(200)
            .with_body(vec![0u8, 1, 2, 3, 255])
            .create();

        let url = format!("{}/files/out.png", server.url());
        let written = client_for(&server).download(&url, &out).unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read(&out).unwrap(), vec![0u8, 1, 2, 3, 255]);
    }

    #[test]
    fn download_status_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.png");

        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing").with_status(404).create();

        let url = format!("{}/missing", server.url());
        let err = client_for(&server).download(&url, &out).unwrap_err();
        assert!(matches!(err, ApiError::Status { .. }));
        assert!(!out.exists());
    }
}
