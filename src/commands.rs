// Command handlers. Every handler returns an `Outcome` instead of printing;
// `ui::present` turns it into terminal output and an exit code.
//
// The remote transformations share one shape (check the registry, call one
// endpoint, read the `success` flag), so each is declared as an `Action` and
// run by `run_action`.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ActionResponse, ApiClient, ApiError, ApiRequest, TimeoutClass};
use crate::cli::{Commands, RemoveObjectArgs, Transform};
use crate::config::Config;
use crate::registry::Registry;

/// What a command needs at run time: the registry handle and the backend
/// client, both built from the resolved `Config`.
pub struct AppContext {
    pub registry: Registry,
    pub api: ApiClient,
}

impl AppContext {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(AppContext {
            registry: Registry::new(&config.registry_path),
            api: ApiClient::new(&config.base_url)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Image ID {0} not found in registry")]
    NotInRegistry(String),

    /// `delete` of an ID the registry does not hold.
    #[error("{0} not found in registry")]
    NotRegistered(String),

    #[error("Image file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The backend answered but reported `success: false`.
    #[error("{0}")]
    Backend(String),

    /// Transport failure, non-2xx status or unreadable body.
    #[error("Failed to {action}: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Failed to update local registry {}: {source}", path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lines printed on success, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

pub type Outcome = Result<Report, CommandError>;

/// Receives the "working on it" line of a command. Commands that fail local
/// validation never send one.
pub trait Progress {
    fn begin(&mut self, message: &str);
}

impl Progress for () {
    fn begin(&mut self, _message: &str) {}
}

/// A remote transformation of a registered image.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub image_id: String,
    pub request: ApiRequest,
    pub progress: String,
    pub success: &'static str,
    /// Completes "Failed to ..." when the request itself fails.
    pub failure: &'static str,
}

fn on_image(endpoint: &str, image_id: &str) -> ApiRequest {
    ApiRequest::post(endpoint).field("image_id", image_id)
}

impl Transform {
    /// Endpoint, payload, timeout and messages for this transformation.
    pub fn action(self) -> Action {
        match self {
            Transform::Resize {
                image_id,
                width,
                height,
            } => Action {
                request: on_image("/resize", &image_id)
                    .field("width", width)
                    .field("height", height),
                progress: format!("Resizing image to {width}x{height}..."),
                success: "Image resized successfully!",
                failure: "resize image",
                image_id,
            },
            Transform::AspectRatio { image_id, ratio } => Action {
                request: on_image("/aspect-ratio", &image_id)
                    .field("aspect_ratio", ratio.as_str()),
                progress: format!("Applying aspect ratio {ratio}..."),
                success: "Aspect ratio applied successfully!",
                failure: "apply aspect ratio",
                image_id,
            },
            Transform::Rotate { image_id, angle } => Action {
                request: on_image("/rotate", &image_id)
                    .field("angle", i64::from(angle)),
                progress: format!("Rotating image by {angle} degrees..."),
                success: "Image rotated successfully!",
                failure: "rotate image",
                image_id,
            },
            Transform::ToBw { image_id } => Action {
                request: on_image("/toBW", &image_id),
                progress: "Converting image to black and white...".into(),
                success: "Image converted to B&W successfully!",
                failure: "convert image",
                image_id,
            },
            Transform::ToRgb { image_id } => Action {
                request: on_image("/toRGB", &image_id),
                progress: "Converting image to RGB...".into(),
                success: "Image converted to RGB successfully!",
                failure: "convert image",
                image_id,
            },
            Transform::Contrast { image_id } => Action {
                request: on_image("/contrast", &image_id),
                progress: "Adjusting image contrast...".into(),
                success: "Contrast adjusted successfully!",
                failure: "adjust contrast",
                image_id,
            },
            Transform::Brightness { image_id } => Action {
                request: on_image("/brightness", &image_id),
                progress: "Adjusting image brightness...".into(),
                success: "Brightness adjusted successfully!",
                failure: "adjust brightness",
                image_id,
            },
            Transform::RemoveBg { image_id } => Action {
                request: on_image("/remove-background", &image_id)
                    .timeout(TimeoutClass::Extended),
                progress: "Removing background (this may take a while)...".into(),
                success: "Background removed successfully!",
                failure: "remove background",
                image_id,
            },
            Transform::RemoveObject(RemoveObjectArgs {
                image_id,
                x,
                y,
                width,
                height,
            }) => Action {
                request: on_image("/remove-object", &image_id)
                    .field("x", x)
                    .field("y", y)
                    .field("width", width)
                    .field("height", height)
                    .timeout(TimeoutClass::Extended),
                progress: format!("Removing object at ({x}, {y}) with size {width}x{height}..."),
                success: "Object removed successfully!",
                failure: "remove object",
                image_id,
            },
            Transform::RemoveNoise { image_id } => Action {
                request: on_image("/remove-noise", &image_id)
                    .timeout(TimeoutClass::Extended),
                progress: "Removing noise and enhancing quality (this may take a while)...".into(),
                success: "Noise removed and image enhanced successfully!",
                failure: "remove noise",
                image_id,
            },
            Transform::ReplaceBg {
                image_id,
                bg_image_path,
            } => Action {
                request: on_image("/replace-bg", &image_id)
                    .file("bg", bg_image_path)
                    .timeout(TimeoutClass::Extended),
                progress: "Replacing background (this may take a while)...".into(),
                success: "Background replaced successfully!",
                failure: "replace background",
                image_id,
            },
            Transform::PromptEdit { image_id, prompt } => Action {
                request: on_image("/prompt-edit", &image_id)
                    .field("prompt", prompt.as_str())
                    .timeout(TimeoutClass::Extended),
                progress: format!(
                    "Editing image with prompt: '{prompt}' (this may take a while)..."
                ),
                success: "Image edited successfully!",
                failure: "edit image",
                image_id,
            },
            // The backend only accepts form fields here.
            Transform::Watermark {
                image_id,
                text,
                position,
            } => Action {
                request: on_image("/watermark", &image_id)
                    .field("watermark", text.as_str())
                    .field("position", position.as_str())
                    .form_data(),
                progress: format!("Adding watermark '{text}' at {position}..."),
                success: "Watermark added successfully!",
                failure: "add watermark",
                image_id,
            },
        }
    }
}

/// Dispatch one parsed command.
pub fn execute(command: Commands, ctx: &AppContext, progress: &mut dyn Progress) -> Outcome {
    match command {
        Commands::Upload { image_path } => upload(ctx, &image_path, progress),
        Commands::List => Ok(list(&ctx.registry, progress)),
        Commands::Delete { image_id } => delete(&ctx.registry, &image_id),
        Commands::Download { url, output_path } => download(ctx, &url, &output_path, progress),
        Commands::Transform(transform) => run_action(ctx, transform.action(), progress),
    }
}

/// Check the registry, call the endpoint, and turn the response into a
/// report. Unknown IDs never reach the network.
pub fn run_action(ctx: &AppContext, action: Action, progress: &mut dyn Progress) -> Outcome {
    ensure_registered(&ctx.registry, &action.image_id)?;
    progress.begin(&action.progress);

    let response = ctx
        .api
        .action(&action.request)
        .map_err(|e| request_error(action.failure, e))?;

    match response {
        ActionResponse::Success { image_url } => {
            info!("{} done for {}", action.request.endpoint, action.image_id);
            Ok(Report::new()
                .line(action.success)
                .line(url_line(image_url.as_deref())))
        }
        ActionResponse::Failure { message } => Err(CommandError::Backend(message)),
    }
}

pub fn upload(ctx: &AppContext, path: &Path, progress: &mut dyn Progress) -> Outcome {
    // Checked here as well so a bad path never shows the progress line.
    if !path.exists() {
        return Err(CommandError::FileNotFound(path.to_path_buf()));
    }
    progress.begin(&format!("Uploading image from {}...", path.display()));

    let response = ctx
        .api
        .upload(path)
        .map_err(|e| request_error("upload image", e))?;
    let Some(image_id) = response.image_id.filter(|id| !id.is_empty()) else {
        let message = response
            .error
            .unwrap_or_else(|| "Upload response did not include an image ID".into());
        return Err(CommandError::Backend(message));
    };

    let added = ctx
        .registry
        .register(&image_id)
        .map_err(|source| CommandError::Registry {
            path: ctx.registry.path().to_path_buf(),
            source,
        })?;
    debug!("Registry entry for {}: added={}", image_id, added);

    Ok(Report::new()
        .line("Image uploaded successfully!")
        .line(format!("Image ID: {image_id}"))
        .line(url_line(response.image_url.as_deref())))
}

pub fn list(registry: &Registry, progress: &mut dyn Progress) -> Report {
    progress.begin("Fetching list of uploaded images...");
    let ids = registry.load();
    if ids.is_empty() {
        return Report::new().line("No images found in local registry.");
    }
    let mut report = Report::new().line(format!("Found {} image(s):", ids.len()));
    for (idx, id) in ids.iter().enumerate() {
        report = report.line(format!("{}. {}", idx + 1, id));
    }
    report
}

pub fn delete(registry: &Registry, image_id: &str) -> Outcome {
    let removed = registry
        .remove(image_id)
        .map_err(|source| CommandError::Registry {
            path: registry.path().to_path_buf(),
            source,
        })?;
    if !removed {
        return Err(CommandError::NotRegistered(image_id.to_string()));
    }
    Ok(Report::new().line(format!("Deleted {image_id} from local registry")))
}

pub fn download(
    ctx: &AppContext,
    url: &str,
    output: &Path,
    progress: &mut dyn Progress,
) -> Outcome {
    progress.begin(&format!("Downloading image from {url}..."));
    ctx.api
        .download(url, output)
        .map_err(|e| request_error("download image", e))?;
    Ok(Report::new().line(format!("Image saved to {}", output.display())))
}

fn ensure_registered(registry: &Registry, image_id: &str) -> Result<(), CommandError> {
    if registry.contains(image_id) {
        Ok(())
    } else {
        Err(CommandError::NotInRegistry(image_id.to_string()))
    }
}

fn request_error(action: &'static str, err: ApiError) -> CommandError {
    match err {
        ApiError::FileNotFound(path) => CommandError::FileNotFound(path),
        source => CommandError::Request { action, source },
    }
}

fn url_line(url: Option<&str>) -> String {
    format!("URL: {}", url.unwrap_or("(not provided)"))
}
