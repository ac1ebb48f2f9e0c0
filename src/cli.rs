// Command-line surface. Argument types only; behaviour lives in `commands`.

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;

use crate::config::{API_URL_ENV, REGISTRY_ENV};
use crate::ui;

/// pxForge - AI-powered image editing CLI tool.
///
/// Upload images and apply transformations: resize, crop and rotate; color
/// adjustments; AI-powered cleanup (background, object and noise removal);
/// background replacement, prompt-based edits and watermarks.
#[derive(Parser, Debug)]
#[command(name = "pxforge", version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = API_URL_ENV)]
    pub api_url: Option<String>,

    /// Path of the local image registry file
    #[arg(long, global = true, env = REGISTRY_ENV)]
    pub registry: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Upload an image to the server
    Upload {
        /// Path to the image file to upload
        image_path: PathBuf,
    },
    /// List all uploaded image IDs from local registry
    List,
    /// Delete an image ID from local registry
    Delete {
        /// ID of the image to delete from registry
        image_id: String,
    },
    /// Download an image from a URL
    Download {
        /// Image URL to download from
        url: String,
        /// Path to save the downloaded image
        output_path: PathBuf,
    },
    #[command(flatten)]
    Transform(Transform),
}

/// Remote operations on an image that is already in the registry.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Resize an image to specified dimensions
    Resize {
        /// ID of the image to resize
        image_id: String,
        /// Target width in pixels
        #[arg(short, long)]
        width: u32,
        /// Target height in pixels
        #[arg(short = 'H', long)]
        height: u32,
    },
    /// Crop image to maintain specified aspect ratio
    AspectRatio {
        /// ID of the image to crop
        image_id: String,
        /// Aspect ratio (e.g., 16:9, 4:3)
        #[arg(short, long)]
        ratio: String,
    },
    /// Rotate an image by specified angle
    Rotate {
        /// ID of the image to rotate
        image_id: String,
        /// Rotation angle in degrees
        #[arg(short, long, allow_negative_numbers = true)]
        angle: i32,
    },
    /// Convert an image to black and white (grayscale)
    ToBw {
        /// ID of the image to convert
        image_id: String,
    },
    /// Convert an image to RGB color space
    ToRgb {
        /// ID of the image to convert
        image_id: String,
    },
    /// Adjust image contrast
    Contrast {
        /// ID of the image to adjust
        image_id: String,
    },
    /// Adjust image brightness
    Brightness {
        /// ID of the image to adjust
        image_id: String,
    },
    /// Remove background from an image using AI
    RemoveBg {
        /// ID of the image to process
        image_id: String,
    },
    /// Remove an object from an image using inpainting
    RemoveObject(RemoveObjectArgs),
    /// Remove noise and enhance image quality using AI upscaling
    RemoveNoise {
        /// ID of the image to process
        image_id: String,
    },
    /// Replace image background with a new background
    ReplaceBg {
        /// ID of the foreground image
        image_id: String,
        /// Path to the new background image
        bg_image_path: PathBuf,
    },
    /// Edit image using AI based on a text prompt
    PromptEdit {
        /// ID of the image to edit
        image_id: String,
        /// Edit instruction prompt
        #[arg(short, long)]
        prompt: String,
    },
    /// Add a text watermark to an image
    Watermark {
        /// ID of the image to watermark
        image_id: String,
        /// Watermark text
        #[arg(short, long)]
        text: String,
        /// Watermark position
        #[arg(short, long, value_enum, ignore_case = true, default_value_t = Position::BottomRight)]
        position: Position,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RemoveObjectArgs {
    /// ID of the image to process
    pub image_id: String,
    /// X coordinate of object center
    #[arg(long, allow_negative_numbers = true)]
    pub x: i64,
    /// Y coordinate of object center
    #[arg(long, allow_negative_numbers = true)]
    pub y: i64,
    /// Bounding box width in pixels
    #[arg(short, long, default_value_t = 100)]
    pub width: u32,
    /// Bounding box height in pixels
    #[arg(short = 'H', long, default_value_t = 100)]
    pub height: u32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Help sections, in display order. Commands are listed by name inside
/// each section.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("Basic Commands", &["upload", "list", "delete", "download"]),
    ("Resize & Transform", &["resize", "aspect-ratio", "rotate"]),
    ("Color Adjustments", &["to-bw", "to-rgb", "contrast", "brightness"]),
    ("AI-Powered Cleanup", &["remove-bg", "remove-object", "remove-noise"]),
    ("Advanced Editing", &["replace-bg", "prompt-edit", "watermark"]),
];

/// The clap command with the top-level help grouped by category.
pub fn command() -> clap::Command {
    let cmd = Cli::command();
    let sections = ui::render_categories(&cmd, CATEGORIES);
    let template = format!(
        "{{about-with-newline}}\n{{usage-heading}} {{usage}}\n\n\
         {sections}\nOptions:\n{{options}}{{after-help}}"
    );
    cmd.help_template(template)
}
