pub mod compose;
pub mod engine;
pub mod error;
pub mod image;
pub mod renderer;
pub mod template;

pub use engine::{Engine, EngineHandle, EngineLauncher, EngineLease, HtmlEngine, HtmlEngineLauncher};
pub use error::{RenderError, Result};
pub use image::{ImageInfo, ImageKind};
pub use renderer::{Document, PageRenderer, Renderer};
pub use template::{Template, TemplateStore};
