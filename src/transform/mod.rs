// src/transform/mod.rs

//! Transform adapters.
//!
//! Each adapter wraps one file-processing tool behind the [`Transform`]
//! trait: it takes the whole file set of a task and returns a new one, or a
//! [`ToolError`] with the tool's diagnostic. Adapters hold only their
//! configuration, never state from a previous invocation.
//!
//! - [`template`]: minijinja page rendering.
//! - [`links`]: template-extension rewriting in `href`/`src`.
//! - [`styles`]: Sass compilation via grass.
//! - [`prefix`]: vendor prefixing.
//! - [`minify`]: CSS / JS minification.
//! - [`order`], [`concat`], [`rename`]: file-set reshaping.

use std::fmt::Debug;
use std::path::Path;

use anyhow::Result;

use crate::config::TransformConfig;
use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;

pub mod concat;
pub mod links;
pub mod minify;
pub mod order;
pub mod prefix;
pub mod rename;
pub mod styles;
pub mod template;

pub use concat::Concat;
pub use links::RewriteLinks;
pub use minify::{MinifyCss, MinifyJs};
pub use order::Order;
pub use prefix::Autoprefix;
pub use rename::Rename;
pub use styles::SassCompile;
pub use template::TemplateRender;

/// A stateless file-set transform.
pub trait Transform: Send + Sync + Debug {
    /// Short adapter name used in logs and errors.
    fn name(&self) -> &str;

    fn apply(&self, files: Vec<FileRecord>) -> std::result::Result<Vec<FileRecord>, ToolError>;
}

/// Build the adapter for one `[[task.<name>.transform]]` entry.
///
/// Relative directories in the entry (template partials, Sass load paths)
/// are resolved against `root`.
pub fn build_transform(cfg: &TransformConfig, root: &Path) -> Result<Box<dyn Transform>> {
    let transform: Box<dyn Transform> = match cfg {
        TransformConfig::Template {
            pretty,
            partials,
            extension,
            context,
        } => Box::new(TemplateRender::new(
            *pretty,
            partials.as_ref().map(|p| root.join(p)),
            extension.clone(),
            context.clone(),
        )),
        TransformConfig::RewriteLinks { from, to, pretty } => {
            Box::new(RewriteLinks::new(from.clone(), to.clone(), *pretty))
        }
        TransformConfig::Sass { style, load_paths } => Box::new(SassCompile::new(
            *style,
            root.to_path_buf(),
            load_paths.iter().map(|p| root.join(p)).collect(),
        )),
        TransformConfig::Autoprefix => Box::new(Autoprefix::new()),
        TransformConfig::MinifyCss => Box::new(MinifyCss),
        TransformConfig::MinifyJs => Box::new(MinifyJs),
        TransformConfig::Order { precedence } => Box::new(Order::new(precedence)?),
        TransformConfig::Concat { file } => Box::new(Concat::new(file.clone())),
        TransformConfig::Rename { to } => Box::new(Rename::new(to.clone())),
    };
    Ok(transform)
}
