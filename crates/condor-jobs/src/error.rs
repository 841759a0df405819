//! Errors raised while preparing job artifacts.

use std::path::PathBuf;

use thiserror::Error;

/// An error from the job artifact renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// A template failed to compile.
    ///
    /// The renderer cannot be constructed when this happens.
    #[error("failed to parse the `{template}` template")]
    TemplateParse {
        /// The name of the template.
        template: &'static str,
        /// The underlying template error.
        #[source]
        source: minijinja::Error,
    },

    /// An artifact failed to render.
    #[error("failed to render the `{artifact}` artifact")]
    Render {
        /// The name of the artifact.
        artifact: &'static str,
        /// The underlying template error.
        #[source]
        source: minijinja::Error,
    },

    /// An artifact failed to be written to the staging directory.
    #[error("failed to write `{}`", .path.display())]
    Write {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The job submission failed to serialize.
    #[error("failed to serialize the job submission")]
    Serialize(#[source] serde_json::Error),

    /// The job submission has no steps.
    #[error("job `{0}` has no steps")]
    EmptySteps(String),
}

/// The result type for artifact rendering.
pub type Result<T> = std::result::Result<T, Error>;
