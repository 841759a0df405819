//! Job submission model and HTCondor artifact rendering.
//!
//! Given a [`JobSubmission`] and an existing staging directory, a
//! [`JobRenderer`] writes everything `condor_submit` and the remote job runner
//! need: the submission descriptor, the runtime configuration, the job as
//! JSON, and the auxiliary input/output ticket lists.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! use condor_jobs::JobRenderer;
//! use condor_jobs::JobSubmission;
//! use condor_jobs::RendererConfig;
//!
//! # fn main() -> condor_jobs::Result<()> {
//! let renderer = JobRenderer::new(RendererConfig::default())?;
//! let mut job: JobSubmission = serde_json::from_str("...").unwrap();
//! let settings: HashMap<String, String> = HashMap::new();
//! let submit_file = renderer.render(&mut job, &settings, Path::new("/tmp/job"))?;
//! println!("{}", submit_file.display());
//! # Ok(())
//! # }
//! ```

mod error;
mod model;
mod renderer;
mod settings;
mod templates;
pub mod units;

pub use error::*;
pub use model::*;
pub use renderer::*;
pub use settings::*;
pub use templates::SubmitDialect;
