//! Rendering of the job artifacts into a staging directory.
//!
//! The staging directory layout produced for a job is:
//!
//! ```text
//! <dir>/
//! ├─ iplant.cmd       # The HTCondor submission descriptor
//! ├─ config           # The runtime configuration for the job runner
//! ├─ job              # The job submission as JSON
//! ├─ output_ticket    # Only when the output directory has a ticket
//! ├─ input_tickets    # Only when some inputs have tickets
//! ├─ input_path_list  # Only when some inputs have no ticket
//! ├─ irods-config     # Written by the caller before `condor_submit` runs
//! ```

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::path::absolute;

use minijinja::AutoEscape;
use minijinja::Environment;
use minijinja::context;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::ConfigProvider;
use crate::Error;
use crate::JobSubmission;
use crate::Result;
use crate::SubmitDialect;
use crate::templates;
use crate::units::condor_bytes;
use crate::units::format_cores;
use crate::units::sge_bytes;

/// The name of the submission descriptor file.
pub const SUBMIT_FILE_NAME: &str = "iplant.cmd";

/// The name of the runtime configuration file.
pub const JOB_CONFIG_FILE_NAME: &str = "config";

/// The name of the job submission JSON file.
pub const JOB_FILE_NAME: &str = "job";

/// The name of the input path list file.
pub const INPUT_PATH_LIST_FILE_NAME: &str = "input_path_list";

/// The name of the input tickets file.
pub const INPUT_TICKETS_FILE_NAME: &str = "input_tickets";

/// The name of the output ticket file.
pub const OUTPUT_TICKET_FILE_NAME: &str = "output_ticket";

/// The settings key holding the header line of the input path list.
const PATH_LIST_HEADER_KEY: &str = "path_list.file_identifier";

/// The settings key holding the header line of the ticket lists.
const TICKETS_PATH_LIST_HEADER_KEY: &str = "tickets_path_list.file_identifier";

/// Configuration of the job renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RendererConfig {
    /// The dialect of the submission descriptor.
    ///
    /// Defaults to `grid_sge`.
    #[serde(default)]
    pub submit_dialect: SubmitDialect,
    /// The minimum per-slot memory, in bytes, requested from SGE.
    ///
    /// Only used by the `grid_sge` dialect. A value of `0` (the default)
    /// applies no minimum.
    #[serde(default)]
    pub memory_floor: i64,
}

/// The values available to the submission descriptor template.
#[derive(Debug, Serialize)]
struct SubmissionContext<'a> {
    /// The invocation identifier.
    invocation_id: &'a str,
    /// The submitting user.
    submitter: &'a str,
    /// The accounting group, defaulted when the job has none.
    accounting_group: &'a str,
    /// The user groups as a ClassAd list.
    user_groups: String,
    /// The concurrency limit name of the submitting user.
    user_id_for_submission: String,
    /// The executable of the first step.
    exe_name: &'a str,
    /// The directory of the first step's executable.
    exe_path: &'a str,
    /// The requested memory in bytes, or `0`.
    memory_request: i64,
    /// The requested cores, or `0`.
    cpu_request: f32,
    /// The requested cores as written in submit files.
    cpus: String,
    /// The requested cores rounded up to a whole core.
    whole_cpus: u64,
    /// The requested scratch disk in bytes, or `0`.
    disk_request: i64,
    /// The minimum per-slot memory in bytes.
    memory_floor: i64,
    /// The output ticket file name, if written.
    output_ticket_file: &'a str,
    /// The input tickets file name, if written.
    input_tickets_file: &'a str,
    /// The input path list file name, if written.
    input_path_list_file: &'a str,
}

/// The values available to the runtime configuration template.
#[derive(Debug, Serialize)]
struct JobConfigContext {
    /// The AMQP broker URI.
    amqp_uri: String,
    /// The AMQP exchange name.
    amqp_exchange_name: String,
    /// The AMQP exchange type.
    amqp_exchange_type: String,
    /// The base iRODS path.
    irods_base: String,
    /// The file transfer image.
    porklock_image: String,
    /// The file transfer image tag.
    porklock_tag: String,
    /// The output files excluded from uploads.
    filter_files: String,
    /// The child token the job uses to read its configuration.
    vault_token: String,
    /// The address of the secret store.
    vault_url: String,
}

impl JobConfigContext {
    /// Projects the runtime configuration keys out of the settings.
    fn new(settings: &impl ConfigProvider) -> Self {
        Self {
            amqp_uri: settings.get_string("amqp.uri"),
            amqp_exchange_name: settings.get_string("amqp.exchange.name"),
            amqp_exchange_type: settings.get_string("amqp.exchange.type"),
            irods_base: settings.get_string("irods.base"),
            porklock_image: settings.get_string("porklock.image"),
            porklock_tag: settings.get_string("porklock.tag"),
            filter_files: settings.get_string("condor.filter_files"),
            vault_token: settings.get_string("vault.child_token.token"),
            vault_url: settings.get_string("vault.url"),
        }
    }
}

/// Renders the artifacts of a job into its staging directory.
///
/// All templates are compiled when the renderer is constructed; a renderer
/// is immutable afterwards and may be shared between threads rendering
/// different jobs.
#[derive(Debug)]
pub struct JobRenderer {
    /// The compiled templates.
    env: Environment<'static>,
    /// The renderer configuration.
    config: RendererConfig,
}

impl JobRenderer {
    /// Creates a new renderer, compiling every template.
    pub fn new(config: RendererConfig) -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_function("sge_bytes", |bytes: i64, cores: f64, minimum: i64| {
            sge_bytes(bytes, cores as f32, minimum)
        });
        env.add_function("condor_bytes", condor_bytes);

        for (name, source) in [
            (templates::SUBMISSION, config.submit_dialect.template()),
            (templates::JOB_CONFIG, templates::JOB_CONFIG_TEMPLATE),
            (templates::INPUT_PATH_LIST, templates::INPUT_PATH_LIST_TEMPLATE),
            (templates::INPUT_TICKETS, templates::INPUT_TICKETS_TEMPLATE),
            (templates::OUTPUT_TICKET, templates::OUTPUT_TICKET_TEMPLATE),
        ] {
            env.add_template(name, source)
                .map_err(|source| Error::TemplateParse {
                    template: name,
                    source,
                })?;
        }

        debug!(dialect = %config.submit_dialect, "compiled job templates");
        Ok(Self { env, config })
    }

    /// Gets the configuration of the renderer.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Renders the artifacts of `job` into `dir`.
    ///
    /// The auxiliary list files are written first and their names recorded on
    /// the job, since the submission descriptor lists them for transfer. The
    /// runtime configuration is projected from `settings`.
    ///
    /// Returns the absolute path of the submission descriptor.
    ///
    /// The directory must already exist; it is neither created nor cleaned up,
    /// even when rendering fails part way through.
    pub fn render(
        &self,
        job: &mut JobSubmission,
        settings: &impl ConfigProvider,
        dir: &Path,
    ) -> Result<PathBuf> {
        if job.steps.is_empty() {
            return Err(Error::EmptySteps(job.invocation_id.clone()));
        }

        let tickets_header = settings.get_string(TICKETS_PATH_LIST_HEADER_KEY);
        job.output_ticket_file = self.output_ticket(job, &tickets_header, dir)?;
        job.input_tickets_file = self.input_tickets(job, &tickets_header, dir)?;
        job.input_path_list_file =
            self.input_path_list(job, &settings.get_string(PATH_LIST_HEADER_KEY), dir)?;

        let submission = self.submission(job)?;
        let submit_path = write(dir, SUBMIT_FILE_NAME, &submission)?;

        let job_config = self.render_template(
            templates::JOB_CONFIG,
            JobConfigContext::new(settings),
        )?;
        write(dir, JOB_CONFIG_FILE_NAME, &job_config)?;

        let json = serde_json::to_string_pretty(job).map_err(Error::Serialize)?;
        write(dir, JOB_FILE_NAME, &json)?;

        let submit_path = absolute(&submit_path).map_err(|source| Error::Write {
            path: submit_path,
            source,
        })?;

        info!(
            job = %job.invocation_id,
            path = %submit_path.display(),
            "rendered job artifacts"
        );
        Ok(submit_path)
    }

    /// Renders the submission descriptor for a job whose auxiliary file names
    /// have been recorded.
    fn submission(&self, job: &JobSubmission) -> Result<String> {
        let step = job
            .steps
            .first()
            .ok_or_else(|| Error::EmptySteps(job.invocation_id.clone()))?;
        let cpu_request = job.cpu_request.unwrap_or_default();

        self.render_template(
            templates::SUBMISSION,
            SubmissionContext {
                invocation_id: &job.invocation_id,
                submitter: &job.submitter,
                accounting_group: job.accounting_group(),
                user_groups: job.format_user_groups(),
                user_id_for_submission: job.user_id_for_submission(),
                exe_name: &step.component.name,
                exe_path: &step.component.location,
                memory_request: job.memory_request.unwrap_or_default(),
                cpu_request,
                cpus: format_cores(cpu_request),
                whole_cpus: cpu_request.max(0.0).ceil() as u64,
                disk_request: job.disk_request.unwrap_or_default(),
                memory_floor: self.config.memory_floor,
                output_ticket_file: &job.output_ticket_file,
                input_tickets_file: &job.input_tickets_file,
                input_path_list_file: &job.input_path_list_file,
            },
        )
    }

    /// Writes the output ticket file if the output directory has a ticket.
    ///
    /// Returns the file name, or an empty string if nothing was written.
    fn output_ticket(&self, job: &JobSubmission, header: &str, dir: &Path) -> Result<String> {
        if job.output_dir_ticket.is_empty() {
            return Ok(String::new());
        }

        let contents = self.render_template(
            templates::OUTPUT_TICKET,
            context! {
                header => header,
                ticket => &job.output_dir_ticket,
                path => &job.output_dir,
            },
        )?;
        write(dir, OUTPUT_TICKET_FILE_NAME, &contents)?;
        Ok(OUTPUT_TICKET_FILE_NAME.to_string())
    }

    /// Writes the input tickets file if any input has a ticket.
    ///
    /// Returns the file name, or an empty string if nothing was written.
    fn input_tickets(&self, job: &JobSubmission, header: &str, dir: &Path) -> Result<String> {
        let inputs = job.inputs_with_tickets();
        if inputs.is_empty() {
            return Ok(String::new());
        }

        let inputs = inputs
            .iter()
            .map(|i| {
                context! {
                    ticket => &i.ticket,
                    path => i.irods_path(),
                }
            })
            .collect::<Vec<_>>();
        let contents = self.render_template(
            templates::INPUT_TICKETS,
            context! {
                header => header,
                inputs => inputs,
            },
        )?;
        write(dir, INPUT_TICKETS_FILE_NAME, &contents)?;
        Ok(INPUT_TICKETS_FILE_NAME.to_string())
    }

    /// Writes the input path list file if any input has no ticket.
    ///
    /// Returns the file name, or an empty string if nothing was written.
    fn input_path_list(&self, job: &JobSubmission, header: &str, dir: &Path) -> Result<String> {
        let paths = job
            .inputs_without_tickets()
            .into_iter()
            .map(|i| i.irods_path())
            .collect::<Vec<_>>();
        if paths.is_empty() {
            return Ok(String::new());
        }

        let contents = self.render_template(
            templates::INPUT_PATH_LIST,
            context! {
                header => header,
                paths => paths,
            },
        )?;
        write(dir, INPUT_PATH_LIST_FILE_NAME, &contents)?;
        Ok(INPUT_PATH_LIST_FILE_NAME.to_string())
    }

    /// Renders the named template.
    fn render_template(&self, name: &'static str, ctx: impl Serialize) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|t| t.render(ctx))
            .map_err(|source| Error::Render {
                artifact: name,
                source,
            })
    }
}

/// Writes an artifact into the staging directory, replacing any existing
/// file.
///
/// Returns the path of the written file.
fn write(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    debug!(path = %path.display(), "writing job artifact");
    fs::write(&path, contents).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
