//! The job submission model consumed by the renderer.
//!
//! The field names follow the JSON the job-submission service sends, so the
//! `job` artifact written into the staging directory can be read back by the
//! remote job runner without any translation.

use serde::Deserialize;
use serde::Serialize;

/// The accounting group used when a job carries none.
pub const DEFAULT_ACCOUNTING_GROUP: &str = "de";

/// A job submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobSubmission {
    /// The invocation identifier of the job.
    #[serde(rename = "uuid")]
    pub invocation_id: String,
    /// The user who submitted the job.
    #[serde(rename = "username")]
    pub submitter: String,
    /// The accounting group of the job, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// The identifier of the submitting user.
    #[serde(default)]
    pub user_id: String,
    /// The groups the submitting user belongs to.
    #[serde(default)]
    pub user_groups: Vec<String>,
    /// The display name of the job.
    #[serde(default)]
    pub name: String,
    /// A free-form description of the job.
    #[serde(default)]
    pub description: String,
    /// The identifier of the app being run.
    #[serde(default)]
    pub app_id: String,
    /// The name of the app being run.
    #[serde(default)]
    pub app_name: String,
    /// The submitter's email address.
    #[serde(default)]
    pub email: String,
    /// Whether the submitter wants status notifications.
    #[serde(default)]
    pub notify: bool,
    /// Whether job logs are archived with the outputs.
    #[serde(default)]
    pub archive_logs: bool,
    /// The execution target requested by the submitter.
    #[serde(default)]
    pub execution_target: String,
    /// When the job was submitted.
    #[serde(default)]
    pub submission_date: String,
    /// The iRODS directory receiving the job's outputs.
    #[serde(default)]
    pub output_dir: String,
    /// The access ticket for the output directory, if the submitter lacks
    /// direct permissions on it.
    #[serde(default)]
    pub output_dir_ticket: String,
    /// File names excluded from output uploads.
    #[serde(default)]
    pub filter_files: Vec<String>,
    /// The steps of the job, in execution order.
    pub steps: Vec<Step>,
    /// The requested memory, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<i64>,
    /// The requested number of cores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<f32>,
    /// The requested scratch disk, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_request: Option<i64>,
    /// The name of the input path list file in the staging directory.
    ///
    /// Populated by the renderer.
    #[serde(rename = "input_path_list", default)]
    pub input_path_list_file: String,
    /// The name of the input tickets file in the staging directory.
    ///
    /// Populated by the renderer.
    #[serde(rename = "input_ticket_list", default)]
    pub input_tickets_file: String,
    /// The name of the output ticket file in the staging directory.
    ///
    /// Populated by the renderer.
    #[serde(rename = "output_ticket_list", default)]
    pub output_ticket_file: String,
}

impl JobSubmission {
    /// Gets the accounting group for the job.
    ///
    /// Falls back to [`DEFAULT_ACCOUNTING_GROUP`] when the job has no group.
    pub fn accounting_group(&self) -> &str {
        match self.group.as_deref() {
            Some(group) if !group.is_empty() => group,
            _ => DEFAULT_ACCOUNTING_GROUP,
        }
    }

    /// Gets the submitter in the form HTCondor accepts as a concurrency limit
    /// name.
    ///
    /// Limit names may only contain letters, digits, and underscores, so every
    /// other character of the submitter is replaced and the result is
    /// prefixed with `_` to keep it from starting with a digit.
    ///
    /// The limit is derived from the submitter rather than `user_id` so that
    /// all jobs of one user share a limit whichever identity service issued
    /// the job's `user_id`.
    pub fn user_id_for_submission(&self) -> String {
        let mut id = String::with_capacity(self.submitter.len() + 1);
        id.push('_');
        id.extend(self.submitter.chars().map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        }));
        id
    }

    /// Formats the user groups as a ClassAd list of strings.
    ///
    /// For example, `["a", "b"]` becomes `{"a","b"}`.
    pub fn format_user_groups(&self) -> String {
        let groups = self
            .user_groups
            .iter()
            .map(|g| format!("\"{}\"", g.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect::<Vec<_>>();
        format!("{{{}}}", groups.join(","))
    }

    /// Iterates the inputs of every step.
    pub fn inputs(&self) -> impl Iterator<Item = &StepInput> {
        self.steps.iter().flat_map(|s| s.config.inputs.iter())
    }

    /// Gets the inputs that are accessed through a ticket.
    pub fn inputs_with_tickets(&self) -> Vec<&StepInput> {
        self.inputs().filter(|i| i.has_ticket()).collect()
    }

    /// Gets the inputs that are accessed with the submitter's own permissions.
    pub fn inputs_without_tickets(&self) -> Vec<&StepInput> {
        self.inputs().filter(|i| !i.has_ticket()).collect()
    }
}

/// A single step of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Step {
    /// The tool the step runs.
    pub component: Component,
    /// The step's inputs and parameters.
    #[serde(default)]
    pub config: StepConfig,
    /// The type of the step.
    #[serde(rename = "type", default)]
    pub step_type: String,
}

/// The tool run by a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Component {
    /// The executable name.
    pub name: String,
    /// The directory containing the executable.
    pub location: String,
    /// The type of the tool.
    #[serde(rename = "type", default)]
    pub component_type: String,
    /// A description of the tool.
    #[serde(default)]
    pub description: String,
}

/// The configuration of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StepConfig {
    /// The files the step reads.
    #[serde(default)]
    pub inputs: Vec<StepInput>,
    /// The command-line parameters of the step.
    #[serde(default)]
    pub params: Vec<StepParam>,
}

/// An input file or folder of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StepInput {
    /// The identifier of the input.
    #[serde(default)]
    pub id: String,
    /// The display name of the input.
    #[serde(default)]
    pub name: String,
    /// The input type.
    #[serde(rename = "type", default)]
    pub input_type: String,
    /// Whether the input is a single file, many files, or a folder.
    #[serde(default)]
    pub multiplicity: String,
    /// The iRODS path of the input.
    pub value: String,
    /// The access ticket for the input, if any.
    #[serde(default)]
    pub ticket: String,
    /// Whether the input is kept alongside the outputs.
    #[serde(default)]
    pub retain: bool,
}

impl StepInput {
    /// Gets the iRODS path of the input.
    pub fn irods_path(&self) -> &str {
        &self.value
    }

    /// Determines whether the input is accessed through a ticket.
    pub fn has_ticket(&self) -> bool {
        !self.ticket.is_empty()
    }
}

/// A command-line parameter of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StepParam {
    /// The identifier of the parameter.
    #[serde(default)]
    pub id: String,
    /// The flag name of the parameter.
    #[serde(default)]
    pub name: String,
    /// The value of the parameter.
    #[serde(default)]
    pub value: String,
    /// The position of the parameter on the command line.
    #[serde(default)]
    pub order: i64,
}
