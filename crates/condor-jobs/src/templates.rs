//! The text templates for the job artifacts.
//!
//! Templates are rendered with auto-escaping disabled and trailing newlines
//! kept, so what is written here is exactly what lands on disk.

use serde::Deserialize;
use serde::Serialize;

/// The name of the submission descriptor template.
pub(crate) const SUBMISSION: &str = "submission";

/// The name of the job configuration template.
pub(crate) const JOB_CONFIG: &str = "job_config";

/// The name of the input path list template.
pub(crate) const INPUT_PATH_LIST: &str = "input_path_list";

/// The name of the input tickets template.
pub(crate) const INPUT_TICKETS: &str = "input_tickets";

/// The name of the output ticket template.
pub(crate) const OUTPUT_TICKET: &str = "output_ticket";

/// The submission descriptor for jobs forwarded through the grid universe to
/// the SGE cluster.
const GRID_SGE_SUBMISSION: &str = r##"universe = grid
grid_resource = condor SAURON1.pers.ad.uni-graz.at SAURON1.pers.ad.uni-graz.at

+remote_universe = 9
+remote_gridresource = "sge"
+remote_ShouldTransferFiles = "YES"
+remote_WhenToTransferOutput = "ON_EXIT"
+remote_queue = "sge"
+remote_batchqueue = "all.q"

executable = /software/cyverse/entrypoint
transfer_executable = False

+remote_BatchExtraSubmitArgs = "#$-l h_vmem={{ sge_bytes(memory_request, cpu_request, memory_floor) }}\n{% if cpu_request %}#$-pe smp {{ cpus }}\n{% endif %}{% if disk_request %}#$-l tmpspace={{ sge_bytes(disk_request, 0.0, 0) }}\n{% endif %}"

arguments = --config config --job job
output = script-output.log
error = script-error.log
log = condor.log

accounting_group = {{ accounting_group }}
accounting_group_user = {{ submitter }}
+IpcUuid = "{{ invocation_id }}"
+IpcJobId = "generated_script"
+IpcUsername = "{{ submitter }}"
+IpcUserGroups = {{ user_groups }}
concurrency_limits = {{ user_id_for_submission }}

+IpcExe = "{{ exe_name }}"
+IpcExePath = "{{ exe_path }}"
should_transfer_files = YES
transfer_input_files = irods-config,iplant.cmd,config,job
{%- if output_ticket_file -%}
,{{ output_ticket_file }}
{%- endif %}
{%- if input_tickets_file -%}
,{{ input_tickets_file }}
{%- endif %}
{%- if input_path_list_file -%}
,{{ input_path_list_file }}
{%- endif %}
transfer_output_files = workingvolume/logs/logs-stdout-output,workingvolume/logs/logs-stderr-output
when_to_transfer_output = ON_EXIT_OR_EVICT
notification = NEVER
queue
"##;

/// The submission descriptor for jobs run directly in the local HTCondor
/// pool.
const CONDOR_SUBMISSION: &str = r#"universe = vanilla
executable = /usr/local/bin/road-runner
rank = mips
requirements = (HAS_HOST_MOUNTS == True)
arguments = --config config --job job
output = script-output.log
error = script-error.log
log = condor.log
{% if cpu_request %}request_cpus = {{ whole_cpus }}
{% endif %}{% if memory_request %}request_memory = {{ condor_bytes(memory_request) }}
{% endif %}{% if disk_request %}request_disk = {{ condor_bytes(disk_request) }}
{% endif %}
accounting_group = {{ accounting_group }}
accounting_group_user = {{ submitter }}
+IpcUuid = "{{ invocation_id }}"
+IpcJobId = "generated_script"
+IpcUsername = "{{ submitter }}"
+IpcUserGroups = {{ user_groups }}
concurrency_limits = {{ user_id_for_submission }}

+IpcExe = "{{ exe_name }}"
+IpcExePath = "{{ exe_path }}"
should_transfer_files = YES
transfer_input_files = irods-config,iplant.cmd,config,job
{%- if output_ticket_file -%}
,{{ output_ticket_file }}
{%- endif %}
{%- if input_tickets_file -%}
,{{ input_tickets_file }}
{%- endif %}
{%- if input_path_list_file -%}
,{{ input_path_list_file }}
{%- endif %}
transfer_output_files = workingvolume/logs/logs-stdout-output,workingvolume/logs/logs-stderr-output
when_to_transfer_output = ON_EXIT_OR_EVICT
notification = NEVER
queue
"#;

/// The runtime configuration handed to the job runner.
pub(crate) const JOB_CONFIG_TEMPLATE: &str = r#"
amqp:
    uri: {{ amqp_uri }}
    exchange:
        name: {{ amqp_exchange_name }}
        type: {{ amqp_exchange_type }}
irods:
    base: "{{ irods_base }}"
porklock:
    image: "{{ porklock_image }}"
    tag: "{{ porklock_tag }}"
condor:
    filter_files: "{{ filter_files }}"
vault:
    token: "{{ vault_token }}"
    url: "{{ vault_url }}"
"#;

/// The list of input paths the runner downloads with the submitter's own
/// permissions.
pub(crate) const INPUT_PATH_LIST_TEMPLATE: &str = r#"{{ header }}
{% for path in paths %}{{ path }}
{% endfor %}"#;

/// The list of inputs the runner downloads through access tickets.
pub(crate) const INPUT_TICKETS_TEMPLATE: &str = r#"{{ header }}
{% for input in inputs %}{{ input.ticket }},{{ input.path }}
{% endfor %}"#;

/// The ticket the runner uses to upload outputs.
pub(crate) const OUTPUT_TICKET_TEMPLATE: &str = r#"{{ header }}
{{ ticket }},{{ path }}
"#;

/// The dialect of the submission descriptor.
///
/// A deployment picks exactly one; both share the classad, accounting, and
/// file-transfer contract and differ only in how resources are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitDialect {
    /// Forward the job through the grid universe to the SGE cluster.
    ///
    /// Resources are requested through SGE directives embedded in
    /// `remote_BatchExtraSubmitArgs`.
    #[default]
    GridSge,
    /// Run the job in the local HTCondor pool.
    ///
    /// Resources are requested with `request_cpus`, `request_memory`, and
    /// `request_disk`.
    Condor,
}

impl SubmitDialect {
    /// Gets the submission descriptor template for the dialect.
    pub(crate) fn template(&self) -> &'static str {
        match self {
            Self::GridSge => GRID_SGE_SUBMISSION,
            Self::Condor => CONDOR_SUBMISSION,
        }
    }
}

impl std::fmt::Display for SubmitDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GridSge => write!(f, "grid_sge"),
            Self::Condor => write!(f, "condor"),
        }
    }
}
