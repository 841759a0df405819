//! Formatting of resource requests for the batch systems.
//!
//! HTCondor and the SGE cluster behind the grid bridge each accept their own
//! byte literals. The functions here turn the raw byte and core counts carried
//! by a [`JobSubmission`](crate::JobSubmission) into those literals; they are
//! also registered as template functions by the renderer.

use bytesize::KIB;
use bytesize::MIB;

/// The number of bytes in a kibibyte, as a signed value.
const BYTES_PER_KIB: i64 = KIB as i64;

/// The number of bytes in a mebibyte, as a signed value.
const BYTES_PER_MIB: i64 = MIB as i64;

/// Divides `bytes` by `unit`, rounding up when there is a remainder.
fn div_round_up(bytes: i64, unit: i64) -> i64 {
    let whole = bytes / unit;
    if bytes % unit > 0 { whole + 1 } else { whole }
}

/// Formats a memory or scratch-space request as an SGE resource token.
///
/// When more than one core is requested, the request is divided between the
/// slots by the whole number of cores, since SGE applies `h_vmem` per slot.
/// A positive `minimum` raises the per-slot value to at least that many bytes.
///
/// The result is `1K` below one kibibyte, a whole number of kibibytes (rounded
/// up) below one mebibyte, and a whole number of mebibytes (rounded up)
/// otherwise.
pub fn sge_bytes(bytes: i64, cores: f32, minimum: i64) -> String {
    let mut bytes = bytes;
    if cores > 1.0 {
        bytes /= cores as i64;
    }

    if minimum > 0 && bytes < minimum {
        bytes = minimum;
    }

    if bytes < BYTES_PER_KIB {
        return "1K".to_string();
    }

    if bytes < BYTES_PER_MIB {
        return format!("{}K", div_round_up(bytes, BYTES_PER_KIB));
    }

    format!("{}M", div_round_up(bytes, BYTES_PER_MIB))
}

/// Formats a memory or disk request as a native HTCondor submit-file literal.
///
/// The value is rounded up to whole kibibytes with a `KB` suffix, which
/// HTCondor interprets as a base-2 unit. Requests below one kibibyte become
/// `1KB`.
pub fn condor_bytes(bytes: i64) -> String {
    if bytes < BYTES_PER_KIB {
        return "1KB".to_string();
    }

    format!("{}KB", div_round_up(bytes, BYTES_PER_KIB))
}

/// Formats a core count the way it appears in submit files.
///
/// Whole numbers are rendered without a fractional part (`8`), fractional
/// requests keep their shortest decimal form (`2.5`).
pub fn format_cores(cores: f32) -> String {
    cores.to_string()
}
