//! Jump attempt recording, statistics and export.

mod overlay;
mod recorder;
mod report;
mod stats;

pub use overlay::{
    is_section_label, overlay_lines, DIAG_SECTION_LABEL, GROUND_SECTION_LABEL,
    JUMPS_SECTION_LABEL,
};
pub use recorder::{DiagnosticRecorder, DisplaySnapshot};
pub use report::{ExportReport, SessionSummary};
pub use stats::{
    compute_statistics, DiagnosticStatistics, FailureReasonCount, LatencyStats, NOT_AVAILABLE,
};
