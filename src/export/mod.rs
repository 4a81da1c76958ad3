// Export module - bulk download of a filtered record set

pub mod job;
pub mod writer;

pub use job::{ExportError, ExportJob, ExportState};
pub use writer::{sanitize_file_name, ExportProgress};
