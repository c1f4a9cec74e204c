pub mod pipelines;
pub mod remote;
pub mod session;

pub use pipelines::UploadPipeline;
pub use remote::{RemoteSummary, RemoteSummaryClient};
pub use session::{RunTicket, UploadSession};
