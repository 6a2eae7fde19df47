mod progressive_upload_session;
mod upload_session;

pub use progressive_upload_session::{ProgressiveUploadSession, ProgressiveUploadSessionBuilder};
pub use upload_session::{UploadSession, UploadSessionBuilder};
