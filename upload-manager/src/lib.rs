#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    non_ascii_idents,
    indirect_structural_match,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

//! # apivideo-upload-manager
//!
//! ## api.video 视频分片上传引擎
//!
//! 将视频文件切分为分片，通过一个串行上传队列依次上传到 api.video，
//! 支持大小已知的整文件上传与总大小未知的渐进式上传，并提供聚合的上传进度。
//!
//! ```no_run
//! use apivideo_upload_manager::{UploadManager, UploadTarget};
//!
//! # fn example() -> anyhow::Result<()> {
//! let manager = UploadManager::default();
//! let video = manager.upload_file(UploadTarget::upload_token("to1x2y3z"), "/path/to/video.mp4")?;
//! println!("uploaded {}", video.video_id);
//! # Ok(())
//! # }
//! ```

mod chunk_size;
mod config;
mod data_source;
mod error;
mod part;
mod part_uploader;
mod progress;
mod scheduler;
mod session;
mod target;
mod upload_manager;
mod video;

#[cfg(test)]
mod test_utils;

pub use apivideo_http as http;

#[cfg(feature = "ureq")]
#[cfg_attr(feature = "docs", doc(cfg(feature = "ureq")))]
pub use apivideo_ureq as ureq;

pub use chunk_size::{ChunkSize, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use config::{Environment, Origin, UploaderConfig, UploaderConfigBuilder};
pub use data_source::{Chunk, ChunkSplitter, Chunks, SeekableSource};
pub use error::{UploadError, UploadResult};
pub use part::{PartBody, PartKind, PartUploadRequest};
pub use part_uploader::{HttpPartUploader, OnPartProgress, PartUploader};
pub use progress::UploadProgress;
pub use scheduler::{PartHandle, SerialUploadQueue, SerialUploadQueueBuilder, SessionState};
pub use session::{ProgressiveUploadSession, ProgressiveUploadSessionBuilder, UploadSession, UploadSessionBuilder};
pub use target::{UploadEndpoint, UploadTarget};
pub use upload_manager::{UploadManager, UploadManagerBuilder};
pub use video::{Metadata, Video, VideoAssets, VideoSource};

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::{http::prelude::*, PartUploader};
}
