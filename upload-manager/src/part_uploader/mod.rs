use super::{PartUploadRequest, UploadEndpoint, Video};
use apivideo_http::{CallbackResult, ResponseError, TransferProgressInfo};
use auto_impl::auto_impl;
use std::fmt::Debug;

mod http_part_uploader;
pub use http_part_uploader::HttpPartUploader;

/// 分片上传进度回调
pub type OnPartProgress<'c> = dyn Fn(&TransferProgressInfo<'_>) -> CallbackResult + Sync + 'c;

/// 分片上传器
///
/// 每次调用发送一个分片，调用期间通过 `on_progress` 报告分片数据的传输进度。
/// 回调返回 [`CallbackResult::Cancel`] 时应当尽快中止请求，并返回 `UserCanceled` 错误。
#[auto_impl(&, Box, Arc)]
pub trait PartUploader: Debug + Send + Sync {
    /// 阻塞上传一个分片
    fn upload_part(
        &self,
        endpoint: UploadEndpoint<'_>,
        part: &mut PartUploadRequest,
        on_progress: &OnPartProgress<'_>,
    ) -> Result<Video, ResponseError>;
}
