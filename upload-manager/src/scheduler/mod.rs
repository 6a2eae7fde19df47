use super::{UploadError, UploadProgress, UploadResult, Video};
use futures::{
    channel::oneshot,
    executor::block_on,
    future::{FutureExt, Shared},
};
use std::{
    fmt,
    future::Future,
    num::NonZeroUsize,
    pin::Pin,
    task::{Context, Poll},
};

mod serial_upload_queue;
pub use serial_upload_queue::{SerialUploadQueue, SerialUploadQueueBuilder};

pub(crate) type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// 上传会话状态
///
/// 只会从 `Active` 转换为其他状态一次，之后不再改变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// 上传中
    Active,

    /// 最后一个分片及其之前的所有分片都上传成功
    Succeeded,

    /// 有分片上传失败
    Failed,

    /// 上传被取消
    Cancelled,
}

impl SessionState {
    /// 是否是终止状态
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != Self::Active
    }
}

/// 分片上传句柄
///
/// 可以作为 [`Future`] 等待，也可以通过 [`PartHandle::wait`] 阻塞等待。
/// 每个分片只会得到一个结果，克隆后的句柄得到相同的结果。
///
/// 某个分片失败后，之后被连带取消的分片得到的是同一个错误，而不是另一个取消错误。
#[derive(Clone)]
#[must_use]
pub struct PartHandle {
    index: NonZeroUsize,
    receiver: Shared<oneshot::Receiver<UploadResult<Video>>>,
}

impl PartHandle {
    pub(crate) fn new(index: NonZeroUsize, receiver: oneshot::Receiver<UploadResult<Video>>) -> Self {
        Self {
            index,
            receiver: receiver.shared(),
        }
    }

    /// 分片序号
    #[inline]
    pub fn index(&self) -> NonZeroUsize {
        self.index
    }

    /// 阻塞等待分片上传结果
    #[inline]
    pub fn wait(self) -> UploadResult<Video> {
        block_on(self)
    }
}

impl fmt::Debug for PartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartHandle").field("index", &self.index).finish()
    }
}

impl Future for PartHandle {
    type Output = UploadResult<Video>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver
            .poll_unpin(cx)
            .map(|result| result.unwrap_or(Err(UploadError::Cancelled)))
    }
}
