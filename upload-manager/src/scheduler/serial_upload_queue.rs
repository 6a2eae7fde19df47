use super::{
    super::{
        progress::{Progresses, ProgressesKey},
        PartUploadRequest, PartUploader, UploadError, UploadProgress, UploadResult, UploadTarget, Video,
    },
    PartHandle, ProgressCallback, SessionState,
};
use apivideo_http::{CallbackResult, ResponseError, ResponseErrorKind, TransferProgressInfo};
use assert_impl::assert_impl;
use crossbeam_channel::{unbounded, SendError, Sender};
use futures::channel::oneshot;
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::Builder as ThreadBuilder,
};

/// 串行上传队列
///
/// 所有分片在一个专用线程上按照提交顺序逐个上传，任意时刻最多只有一个分片正在传输。
/// 第一个失败的分片的错误将被返回给该分片，之后所有尚未开始的分片都不会再开始，
/// 并得到同一个错误。调用 [`SerialUploadQueue::cancel`] 后尚未开始的分片以
/// [`UploadError::Cancelled`] 结束。
///
/// 标记为最后一个的分片，以及序号不大于它的所有分片都上传成功后，队列进入 [`SessionState::Succeeded`]，
/// 与这些分片的提交顺序无关。
///
/// 队列被释放时不会取消已经提交的分片，工作线程将处理完队列中剩余的分片后退出。
pub struct SerialUploadQueue {
    inner: Arc<QueueInner>,
    sender: Sender<Job>,
}

struct QueueInner {
    uploader: Arc<dyn PartUploader>,
    target: UploadTarget,
    video_id: OnceCell<String>,
    state: Mutex<QueueState>,
    first_error: OnceCell<UploadError>,
    cancelled: AtomicBool,
    progresses: Progresses,
    on_progress: Option<ProgressCallback>,
    submitted: AtomicUsize,
    settled: AtomicUsize,
}

#[derive(Debug)]
struct QueueState {
    session: SessionState,
    succeeded_parts: usize,
    last_part_index: Option<usize>,
}

struct Job {
    part: PartUploadRequest,
    progress_key: ProgressesKey,
    on_part_progress: Option<ProgressCallback>,
    sender: oneshot::Sender<UploadResult<Video>>,
}

impl SerialUploadQueue {
    /// 创建串行上传队列构建器
    #[inline]
    pub fn builder(uploader: impl PartUploader + 'static, target: UploadTarget) -> SerialUploadQueueBuilder {
        SerialUploadQueueBuilder::new(Arc::new(uploader), target)
    }

    /// 提交分片
    ///
    /// 立即返回，分片将在之前提交的所有分片结束后开始上传
    #[inline]
    pub fn submit(&self, part: PartUploadRequest) -> PartHandle {
        self.enqueue(part, None)
    }

    /// 提交分片，并设置分片级别的进度回调
    #[inline]
    pub fn submit_with_progress(
        &self,
        part: PartUploadRequest,
        on_part_progress: impl Fn(UploadProgress) + Send + Sync + 'static,
    ) -> PartHandle {
        self.enqueue(part, Some(Box::new(on_part_progress)))
    }

    fn enqueue(&self, part: PartUploadRequest, on_part_progress: Option<ProgressCallback>) -> PartHandle {
        let (sender, receiver) = oneshot::channel();
        let handle = PartHandle::new(part.index(), receiver);
        let job = Job {
            progress_key: self.inner.progresses.add_new_part(part.size()),
            part,
            on_part_progress,
            sender,
        };
        self.inner.submitted.fetch_add(1, Ordering::SeqCst);
        debug!("part {} is submitted", job.part.index());
        if let Err(SendError(job)) = self.sender.send(job) {
            warn!("upload queue worker is gone, part {} is cancelled", job.part.index());
            self.inner.settle(job.sender, Err(self.inner.terminal_error()));
        }
        handle
    }

    /// 取消上传
    ///
    /// 正在传输的分片将被尽快中止，尚未开始的分片不会再开始
    #[inline]
    pub fn cancel(&self) {
        self.inner.cancel()
    }

    /// 当前的总上传进度
    #[inline]
    pub fn progress(&self) -> UploadProgress {
        self.inner.progresses.snapshot()
    }

    /// 当前的会话状态
    #[inline]
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// 视频 ID，创建时已知或者从第一个分片的响应中获取
    #[inline]
    pub fn video_id(&self) -> Option<&str> {
        self.inner.video_id.get().map(String::as_str)
    }

    /// 所有已经提交的分片是否都已经结束
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.inner.settled.load(Ordering::SeqCst) == self.inner.submitted.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl fmt::Debug for SerialUploadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialUploadQueue")
            .field("uploader", &self.inner.uploader)
            .field("target", &self.inner.target)
            .field("video_id", &self.inner.video_id)
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish()
    }
}

impl QueueInner {
    fn run(&self, mut job: Job) {
        let index = job.part.index();
        if self.cancelled.load(Ordering::Acquire) {
            debug!("part {} is skipped", index);
            self.settle(job.sender, Err(self.terminal_error()));
            return;
        }
        if self.target.is_upload_token() {
            job.part.set_video_id(self.video_id.get().cloned());
        }

        let on_progress = |info: &TransferProgressInfo<'_>| {
            if self.cancelled.load(Ordering::Acquire) {
                return CallbackResult::Cancel;
            }
            let (part_progress, progress) = job.progress_key.update_part(info.transferred_bytes());
            self.publish(job.on_part_progress.as_ref(), part_progress, progress);
            CallbackResult::Continue
        };
        let result = self
            .uploader
            .upload_part(self.target.endpoint(), &mut job.part, &on_progress);

        let result = match result {
            Ok(video) => self.discover_video_id(&video).map(|_| video),
            Err(err) if err.is_user_canceled() => Err(UploadError::Cancelled),
            Err(err) => Err(UploadError::Transport(err)),
        };
        match &result {
            Ok(_) => {
                let (part_progress, progress) = job.progress_key.complete_part();
                self.publish(job.on_part_progress.as_ref(), part_progress, progress);
                debug!("part {} is uploaded", index);
                if let Some(part_count) = self.record_success(&job.part) {
                    info!("upload succeeded after {} parts", part_count);
                }
            }
            Err(UploadError::Cancelled) => {
                self.cancel();
            }
            Err(err) => {
                if self.first_error.set(err.to_owned()).is_ok() {
                    self.transition(SessionState::Failed);
                    warn!("part {} failed, remaining parts are cancelled: {}", index, err);
                }
                self.cancelled.store(true, Ordering::Release);
            }
        }
        self.settle(job.sender, result);
    }

    fn discover_video_id(&self, video: &Video) -> UploadResult<()> {
        if !self.target.is_upload_token() || self.video_id.get().is_some() {
            return Ok(());
        }
        if video.video_id.is_empty() {
            return Err(UploadError::Transport(ResponseError::new_with_msg(
                ResponseErrorKind::InvalidRequestResponse,
                "response of the first part does not contain a videoId",
            )));
        }
        if self.video_id.set(video.video_id.to_owned()).is_ok() {
            info!("video id {} is discovered", video.video_id);
        }
        Ok(())
    }

    fn publish(&self, on_part_progress: Option<&ProgressCallback>, part_progress: UploadProgress, progress: UploadProgress) {
        if let Some(on_progress) = self.on_progress.as_ref() {
            on_progress(progress);
        }
        if let Some(on_part_progress) = on_part_progress {
            on_part_progress(part_progress);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if self.transition(SessionState::Cancelled) {
            info!("upload is cancelled");
        }
    }

    /// 记录成功的分片，所有分片都成功时返回分片数量
    fn record_success(&self, part: &PartUploadRequest) -> Option<usize> {
        let mut state = self.lock_state();
        state.succeeded_parts += 1;
        if part.is_last_part() {
            state.last_part_index = Some(part.index().get());
        }
        match state.last_part_index {
            Some(last) if state.succeeded_parts >= last && state.session == SessionState::Active => {
                state.session = SessionState::Succeeded;
                Some(state.succeeded_parts)
            }
            _ => None,
        }
    }

    /// 尚未开始的分片得到的错误
    fn terminal_error(&self) -> UploadError {
        self.first_error.get().cloned().unwrap_or(UploadError::Cancelled)
    }

    fn state(&self) -> SessionState {
        self.lock_state().session
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, to: SessionState) -> bool {
        let mut state = self.lock_state();
        if state.session == SessionState::Active {
            state.session = to;
            true
        } else {
            false
        }
    }

    fn settle(&self, sender: oneshot::Sender<UploadResult<Video>>, result: UploadResult<Video>) {
        self.settled.fetch_add(1, Ordering::SeqCst);
        sender.send(result).ok();
    }
}

/// 串行上传队列构建器
pub struct SerialUploadQueueBuilder {
    uploader: Arc<dyn PartUploader>,
    target: UploadTarget,
    total_bytes: Option<u64>,
    on_progress: Option<ProgressCallback>,
}

impl SerialUploadQueueBuilder {
    pub(crate) fn new(uploader: Arc<dyn PartUploader>, target: UploadTarget) -> Self {
        Self {
            uploader,
            target,
            total_bytes: None,
            on_progress: None,
        }
    }

    /// 设置总字节数
    ///
    /// 未设置时总字节数为已经提交的所有分片大小之和
    #[inline]
    pub fn total_bytes(&mut self, total_bytes: u64) -> &mut Self {
        self.total_bytes = Some(total_bytes);
        self
    }

    /// 设置总进度回调，每次进度变化时都会被调用
    #[inline]
    pub fn on_progress(&mut self, on_progress: impl Fn(UploadProgress) + Send + Sync + 'static) -> &mut Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub(crate) fn on_progress_boxed(&mut self, on_progress: Option<ProgressCallback>) -> &mut Self {
        self.on_progress = on_progress;
        self
    }

    /// 创建串行上传队列并启动工作线程
    pub fn build(&mut self) -> UploadResult<SerialUploadQueue> {
        let video_id = OnceCell::new();
        if let Some(known) = self.target.known_video_id() {
            video_id.set(known.to_owned()).ok();
        }
        let inner = Arc::new(QueueInner {
            uploader: self.uploader.to_owned(),
            target: self.target.to_owned(),
            video_id,
            state: Mutex::new(QueueState {
                session: SessionState::Active,
                succeeded_parts: 0,
                last_part_index: None,
            }),
            first_error: OnceCell::new(),
            cancelled: AtomicBool::new(false),
            progresses: Progresses::new(self.total_bytes),
            on_progress: self.on_progress.take(),
            submitted: AtomicUsize::new(0),
            settled: AtomicUsize::new(0),
        });
        let (sender, receiver) = unbounded::<Job>();
        {
            let inner = inner.to_owned();
            ThreadBuilder::new()
                .name("apivideo-upload-queue".to_owned())
                .spawn(move || {
                    for job in receiver.iter() {
                        inner.run(job);
                    }
                    debug!("upload queue worker exits");
                })?;
        }
        Ok(SerialUploadQueue { inner, sender })
    }
}

impl fmt::Debug for SerialUploadQueueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialUploadQueueBuilder")
            .field("uploader", &self.uploader)
            .field("target", &self.target)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}
