use super::{OnPartProgress, PartUploadRequest, PartUploader, UploadEndpoint, Video};
use apivideo_http::{ResponseError, ResponseErrorKind, StatusCode, TransferProgressInfo};
use crossbeam_channel::Receiver;
use std::{
    io::Read,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    thread::sleep,
    time::Duration,
};

pub(crate) fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedPart {
    pub(crate) index: usize,
    pub(crate) total: Option<usize>,
    pub(crate) is_last_part: bool,
    pub(crate) video_id: Option<String>,
    pub(crate) data: Vec<u8>,
    pub(crate) endpoint: String,
}

/// 记录所有分片的分片上传器
#[derive(Debug, Default)]
pub(crate) struct FakePartUploader {
    pub(crate) response_video_id: String,
    pub(crate) fail_on: Option<usize>,
    pub(crate) delay: Duration,
    pub(crate) gate: Mutex<Option<Receiver<()>>>,
    pub(crate) recorded: Mutex<Vec<RecordedPart>>,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl FakePartUploader {
    pub(crate) fn new(response_video_id: &str) -> Self {
        Self {
            response_video_id: response_video_id.to_owned(),
            ..Default::default()
        }
    }

    pub(crate) fn fail_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 第一个分片在收到信号前不会开始传输
    pub(crate) fn gate(self, gate: Receiver<()>) -> Self {
        *self.gate.lock().unwrap() = Some(gate);
        self
    }

    pub(crate) fn recorded_indexes(&self) -> Vec<usize> {
        self.recorded.lock().unwrap().iter().map(|part| part.index).collect()
    }

    fn upload(
        &self,
        endpoint: UploadEndpoint<'_>,
        part: &mut PartUploadRequest,
        on_progress: &OnPartProgress<'_>,
    ) -> Result<Video, ResponseError> {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.recv().ok();
        }
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = part
                .body_mut()
                .read(&mut buf)
                .map_err(|err| ResponseError::new(ResponseErrorKind::LocalIoError, err))?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let info = TransferProgressInfo::new(data.len() as u64, part.size(), &buf[..n]);
            if on_progress(&info).is_cancelled() {
                return Err(ResponseError::new_with_msg(
                    ResponseErrorKind::UserCanceled,
                    "cancelled by progress callback",
                ));
            }
            sleep(self.delay);
        }
        self.recorded.lock().unwrap().push(RecordedPart {
            index: part.index().get(),
            total: part.total().map(NonZeroUsize::get),
            is_last_part: part.is_last_part(),
            video_id: part.video_id().map(ToOwned::to_owned),
            data,
            endpoint: format!("{:?}", endpoint),
        });
        if self.fail_on == Some(part.index().get()) {
            return Err(ResponseError::new_with_msg(
                ResponseErrorKind::StatusCodeError(StatusCode::INTERNAL_SERVER_ERROR),
                format!("part {} is rejected", part.index()),
            ));
        }
        Ok(Video {
            video_id: self.response_video_id.to_owned(),
            ..Default::default()
        })
    }
}

impl PartUploader for FakePartUploader {
    fn upload_part(
        &self,
        endpoint: UploadEndpoint<'_>,
        part: &mut PartUploadRequest,
        on_progress: &OnPartProgress<'_>,
    ) -> Result<Video, ResponseError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let result = self.upload(endpoint, part, on_progress);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
