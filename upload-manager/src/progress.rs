use crossbeam_utils::Backoff;
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    sync::{Arc, RwLock},
};

/// 上传进度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    completed_bytes: u64,
    total_bytes: u64,
}

impl UploadProgress {
    #[inline]
    pub fn new(completed_bytes: u64, total_bytes: u64) -> Self {
        Self {
            completed_bytes,
            total_bytes,
        }
    }

    /// 已经上传的字节数
    #[inline]
    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    /// 总字节数
    ///
    /// 文件大小已知时为文件大小，否则为当前已经提交的所有分片大小之和
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// 是否全部上传完毕
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.total_bytes > 0 && self.completed_bytes >= self.total_bytes
    }
}

#[derive(Clone)]
pub(crate) struct ProgressesKey {
    progresses: Progresses,
    key: u64,
    part_size: u64,
}

impl ProgressesKey {
    /// 更新分片进度，返回更新后的分片进度与总进度
    pub(crate) fn update_part(&self, uploaded: u64) -> (UploadProgress, UploadProgress) {
        self.progresses.update_part(self, uploaded.min(self.part_size))
    }

    pub(crate) fn complete_part(&self) -> (UploadProgress, UploadProgress) {
        self.progresses.update_part(self, self.part_size)
    }
}

impl PartialEq for ProgressesKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ProgressesKey {}

impl Hash for ProgressesKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Debug for ProgressesKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt(f)
    }
}

/// 分片进度的聚合
///
/// 每个分片的进度只增不减，总进度同样只增不减，且不超过总字节数
#[derive(Clone, Debug, Default)]
pub(crate) struct Progresses(Arc<RwLock<ProgressesInner>>);

#[derive(Debug, Default)]
struct ProgressesInner {
    known_total: Option<u64>,
    submitted: u64,
    reported: u64,
    next_key: u64,
    map: HashMap<u64, u64>,
}

impl Progresses {
    pub(crate) fn new(known_total: Option<u64>) -> Self {
        Self(Arc::new(RwLock::new(ProgressesInner {
            known_total,
            ..Default::default()
        })))
    }

    pub(crate) fn add_new_part(&self, part_size: u64) -> ProgressesKey {
        self.try_write(move |inner| {
            let key = inner.add_new_part(part_size);
            ProgressesKey {
                progresses: self.to_owned(),
                key,
                part_size,
            }
        })
    }

    fn update_part(&self, key: &ProgressesKey, uploaded: u64) -> (UploadProgress, UploadProgress) {
        self.try_write(move |inner| {
            let part_uploaded = inner.update_part(key.key, uploaded);
            (
                UploadProgress::new(part_uploaded, key.part_size),
                inner.snapshot(),
            )
        })
    }

    pub(crate) fn snapshot(&self) -> UploadProgress {
        self.try_read(|inner| UploadProgress::new(inner.reported, inner.total()))
    }

    fn try_write<F: FnOnce(&mut ProgressesInner) -> T, T>(&self, f: F) -> T {
        let backoff = Backoff::new();
        loop {
            if let Ok(mut inner) = self.0.try_write() {
                return f(&mut inner);
            } else {
                backoff.spin();
            }
        }
    }

    fn try_read<F: FnOnce(&ProgressesInner) -> T, T>(&self, f: F) -> T {
        let backoff = Backoff::new();
        loop {
            if let Ok(inner) = self.0.try_read() {
                return f(&inner);
            } else {
                backoff.spin();
            }
        }
    }
}

impl ProgressesInner {
    fn add_new_part(&mut self, part_size: u64) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.submitted += part_size;
        self.map.insert(key, 0);
        key
    }

    fn update_part(&mut self, key: u64, uploaded: u64) -> u64 {
        let value = self.map.entry(key).or_default();
        if uploaded > *value {
            *value = uploaded;
        }
        *value
    }

    fn total(&self) -> u64 {
        self.known_total.unwrap_or(self.submitted)
    }

    fn snapshot(&mut self) -> UploadProgress {
        let total = self.total();
        let current = self.map.values().sum::<u64>().min(total);
        if current > self.reported {
            self.reported = current;
        }
        UploadProgress::new(self.reported, total)
    }
}
