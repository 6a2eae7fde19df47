use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 视频
///
/// 每个分片上传成功后服务端都会返回视频对象，最后一个分片的响应即为最终结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// 视频 ID
    pub video_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<FixedOffset>>,

    /// 视频被丢弃的时间，仅在启用视频恢复功能时返回
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarded_at: Option<DateTime<FixedOffset>>,

    /// 视频将被永久删除的时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletes_at: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarded: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<Metadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VideoSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<VideoAssets>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,

    /// 是否公开，非公开视频的每次播放都需要一个单独的凭证
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panoramic: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4_support: Option<bool>,
}

/// 视频元信息键值对
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub key: String,
    pub value: String,
}

/// 视频源信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

/// 视频资源地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hls: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_parse_video() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let video: Video = serde_json::from_value(json!({
            "videoId": "vi4blUQJFrYWbaG44NChkH27",
            "createdAt": "2019-12-16T08:25:51+00:00",
            "title": "Maths video",
            "tags": ["maths", "tutorial"],
            "metadata": [{"key": "Author", "value": "John Doe"}],
            "source": {"uri": "/videos/vi4blUQJFrYWbaG44NChkH27/source", "type": "upload"},
            "assets": {"hls": "https://cdn.api.video/vod/vi4blUQJFrYWbaG44NChkH27/hls/manifest.m3u8"},
            "public": false,
            "panoramic": false,
            "mp4Support": true,
        }))?;
        assert_eq!(video.video_id, "vi4blUQJFrYWbaG44NChkH27");
        assert_eq!(video.title.as_deref(), Some("Maths video"));
        assert_eq!(video.tags, ["maths", "tutorial"]);
        assert_eq!(video.metadata[0].value, "John Doe");
        assert_eq!(
            video.source.as_ref().and_then(|source| source.source_type.as_deref()),
            Some("upload")
        );
        assert_eq!(video.public, Some(false));
        assert_eq!(video.mp4_support, Some(true));
        assert_eq!(
            video.created_at.map(|created_at| created_at.timestamp()),
            Some(1576484751)
        );

        let value = serde_json::to_value(&video)?;
        assert_eq!(value["videoId"], "vi4blUQJFrYWbaG44NChkH27");
        assert_eq!(value["mp4Support"], true);
        assert!(value.get("playerId").is_none());
        Ok(())
    }

    #[test]
    fn test_video_id_is_required() {
        env_logger::builder().is_test(true).try_init().ok();

        assert!(serde_json::from_str::<Video>(r#"{"title":"no id"}"#).is_err());
    }
}
