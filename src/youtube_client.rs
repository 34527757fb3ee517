// YouTube Data API v3 client for video search and metadata
// Docs: https://developers.google.com/youtube/v3
use crate::error::LookupError;
use crate::models::{DataSource, Language, MediaAsset};
use crate::utils::parse_iso8601_duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Metadata for a single video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_name: Option<String>,
    pub published_at: Option<String>,
    pub duration_seconds: Option<u64>,
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
        language: Language,
    ) -> Result<Vec<VideoDetails>, LookupError>;

    async fn get_video_details(&self, video_id: &str) -> Result<Option<VideoDetails>, LookupError>;
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
}

// ============================================================================
// Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

// ============================================================================
// YouTube Client Implementation
// ============================================================================

impl YouTubeClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, LookupError> {
        let response = self
            .client
            .get(format!("{}/{}", YOUTUBE_BASE_URL, endpoint))
            .query(params)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                service: "YouTube",
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
        language: Language,
    ) -> Result<Vec<VideoDetails>, LookupError> {
        let params = [
            ("part", "snippet".to_string()),
            ("q", query.to_string()),
            ("type", "video".to_string()),
            ("maxResults", max_results.to_string()),
            ("regionCode", language.region().to_string()),
            ("relevanceLanguage", language.code().to_string()),
        ];
        let response: SearchResponse = self.get_json("search", &params).await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                Some(VideoDetails {
                    id,
                    title: item.snippet.title,
                    description: item.snippet.description,
                    channel_name: item.snippet.channel_title,
                    published_at: item.snippet.published_at,
                    duration_seconds: None,
                })
            })
            .collect())
    }

    async fn get_video_details(&self, video_id: &str) -> Result<Option<VideoDetails>, LookupError> {
        let params = [
            ("part", "snippet,contentDetails".to_string()),
            ("id", video_id.to_string()),
        ];
        let response: VideoListResponse = self.get_json("videos", &params).await?;

        Ok(response.items.into_iter().next().map(|item| VideoDetails {
            id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            channel_name: item.snippet.channel_title,
            published_at: item.snippet.published_at,
            duration_seconds: item
                .content_details
                .and_then(|d| parse_iso8601_duration(&d.duration)),
        }))
    }
}

impl VideoDetails {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    /// Convert a search hit into a media asset of the given type
    pub fn into_media_asset(self, asset_type: &str, language: Language) -> MediaAsset {
        MediaAsset {
            url: self.watch_url(),
            title: self.title,
            asset_type: asset_type.to_string(),
            duration_seconds: self.duration_seconds,
            channel_name: self.channel_name,
            upload_date: self.published_at,
            language: Some(language.code().to_string()),
            source: DataSource::Lookup,
        }
    }
}
