//! Client for the song lookup service and the storage host it points at.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::Deserialize;
use songbird::input::HttpRequest;
use tracing::{debug, info};
use url::Url;

use crate::commands::music::utils::music_manager::{MusicError, MusicResult};

/// Body returned by `GET /music/{songId}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LookupResult {
    /// Where the audio file can be downloaded from.
    pub url: String,
}

/// A storage response whose status has been checked but whose body has not
/// been read yet, with whatever format hints the headers carried.
#[derive(Debug)]
pub struct FetchedAudio {
    pub url: Url,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    pub content_length: Option<u64>,
    client: Client,
    response: Response,
}

impl FetchedAudio {
    /// Read the whole body into memory.
    pub async fn into_bytes(self) -> MusicResult<Vec<u8>> {
        let bytes = self.response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(MusicError::EmptyAudio);
        }
        debug!("Buffered {} bytes from {}", bytes.len(), self.url);
        Ok(bytes)
    }

    /// Let songbird stream the body on demand instead of reading it here.
    pub fn into_stream(self) -> HttpRequest {
        let Self {
            url,
            content_length,
            client,
            ..
        } = self;
        let mut request = HttpRequest::new(client, url.to_string());
        request.content_length = content_length;
        request
    }
}

pub struct SongLookup {
    client: Client,
    base_url: Url,
}

impl SongLookup {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// `{base}/music/{songId}`, with the id encoded as a single path segment.
    pub fn lookup_url(&self, song_id: &str) -> MusicResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MusicError::InvalidLookupUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("music")
            .push(song_id);
        Ok(url)
    }

    /// Resolve a song id to the location of its audio.
    pub async fn lookup(&self, song_id: &str) -> MusicResult<LookupResult> {
        let url = self.lookup_url(song_id)?;
        debug!("Looking up song {} at {}", song_id, url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MusicError::SongNotFound {
                song_id: song_id.to_string(),
                status: response.status(),
            });
        }

        let body = response.text().await?;
        let result: LookupResult = serde_json::from_str(&body)?;
        info!("Song {} resolved to {}", song_id, result.url);
        Ok(result)
    }

    /// Open the audio a lookup pointed at. Only the headers are read.
    pub async fn fetch_audio(&self, lookup: &LookupResult) -> MusicResult<FetchedAudio> {
        let url = Url::parse(&lookup.url)?;
        let extension = path_extension(&url);

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(MusicError::StorageFetch(response.status()));
        }

        let content_length = response.content_length();
        if content_length == Some(0) {
            return Err(MusicError::EmptyAudio);
        }

        let content_type = content_type(&response);
        debug!(
            "Storage answered for {} (type: {:?}, extension: {:?}, length: {:?})",
            url, content_type, extension, content_length
        );

        Ok(FetchedAudio {
            url,
            content_type,
            extension,
            content_length,
            client: self.client.clone(),
            response,
        })
    }
}

fn content_type(response: &Response) -> Option<String> {
    let value = response.headers().get(CONTENT_TYPE)?.to_str().ok()?;
    // "audio/mpeg; charset=binary" -> "audio/mpeg"
    let mime = value.split(';').next()?.trim();
    (!mime.is_empty()).then(|| mime.to_ascii_lowercase())
}

fn path_extension(url: &Url) -> Option<String> {
    let file_name = url.path_segments()?.next_back()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    (!stem.is_empty() && !extension.is_empty()).then(|| extension.to_ascii_lowercase())
}
