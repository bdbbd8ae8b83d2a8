use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use songbird::input::{AudioStream, Input, LiveInput};
use symphonia::core::io::MediaSource;
use symphonia::core::probe::Hint;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::music_manager::{MusicError, MusicResult};
use crate::config::AudioMode;
use crate::utils::song_lookup::FetchedAudio;

/// Output rate of the normalisation pipeline.
pub const SAMPLE_RATE: u32 = 48_000;
/// Output channel count of the normalisation pipeline.
pub const CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;
const WAV_HEADER_LEN: usize = 44;

/// Turns fetched audio into something the voice driver can play.
#[derive(Debug, Clone)]
pub struct AudioDecoder {
    mode: AudioMode,
    ffmpeg: PathBuf,
}

impl AudioDecoder {
    pub fn new(mode: AudioMode, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            ffmpeg: ffmpeg.into(),
        }
    }

    pub fn mode(&self) -> AudioMode {
        self.mode
    }

    /// Passthrough streams the body through songbird; only normalisation
    /// buffers it, since ffmpeg needs the whole file on stdin.
    pub async fn to_input(&self, audio: FetchedAudio) -> MusicResult<Input> {
        match self.mode {
            AudioMode::Passthrough => Ok(passthrough_input(audio)),
            AudioMode::Normalize => {
                let bytes = audio.into_bytes().await?;
                let pcm = self.decode_to_pcm(&bytes).await?;
                info!(
                    "Normalised {} bytes of audio to {} bytes of PCM",
                    bytes.len(),
                    pcm.len()
                );
                let mut hint = Hint::new();
                hint.with_extension("wav");
                Ok(live_input(wav_from_pcm(pcm), hint))
            }
        }
    }

    /// Run the bytes through ffmpeg, producing interleaved s16le PCM at
    /// [`SAMPLE_RATE`] with [`CHANNELS`] channels.
    pub async fn decode_to_pcm(&self, bytes: &[u8]) -> MusicResult<Vec<u8>> {
        let rate = SAMPLE_RATE.to_string();
        let channels = CHANNELS.to_string();
        let mut child = Command::new(&self.ffmpeg)
            .args([
                "-i", "pipe:0",
                "-f", "s16le",
                "-ar", rate.as_str(),
                "-ac", channels.as_str(),
                "-loglevel", "0",
                "pipe:1",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MusicError::Decode(format!("unable to start {}: {}", self.ffmpeg.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MusicError::Decode("ffmpeg stdin unavailable".to_string()))?;

        // stdin must be fed while stdout is drained, or a large file deadlocks both pipes.
        let feed = async move {
            stdin.write_all(bytes).await?;
            stdin.shutdown().await
        };
        let (fed, output) = futures::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            return Err(MusicError::Decode(format!(
                "ffmpeg exited with {:?}",
                output.status.code()
            )));
        }
        if let Err(e) = fed {
            // ffmpeg may stop reading once it has what it needs.
            warn!("ffmpeg closed its input early: {}", e);
        }
        if output.stdout.is_empty() {
            return Err(MusicError::Decode("ffmpeg produced no audio".to_string()));
        }

        Ok(output.stdout)
    }
}

fn passthrough_input(audio: FetchedAudio) -> Input {
    debug!(
        "Streaming {} (type: {:?}, extension: {:?})",
        audio.url, audio.content_type, audio.extension
    );
    audio.into_stream().into()
}

fn live_input(bytes: Vec<u8>, hint: Hint) -> Input {
    let source: Box<dyn MediaSource> = Box::new(Cursor::new(bytes));
    Input::Live(
        LiveInput::Raw(AudioStream {
            input: source,
            hint: Some(hint),
        }),
        None,
    )
}

/// Prefix raw s16le PCM with a canonical 44-byte RIFF/WAVE header.
pub fn wav_from_pcm(pcm: Vec<u8>) -> Vec<u8> {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = SAMPLE_RATE * u32::from(block_align);
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend(pcm);
    wav
}
