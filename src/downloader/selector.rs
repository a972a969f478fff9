// Stream selection policy
//
// Maps a DownloadRequest onto one stream from the resolved manifest:
// - mp4 + audio      -> first audio-only stream, any container
// - mp4 + highest    -> progressive mp4 with the greatest resolution tier
// - mp4 + exact tier -> progressive mp4 at exactly that tier
// - mp3              -> audio-only stream with the greatest average bitrate
//
// Ties on resolution keep the earliest manifest entry.

use tracing::debug;

use super::errors::DownloadError;
use super::models::{Container, DownloadRequest, MediaStream, ResolutionSelector, ResolutionTier};

const VIDEO_EXT: &str = "mp4";

/// Pick the stream the request asks for, or explain why none matches
pub fn select_stream<'a>(
    streams: &'a [MediaStream],
    request: &DownloadRequest,
) -> Result<&'a MediaStream, DownloadError> {
    let picked = match (request.container, request.resolution) {
        (Container::Mp4, ResolutionSelector::AudioOnly) => first_audio_only(streams)
            .ok_or_else(|| DownloadError::StreamUnavailable("no audio stream".to_string()))?,

        (Container::Mp4, ResolutionSelector::Highest) => highest_progressive(streams, VIDEO_EXT)
            .ok_or_else(|| {
                DownloadError::StreamUnavailable("no progressive mp4 stream".to_string())
            })?,

        (Container::Mp4, ResolutionSelector::Tier(tier)) => {
            progressive_at(streams, VIDEO_EXT, tier).ok_or_else(|| {
                DownloadError::StreamUnavailable(format!(
                    "no progressive {} stream at {}",
                    VIDEO_EXT, tier
                ))
            })?
        }

        // Resolution selector is irrelevant for mp3: always best audio
        (Container::Mp3, _) => best_audio_by_bitrate(streams)
            .ok_or_else(|| DownloadError::StreamUnavailable("no audio stream".to_string()))?,
    };

    debug!(
        format_id = %picked.format_id,
        ext = %picked.container_ext,
        "selected stream"
    );
    Ok(picked)
}

fn first_audio_only(streams: &[MediaStream]) -> Option<&MediaStream> {
    streams.iter().find(|s| s.is_audio_only())
}

fn highest_progressive<'a>(streams: &'a [MediaStream], ext: &str) -> Option<&'a MediaStream> {
    let mut best: Option<&MediaStream> = None;
    for stream in streams {
        if !stream.is_progressive() || stream.container_ext != ext {
            continue;
        }
        let tier = match stream.resolution {
            Some(t) => t,
            None => continue,
        };
        match best.and_then(|b| b.resolution) {
            Some(current) if current >= tier => {}
            _ => best = Some(stream),
        }
    }
    best
}

fn progressive_at<'a>(
    streams: &'a [MediaStream],
    ext: &str,
    tier: ResolutionTier,
) -> Option<&'a MediaStream> {
    streams
        .iter()
        .find(|s| s.is_progressive() && s.container_ext == ext && s.resolution == Some(tier))
}

fn best_audio_by_bitrate(streams: &[MediaStream]) -> Option<&MediaStream> {
    let mut best: Option<&MediaStream> = None;
    for stream in streams {
        if !stream.is_audio_only() {
            continue;
        }
        let abr = stream.abr_kbps.unwrap_or(0.0);
        let current = best.and_then(|b| b.abr_kbps).unwrap_or(0.0);
        if best.is_none() || abr > current {
            best = Some(stream);
        }
    }
    best
}
