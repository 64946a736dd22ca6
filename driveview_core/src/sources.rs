//! Media source URLs and segment-relative times.

use crate::config::SourceConfig;
use driveview_env::{PlaybackState, Segment};
use tracing::warn;

/// HLS manifest URL for the active segment, or an empty string when there is
/// neither a current nor a next segment.
pub fn video_url(sources: &SourceConfig, dongle_id: &str, playback: &PlaybackState) -> String {
    let Some(segment) = playback.active_segment() else {
        return String::new();
    };
    match segment.segment_id() {
        Ok(id) => format!("{}/hls/{}/{}/index.m3u8", sources.video_host, dongle_id, id),
        Err(err) => {
            warn!("No video source: {}", err);
            String::new()
        }
    }
}

/// Seconds into `segment` for a timeline offset. No clamping.
pub fn segment_time_secs(segment: &Segment, offset_ms: i64) -> f64 {
    (offset_ms - segment.route_offset_ms) as f64 / 1000.0
}

/// Target media time of the current segment (0 without one).
///
/// The next segment is deliberately ignored: between segments there is no
/// media time to seek to.
pub fn current_video_time(playback: &PlaybackState, offset_ms: i64) -> f64 {
    playback
        .current_segment
        .as_ref()
        .map(|segment| segment_time_secs(segment, offset_ms))
        .unwrap_or(0.0)
}

/// Nearest cached still frame: `<segment.url>/sec<N>.jpg` with
/// `N = max(1, floor(elapsed / granularity))`.
pub fn nearest_image_frame(sources: &SourceConfig, playback: &PlaybackState, offset_ms: i64) -> Option<String> {
    let segment = playback.active_segment()?;
    let elapsed_ms = offset_ms - segment.route_offset_ms;
    let index = elapsed_ms.div_euclid(sources.image_granularity_ms.max(1)).max(1);
    Some(format!("{}/sec{}.jpg", segment.url, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playback(current: Option<Segment>, next: Option<Segment>) -> PlaybackState {
        PlaybackState {
            current_segment: current,
            next_segment: next,
            play_speed: 1.0,
            start_time_ms: 0,
        }
    }

    #[test]
    fn test_video_url_uses_segment_id() {
        let seg = Segment::new("https://chffr.example/abc123/2026-03-01--08-15-00--3", 180_000);
        let url = video_url(&SourceConfig::default(), "abc123", &playback(Some(seg), None));
        assert_eq!(url, "//video.comma.ai/hls/abc123/2026-03-01--08-15-00--3/index.m3u8");
    }

    #[test]
    fn test_video_url_falls_back_to_next_segment() {
        let next = Segment::new("https://chffr.example/abc123/route--5", 300_000);
        let url = video_url(&SourceConfig::default(), "abc123", &playback(None, Some(next)));
        assert!(url.ends_with("/route--5/index.m3u8"));
    }

    #[test]
    fn test_video_url_empty_without_segments() {
        let url = video_url(&SourceConfig::default(), "abc123", &PlaybackState::default());
        assert_eq!(url, "");
    }

    #[test]
    fn test_image_frame_is_whole_seconds() {
        let seg = Segment::new("https://chffr.example/abc123/route--1", 60_000);
        let p = playback(Some(seg), None);
        let sources = SourceConfig::default();
        assert_eq!(
            nearest_image_frame(&sources, &p, 72_999).as_deref(),
            Some("https://chffr.example/abc123/route--1/sec12.jpg")
        );
        // First second maps to frame 1, as does a time before the segment start
        assert!(nearest_image_frame(&sources, &p, 60_400).unwrap().ends_with("sec1.jpg"));
        assert!(nearest_image_frame(&sources, &p, 50_000).unwrap().ends_with("sec1.jpg"));
    }

    #[test]
    fn test_current_video_time_ignores_next_segment() {
        let next = Segment::new("https://chffr.example/abc123/route--2", 120_000);
        assert_eq!(current_video_time(&playback(None, Some(next)), 125_000), 0.0);

        let seg = Segment::new("https://chffr.example/abc123/route--2", 120_000);
        assert_eq!(current_video_time(&playback(Some(seg), None), 125_500), 5.5);
    }
}
