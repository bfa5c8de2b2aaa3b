//! Track listings for the stream picker.

use core_metadata::{Stream, StreamTrack};
use std::collections::BTreeSet;

/// Tracks described by `streams`, sorted (video first) without duplicates.
pub fn available_tracks(streams: &[Stream]) -> Vec<StreamTrack> {
    let mut tracks: Vec<StreamTrack> = streams
        .iter()
        .filter_map(|stream| stream.track.clone())
        .collect();
    tracks.sort();
    tracks.dedup();
    tracks
}

pub fn video_tracks(tracks: &[StreamTrack]) -> Vec<&StreamTrack> {
    tracks.iter().filter(|track| track.is_video()).collect()
}

pub fn audio_tracks(tracks: &[StreamTrack]) -> Vec<&StreamTrack> {
    tracks.iter().filter(|track| track.is_audio()).collect()
}

/// Distinct audio track languages, sorted.
pub fn audio_languages(tracks: &[StreamTrack]) -> Vec<String> {
    tracks
        .iter()
        .filter_map(|track| match track {
            StreamTrack::Audio { language, .. } => language.clone(),
            StreamTrack::Video { .. } => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_metadata::StreamKind;

    fn video(height: u32, frame_rate: u32) -> StreamTrack {
        StreamTrack::Video {
            height,
            width: height * 16 / 9,
            frame_rate,
            format: "mp4".to_string(),
        }
    }

    fn audio(language: Option<&str>, bitrate: u32) -> StreamTrack {
        StreamTrack::Audio {
            language: language.map(str::to_string),
            bitrate,
            format: "m4a".to_string(),
        }
    }

    fn stream(id: &str, track: Option<StreamTrack>) -> Stream {
        let stream = Stream::new(id, StreamKind::Video, format!("https://cdn.test/{}", id));
        match track {
            Some(track) => stream.with_track(track),
            None => stream,
        }
    }

    #[test]
    fn test_available_tracks_sorted_and_deduplicated() {
        let streams = vec![
            stream("a", Some(audio(Some("en"), 128))),
            stream("b", Some(video(1080, 30))),
            stream("c", Some(video(720, 60))),
            stream("d", Some(video(720, 30))),
            stream("e", Some(video(1080, 30))),
            stream("f", None),
        ];

        assert_eq!(
            available_tracks(&streams),
            vec![
                video(720, 30),
                video(720, 60),
                video(1080, 30),
                audio(Some("en"), 128)
            ]
        );
    }

    #[test]
    fn test_audio_tracks_order_by_language() {
        let mut tracks = vec![audio(Some("es"), 64), audio(None, 256), audio(Some("en"), 128)];
        tracks.sort();
        assert_eq!(
            tracks,
            vec![audio(None, 256), audio(Some("en"), 128), audio(Some("es"), 64)]
        );
    }

    #[test]
    fn test_splits_and_languages() {
        let tracks = vec![
            video(480, 30),
            audio(Some("es"), 64),
            audio(Some("en"), 128),
            audio(Some("en"), 64),
            audio(None, 48),
        ];

        assert_eq!(video_tracks(&tracks).len(), 1);
        assert_eq!(audio_tracks(&tracks).len(), 4);
        assert_eq!(audio_languages(&tracks), vec!["en", "es"]);
    }
}
