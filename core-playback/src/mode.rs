//! # Playback Mode State Machine
//!
//! Which screen the player shows, as a closed set of states with pure, total
//! transitions. The host drives the UI from these values and asks
//! [`UiModeState::background_jobs`] which periodic work must be running.
//!
//! Matches are exhaustive, without wildcard arms: a new state does not
//! compile until every projection and transition handles it.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Play mode
// ============================================================================

/// Coarse playback mode, as seen by the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    Idle,
    EmbeddedVideo,
    FullscreenVideo,
    Pip,
    EmbeddedAudio,
    FullscreenAudio,
    BackgroundVideo,
    BackgroundAudio,
}

impl PlayMode {
    /// Modes where only the audio is rendered.
    pub fn is_audio(&self) -> bool {
        match self {
            PlayMode::EmbeddedAudio | PlayMode::FullscreenAudio | PlayMode::BackgroundAudio => {
                true
            }
            PlayMode::Idle
            | PlayMode::EmbeddedVideo
            | PlayMode::FullscreenVideo
            | PlayMode::Pip
            | PlayMode::BackgroundVideo => false,
        }
    }
}

// ============================================================================
// UI mode
// ============================================================================

/// Player UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UiModeState {
    Placeholder,
    EmbeddedVideo,
    EmbeddedVideoControllerUi,
    EmbeddedVideoChapterSelect,
    EmbeddedVideoStreamSelect,
    FullscreenVideo,
    FullscreenVideoControllerUi,
    FullscreenVideoChapterSelect,
    FullscreenVideoStreamSelect,
    Pip,
    EmbeddedAudio,
    FullscreenAudio,
    AudioChapterSelect,
    AudioStreamSelect,
}

/// Periodic jobs the host should keep running for a state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundJobs {
    /// Push playback position to the progress bar
    pub progress_polling: bool,
    /// Hide the controller UI after a period of inactivity
    pub auto_hide_timer: bool,
    /// Keep the stream/playlist picker's position in sync
    pub playlist_position_polling: bool,
}

impl UiModeState {
    pub const ALL: [UiModeState; 14] = [
        UiModeState::Placeholder,
        UiModeState::EmbeddedVideo,
        UiModeState::EmbeddedVideoControllerUi,
        UiModeState::EmbeddedVideoChapterSelect,
        UiModeState::EmbeddedVideoStreamSelect,
        UiModeState::FullscreenVideo,
        UiModeState::FullscreenVideoControllerUi,
        UiModeState::FullscreenVideoChapterSelect,
        UiModeState::FullscreenVideoStreamSelect,
        UiModeState::Pip,
        UiModeState::EmbeddedAudio,
        UiModeState::FullscreenAudio,
        UiModeState::AudioChapterSelect,
        UiModeState::AudioStreamSelect,
    ];

    // ------------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------------

    pub fn fullscreen(&self) -> bool {
        use UiModeState::*;
        match self {
            FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip
            | FullscreenAudio
            | AudioChapterSelect
            | AudioStreamSelect => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | EmbeddedAudio => false,
        }
    }

    pub fn controller_ui_visible(&self) -> bool {
        use UiModeState::*;
        match self {
            EmbeddedVideoControllerUi | FullscreenVideoControllerUi => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | FullscreenVideo
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip
            | EmbeddedAudio
            | FullscreenAudio
            | AudioChapterSelect
            | AudioStreamSelect => false,
        }
    }

    pub fn is_stream_select(&self) -> bool {
        use UiModeState::*;
        match self {
            EmbeddedVideoStreamSelect | FullscreenVideoStreamSelect | AudioStreamSelect => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | Pip
            | EmbeddedAudio
            | FullscreenAudio
            | AudioChapterSelect => false,
        }
    }

    pub fn is_chapter_select(&self) -> bool {
        use UiModeState::*;
        match self {
            EmbeddedVideoChapterSelect | FullscreenVideoChapterSelect | AudioChapterSelect => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoStreamSelect
            | FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoStreamSelect
            | Pip
            | EmbeddedAudio
            | FullscreenAudio
            | AudioStreamSelect => false,
        }
    }

    /// Status and navigation bars are shown.
    pub fn system_insets_visible(&self) -> bool {
        use UiModeState::*;
        match self {
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | FullscreenVideoControllerUi
            | EmbeddedAudio
            | FullscreenAudio
            | AudioChapterSelect
            | AudioStreamSelect => true,
            FullscreenVideo
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip => false,
        }
    }

    /// The screen should rotate to fit the video's aspect ratio.
    pub fn fit_screen_rotation(&self) -> bool {
        use UiModeState::*;
        match self {
            FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | Pip
            | EmbeddedAudio
            | FullscreenAudio
            | AudioChapterSelect
            | AudioStreamSelect => false,
        }
    }

    /// A visible progress bar needs position updates.
    pub fn requires_progress_update(&self) -> bool {
        use UiModeState::*;
        match self {
            EmbeddedVideoControllerUi
            | FullscreenVideoControllerUi
            | EmbeddedAudio
            | FullscreenAudio => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | FullscreenVideo
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip
            | AudioChapterSelect
            | AudioStreamSelect => false,
        }
    }

    pub fn in_audio_mode(&self) -> bool {
        use UiModeState::*;
        match self {
            EmbeddedAudio | FullscreenAudio | AudioChapterSelect | AudioStreamSelect => true,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip => false,
        }
    }

    pub fn background_jobs(&self) -> BackgroundJobs {
        BackgroundJobs {
            progress_polling: self.requires_progress_update(),
            auto_hide_timer: self.controller_ui_visible(),
            playlist_position_polling: self.is_stream_select(),
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    pub fn to_controller_visible(self) -> UiModeState {
        use UiModeState::*;
        match self {
            EmbeddedVideo => EmbeddedVideoControllerUi,
            FullscreenVideo => FullscreenVideoControllerUi,
            Placeholder
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip
            | EmbeddedAudio
            | FullscreenAudio
            | AudioChapterSelect
            | AudioStreamSelect => self,
        }
    }

    /// Collapses every overlay to its base state.
    pub fn to_ui_hidden(self) -> UiModeState {
        use UiModeState::*;
        match self {
            EmbeddedVideoControllerUi | EmbeddedVideoChapterSelect | EmbeddedVideoStreamSelect => {
                EmbeddedVideo
            }
            FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect => FullscreenVideo,
            AudioChapterSelect | AudioStreamSelect => FullscreenAudio,
            Placeholder | EmbeddedVideo | FullscreenVideo | Pip | EmbeddedAudio | FullscreenAudio => {
                self
            }
        }
    }

    pub fn to_stream_select(self) -> UiModeState {
        use UiModeState::*;
        match self {
            EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | Pip => EmbeddedVideoStreamSelect,
            FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect => FullscreenVideoStreamSelect,
            EmbeddedAudio | FullscreenAudio | AudioChapterSelect | AudioStreamSelect => {
                AudioStreamSelect
            }
            Placeholder => self,
        }
    }

    pub fn to_chapter_select(self) -> UiModeState {
        use UiModeState::*;
        match self {
            EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | Pip => EmbeddedVideoChapterSelect,
            FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect => FullscreenVideoChapterSelect,
            EmbeddedAudio | FullscreenAudio | AudioChapterSelect | AudioStreamSelect => {
                AudioChapterSelect
            }
            Placeholder => self,
        }
    }

    /// Same screen depth, rendering audio only.
    pub fn to_audio_equivalent(self) -> UiModeState {
        use UiModeState::*;
        match self {
            EmbeddedVideo | EmbeddedVideoControllerUi => EmbeddedAudio,
            FullscreenVideo | FullscreenVideoControllerUi | Pip => FullscreenAudio,
            EmbeddedVideoChapterSelect | FullscreenVideoChapterSelect => AudioChapterSelect,
            EmbeddedVideoStreamSelect | FullscreenVideoStreamSelect => AudioStreamSelect,
            Placeholder | EmbeddedAudio | FullscreenAudio | AudioChapterSelect
            | AudioStreamSelect => self,
        }
    }

    /// Same screen depth, rendering video.
    pub fn to_video_equivalent(self) -> UiModeState {
        use UiModeState::*;
        match self {
            EmbeddedAudio => EmbeddedVideo,
            FullscreenAudio => FullscreenVideo,
            AudioChapterSelect => FullscreenVideoChapterSelect,
            AudioStreamSelect => FullscreenVideoStreamSelect,
            Placeholder
            | EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect
            | FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect
            | Pip => self,
        }
    }

    pub fn to_play_mode(self) -> PlayMode {
        use UiModeState::*;
        match self {
            Placeholder => PlayMode::Idle,
            EmbeddedVideo
            | EmbeddedVideoControllerUi
            | EmbeddedVideoChapterSelect
            | EmbeddedVideoStreamSelect => PlayMode::EmbeddedVideo,
            FullscreenVideo
            | FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect => PlayMode::FullscreenVideo,
            Pip => PlayMode::Pip,
            EmbeddedAudio => PlayMode::EmbeddedAudio,
            FullscreenAudio | AudioChapterSelect | AudioStreamSelect => PlayMode::FullscreenAudio,
        }
    }

    /// Base state for `mode`. Background modes come back embedded.
    pub fn from_play_mode(mode: PlayMode) -> UiModeState {
        match mode {
            PlayMode::Idle => UiModeState::Placeholder,
            PlayMode::EmbeddedVideo | PlayMode::BackgroundVideo => UiModeState::EmbeddedVideo,
            PlayMode::FullscreenVideo => UiModeState::FullscreenVideo,
            PlayMode::Pip => UiModeState::Pip,
            PlayMode::EmbeddedAudio | PlayMode::BackgroundAudio => UiModeState::EmbeddedAudio,
            PlayMode::FullscreenAudio => UiModeState::FullscreenAudio,
        }
    }

    /// State after a back press, or `None` if the host should handle it.
    pub fn next_on_back_pressed(self) -> Option<UiModeState> {
        use UiModeState::*;
        match self {
            EmbeddedVideoControllerUi | EmbeddedVideoChapterSelect | EmbeddedVideoStreamSelect => {
                Some(EmbeddedVideo)
            }
            FullscreenVideoControllerUi
            | FullscreenVideoChapterSelect
            | FullscreenVideoStreamSelect => Some(FullscreenVideo),
            AudioChapterSelect | AudioStreamSelect => Some(FullscreenAudio),
            FullscreenVideo | FullscreenAudio => Some(EmbeddedVideo),
            Placeholder | EmbeddedVideo | EmbeddedAudio | Pip => None,
        }
    }
}

impl From<PlayMode> for UiModeState {
    fn from(mode: PlayMode) -> Self {
        UiModeState::from_play_mode(mode)
    }
}

impl From<UiModeState> for PlayMode {
    fn from(state: UiModeState) -> Self {
        state.to_play_mode()
    }
}

impl fmt::Display for UiModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
