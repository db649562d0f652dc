//! View models for chapter previews and the generated file list.

use reader_client::{Chapter, Endpoints, FileStatus, GeneratedFile, SessionId};
use reqwest::Url;

/// Characters of chapter content shown in a preview.
pub const PREVIEW_CHARS: usize = 150;

pub const AUDIO_LOAD_FAILED: &str = "Audio load failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPreview {
    /// "1. Title"
    pub heading: String,
    pub preview: String,
}

pub fn chapter_previews(chapters: &[Chapter]) -> Vec<ChapterPreview> {
    chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| ChapterPreview {
            heading: format!("{}. {}", i + 1, chapter.title),
            preview: preview_text(&chapter.content),
        })
        .collect()
}

fn preview_text(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// A player that fetches nothing until it is first played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPlayer {
    pub source: Url,
    pub state: PlaybackState,
}

impl AudioPlayer {
    pub fn button_label(&self) -> &'static str {
        match self.state {
            PlaybackState::Paused => "Listen",
            PlaybackState::Playing => "Pause",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryControl {
    Player(AudioPlayer),
    /// Why there is no player.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub status: FileStatus,
}

impl StatusBadge {
    pub fn label(&self) -> String {
        self.status.as_str().to_uppercase()
    }

    pub fn class(&self) -> String {
        format!("status-{}", self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub filename: String,
    pub control: EntryControl,
    pub badge: StatusBadge,
}

impl FileEntry {
    fn from_file(endpoints: &Endpoints, session: &SessionId, file: &GeneratedFile) -> Self {
        let control = match file.status {
            FileStatus::Success if file.has_audio_extension() => EntryControl::Player(AudioPlayer {
                source: endpoints.audio(session, &file.filename),
                state: PlaybackState::Paused,
            }),
            FileStatus::Success => EntryControl::Unavailable("No playable audio".to_string()),
            FileStatus::Failed => EntryControl::Unavailable("TTS generation failed".to_string()),
            FileStatus::Error => EntryControl::Unavailable("Processing error".to_string()),
        };

        Self {
            filename: file.filename.clone(),
            control,
            badge: StatusBadge {
                status: file.status,
            },
        }
    }

    pub fn player(&self) -> Option<&AudioPlayer> {
        match &self.control {
            EntryControl::Player(player) => Some(player),
            EntryControl::Unavailable(_) => None,
        }
    }
}

/// The rendered result of one synthesize request.
///
/// Owns every player's state; at most one player is `Playing` at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListView {
    pub session: SessionId,
    pub archive: Url,
    entries: Vec<FileEntry>,
}

impl FileListView {
    pub fn render(endpoints: &Endpoints, session: &SessionId, files: &[GeneratedFile]) -> Self {
        Self {
            session: session.clone(),
            archive: endpoints.archive(session),
            entries: files
                .iter()
                .map(|file| FileEntry::from_file(endpoints, session, file))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Indices of entries that carry a player.
    pub fn player_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.player().is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the player currently playing, if any.
    pub fn playing(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e.player(), Some(p) if p.state == PlaybackState::Playing))
    }

    /// Listen-button click: start a paused player (pausing every other one)
    /// or pause a playing one. Returns the new state, or None if the entry
    /// has no player.
    pub fn toggle(&mut self, index: usize) -> Option<PlaybackState> {
        let current = self.entries.get(index)?.player()?.state;

        match current {
            PlaybackState::Paused => {
                for (i, entry) in self.entries.iter_mut().enumerate() {
                    if i != index {
                        if let EntryControl::Player(player) = &mut entry.control {
                            player.state = PlaybackState::Paused;
                        }
                    }
                }
                self.set_state(index, PlaybackState::Playing);
                Some(PlaybackState::Playing)
            }
            PlaybackState::Playing => {
                self.set_state(index, PlaybackState::Paused);
                Some(PlaybackState::Paused)
            }
        }
    }

    /// Playback reached the end of the stream.
    pub fn ended(&mut self, index: usize) {
        self.set_state(index, PlaybackState::Paused);
    }

    /// The stream behind a player could not be loaded. Only that entry changes.
    pub fn mark_load_failed(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            if entry.player().is_some() {
                entry.control = EntryControl::Unavailable(AUDIO_LOAD_FAILED.to_string());
            }
        }
    }

    fn set_state(&mut self, index: usize, state: PlaybackState) {
        let control = self.entries.get_mut(index).map(|e| &mut e.control);
        if let Some(EntryControl::Player(player)) = control {
            player.state = state;
        }
    }
}
