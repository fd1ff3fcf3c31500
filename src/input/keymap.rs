//! Default key bindings for readaloud

use std::collections::HashMap;

/// Key sequence type
pub type KeySequence = Vec<u8>;

/// Action identifier for key bindings
///
/// Each variant represents a player command that can be triggered by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Transport
    PlayPause,
    Stop,
    SkipBack,
    SkipForward,
    SeekStart,
    JumpTo,

    // Text and synthesis
    Generate,
    OpenFile,
    Paste,

    // Settings
    VoiceMenu,
    VolumeUp,
    VolumeDown,

    DismissNotice,
    Quit,
}

/// Create the default keymap
pub fn create_default_keymap() -> HashMap<KeySequence, KeyAction> {
    let mut map = HashMap::new();

    map.insert(b" ".to_vec(), KeyAction::PlayPause);
    map.insert(b"s".to_vec(), KeyAction::Stop);

    // Arrow keys (normal and application cursor mode)
    map.insert(b"\x1b[D".to_vec(), KeyAction::SkipBack);
    map.insert(b"\x1bOD".to_vec(), KeyAction::SkipBack);
    map.insert(b"\x1b[C".to_vec(), KeyAction::SkipForward);
    map.insert(b"\x1bOC".to_vec(), KeyAction::SkipForward);

    // Start of audio: 0 or Home in its various encodings
    map.insert(b"0".to_vec(), KeyAction::SeekStart);
    map.insert(b"\x1b[H".to_vec(), KeyAction::SeekStart);
    map.insert(b"\x1bOH".to_vec(), KeyAction::SeekStart);
    map.insert(b"\x1b[1~".to_vec(), KeyAction::SeekStart);
    map.insert(b"j".to_vec(), KeyAction::JumpTo);

    map.insert(b"g".to_vec(), KeyAction::Generate);
    map.insert(b"o".to_vec(), KeyAction::OpenFile);
    map.insert(b"p".to_vec(), KeyAction::Paste);

    map.insert(b"v".to_vec(), KeyAction::VoiceMenu);
    map.insert(b"+".to_vec(), KeyAction::VolumeUp);
    map.insert(b"=".to_vec(), KeyAction::VolumeUp);
    map.insert(b"-".to_vec(), KeyAction::VolumeDown);

    map.insert(b"\x1b".to_vec(), KeyAction::DismissNotice);
    map.insert(b"q".to_vec(), KeyAction::Quit);
    map.insert(b"\x03".to_vec(), KeyAction::Quit); // Ctrl-C

    map
}
