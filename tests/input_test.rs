//! Input system tests
//!
//! Tests the key handler stack, key bindings and modal handlers

use readaloud::audio::{AudioBuffer, ManualClock, PlaybackState, SilentEngine};
use readaloud::input::{
    create_default_keymap, dispatch, HandlerAction, KeyAction, KeyHandler, TransportHandler,
};
use readaloud::speech::Voice;
use readaloud::state::config::Config;
use readaloud::state::{Notice, State};
use readaloud::terminal::render;
use readaloud::Result;
use tempfile::TempDir;

/// Modal handler that leaves on `x` and passes everything else down
struct TestHandler {
    name: &'static str,
}

impl KeyHandler for TestHandler {
    fn process_with_context(&mut self, key: &[u8], _state: &mut State) -> Result<HandlerAction> {
        if key == b"x" {
            Ok(HandlerAction::Remove)
        } else {
            Ok(HandlerAction::Passthrough)
        }
    }

    fn prompt(&self) -> Option<String> {
        Some(self.name.to_string())
    }
}

fn setup(dir: &TempDir) -> (State, TransportHandler, ManualClock) {
    let config = Config::load_from(&dir.path().join(".readaloud.cfg")).unwrap();
    let clock = ManualClock::new();
    let engine = SilentEngine::with_clock(clock.clone());
    let state = State::new(config, Box::new(engine), None);
    (state, TransportHandler::new(create_default_keymap()), clock)
}

fn press(state: &mut State, transport: &mut TransportHandler, keys: &[&str]) {
    for key in keys {
        dispatch(key.as_bytes(), state, transport).unwrap();
    }
}

#[test]
fn test_handler_stack() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);
    assert_eq!(state.handlers.len(), 0);

    state.handlers.push(Box::new(TestHandler { name: "test" }));
    assert_eq!(state.handlers.len(), 1);

    // Unrecognized key falls through to the transport keys (also unbound)
    let action = dispatch(b"a", &mut state, &mut transport).unwrap();
    assert_eq!(action, HandlerAction::Passthrough);
    assert_eq!(state.handlers.len(), 1);

    // Handler handles the key and removes itself
    let action = dispatch(b"x", &mut state, &mut transport).unwrap();
    assert_eq!(action, HandlerAction::Remove);
    assert!(state.handlers.is_empty());
}

#[test]
fn test_handler_stack_multiple() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    state.handlers.push(Box::new(TestHandler { name: "lower" }));
    state.handlers.push(Box::new(TestHandler { name: "upper" }));
    assert_eq!(state.handlers.len(), 2);
    assert_eq!(state.handlers.prompt().as_deref(), Some("upper"));

    let action = dispatch(b"x", &mut state, &mut transport).unwrap();
    assert_eq!(action, HandlerAction::Remove);
    assert_eq!(state.handlers.prompt().as_deref(), Some("lower"));

    let action = dispatch(b"x", &mut state, &mut transport).unwrap();
    assert_eq!(action, HandlerAction::Remove);
    assert!(state.handlers.is_empty());
    assert_eq!(state.handlers.prompt(), None);
}

#[test]
fn test_passthrough_reaches_transport() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);
    state.handlers.push(Box::new(TestHandler { name: "test" }));

    press(&mut state, &mut transport, &["q"]);
    assert!(state.quit);
    assert_eq!(state.handlers.len(), 1);
}

#[test]
fn test_keymap_creation() {
    let keymap = create_default_keymap();

    assert_eq!(keymap.get(&b" ".to_vec()), Some(&KeyAction::PlayPause));
    assert_eq!(keymap.get(&b"s".to_vec()), Some(&KeyAction::Stop));
    assert_eq!(keymap.get(&b"\x1b[D".to_vec()), Some(&KeyAction::SkipBack));
    assert_eq!(keymap.get(&b"\x1b[C".to_vec()), Some(&KeyAction::SkipForward));
    assert_eq!(keymap.get(&b"\x1bOC".to_vec()), Some(&KeyAction::SkipForward));
    assert_eq!(keymap.get(&b"0".to_vec()), Some(&KeyAction::SeekStart));
    assert_eq!(keymap.get(&b"\x1b[H".to_vec()), Some(&KeyAction::SeekStart));
    assert_eq!(keymap.get(&b"j".to_vec()), Some(&KeyAction::JumpTo));
    assert_eq!(keymap.get(&b"g".to_vec()), Some(&KeyAction::Generate));
    assert_eq!(keymap.get(&b"o".to_vec()), Some(&KeyAction::OpenFile));
    assert_eq!(keymap.get(&b"p".to_vec()), Some(&KeyAction::Paste));
    assert_eq!(keymap.get(&b"v".to_vec()), Some(&KeyAction::VoiceMenu));
    assert_eq!(keymap.get(&b"+".to_vec()), Some(&KeyAction::VolumeUp));
    assert_eq!(keymap.get(&b"-".to_vec()), Some(&KeyAction::VolumeDown));
    assert_eq!(keymap.get(&b"\x1b".to_vec()), Some(&KeyAction::DismissNotice));
    assert_eq!(keymap.get(&b"q".to_vec()), Some(&KeyAction::Quit));
    assert_eq!(keymap.get(&b"\x03".to_vec()), Some(&KeyAction::Quit));
    assert_eq!(keymap.get(&b"x".to_vec()), None);
}

#[test]
fn test_transport_keys() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, clock) = setup(&dir);
    state.controller.load_buffer(AudioBuffer::mono(1000, vec![0.0; 30_000]));

    press(&mut state, &mut transport, &[" "]);
    assert!(state.controller.is_playing());

    clock.advance(4.0);
    press(&mut state, &mut transport, &["\x1b[C"]);
    assert!((state.controller.current_time() - 14.0).abs() < 1e-9);

    press(&mut state, &mut transport, &["\x1b[D", "\x1b[D"]);
    assert_eq!(state.controller.current_time(), 0.0);

    press(&mut state, &mut transport, &[" "]);
    assert_eq!(state.controller.state(), PlaybackState::Paused);

    press(&mut state, &mut transport, &["s"]);
    assert_eq!(state.controller.state(), PlaybackState::Stopped);

    let action = dispatch(b"x", &mut state, &mut transport).unwrap();
    assert_eq!(action, HandlerAction::Passthrough);

    press(&mut state, &mut transport, &["q"]);
    assert!(state.quit);
}

#[test]
fn test_voice_menu() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    press(&mut state, &mut transport, &["v"]);
    assert_eq!(state.handlers.len(), 1);
    let prompt = state.handlers.prompt().unwrap();
    assert!(prompt.contains("  2 Kore    Female  Calm & soothing"));
    assert!(prompt.contains("▸ 5 Zephyr  Female  Soft & gentle"));
    assert!(prompt.contains("  3 Fenrir  Male    Deep & authoritative"));

    // The menu replaces the help line on screen, one row per voice
    let frame = render(&state, 80, 24);
    assert!(frame.contains("4 Charon  Male    Steady & professional"));
    assert!(!frame.contains("space play/pause"));

    // Out-of-range digits and transport keys are swallowed by the menu
    press(&mut state, &mut transport, &["7", "q"]);
    assert!(!state.quit);
    assert_eq!(state.handlers.len(), 0);

    press(&mut state, &mut transport, &["v", "2"]);
    assert_eq!(state.voice(), Voice::Kore);
    assert!(state.handlers.is_empty());

    press(&mut state, &mut transport, &["v"]);
    assert!(state.handlers.prompt().unwrap().contains("▸ 2 Kore"));
}

#[test]
fn test_jump_input() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    // Nothing to jump in yet
    press(&mut state, &mut transport, &["j"]);
    assert!(state.handlers.is_empty());

    state.controller.load_buffer(AudioBuffer::mono(1000, vec![0.0; 120_000]));
    press(&mut state, &mut transport, &["j", "1", ":", "x", "\x7f", "05"]);
    assert_eq!(state.handlers.prompt().as_deref(), Some("Jump to (seconds or m:ss): 1:05_"));

    press(&mut state, &mut transport, &["\r"]);
    assert!(state.handlers.is_empty());
    assert_eq!(state.controller.current_time(), 65.0);
}

#[test]
fn test_line_input_cancel() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    press(&mut state, &mut transport, &["o", "/tmp/whatever.txt", "\x1b"]);
    assert!(state.handlers.is_empty());
    assert_eq!(state.notice(), None);
}

#[test]
fn test_open_file_input() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);
    let path = dir.path().join("story.txt");
    std::fs::write(&path, "Once upon a time.").unwrap();

    // A pasted path with the Enter in the same read
    let typed = format!("{}\r", path.display());
    press(&mut state, &mut transport, &["o", typed.as_str()]);
    assert!(state.handlers.is_empty());
    assert_eq!(state.text(), "Once upon a time.");
}

#[test]
fn test_failed_input_callback_removes_handler() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    press(&mut state, &mut transport, &["o", "missing.pdf"]);
    assert!(dispatch(b"\r", &mut state, &mut transport).is_err());
    assert!(state.handlers.is_empty());
}

#[test]
fn test_keys_batched_in_one_read() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);
    state.controller.load_buffer(AudioBuffer::mono(1000, vec![0.0; 120_000]));

    // Held arrow key: three skips arrive together
    press(&mut state, &mut transport, &["\x1b[C\x1b[C\x1b[C"]);
    assert_eq!(state.controller.current_time(), 30.0);

    // A modal opened mid-read receives the rest of it
    press(&mut state, &mut transport, &["j1:05\r"]);
    assert!(state.handlers.is_empty());
    assert_eq!(state.controller.current_time(), 65.0);

    press(&mut state, &mut transport, &["\x1b[D0"]);
    assert_eq!(state.controller.current_time(), 0.0);
}

#[test]
fn test_quit_stops_reading_keys() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    press(&mut state, &mut transport, &["qv"]);
    assert!(state.quit);
    assert!(state.handlers.is_empty());
}

#[test]
fn test_escape_dismisses_notice() {
    let dir = TempDir::new().unwrap();
    let (mut state, mut transport, _) = setup(&dir);

    press(&mut state, &mut transport, &[" "]);
    assert!(matches!(state.notice(), Some(Notice::Info(_))));

    press(&mut state, &mut transport, &["\x1b"]);
    assert_eq!(state.notice(), None);
}
