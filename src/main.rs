//! readaloud main entry point
//!
//! The main loop waits on stdin with the frame interval as timeout. Each
//! wakeup it handles any keys, checks for a resize (SIGWINCH), advances the
//! state (engine events, finished synthesis) and redraws the view.

use log::{debug, error, info, warn};
use mio::{Events, Interest, Poll, Token};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use readaloud::audio::{create_engine, AudioEngine, SilentEngine};
use readaloud::input::{self, create_default_keymap, TransportHandler};
use readaloud::speech::{GeminiClient, SpeechClient, Voice};
use readaloud::state::config::Config;
use readaloud::state::State;
use readaloud::terminal::{
    enter_alternate_screen, get_terminal_size, leave_alternate_screen, render, restore_termios,
    set_raw_mode,
};
use readaloud::{ReadAloudError, Result};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Token for stdin in mio poll
const STDIN: Token = Token(0);

/// Global flag set by SIGWINCH handler
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

/// SIGWINCH handler - sets flag when terminal is resized
extern "C" fn handle_sigwinch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::Relaxed);
}

/// Command line options
#[derive(Debug, Default)]
struct Options {
    debug: bool,
    silent: bool,
    voice: Option<Voice>,
    text: Option<String>,
    file: Option<PathBuf>,
}

const USAGE: &str = "\
Usage: readaloud [OPTIONS] [FILE]

Options:
  -d, --debug        Log debug output to readaloud.log
      --voice NAME   Voice to use (Puck, Kore, Fenrir, Charon, Zephyr)
      --text TEXT    Start with TEXT in the reader
      --silent       Do not open an audio device
  -h, --help         Show this help";

fn parse_args(args: impl IntoIterator<Item = String>) -> std::result::Result<Options, String> {
    let mut opts = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-d" | "--debug" => opts.debug = true,
            "--silent" => opts.silent = true,
            "--voice" => {
                let name = args.next().ok_or("--voice needs a name")?;
                opts.voice = Some(name.parse()?);
            }
            "--text" => {
                opts.text = Some(args.next().ok_or("--text needs a value")?);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown option '{}'\n\n{}", flag, USAGE))
            }
            path => {
                if opts.file.is_some() {
                    return Err(format!("Only one file can be opened\n\n{}", USAGE));
                }
                opts.file = Some(PathBuf::from(path));
            }
        }
    }

    Ok(opts)
}

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(2);
        }
    };

    // Initialize logger
    if opts.debug {
        // Debug mode: write to readaloud.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("readaloud.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open readaloud.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "readaloud version {} starting (debug mode, logging to readaloud.log)",
            readaloud::VERSION
        );
    } else {
        // Normal mode: only errors, and stderr is hidden behind the
        // alternate screen anyway
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    if let Err(e) = run(opts) {
        error!("Fatal error: {}", e);
        eprintln!("readaloud: {}", e);
        process::exit(1);
    }
}

fn run(opts: Options) -> Result<()> {
    debug!("Initializing readaloud");

    let stdin_fd = io::stdin().as_raw_fd();
    if unsafe { libc::isatty(stdin_fd) } == 0 {
        eprintln!("Error: readaloud requires an interactive terminal (stdin is not a TTY)");
        process::exit(1);
    }

    let mut config = Config::load()?;
    info!("Configuration loaded from {:?}", config.path());
    if let Some(voice) = opts.voice {
        config.set_voice(voice);
    }

    let client: Option<Arc<dyn SpeechClient>> = match GeminiClient::from_config(&config) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("{}", e);
            None
        }
    };
    let key_missing = client.is_none();

    let engine: Box<dyn AudioEngine> = if opts.silent {
        info!("Silent mode requested");
        Box::new(SilentEngine::system())
    } else {
        create_engine()
    };

    let mut state = State::new(config, engine, client);
    if let Some(text) = &opts.text {
        state.set_text(text);
    }
    if let Some(path) = &opts.file {
        if let Err(e) = state.open_file(&path.to_string_lossy()) {
            state.report_error(&e);
        }
    }
    if key_missing && state.notice().is_none() {
        state.report_error(&ReadAloudError::Config(format!(
            "API key not found. Set {} to generate speech.",
            state.config.api_key_env()
        )));
    }

    let keymap = create_default_keymap();
    info!("Key handler initialized with {} bindings", keymap.len());
    let mut transport = TransportHandler::new(keymap);

    // Raw mode lets us see every keystroke including Ctrl+C
    let original_termios = set_raw_mode(stdin_fd)?;
    let mut stdout = io::stdout();
    enter_alternate_screen(&mut stdout)?;

    // Ensure we restore terminal on exit
    let _guard = TermiosGuard {
        fd: stdin_fd,
        termios: original_termios,
    };

    let (mut cols, mut rows) = get_terminal_size(stdin_fd)?;
    info!("Terminal size: {}x{}", cols, rows);

    unsafe {
        signal::signal(Signal::SIGWINCH, SigHandler::Handler(handle_sigwinch)).map_err(|e| {
            ReadAloudError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to set SIGWINCH handler: {}", e),
            ))
        })?;
    }

    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(16);
    let mut stdin_source = mio::unix::SourceFd(&stdin_fd);
    poll.registry()
        .register(&mut stdin_source, STDIN, Interest::READABLE)?;

    let frame = Duration::from_secs_f64(1.0 / state.config.fps() as f64);
    info!("readaloud ready - entering event loop at {} fps", state.config.fps());

    while !state.quit {
        match poll.poll(&mut events, Some(frame)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("poll interrupted by signal");
            }
            Err(e) => return Err(e.into()),
        }

        for event in events.iter() {
            if event.token() == STDIN {
                handle_stdin(&mut state, &mut transport)?;
            }
        }

        if RESIZE_PENDING.swap(false, Ordering::Relaxed) {
            (cols, rows) = get_terminal_size(stdin_fd)?;
            info!("Terminal resized to {}x{}", cols, rows);
        }

        state.tick();

        stdout.write_all(render(&state, cols, rows).as_bytes())?;
        stdout.flush()?;
    }

    info!("Exiting");
    Ok(())
}

/// Handle user input from stdin
///
/// Errors from commands are shown on the notice line; only a failed read
/// ends the program.
fn handle_stdin(state: &mut State, transport: &mut TransportHandler) -> Result<()> {
    let mut buf = [0u8; 4096];

    let n = io::stdin().read(&mut buf)?;
    if n == 0 {
        state.quit = true;
        return Ok(());
    }

    if let Err(e) = input::dispatch(&buf[..n], state, transport) {
        state.report_error(&e);
    }
    Ok(())
}

/// RAII guard to restore terminal on exit
///
/// Ensures the terminal is always returned to normal mode, even on error
struct TermiosGuard {
    fd: RawFd,
    termios: libc::termios,
}

impl Drop for TermiosGuard {
    fn drop(&mut self) {
        if let Err(e) = leave_alternate_screen(&mut io::stdout()) {
            debug!("Failed to leave alternate screen: {}", e);
        }
        restore_termios(self.fd, &self.termios);
        debug!("Terminal attributes restored");
    }
}
