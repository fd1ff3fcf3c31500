//! Terminal utilities

use crate::Result;
use nix::libc;
use std::io::Write;
use std::os::unix::io::RawFd;

/// Get the terminal size for the given file descriptor
pub fn get_terminal_size(fd: RawFd) -> Result<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };

    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Ok((ws.ws_col, ws.ws_row))
    } else {
        // Default size if ioctl fails
        Ok((80, 24))
    }
}

/// Set raw mode on a terminal file descriptor
///
/// Raw mode is required to see single keypresses, including control
/// characters and escape sequences.
pub fn set_raw_mode(fd: RawFd) -> Result<libc::termios> {
    let original_termios = unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        termios
    };

    let mut raw_termios = original_termios;

    unsafe {
        libc::cfmakeraw(&mut raw_termios);
        libc::tcsetattr(fd, libc::TCSANOW, &raw_termios);
    }

    Ok(original_termios)
}

/// Restore terminal attributes
///
/// Called on exit to return the terminal to normal state
pub fn restore_termios(fd: RawFd, termios: &libc::termios) {
    unsafe {
        libc::tcsetattr(fd, libc::TCSANOW, termios);
    }
}

/// Switch to the alternate screen and hide the cursor
pub fn enter_alternate_screen(out: &mut impl Write) -> Result<()> {
    out.write_all(b"\x1b[?1049h\x1b[?25l\x1b[2J")?;
    out.flush()?;
    Ok(())
}

/// Show the cursor and return to the main screen
pub fn leave_alternate_screen(out: &mut impl Write) -> Result<()> {
    out.write_all(b"\x1b[?25h\x1b[?1049l")?;
    out.flush()?;
    Ok(())
}
