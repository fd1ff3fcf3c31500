//! Audio engine backends

// Default output device via cpal
pub mod output;

// Clock-driven stand-in with no device (headless use and tests)
pub mod silent;
