//! Codec for the command strings carried inside forwarded `msg` envelopes.
//!
//! The relay forwards `message` verbatim and never needs to understand it.
//! Parsing exists for the edges: test clients and tools build commands with
//! [`Command`]'s `Display` impl, and the router uses [`Command::kind`] to log
//! *what sort* of message went through without logging its payload.
//!
//! # Formats
//!
//! ```text
//! strength-<channel>+<mode>+<value>        adjust one channel (1=A, 2=B; mode 0 dec, 1 inc, 2 set)
//! strength-<a>+<b>+<limit_a>+<limit_b>     device reports current strengths and limits
//! pulse-<A|B>:["<16 hex>", ...]            queue waveform frames on a channel
//! clear-<1|2>                              clear a channel's waveform queue
//! feedback-<0..9>                          a feedback button was pressed
//! ```
//!
//! Anything that does not start with one of these prefixes parses as
//! [`Command::Other`].

use std::fmt;

use thiserror::Error;

/// Highest strength value a channel accepts.
pub const MAX_STRENGTH: u8 = 200;

/// Most waveform frames a single `pulse-` command may carry.
pub const MAX_PULSE_FRAMES: usize = 100;

/// Length of one waveform frame in hex characters (8 bytes).
pub const PULSE_FRAME_HEX_LEN: usize = 16;

/// Highest feedback button index.
pub const MAX_FEEDBACK_BUTTON: u8 = 9;

/// Errors produced when a string has a known prefix but a malformed body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("malformed {kind} command: {detail}")]
    Malformed { kind: &'static str, detail: String },

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("value {value} out of range 0..={max}")]
    OutOfRange { value: u32, max: u32 },

    #[error("pulse frame {index} is not 16 hex characters")]
    BadPulseFrame { index: usize },

    #[error("too many pulse frames: {0} (max 100)")]
    TooManyFrames(usize),
}

/// One of the two output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// Numeric spelling used by `strength-` and `clear-` (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Channel::A => 1,
            Channel::B => 2,
        }
    }

    /// Letter spelling used by `pulse-` (A or B).
    pub fn letter(self) -> char {
        match self {
            Channel::A => 'A',
            Channel::B => 'B',
        }
    }

    fn from_number(text: &str) -> Result<Self, CommandError> {
        match text {
            "1" => Ok(Channel::A),
            "2" => Ok(Channel::B),
            other => Err(CommandError::UnknownChannel(other.to_string())),
        }
    }

    fn from_letter(text: &str) -> Result<Self, CommandError> {
        match text {
            "A" => Ok(Channel::A),
            "B" => Ok(Channel::B),
            other => Err(CommandError::UnknownChannel(other.to_string())),
        }
    }
}

/// How a `strength-` adjustment applies its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StrengthMode {
    Decrease = 0,
    Increase = 1,
    Set = 2,
}

impl TryFrom<u8> for StrengthMode {
    type Error = CommandError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StrengthMode::Decrease),
            1 => Ok(StrengthMode::Increase),
            2 => Ok(StrengthMode::Set),
            other => Err(CommandError::OutOfRange {
                value: u32::from(other),
                max: 2,
            }),
        }
    }
}

/// A parsed command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `strength-<channel>+<mode>+<value>`
    AdjustStrength {
        channel: Channel,
        mode: StrengthMode,
        value: u8,
    },
    /// `strength-<a>+<b>+<limit_a>+<limit_b>`
    StrengthReport {
        a: u8,
        b: u8,
        limit_a: u8,
        limit_b: u8,
    },
    /// `pulse-<A|B>:[...]`
    Pulse { channel: Channel, frames: Vec<String> },
    /// `clear-<1|2>`
    Clear { channel: Channel },
    /// `feedback-<n>`
    Feedback { button: u8 },
    /// Anything without a recognised prefix.
    Other(String),
}

impl Command {
    /// Parses a `message` string.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the string starts with a known prefix
    /// but its body is malformed.  Unrecognised strings are not errors; they
    /// become [`Command::Other`].
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        if let Some(body) = text.strip_prefix("strength-") {
            parse_strength(body)
        } else if let Some(body) = text.strip_prefix("pulse-") {
            parse_pulse(body)
        } else if let Some(body) = text.strip_prefix("clear-") {
            Ok(Command::Clear {
                channel: Channel::from_number(body)?,
            })
        } else if let Some(body) = text.strip_prefix("feedback-") {
            let button = parse_bounded(body, MAX_FEEDBACK_BUTTON, "feedback")?;
            Ok(Command::Feedback { button })
        } else {
            Ok(Command::Other(text.to_string()))
        }
    }

    /// Static name of the command kind, safe to put in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AdjustStrength { .. } => "strength",
            Command::StrengthReport { .. } => "strength-report",
            Command::Pulse { .. } => "pulse",
            Command::Clear { .. } => "clear",
            Command::Feedback { .. } => "feedback",
            Command::Other(_) => "other",
        }
    }

    /// Classifies a raw message for logging; malformed known prefixes report
    /// as `"malformed"`.
    pub fn kind_of(text: &str) -> &'static str {
        match Self::parse(text) {
            Ok(cmd) => cmd.kind(),
            Err(_) => "malformed",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AdjustStrength {
                channel,
                mode,
                value,
            } => write!(f, "strength-{}+{}+{}", channel.number(), *mode as u8, value),
            Command::StrengthReport {
                a,
                b,
                limit_a,
                limit_b,
            } => write!(f, "strength-{a}+{b}+{limit_a}+{limit_b}"),
            Command::Pulse { channel, frames } => {
                // serde_json quotes and escapes each frame the same way peers do.
                let list = serde_json::to_string(frames).map_err(|_| fmt::Error)?;
                write!(f, "pulse-{}:{}", channel.letter(), list)
            }
            Command::Clear { channel } => write!(f, "clear-{}", channel.number()),
            Command::Feedback { button } => write!(f, "feedback-{button}"),
            Command::Other(raw) => f.write_str(raw),
        }
    }
}

// ── Parsers ───────────────────────────────────────────────────────────────────

fn parse_strength(body: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = body.split('+').collect();
    match parts.as_slice() {
        [channel, mode, value] => {
            let channel = Channel::from_number(channel)?;
            let mode = StrengthMode::try_from(parse_bounded(mode, 2, "strength")?)?;
            let value = parse_bounded(value, MAX_STRENGTH, "strength")?;
            Ok(Command::AdjustStrength {
                channel,
                mode,
                value,
            })
        }
        [a, b, limit_a, limit_b] => Ok(Command::StrengthReport {
            a: parse_bounded(a, MAX_STRENGTH, "strength")?,
            b: parse_bounded(b, MAX_STRENGTH, "strength")?,
            limit_a: parse_bounded(limit_a, MAX_STRENGTH, "strength")?,
            limit_b: parse_bounded(limit_b, MAX_STRENGTH, "strength")?,
        }),
        _ => Err(CommandError::Malformed {
            kind: "strength",
            detail: format!("expected 3 or 4 '+'-separated fields, got {}", parts.len()),
        }),
    }
}

fn parse_pulse(body: &str) -> Result<Command, CommandError> {
    let (channel, list) = body.split_once(':').ok_or_else(|| CommandError::Malformed {
        kind: "pulse",
        detail: "missing ':' after channel".to_string(),
    })?;
    let channel = Channel::from_letter(channel)?;

    let frames: Vec<String> = serde_json::from_str(list).map_err(|e| CommandError::Malformed {
        kind: "pulse",
        detail: e.to_string(),
    })?;

    if frames.len() > MAX_PULSE_FRAMES {
        return Err(CommandError::TooManyFrames(frames.len()));
    }
    for (index, frame) in frames.iter().enumerate() {
        let valid = frame.len() == PULSE_FRAME_HEX_LEN
            && frame.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(CommandError::BadPulseFrame { index });
        }
    }

    Ok(Command::Pulse { channel, frames })
}

fn parse_bounded(text: &str, max: u8, kind: &'static str) -> Result<u8, CommandError> {
    let value: u32 = text.parse().map_err(|_| CommandError::Malformed {
        kind,
        detail: format!("'{text}' is not a number"),
    })?;
    if value > u32::from(max) {
        return Err(CommandError::OutOfRange {
            value,
            max: u32::from(max),
        });
    }
    // Bounded above by a u8 `max`, so the cast cannot truncate.
    Ok(value as u8)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
