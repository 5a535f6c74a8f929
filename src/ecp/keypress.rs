//! Key command catalog. A closed set of named remote commands plus `Lit`,
//! which carries a single typed character, each mapped bidirectionally to the
//! token used in the `/keypress/{token}` URL path.

use std::str::FromStr;

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

const LIT_PREFIX: &str = "Lit_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPress {
    Home,
    Rev,
    Fwd,
    Play,
    Select,
    Left,
    Right,
    Down,
    Up,
    Back,
    InstantReplay,
    Info,
    Backspace,
    Search,
    Enter,
    /// Only available on certain devices
    FindRemote,
    /// Only available on Roku TVs
    VolumeDown,
    /// Only available on Roku TVs
    VolumeMute,
    /// Only available on Roku TVs
    VolumeUp,
    /// Only available on Roku TVs
    PowerOff,
    /// Only available on Roku TVs
    PowerOn,
    /// Only available on Roku TVs
    Power,
    /// Only available on Roku TVs
    ChannelUp,
    /// Only available on Roku TVs
    ChannelDown,
    /// Only available on Roku TVs
    InputTuner,
    /// Only available on Roku TVs
    InputHDMI1,
    /// Only available on Roku TVs
    InputHDMI2,
    /// Only available on Roku TVs
    InputHDMI3,
    /// Only available on Roku TVs
    InputHDMI4,
    /// Only available on Roku TVs
    InputAV1,
    /// A single literal typed character
    Lit(char),
}

impl KeyPress {
    /// The exact string placed in the keypress URL path segment.
    pub fn wire_token(&self) -> String {
        match self {
            KeyPress::Home => "Home".to_string(),
            KeyPress::Rev => "Rev".to_string(),
            KeyPress::Fwd => "Fwd".to_string(),
            KeyPress::Play => "Play".to_string(),
            KeyPress::Select => "Select".to_string(),
            KeyPress::Left => "Left".to_string(),
            KeyPress::Right => "Right".to_string(),
            KeyPress::Down => "Down".to_string(),
            KeyPress::Up => "Up".to_string(),
            KeyPress::Back => "Back".to_string(),
            KeyPress::InstantReplay => "InstantReplay".to_string(),
            KeyPress::Info => "Info".to_string(),
            KeyPress::Backspace => "Backspace".to_string(),
            KeyPress::Search => "Search".to_string(),
            KeyPress::Enter => "Enter".to_string(),
            KeyPress::FindRemote => "FindRemote".to_string(),
            KeyPress::VolumeDown => "VolumeDown".to_string(),
            KeyPress::VolumeMute => "VolumeMute".to_string(),
            KeyPress::VolumeUp => "VolumeUp".to_string(),
            KeyPress::PowerOff => "PowerOff".to_string(),
            KeyPress::PowerOn => "PowerOn".to_string(),
            KeyPress::Power => "Power".to_string(),
            KeyPress::ChannelUp => "ChannelUp".to_string(),
            KeyPress::ChannelDown => "ChannelDown".to_string(),
            KeyPress::InputTuner => "InputTuner".to_string(),
            KeyPress::InputHDMI1 => "InputHDMI1".to_string(),
            KeyPress::InputHDMI2 => "InputHDMI2".to_string(),
            KeyPress::InputHDMI3 => "InputHDMI3".to_string(),
            KeyPress::InputHDMI4 => "InputHDMI4".to_string(),
            KeyPress::InputAV1 => "InputAV1".to_string(),
            KeyPress::Lit(c) => {
                let mut buf = [0u8; 4];
                let encoded = utf8_percent_encode(c.encode_utf8(&mut buf), NON_ALPHANUMERIC);
                format!("{LIT_PREFIX}{encoded}")
            }
        }
    }

    /// Decode a wire token. `Lit_` tokens succeed only when the
    /// percent-decoded remainder is exactly one character; unrecognized
    /// tokens yield `None`.
    pub fn from_wire_token(token: &str) -> Option<KeyPress> {
        let key = match token {
            "Home" => KeyPress::Home,
            "Rev" => KeyPress::Rev,
            "Fwd" => KeyPress::Fwd,
            "Play" => KeyPress::Play,
            "Select" => KeyPress::Select,
            "Left" => KeyPress::Left,
            "Right" => KeyPress::Right,
            "Down" => KeyPress::Down,
            "Up" => KeyPress::Up,
            "Back" => KeyPress::Back,
            "InstantReplay" => KeyPress::InstantReplay,
            "Info" => KeyPress::Info,
            "Backspace" => KeyPress::Backspace,
            "Search" => KeyPress::Search,
            "Enter" => KeyPress::Enter,
            "FindRemote" => KeyPress::FindRemote,
            "VolumeDown" => KeyPress::VolumeDown,
            "VolumeMute" => KeyPress::VolumeMute,
            "VolumeUp" => KeyPress::VolumeUp,
            "PowerOff" => KeyPress::PowerOff,
            "PowerOn" => KeyPress::PowerOn,
            "Power" => KeyPress::Power,
            "ChannelUp" => KeyPress::ChannelUp,
            "ChannelDown" => KeyPress::ChannelDown,
            "InputTuner" => KeyPress::InputTuner,
            "InputHDMI1" => KeyPress::InputHDMI1,
            "InputHDMI2" => KeyPress::InputHDMI2,
            "InputHDMI3" => KeyPress::InputHDMI3,
            "InputHDMI4" => KeyPress::InputHDMI4,
            "InputAV1" => KeyPress::InputAV1,
            _ => {
                let rest = token.strip_prefix(LIT_PREFIX)?;
                let decoded = percent_decode_str(rest).decode_utf8().ok()?;
                let mut chars = decoded.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                KeyPress::Lit(c)
            }
        };
        Some(key)
    }

    /// True exactly for the volume/power/channel/input commands, which only
    /// work on Roku TVs. Callers use this to gate commands on sticks and
    /// set-top devices.
    pub fn is_tv_only(&self) -> bool {
        matches!(
            self,
            KeyPress::VolumeUp
                | KeyPress::VolumeDown
                | KeyPress::VolumeMute
                | KeyPress::PowerOff
                | KeyPress::PowerOn
                | KeyPress::Power
                | KeyPress::ChannelUp
                | KeyPress::ChannelDown
                | KeyPress::InputTuner
                | KeyPress::InputHDMI1
                | KeyPress::InputHDMI2
                | KeyPress::InputHDMI3
                | KeyPress::InputHDMI4
                | KeyPress::InputAV1
        )
    }

    /// Decompose text into the per-character `Lit` presses used for typing.
    pub fn lit_sequence(text: &str) -> Vec<KeyPress> {
        text.chars().map(KeyPress::Lit).collect()
    }

    /// Every named (non-`Lit`) command.
    pub fn named_commands() -> &'static [KeyPress] {
        &[
            KeyPress::Home,
            KeyPress::Rev,
            KeyPress::Fwd,
            KeyPress::Play,
            KeyPress::Select,
            KeyPress::Left,
            KeyPress::Right,
            KeyPress::Down,
            KeyPress::Up,
            KeyPress::Back,
            KeyPress::InstantReplay,
            KeyPress::Info,
            KeyPress::Backspace,
            KeyPress::Search,
            KeyPress::Enter,
            KeyPress::FindRemote,
            KeyPress::VolumeDown,
            KeyPress::VolumeMute,
            KeyPress::VolumeUp,
            KeyPress::PowerOff,
            KeyPress::PowerOn,
            KeyPress::Power,
            KeyPress::ChannelUp,
            KeyPress::ChannelDown,
            KeyPress::InputTuner,
            KeyPress::InputHDMI1,
            KeyPress::InputHDMI2,
            KeyPress::InputHDMI3,
            KeyPress::InputHDMI4,
            KeyPress::InputAV1,
        ]
    }
}

impl FromStr for KeyPress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPress::from_wire_token(s).ok_or_else(|| format!("unknown key command: {s}"))
    }
}

impl std::fmt::Display for KeyPress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_token())
    }
}
