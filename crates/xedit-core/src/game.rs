//! Supported game editions and the plugin loader state machine.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The closed set of titles the engine can be initialised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum GameMode {
    FalloutNV = 0,
    Fallout3 = 1,
    Oblivion = 2,
    Skyrim = 3,
    SkyrimSE = 4,
    Fallout4 = 5,
}

impl GameMode {
    pub const ALL: [GameMode; 6] = [
        GameMode::FalloutNV,
        GameMode::Fallout3,
        GameMode::Oblivion,
        GameMode::Skyrim,
        GameMode::SkyrimSE,
        GameMode::Fallout4,
    ];

    /// Native mode code passed to `SetGameMode`.
    pub fn code(self) -> i32 {
        u8::from(self) as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::FalloutNV => "Fallout NV",
            GameMode::Fallout3 => "Fallout 3",
            GameMode::Oblivion => "Oblivion",
            GameMode::Skyrim => "Skyrim",
            GameMode::SkyrimSE => "Skyrim SE",
            GameMode::Fallout4 => "Fallout 4",
        }
    }

    /// Folder-style name. Both Skyrim editions share one.
    pub fn short_name(self) -> &'static str {
        match self {
            GameMode::FalloutNV => "FalloutNV",
            GameMode::Fallout3 => "Fallout3",
            GameMode::Oblivion => "Oblivion",
            GameMode::Skyrim | GameMode::SkyrimSE => "Skyrim",
            GameMode::Fallout4 => "Fallout4",
        }
    }

    pub fn exe_name(self) -> &'static str {
        match self {
            GameMode::FalloutNV => "FalloutNV.exe",
            GameMode::Fallout3 => "Fallout3.exe",
            GameMode::Oblivion => "Oblivion.exe",
            GameMode::Skyrim => "TESV.exe",
            GameMode::SkyrimSE => "SkyrimSE.exe",
            GameMode::Fallout4 => "Fallout4.exe",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State reported by `GetLoaderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum LoaderState {
    Inactive = 0,
    Active,
    Done,
    Error,
}

impl LoaderState {
    pub fn is_finished(self) -> bool {
        matches!(self, LoaderState::Done | LoaderState::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes() {
        assert_eq!(GameMode::FalloutNV.code(), 0);
        assert_eq!(GameMode::Fallout4.code(), 5);
        assert_eq!(GameMode::try_from(4u8).unwrap(), GameMode::SkyrimSE);
        assert!(GameMode::try_from(6u8).is_err());
    }

    #[test]
    fn mode_names() {
        assert_eq!(GameMode::SkyrimSE.short_name(), "Skyrim");
        assert_eq!(GameMode::Skyrim.exe_name(), "TESV.exe");
        assert_eq!(GameMode::Fallout3.to_string(), "Fallout 3");
    }

    #[test]
    fn loader_finished() {
        assert!(!LoaderState::Active.is_finished());
        assert!(LoaderState::Error.is_finished());
    }
}
