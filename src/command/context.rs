//! Game screen state and the derived voice context

use std::fmt;

use serde::{Deserialize, Serialize};

/// Screen the host is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameScreen {
    #[default]
    MainMenu,
    GameModeSelect,
    StoryMode,
    EndlessMode,
    InGame,
    /// Any screen without voice commands (loading, credits)
    Other,
}

impl GameScreen {
    /// Parse a screen name as given on the command line
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "mainmenu" | "menu" | "main" => Some(Self::MainMenu),
            "gamemodeselect" | "gamemodeselection" | "modeselect" => Some(Self::GameModeSelect),
            "storymode" | "story" => Some(Self::StoryMode),
            "endlessmode" | "endless" => Some(Self::EndlessMode),
            "ingame" | "game" | "playing" => Some(Self::InGame),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Facts about the host's UI, supplied each time the context is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenState {
    pub screen: GameScreen,
    pub paused: bool,
    pub game_over: bool,
    pub options_open: bool,
    pub store_open: bool,
}

impl ScreenState {
    #[must_use]
    pub fn on(screen: GameScreen) -> Self {
        Self {
            screen,
            ..Self::default()
        }
    }
}

/// Where the player is, as far as voice commands are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameContext {
    MainMenu,
    GameModeSelect,
    StoryMode,
    EndlessMode,
    InGamePlaying,
    InGamePaused,
    InGameGameOver,
    Options,
    Store,
    Unknown,
}

impl GameContext {
    pub const ALL: [Self; 10] = [
        Self::MainMenu,
        Self::GameModeSelect,
        Self::StoryMode,
        Self::EndlessMode,
        Self::InGamePlaying,
        Self::InGamePaused,
        Self::InGameGameOver,
        Self::Options,
        Self::Store,
        Self::Unknown,
    ];

    /// Name sent to the transcription server
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::MainMenu => "Menu_MainMenu",
            Self::GameModeSelect => "Menu_GameModeSelect",
            Self::StoryMode => "Menu_StoryMode",
            Self::EndlessMode => "Menu_EndlessMode",
            Self::InGamePlaying => "InGame_Playing",
            Self::InGamePaused => "InGame_Paused",
            Self::InGameGameOver => "InGame_GameOver",
            Self::Options => "Menu_Options",
            Self::Store => "Menu_Store",
            Self::Unknown => "Unknown",
        }
    }

    /// True while gameplay is running
    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::InGamePlaying)
    }
}

impl fmt::Display for GameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Derive the voice context from the host's screen state
///
/// The options popup takes precedence everywhere. In game, game over wins
/// over pause. The store popup only applies on menu screens.
#[must_use]
pub const fn resolve_context(state: &ScreenState) -> GameContext {
    if state.options_open {
        return GameContext::Options;
    }

    match state.screen {
        GameScreen::InGame => {
            if state.game_over {
                GameContext::InGameGameOver
            } else if state.paused {
                GameContext::InGamePaused
            } else {
                GameContext::InGamePlaying
            }
        }
        _ if state.store_open && !matches!(state.screen, GameScreen::Other) => GameContext::Store,
        GameScreen::MainMenu => GameContext::MainMenu,
        GameScreen::GameModeSelect => GameContext::GameModeSelect,
        GameScreen::StoryMode => GameContext::StoryMode,
        GameScreen::EndlessMode => GameContext::EndlessMode,
        GameScreen::Other => GameContext::Unknown,
    }
}
