//! System command vocabulary
//!
//! Every command is a row of data: its spoken keywords per language and the
//! contexts in which it may run. Adding a command means adding rows here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::context::GameContext;
use super::skill::Language;

/// Highest selectable story chapter
pub const MAX_CHAPTER: u8 = 12;

/// A system (non-skill) voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandId {
    StartGame,
    OpenSettings,
    CloseSettings,
    OpenStore,
    QuitGame,
    ShowHelp,
    SelectStoryMode,
    SelectEndlessMode,
    GoBack,
    GoToMainMenu,
    GoToGameModeSelection,
    SelectTutorial,
    /// Story chapter `1..=12`
    SelectChapter(u8),
    StartEndless,
    PauseGame,
    OpenMenu,
    CloseMenu,
    ResumeGame,
    RestartGame,
    QuitToMainMenu,
    MoveLeft,
    MoveRight,
    Jump,
    StopMove,
    ShowAudioTab,
    ShowGraphicsTab,
    ShowLanguageTab,
    ShowGameTab,
    ExpandVoiceRecognition,
    CollapseVoiceRecognition,
    ExpandKeyBinding,
    CollapseKeyBinding,
}

const SIMPLE_COMMANDS: &[(CommandId, &str)] = &[
    (CommandId::StartGame, "StartGame"),
    (CommandId::OpenSettings, "OpenSettings"),
    (CommandId::CloseSettings, "CloseSettings"),
    (CommandId::OpenStore, "OpenStore"),
    (CommandId::QuitGame, "QuitGame"),
    (CommandId::ShowHelp, "ShowHelp"),
    (CommandId::SelectStoryMode, "SelectStoryMode"),
    (CommandId::SelectEndlessMode, "SelectEndlessMode"),
    (CommandId::GoBack, "GoBack"),
    (CommandId::GoToMainMenu, "GoToMainMenu"),
    (CommandId::GoToGameModeSelection, "GoToGameModeSelection"),
    (CommandId::SelectTutorial, "SelectTutorial"),
    (CommandId::StartEndless, "StartEndless"),
    (CommandId::PauseGame, "PauseGame"),
    (CommandId::OpenMenu, "OpenMenu"),
    (CommandId::CloseMenu, "CloseMenu"),
    (CommandId::ResumeGame, "ResumeGame"),
    (CommandId::RestartGame, "RestartGame"),
    (CommandId::QuitToMainMenu, "QuitToMainMenu"),
    (CommandId::MoveLeft, "MoveLeft"),
    (CommandId::MoveRight, "MoveRight"),
    (CommandId::Jump, "Jump"),
    (CommandId::StopMove, "StopMove"),
    (CommandId::ShowAudioTab, "ShowAudioTab"),
    (CommandId::ShowGraphicsTab, "ShowGraphicsTab"),
    (CommandId::ShowLanguageTab, "ShowLanguageTab"),
    (CommandId::ShowGameTab, "ShowGameTab"),
    (CommandId::ExpandVoiceRecognition, "ExpandVoiceRecognition"),
    (CommandId::CollapseVoiceRecognition, "CollapseVoiceRecognition"),
    (CommandId::ExpandKeyBinding, "ExpandKeyBinding"),
    (CommandId::CollapseKeyBinding, "CollapseKeyBinding"),
];

impl CommandId {
    /// Every command, chapters included
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut all: Vec<Self> = SIMPLE_COMMANDS.iter().map(|(id, _)| *id).collect();
        all.extend((1..=MAX_CHAPTER).map(Self::SelectChapter));
        all.sort();
        all
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Self::SelectChapter(n) = self {
            return write!(f, "SelectChapter{n}");
        }

        let name = SIMPLE_COMMANDS
            .iter()
            .find(|(id, _)| id == self)
            .map_or("Unknown", |(_, name)| *name);
        f.write_str(name)
    }
}

/// Unrecognized command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command: {}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for CommandId {
    type Err = UnknownCommand;

    /// Case-insensitive parse of a command name such as `PauseGame` or `SelectChapter3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();

        if let Some((_, rest)) = name
            .to_ascii_lowercase()
            .split_once("selectchapter")
            .filter(|(prefix, _)| prefix.is_empty())
        {
            return rest
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=MAX_CHAPTER).contains(n))
                .map(Self::SelectChapter)
                .ok_or_else(|| UnknownCommand(name.to_string()));
        }

        SIMPLE_COMMANDS
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id)
            .ok_or_else(|| UnknownCommand(name.to_string()))
    }
}

impl Serialize for CommandId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CommandId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Spoken phrases for a command; the first entry doubles as its hint
struct KeywordRow {
    command: CommandId,
    korean: &'static [&'static str],
    english: &'static [&'static str],
}

const fn row(
    command: CommandId,
    korean: &'static [&'static str],
    english: &'static [&'static str],
) -> KeywordRow {
    KeywordRow {
        command,
        korean,
        english,
    }
}

const KEYWORDS: &[KeywordRow] = &[
    row(CommandId::StartGame, &["게임 시작", "게임시작", "시작", "플레이"], &["start game", "start", "play"]),
    row(CommandId::OpenSettings, &["설정", "옵션", "세팅"], &["settings", "options"]),
    row(CommandId::CloseSettings, &["설정 닫아", "옵션 닫아", "닫기"], &["close settings", "close options", "close"]),
    row(CommandId::OpenStore, &["상점", "스토어"], &["store", "shop"]),
    row(CommandId::QuitGame, &["게임 종료", "종료", "끝내기"], &["quit game", "quit", "exit"]),
    row(CommandId::ShowHelp, &["도움말", "도와"], &["help"]),
    row(CommandId::SelectStoryMode, &["스토리 모드", "스토리모드", "스토리"], &["story mode", "story"]),
    row(CommandId::SelectEndlessMode, &["무한 모드", "무한모드", "엔드리스", "무한"], &["endless mode", "endless"]),
    row(CommandId::GoBack, &["뒤로가기", "뒤로", "이전", "취소"], &["go back", "back", "cancel"]),
    row(CommandId::GoToMainMenu, &["메인 메뉴", "메인메뉴", "메인으로", "메인"], &["main menu"]),
    row(
        CommandId::GoToGameModeSelection,
        &["게임 모드 선택", "모드 선택", "게임 모드"],
        &["mode select", "game mode"],
    ),
    row(CommandId::SelectTutorial, &["튜토리얼", "챕터 0", "챕터0", "영챕터"], &["tutorial", "chapter 0"]),
    row(CommandId::SelectChapter(1), &["챕터 1", "챕터1", "교만"], &["chapter 1", "chapter one", "pride"]),
    row(CommandId::SelectChapter(2), &["챕터 2", "챕터2", "탐욕"], &["chapter 2", "chapter two", "greed"]),
    row(CommandId::SelectChapter(3), &["챕터 3", "챕터3", "색욕"], &["chapter 3", "chapter three", "lust"]),
    row(CommandId::SelectChapter(4), &["챕터 4", "챕터4", "질투"], &["chapter 4", "chapter four", "envy"]),
    row(CommandId::SelectChapter(5), &["챕터 5", "챕터5", "폭식"], &["chapter 5", "chapter five", "gluttony"]),
    row(CommandId::SelectChapter(6), &["챕터 6", "챕터6", "분노"], &["chapter 6", "chapter six", "wrath"]),
    row(CommandId::SelectChapter(7), &["챕터 7", "챕터7", "나태"], &["chapter 7", "chapter seven", "sloth"]),
    row(CommandId::SelectChapter(8), &["챕터 8", "챕터8"], &["chapter 8", "chapter eight"]),
    row(CommandId::SelectChapter(9), &["챕터 9", "챕터9"], &["chapter 9", "chapter nine"]),
    row(CommandId::SelectChapter(10), &["챕터 10", "챕터10"], &["chapter 10", "chapter ten"]),
    row(CommandId::SelectChapter(11), &["챕터 11", "챕터11"], &["chapter 11", "chapter eleven"]),
    row(CommandId::SelectChapter(12), &["챕터 12", "챕터12"], &["chapter 12", "chapter twelve"]),
    row(CommandId::StartEndless, &["게임 시작", "시작", "플레이"], &["start game", "start", "play"]),
    row(CommandId::PauseGame, &["일시정지", "퍼즈"], &["pause"]),
    row(CommandId::OpenMenu, &["메뉴", "메뉴 열어"], &["menu", "open menu"]),
    row(CommandId::CloseMenu, &["메뉴 닫아", "메뉴 닫기"], &["close menu"]),
    row(CommandId::ResumeGame, &["계속", "재개", "게임 계속"], &["resume", "continue"]),
    row(CommandId::RestartGame, &["재시작", "다시 시작", "재도전", "리스타트"], &["restart", "retry", "try again"]),
    row(CommandId::QuitToMainMenu, &["메인 메뉴", "메인으로", "나가기"], &["main menu", "quit to menu"]),
    row(CommandId::MoveLeft, &["왼쪽", "왼쪽으로 이동", "왼쪽 이동", "왼쪽으로"], &["left", "move left", "go left"]),
    row(CommandId::MoveRight, &["오른쪽", "오른쪽으로 이동", "오른쪽 이동", "오른쪽으로"], &["right", "move right", "go right"]),
    row(CommandId::Jump, &["점프", "뛰어"], &["jump"]),
    row(CommandId::StopMove, &["정지", "멈춰", "그만"], &["stop", "halt"]),
    row(CommandId::ShowAudioTab, &["오디오", "오디오 탭", "오디오탭", "소리 설정"], &["audio", "audio tab", "sound"]),
    row(CommandId::ShowGraphicsTab, &["그래픽", "그래픽 탭", "그래픽탭", "화면 설정"], &["graphics", "graphics tab", "video"]),
    row(CommandId::ShowLanguageTab, &["언어", "언어 탭", "언어탭", "언어 설정"], &["language", "language tab"]),
    row(CommandId::ShowGameTab, &["게임 탭", "게임탭", "게임 설정"], &["game tab", "game settings"]),
    row(
        CommandId::ExpandVoiceRecognition,
        &["음성인식 펼쳐", "음성인식 열어", "음성인식 보여줘"],
        &["expand voice", "show voice"],
    ),
    row(
        CommandId::CollapseVoiceRecognition,
        &["음성인식 접어", "음성인식 닫아", "음성인식 숨겨"],
        &["collapse voice", "hide voice"],
    ),
    row(
        CommandId::ExpandKeyBinding,
        &["키설정 펼쳐", "키설정 열어", "키바인딩 펼쳐"],
        &["expand key binding", "show key binding"],
    ),
    row(
        CommandId::CollapseKeyBinding,
        &["키설정 접어", "키설정 닫아", "키바인딩 접어"],
        &["collapse key binding", "hide key binding"],
    ),
];

const STORY_COMMANDS: &[CommandId] = &[
    CommandId::SelectTutorial,
    CommandId::SelectChapter(1),
    CommandId::SelectChapter(2),
    CommandId::SelectChapter(3),
    CommandId::SelectChapter(4),
    CommandId::SelectChapter(5),
    CommandId::SelectChapter(6),
    CommandId::SelectChapter(7),
    CommandId::SelectChapter(8),
    CommandId::SelectChapter(9),
    CommandId::SelectChapter(10),
    CommandId::SelectChapter(11),
    CommandId::SelectChapter(12),
    CommandId::GoBack,
    CommandId::GoToMainMenu,
    CommandId::GoToGameModeSelection,
];

/// Commands legal in `context`
#[must_use]
pub const fn allowed(context: GameContext) -> &'static [CommandId] {
    use CommandId as C;

    match context {
        GameContext::MainMenu => &[C::StartGame, C::OpenSettings, C::OpenStore, C::QuitGame, C::ShowHelp],
        GameContext::GameModeSelect => &[
            C::SelectStoryMode,
            C::SelectEndlessMode,
            C::GoBack,
            C::GoToMainMenu,
            C::OpenSettings,
        ],
        GameContext::StoryMode => STORY_COMMANDS,
        GameContext::EndlessMode => &[C::StartEndless, C::GoBack, C::GoToMainMenu, C::GoToGameModeSelection],
        GameContext::InGamePlaying => &[C::PauseGame, C::OpenMenu, C::MoveLeft, C::MoveRight, C::Jump, C::StopMove],
        GameContext::InGamePaused => &[
            C::ResumeGame,
            C::CloseMenu,
            C::OpenSettings,
            C::RestartGame,
            C::QuitToMainMenu,
            C::ShowHelp,
        ],
        GameContext::InGameGameOver => &[C::RestartGame, C::QuitToMainMenu, C::GoToMainMenu],
        GameContext::Options => &[
            C::ShowAudioTab,
            C::ShowGraphicsTab,
            C::ShowLanguageTab,
            C::ShowGameTab,
            C::ExpandVoiceRecognition,
            C::CollapseVoiceRecognition,
            C::ExpandKeyBinding,
            C::CollapseKeyBinding,
            C::CloseSettings,
            C::GoBack,
        ],
        GameContext::Store => &[C::GoBack, C::GoToMainMenu],
        GameContext::Unknown => &[],
    }
}

/// True if `command` may run in `context`
#[must_use]
pub fn is_allowed(command: CommandId, context: GameContext) -> bool {
    allowed(context).contains(&command)
}

fn keywords_of(command: CommandId, language: Language) -> &'static [&'static str] {
    let Some(row) = KEYWORDS.iter().find(|r| r.command == command) else {
        return &[];
    };

    match language {
        Language::Korean => row.korean,
        Language::English => row.english,
    }
}

/// Phrases for the commands legal in `context`, used to bias transcription
#[must_use]
pub fn keyword_hints(context: GameContext, language: Language) -> Vec<&'static str> {
    let mut hints: Vec<&'static str> = Vec::new();
    for &command in allowed(context) {
        if let Some(&first) = keywords_of(command, language).first()
            && !hints.contains(&first)
        {
            hints.push(first);
        }
    }
    hints
}

/// Message shown when a recognized command cannot run in `context`
#[must_use]
pub fn blocked_hint(context: GameContext, language: Language) -> String {
    let hints = keyword_hints(context, language);

    match (language, hints.is_empty()) {
        (Language::Korean, true) => "지금은 음성 명령을 사용할 수 없습니다".to_string(),
        (Language::English, true) => "Voice commands are not available here".to_string(),
        (Language::Korean, false) => format!("여기서 사용할 수 있는 명령: {}", hints.join(", ")),
        (Language::English, false) => format!("Available here: {}", hints.join(", ")),
    }
}

/// Lowercase and drop whitespace, the form all matching happens in
#[must_use]
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Match free text against command keywords
///
/// Longer keywords are tried first so "일시정지" is not read as "정지".
/// Commands legal in `context` are preferred; otherwise the best match among
/// all commands is returned so the caller can report it as blocked.
#[must_use]
pub fn classify_command(text: &str, context: GameContext) -> Option<CommandId> {
    let text = normalize(text);
    if text.is_empty() {
        return None;
    }

    let mut entries: Vec<(String, CommandId)> = KEYWORDS
        .iter()
        .flat_map(|r| {
            r.korean
                .iter()
                .chain(r.english)
                .map(move |k| (normalize(k), r.command))
        })
        .collect();

    // Stable, so table order breaks length ties
    entries.sort_by_key(|(k, _)| std::cmp::Reverse(k.chars().count()));

    let legal = allowed(context);
    entries
        .iter()
        .find(|(k, c)| legal.contains(c) && text.contains(k.as_str()))
        .or_else(|| entries.iter().find(|(k, _)| text.contains(k.as_str())))
        .map(|(_, c)| *c)
}
