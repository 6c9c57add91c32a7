//! User intents, decoupled from the text on the menu buttons.

/// Which day a schedule listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Day {
    Today,
    Tomorrow,
}

/// Everything a user can ask the bot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    PowerNow,
    Timer,
    FullSchedule(Day),
    Statistics,
    OpenWebsite,
    Help,
}

pub const BUTTON_POWER_NOW: &str = "⚡ Power now?";
pub const BUTTON_TIMER: &str = "⏱️ Timer";
pub const BUTTON_TODAY: &str = "📅 Today";
pub const BUTTON_TOMORROW: &str = "📅 Tomorrow";
pub const BUTTON_STATISTICS: &str = "📊 Statistics";
pub const BUTTON_WEBSITE: &str = "🌐 Website";

impl Command {
    /// Parse a slash command or a menu button label.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        match text {
            BUTTON_POWER_NOW => return Some(Command::PowerNow),
            BUTTON_TIMER => return Some(Command::Timer),
            BUTTON_TODAY => return Some(Command::FullSchedule(Day::Today)),
            BUTTON_TOMORROW => return Some(Command::FullSchedule(Day::Tomorrow)),
            BUTTON_STATISTICS => return Some(Command::Statistics),
            BUTTON_WEBSITE => return Some(Command::OpenWebsite),
            _ => {}
        }

        let rest = text.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        // Group chats address commands as `/cmd@BotName`.
        let name = parts.next()?.split('@').next()?.to_ascii_lowercase();
        let arg = parts.next().map(str::to_ascii_lowercase);

        match name.as_str() {
            "start" => Some(Command::Start),
            "status" | "now" => Some(Command::PowerNow),
            "timer" => Some(Command::Timer),
            "today" => Some(Command::FullSchedule(Day::Today)),
            "tomorrow" => Some(Command::FullSchedule(Day::Tomorrow)),
            "schedule" => match arg.as_deref() {
                Some("tomorrow") => Some(Command::FullSchedule(Day::Tomorrow)),
                _ => Some(Command::FullSchedule(Day::Today)),
            },
            "stats" | "statistics" => Some(Command::Statistics),
            "site" | "website" => Some(Command::OpenWebsite),
            "help" => Some(Command::Help),
            _ => None,
        }
    }

    /// Rows of the reply keyboard.
    pub fn menu() -> Vec<Vec<&'static str>> {
        vec![
            vec![BUTTON_POWER_NOW, BUTTON_TIMER],
            vec![BUTTON_TODAY, BUTTON_TOMORROW],
            vec![BUTTON_STATISTICS, BUTTON_WEBSITE],
        ]
    }
}
