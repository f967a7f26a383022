#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    /// Clear the local transcript.
    Reset,
    /// Delete the server-side history, then clear the local transcript.
    Forget,
    /// Drop the persisted identity and start a fresh session.
    New,
    /// Switch to a known session id and load its history.
    Resume(Option<String>),
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "Commands: /help, /reset, /forget, /new, /resume <session-id>, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed).to_string();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/reset" | "/clear" => SlashCommand::Reset,
        "/forget" => SlashCommand::Forget,
        "/new" => SlashCommand::New,
        "/resume" => SlashCommand::Resume(words.next().map(ToOwned::to_owned)),
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}
