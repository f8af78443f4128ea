//! Slash commands shared by the TUI input line and the headless REPL.

use std::path::PathBuf;

use crate::agents::AgentKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Agent(AgentKind),
    Upload(Vec<PathBuf>),
    Repo(String),
    Modify(String),
    ResetModifier,
    Validate(Option<String>),
    Repos,
    NewChat,
    Voice(bool),
    Listen,
    Stop,
    TestVoice,
    Help,
    Quit,
}

/// What the user typed: a chat message or a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Command(Command),
}

pub const HELP_TEXT: &str = "\
Commands:
  /agent <name>      switch agent (general, document, repo, modifier, search, calculator)
  /upload <pdf>...   index PDF documents for the Document agent
  /repo <url>        clone and index a repository for the Repo agent
  /modify <url>      connect the Code Modifier agent to a repository
  /reset-modifier    disconnect the Code Modifier agent
  /validate [url]    check GITHUB_API_TOKEN and repository access
  /repos             list repositories the token can access
  /new               start a new chat
  /voice on|off      toggle spoken replies
  /listen            ask a question by voice
  /stop              stop speaking
  /test-voice        speak a test phrase
  /help              show this help
  /quit              exit";

/// Parse one line of input. Returns `Err` with a usage message for a
/// malformed command; any line not starting with `/` is a message.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Input::Message(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "agent" => {
            if args.is_empty() {
                return Err(
                    "Usage: /agent <general|document|repo|modifier|search|calculator>".into(),
                );
            }
            let kind = AgentKind::parse(args).ok_or_else(|| format!("Unknown agent: {args}"))?;
            Command::Agent(kind)
        }
        "upload" => {
            let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err("Usage: /upload <file.pdf> [more.pdf ...]".into());
            }
            Command::Upload(paths)
        }
        "repo" => Command::Repo(required(args, "Usage: /repo <repository url>")?),
        "modify" => Command::Modify(required(args, "Usage: /modify <repository url>")?),
        "reset-modifier" => Command::ResetModifier,
        "validate" => Command::Validate((!args.is_empty()).then(|| args.to_string())),
        "repos" => Command::Repos,
        "new" => Command::NewChat,
        "voice" => match args.to_lowercase().as_str() {
            "on" => Command::Voice(true),
            "off" => Command::Voice(false),
            _ => return Err("Usage: /voice on|off".into()),
        },
        "listen" => Command::Listen,
        "stop" => Command::Stop,
        "test-voice" => Command::TestVoice,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: /{other}. Type /help for a list.")),
    };
    Ok(Input::Command(command))
}

fn required(args: &str, usage: &str) -> Result<String, String> {
    if args.is_empty() {
        Err(usage.to_string())
    } else {
        Ok(args.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_input("  what is 2+2? ").unwrap(),
            Input::Message("what is 2+2?".into())
        );
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse_input("/agent calc").unwrap(),
            Input::Command(Command::Agent(AgentKind::Calculator))
        );
        assert_eq!(
            parse_input("/upload a.pdf b.pdf").unwrap(),
            Input::Command(Command::Upload(vec!["a.pdf".into(), "b.pdf".into()]))
        );
        assert_eq!(
            parse_input("/modify https://github.com/o/r").unwrap(),
            Input::Command(Command::Modify("https://github.com/o/r".into()))
        );
        assert_eq!(
            parse_input("/validate").unwrap(),
            Input::Command(Command::Validate(None))
        );
        assert_eq!(
            parse_input("/voice OFF").unwrap(),
            Input::Command(Command::Voice(false))
        );
    }

    #[test]
    fn malformed_commands_report_usage() {
        assert!(parse_input("/agent").unwrap_err().starts_with("Usage"));
        assert!(parse_input("/agent wizard").unwrap_err().contains("Unknown agent"));
        assert!(parse_input("/repo").unwrap_err().starts_with("Usage"));
        assert!(parse_input("/voice maybe").is_err());
        assert!(parse_input("/frobnicate").unwrap_err().contains("/help"));
    }
}
