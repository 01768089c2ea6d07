//! Line commands typed on the interactive console.

use std::str::FromStr;

use thiserror::Error;

/// One console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `start`
    Start,
    /// `stop`
    Stop,
    /// `travel <planet>`
    Travel(String),
    /// `connect [code]`, reusing the last code when none is given.
    Connect(Option<String>),
    /// `disconnect`
    Disconnect,
    /// `targets`
    Targets,
    /// `quit`
    Quit,
}

/// A line that is not a console command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseConsoleError(String);

impl FromStr for ConsoleCommand {
    type Err = ParseConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(ParseConsoleError("empty command".to_string()));
        };
        let argument = words.next().map(str::to_string);

        match command.to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "travel" | "join" => argument
                .map(Self::Travel)
                .ok_or_else(|| ParseConsoleError("usage: travel <planet>".to_string())),
            "connect" => Ok(Self::Connect(argument)),
            "disconnect" => Ok(Self::Disconnect),
            "targets" => Ok(Self::Targets),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseConsoleError(format!("unknown command: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse(), Ok(ConsoleCommand::Start));
        assert_eq!("  STOP ".parse(), Ok(ConsoleCommand::Stop));
        assert_eq!(
            "travel mars".parse(),
            Ok(ConsoleCommand::Travel("mars".to_string()))
        );
        assert_eq!("connect".parse(), Ok(ConsoleCommand::Connect(None)));
        assert_eq!(
            "connect 123456".parse(),
            Ok(ConsoleCommand::Connect(Some("123456".to_string())))
        );
        assert_eq!("exit".parse(), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ConsoleCommand>().is_err());
        assert!("travel".parse::<ConsoleCommand>().is_err());
        let err = "dance".parse::<ConsoleCommand>().unwrap_err();
        assert_eq!(err.to_string(), "unknown command: dance");
    }
}
