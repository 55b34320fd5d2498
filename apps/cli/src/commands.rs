//! Operator command parsing.

use std::path::PathBuf;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect { uri: String },
    Send { id: u64, path: PathBuf },
    Close { id: u64, code: Option<u16>, reason: String },
    Show { id: u64 },
    List,
    Help,
    Quit,
}

/// Parses one input line. Empty lines yield `None`; unrecognized input
/// yields an error message for the operator.
pub fn parse(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    let parsed = match verb {
        "connect" => {
            if rest.is_empty() {
                Err("usage: connect <uri>".into())
            } else {
                Ok(Command::Connect { uri: rest.into() })
            }
        }
        "send" => parse_send(rest),
        "close" => parse_close(rest),
        "show" => match rest.parse::<u64>() {
            Ok(id) => Ok(Command::Show { id }),
            Err(_) => Err("usage: show <connection id>".into()),
        },
        "list" => Ok(Command::List),
        "help" => Ok(Command::Help),
        "quit" => Ok(Command::Quit),
        other => Err(format!("unrecognized command {other:?}, try \"help\"")),
    };
    Some(parsed)
}

fn parse_send(rest: &str) -> Result<Command, String> {
    let usage = || "usage: send <connection id> <file path>".to_string();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let id = parts
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(usage)?;
    let path = parts.next().map(str::trim).filter(|p| !p.is_empty()).ok_or_else(usage)?;
    Ok(Command::Send {
        id,
        path: PathBuf::from(path),
    })
}

fn parse_close(rest: &str) -> Result<Command, String> {
    let usage = || "usage: close <connection id> [<close code>] [<reason>]".to_string();
    let mut parts = rest.splitn(3, char::is_whitespace);
    let id = parts
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(usage)?;

    let code = match parts.next() {
        None | Some("") => None,
        Some(token) => Some(token.parse::<u16>().map_err(|_| usage())?),
    };
    let reason = parts.next().unwrap_or_default().trim().to_owned();

    Ok(Command::Close { id, code, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn empty_line_is_none() {
        assert!(parse("").is_none());
        assert!(parse("   ").is_none());
    }

    #[test]
    fn connect_takes_the_rest_of_the_line() {
        assert_eq!(
            parse_ok("connect wss://host.example:9002/upload"),
            Command::Connect {
                uri: "wss://host.example:9002/upload".into()
            }
        );
    }

    #[test]
    fn connect_without_uri_is_an_error() {
        assert!(parse("connect").unwrap().is_err());
    }

    #[test]
    fn send_with_id_and_path() {
        assert_eq!(
            parse_ok("send 3 /data/build output.tar"),
            Command::Send {
                id: 3,
                path: PathBuf::from("/data/build output.tar"),
            }
        );
    }

    #[test]
    fn send_rejects_missing_pieces() {
        assert!(parse("send").unwrap().is_err());
        assert!(parse("send 3").unwrap().is_err());
        assert!(parse("send x file").unwrap().is_err());
    }

    #[test]
    fn close_with_defaults() {
        assert_eq!(
            parse_ok("close 1"),
            Command::Close {
                id: 1,
                code: None,
                reason: String::new()
            }
        );
    }

    #[test]
    fn close_with_code_and_reason() {
        assert_eq!(
            parse_ok("close 1 4000 operator requested"),
            Command::Close {
                id: 1,
                code: Some(4000),
                reason: "operator requested".into()
            }
        );
    }

    #[test]
    fn close_with_bad_code_is_an_error() {
        assert!(parse("close 1 soon").unwrap().is_err());
    }

    #[test]
    fn show_list_help_quit() {
        assert_eq!(parse_ok("show 2"), Command::Show { id: 2 });
        assert_eq!(parse_ok("list"), Command::List);
        assert_eq!(parse_ok("help"), Command::Help);
        assert_eq!(parse_ok("quit"), Command::Quit);
    }

    #[test]
    fn unknown_verb_is_an_error() {
        assert!(parse("fly me to the moon").unwrap().is_err());
    }
}
