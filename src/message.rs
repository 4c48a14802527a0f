//! Text protocol definitions
//!
//! Newline-terminated, space-delimited commands from clients and the
//! responses streamed back to them.

use std::fmt;

use crate::error::{AppError, CommandError};

const JOIN_SERVER_USAGE: &str = "JOINSERVER {name}";
const JOIN_GAME_USAGE: &str = "JOINGAME {name}";
const SHOOT_USAGE: &str = "SHOOT {x} {y}";

/// Kind of a client command, taken from the first word of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    /// Join the lobby under a unique name
    JoinServer,
    /// Join (or create) a named game
    JoinGame,
    /// Shoot at a position in the current game
    Shoot,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::JoinServer => "JOINSERVER",
            CommandType::JoinGame => "JOINGAME",
            CommandType::Shoot => "SHOOT",
        }
    }

    /// Parse only the command type of a line
    ///
    /// A line with no arguments is rejected before the type is looked at.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let parts: Vec<&str> = line.split(' ').collect();
        if parts.len() <= 1 {
            return Err(CommandError::MissingArguments);
        }

        match parts[0] {
            "JOINSERVER" => Ok(CommandType::JoinServer),
            "JOINGAME" => Ok(CommandType::JoinGame),
            "SHOOT" => Ok(CommandType::Shoot),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// `JOINSERVER {name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinServer {
    pub name: String,
}

/// `JOINGAME {name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGame {
    pub game: String,
}

/// `SHOOT {x} {y}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shoot {
    pub x: i32,
    pub y: i32,
}

/// Parse `JOINSERVER {name}`
pub fn parse_join_server(line: &str) -> Result<JoinServer, CommandError> {
    let name = single_argument(line, CommandType::JoinServer, JOIN_SERVER_USAGE)?;
    Ok(JoinServer { name })
}

/// Parse `JOINGAME {name}`
pub fn parse_join_game(line: &str) -> Result<JoinGame, CommandError> {
    let game = single_argument(line, CommandType::JoinGame, JOIN_GAME_USAGE)?;
    Ok(JoinGame { game })
}

/// Parse `SHOOT {x} {y}`
pub fn parse_shoot(line: &str) -> Result<Shoot, CommandError> {
    let invalid = CommandError::InvalidFormat {
        command: "shoot",
        usage: SHOOT_USAGE,
    };

    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 3 || parts[0] != CommandType::Shoot.as_str() {
        return Err(invalid);
    }

    let x = parts[1]
        .parse()
        .map_err(|_| CommandError::InvalidCoordinate('x'))?;
    let y = parts[2]
        .parse()
        .map_err(|_| CommandError::InvalidCoordinate('y'))?;

    Ok(Shoot { x, y })
}

fn single_argument(
    line: &str,
    kind: CommandType,
    usage: &'static str,
) -> Result<String, CommandError> {
    let invalid = CommandError::InvalidFormat {
        command: match kind {
            CommandType::JoinServer => "join",
            CommandType::JoinGame => "join game",
            CommandType::Shoot => "shoot",
        },
        usage,
    };

    match line.split(' ').collect::<Vec<_>>().as_slice() {
        [head, arg] if *head == kind.as_str() && !arg.is_empty() => Ok(arg.to_string()),
        _ => Err(invalid),
    }
}

/// Server → Client response
///
/// `Display` produces the wire line without the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Monster moved
    Walk { monster: String, x: i32, y: i32 },
    /// Monster was hit
    Boom {
        player: String,
        hits: u32,
        monster: String,
    },
    /// Game ended
    Finish { won: bool },
    /// Request failed
    Error { message: String },
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Walk { monster, x, y } => write!(f, "WALK {} {} {}", monster, x, y),
            Response::Boom {
                player,
                hits,
                monster,
            } => write!(f, "BOOM {} {} {}", player, hits, monster),
            Response::Finish { won: true } => write!(f, "FINISH WON"),
            Response::Finish { won: false } => write!(f, "FINISH LOST"),
            Response::Error { message } => write!(f, "ERROR {}", message),
        }
    }
}

/// Convert AppError to Response for client notification
impl From<AppError> for Response {
    fn from(err: AppError) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }
}

impl From<CommandError> for Response {
    fn from(err: CommandError) -> Self {
        AppError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_type_parse() {
        assert_eq!(CommandType::parse("SHOOT 1 1"), Ok(CommandType::Shoot));
        assert_eq!(CommandType::parse("JOINSERVER x"), Ok(CommandType::JoinServer));
        assert_eq!(CommandType::parse("JOINGAME x"), Ok(CommandType::JoinGame));
    }

    #[test]
    fn test_command_type_rejects_bare_words() {
        assert_eq!(CommandType::parse(""), Err(CommandError::MissingArguments));
        assert_eq!(CommandType::parse("SHOOT"), Err(CommandError::MissingArguments));
        assert_eq!(
            CommandType::parse("random text"),
            Err(CommandError::Unknown("random".to_string()))
        );
    }

    #[test]
    fn test_command_type_is_case_sensitive() {
        assert!(matches!(
            CommandType::parse("shoot 1 1"),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn test_parse_join_server() {
        assert_eq!(
            parse_join_server("JOINSERVER mock"),
            Ok(JoinServer {
                name: "mock".to_string()
            })
        );
        assert!(parse_join_server("JOINSERVER ").is_err());
        assert!(parse_join_server("JOINSERVER a b").is_err());
        assert!(parse_join_server("random text").is_err());
    }

    #[test]
    fn test_parse_join_game() {
        assert_eq!(
            parse_join_game("JOINGAME mock"),
            Ok(JoinGame {
                game: "mock".to_string()
            })
        );
        assert!(parse_join_game("JOINGAME ").is_err());
        assert!(parse_join_game("random text").is_err());
    }

    #[test]
    fn test_parse_shoot() {
        assert_eq!(parse_shoot("SHOOT 2 1"), Ok(Shoot { x: 2, y: 1 }));
        assert_eq!(
            parse_shoot("SHOOT 0 y"),
            Err(CommandError::InvalidCoordinate('y'))
        );
        assert_eq!(
            parse_shoot("SHOOT 1.5 2"),
            Err(CommandError::InvalidCoordinate('x'))
        );
        assert!(matches!(
            parse_shoot("SHOOT "),
            Err(CommandError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_response_format() {
        let walk = Response::Walk {
            monster: "night-king".to_string(),
            x: 1,
            y: 2,
        };
        assert_eq!(walk.to_string(), "WALK night-king 1 2");

        let boom = Response::Boom {
            player: "alice".to_string(),
            hits: 1,
            monster: "ice-face".to_string(),
        };
        assert_eq!(boom.to_string(), "BOOM alice 1 ice-face");

        assert_eq!(Response::Finish { won: true }.to_string(), "FINISH WON");
        assert_eq!(Response::Finish { won: false }.to_string(), "FINISH LOST");
    }

    #[test]
    fn test_error_response_from_app_error() {
        let resp: Response = AppError::NameTaken.into();
        assert_eq!(resp.to_string(), "ERROR name taken");

        let resp: Response = CommandError::Unknown("DANCE".to_string()).into();
        assert_eq!(
            resp.to_string(),
            "ERROR DANCE is not a command server understands"
        );
    }
}
