//! Line grammar for the planet chat protocol.
//!
//! Lines are CRLF separated. A line is split on whitespace into a command
//! and positional arguments; an optional free-text payload follows the first
//! `:` on the line.
//!
//! # Example Session
//!
//! ```text
//! -> :ru IDENT 352 -2 4030 1 2 :GALA
//! <- HAAAPSI 5f2a9c
//! -> RECOVER 123456
//! <- REGISTER 101 guest x
//! -> USER 101 guest x 17862
//! <- 999
//! -> JOIN mars
//! <- 900
//! <- 353 mars :Alice 101 Bob 102
//! <- JOIN - Carol 103 lvl [Pirates]
//! -> ACTION 3 102
//! ```
//!
//! Anything that does not fit the grammar is dropped by [`Inbound::parse`].

use serde::{Deserialize, Serialize};

/// Line terminator for outbound lines.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Identification line sent once the transport opens.
pub const IDENT_LINE: &str = ":ru IDENT 352 -2 4030 1 2 :GALA";

/// `ACTION` type code of the offensive action.
pub const OFFENSIVE_ACTION: &str = "3";

// ============================================================================
// Inbound (server -> client)
// ============================================================================

/// A `nick id` pair from a roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display nick.
    pub nick: String,
    /// Participant id.
    pub id: String,
}

/// A participant announced by a `JOIN` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEntry {
    /// Display nick.
    pub nick: String,
    /// Participant id.
    pub id: String,
    /// Clan tag without brackets, empty when absent.
    pub clan: String,
}

/// A recognised inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `PING` keepalive probe.
    Ping,
    /// `HAAAPSI <seed>` handshake challenge.
    Challenge {
        /// Seed for the token derivation.
        seed: String,
    },
    /// `REGISTER <id> <a> <b>` registration prompt.
    Register {
        /// Our participant id.
        id: String,
        /// First passthrough field.
        a: String,
        /// Second passthrough field.
        b: String,
    },
    /// `999` authentication accepted.
    AuthOk,
    /// `900` planet join confirmed.
    PlanetJoined,
    /// `JOIN` participant announcement.
    Join(JoinEntry),
    /// `353` roster snapshot.
    Roster(Vec<RosterEntry>),
    /// `PART <id>` or `SLEEP <id>`.
    Part {
        /// Departing participant.
        id: String,
    },
    /// `PRISONED <id>`.
    Prisoned {
        /// Participant the server reported.
        id: String,
    },
    /// `ACTION <type> <target>`.
    Action {
        /// Action type code.
        kind: String,
        /// Target participant.
        target: String,
    },
    /// `451` / `452` fatal server error.
    Fatal {
        /// Numeric code.
        code: u16,
    },
}

impl Inbound {
    /// Parse one line. Returns `None` for blank, unknown or malformed lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (&command, args) = parts.split_first()?;
        let arg = |i: usize| args.get(i).map(|s| (*s).to_string());

        match command {
            "PING" => Some(Self::Ping),
            "HAAAPSI" => Some(Self::Challenge { seed: arg(0)? }),
            "REGISTER" => Some(Self::Register {
                id: arg(0)?,
                a: arg(1)?,
                b: arg(2)?,
            }),
            "999" => Some(Self::AuthOk),
            "900" => Some(Self::PlanetJoined),
            "JOIN" => parse_join(args).map(Self::Join),
            "353" => Some(Self::Roster(parse_roster(payload(line)))),
            "PART" | "SLEEP" => Some(Self::Part { id: arg(0)? }),
            "PRISONED" => Some(Self::Prisoned { id: arg(0)? }),
            "ACTION" => Some(Self::Action {
                kind: arg(0)?,
                target: arg(1)?,
            }),
            "451" => Some(Self::Fatal { code: 451 }),
            "452" => Some(Self::Fatal { code: 452 }),
            _ => None,
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Challenge { .. } => "challenge",
            Self::Register { .. } => "register",
            Self::AuthOk => "auth_ok",
            Self::PlanetJoined => "planet_joined",
            Self::Join(_) => "join",
            Self::Roster(_) => "roster",
            Self::Part { .. } => "part",
            Self::Prisoned { .. } => "prisoned",
            Self::Action { .. } => "action",
            Self::Fatal { .. } => "fatal",
        }
    }
}

/// Free-text payload: everything after the first `:`, trimmed.
#[must_use]
pub fn payload(line: &str) -> &str {
    line.split_once(':').map_or("", |(_, rest)| rest.trim())
}

/// Split a received chunk into non-blank lines.
pub fn split_lines(data: &str) -> impl Iterator<Item = &str> {
    data.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
}

// Short form `nick id`, long form `- nick id ... [clan] ...`.
fn parse_join(args: &[&str]) -> Option<JoinEntry> {
    let (nick, id, clan) = if args.first() == Some(&"-") {
        let clan = args
            .iter()
            .skip(3)
            .find(|token| token.len() >= 2 && token.starts_with('[') && token.ends_with(']'))
            .map_or("", |token| &token[1..token.len() - 1]);
        (*args.get(1)?, *args.get(2)?, clan)
    } else {
        (*args.first()?, *args.get(1)?, "")
    };

    Some(JoinEntry {
        nick: nick.to_string(),
        id: id.to_string(),
        clan: clan.to_string(),
    })
}

// A token followed by an all-digit token is a `nick id` pair; anything else
// is skipped one token at a time.
fn parse_roster(payload: &str) -> Vec<RosterEntry> {
    let tokens: Vec<&str> = payload.split_whitespace().collect();
    let mut entries = Vec::new();
    let mut i = 0;
    while i + 1 < tokens.len() {
        let id = tokens[i + 1];
        if is_numeric_id(id) {
            entries.push(RosterEntry {
                nick: tokens[i].to_string(),
                id: id.to_string(),
            });
            i += 2;
        } else {
            i += 1;
        }
    }
    entries
}

fn is_numeric_id(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Outbound (client -> server)
// ============================================================================

/// A line the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Identification line.
    Ident,
    /// Keepalive response.
    Pong,
    /// `RECOVER <code>`.
    Recover {
        /// Recovery code supplied by the collaborator.
        code: String,
    },
    /// `USER <id> <a> <b> <token>`.
    User {
        /// Our participant id.
        id: String,
        /// First passthrough field.
        a: String,
        /// Second passthrough field.
        b: String,
        /// Challenge token.
        token: String,
    },
    /// `JOIN <planet>`.
    Join {
        /// Planet name.
        planet: String,
    },
    /// `ACTION 3 <target>`.
    Prison {
        /// Target participant.
        target: String,
    },
    /// `QUIT :disconnect`.
    Quit,
}

impl Outbound {
    /// Line text without terminator.
    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::Ident => IDENT_LINE.to_string(),
            Self::Pong => "PONG".to_string(),
            Self::Recover { code } => format!("RECOVER {code}"),
            Self::User { id, a, b, token } => format!("USER {id} {a} {b} {token}"),
            Self::Join { planet } => format!("JOIN {planet}"),
            Self::Prison { target } => format!("ACTION {OFFENSIVE_ACTION} {target}"),
            Self::Quit => "QUIT :disconnect".to_string(),
        }
    }

    /// Line text with the CRLF terminator.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut line = self.to_line();
        line.push_str(LINE_TERMINATOR);
        line
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ident => "ident",
            Self::Pong => "pong",
            Self::Recover { .. } => "recover",
            Self::User { .. } => "user",
            Self::Join { .. } => "join",
            Self::Prison { .. } => "prison",
            Self::Quit => "quit",
        }
    }
}
