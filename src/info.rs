use std::fmt;

use log::{debug, warn};

use crate::parse::{key_values, latin1};

/// Server settings as returned by `getinfo`, or the settings line of
/// `getstatus`.
///
/// Keeps keys in the order they first appeared. A repeated key overwrites
/// the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoRecord {
    entries: Vec<(String, Option<String>)>,
}

impl InfoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: Option<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value for `key`. `None` both when the key is absent and when the
    /// server sent the key with no value; use [InfoRecord::contains_key]
    /// to tell those apart.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decoded `gametype` setting.
    pub fn game_type(&self) -> GameType {
        self.get("gametype").map(GameType::from_code).unwrap_or(GameType::Unknown)
    }

    /// Build a record from a backslash-delimited payload.
    pub fn parse(data: &str) -> Self {
        let mut record = InfoRecord::new();
        for (key, value) in key_values(data) {
            record.insert(key, value);
        }
        record
    }
}

impl FromIterator<(String, Option<String>)> for InfoRecord {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        let mut record = InfoRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// One connected player, from a `getstatus` reply.
///
/// Score and ping are kept exactly as the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    pub score: String,
    pub ping: String,
    pub name: String,
}

impl Player {
    pub fn score(&self) -> Option<i32> {
        self.score.parse().ok()
    }

    pub fn ping(&self) -> Option<u32> {
        self.ping.parse().ok()
    }
}

/// Server settings as obtained by `getstatus`, with the connected players
/// kept apart from the settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    pub settings: InfoRecord,
    pub players: Vec<Player>,
}

impl StatusRecord {
    /// Parse a status payload: one settings line, then one line per player.
    pub fn parse(data: &str) -> Self {
        let mut lines = data.split('\n');
        let settings = InfoRecord::parse(lines.next().unwrap_or_default());
        let players = parse_players(lines.filter(|line| !line.is_empty()));

        StatusRecord { settings, players }
    }
}

/// Game types of the Jedi Academy `gametype` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    FreeForAll,
    Duel,
    PowerDuel,
    TeamDeathmatch,
    Siege,
    CaptureTheFlag,
    Unknown,
}

impl GameType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => GameType::FreeForAll,
            "3" => GameType::Duel,
            "4" => GameType::PowerDuel,
            "6" => GameType::TeamDeathmatch,
            "7" => GameType::Siege,
            "8" => GameType::CaptureTheFlag,
            _ => GameType::Unknown,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameType::FreeForAll => "FFA",
            GameType::Duel => "DUEL",
            GameType::PowerDuel => "power duel",
            GameType::TeamDeathmatch => "TDM",
            GameType::Siege => "SIEDGE",
            GameType::CaptureTheFlag => "CTF",
            GameType::Unknown => "N/A",
        };
        f.write_str(name)
    }
}

/// Parse player lines shaped `<score> <ping> "<name>"`.
///
/// A name with spaces in it comes back with the spaces removed
/// (`"Player Two"` becomes `PlayerTwo`); existing consumers match on that
/// form. A line with fewer than three fields gives an empty name.
pub fn parse_players<'a, I>(lines: I) -> Vec<Player>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut players = Vec::new();
    for line in lines {
        let tokens: Vec<&str> = line.split(' ').collect();

        let name = if tokens.len() > 3 {
            strip_quotes(&tokens[2..].concat())
        } else if let Some(quoted) = tokens.get(2) {
            strip_quotes(quoted)
        } else {
            warn!("short player line {:?}", line);
            String::new()
        };

        players.push(Player {
            score: tokens[0].to_owned(),
            ping: tokens.get(1).copied().unwrap_or_default().to_owned(),
            name,
        });
    }
    players
}

/// Drop the first and last character, whatever they are.
fn strip_quotes(quoted: &str) -> String {
    let mut chars = quoted.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_owned()
}

pub(crate) fn decode_info(body: &[u8]) -> InfoRecord {
    let record = InfoRecord::parse(&latin1(body));
    debug!("decoded info with {} keys", record.len());
    record
}

pub(crate) fn decode_status(body: &[u8]) -> StatusRecord {
    let record = StatusRecord::parse(&latin1(body));
    debug!(
        "decoded status with {} settings and {} players",
        record.settings.len(),
        record.players.len()
    );
    record
}
