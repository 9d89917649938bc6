use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::QueryError;

/// A query target: host address and UDP port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub address: String,
    pub port: u16,
}

impl Destination {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Destination {
            address: address.into(),
            port,
        }
    }

    /// Check that this destination can actually be sent to.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.address.trim().is_empty() {
            return Err(QueryError::InvalidArgument(
                "destination address must not be empty".to_owned(),
            ));
        }
        if self.port == 0 {
            return Err(QueryError::InvalidArgument(format!(
                "destination {} has no port",
                self.address
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl From<SocketAddr> for Destination {
    fn from(addr: SocketAddr) -> Self {
        Destination {
            address: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

/// The `[address, port]` pair shape.
impl<S: Into<String>> From<(S, u16)> for Destination {
    fn from((address, port): (S, u16)) -> Self {
        Destination::new(address, port)
    }
}

/// Parse `address:port`. A bare address with no port is rejected.
impl FromStr for Destination {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, port) = s.rsplit_once(':').ok_or_else(|| {
            QueryError::InvalidArgument(format!("`{s}` is not an address:port pair"))
        })?;
        let port: u16 = port
            .parse()
            .map_err(|_| QueryError::InvalidArgument(format!("`{port}` is not a valid port")))?;

        let dest = Destination::new(address, port);
        dest.validate()?;
        Ok(dest)
    }
}

/// Everything a `send_*` operation accepts.
///
/// Labels of [Targets::Labelled] are only for the caller's bookkeeping;
/// they are never sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    Single(Destination),
    List(Vec<Destination>),
    Labelled(BTreeMap<String, Destination>),
}

impl Targets {
    /// Validate every destination up front, so that a bad entry means
    /// nothing at all gets sent.
    pub fn into_destinations(self) -> Result<Vec<Destination>, QueryError> {
        let dests: Vec<Destination> = match self {
            Targets::Single(d) => vec![d],
            Targets::List(list) => list,
            Targets::Labelled(map) => map.into_values().collect(),
        };
        for d in &dests {
            d.validate()?;
        }
        Ok(dests)
    }
}

impl From<Destination> for Targets {
    fn from(d: Destination) -> Self {
        Targets::Single(d)
    }
}

impl From<&Destination> for Targets {
    fn from(d: &Destination) -> Self {
        Targets::Single(d.clone())
    }
}

impl From<Vec<Destination>> for Targets {
    fn from(list: Vec<Destination>) -> Self {
        Targets::List(list)
    }
}

impl From<&[Destination]> for Targets {
    fn from(list: &[Destination]) -> Self {
        Targets::List(list.to_vec())
    }
}

impl From<BTreeMap<String, Destination>> for Targets {
    fn from(map: BTreeMap<String, Destination>) -> Self {
        Targets::Labelled(map)
    }
}

impl<S: Into<String>> From<(S, u16)> for Targets {
    fn from(pair: (S, u16)) -> Self {
        Targets::Single(pair.into())
    }
}

/// A string target has to parse as `address:port`.
impl TryFrom<&str> for Targets {
    type Error = QueryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Ok(Targets::Single(s.parse()?))
    }
}
