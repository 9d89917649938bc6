use log::{debug, warn};

use crate::destination::Destination;
use crate::parse::{get_ipv4, get_u16_be};

/// Official master directory.
pub const MASTER_OFFICIAL: (&str, u16) = ("104.40.23.123", 29060);
/// Community-run master directory.
pub const MASTER_JKHUB: (&str, u16) = ("217.182.53.251", 29060);

pub fn official() -> Destination {
    MASTER_OFFICIAL.into()
}

pub fn jkhub() -> Destination {
    MASTER_JKHUB.into()
}

/// One game server listed by a master directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerEntry {
    pub address: String,
    pub port: u16,
}

impl From<ServerEntry> for Destination {
    fn from(entry: ServerEntry) -> Self {
        Destination::new(entry.address, entry.port)
    }
}

impl ServerEntry {
    /// Stride of one tuple: address, port, separator.
    pub const TUPLE_LEN: usize = 7;
    /// Address and port alone; the separator after the last tuple is
    /// cut off before decoding.
    const MIN_TUPLE_LEN: usize = 6;

    /// Decode the `getserversResponse` tuples, in order.
    ///
    /// A trailing stride too short to hold an address and port is dropped.
    pub fn parse_list(data: &[u8]) -> Vec<ServerEntry> {
        let mut servers = Vec::with_capacity(data.len() / Self::TUPLE_LEN + 1);
        let mut offset: usize = 0;

        while data.len() - offset >= Self::MIN_TUPLE_LEN {
            let start = offset;
            let address = get_ipv4(data, &mut offset);
            let port = get_u16_be(data, &mut offset);
            servers.push(ServerEntry { address, port });
            offset = (start + Self::TUPLE_LEN).min(data.len());
        }

        if offset < data.len() {
            warn!("dropping {} trailing bytes of server list", data.len() - offset);
        }
        debug!("decoded {} servers", servers.len());
        servers
    }
}
