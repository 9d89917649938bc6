/// Out-of-band marker every connectionless packet starts with.
pub const OOB_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Separator between fields, and between server list tuples.
pub const BACKSLASH: u8 = 0x5C;

pub const GETINFO: &[u8] = b"\xFF\xFF\xFF\xFFgetinfo\0";
pub const GETSTATUS: &[u8] = b"\xFF\xFF\xFF\xFFgetstatus\0";
pub const GETSERVERS: &[u8] = b"\xFF\xFF\xFF\xFFgetservers 26\0";

pub const INFO_RESPONSE: &[u8] = b"\xFF\xFF\xFF\xFFinfoResponse\n";
pub const STATUS_RESPONSE: &[u8] = b"\xFF\xFF\xFF\xFFstatusResponse\n";
/// Only ever compared as a 22 byte prefix of the whole datagram.
pub const SERVERS_RESPONSE: &[u8; 22] = b"\xFF\xFF\xFF\xFFgetserversResponse";

/// Protocol tag sent with `getservers` by default.
pub const DEFAULT_SERVERS_PROTOCOL: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// `getinfo` -- short key/value summary of a game server.
    Info,
    /// `getstatus` -- full server settings plus the player list.
    Status,
    /// `getservers` -- ask a master directory for its server list.
    ServersRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Info,
    Status,
    Servers,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPacket {
    kind: QueryKind,
    servers_protocol: u32,
}

impl RequestPacket {
    pub fn new(kind: QueryKind) -> Self {
        RequestPacket {
            kind,
            servers_protocol: DEFAULT_SERVERS_PROTOCOL,
        }
    }

    /// Override the protocol tag of a `getservers` request.
    /// Has no effect on the other kinds.
    pub fn with_servers_protocol(mut self, protocol: u32) -> Self {
        self.servers_protocol = protocol;
        self
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        match self.kind {
            QueryKind::Info => GETINFO.to_vec(),
            QueryKind::Status => GETSTATUS.to_vec(),
            QueryKind::ServersRequest if self.servers_protocol == DEFAULT_SERVERS_PROTOCOL => {
                GETSERVERS.to_vec()
            }
            QueryKind::ServersRequest => {
                // marker, command, terminator
                let mut payload: Vec<u8> = Vec::with_capacity(24);
                payload.extend_from_slice(&OOB_MARKER);
                payload.extend_from_slice(format!("getservers {}", self.servers_protocol).as_bytes());
                payload.push(0);
                payload
            }
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }
}

/// An inbound datagram split into its kind and the payload that follows
/// the first backslash.
#[derive(Debug, PartialEq, Eq)]
pub struct ResponsePacket<'a> {
    kind: ResponseKind,
    body: &'a [u8],
}

impl<'a> ResponsePacket<'a> {
    /// Classify a datagram. Info and Status need an exact match of
    /// everything before the first backslash; the server list is matched on
    /// the first 22 bytes of the datagram and so is tried last.
    pub fn unpack(incoming: &'a [u8]) -> Self {
        let (type_segment, body) = match incoming.iter().position(|&b| b == BACKSLASH) {
            Some(index) => (&incoming[..index], &incoming[index + 1..]),
            None => (incoming, &incoming[incoming.len()..]),
        };

        let kind = if type_segment == INFO_RESPONSE {
            ResponseKind::Info
        } else if type_segment == STATUS_RESPONSE {
            ResponseKind::Status
        } else if incoming.len() >= SERVERS_RESPONSE.len()
            && &incoming[..SERVERS_RESPONSE.len()] == SERVERS_RESPONSE
        {
            ResponseKind::Servers
        } else {
            ResponseKind::Unknown
        };

        let body = if kind == ResponseKind::Servers {
            // drop whatever trails the final tuple separator
            match body.iter().rposition(|&b| b == BACKSLASH) {
                Some(last) => &body[..last],
                None => &body[..0],
            }
        } else {
            body
        };

        ResponsePacket { kind, body }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}
