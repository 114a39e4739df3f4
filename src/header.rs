//! Role/version handshake run by both ends before any frame flows.

use std::fmt;
use std::io::{Read, Write};

use crate::error::NegotiateError;
use crate::protocol::{HEADER_LEN, HEADER_TERM, MAGIC, ROLE_RECEIVER, ROLE_SENDER, VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub const fn as_byte(self) -> u8 {
        match self {
            Role::Sender => ROLE_SENDER,
            Role::Receiver => ROLE_RECEIVER,
        }
    }

    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            ROLE_SENDER => Some(Role::Sender),
            ROLE_RECEIVER => Some(Role::Receiver),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => f.write_str("sender"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}

/// Fixed 8-byte session header: `pft` | role | 3 decimal digits | `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header([u8; HEADER_LEN]);

pub const SENDER_HEADER: Header = Header::new(Role::Sender, VERSION);
pub const RECEIVER_HEADER: Header = Header::new(Role::Receiver, VERSION);

impl Header {
    /// # Panics
    ///
    /// If `version` does not fit in three decimal digits.
    pub const fn new(role: Role, version: u16) -> Self {
        assert!(version < 1000, "header version must fit in 3 digits");
        Header([
            MAGIC[0],
            MAGIC[1],
            MAGIC[2],
            role.as_byte(),
            b'0' + (version / 100) as u8,
            b'0' + (version / 10 % 10) as u8,
            b'0' + (version % 10) as u8,
            HEADER_TERM,
        ])
    }

    /// Validate raw bytes against the header template.
    pub fn parse(raw: [u8; HEADER_LEN]) -> Result<Self, NegotiateError> {
        let well_formed = raw[0..3] == MAGIC[..]
            && Role::from_byte(raw[3]).is_some()
            && raw[4..7].iter().all(u8::is_ascii_digit)
            && raw[7] == HEADER_TERM;
        if well_formed {
            Ok(Header(raw))
        } else {
            Err(NegotiateError::Malformed(raw))
        }
    }

    pub fn role(&self) -> Role {
        // parse/new guarantee a valid role byte
        Role::from_byte(self.0[3]).unwrap_or(Role::Sender)
    }

    pub fn version(&self) -> u16 {
        self.0[4..7]
            .iter()
            .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'))
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.0
    }
}

/// Exchange headers with the peer and check the pair is compatible.
///
/// Writes `local`, then reads exactly 8 bytes back. Succeeds only when the
/// remote header is well formed, carries the other role and the same
/// version. The stream is left open on failure.
pub fn negotiate<S>(local: &Header, stream: &mut S) -> Result<Header, NegotiateError>
where
    S: Read + Write + ?Sized,
{
    stream
        .write_all(local.as_bytes())
        .and_then(|_| stream.flush())
        .map_err(NegotiateError::Io)?;

    let mut raw = [0u8; HEADER_LEN];
    stream.read_exact(&mut raw).map_err(NegotiateError::Io)?;

    let remote = Header::parse(raw)?;
    if remote.role() == local.role() {
        return Err(NegotiateError::SameRole(remote.role()));
    }

    let (local_v, remote_v) = (local.version(), remote.version());
    if remote_v > local_v {
        return Err(NegotiateError::RemoteNewer {
            local: local_v,
            remote: remote_v,
        });
    }
    if remote_v < local_v {
        return Err(NegotiateError::RemoteOlder {
            local: local_v,
            remote: remote_v,
        });
    }

    Ok(remote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::pipe;
    use proptest::prelude::*;
    use std::thread;

    fn run_pair(a: Header, b: Header) -> (Result<Header, NegotiateError>, Result<Header, NegotiateError>) {
        let (mut left, mut right) = pipe();
        let peer = thread::spawn(move || negotiate(&b, &mut right));
        let mine = negotiate(&a, &mut left);
        (mine, peer.join().unwrap())
    }

    #[test]
    fn test_reference_headers() {
        assert_eq!(SENDER_HEADER.as_bytes(), b"pfts005\n");
        assert_eq!(RECEIVER_HEADER.as_bytes(), b"pftr005\n");
        assert_eq!(SENDER_HEADER.version(), 5);
        assert_eq!(RECEIVER_HEADER.role(), Role::Receiver);
    }

    #[test]
    fn test_parse_rejects_template_mismatch() {
        for raw in [
            *b"pfts05a\n",
            *b"pftx005\n",
            *b"xfts005\n",
            *b"pfts005\r",
            *b"PFTS005\n",
        ] {
            assert!(matches!(Header::parse(raw), Err(NegotiateError::Malformed(_))));
        }
        assert!(Header::parse(*b"pftr999\n").is_ok());
    }

    #[test]
    fn test_negotiate_success() {
        let (a, b) = run_pair(SENDER_HEADER, RECEIVER_HEADER);
        assert_eq!(a.unwrap(), RECEIVER_HEADER);
        assert_eq!(b.unwrap(), SENDER_HEADER);
    }

    #[test]
    fn test_negotiate_same_role() {
        let (a, b) = run_pair(RECEIVER_HEADER, RECEIVER_HEADER);
        assert!(matches!(a, Err(NegotiateError::SameRole(Role::Receiver))));
        assert!(matches!(b, Err(NegotiateError::SameRole(Role::Receiver))));
    }

    #[test]
    fn test_negotiate_malformed_remote() {
        let (mut left, mut right) = pipe();
        let peer = thread::spawn(move || {
            right.write_all(b"hello!!\n").unwrap();
            let mut buf = [0u8; 8];
            right.read_exact(&mut buf).unwrap();
        });
        let res = negotiate(&SENDER_HEADER, &mut left);
        assert!(matches!(res, Err(NegotiateError::Malformed(raw)) if &raw == b"hello!!\n"));
        peer.join().unwrap();
    }

    #[test]
    fn test_negotiate_peer_hangs_up() {
        let (mut left, right) = pipe();
        drop(right);
        let res = negotiate(&SENDER_HEADER, &mut left);
        assert!(matches!(res, Err(NegotiateError::Io(_))));
    }

    #[test]
    fn test_negotiate_short_reads_are_retried() {
        let (mut left, mut right) = pipe();
        let peer = thread::spawn(move || {
            for b in RECEIVER_HEADER.as_bytes() {
                right.write_all(&[*b]).unwrap();
            }
            let mut buf = [0u8; 8];
            right.read_exact(&mut buf).unwrap();
            buf
        });
        assert!(negotiate(&SENDER_HEADER, &mut left).is_ok());
        assert_eq!(&peer.join().unwrap(), SENDER_HEADER.as_bytes());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_negotiation_symmetry(va in 0u16..1000, vb in 0u16..1000, same_role in any::<bool>()) {
            let a = Header::new(Role::Sender, va);
            let b = Header::new(if same_role { Role::Sender } else { Role::Receiver }, vb);
            let (ra, rb) = run_pair(a, b);
            if same_role {
                prop_assert!(matches!(ra, Err(NegotiateError::SameRole(_))));
                prop_assert!(matches!(rb, Err(NegotiateError::SameRole(_))));
            } else if va == vb {
                prop_assert!(ra.is_ok() && rb.is_ok());
            } else if vb > va {
                prop_assert!(matches!(ra, Err(NegotiateError::RemoteNewer { .. })), "{:?}", ra);
                prop_assert!(matches!(rb, Err(NegotiateError::RemoteOlder { .. })), "{:?}", rb);
            } else {
                prop_assert!(matches!(ra, Err(NegotiateError::RemoteOlder { .. })), "{:?}", ra);
                prop_assert!(matches!(rb, Err(NegotiateError::RemoteNewer { .. })), "{:?}", rb);
            }
        }
    }
}
