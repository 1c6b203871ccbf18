//! Parses a commit-kind object's payload into a structured record.

use std::fmt;

use crate::error::Error;
use crate::object::{header_of, Kind, Object};
use crate::oid::ObjectId;

/// A fixed-offset instant: seconds since the epoch plus the signed
/// `±HHMM` zone offset under which those seconds were recorded.
///
/// Deliberately not a full calendar type — nothing downstream needs
/// calendar arithmetic, only the raw fields needed to re-render the
/// signature line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: i64,
    pub offset_minutes: i32,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.unsigned_abs();
        write!(f, "{} {}{:02}{:02}", self.seconds, sign, abs / 60, abs % 60)
    }
}

/// The `name <email> unix_seconds ±HHMM` record attached to author/committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub timestamp: Timestamp,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.timestamp)
    }
}

/// A parsed commit-kind object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: ObjectId,
    pub size: usize,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tree {}", self.tree)?;
        for parent in &self.parents {
            writeln!(f, "parent {parent}")?;
        }
        writeln!(f, "author {}", self.author)?;
        writeln!(f, "committer {}", self.committer)?;
        writeln!(f)?;
        write!(f, "{}", self.message)
    }
}

/// Parses a validated commit object into a [`Commit`] record.
///
/// Multi-line header continuations (lines beginning with a space,
/// attached to tags like `gpgsig` or `encoding`) are tolerated and
/// discarded, as are any header tags other than `tree`/`parent`/
/// `author`/`committer`.
pub fn parse(object: &Object) -> Result<Commit, Error> {
    if object.kind != Kind::Commit {
        return Err(Error::NotACommit(object.id));
    }

    let invalid = |reason: &str| Error::InvalidCommit {
        id: object.id,
        reason: reason.to_string(),
    };

    let text = &object.payload;
    let header_end = find_blank_line(text).ok_or_else(|| invalid("missing header/message separator"))?;
    let header = &text[..header_end];
    let message_start = header_end + 2;
    let message_bytes = if message_start <= text.len() {
        &text[message_start..]
    } else {
        &[][..]
    };

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;

    let mut lines = header.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(b" ") {
            // a stray continuation line with no owning tag; discard.
            continue;
        }

        let (tag, rest) = split_once(line, b' ').ok_or_else(|| invalid("header line missing a tag"))?;

        // Fold any following continuation lines into (and then discard) this
        // header's value, per the tolerant-discard decision for continuations.
        while let Some(next) = lines.peek() {
            if next.starts_with(b" ") {
                lines.next();
            } else {
                break;
            }
        }

        match tag {
            b"tree" => {
                if rest.len() != 40 {
                    return Err(invalid("tree identifier must be 40 hex characters"));
                }
                tree = Some(parse_hex_id(rest).map_err(|_| invalid("malformed tree identifier"))?);
            }
            b"parent" => {
                if rest.len() != 40 {
                    return Err(invalid("parent identifier must be 40 hex characters"));
                }
                parents.push(parse_hex_id(rest).map_err(|_| invalid("malformed parent identifier"))?);
            }
            b"author" => {
                author = Some(parse_signature(rest).map_err(|_| invalid("malformed author signature"))?);
            }
            b"committer" => {
                committer =
                    Some(parse_signature(rest).map_err(|_| invalid("malformed committer signature"))?);
            }
            _ => {}
        }
    }

    let tree = tree.ok_or_else(|| invalid("missing tree header"))?;
    let author = author.ok_or_else(|| invalid("missing author header"))?;
    let committer = committer.ok_or_else(|| invalid("missing committer header"))?;

    let mut message_bytes = message_bytes;
    if message_bytes.last() == Some(&b'\n') {
        message_bytes = &message_bytes[..message_bytes.len() - 1];
    }
    let message = String::from_utf8(message_bytes.to_vec())
        .map_err(|_| invalid("message is not valid UTF-8"))?;

    let header_bytes = header_of(Kind::Commit, object.payload.len());
    let recomputed = {
        use sha1::{Digest, Sha1};
        let mut hasher = Sha1::new();
        hasher.update(&header_bytes);
        hasher.update(&object.payload);
        ObjectId::try_from(hasher.finalize().as_slice())?
    };
    if recomputed != object.id {
        return Err(invalid("identifier does not match header and payload"));
    }

    Ok(Commit {
        id: object.id,
        size: object.size,
        tree,
        parents,
        author,
        committer,
        message,
    })
}

fn find_blank_line(text: &[u8]) -> Option<usize> {
    text.windows(2).position(|w| w == b"\n\n")
}

fn split_once(line: &[u8], sep: u8) -> Option<(&[u8], &[u8])> {
    let idx = line.iter().position(|&b| b == sep)?;
    Some((&line[..idx], &line[idx + 1..]))
}

fn parse_hex_id(hex_bytes: &[u8]) -> Result<ObjectId, Error> {
    let s = std::str::from_utf8(hex_bytes).map_err(|_| Error::invalid_object("non-UTF-8 hex identifier"))?;
    s.parse()
}

/// Parses `NAME ' <' EMAIL '> ' UNIX_SECONDS ' ' ±HHMM`.
fn parse_signature(rest: &[u8]) -> Result<Signature, Error> {
    let open = rest
        .iter()
        .position(|&b| b == b'<')
        .ok_or_else(|| Error::invalid_object("signature missing '<'"))?;
    let close = rest
        .iter()
        .position(|&b| b == b'>')
        .ok_or_else(|| Error::invalid_object("signature missing '>'"))?;
    if close < open {
        return Err(Error::invalid_object("signature '>' precedes '<'"));
    }

    // NAME is everything before " <", trimming the separating space.
    let name_end = if open > 0 && rest[open - 1] == b' ' {
        open - 1
    } else {
        open
    };
    let name = String::from_utf8(rest[..name_end].to_vec())
        .map_err(|_| Error::invalid_object("signature name is not valid UTF-8"))?;
    let email = String::from_utf8(rest[open + 1..close].to_vec())
        .map_err(|_| Error::invalid_object("signature email is not valid UTF-8"))?;

    // after '> ' comes "<seconds> <offset>"
    let tail = &rest[close + 1..];
    let tail = tail.strip_prefix(b" ").unwrap_or(tail);
    let tail_str =
        std::str::from_utf8(tail).map_err(|_| Error::invalid_object("signature timestamp is not valid UTF-8"))?;
    let mut fields = tail_str.split_whitespace();
    let seconds: i64 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::invalid_object("signature missing unix seconds"))?;
    let offset_str = fields
        .next()
        .ok_or_else(|| Error::invalid_object("signature missing zone offset"))?;
    let offset_minutes = parse_zone_offset(offset_str)?;

    Ok(Signature {
        name,
        email,
        timestamp: Timestamp {
            seconds,
            offset_minutes,
        },
    })
}

fn parse_zone_offset(s: &str) -> Result<i32, Error> {
    if s.len() != 5 {
        return Err(Error::invalid_object(format!("malformed zone offset '{s}'")));
    }
    let sign = match &s[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(Error::invalid_object(format!("zone offset missing sign: '{s}'"))),
    };
    let hours: i32 = s[1..3]
        .parse()
        .map_err(|_| Error::invalid_object(format!("malformed zone offset '{s}'")))?;
    let minutes: i32 = s[3..5]
        .parse()
        .map_err(|_| Error::invalid_object(format!("malformed zone offset '{s}'")))?;
    Ok(sign * (hours * 60 + minutes))
}
