//! Case-insensitive, ordered header collection.

use crate::http::error::ParseError;

const CRLF: &[u8] = b"\r\n";

/// Header fields in first-seen order, looked up without regard to case.
///
/// Names parsed off the wire are stored lowercase; names set by application
/// code keep the case they were given. A name appears at most once. A repeated name is merged into the existing
/// entry by [`Headers::insert_or_merge`], joining the values with a comma in
/// wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

/// Characters permitted in a header field name.
pub fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}

/// Whether `name` is a non-empty run of token characters.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_token_char)
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a header value, ignoring the case of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Adds a header, or appends `value` to the existing one as
    /// `existing,value` when the name is already present.
    pub fn insert_or_merge(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => {
                let existing = &mut self.entries[i].1;
                existing.push(',');
                existing.push_str(value);
            }
            None => self
                .entries
                .push((name.to_string(), value.to_string())),
        }
    }

    /// Adds a header, replacing any existing value for the name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// Returns the number of bytes consumed and whether the blank line ending
    /// the header block was reached. Consuming zero bytes means no complete
    /// line is buffered yet.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(idx) = data.windows(CRLF.len()).position(|w| w == CRLF) else {
            return Ok((0, false));
        };
        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = &data[..idx];
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| ParseError::MalformedHeader(String::from_utf8_lossy(line).into_owned()))?;
        let (name, value) = (&line[..colon], &line[colon + 1..]);

        if matches!(name.last(), Some(b' ' | b'\t')) {
            return Err(ParseError::InvalidHeaderName(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }
        let name = name.trim_ascii();
        if name.is_empty() || !name.iter().copied().all(is_token_char) {
            return Err(ParseError::InvalidHeaderName(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }

        // Token characters are ASCII; values may carry obs-text.
        let name = String::from_utf8_lossy(name).to_ascii_lowercase();
        let value = String::from_utf8_lossy(value.trim_ascii());
        self.insert_or_merge(&name, &value);
        Ok((idx + CRLF.len(), false))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert_or_merge(name.as_ref(), value.as_ref());
        }
        headers
    }
}
