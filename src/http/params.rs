//! URL-encoded parameter decoding.
//!
//! One percent-decoding rule (`+` to space, `%XX` hex escapes), two
//! sources: [`PushbackReader::read_post_param`] pulls bytes live from
//! the connection for POST bodies, while [`UrlParams`] advances a
//! cursor through the already-buffered query-string tail. The two
//! differ at a malformed escape hitting the end of input - the live
//! variant fails the decode outright, the buffered one rewinds to the
//! terminator - and both behaviors are part of the contract.
//!
//! Destination buffers are null-filled up front and the final byte of
//! each is reserved for the terminator, so a destination of capacity
//! `N` receives at most `N - 1` data bytes no matter how long the
//! input runs.

use crate::io::{
    reader::PushbackReader,
    source::{ByteSource, Clock},
};

/// Outcome of decoding one key/value pair from a buffered tail.
///
/// Overflow is non-fatal: the truncated, terminated value is still
/// delivered, and the code tells the caller which side lost data.
/// [`EndOfParams`](UrlParamResult::EndOfParams) is returned only by a
/// call made *after* the tail is exhausted - the pair that exactly
/// reaches the end still reports its own result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlParamResult {
    /// Name and value both fit.
    Ok,
    /// The name was truncated; the value fit.
    NameOverflow,
    /// The value was truncated; the name fit.
    ValueOverflow,
    /// Both sides were truncated.
    BothOverflow,
    /// No parameters left.
    EndOfParams,
}

impl<S: ByteSource, C: Clock> PushbackReader<S, C> {
    /// Decodes the next `name=value` pair live from the stream,
    /// assuming the headers have already been consumed and the reader
    /// is positioned at the start of a POST body keyword.
    ///
    /// `=` ends the name field and switches storage to the value; `&`
    /// ends the pair. Storage is budget-driven, not field-driven: once
    /// the name buffer's data capacity is used up, further bytes land
    /// in the value buffer even before `=` is seen, so an overlong
    /// name spills its tail into the value.
    /// Returns true while another pair may follow;
    /// false at end-of-stream (the body is over) or when a `%` escape
    /// cannot obtain its two hex bytes - a hard decode failure on a
    /// live socket, since the missing bytes are gone for good.
    pub fn read_post_param(&mut self, name: &mut [u8], value: &mut [u8]) -> bool {
        name.fill(0);
        value.fill(0);
        let mut name_left = name.len().saturating_sub(1);
        let mut value_left = value.len().saturating_sub(1);
        let mut name_at = 0;
        let mut value_at = 0;

        while let Some(raw) = self.read() {
            let ch = match raw {
                b'+' => b' ',
                b'=' => {
                    // End of name: force further bytes into the value.
                    name_left = 0;
                    continue;
                }
                b'&' => return true,
                b'%' => {
                    let (Some(first), Some(second)) = (self.read(), self.read()) else {
                        return false;
                    };
                    hex_pair(first, second)
                }
                other => other,
            };

            if name_left > 0 {
                name[name_at] = ch;
                name_at += 1;
                name_left -= 1;
            } else if value_left > 0 {
                value[value_at] = ch;
                value_at += 1;
                value_left -= 1;
            }
        }

        // End-of-stream: the POST body is over, no more parameters.
        false
    }
}

/// Cursor over the buffered query-string portion of a request tail,
/// yielding decoded key/value pairs.
///
/// ```
/// use solo_web::{UrlParamResult, UrlParams};
///
/// let mut params = UrlParams::new(b"x=1&y=a+b");
/// let (mut name, mut value) = ([0u8; 16], [0u8; 16]);
///
/// assert_eq!(params.next_param(&mut name, &mut value), UrlParamResult::Ok);
/// assert_eq!(&name[..1], b"x");
/// assert_eq!(&value[..1], b"1");
///
/// assert_eq!(params.next_param(&mut name, &mut value), UrlParamResult::Ok);
/// assert_eq!(&name[..1], b"y");
/// assert_eq!(&value[..3], b"a b");
///
/// assert_eq!(
///     params.next_param(&mut name, &mut value),
///     UrlParamResult::EndOfParams,
/// );
/// ```
pub struct UrlParams<'a> {
    tail: &'a [u8],
    pos: usize,
}

impl<'a> UrlParams<'a> {
    #[inline]
    pub fn new(tail: &'a [u8]) -> Self {
        UrlParams { tail, pos: 0 }
    }

    /// Decodes the next pair into `name` and `value`.
    ///
    /// A `%` escape running past the end of the buffer leaves the
    /// cursor at the terminator rather than reading beyond it; the
    /// bytes decoded so far are kept and the next call reports
    /// [`UrlParamResult::EndOfParams`].
    pub fn next_param(&mut self, name: &mut [u8], value: &mut [u8]) -> UrlParamResult {
        name.fill(0);
        value.fill(0);

        if self.pos >= self.tail.len() {
            return UrlParamResult::EndOfParams;
        }

        let mut result = UrlParamResult::Ok;
        let mut need_value = true;

        // Name field.
        let mut left = name.len().saturating_sub(1);
        let mut at = 0;
        loop {
            let Some(raw) = self.take() else {
                need_value = false;
                break;
            };
            let ch = match raw {
                b'&' => {
                    need_value = false;
                    break;
                }
                b'=' => break,
                b'+' => b' ',
                b'%' => match self.take_hex() {
                    Some(decoded) => decoded,
                    None => {
                        need_value = false;
                        break;
                    }
                },
                other => other,
            };

            if left > 0 {
                name[at] = ch;
                at += 1;
                left -= 1;
            } else {
                result = UrlParamResult::NameOverflow;
            }
        }

        if need_value && self.pos < self.tail.len() {
            let mut left = value.len().saturating_sub(1);
            let mut at = 0;
            loop {
                let Some(raw) = self.take() else { break };
                let ch = match raw {
                    b'&' => break,
                    b'+' => b' ',
                    b'%' => match self.take_hex() {
                        Some(decoded) => decoded,
                        None => break,
                    },
                    other => other,
                };

                if left > 0 {
                    value[at] = ch;
                    at += 1;
                    left -= 1;
                } else {
                    // Sticky: once the name side has overflowed, every
                    // further value overflow stays "both".
                    result = match result {
                        UrlParamResult::NameOverflow | UrlParamResult::BothOverflow => {
                            UrlParamResult::BothOverflow
                        }
                        _ => UrlParamResult::ValueOverflow,
                    };
                }
            }
        }

        result
    }

    #[inline]
    fn take(&mut self) -> Option<u8> {
        let ch = self.tail.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    /// Consumes the two bytes of a `%XX` escape. `None` when the
    /// buffer ends mid-sequence; the cursor is then already at the
    /// terminator and stays there.
    #[inline]
    fn take_hex(&mut self) -> Option<u8> {
        let first = self.take()?;
        let second = self.take()?;
        Some(hex_pair(first, second))
    }
}

// Lenient prefix parse of a two-digit hex escape, strtoul-style: an
// invalid first digit decodes to 0, an invalid second digit leaves the
// first digit's value.
fn hex_pair(first: u8, second: u8) -> u8 {
    let Some(high) = (first as char).to_digit(16) else {
        return 0;
    };
    match (second as char).to_digit(16) {
        Some(low) => (high * 16 + low) as u8,
        None => high as u8,
    }
}
