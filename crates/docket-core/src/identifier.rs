//! Sequential identifiers such as H2S card numbers (`SND-0042`).
//!
//! There is no stored counter. The next value is always `max + 1` over the
//! identifiers already issued in the family, so imports and gaps never make a
//! counter drift from reality.

use serde::Serialize;

use crate::{Error, Result};

/// A prefix plus a fixed zero-padded width, e.g. `SND-` / 4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IdentifierFamily {
  prefix: String,
  width:  usize,
}

impl IdentifierFamily {
  pub fn new(prefix: impl Into<String>, width: usize) -> Result<Self> {
    let prefix = prefix.into();
    if width == 0 {
      return Err(Error::InvalidFamily(format!(
        "width for prefix {prefix:?} must be at least 1"
      )));
    }
    Ok(Self { prefix, width })
  }

  pub fn prefix(&self) -> &str { &self.prefix }

  pub fn width(&self) -> usize { self.width }

  /// Render `value` with this family's prefix and padding.
  ///
  /// Fails rather than truncating when `value` needs more than `width`
  /// digits.
  pub fn format(&self, value: u128) -> Result<String> {
    let digits = value.to_string();
    if digits.len() > self.width {
      return Err(Error::IdentifierOverflow {
        prefix: self.prefix.clone(),
        width: self.width,
        value,
      });
    }
    Ok(format!("{}{:0>width$}", self.prefix, digits, width = self.width))
  }

  /// The identifier that follows every one in `existing`.
  pub fn next_after<I, S>(&self, existing: I) -> Result<String>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let max_seen = existing
      .into_iter()
      .filter_map(|id| trailing_number(id.as_ref()))
      .max()
      .unwrap_or(0);
    self.format(u128::from(max_seen) + 1)
  }
}

/// `prefix + zero_pad(max + 1, width)` over the trailing numbers of
/// `existing`.
pub fn allocate_next<I, S>(existing: I, prefix: &str, width: usize) -> Result<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  IdentifierFamily::new(prefix, width)?.next_after(existing)
}

/// The last contiguous run of ASCII digits in `s`.
///
/// `H2S-2024-0012` yields 12, not 2024. Returns `None` when there are no
/// digits or the run does not fit in a `u64`.
pub fn trailing_number(s: &str) -> Option<u64> {
  let end = s.rfind(|c: char| c.is_ascii_digit())? + 1;
  let start = s[..end]
    .rfind(|c: char| !c.is_ascii_digit())
    .map_or(0, |i| i + s[i..].chars().next().map_or(1, char::len_utf8));
  s[start..end].parse().ok()
}
