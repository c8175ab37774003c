//! National ID number normalisation, display formatting and validation.
//!
//! The number is 13 decimal digits, displayed in 6-4-2-1 groups:
//!
//! ```text
//! raw      8501015000081
//! display  850101 5000 08 1
//! ```
//!
//! The display string is always recomputed from the raw digits, never edited
//! in place. Each keystroke runs `normalize` on whatever the input field holds
//! and then `format` on the result, so a stray separator or pasted text can
//! never make the displayed value drift from the digits underneath.

use crate::error::CaptureError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of digits in a complete ID number.
pub const ID_NUMBER_LEN: usize = 13;

/// Digit counts after which a separator is inserted in the display form.
const GROUP_BREAKS: [usize; 3] = [6, 10, 12];

const SEPARATOR: char = ' ';

/// Keep only ASCII decimal digits, truncated to [`ID_NUMBER_LEN`].
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(ID_NUMBER_LEN)
        .collect()
}

/// Group a digit string as 6-4-2-1.
///
/// Partial input is grouped as far as it goes: a separator is only emitted
/// once the digit that follows it exists, so `"8501015"` becomes
/// `"850101 5"` and `"850101"` stays `"850101"`. Input longer than
/// [`ID_NUMBER_LEN`] is truncated first.
pub fn format(digits: &str) -> String {
    let mut out = String::with_capacity(ID_NUMBER_LEN + GROUP_BREAKS.len());
    for (i, c) in digits.chars().take(ID_NUMBER_LEN).enumerate() {
        if GROUP_BREAKS.contains(&i) {
            out.push(SEPARATOR);
        }
        out.push(c);
    }
    out
}

/// `true` iff `digits` is exactly [`ID_NUMBER_LEN`] ASCII digits.
///
/// Expects normalised input; separators or other characters make it `false`.
pub fn is_complete(digits: &str) -> bool {
    digits.len() == ID_NUMBER_LEN && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A validated, complete 13-digit ID number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdNumber(String);

impl IdNumber {
    /// Normalise `raw` and accept it only if exactly 13 digits remain.
    ///
    /// Surrounding separators are ignored, so both `"8501015000081"` and
    /// `"850101 5000 08 1"` parse to the same number.
    pub fn parse(raw: &str) -> Result<Self, CaptureError> {
        // Count before truncation so 14 typed digits are reported, not hidden.
        let typed = raw.chars().filter(char::is_ascii_digit).count();
        if typed != ID_NUMBER_LEN {
            return Err(CaptureError::IncompleteIdNumber { digits: typed });
        }
        Ok(Self(normalize(raw)))
    }

    /// The raw 13-digit form, e.g. for file names.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The 6-4-2-1 display form.
    pub fn formatted(&self) -> String {
        format(&self.0)
    }
}

impl fmt::Display for IdNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl TryFrom<String> for IdNumber {
    type Error = CaptureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdNumber> for String {
    fn from(id: IdNumber) -> Self {
        id.0
    }
}

/// The state behind an ID input field.
///
/// Mirrors an `input` event handler: whatever the field contains after an
/// edit is fed to [`IdInput::on_input`], which stores the normalised digits
/// and returns the text the field should now display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdInput {
    digits: String,
}

impl IdInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the field contents with `text`; returns the display value.
    pub fn on_input(&mut self, text: &str) -> String {
        self.digits = normalize(text);
        self.display()
    }

    /// Append one typed character to the current display value.
    pub fn type_char(&mut self, c: char) -> String {
        let mut text = self.display();
        text.push(c);
        self.on_input(&text)
    }

    /// Remove the last digit.
    pub fn backspace(&mut self) -> String {
        self.digits.pop();
        self.display()
    }

    pub fn display(&self) -> String {
        format(&self.digits)
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn is_complete(&self) -> bool {
        is_complete(&self.digits)
    }

    /// Validate the current contents as a complete [`IdNumber`].
    pub fn id_number(&self) -> Result<IdNumber, CaptureError> {
        IdNumber::parse(&self.digits)
    }
}
