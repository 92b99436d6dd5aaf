use serde::{Deserialize, Serialize};

use crate::error::{CadenzaError, Result};

/// Frame label reserved for non-speech frames.
pub const SILENCE_LABEL: u32 = 1;

/// One utterance as read from an alignment corpus.
///
/// The on-disk format is `"<utterance_id> <label> <label> ..."`, one
/// utterance per line, with one integer label per frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentLine {
    /// Utterance identifier (first token of the line).
    pub id: String,
    /// Per-frame label codes, in frame order.
    pub frames: Vec<u32>,
}

impl AlignmentLine {
    pub fn new(id: impl Into<String>, frames: Vec<u32>) -> Self {
        Self {
            id: id.into(),
            frames,
        }
    }

    /// Parse one corpus line.
    ///
    /// Returns `Ok(None)` for blank lines. `line_no` is 1-based and only
    /// used for error reporting.
    ///
    /// # Examples
    /// ```
    /// use cadenza_core::types::AlignmentLine;
    ///
    /// let line = AlignmentLine::parse(1, "utt1 1 2 2 1").unwrap().unwrap();
    /// assert_eq!(line.id, "utt1");
    /// assert_eq!(line.frames, vec![1, 2, 2, 1]);
    /// ```
    pub fn parse(line_no: usize, text: &str) -> Result<Option<Self>> {
        let mut tokens = text.split_whitespace();
        let Some(id) = tokens.next() else {
            return Ok(None);
        };

        let frames = tokens
            .map(|token| {
                token.parse::<u32>().map_err(|_| CadenzaError::MalformedLine {
                    line: line_no,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self::new(id, frames)))
    }

    /// Number of frames in the utterance.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let line = AlignmentLine::parse(1, "utt1 1 1 2 2 2 1 1 3 1 1")
            .unwrap()
            .unwrap();
        assert_eq!(line.id, "utt1");
        assert_eq!(line.frames, vec![1, 1, 2, 2, 2, 1, 1, 3, 1, 1]);
        assert_eq!(line.len(), 10);
    }

    #[test]
    fn test_parse_blank() {
        assert!(AlignmentLine::parse(1, "").unwrap().is_none());
        assert!(AlignmentLine::parse(2, "   \t ").unwrap().is_none());
    }

    #[test]
    fn test_parse_id_only() {
        let line = AlignmentLine::parse(1, "utt9").unwrap().unwrap();
        assert_eq!(line.id, "utt9");
        assert!(line.is_empty());
    }

    #[test]
    fn test_parse_tolerates_repeated_spaces() {
        let line = AlignmentLine::parse(1, "utt3  4   5\r").unwrap().unwrap();
        assert_eq!(line.frames, vec![4, 5]);
    }

    #[test]
    fn test_parse_rejects_non_integer() {
        let err = AlignmentLine::parse(7, "utt4 2 two 3").unwrap_err();
        match err {
            CadenzaError::MalformedLine { line, token } => {
                assert_eq!(line, 7);
                assert_eq!(token, "two");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(AlignmentLine::parse(1, "utt5 -1 2").is_err());
    }
}
