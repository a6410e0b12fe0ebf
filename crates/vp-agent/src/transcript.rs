//! Transcript sources for the listening session.
//!
//! Speech capture and recognition happen upstream; the session only sees
//! finished transcripts, one per utterance.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

#[async_trait]
pub trait TranscriptSource: Send {
    /// Next transcript, or `None` once the source is exhausted.
    async fn next_transcript(&mut self) -> std::io::Result<Option<String>>;
}

/// One transcript per line of an async reader.
pub struct LineTranscripts<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineTranscripts<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl LineTranscripts<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> TranscriptSource for LineTranscripts<R> {
    async fn next_transcript(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Fixed list of transcripts (tests and demos).
#[derive(Debug, Default)]
pub struct ScriptedTranscripts {
    remaining: VecDeque<String>,
}

impl ScriptedTranscripts {
    pub fn new<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining: transcripts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

#[async_trait]
impl TranscriptSource for ScriptedTranscripts {
    async fn next_transcript(&mut self) -> std::io::Result<Option<String>> {
        Ok(self.remaining.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_lines_until_eof() {
        let input: &[u8] = b"take off\nmove forward\n\nland";
        let mut source = LineTranscripts::new(input);
        assert_eq!(source.next_transcript().await.unwrap().as_deref(), Some("take off"));
        assert_eq!(
            source.next_transcript().await.unwrap().as_deref(),
            Some("move forward")
        );
        assert_eq!(source.next_transcript().await.unwrap().as_deref(), Some(""));
        assert_eq!(source.next_transcript().await.unwrap().as_deref(), Some("land"));
        assert_eq!(source.next_transcript().await.unwrap(), None);
    }

    #[tokio::test]
    async fn scripted_drains_in_order() {
        let mut source = ScriptedTranscripts::new(["hover", "land"]);
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_transcript().await.unwrap().as_deref(), Some("hover"));
        assert_eq!(source.next_transcript().await.unwrap().as_deref(), Some("land"));
        assert!(source.next_transcript().await.unwrap().is_none());
    }
}
