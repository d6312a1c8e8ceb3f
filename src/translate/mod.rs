//! Drives the translator: upstream byte stream in, output-record stream out.

mod chunk;
mod sanitize;
mod state;

pub use chunk::{clean_final_content, split_paragraphs};
pub use sanitize::{is_delegation_tool, is_wholly_noise, strip_noise};
pub use state::{CallStatus, Member, MemberStatus, ReasoningBlock, StreamState, ToolCallState};

use std::pin::Pin;

use bytes::Bytes;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::core::record::OutputRecord;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateMode {
    /// Single agent, no delegation.
    Agent,
    /// Coordinator with delegated team members.
    Team,
}

pub type RecordStream = Pin<Box<dyn futures_core::Stream<Item = OutputRecord> + Send>>;

/// Translates an upstream byte stream into an ordered output-record stream.
///
/// Pull-driven: work happens only when the consumer polls and the transport
/// yields a chunk; each frame is processed run-to-completion, so records
/// preserve frame order. A mid-stream transport error yields one error
/// record and ends the stream without further writes; cancelling the token
/// (or dropping the returned stream) releases the upstream read handle.
pub fn translate<S, E>(mode: TranslateMode, upstream: S, cancel: CancellationToken) -> RecordStream
where
    S: futures_core::Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut upstream = Box::pin(upstream);
        let mut parser = crate::parser::FrameParser::new();
        let mut pending: Vec<u8> = Vec::new();
        let mut state = match mode {
            TranslateMode::Agent => StreamState::agent(),
            TranslateMode::Team => StreamState::team(),
        };

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return,
                chunk = upstream.next() => chunk,
            };
            match chunk {
                None => break,
                Some(Ok(bytes)) => {
                    pending.extend_from_slice(&bytes);
                    let ready = decodable_prefix(&pending);
                    let text = String::from_utf8_lossy(&pending[..ready]).into_owned();
                    pending.drain(..ready);
                    for frame in parser.push_chunk(&text) {
                        for record in state.apply(&frame) {
                            yield record;
                        }
                    }
                }
                Some(Err(e)) => {
                    yield OutputRecord::Error {
                        message: e.to_string(),
                    };
                    return;
                }
            }
        }

        if !pending.is_empty() {
            let text = String::from_utf8_lossy(&pending).into_owned();
            for frame in parser.push_chunk(&text) {
                for record in state.apply(&frame) {
                    yield record;
                }
            }
        }
        for frame in parser.finish() {
            for record in state.apply(&frame) {
                yield record;
            }
        }
        for record in state.finish() {
            yield record;
        }
    })
}

/// Length of the buffer prefix that is safe to decode now. A multi-byte
/// UTF-8 sequence cut off at the end of the buffer is held back until the
/// next chunk completes it; invalid bytes elsewhere are left in the prefix
/// for lossy replacement.
fn decodable_prefix(buf: &[u8]) -> usize {
    let mut offset = 0;
    loop {
        match std::str::from_utf8(&buf[offset..]) {
            Ok(_) => return buf.len(),
            Err(e) => match e.error_len() {
                // Truncated sequence at the end of the buffer.
                None => return offset + e.valid_up_to(),
                Some(bad) => offset += e.valid_up_to() + bad,
            },
        }
    }
}
