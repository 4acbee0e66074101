//! Delimited token streams.
//!
//! A logical value too wide for one handshake travels as a sequence of
//! [`Token`]s on a single channel. Each token pairs a control field with a
//! data field; for streams the control is an end flag set on the last token
//! of the sequence.

use crate::channel::{Payload, Receiver, Sender};
use crate::Describe;
use crate::error::SimResult;

/// A data word tagged with a control value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Describe)]
pub struct Token<C, D> {
    pub ctrl: C,
    pub data: D,
}

impl<C, D> Token<C, D> {
    pub const fn new(ctrl: C, data: D) -> Self {
        Self { ctrl, data }
    }
}

/// A payload that may be one token of a multi-token transaction.
///
/// Split and merge operators keep forwarding tokens on the selected branch
/// until one reports `is_last`.
pub trait Delimited {
    fn is_last(&self) -> bool;
}

macro_rules! impl_delimited_single {
    ($($t:ty),* $(,)?) => {
        $(
            impl Delimited for $t {
                fn is_last(&self) -> bool {
                    true
                }
            }
        )*
    };
}

impl_delimited_single! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    bool, char, String, (),
}

impl<T> Delimited for Vec<T> {
    fn is_last(&self) -> bool {
        true
    }
}

impl<D> Delimited for Token<bool, D> {
    fn is_last(&self) -> bool {
        self.ctrl
    }
}

/// Token-level sends on a channel of [`Token`]s.
pub trait TokenSender<C, D> {
    /// Sends `Token { ctrl, data }` starting `offset` after the current time.
    ///
    /// # Errors
    ///
    /// Same as [`Sender::send_at`].
    fn send_token(&self, ctrl: C, data: D, offset: f64) -> SimResult<f64>;
}

impl<C, D> TokenSender<C, D> for Sender<Token<C, D>>
where
    Token<C, D>: Payload,
{
    fn send_token(&self, ctrl: C, data: D, offset: f64) -> SimResult<f64> {
        self.send_at(Token::new(ctrl, data), offset)
    }
}

/// Whole-stream sends on an end-flagged channel.
pub trait StreamSender<D> {
    /// Sends `words` as one stream, flagging the last word.
    ///
    /// The `i`th word starts at `start + i * step`. Returns the settled time
    /// of the last word, or `start` for an empty stream.
    ///
    /// # Errors
    ///
    /// Same as [`Sender::send_at`].
    fn send_stream(&self, words: &[D], start: f64, step: f64) -> SimResult<f64>;
}

impl<D> StreamSender<D> for Sender<Token<bool, D>>
where
    D: Clone,
    Token<bool, D>: Payload,
{
    fn send_stream(&self, words: &[D], start: f64, step: f64) -> SimResult<f64> {
        let mut at = start;
        let mut end = start;
        for (i, word) in words.iter().enumerate() {
            end = self.send_token(i + 1 == words.len(), word.clone(), at)?;
            at += step;
        }
        Ok(end)
    }
}

/// Whole-stream receives on an end-flagged channel.
pub trait StreamReceiver<D> {
    /// Receives words until one carries the end flag.
    ///
    /// The `i`th word is received no earlier than `start + i * step`.
    /// Returns the words and the settled time of the last one.
    ///
    /// # Errors
    ///
    /// Same as [`Receiver::recv_at`]. Words already received are lost.
    fn recv_stream(&self, start: f64, step: f64) -> SimResult<(Vec<D>, f64)>;
}

impl<D> StreamReceiver<D> for Receiver<Token<bool, D>>
where
    Token<bool, D>: Payload,
{
    fn recv_stream(&self, start: f64, step: f64) -> SimResult<(Vec<D>, f64)> {
        let mut words = Vec::new();
        let mut at = start;
        loop {
            let (token, end) = self.recv_at(at)?;
            words.push(token.data);
            if token.ctrl {
                return Ok((words, end));
            }
            at += step;
        }
    }
}
