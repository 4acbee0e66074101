use super::{Delays, PARALLEL_TO_SERIAL, SERIAL_TO_PARALLEL};
use crate::channel::{Payload, Receiver, Sender};
use crate::context::Process;
use crate::error::SimResult;
use crate::stream::{Token, TokenSender};

/// Deals the words of each stream round-robin across the outputs.
///
/// Word `k` of a stream goes to output `k`; the end flag restarts at output
/// 0. Words beyond the last output are consumed and dropped.
///
/// # Errors
///
/// Channel errors other than deadlock are passed through.
pub fn serial_to_parallel<D>(
    p: Process,
    a: Receiver<Token<bool, D>>,
    s: Vec<Sender<Token<bool, D>>>,
) -> SimResult<()>
where
    Token<bool, D>: Payload,
{
    let d = Delays::from(&p.init_for(SERIAL_TO_PARALLEL, (&a, &s)));

    p.run(|p| {
        let mut i = 0;
        loop {
            let (word, ta) = a.recv_at(d.d0l)?;
            let end = word.ctrl;
            let ts = match s.get(i) {
                Some(out) => out.send_at(word, ta + d.d0r)?,
                None => ta,
            };
            i = if end { 0 } else { i + 1 };
            p.cycle(d.e0, ta, ts + d.d0);
        }
    })
}

/// Collects one word from each input in turn into a single stream.
///
/// The forwarded word carries the end flag when its input flagged it or it
/// came from the last input; either way the next word is read from input 0.
///
/// # Errors
///
/// Channel errors other than deadlock are passed through.
pub fn parallel_to_serial<D>(
    p: Process,
    a: Vec<Receiver<Token<bool, D>>>,
    s: Sender<Token<bool, D>>,
) -> SimResult<()>
where
    Token<bool, D>: Payload,
{
    let d = Delays::from(&p.init_for(PARALLEL_TO_SERIAL, (&a, &s)));

    p.run(|p| {
        let mut i = 0;
        while let Some(input) = a.get(i) {
            let (word, ta) = input.recv_at(d.d0l)?;
            let end = word.ctrl || i + 1 == a.len();
            let ts = s.send_token(end, word.data, ta + d.d0r)?;
            i = if end { 0 } else { i + 1 };
            p.cycle(d.e0, ta, ts + d.d0);
        }
        Ok(())
    })
}
