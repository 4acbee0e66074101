use super::{Delays, MERGE, SPLIT};
use crate::channel::{Payload, Receiver, Sender};
use crate::context::Process;
use crate::error::{Misconfigured, SimResult};
use crate::stream::Delimited;

/// Receives the control token and checks it selects one of `branches`.
///
/// Runs before any data is touched, so a bad selector never consumes a data
/// token.
fn select(p: &Process, c: &Receiver<i64>, d0c: f64, branches: usize) -> SimResult<(usize, f64)> {
    let (sel, tc) = c.recv_at(d0c)?;
    match usize::try_from(sel) {
        Ok(i) if i < branches => Ok((i, tc)),
        _ => Err(Misconfigured::ControlOutOfRange {
            process: p.name().to_owned(),
            control: sel,
            branches,
        }
        .into()),
    }
}

/// Demultiplexer: routes each data transaction to the branch named by the
/// control token.
///
/// A transaction is every data token up to and including the first that
/// reports [`Delimited::is_last`]; for scalar payloads that is a single
/// token. The first data token of a transaction starts its cycle no earlier
/// than the control token; each forwarded token records one cycle.
///
/// # Errors
///
/// [`Misconfigured::ControlOutOfRange`] when the control value is not in
/// `0..r.len()`.
pub fn split<T>(p: Process, c: Receiver<i64>, l: Receiver<T>, r: Vec<Sender<T>>) -> SimResult<()>
where
    T: Payload + Delimited,
{
    let d = Delays::from(&p.init_for(SPLIT, (&c, &l, &r)));

    p.run(|p| {
        loop {
            let (sel, tc) = select(p, &c, d.d0c, r.len())?;
            let out = &r[sel];

            let mut floor = tc;
            loop {
                let (x, tl) = l.recv_at(d.d0l)?;
                let t = tl.max(floor);
                let last = x.is_last();
                let tr = out.send_at(x, t + d.d0r)?;
                p.cycle(d.e0, t, tr + d.d0);
                if last {
                    break;
                }
                floor = 0.0;
            }
        }
    })
}

/// Multiplexer: forwards one data transaction from the branch named by the
/// control token.
///
/// Mirror image of [`split`].
///
/// # Errors
///
/// [`Misconfigured::ControlOutOfRange`] when the control value is not in
/// `0..l.len()`.
pub fn merge<T>(p: Process, c: Receiver<i64>, l: Vec<Receiver<T>>, r: Sender<T>) -> SimResult<()>
where
    T: Payload + Delimited,
{
    let d = Delays::from(&p.init_for(MERGE, (&c, &l, &r)));

    p.run(|p| {
        loop {
            let (sel, tc) = select(p, &c, d.d0c, l.len())?;
            let input = &l[sel];

            let mut floor = tc;
            loop {
                let (x, tl) = input.recv_at(d.d0l)?;
                let t = tl.max(floor);
                let last = x.is_last();
                let tr = r.send_at(x, t + d.d0r)?;
                p.cycle(d.e0, t, tr + d.d0);
                if last {
                    break;
                }
                floor = 0.0;
            }
        }
    })
}
