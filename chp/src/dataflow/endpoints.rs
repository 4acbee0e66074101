use super::{Delays, SINK, SINK_AND_CHECK, SOURCE, fan_out};
use crate::channel::{Payload, Receiver, Sender};
use crate::context::Process;
use crate::error::{Misconfigured, SimResult};
use crate::timing::TimingSet;

/// Emits `generate(i)` on every output for `i = 0, 1, ...` until a receiver
/// goes away.
///
/// All outputs are driven concurrently; the tick completes at the latest of
/// them and records cycle `(e0 * K, t, t + d0)`.
///
/// # Errors
///
/// Channel errors other than deadlock are passed through.
pub fn source<T, G>(p: Process, generate: G, r: Vec<Sender<T>>) -> SimResult<()>
where
    T: Payload,
    G: FnMut(i64) -> T,
{
    emit(p, None, generate, r)
}

/// Like [`source`], but stops after `n` values.
///
/// The outputs are closed when the process finishes, so downstream stages
/// wind down once they drain.
///
/// # Errors
///
/// As [`source`].
pub fn source_n<T, G>(p: Process, n: i64, generate: G, r: Vec<Sender<T>>) -> SimResult<()>
where
    T: Payload,
    G: FnMut(i64) -> T,
{
    emit(p, Some(n), generate, r)
}

fn emit<T, G>(p: Process, n: Option<i64>, mut generate: G, r: Vec<Sender<T>>) -> SimResult<()>
where
    T: Payload,
    G: FnMut(i64) -> T,
{
    let d = Delays::from(&p.init_for(SOURCE, &r));
    let e0 = d.e0 * r.len() as f64;

    p.run(|p| {
        let mut i = 0;
        while n.is_none_or(|n| i < n) {
            let value = generate(i);
            let t = fan_out(&r, &value, 0.0, None)?;
            p.cycle(e0, t, t + d.d0);
            i += 1;
        }
        Ok(())
    })
}

/// Consumes and discards every token.
///
/// # Errors
///
/// Channel errors other than deadlock are passed through.
pub fn sink<T: Payload>(p: Process, l: Receiver<T>) -> SimResult<()> {
    drain(p, None, l)
}

/// Consumes `n` tokens, then finishes.
///
/// # Errors
///
/// As [`sink`].
pub fn sink_n<T: Payload>(p: Process, n: i64, l: Receiver<T>) -> SimResult<()> {
    drain(p, Some(n), l)
}

fn drain<T: Payload>(p: Process, n: Option<i64>, l: Receiver<T>) -> SimResult<()> {
    let d = Delays::from(&p.init_for(SINK, &l));

    p.run(|p| {
        let mut i = 0;
        while n.is_none_or(|n| i < n) {
            let (_, tl) = l.recv()?;
            p.cycle(d.e0, tl, tl + d.d0);
            i += 1;
        }
        Ok(())
    })
}

/// Receives one token from every input per tick and hands them to
/// `validate` together with the tick index.
///
/// # Errors
///
/// The first error returned by `validate`, as [`SimError::Misconfigured`].
///
/// [`SimError::Misconfigured`]: crate::SimError::Misconfigured
pub fn sink_and_check<T, V>(p: Process, validate: V, l: Vec<Receiver<T>>) -> SimResult<()>
where
    T: Payload,
    V: FnMut(i64, &[T]) -> Result<(), Misconfigured>,
{
    check(p, None, validate, l)
}

/// Like [`sink_and_check`], but stops after `n` ticks.
///
/// # Errors
///
/// As [`sink_and_check`].
pub fn sink_and_check_n<T, V>(p: Process, n: i64, validate: V, l: Vec<Receiver<T>>) -> SimResult<()>
where
    T: Payload,
    V: FnMut(i64, &[T]) -> Result<(), Misconfigured>,
{
    check(p, Some(n), validate, l)
}

fn check<T, V>(p: Process, n: Option<i64>, mut validate: V, l: Vec<Receiver<T>>) -> SimResult<()>
where
    T: Payload,
    V: FnMut(i64, &[T]) -> Result<(), Misconfigured>,
{
    let d = Delays::from(&p.init_for(SINK_AND_CHECK, &l));

    p.run(|p| {
        let mut values = Vec::with_capacity(l.len());
        let mut i = 0;
        while n.is_none_or(|n| i < n) {
            let t = TimingSet::max();
            values.clear();
            for input in &l {
                let (x, tl) = input.recv()?;
                values.push(x);
                t.add(tl);
            }
            validate(i, &values)?;

            let t = t.get()?;
            p.cycle(d.e0, t, t + d.d0);
            i += 1;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::{are_equal, values};
    use crate::{SimConfig, SimError, chan, chan_arr};

    #[test]
    fn source_n_stops_and_closes() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (s, r) = chan_arr::<i64>("R", 2, 0);

        let io = top.spawn("io");
        io.init(&r);
        top.go("src", move |p| source_n(p, 2, values(vec![7, 8]), s))
            .unwrap();

        for want in [7, 8] {
            assert_eq!(r[0].recv().unwrap().0, want);
            assert_eq!(r[1].recv().unwrap().0, want);
        }
        assert!(r[0].recv().unwrap_err().is_deadlock());
        drop(io);
        top.done().unwrap();
    }

    #[test]
    fn sink_n_consumes_exactly_n() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (s, r) = chan::<i64>("L", 0);

        let io = top.spawn("io");
        io.init(&s);
        let handle = top.go("sink", move |p| sink_n(p, 2, r)).unwrap();

        for v in 0..2 {
            s.send(v).unwrap();
        }
        handle.join().unwrap().unwrap();
        assert!(s.send(9).unwrap_err().is_deadlock());
        drop(io);
        top.done().unwrap();
    }

    #[test]
    fn mismatch_is_fatal() {
        let top = Process::root(SimConfig::default()).unwrap();
        let (s, r) = chan_arr::<i64>("L", 2, 1);

        let io = top.spawn("io");
        io.init(&s);
        let handle = top
            .go("check", move |p| sink_and_check(p, are_equal, r))
            .unwrap();

        s[0].send(1).unwrap();
        s[1].send(1).unwrap();
        s[0].send(2).unwrap();
        s[1].send(3).unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(
            err,
            SimError::Misconfigured(Misconfigured::Mismatch { token: 1, .. })
        ));
        drop(io);
        assert!(top.done().is_err());
    }
}
