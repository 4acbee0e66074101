use super::{BUFFER, CONNECT, COPY, Delays, fan_out};
use crate::channel::{Payload, Receiver, Sender};
use crate::context::Process;
use crate::error::SimResult;

/// One-place buffer: receive, then forward.
///
/// Per token: `tl = recv(d0L)`, `tr = send(x, tl + d0R)`, cycle
/// `(e0, tl, tr + d0)`.
///
/// # Errors
///
/// Channel errors other than deadlock are passed through.
pub fn buffer<T: Payload>(p: Process, l: Receiver<T>, r: Sender<T>) -> SimResult<()> {
    let d = Delays::from(&p.init_for(BUFFER, (&l, &r)));

    p.run(|p| {
        loop {
            let (x, tl) = l.recv_at(d.d0l)?;
            let tr = r.send_at(x, tl + d.d0r)?;
            p.cycle(d.e0, tl, tr + d.d0);
        }
    })
}

/// Output-driven buffer: waits for room downstream before receiving.
///
/// Per token: `t0 = wait()`, `tl = recv(t0 + d0L)`, `tr = send(x, tl + d0R)`,
/// cycle `(e0, tl, tr + d0)`.
///
/// # Errors
///
/// As [`buffer`].
pub fn connect<T: Payload>(p: Process, l: Receiver<T>, r: Sender<T>) -> SimResult<()> {
    let d = Delays::from(&p.init_for(CONNECT, (&l, &r)));

    p.run(|p| {
        loop {
            let t0 = r.wait()?;
            let (x, tl) = l.recv_at(t0 + d.d0l)?;
            let tr = r.send_at(x, tl + d.d0r)?;
            p.cycle(d.e0, tl, tr + d.d0);
        }
    })
}

/// Fan-out: forwards every token to all outputs concurrently.
///
/// The cycle ends `d0` after the latest branch completes; energy is
/// `e0` per branch.
///
/// # Errors
///
/// As [`buffer`].
pub fn copy<T: Payload>(p: Process, l: Receiver<T>, r: Vec<Sender<T>>) -> SimResult<()> {
    let d = Delays::from(&p.init_for(COPY, (&l, &r)));
    let e0 = d.e0 * r.len() as f64;

    p.run(|p| {
        loop {
            let (x, tl) = l.recv_at(d.d0l)?;
            let tr = fan_out(&r, &x, tl + d.d0r, Some(tl))?;
            p.cycle(e0, tl, tr + d.d0);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{Profile, ProfileSet};
    use crate::{SimConfig, chan, chan_arr};

    fn root(delays: &[(&str, f64)]) -> Process {
        let profile: Profile = delays.iter().copied().collect();
        let profiles = ProfileSet::new()
            .with(BUFFER, profile.clone())
            .with(COPY, profile.clone())
            .with(CONNECT, profile);
        Process::root(SimConfig::default().with_journal(true).with_profiles(profiles)).unwrap()
    }

    #[test]
    fn buffer_forwards_in_order_with_delay() {
        let top = root(&[("d0R", 2.0), ("d0", 1.0), ("e0", 0.5)]);
        let (l, lr) = chan::<i64>("L", 0);
        let (r, rr) = chan::<i64>("R", 0);

        let io = top.spawn("io");
        io.init((&l, &rr));
        top.go("buf", move |p| buffer(p, lr, r)).unwrap();

        let mut got = Vec::new();
        for v in [5, 6, 7] {
            l.send(v).unwrap();
            let (x, t) = rr.recv().unwrap();
            got.push((x, t));
        }
        drop(io);

        let journal = top.journal().unwrap();
        top.done().unwrap();

        assert_eq!(got.iter().map(|g| g.0).collect::<Vec<_>>(), [5, 6, 7]);
        assert!(got.iter().all(|g| g.1 >= 2.0));

        let cycles = journal.cycles("top.buf");
        assert_eq!(cycles.len(), 3);
        assert_eq!(cycles[0].start, 0.0);
        assert_eq!(cycles[0].end, 3.0);
        assert_eq!(cycles[0].energy, 0.5);
    }

    #[test]
    fn connect_preserves_order() {
        let top = root(&[]);
        let (l, lr) = chan::<i64>("L", 0);
        let (r, rr) = chan::<i64>("R", 1);

        let io = top.spawn("io");
        io.init((&l, &rr));
        top.go("conn", move |p| connect(p, lr, r)).unwrap();

        for v in 0..4 {
            l.send(v).unwrap();
            assert_eq!(rr.recv().unwrap().0, v);
        }
        drop(io);
        top.done().unwrap();
    }

    #[test]
    fn copy_reaches_every_branch() {
        let top = root(&[("d0R", 1.0), ("e0", 1.0)]);
        let (l, lr) = chan::<i64>("L", 0);
        let (r, rr) = chan_arr::<i64>("R", 3, 0);

        let io = top.spawn("io");
        io.init((&l, &rr));
        top.go("copy", move |p| copy(p, lr, r)).unwrap();

        l.send(9).unwrap();
        for branch in &rr {
            assert_eq!(branch.recv().unwrap(), (9, 1.0));
        }
        drop(io);

        let journal = top.journal().unwrap();
        top.done().unwrap();

        let cycles = journal.cycles("top.copy");
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].energy, 3.0);
    }
}
