//! Bindable endpoints.
//!
//! [`Process::init`](crate::Process::init) accepts anything implementing
//! [`Ports`]: a single endpoint, a reference to one, slices, vectors and
//! arrays of endpoints, and tuples mixing all of these.

use std::io;

use super::Process;
use crate::channel::{Payload, Receiver, Sender};

/// An endpoint a process can bind to its clock and close on completion.
pub trait Port: Send + Sync + 'static {
    /// Name of the underlying channel.
    fn channel(&self) -> &str;

    /// Makes `process`'s clock the time base of this endpoint.
    fn bind(&self, process: &Process);

    /// Closes this side of the channel.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while flushing the endpoint's log.
    fn close(&self) -> io::Result<()>;
}

/// A collection of endpoints.
pub trait Ports {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>);
}

impl<T: Payload> Ports for Sender<T> {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
        out.push(Box::new(self.clone()));
    }
}

impl<T: Payload> Ports for Receiver<T> {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
        out.push(Box::new(self.clone()));
    }
}

impl<P: Ports + ?Sized> Ports for &P {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
        (**self).collect_ports(out);
    }
}

impl<P: Ports> Ports for [P] {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
        for p in self {
            p.collect_ports(out);
        }
    }
}

impl<P: Ports, const N: usize> Ports for [P; N] {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
        self.as_slice().collect_ports(out);
    }
}

impl<P: Ports> Ports for Vec<P> {
    fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
        self.as_slice().collect_ports(out);
    }
}

impl Ports for () {
    fn collect_ports(&self, _out: &mut Vec<Box<dyn Port>>) {}
}

macro_rules! impl_ports_tuple {
    ($($name:ident),+) => {
        impl<$($name: Ports),+> Ports for ($($name,)+) {
            #[allow(non_snake_case)]
            fn collect_ports(&self, out: &mut Vec<Box<dyn Port>>) {
                let ($($name,)+) = self;
                $($name.collect_ports(out);)+
            }
        }
    };
}

impl_ports_tuple!(A);
impl_ports_tuple!(A, B);
impl_ports_tuple!(A, B, C);
impl_ports_tuple!(A, B, C, D);
impl_ports_tuple!(A, B, C, D, E);
impl_ports_tuple!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chan, chan_arr};

    fn names(ports: impl Ports) -> Vec<String> {
        let mut out = Vec::new();
        ports.collect_ports(&mut out);
        out.iter().map(|p| p.channel().to_owned()).collect()
    }

    #[test]
    fn nested_collections_flatten_in_order() {
        let (a, _ra) = chan::<i64>("A", 0);
        let (_sb, b) = chan::<bool>("B", 0);
        let (c, _rc) = chan_arr::<i64>("C", 2, 0);

        assert_eq!(names((&a, &b, &c)), ["A", "B", "C.0", "C.1"]);
        assert_eq!(names([&a, &a]), ["A", "A"]);
        assert!(names(()).is_empty());
    }
}
