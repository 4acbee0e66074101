//! Payload shape descriptions for waveform log headers.
//!
//! A waveform file starts with a header naming the shape of the values it
//! records: sequences as `[elem]`, records as `{field:shape ...}` and scalars
//! by their type name. The shape is resolved statically per payload type;
//! records get it from `#[derive(Describe)]`.
//!
//! ```
//! use chp::Describe;
//!
//! #[derive(Describe)]
//! struct Flit {
//!     last: bool,
//!     data: Vec<u8>,
//! }
//!
//! assert_eq!(Flit::describe(), "{last:bool data:[u8]}");
//! assert_eq!(<[i64; 4]>::describe(), "[i64]");
//! ```

/// Static description of a payload type's shape.
pub trait Describe {
    /// Returns the shape of `Self` as written in waveform headers.
    fn describe() -> String;
}

macro_rules! impl_describe_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl Describe for $t {
                fn describe() -> String {
                    stringify!($t).to_owned()
                }
            }
        )*
    };
}

impl_describe_scalar! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    bool, char, String, (),
}

impl Describe for &str {
    fn describe() -> String {
        "str".to_owned()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> String {
        format!("[{}]", T::describe())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> String {
        format!("[{}]", T::describe())
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> String {
        T::describe()
    }
}

macro_rules! impl_describe_tuple {
    ($($name:ident),+) => {
        impl<$($name: Describe),+> Describe for ($($name,)+) {
            fn describe() -> String {
                let fields: Vec<String> = vec![$($name::describe()),+]
                    .into_iter()
                    .enumerate()
                    .map(|(i, shape)| format!("{i}:{shape}"))
                    .collect();
                format!("{{{}}}", fields.join(" "))
            }
        }
    };
}

impl_describe_tuple!(A);
impl_describe_tuple!(A, B);
impl_describe_tuple!(A, B, C);
impl_describe_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use crate::Describe;

    #[derive(Describe)]
    struct Pair {
        left: i64,
        right: Vec<bool>,
    }

    #[derive(Describe)]
    struct Wrapped(u8, f64);

    #[derive(Describe)]
    enum Phase {
        _Request,
        _Acknowledge,
    }

    #[test]
    fn scalars_use_type_name() {
        assert_eq!(i64::describe(), "i64");
        assert_eq!(bool::describe(), "bool");
    }

    #[test]
    fn sequences_are_bracketed() {
        assert_eq!(Vec::<u32>::describe(), "[u32]");
        assert_eq!(<[[bool; 2]; 3]>::describe(), "[[bool]]");
    }

    #[test]
    fn tuples_number_their_fields() {
        assert_eq!(<(bool, i64)>::describe(), "{0:bool 1:i64}");
    }

    #[test]
    fn derived_struct_lists_fields() {
        assert_eq!(Pair::describe(), "{left:i64 right:[bool]}");
        assert_eq!(Wrapped::describe(), "{0:u8 1:f64}");
    }

    #[test]
    fn derived_enum_uses_name() {
        assert_eq!(Phase::describe(), "Phase");
    }
}
