//! Open bit-set newtypes.
//!
//! Flag sets in this crate are additive: new bits can be declared without
//! renumbering existing ones, and unknown bits survive a round trip through
//! `from_bits_retain`/`bits`.

/// Declares a copyable bit-set newtype with named single-bit constants.
///
/// Composite masks (several bits under one name) belong in a separate
/// `impl` block so they are not printed as flags of their own.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $repr:ty {
            $(
                $(#[$fmeta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($repr);

        impl $name {
            /// No bit set.
            pub const NONE: Self = Self(0);
            $(
                $(#[$fmeta])*
                pub const $flag: Self = Self($value);
            )*

            const NAMED: &'static [(&'static str, $repr)] = &[$((stringify!($flag), $value)),*];

            /// Raw bits.
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Builds a set from raw bits, keeping bits with no name.
            pub const fn from_bits_retain(bits: $repr) -> Self {
                Self(bits)
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.insert(rhs);
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                if self.0 == 0 {
                    return f.write_str("NONE");
                }
                let mut rest = self.0;
                let mut first = true;
                for (name, bit) in Self::NAMED {
                    if bit.count_ones() == 1 && self.0 & bit != 0 {
                        if !first {
                            f.write_str("|")?;
                        }
                        f.write_str(name)?;
                        rest &= !bit;
                        first = false;
                    }
                }
                if rest != 0 {
                    if !first {
                        f.write_str("|")?;
                    }
                    write!(f, "{:#x}", rest)?;
                }
                Ok(())
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    flag_set! {
        struct Probe: u32 {
            const A = 1 << 0;
            const B = 1 << 1;
        }
    }

    #[test]
    fn display_lists_named_bits() {
        assert_eq!(Probe::NONE.to_string(), "NONE");
        assert_eq!((Probe::A | Probe::B).to_string(), "A|B");
    }

    #[test]
    fn unknown_bits_are_retained() {
        let p = Probe::from_bits_retain(0b1001);
        assert!(p.contains(Probe::A));
        assert!(!p.contains(Probe::B));
        assert_eq!(p.bits(), 0b1001);
        assert_eq!(p.to_string(), "A|0x8");
    }

    #[test]
    fn insert_and_remove() {
        let mut p = Probe::NONE;
        p.insert(Probe::B);
        assert!(p.intersects(Probe::A | Probe::B));
        p.remove(Probe::B);
        assert!(p.is_empty());
    }
}
