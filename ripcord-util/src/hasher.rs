use std::hash::{BuildHasher, Hasher};

/// Pass-through hasher for maps keyed by ids that are already
/// well-distributed, e.g. snowflakes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IntHasher;

#[derive(Copy, Clone, Debug, Default)]
pub struct IntHash {
    hash: u64,
    #[cfg(debug_assertions)]
    written: bool,
}

impl IntHash {
    fn set(&mut self, n: u64) {
        #[cfg(debug_assertions)]
        {
            assert!(!self.written, "already hashed");
            self.written = true;
        }

        self.hash = n;
    }
}

#[rustfmt::skip]
impl Hasher for IntHash {
    fn write(&mut self, _: &[u8])     { panic!("IntHash only hashes integers"); }
    fn write_u128(&mut self, _: u128) { panic!("IntHash only hashes integers"); }
    fn write_i128(&mut self, _: i128) { panic!("IntHash only hashes integers"); }

    #[inline] fn write_u8(&mut self, n: u8)       { self.set(u64::from(n)) }
    #[inline] fn write_u16(&mut self, n: u16)     { self.set(u64::from(n)) }
    #[inline] fn write_u32(&mut self, n: u32)     { self.set(u64::from(n)) }
    #[inline] fn write_u64(&mut self, n: u64)     { self.set(n) }
    #[inline] fn write_usize(&mut self, n: usize) { self.set(n as u64) }

    #[inline] fn write_i8(&mut self, n: i8)       { self.set(n as u64) }
    #[inline] fn write_i16(&mut self, n: i16)     { self.set(n as u64) }
    #[inline] fn write_i32(&mut self, n: i32)     { self.set(n as u64) }
    #[inline] fn write_i64(&mut self, n: i64)     { self.set(n as u64) }
    #[inline] fn write_isize(&mut self, n: isize) { self.set(n as u64) }

    #[inline] fn finish(&self) -> u64 { self.hash }
}

impl BuildHasher for IntHasher {
    type Hasher = IntHash;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        IntHash::default()
    }
}
