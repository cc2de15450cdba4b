//! Frame-parity bookkeeping for double-buffered state.
//!
//! A [`PingPong`] holds two values `a` and `b`. Each simulation step advances a
//! [`FrameParity`] counter and asks the pair which member to read and which to
//! write. Even frames read `b` and write `a`; odd frames read `a` and write `b`.
//! The member written in one step is the one read in the next, and a step
//! never reads and writes the same member.
//!
//! The pair is generic so the same selection logic drives GPU render targets,
//! their bind groups, and plain values in tests.

/// Which member of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// First member.
    A,
    /// Second member.
    B,
}

impl Slot {
    /// The other member.
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Monotonic step counter. Never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameParity(u64);

impl FrameParity {
    /// A counter that has not stepped yet.
    pub fn new() -> Self {
        Self(0)
    }

    /// Advance by one step, returning the new frame number.
    pub fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        self.0
    }

    /// Member written at the current frame.
    pub fn write_slot(&self) -> Slot {
        if self.0 % 2 == 0 {
            Slot::A
        } else {
            Slot::B
        }
    }

    /// Member read at the current frame.
    pub fn read_slot(&self) -> Slot {
        self.write_slot().other()
    }
}

/// Two values of the same type used alternately as source and destination.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    a: T,
    b: T,
}

impl<T> PingPong<T> {
    /// Create a pair.
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Build both members with the same constructor.
    pub fn from_fn(mut make: impl FnMut(Slot) -> T) -> Self {
        let a = make(Slot::A);
        let b = make(Slot::B);
        Self { a, b }
    }

    /// Borrow one member.
    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    /// `(read, write)` for the given frame parity.
    pub fn targets(&self, parity: FrameParity) -> (&T, &T) {
        (self.get(parity.read_slot()), self.get(parity.write_slot()))
    }

    /// Member most recently written at `parity`.
    pub fn current(&self, parity: FrameParity) -> &T {
        self.get(parity.write_slot())
    }

    /// Consume the pair.
    pub fn into_inner(self) -> (T, T) {
        (self.a, self.b)
    }

    /// Map both members.
    pub fn map<U>(&self, mut f: impl FnMut(Slot, &T) -> U) -> PingPong<U> {
        PingPong {
            a: f(Slot::A, &self.a),
            b: f(Slot::B, &self.b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_starts_at_zero() {
        let parity = FrameParity::new();
        assert_eq!(parity.frame(), 0);
        assert_eq!(parity.write_slot(), Slot::A);
        assert_eq!(parity.read_slot(), Slot::B);
    }

    #[test]
    fn test_first_step_reads_a_writes_b() {
        let pair = PingPong::new("A", "B");
        let mut parity = FrameParity::new();
        assert_eq!(parity.advance(), 1);
        assert_eq!(pair.targets(parity), (&"A", &"B"));
    }

    #[test]
    fn test_alternates_strictly() {
        let pair = PingPong::new(0u8, 1u8);
        let mut parity = FrameParity::new();
        let mut previous_write = None;

        for k in 1..=100u64 {
            assert_eq!(parity.advance(), k);
            let (read, write) = pair.targets(parity);
            assert_ne!(read, write, "read and write alias at step {k}");
            if let Some(prev) = previous_write {
                assert_eq!(*read, prev, "step {k} must read what step {} wrote", k - 1);
                assert_ne!(*write, prev);
            }
            previous_write = Some(*write);
        }
    }

    #[test]
    fn test_current_is_last_written() {
        let pair = PingPong::from_fn(|slot| slot);
        let mut parity = FrameParity::new();
        parity.advance();
        assert_eq!(*pair.current(parity), Slot::B);
        parity.advance();
        assert_eq!(*pair.current(parity), Slot::A);
    }

    #[test]
    fn test_map_preserves_slots() {
        let pair = PingPong::new(2, 3);
        let squared = pair.map(|_, v| v * v);
        assert_eq!(squared.into_inner(), (4, 9));
    }
}
