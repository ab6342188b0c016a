use std::collections::HashSet;

/// Never handed out; marks the end of the identifier space.
pub const TERMINAL_ID: u16 = u16::MAX;

/// Sentinel for "no id assigned", never allocated.
pub const UNSET_ID: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    Duplicate(u16),
    Exhausted,
}

/// Hands out unique record identifiers for one compilation run.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counter: u16,
    used:    HashSet<u16>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an explicitly declared id. Any value is honored, including
    /// the terminal one that allocation never reaches.
    pub fn reserve(&mut self, id: u16) -> Result<(), AllocError> {
        if !self.used.insert(id) {
            return Err(AllocError::Duplicate(id));
        }
        Ok(())
    }

    /// Returns the next free id, skipping everything reserved or allocated so far.
    pub fn allocate_next(&mut self) -> Result<u16, AllocError> {
        while self.counter < TERMINAL_ID - 1 {
            self.counter += 1;
            if self.used.insert(self.counter) {
                return Ok(self.counter);
            }
        }
        Err(AllocError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_starts_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate_next(), Ok(1));
        assert_eq!(ids.allocate_next(), Ok(2));
    }

    #[test]
    fn test_allocation_skips_reserved() {
        let mut ids = IdAllocator::new();
        ids.reserve(1).unwrap();
        ids.reserve(3).unwrap();
        assert_eq!(ids.allocate_next(), Ok(2));
        assert_eq!(ids.allocate_next(), Ok(4));
    }

    #[test]
    fn test_reserve_rejects_duplicates_and_allocated() {
        let mut ids = IdAllocator::new();
        ids.reserve(5).unwrap();
        assert_eq!(ids.reserve(5), Err(AllocError::Duplicate(5)));

        let allocated = ids.allocate_next().unwrap();
        assert_eq!(ids.reserve(allocated), Err(AllocError::Duplicate(allocated)));
    }

    #[test]
    fn test_reserve_accepts_terminal_id() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.reserve(TERMINAL_ID), Ok(()));
        assert_eq!(ids.reserve(TERMINAL_ID), Err(AllocError::Duplicate(TERMINAL_ID)));
        assert_eq!(ids.allocate_next(), Ok(1));
    }

    #[test]
    fn test_exhaustion_never_wraps() {
        let mut ids = IdAllocator::new();
        for id in 1..TERMINAL_ID {
            ids.reserve(id).unwrap();
        }
        assert_eq!(ids.allocate_next(), Err(AllocError::Exhausted));
        assert_eq!(ids.allocate_next(), Err(AllocError::Exhausted));
        assert!(!ids.used.contains(&UNSET_ID));
    }

    #[test]
    fn test_last_id_is_allocatable() {
        let mut ids = IdAllocator::new();
        for id in 1..TERMINAL_ID - 1 {
            ids.reserve(id).unwrap();
        }
        assert_eq!(ids.allocate_next(), Ok(TERMINAL_ID - 1));
        assert_eq!(ids.allocate_next(), Err(AllocError::Exhausted));
    }
}
