//! # Memory Layout

/// Size of a physical page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Where the kernel image is loaded; RAM below this is not ours.
pub const KERNBASE: u64 = 0x8000_0000;

/// Amount of RAM the kernel manages above [`KERNBASE`].
pub const PHYS_MEMORY_SIZE: u64 = 128 * 1024 * 1024;

/// First address past the RAM the kernel uses.
pub const PHYSTOP: u64 = KERNBASE + PHYS_MEMORY_SIZE;

/// Fill pattern written over a page when it is handed out.
///
/// Surfaces reads of uninitialized memory.
pub const ALLOC_JUNK: u8 = 5;

/// Fill pattern written over a page when it is returned to the pool.
///
/// Surfaces use-after-free through dangling references.
pub const FREE_JUNK: u8 = 1;

/// Rounds `addr` up to the next page boundary.
#[inline]
#[must_use]
pub const fn page_round_up(addr: u64) -> u64 {
    (addr + (PAGE_SIZE as u64 - 1)) & !(PAGE_SIZE as u64 - 1)
}

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(KERNBASE.is_multiple_of(PAGE_SIZE as u64));
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE as u64));
    assert!(ALLOC_JUNK != FREE_JUNK);
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(page_round_up(0), 0);
        assert_eq!(page_round_up(1), 4096);
        assert_eq!(page_round_up(4096), 4096);
        assert_eq!(page_round_up(0x8000_0123), 0x8000_1000);
    }
}
