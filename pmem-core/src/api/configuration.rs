//! The configuration of a backend.
//!
//! A backend carving blocks out of a region is constrained by the region itself: it cannot align a block more strictly
//! than the region is aligned, and it cannot hand out blocks smaller than its own bookkeeping requires.
//!
//! The Configuration instance allows adjusting those limits to the platform, at compile time.

use super::{AllocError, AllocResult, Layout, PowerOf2};

/// Configuration
///
/// The limits of a backend.
pub trait Configuration {
    /// The maximum alignment a block can be requested with.
    ///
    /// The region handed to the backend must be aligned on at least this value.
    const MAX_ALIGNMENT: PowerOf2;

    /// The size of the smallest block handed out.
    ///
    /// Requests for fewer bytes are rounded up to this size.
    const MIN_BLOCK_SIZE: PowerOf2;
}

/// Properties
///
/// Properties of a given Configuration.
///
/// Work-around for the inability to implement static methods directly on a trait.
pub struct Properties<C>(C);

impl<C> Properties<C>
    where
        C: Configuration
{
    /// Checks that the alignment of `layout` can be honoured.
    pub fn check_alignment(layout: Layout) -> AllocResult<()> {
        if layout.alignment() > C::MAX_ALIGNMENT {
            return Err(AllocError::InvalidAlignment);
        }

        Ok(())
    }

    /// Returns the size of the block serving `layout`: a power of 2, at least `C::MIN_BLOCK_SIZE`, and a multiple of
    /// `layout.align()`.
    ///
    /// Returns `InvalidAlignment` if the alignment cannot be honoured, and `Overflow` if no power of 2 fits.
    pub fn block_size(layout: Layout) -> AllocResult<PowerOf2> {
        Self::check_alignment(layout)?;

        let size = layout.size().max(layout.align()).max(C::MIN_BLOCK_SIZE.value());
        let size = size.checked_next_power_of_two()
            .filter(|size| *size <= isize::MAX as usize)
            .ok_or(AllocError::Overflow)?;

        PowerOf2::new(size).ok_or(AllocError::Overflow)
    }
}

#[cfg(test)]
mod tests {

use super::*;

struct TestConfiguration;

impl Configuration for TestConfiguration {
    const MAX_ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(1 << 12) };
    const MIN_BLOCK_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(1 << 4) };
}

type TestProperties = Properties<TestConfiguration>;

#[test]
fn properties_check_alignment() {
    fn check(align: usize) -> AllocResult<()> {
        TestProperties::check_alignment(Layout::from_size_align(8, align))
    }

    assert_eq!(Ok(()), check(1));
    assert_eq!(Ok(()), check(64));
    assert_eq!(Ok(()), check(4096));
    assert_eq!(Err(AllocError::InvalidAlignment), check(8192));
}

#[test]
fn properties_block_size() {
    fn block_size(size: usize, align: usize) -> AllocResult<usize> {
        TestProperties::block_size(Layout::from_size_align(size, align)).map(|size| size.value())
    }

    assert_eq!(Ok(16), block_size(0, 1));
    assert_eq!(Ok(16), block_size(1, 1));
    assert_eq!(Ok(16), block_size(16, 8));
    assert_eq!(Ok(32), block_size(17, 8));
    assert_eq!(Ok(64), block_size(8, 64));
    assert_eq!(Ok(4096), block_size(3000, 4));
    assert_eq!(Ok(1 << 20), block_size((1 << 20) - 1, 2));

    assert_eq!(Err(AllocError::InvalidAlignment), block_size(8, 1 << 13));
    assert_eq!(Err(AllocError::Overflow), block_size(isize::MAX as usize, 1));
}

}
