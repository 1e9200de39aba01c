use std::{ffi::CStr, ptr::NonNull, slice};

use pmem::{AllocError, AllocOptions, AllocResult, Allocator, Exactness, Global, Heap, HeapConfiguration, Layout};
use pmem::{Locked, PowerOf2, ReturnAddress, Tracking, TypedAllocator, Volatile};

#[test]
fn allocate_layout() {
    let global = Global::new();
    let layout = Layout::from_size_align(16, 8);

    let block = global.allocate(layout).expect("Allocated");

    assert!(block.len() >= 16);
    assert_eq!(0, block.cast::<u8>().as_ptr() as usize % 8);

    unsafe { global.deallocate(block.cast(), layout) };
}

#[test]
fn allocate_c_string() {
    let global = Global::new();
    let hello = b"Hello, World!";

    let block = global.allocate_sentinel(hello.len(), 0u8).expect("Allocated");

    unsafe { block.as_ptr().copy_from_nonoverlapping(hello.as_ptr(), hello.len()) };

    let c_str = unsafe { CStr::from_ptr(block.as_ptr() as *const _) };

    assert_eq!(&hello[..], c_str.to_bytes());
    assert_eq!(hello.len() + 1, block.with_sentinel().len());

    unsafe { global.free_terminated(block) };
}

#[test]
fn allocate_over_aligned_array() {
    let global = Global::new();
    let options = AllocOptions::<f64>::new().try_aligned(4096).expect("Valid alignment");

    let block = global.allocate_with_options(100, options).expect("Allocated");

    assert_eq!(100, block.len());
    assert!(PowerOf2::new(4096).unwrap().is_aligned(block.as_non_null_ptr()));

    unsafe { global.free(block) };

    assert_eq!(Err(AllocError::InvalidAlignment), AllocOptions::<f64>::new().try_aligned(3).map(|_| ()));
    assert_eq!(Err(AllocError::InvalidAlignment), AllocOptions::<f64>::new().try_aligned(4).map(|_| ()));
}

#[test]
fn heap_in_global_region() {
    let global = Global::new();
    let layout = Layout::from_size_align(1 << 16, 4096);

    let region = global.allocate(layout).expect("Allocated");

    {
        let region = unsafe { slice::from_raw_parts_mut(region.cast::<u8>().as_ptr(), region.len()) };
        let heap = Locked::new(Heap::<HeapConfiguration>::new(region).expect("Valid region"));

        //  The heap rounds 100 bytes up to 128, which `AtLeast` reports.
        let block = heap.advanced_with_ret_addr::<u8>(Exactness::AtLeast, ReturnAddress::caller(), PowerOf2::ONE, 100)
            .expect("Allocated");

        assert_eq!(128, block.len());

        unsafe { heap.free_array(block) };

        assert_eq!(1 << 16, heap.lock().available());
    }

    unsafe { global.deallocate(region.cast(), layout) };
}

#[test]
fn tracking_detects_leaks() {
    fn leaky(allocator: &Tracking<Global>) -> AllocResult<NonNull<[u32]>> {
        let _scoped = allocator.scoped_array::<u64>(16)?;

        allocator.allocate_array::<u32>(4)
    }

    let tracking = Tracking::new(Global::new());

    let leaked = leaky(&tracking).expect("Allocated");

    assert_eq!((2, 1, 16), (tracking.allocations(), tracking.live_blocks(), tracking.live_bytes()));

    unsafe { tracking.free_array(leaked) };

    assert_eq!(0, tracking.live_blocks());
}

#[test]
fn volatile_allocated_registers() {
    let global = Global::new();

    let block = global.allocate_array::<u32>(4).expect("Allocated");

    unsafe { block.cast::<u32>().as_ptr().write_bytes(0, block.len()) };

    let registers = unsafe { slice::from_raw_parts_mut(block.cast::<u32>().as_ptr(), block.len()) };

    {
        let mut registers = Volatile::new(&mut registers[..]);

        registers.copy_from_slice(&[1, 2, 3, 4]);
        registers.at_mut(0).write(0xDEAD_BEEF);
        registers.at_mut(3).update(|value| *value += 1);

        assert_eq!(0xDEAD_BEEF, registers.at(0).read());
    }

    assert_eq!([0xDEAD_BEEF, 2, 3, 5], *registers);

    unsafe { global.free_array(block) };
}
