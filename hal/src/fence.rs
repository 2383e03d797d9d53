//! Memory barriers for MMIO ordering.

use core::sync::atomic::{compiler_fence, Ordering};

/// Compiler fence (prevents reordering)
#[inline(always)]
pub fn compiler() {
    compiler_fence(Ordering::SeqCst);
}

/// Make prior writes to device memory visible before a following
/// doorbell or counter write
#[inline(always)]
pub fn mmio_write_barrier() {
    #[cfg(target_arch = "x86_64")]
    {
        compiler();
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: This is a memory barrier instruction
        unsafe {
            core::arch::asm!("dmb st", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        core::sync::atomic::fence(Ordering::Release);
    }
}

/// Order a counter read before following reads of device memory
#[inline(always)]
pub fn mmio_read_barrier() {
    #[cfg(target_arch = "x86_64")]
    {
        compiler();
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: This is a memory barrier instruction
        unsafe {
            core::arch::asm!("dmb ld", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        core::sync::atomic::fence(Ordering::Acquire);
    }
}
