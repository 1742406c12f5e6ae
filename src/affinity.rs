//! Optional CPU pinning for the pipeline threads.
//!
//! Pinning the reader and sink to dedicated cores avoids migration jitter
//! when tailing a high-rate producer. It is a hint, not a requirement: the
//! pipeline logs a warning and continues unpinned when the request fails.
//!
//! # Platform Support
//!
//! - **Linux**: `pthread_setaffinity_np` on the calling thread.
//! - **Other**: returns `ErrorKind::Unsupported` (never silently succeeds).
//!
//! In containers the process may be confined to a subset of host CPUs, so a
//! core that exists on the host can still be rejected by the kernel.

use std::io;

/// Maximum core index the affinity API accepts.
///
/// Derived from the size of `cpu_set_t` on Linux (typically 1024). Indices
/// must stay below this to keep the `CPU_SET` macro in bounds.
#[cfg(target_os = "linux")]
pub const CPU_SET_CAPACITY: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(not(target_os = "linux"))]
pub const CPU_SET_CAPACITY: usize = 1024;

#[inline]
fn validate_core(core: usize) -> io::Result<()> {
    if core >= CPU_SET_CAPACITY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core index {core} exceeds CPU_SET_CAPACITY ({CPU_SET_CAPACITY})"),
        ));
    }
    Ok(())
}

/// Pins the current thread to a single CPU core.
///
/// # Errors
///
/// Fails when `core >= CPU_SET_CAPACITY`, when the core is outside the
/// process's allowed set (cgroups/cpuset), on permission errors, or on
/// platforms without per-thread affinity.
#[cfg(target_os = "linux")]
pub fn pin_current_thread_to_core(core: usize) -> io::Result<()> {
    // Bounds check keeps the CPU_SET macro from writing out of range.
    validate_core(core)?;

    // SAFETY:
    // - A zeroed cpu_set_t is valid.
    // - core < CPU_SET_CAPACITY, so CPU_SET stays in bounds.
    // - pthread_setaffinity_np reports errors via its return code, not errno.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);

        let rc = libc::pthread_setaffinity_np(
            libc::pthread_self(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &set as *const _,
        );

        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread_to_core(_core: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "CPU affinity is not supported on this platform",
    ))
}
