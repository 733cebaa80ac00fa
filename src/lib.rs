//! Host-side gateboard support.
//!
//! Connects [`gateboard_core`]'s board link to `std::io` transports:
//!
//! - [`SerialSource`] - decode frames from any `Read` (serial port, socket, replay file)
//! - [`SerialSink`] - write frames to any `Write`
//! - [`Monitor`] - run the link and log what the board reports
//!
//! # Example
//!
//! ```no_run
//! use gateboard::{Monitor, MonitorConfig, SerialSink, SerialSource, DEFAULT_BAUD_RATE};
//! use std::fs::OpenOptions;
//! use std::process::Command;
//!
//! let path = "/dev/ttyUSB0";
//! Command::new("stty")
//!     .args(["-F", path, DEFAULT_BAUD_RATE.to_string().as_str(), "raw", "-echo"])
//!     .status()?;
//! let port = OpenOptions::new().read(true).write(true).open(path)?;
//! let config = MonitorConfig { show_messages: true, ..MonitorConfig::default() };
//! let mut monitor = Monitor::with_config(
//!     SerialSource::new(port.try_clone()?),
//!     SerialSink::new(port),
//!     config,
//! );
//! # let _ = &mut monitor;
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod input;
pub mod monitor;
pub mod output;

pub use input::SerialSource;
pub use monitor::{Monitor, MonitorConfig};
pub use output::SerialSink;

/// Line rate the board firmware runs its serial port at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Name given to a board when none is configured.
pub const DEFAULT_BOARD_NAME: &str = "gateboard";

// Helper to run a future to completion (simple blocking executor)
#[cfg(test)]
pub(crate) fn block_on<F: core::future::Future>(mut f: F) -> F::Output {
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);

    // SAFETY: We don't move f after pinning
    let mut f = unsafe { Pin::new_unchecked(&mut f) };

    match f.as_mut().poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("future returned Pending unexpectedly"),
    }
}
