/*!
 * Tense Device
 *
 * Subsystem backed by the debugfs file exported by the tense kernel module.
 *
 * The file is the whole userspace interface:
 * - open joins the experiment, close leaves it
 * - write sets the caller's time dilation as two native-endian u32
 * - read fills a timespec with the current virtual time and returns 0
 * - lseek moves along the virtual timeline and returns the virtual time:
 *   SEEK_CUR advances, SEEK_DATA predicts the next I/O, SEEK_HOLE sleeps
 */

use super::health::{HealthStatus, Probe};
use super::Subsystem;
use crate::core::config::DeviceConfig;
use crate::core::errors::{DeviceError, DeviceResult};
use crate::core::guard::FdGuard;
use crate::core::limits::{DILATION_WIRE_LEN, NANOS_PER_SECOND, TIMESPEC_WIRE_LEN};
use crate::core::types::TimeDilation;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc::off_t;
use nix::sys::stat::Mode;
use nix::unistd::Whence;
use std::os::fd::{FromRawFd, OwnedFd};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The tense virtual-time device
#[derive(Debug, Clone, Default)]
pub struct TenseDevice {
    config: DeviceConfig,
}

impl TenseDevice {
    pub fn new(config: DeviceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn open(&self) -> DeviceResult<TenseHandle> {
        let path = self.config.path.as_path();
        let display = path.display().to_string();

        let raw = nix::fcntl::open(path, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())
            .map_err(|errno| DeviceError::Open {
                path: display.clone(),
                errno,
            })?;

        // SAFETY: open just returned this descriptor and nothing else owns it
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        Ok(TenseHandle {
            fd: FdGuard::new(fd, Some(display)),
            dilation: TimeDilation::IDENTITY,
            last_time: None,
        })
    }
}

impl Subsystem for TenseDevice {
    type Handle = TenseHandle;
    type Error = DeviceError;

    fn name(&self) -> &'static str {
        "tense"
    }

    fn acquire(&self) -> DeviceResult<TenseHandle> {
        let mut handle = self.open()?;

        if let Err(e) = handle.set_dilation(self.config.dilation) {
            if let Err(close_err) = handle.close() {
                warn!(error = %close_err, "close after failed dilation write also failed");
            }
            return Err(e);
        }

        info!(
            path = %self.config.path.display(),
            dilation = %self.config.dilation,
            "joined tense experiment"
        );
        Ok(handle)
    }

    fn probe(&self, handle: &mut TenseHandle) -> Probe {
        let previous = handle.last_time;

        match handle.now() {
            Ok(now) => match previous {
                Some(before) if now < before => Probe::with_status(HealthStatus::Degraded {
                    reason: format!(
                        "virtual time moved backwards from {}ns to {}ns",
                        before.as_nanos(),
                        now.as_nanos()
                    ),
                })
                .at(now),
                _ => Probe::healthy().at(now),
            },
            Err(e) => Probe::with_status(classify(&e)),
        }
    }

    fn release(&self, handle: TenseHandle) -> DeviceResult<()> {
        handle.close()?;
        info!(path = %self.config.path.display(), "left tense experiment");
        Ok(())
    }
}

fn classify(error: &DeviceError) -> HealthStatus {
    let reason = error.to_string();
    match error {
        DeviceError::Guard(_) => HealthStatus::Unreachable { reason },
        _ => match error.errno() {
            Some(Errno::ENODEV | Errno::ENOENT | Errno::EBADF | Errno::ENXIO) => {
                HealthStatus::Unreachable { reason }
            }
            _ => HealthStatus::Error { reason },
        },
    }
}

/// Open descriptor on the tense device
///
/// Only `TenseDevice::acquire` creates one and `TenseHandle::close` is the
/// explicit way to get rid of it. Dropping it closes the descriptor too.
#[derive(Debug)]
pub struct TenseHandle {
    fd: FdGuard,
    dilation: TimeDilation,
    last_time: Option<Duration>,
}

impl TenseHandle {
    /// Dilation most recently written to the device
    #[inline]
    pub fn dilation(&self) -> TimeDilation {
        self.dilation
    }

    /// Virtual time seen by the most recent successful read
    #[inline]
    pub fn last_time(&self) -> Option<Duration> {
        self.last_time
    }

    /// Write a new time dilation for the calling task
    pub fn set_dilation(&mut self, dilation: TimeDilation) -> DeviceResult<()> {
        let wire = dilation.to_wire();
        let written = nix::unistd::write(self.fd.borrow()?, &wire).map_err(|errno| {
            DeviceError::Io {
                operation: "write",
                errno,
            }
        })?;

        if written != DILATION_WIRE_LEN {
            return Err(DeviceError::Io {
                operation: "write",
                errno: Errno::EIO,
            });
        }

        debug!(%dilation, "time dilation set");
        self.dilation = dilation;
        Ok(())
    }

    /// Compound a percentage onto the current dilation
    pub fn scale_percent(&mut self, percent: u32) -> DeviceResult<TimeDilation> {
        let scaled = self.dilation.scaled(percent)?;
        self.set_dilation(scaled)?;
        Ok(scaled)
    }

    /// Return to real-time speed
    pub fn clear(&mut self) -> DeviceResult<()> {
        self.set_dilation(TimeDilation::IDENTITY)
    }

    /// Current virtual time
    pub fn now(&mut self) -> DeviceResult<Duration> {
        let mut buf = [0u8; TIMESPEC_WIRE_LEN];

        // The module fills the buffer and reports 0 bytes
        nix::unistd::read(self.fd.raw()?, &mut buf).map_err(|errno| DeviceError::Io {
            operation: "read",
            errno,
        })?;

        let now = parse_timespec(&buf)?;
        self.last_time = Some(now);
        Ok(now)
    }

    /// Current virtual time in whole milliseconds
    pub fn now_ms(&mut self) -> DeviceResult<u64> {
        let now = self.now()?;
        Ok(u64::try_from(now.as_millis()).unwrap_or(u64::MAX))
    }

    /// Log a named point on the virtual timeline
    pub fn time_point(&mut self, name: &str) -> DeviceResult<u64> {
        let ms = self.now_ms()?;
        info!(point = name, virtual_ms = ms, "tense time point");
        Ok(ms)
    }

    /// Advance this task along the virtual timeline
    ///
    /// Returns the virtual time after the move.
    pub fn advance(&mut self, delta: Duration) -> DeviceResult<Duration> {
        self.seek(delta, Whence::SeekCur, "advance")
    }

    /// Sleep for a span of virtual time
    pub fn sleep(&mut self, duration: Duration) -> DeviceResult<Duration> {
        self.seek(duration, Whence::SeekHole, "sleep")
    }

    /// Announce the expected duration of the next blocking I/O
    pub fn predict_io(&mut self, duration: Duration) -> DeviceResult<Duration> {
        self.seek(duration, Whence::SeekData, "predict_io")
    }

    /// Leave the experiment, surfacing a failed close
    pub fn close(self) -> DeviceResult<()> {
        self.fd.close().map_err(DeviceError::from)
    }

    fn seek(
        &mut self,
        duration: Duration,
        whence: Whence,
        operation: &'static str,
    ) -> DeviceResult<Duration> {
        let offset = duration_to_offset(duration)?;
        let now = nix::unistd::lseek(self.fd.raw()?, offset, whence)
            .map_err(|errno| DeviceError::Io { operation, errno })?;

        Ok(Duration::from_nanos(u64::try_from(now).unwrap_or(0)))
    }
}

fn duration_to_offset(duration: Duration) -> DeviceResult<off_t> {
    off_t::try_from(duration.as_nanos()).map_err(|_| DeviceError::DurationOverflow)
}

fn parse_timespec(buf: &[u8; TIMESPEC_WIRE_LEN]) -> DeviceResult<Duration> {
    let mut seconds = [0u8; 8];
    let mut nanos = [0u8; 8];
    seconds.copy_from_slice(&buf[..8]);
    nanos.copy_from_slice(&buf[8..]);

    let seconds = i64::from_ne_bytes(seconds);
    let nanos = i64::from_ne_bytes(nanos);

    if seconds < 0 || nanos < 0 || nanos as u64 >= NANOS_PER_SECOND {
        return Err(DeviceError::MalformedTime { seconds, nanos });
    }

    Ok(Duration::new(seconds as u64, nanos as u32))
}
