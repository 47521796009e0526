/*!
 * Core Types
 * Value types shared by the device and configuration layers
 */

use crate::core::errors::DeviceError;
use crate::core::limits::{DILATION_WIRE_LEN, PERCENT_BASE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time-dilation factor applied to a task in the experiment
///
/// Virtual time advances at `faster / slower` of real time. The kernel has no
/// floating point, so the ratio travels as two integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDilation")]
pub struct TimeDilation {
    faster: u32,
    slower: u32,
}

/// Unchecked wire shape; deserialization goes through `TimeDilation::new`
#[derive(Deserialize)]
struct RawDilation {
    faster: u32,
    slower: u32,
}

impl TryFrom<RawDilation> for TimeDilation {
    type Error = DeviceError;

    fn try_from(raw: RawDilation) -> Result<Self, Self::Error> {
        Self::new(raw.faster, raw.slower)
    }
}

impl TimeDilation {
    /// Real-time speed
    pub const IDENTITY: Self = Self {
        faster: 1,
        slower: 1,
    };

    /// Create a dilation, rejecting zero on either side
    pub fn new(faster: u32, slower: u32) -> Result<Self, DeviceError> {
        if faster == 0 || slower == 0 {
            return Err(DeviceError::InvalidDilation { faster, slower });
        }
        Ok(Self { faster, slower })
    }

    #[inline]
    pub fn faster(&self) -> u32 {
        self.faster
    }

    #[inline]
    pub fn slower(&self) -> u32 {
        self.slower
    }

    #[inline]
    pub fn ratio(&self) -> f64 {
        f64::from(self.faster) / f64::from(self.slower)
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.faster == self.slower
    }

    /// Compound a percentage onto the current factor
    ///
    /// Scaling is cumulative: `faster *= percent`, `slower *= 100`. The pair
    /// is reduced by its gcd so repeated scaling stays within u32 as long as
    /// the ratio itself is representable.
    pub fn scaled(&self, percent: u32) -> Result<Self, DeviceError> {
        let overflow = DeviceError::InvalidDilation {
            faster: self.faster.saturating_mul(percent),
            slower: self.slower.saturating_mul(PERCENT_BASE),
        };

        if percent == 0 {
            return Err(overflow);
        }

        let faster = u64::from(self.faster) * u64::from(percent);
        let slower = u64::from(self.slower) * u64::from(PERCENT_BASE);
        let divisor = gcd(faster, slower);

        let faster = u32::try_from(faster / divisor).map_err(|_| overflow.clone())?;
        let slower = u32::try_from(slower / divisor).map_err(|_| overflow)?;
        Self::new(faster, slower)
    }

    /// Encode for a write to the device
    pub fn to_wire(&self) -> [u8; DILATION_WIRE_LEN] {
        let mut buf = [0u8; DILATION_WIRE_LEN];
        buf[..4].copy_from_slice(&self.faster.to_ne_bytes());
        buf[4..].copy_from_slice(&self.slower.to_ne_bytes());
        buf
    }
}

impl Default for TimeDilation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for TimeDilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.faster, self.slower)
    }
}

impl FromStr for TimeDilation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (faster, slower) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("expected FASTER/SLOWER, got '{}'", s))?;

        let faster: u32 = faster
            .trim()
            .parse()
            .map_err(|e| format!("bad faster component '{}': {}", faster, e))?;
        let slower: u32 = slower
            .trim()
            .parse()
            .map_err(|e| format!("bad slower component '{}': {}", slower, e))?;

        Self::new(faster, slower).map_err(|e| e.to_string())
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
