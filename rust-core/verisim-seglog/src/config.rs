// SPDX-License-Identifier: PMPL-1.0-or-later
//! Segment log configuration.
//!
//! The growth factors are tuning knobs for the write buffer, not part of the
//! on-disk format: changing them alters how often a buffer reallocates but
//! never the bytes it produces.

use serde::{Deserialize, Serialize};

use crate::error::SegLogResult;

/// Over-allocation factor applied to the requested extra bytes on the first
/// reallocation attempt.
pub const DEFAULT_PRIMARY_GROWTH_FACTOR: f64 = 1.5;

/// Over-allocation factor used when the primary attempt would not outgrow
/// the current physical array by more than the request.
pub const DEFAULT_FALLBACK_GROWTH_FACTOR: f64 = 1.25;

/// Segment type written by default.
pub const DEFAULT_SEGMENT_TYPE: u8 = 1;

/// Initial capacity used when framing a single record.
pub const DEFAULT_RECORD_CAPACITY_HINT: usize = 256;

/// Initial capacity used when encoding a segment header.
pub const DEFAULT_HEADER_CAPACITY_HINT: usize = 64;

/// Buffer growth policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthPolicy {
    /// Factor applied first: `new = position + extra * primary_factor`.
    pub primary_factor: f64,
    /// Factor applied when the primary result is too small:
    /// `new = physical + extra + 1 + extra * fallback_factor`.
    pub fallback_factor: f64,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            primary_factor: DEFAULT_PRIMARY_GROWTH_FACTOR,
            fallback_factor: DEFAULT_FALLBACK_GROWTH_FACTOR,
        }
    }
}

/// Configuration for producing segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Value of the header `type` byte for new segments.
    pub segment_type: u8,
    /// Initial capacity of the buffer used to frame one record.
    pub record_capacity_hint: usize,
    /// Initial capacity of the buffer holding a segment header.
    pub header_capacity_hint: usize,
    /// Growth policy for every buffer created from this configuration.
    pub growth: GrowthPolicy,
}

impl SegmentConfig {
    /// Parse a configuration from a JSON document. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> SegLogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            segment_type: DEFAULT_SEGMENT_TYPE,
            record_capacity_hint: DEFAULT_RECORD_CAPACITY_HINT,
            header_capacity_hint: DEFAULT_HEADER_CAPACITY_HINT,
            growth: GrowthPolicy::default(),
        }
    }
}
