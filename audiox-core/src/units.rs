// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common time units used across demuxers, muxers, and the conversion orchestrator.
//!
//! Unlike a tick-based container (one "tick" per the stream's internal time base), every
//! timestamp and duration in audiox is expressed directly in seconds. Containers here are never
//! decoded to samples within this crate, so there is no sample-accurate clock to round-trip
//! through; seconds are precise enough for seeking, trimming, and progress reporting.

/// A point in time since the start of a track, in seconds.
pub type Seconds = f64;

/// Converts a sample count at a given sample rate into seconds.
pub fn samples_to_seconds(samples: u64, sample_rate: u32) -> Seconds {
    if sample_rate == 0 {
        0.0
    } else {
        samples as f64 / f64::from(sample_rate)
    }
}

/// Converts seconds into a sample count at a given sample rate, rounding down.
pub fn seconds_to_samples(seconds: Seconds, sample_rate: u32) -> u64 {
    (seconds * f64::from(sample_rate)).floor().max(0.0) as u64
}
