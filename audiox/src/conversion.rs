// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The conversion orchestrator: couples one demuxer's packet stream to one muxer, with optional
//! time-range gating and per-field track overrides.

use log::info;

use audiox_core::errors::{muxer_state_error, Result};
use audiox_core::{AudioTrackConfig, Seconds};

use crate::registry::{DemuxerHandle, MuxerHandle};

/// Per-field overrides applied to the output track; `None` copies the input track's value.
#[derive(Clone, Debug, Default)]
pub struct ConversionOptions {
    pub start_time: Option<Seconds>,
    pub end_time: Option<Seconds>,
    pub audio_codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bit_depth: Option<u16>,
    pub bitrate: Option<u32>,
}

/// A snapshot of progress, reported once per packet and once more after `finalize`.
#[derive(Clone, Copy, Debug)]
pub struct ProgressUpdate {
    pub percentage: f64,
    pub current_time: Seconds,
    pub total_time: Option<Seconds>,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub speed: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Init,
    Running,
    Finalized,
}

/// Couples one opened demuxer to one opened muxer. Owns neither beyond its own execution: both
/// are moved in and the muxer's `finalize` output is handed back to the caller.
pub struct Conversion {
    demuxer: Box<dyn DemuxerHandle>,
    muxer: Box<dyn MuxerHandle>,
    options: ConversionOptions,
    state: State,
    start_time: Seconds,
    end_time: Option<Seconds>,
    effective_duration: Option<Seconds>,
    input_bytes: u64,
    output_bytes: u64,
}

impl Conversion {
    pub fn new(demuxer: Box<dyn DemuxerHandle>, muxer: Box<dyn MuxerHandle>, options: ConversionOptions) -> Self {
        Conversion {
            demuxer,
            muxer,
            options,
            state: State::Init,
            start_time: 0.0,
            end_time: None,
            effective_duration: None,
            input_bytes: 0,
            output_bytes: 0,
        }
    }

    /// Picks the primary track, computes the effective output duration, adds the output track
    /// (input values with per-field overrides applied), copies metadata, and seeks the input if
    /// `start_time` was requested.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != State::Init {
            return muxer_state_error("initialize called more than once");
        }

        let mut config = AudioTrackConfig::from_track(self.demuxer.track());
        if let Some(codec) = &self.options.audio_codec {
            config.codec = codec.clone();
        }
        if let Some(sample_rate) = self.options.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(channels) = self.options.channels {
            config.channels = channels;
        }
        if let Some(bit_depth) = self.options.bit_depth {
            config.bit_depth = Some(bit_depth);
        }
        if let Some(bitrate) = self.options.bitrate {
            config.bitrate = Some(bitrate);
        }

        self.muxer.add_track(config)?;
        self.muxer.set_metadata(self.demuxer.metadata().clone())?;

        self.start_time = self.options.start_time.unwrap_or(0.0);
        self.end_time = self.options.end_time;

        let source_duration = self.demuxer.duration();
        self.effective_duration = match (source_duration, self.end_time) {
            (Some(duration), Some(end)) => Some(end.min(duration) - self.start_time),
            (Some(duration), None) => Some(duration - self.start_time),
            (None, Some(end)) => Some(end - self.start_time),
            (None, None) => None,
        };

        if self.start_time > 0.0 {
            self.demuxer.seek(self.start_time)?;
        }

        self.state = State::Running;
        Ok(())
    }

    /// Drains the demuxer's packet stream into the muxer, calling `on_progress` after each
    /// forwarded packet and once more after `finalize`. Returns the muxer's assembled output.
    pub fn execute(&mut self, mut on_progress: impl FnMut(ProgressUpdate)) -> Result<Vec<u8>> {
        if self.state != State::Running {
            return muxer_state_error("execute called before initialize or after finalize");
        }

        while let Some(packet) = self.demuxer.next_packet()? {
            if let Some(end) = self.end_time {
                if packet.timestamp > end {
                    break;
                }
            }
            if packet.timestamp < self.start_time {
                continue;
            }

            self.input_bytes += packet.data.len() as u64;
            let current_time = packet.timestamp - self.start_time;
            self.output_bytes += packet.data.len() as u64;
            self.muxer.write_packet(packet)?;

            on_progress(ProgressUpdate {
                percentage: self.percentage(current_time),
                current_time,
                total_time: self.effective_duration,
                input_bytes: self.input_bytes,
                output_bytes: self.output_bytes,
                speed: 0.0,
            });
        }

        let bytes = self.muxer.finalize()?;
        self.state = State::Finalized;
        self.output_bytes = bytes.len() as u64;

        let current_time = self.effective_duration.unwrap_or(0.0);
        info!("conversion finalized: {} bytes in, {} bytes out", self.input_bytes, self.output_bytes);
        on_progress(ProgressUpdate {
            percentage: 100.0,
            current_time,
            total_time: self.effective_duration,
            input_bytes: self.input_bytes,
            output_bytes: self.output_bytes,
            speed: 0.0,
        });

        Ok(bytes)
    }

    fn percentage(&self, current_time: Seconds) -> f64 {
        match self.effective_duration {
            Some(total) if total > 0.0 => (current_time / total * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiox_core::{Demuxer, Muxer, Source, Target};
    use audiox_format_flac::FlacMuxer;
    use audiox_format_wav::{AutoWavMuxer, WavDemuxer};
    use once_cell::sync::Lazy;

    fn one_second_pcm_wav(sample_rate: u32) -> Vec<u8> {
        let mut muxer = AutoWavMuxer::create(Target::Buffer).unwrap();
        let mut config = audiox_core::AudioTrackConfig::new("pcm", sample_rate, 1);
        config.bit_depth = Some(16);
        Muxer::add_track(&mut muxer, config).unwrap();
        Muxer::write_packet(&mut muxer, audiox_core::EncodedPacket::new(1, vec![0u8; (sample_rate as usize) * 2], 0.0)).unwrap();
        Muxer::finalize(&mut muxer).unwrap()
    }

    /// The 8 kHz one-second WAV every test below feeds into a fresh demuxer: muxed once per test
    /// binary rather than once per test function.
    static ONE_SECOND_WAV_8K: Lazy<Vec<u8>> = Lazy::new(|| one_second_pcm_wav(8000));

    #[test]
    fn full_conversion_reports_completion() {
        let wav_bytes = ONE_SECOND_WAV_8K.clone();
        let demuxer: Box<dyn DemuxerHandle> = Box::new(WavDemuxer::open(Source::Buffer(wav_bytes.into())).unwrap());
        let muxer: Box<dyn MuxerHandle> = Box::new(FlacMuxer::create(Target::Buffer).unwrap());

        let mut conversion = Conversion::new(demuxer, muxer, ConversionOptions::default());
        conversion.initialize().unwrap();

        let mut last_percentage = 0.0;
        let bytes = conversion
            .execute(|update| {
                last_percentage = update.percentage;
            })
            .unwrap();

        assert_eq!(last_percentage, 100.0);
        assert!(!bytes.is_empty());
    }

    #[test]
    fn execute_before_initialize_is_rejected() {
        let wav_bytes = ONE_SECOND_WAV_8K.clone();
        let demuxer: Box<dyn DemuxerHandle> = Box::new(WavDemuxer::open(Source::Buffer(wav_bytes.into())).unwrap());
        let muxer: Box<dyn MuxerHandle> = Box::new(FlacMuxer::create(Target::Buffer).unwrap());
        let mut conversion = Conversion::new(demuxer, muxer, ConversionOptions::default());
        assert!(matches!(conversion.execute(|_| {}), Err(audiox_core::errors::Error::MuxerStateError(_))));
    }

    #[test]
    fn double_initialize_is_rejected() {
        let wav_bytes = ONE_SECOND_WAV_8K.clone();
        let demuxer: Box<dyn DemuxerHandle> = Box::new(WavDemuxer::open(Source::Buffer(wav_bytes.into())).unwrap());
        let muxer: Box<dyn MuxerHandle> = Box::new(FlacMuxer::create(Target::Buffer).unwrap());
        let mut conversion = Conversion::new(demuxer, muxer, ConversionOptions::default());
        conversion.initialize().unwrap();
        assert!(matches!(conversion.initialize(), Err(audiox_core::errors::Error::MuxerStateError(_))));
    }

    #[test]
    fn start_time_gates_output_track_count() {
        let wav_bytes = ONE_SECOND_WAV_8K.clone();
        let demuxer: Box<dyn DemuxerHandle> = Box::new(WavDemuxer::open(Source::Buffer(wav_bytes.into())).unwrap());
        let muxer: Box<dyn MuxerHandle> = Box::new(FlacMuxer::create(Target::Buffer).unwrap());

        let options = ConversionOptions { start_time: Some(0.5), ..Default::default() };
        let mut conversion = Conversion::new(demuxer, muxer, options);
        conversion.initialize().unwrap();
        assert_eq!(conversion.effective_duration, Some(0.5));
    }
}
