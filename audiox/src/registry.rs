// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Name/extension/magic-byte resolution across the registered container formats.

use audiox_core::errors::{unsupported_format, Result};
use audiox_core::io::Reader;
use audiox_core::{AudioMetadata, AudioTrack, AudioTrackConfig, Demuxer, EncodedPacket, FormatInfo, Muxer, Seconds, Source, Target};

/// Object-safe view over an opened [`Demuxer`], so the registry can return one without knowing
/// its concrete type.
pub trait DemuxerHandle: Send {
    fn track(&self) -> &AudioTrack;
    fn metadata(&self) -> &AudioMetadata;
    fn next_packet(&mut self) -> Result<Option<EncodedPacket>>;
    fn seek(&mut self, time: Seconds) -> Result<()>;
    fn duration(&self) -> Option<Seconds>;
}

impl<T: Demuxer + Send> DemuxerHandle for T {
    fn track(&self) -> &AudioTrack {
        Demuxer::track(self)
    }
    fn metadata(&self) -> &AudioMetadata {
        Demuxer::metadata(self)
    }
    fn next_packet(&mut self) -> Result<Option<EncodedPacket>> {
        Demuxer::next_packet(self)
    }
    fn seek(&mut self, time: Seconds) -> Result<()> {
        Demuxer::seek(self, time)
    }
    fn duration(&self) -> Option<Seconds> {
        Demuxer::duration(self)
    }
}

/// Object-safe view over an opened [`Muxer`].
pub trait MuxerHandle: Send {
    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()>;
    fn set_metadata(&mut self, metadata: AudioMetadata) -> Result<()>;
    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()>;
    fn finalize(&mut self) -> Result<Vec<u8>>;
}

impl<T: Muxer + Send> MuxerHandle for T {
    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()> {
        Muxer::add_track(self, config)
    }
    fn set_metadata(&mut self, metadata: AudioMetadata) -> Result<()> {
        Muxer::set_metadata(self, metadata)
    }
    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()> {
        Muxer::write_packet(self, packet)
    }
    fn finalize(&mut self) -> Result<Vec<u8>> {
        Muxer::finalize(self)
    }
}

struct InputFormat {
    info: FormatInfo,
    open: fn(Source) -> Result<Box<dyn DemuxerHandle>>,
}

struct OutputFormat {
    info: FormatInfo,
    create: fn(Target) -> Result<Box<dyn MuxerHandle>>,
}

/// Name/extension/magic-byte resolution across every registered input and output format.
pub struct FormatRegistry {
    inputs: Vec<InputFormat>,
    outputs: Vec<OutputFormat>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FormatRegistry {
    /// Builds a registry with every format crate in this workspace registered, in the order
    /// probing should try them.
    pub fn with_defaults() -> Self {
        let mut registry = FormatRegistry { inputs: Vec::new(), outputs: Vec::new() };
        registry.register_wav();
        registry.register_mp3();
        registry.register_flac();
        registry.register_aac();
        registry.register_ogg();
        registry
    }

    fn register_wav(&mut self) {
        self.inputs.push(InputFormat {
            info: audiox_format_wav::FORMAT_INFO,
            open: |source| Ok(Box::new(audiox_format_wav::WavDemuxer::open(source)?)),
        });
        self.outputs.push(OutputFormat {
            info: audiox_format_wav::FORMAT_INFO,
            create: |target| Ok(Box::new(audiox_format_wav::AutoWavMuxer::create(target)?)),
        });
    }

    fn register_mp3(&mut self) {
        self.inputs.push(InputFormat {
            info: audiox_format_mp3::FORMAT_INFO,
            open: |source| Ok(Box::new(audiox_format_mp3::Mp3Demuxer::open(source)?)),
        });
        self.outputs.push(OutputFormat {
            info: audiox_format_mp3::FORMAT_INFO,
            create: |target| Ok(Box::new(audiox_format_mp3::Mp3Muxer::create(target)?)),
        });
    }

    fn register_flac(&mut self) {
        self.inputs.push(InputFormat {
            info: audiox_format_flac::FORMAT_INFO,
            open: |source| Ok(Box::new(audiox_format_flac::FlacDemuxer::open(source)?)),
        });
        self.outputs.push(OutputFormat {
            info: audiox_format_flac::FORMAT_INFO,
            create: |target| Ok(Box::new(audiox_format_flac::FlacMuxer::create(target)?)),
        });
    }

    fn register_aac(&mut self) {
        self.inputs.push(InputFormat {
            info: audiox_format_aac::FORMAT_INFO,
            open: |source| Ok(Box::new(audiox_format_aac::AacDemuxer::open(source)?)),
        });
        self.outputs.push(OutputFormat {
            info: audiox_format_aac::FORMAT_INFO,
            create: |target| Ok(Box::new(audiox_format_aac::AacMuxer::create(target)?)),
        });
    }

    fn register_ogg(&mut self) {
        self.inputs.push(InputFormat {
            info: audiox_format_ogg::FORMAT_INFO,
            open: |source| Ok(Box::new(audiox_format_ogg::OggDemuxer::open(source)?)),
        });
        self.outputs.push(OutputFormat {
            info: audiox_format_ogg::FORMAT_INFO,
            create: |target| Ok(Box::new(audiox_format_ogg::OggMuxer::create(target)?)),
        });
    }

    /// Short names of every registered input format, in probing order.
    pub fn input_names(&self) -> Vec<&'static str> {
        self.inputs.iter().map(|f| f.info.short_name).collect()
    }

    /// Short names of every registered output format.
    pub fn output_names(&self) -> Vec<&'static str> {
        self.outputs.iter().map(|f| f.info.short_name).collect()
    }

    fn input_by_name(&self, name: &str) -> Option<&InputFormat> {
        self.inputs.iter().find(|f| f.info.short_name == name)
    }

    fn output_by_name(&self, name: &str) -> Option<&OutputFormat> {
        self.outputs.iter().find(|f| f.info.short_name == name)
    }

    /// Resolves an input format by file extension (without the leading dot, case-insensitive).
    pub fn input_by_extension(&self, extension: &str) -> Option<&'static str> {
        let extension = extension.to_ascii_lowercase();
        self.inputs
            .iter()
            .find(|f| f.info.extensions.iter().any(|e| *e == extension))
            .map(|f| f.info.short_name)
    }

    /// Probes `source` against every registered input format's magic bytes, in registration
    /// order, returning the first match's short name. Peeks at most 16 bytes; never consumes the
    /// source's cursor (each probe opens its own `Reader`).
    pub fn detect(&self, source: &Source) -> Result<Option<&'static str>> {
        for format in &self.inputs {
            if can_read(source, &format.info)? {
                return Ok(Some(format.info.short_name));
            }
        }
        Ok(None)
    }

    /// Opens a demuxer for the named input format.
    pub fn open(&self, name: &str, source: Source) -> Result<Box<dyn DemuxerHandle>> {
        match self.input_by_name(name) {
            Some(format) => (format.open)(source),
            None => unsupported_format("unknown input format"),
        }
    }

    /// Opens a demuxer by probing `source`'s magic bytes first.
    pub fn open_detected(&self, source: Source) -> Result<Box<dyn DemuxerHandle>> {
        let name = self.detect(&source)?.ok_or(audiox_core::errors::Error::UnsupportedFormat("could not detect container format"))?;
        self.open(name, source)
    }

    /// Creates a muxer for the named output format.
    pub fn create(&self, name: &str, target: Target) -> Result<Box<dyn MuxerHandle>> {
        match self.output_by_name(name) {
            Some(format) => (format.create)(target),
            None => unsupported_format("unknown output format"),
        }
    }
}

fn can_read(source: &Source, info: &FormatInfo) -> Result<bool> {
    let max_len = info.markers.iter().map(|m| m.len()).max().unwrap_or(0).min(16);
    if max_len == 0 {
        return Ok(false);
    }
    let mut reader = Reader::open(source.clone());
    match reader.peek(max_len)? {
        Some(bytes) => Ok(info.markers.iter().any(|m| bytes.starts_with(m))),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_wav_by_magic() {
        let registry = FormatRegistry::with_defaults();
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&[0u8; 40]);
        bytes[8..12].copy_from_slice(b"WAVE");
        let detected = registry.detect(&Source::Buffer(bytes.into())).unwrap();
        assert_eq!(detected, Some("wav"));
    }

    #[test]
    fn detects_mp3_by_magic() {
        let registry = FormatRegistry::with_defaults();
        let mut bytes = b"ID3".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let detected = registry.detect(&Source::Buffer(bytes.into())).unwrap();
        assert_eq!(detected, Some("mp3"));
    }

    #[test]
    fn detects_flac_by_magic() {
        let registry = FormatRegistry::with_defaults();
        let mut bytes = b"fLaC".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let detected = registry.detect(&Source::Buffer(bytes.into())).unwrap();
        assert_eq!(detected, Some("flac"));
    }

    #[test]
    fn detects_aac_by_magic() {
        let registry = FormatRegistry::with_defaults();
        let mut bytes = vec![0xFFu8, 0xF9];
        bytes.extend_from_slice(&[0u8; 32]);
        let detected = registry.detect(&Source::Buffer(bytes.into())).unwrap();
        assert_eq!(detected, Some("aac"));
    }

    #[test]
    fn detects_ogg_by_magic() {
        let registry = FormatRegistry::with_defaults();
        let mut bytes = b"OggS".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let detected = registry.detect(&Source::Buffer(bytes.into())).unwrap();
        assert_eq!(detected, Some("ogg"));
    }

    #[test]
    fn empty_source_detects_nothing() {
        let registry = FormatRegistry::with_defaults();
        let detected = registry.detect(&Source::Buffer(Vec::new().into())).unwrap();
        assert_eq!(detected, None);
    }

    #[test]
    fn resolves_extension_case_insensitively() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.input_by_extension("WAV"), Some("wav"));
        assert_eq!(registry.input_by_extension("mp3"), Some("mp3"));
        assert_eq!(registry.input_by_extension("FLAC"), Some("flac"));
        assert_eq!(registry.input_by_extension("AAC"), Some("aac"));
        assert_eq!(registry.input_by_extension("Ogg"), Some("ogg"));
        assert_eq!(registry.input_by_extension("opus"), Some("ogg"));
        assert_eq!(registry.input_by_extension("xyz"), None);
    }
}
