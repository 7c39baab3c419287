use std::collections::BTreeMap;

use crate::classifier::{ClassifiedFile, CodecKey};
use crate::config::MergeConfig;
use crate::converter::NATIVE_AAC_ENCODER;

use super::types::{ProcessingMode, TargetCodec};

/// Sample rates an AAC encoder accepts, ascending.
pub const AAC_SAMPLE_RATES: [u32; 12] = [
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200, 96000,
];

/// Smallest standard AAC rate at or above `rate`. Rates beyond the table
/// snap to its top entry.
pub fn snap_sample_rate(rate: u32) -> u32 {
    AAC_SAMPLE_RATES
        .iter()
        .copied()
        .find(|&standard| standard >= rate)
        .unwrap_or(AAC_SAMPLE_RATES[AAC_SAMPLE_RATES.len() - 1])
}

/// Bounds a source bit-rate into the configured transcode range.
pub fn clamp_bitrate(bit_rate: f64, config: &MergeConfig) -> u32 {
    let rounded = if bit_rate.is_finite() && bit_rate > 0.0 {
        bit_rate.round().min(u32::MAX as f64) as u32
    } else {
        0
    };
    rounded.clamp(config.min_bitrate, config.max_bitrate.max(config.min_bitrate))
}

/// Picks the processing mode and target codec for a non-empty file list.
pub fn decide(files: &[ClassifiedFile], config: &MergeConfig) -> (ProcessingMode, TargetCodec) {
    let mut groups: BTreeMap<CodecKey, f64> = BTreeMap::new();
    for file in files {
        let max_bit_rate = groups.entry(file.stream.codec_key()).or_insert(0.0);
        *max_bit_rate = max_bit_rate.max(file.stream.bit_rate);
    }

    if groups.len() > 1 {
        return mixed(&groups, config);
    }
    match groups.into_iter().next() {
        Some((key, bit_rate)) => single_group(key, bit_rate, config),
        None => mixed(&BTreeMap::new(), config),
    }
}

fn single_group(key: CodecKey, bit_rate: f64, config: &MergeConfig) -> (ProcessingMode, TargetCodec) {
    if config.allows_remux(&key.codec_name) {
        let target = TargetCodec {
            codec_name: key.codec_name,
            sample_rate: key.sample_rate,
            bit_rate: bit_rate.max(0.0).round() as u32,
            channels: key.channels,
        };
        return (ProcessingMode::Remux, target);
    }

    let target = TargetCodec {
        codec_name: NATIVE_AAC_ENCODER.to_string(),
        sample_rate: key.sample_rate,
        bit_rate: clamp_bitrate(bit_rate, config),
        channels: key.channels,
    };
    (ProcessingMode::TranscodeUniform, target)
}

fn mixed(groups: &BTreeMap<CodecKey, f64>, config: &MergeConfig) -> (ProcessingMode, TargetCodec) {
    let max_bit_rate = groups.values().copied().fold(0.0, f64::max);
    let max_sample_rate = groups.keys().map(|k| k.sample_rate).max().unwrap_or(0);
    let min_channels = groups.keys().map(|k| k.channels).min().unwrap_or(1);

    let target = TargetCodec {
        codec_name: NATIVE_AAC_ENCODER.to_string(),
        sample_rate: snap_sample_rate(max_sample_rate),
        bit_rate: clamp_bitrate(max_bit_rate, config),
        channels: min_channels,
    };
    (ProcessingMode::TranscodeMixed, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::StreamDescriptor;
    use crate::metadata::TagMetadata;
    use std::path::PathBuf;

    fn file(name: &str, codec: &str, sample_rate: f64, bit_rate: f64, channels: u32) -> ClassifiedFile {
        ClassifiedFile::new(
            PathBuf::from(format!("/books/{}", name)),
            StreamDescriptor {
                index: 0,
                codec_name: codec.to_string(),
                sample_rate,
                bit_rate,
                channels,
                duration: 60.0,
                duration_ticks: 60_000,
            },
            TagMetadata::default(),
            None,
        )
    }

    #[test]
    fn test_snap_sample_rate() {
        assert_eq!(snap_sample_rate(44100), 44100);
        assert_eq!(snap_sample_rate(44101), 48000);
        assert_eq!(snap_sample_rate(1), 8000);
        assert_eq!(snap_sample_rate(22000), 22050);
        assert_eq!(snap_sample_rate(192_000), 96000);
    }

    #[test]
    fn test_clamp_bitrate() {
        let config = MergeConfig::default();
        assert_eq!(clamp_bitrate(1_411_200.0, &config), 192_000);
        assert_eq!(clamp_bitrate(32_000.0, &config), 96_000);
        assert_eq!(clamp_bitrate(0.0, &config), 96_000);
        assert_eq!(clamp_bitrate(f64::NAN, &config), 96_000);
        assert_eq!(clamp_bitrate(127_999.6, &config), 128_000);
    }

    #[test]
    fn test_remux_when_all_equivalent_and_allowed() {
        let config = MergeConfig::default();
        for codec in ["aac", "libfdk_aac"] {
            let files = vec![
                file("1.m4a", codec, 44100.0, 128_000.0, 2),
                file("2.m4a", codec, 44100.0, 127_000.0, 2),
            ];
            let (mode, target) = decide(&files, &config);
            assert_eq!(mode, ProcessingMode::Remux);
            assert_eq!(target.codec_name, codec);
            assert_eq!(target.sample_rate, 44100);
            assert_eq!(target.channels, 2);
            assert_eq!(target.bit_rate, 128_000);
        }
    }

    #[test]
    fn test_remux_keeps_unclamped_bitrate() {
        let files = vec![file("1.m4a", "aac", 48000.0, 320_000.0, 2)];
        let (mode, target) = decide(&files, &MergeConfig::default());
        assert_eq!(mode, ProcessingMode::Remux);
        assert_eq!(target.bit_rate, 320_000);
    }

    #[test]
    fn test_uniform_transcode_clamps_bitrate() {
        let config = MergeConfig::default();
        let lossless = vec![
            file("1.flac", "flac", 44100.0, 900_000.0, 2),
            file("2.flac", "flac", 44100.0, 1_000_000.0, 2),
        ];
        let (mode, target) = decide(&lossless, &config);
        assert_eq!(mode, ProcessingMode::TranscodeUniform);
        assert_eq!(target.codec_name, "aac");
        assert_eq!(target.sample_rate, 44100);
        assert_eq!(target.channels, 2);
        assert_eq!(target.bit_rate, 192_000);

        let low = vec![file("1.mp3", "mp3", 22050.0, 32_000.0, 1)];
        let (mode, target) = decide(&low, &config);
        assert_eq!(mode, ProcessingMode::TranscodeUniform);
        assert_eq!(target.bit_rate, 96_000);
        assert_eq!(target.sample_rate, 22050);
    }

    #[test]
    fn test_allow_list_is_configurable() {
        let config = MergeConfig {
            remux_codecs: vec!["mp3".to_string()],
            ..Default::default()
        };
        let files = vec![file("1.mp3", "mp3", 44100.0, 128_000.0, 2)];
        assert_eq!(decide(&files, &config).0, ProcessingMode::Remux);

        let files = vec![file("1.m4a", "aac", 44100.0, 128_000.0, 2)];
        assert_eq!(decide(&files, &config).0, ProcessingMode::TranscodeUniform);
    }

    #[test]
    fn test_mixed_mp3_and_aac() {
        let files = vec![
            file("1.mp3", "mp3", 44100.0, 128_000.0, 2),
            file("2.m4a", "aac", 48000.0, 64_000.0, 1),
        ];
        let (mode, target) = decide(&files, &MergeConfig::default());
        assert_eq!(mode, ProcessingMode::TranscodeMixed);
        assert_eq!(target.codec_name, "aac");
        assert_eq!(target.channels, 1);
        assert_eq!(target.sample_rate, 48000);
        assert_eq!(target.bit_rate, 128_000);
    }

    #[test]
    fn test_mixed_never_downsamples_or_upmixes() {
        let files = vec![
            file("1.mp3", "mp3", 22050.0, 64_000.0, 2),
            file("2.mp3", "mp3", 44100.0, 320_000.0, 2),
            file("3.mp3", "mp3", 46000.0, 96_000.0, 1),
        ];
        let (mode, target) = decide(&files, &MergeConfig::default());
        assert_eq!(mode, ProcessingMode::TranscodeMixed);
        assert_eq!(target.sample_rate, 48000);
        assert_eq!(target.channels, 1);
        assert_eq!(target.bit_rate, 192_000);
    }

    #[test]
    fn test_single_and_multi_group_paths() {
        let config = MergeConfig::default();
        let one = vec![file("1.ogg", "vorbis", 44100.0, 112_000.0, 2)];
        let (mode, target) = decide(&one, &config);
        assert_eq!(mode, ProcessingMode::TranscodeUniform);
        assert_eq!(target.bit_rate, 112_000);

        let two = vec![
            file("1.ogg", "vorbis", 44100.0, 112_000.0, 2),
            file("2.ogg", "vorbis", 22050.0, 64_000.0, 2),
        ];
        let (mode, target) = decide(&two, &config);
        assert_eq!(mode, ProcessingMode::TranscodeMixed);
        assert_eq!(target.sample_rate, 44100);
    }

    #[test]
    fn test_rate_rounding_groups_together() {
        let files = vec![
            file("1.m4a", "aac", 44100.0, 128_000.0, 2),
            file("2.m4a", "aac", 44099.8, 128_000.0, 2),
        ];
        assert_eq!(decide(&files, &MergeConfig::default()).0, ProcessingMode::Remux);
    }
}
