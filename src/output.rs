use std::io::{self, BufWriter};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::{Builder, NamedTempFile};

use crate::error::AudioError;

pub const CHANNELS: u16 = 2;
pub const BITS_PER_SAMPLE: u16 = 16;

/// Temporary file in `dir`, created with the same mode a plain `File::create` would get
fn temp_wav(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".iq-extract").suffix(".wav.tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Write interleaved I/Q samples to a WAV file (stereo int16 PCM, I=left, Q=right)
///
/// The container is built in a temporary file beside `path` and only moved into
/// place after it has been finalized, so a failed run never leaves a truncated WAV.
pub fn write_iq_wav<P: AsRef<Path>>(
    path: P,
    samples: &[i32],
    sample_rate: u32,
) -> Result<(), AudioError> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = temp_wav(dir)?;

    {
        let mut writer = WavWriter::new(BufWriter::new(tmp.as_file()), spec)?;
        for &sample in samples {
            // Narrow to 16 bits; the few values below i16::MIN wrap
            writer.write_sample(sample as i16)?;
        }
        writer.finalize()?;
    }

    tmp.persist(path).map_err(|e| AudioError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hound::WavReader;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_write_iq_wav_stereo_int16() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iq.wav");
        write_iq_wav(&path, &[0, 0, 256, -1, 32639, -32768], 48_000).unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);

        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0, 0, 256, -1, 32639, -32768]);
    }

    #[test]
    fn test_values_below_i16_range_wrap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrap.wav");
        write_iq_wav(&path, &[-32896, -32769], 48_000).unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![32640, 32767]);
    }

    #[test]
    fn test_empty_buffer_writes_valid_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_iq_wav(&path, &[], 48_000).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_unwritable_destination_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("iq.wav");
        let err = write_iq_wav(&path, &[1, 2], 48_000).unwrap_err();
        assert!(matches!(err, AudioError::Io(_)));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_wav_mode_matches_plain_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("iq.wav");
        write_iq_wav(&path, &[1, 2], 48_000).unwrap();
        let plain = dir.path().join("iq.wav.txt");
        std::fs::File::create(&plain).unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&plain));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iq.wav");
        write_iq_wav(&path, &[1, 2, 3, 4], 48_000).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
