use std::ffi::OsString;
use std::path::PathBuf;

pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Full configuration of one extraction run
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Capture file (pcap or pcapng)
    pub input_path: PathBuf,
    /// WAV destination; the sample log goes next to it
    pub output_path: PathBuf,
    pub sample_rate_hz: u32,
}

impl ExtractConfig {
    pub fn new(input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            input_path,
            output_path,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }

    /// `<output>.txt`, suffix appended to the full output name
    pub fn log_path(&self) -> PathBuf {
        let mut name = OsString::from(self.output_path.as_os_str());
        name.push(".txt");
        PathBuf::from(name)
    }
}
