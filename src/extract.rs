use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::decoder::decode_frame;
use crate::error::{ExtractError, ExtractResult};
use crate::input::{udp_payload, LinkLayer, PacketSource, PcapSource};
use crate::output::write_iq_wav;
use crate::sink::SampleSink;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub frames_read: u64,
    pub udp_payloads: u64,
    pub frames_decoded: u64,
    pub short_payloads: u64,
    pub samples_written: u64,
    pub first_timestamp_us: Option<i64>,
    pub last_timestamp_us: Option<i64>,
}

impl ExtractStats {
    fn record_timestamp(&mut self, ts: i64) {
        self.first_timestamp_us.get_or_insert(ts);
        self.last_timestamp_us = Some(ts);
    }
}

fn format_ts(ts: Option<i64>) -> String {
    ts.and_then(DateTime::<Utc>::from_timestamp_micros)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Packets read    : {}", self.frames_read)?;
        writeln!(f, "IPv4/UDP        : {}", self.udp_payloads)?;
        writeln!(f, "Frames decoded  : {}", self.frames_decoded)?;
        writeln!(f, "Too short       : {}", self.short_payloads)?;
        writeln!(f, "IQ pairs        : {}", self.samples_written)?;
        writeln!(f, "First packet    : {}", format_ts(self.first_timestamp_us))?;
        write!(f, "Last packet     : {}", format_ts(self.last_timestamp_us))
    }
}

/// Run a capture through filter, decoder and sink, one packet at a time
pub fn extract_packets<S, W>(source: &mut S, sink: &mut SampleSink<W>) -> ExtractResult<ExtractStats>
where
    S: PacketSource,
    W: Write,
{
    let link = source.link_layer();
    let mut stats = ExtractStats::default();

    while let Some(frame) = source.next_frame()? {
        stats.frames_read += 1;
        stats.record_timestamp(frame.timestamp_us);

        let payload = match udp_payload(link, frame.data) {
            Ok(p) => p,
            Err(reason) => {
                debug!("packet {}: skipped, {}", stats.frames_read, reason);
                continue;
            }
        };
        stats.udp_payloads += 1;

        let decoded = match decode_frame(&payload) {
            Ok(d) => d,
            Err(e) => {
                stats.short_payloads += 1;
                debug!("packet {}: {}", stats.frames_read, e);
                continue;
            }
        };

        stats.frames_decoded += 1;
        stats.samples_written += decoded.samples.len() as u64;
        sink.accept(decoded).map_err(ExtractError::WriteLog)?;
    }

    Ok(stats)
}

/// Extract a capture file into `<output>.txt` and the stereo WAV at `<output>`
pub fn process_capture(config: &ExtractConfig) -> ExtractResult<ExtractStats> {
    info!("Reading capture {:?}", config.input_path);
    let mut source = PcapSource::open(&config.input_path)?;

    match source.link_layer() {
        LinkLayer::Unsupported(dlt) => {
            warn!("Unsupported link type {dlt}; no packets will be decoded")
        }
        link => info!("Link layer: {:?}", link),
    }

    let log_path = config.log_path();
    let log_file = File::create(&log_path).map_err(|source| ExtractError::CreateLog {
        path: log_path.clone(),
        source,
    })?;
    info!("Sample log: {:?}", log_path);

    let mut sink = SampleSink::new(BufWriter::new(log_file));
    let stats = extract_packets(&mut source, &mut sink)?;

    info!("Wrote {} lines to {:?}", sink.lines_written(), log_path);

    let samples = sink.into_samples();
    info!(
        "Writing {} samples ({} Hz, 2ch, 16-bit) to {:?}",
        samples.len(),
        config.sample_rate_hz,
        config.output_path
    );
    write_iq_wav(&config.output_path, &samples, config.sample_rate_hz)?;

    Ok(stats)
}
