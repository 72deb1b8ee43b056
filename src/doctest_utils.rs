// Internal utilities for documentation and integration tests
// Builds synthetic YDF files byte by byte, so the reader can be exercised without sample recordings

use std::path::Path;

use crate::layout::{CHANNEL_RECORD_SIZE, EVENT_RECORD_SIZE, HEADER_SIZE};
use crate::types::{ChannelDescriptor, EventDescriptor};
use crate::Result;

/// Assembles the bytes of a YDF file.
///
/// Channels and events are laid out in the order they are added. [`YdfFileBuilder::event`]
/// appends the payload to the trailing event block and records its offset and length;
/// [`YdfFileBuilder::raw_event`] and [`YdfFileBuilder::event_block_bytes`] allow
/// hand-made (and inconsistent) layouts.
#[derive(Debug, Clone)]
pub struct YdfFileBuilder {
    version: String,
    patient_id: String,
    start_date: String,
    start_time: String,
    study_duration: i64,
    channel_count: Option<i64>,
    event_count: Option<i64>,
    channels: Vec<ChannelDescriptor>,
    events: Vec<EventDescriptor>,
    samples: Vec<u8>,
    gap: Vec<u8>,
    event_block: Vec<u8>,
}

impl Default for YdfFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl YdfFileBuilder {
    pub fn new() -> Self {
        YdfFileBuilder {
            version: "YDF1".to_string(),
            patient_id: "DOC001".to_string(),
            start_date: "17.10.26".to_string(),
            start_time: "08.30.00".to_string(),
            study_duration: 0,
            channel_count: None,
            event_count: None,
            channels: Vec::new(),
            events: Vec::new(),
            samples: Vec::new(),
            gap: Vec::new(),
            event_block: Vec::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn patient_id(mut self, patient_id: &str) -> Self {
        self.patient_id = patient_id.to_string();
        self
    }

    pub fn start(mut self, date: &str, time: &str) -> Self {
        self.start_date = date.to_string();
        self.start_time = time.to_string();
        self
    }

    pub fn study_duration(mut self, seconds: i64) -> Self {
        self.study_duration = seconds;
        self
    }

    /// Overrides the channel count written to the main header.
    pub fn declared_channel_count(mut self, count: i64) -> Self {
        self.channel_count = Some(count);
        self
    }

    /// Overrides the event-list count written to the main header.
    pub fn declared_event_count(mut self, count: i64) -> Self {
        self.event_count = Some(count);
        self
    }

    /// Adds a channel with a symmetric ±32767 digital range mapped onto the given physical range.
    pub fn channel(self, label: &str, samples_per_record: i64, physical_min: f64, physical_max: f64) -> Self {
        self.channel_with(ChannelDescriptor {
            label: label.to_string(),
            transducer_type: "AgAgCl electrode".to_string(),
            physical_dimension: "uV".to_string(),
            physical_minimum: physical_min,
            physical_maximum: physical_max,
            digital_minimum: -32767,
            digital_maximum: 32767,
            prefiltering: "HP:0.1Hz LP:70Hz".to_string(),
            samples_per_data_record: samples_per_record,
            ..Default::default()
        })
    }

    pub fn channel_with(mut self, channel: ChannelDescriptor) -> Self {
        self.channels.push(channel);
        self
    }

    /// Appends one data record; `per_channel[i]` holds the samples of channel `i`.
    pub fn data_record(mut self, per_channel: &[&[i16]]) -> Self {
        for samples in per_channel {
            for sample in samples.iter() {
                self.samples.extend_from_slice(&sample.to_le_bytes());
            }
        }
        self
    }

    /// Appends raw bytes to the signal region.
    pub fn raw_samples(mut self, bytes: &[u8]) -> Self {
        self.samples.extend_from_slice(bytes);
        self
    }

    /// Bytes placed between the signal region and the event block.
    pub fn gap_bytes(mut self, bytes: &[u8]) -> Self {
        self.gap.extend_from_slice(bytes);
        self
    }

    /// Adds an event whose payload is appended to the event block.
    pub fn event(mut self, label: &str, payload: &str) -> Self {
        self.events.push(EventDescriptor {
            label: label.to_string(),
            read_only: 0,
            start_offset: self.event_block.len() as i64,
            declared_length: payload.len() as i64,
            payload: None,
        });
        self.event_block.extend_from_slice(payload.as_bytes());
        self
    }

    /// Adds an event sub-header without touching the event block.
    pub fn raw_event(mut self, label: &str, read_only: i64, start_offset: i64, declared_length: i64) -> Self {
        self.events.push(EventDescriptor {
            label: label.to_string(),
            read_only,
            start_offset,
            declared_length,
            payload: None,
        });
        self
    }

    pub fn event_block_bytes(mut self, bytes: &[u8]) -> Self {
        self.event_block.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let header_size = HEADER_SIZE
            + self.channels.len() * CHANNEL_RECORD_SIZE
            + self.events.len() * EVENT_RECORD_SIZE;

        let mut out = Vec::with_capacity(header_size + self.samples.len() + self.event_block.len());

        push_field(&mut out, &self.version, 8);
        push_field(&mut out, &self.patient_id, 16);
        push_field(&mut out, &self.start_date, 8);
        push_field(&mut out, &self.start_time, 8);
        push_field(&mut out, "", 16);
        push_field(&mut out, &header_size.to_string(), 8);
        push_field(&mut out, &self.study_duration.to_string(), 8);
        let ns = self.channel_count.unwrap_or(self.channels.len() as i64);
        push_field(&mut out, &ns.to_string(), 4);
        push_field(&mut out, "10", 4);
        let ne = self.event_count.unwrap_or(self.events.len() as i64);
        push_field(&mut out, &ne.to_string(), 4);
        push_field(&mut out, "0", 4);
        push_field(&mut out, "", 40);

        for channel in &self.channels {
            push_field(&mut out, &channel.label, 16);
            push_field(&mut out, &channel.transducer_type, 80);
            push_field(&mut out, &channel.physical_dimension, 8);
            push_field(&mut out, &channel.physical_minimum.to_string(), 8);
            push_field(&mut out, &channel.physical_maximum.to_string(), 8);
            push_field(&mut out, &channel.digital_minimum.to_string(), 8);
            push_field(&mut out, &channel.digital_maximum.to_string(), 8);
            push_field(&mut out, &channel.prefiltering, 80);
            push_field(&mut out, &channel.samples_per_data_record.to_string(), 8);
        }

        for event in &self.events {
            push_field(&mut out, &event.label, 32);
            push_field(&mut out, &event.read_only.to_string(), 1);
            push_field(&mut out, &event.start_offset.to_string(), 16);
            push_field(&mut out, &event.declared_length.to_string(), 16);
        }

        out.extend_from_slice(&self.samples);
        out.extend_from_slice(&self.gap);
        out.extend_from_slice(&self.event_block);
        out
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.build())?;
        Ok(())
    }
}

/// 左对齐、空格填充并截断到固定宽度
fn push_field(out: &mut Vec<u8>, value: &str, width: usize) {
    let field = format!("{:<width$}", value, width = width);
    out.extend_from_slice(&field.as_bytes()[..width]);
}

/// Creates a two-channel test file with three data records and two events
pub fn create_simple_test_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let mut builder = YdfFileBuilder::new()
        .patient_id("DOC001")
        .study_duration(3)
        .channel("EEG C3", 4, -200.0, 200.0)
        .channel("ECG", 2, -5.0, 5.0);

    for record in 0..3i16 {
        let eeg: Vec<i16> = (0..4).map(|i| record * 100 + i).collect();
        let ecg: Vec<i16> = (0..2).map(|i| -(record * 10 + i)).collect();
        builder = builder.data_record(&[eeg.as_slice(), ecg.as_slice()]);
    }

    builder
        .event("Lights Off", r#"{"onset":0,"duration":1.5}"#)
        .event("Desaturation", r#"{"onset":2,"spo2":NaN}"#)
        .write(path)
}

