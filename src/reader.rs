use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{YdfError, Result};
use crate::layout::{
    decode_field, decode_record, field_offsets, record_width, FieldSpec, CHANNEL_FIELDS,
    CHANNEL_RECORD_SIZE, EVENT_FIELDS, EVENT_RECORD_SIZE, HEADER_FIELDS, HEADER_SIZE, SAMPLE_SIZE,
};
use crate::types::{ChannelDescriptor, EventDescriptor, HeaderRecord};
use crate::utils::replace_non_finite_literals;

/// YDF file reader
///
/// Opening a file decodes the main header, every channel sub-header and every event
/// sub-header. Sample data and event payloads stay on disk until
/// [`load_signals`](YdfReader::load_signals), [`load_epoch`](YdfReader::load_epoch) or
/// [`load_events`](YdfReader::load_events) is called; each of these materializes its
/// whole region in memory at once.
///
/// # File layout
///
/// | Region              | Offset                                   | Width                          |
/// |---------------------|------------------------------------------|--------------------------------|
/// | Main header         | 0                                        | 128                            |
/// | Channel sub-headers | 128                                      | `ns × 224`                     |
/// | Event sub-headers   | `128 + ns × 224`                         | `ne × 65`                      |
/// | Signal samples      | end of event sub-headers                 | whole data records, LE `i16`   |
/// | Event payloads      | `file size − Σ declared length`          | `Σ declared length`, JSON      |
///
/// # Examples
///
/// ```rust
/// use ydfread::YdfReader;
///
/// # // Generate test file (hidden from docs)
/// # ydfread::doctest_utils::create_simple_test_file("recording.ydf")?;
/// #
/// let mut reader = YdfReader::open("recording.ydf")?;
///
/// println!("Patient: {}", reader.header().patient_id);
/// for channel in reader.channels() {
///     println!("{}: {} samples per record", channel.label, channel.samples_per_data_record);
/// }
///
/// reader.load_signals()?;
/// reader.load_events()?;
///
/// let eeg = reader.channel(0)?;
/// assert_eq!(eeg.digital_values.len(), 3 * 4);
/// assert_eq!(reader.events()[0].label, "Lights Off");
///
/// # // Cleanup (hidden from docs)
/// # drop(reader);
/// # std::fs::remove_file("recording.ydf").ok();
/// # Ok::<(), ydfread::YdfError>(())
/// ```
pub struct YdfReader<R = BufReader<File>> {
    source: R,
    file_size: u64,
    header: HeaderRecord,
    channels: Vec<ChannelDescriptor>,
    events: Vec<EventDescriptor>,
    /// 单个数据记录的时长（秒），文件中没有这个字段
    data_record_duration: Option<f64>,
}

impl YdfReader<BufReader<File>> {
    /// Opens a YDF file and decodes all of its headers
    ///
    /// # Errors
    ///
    /// * `YdfError::FileNotFound` - File doesn't exist or can't be opened
    /// * `YdfError::Io` - The file is shorter than its headers claim
    ///
    /// ```rust
    /// use ydfread::{YdfReader, YdfError};
    ///
    /// match YdfReader::open("nonexistent.ydf") {
    ///     Ok(_) => println!("Unexpected success"),
    ///     Err(YdfError::FileNotFound(msg)) => println!("File not found: {}", msg),
    ///     Err(e) => println!("Other error: {}", e),
    /// }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| YdfError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;

        debug!(path = %path.as_ref().display(), "opening YDF file");
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> YdfReader<R> {
    /// Decodes the headers from any seekable byte source, e.g. an in-memory `Cursor`.
    pub fn from_reader(mut source: R) -> Result<Self> {
        let file_size = source.seek(SeekFrom::End(0))?;

        // 主头部必须先解析，ns/ne 决定后面所有偏移
        let header = decode_header(&mut source)?;
        let ns = header.channel_count();
        let ne = header.event_count();
        debug!(
            version = %header.version,
            ns,
            ne,
            declared_header_bytes = header.header_bytes,
            file_size,
            "decoded main header"
        );

        let channel_base = HEADER_SIZE as u64;
        let channels: Vec<ChannelDescriptor> =
            decode_array(&mut source, CHANNEL_FIELDS, ns, channel_base)?;

        let event_base = channel_base + (ns * CHANNEL_RECORD_SIZE) as u64;
        let events: Vec<EventDescriptor> = decode_array(&mut source, EVENT_FIELDS, ne, event_base)?;
        debug!(channels = channels.len(), events = events.len(), "decoded sub-headers");

        Ok(YdfReader {
            source,
            file_size,
            header,
            channels,
            events,
            data_record_duration: None,
        })
    }

    pub fn header(&self) -> &HeaderRecord {
        &self.header
    }

    /// Decoded channels, in file order.
    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    /// Decoded events, in file order. Payloads are `None` until [`load_events`](Self::load_events).
    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    pub fn channel(&self, index: usize) -> Result<&ChannelDescriptor> {
        self.channels.get(index).ok_or(YdfError::InvalidChannelIndex(index))
    }

    pub fn event(&self, index: usize) -> Result<&EventDescriptor> {
        self.events.get(index).ok_or(YdfError::InvalidEventIndex(index))
    }

    /// Header size computed from the layout: `128 + ns × 224 + ne × 65`.
    ///
    /// This is also where the signal samples begin.
    pub fn size_of_header(&self) -> u64 {
        (HEADER_SIZE
            + self.header.channel_count() * CHANNEL_RECORD_SIZE
            + self.header.event_count() * EVENT_RECORD_SIZE) as u64
    }

    /// Header size as declared by the file itself; not checked against [`size_of_header`](Self::size_of_header).
    pub fn expected_size_of_header(&self) -> i64 {
        self.header.header_bytes
    }

    /// Total file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes after the headers (samples, anything in between, and event payloads).
    pub fn data_size(&self) -> u64 {
        self.file_size.saturating_sub(self.size_of_header())
    }

    /// Bytes of one data record: `Σ samples_per_data_record × 2`.
    pub fn data_record_size(&self) -> usize {
        self.samples_per_record().iter().sum::<usize>() * SAMPLE_SIZE
    }

    /// Size of the trailing event block: `Σ declared_length`.
    pub fn event_block_size(&self) -> u64 {
        self.events.iter().map(|e| e.length() as u64).sum()
    }

    /// Number of whole data records between the headers and the event block.
    ///
    /// Any unspecified bytes between the last record and the event block are counted
    /// too, so a gap at least one record wide shows up as extra records.
    pub fn data_records_in_file(&self) -> usize {
        let record_size = self.data_record_size() as u64;
        if record_size == 0 {
            return 0;
        }
        let signal_region = self
            .file_size
            .saturating_sub(self.size_of_header())
            .saturating_sub(self.event_block_size());
        (signal_region / record_size) as usize
    }

    /// `Σ samples_per_data_record × ns × 2`, the signal size the header layout implies.
    pub fn expected_signal_data_size(&self) -> u64 {
        (self.data_record_size() * self.header.channel_count()) as u64
    }

    /// Bytes reserved at the end of the file for event payloads.
    pub fn expected_event_data_size(&self) -> u64 {
        self.event_block_size()
    }

    pub fn expected_data_size(&self) -> u64 {
        self.expected_signal_data_size() + self.expected_event_data_size()
    }

    pub fn expected_file_size(&self) -> u64 {
        self.size_of_header() + self.expected_data_size()
    }

    pub fn data_record_duration(&self) -> Option<f64> {
        self.data_record_duration
    }

    /// Sets the duration of one data record in seconds, used by [`load_epoch`](Self::load_epoch).
    ///
    /// The file format carries no such field, so it is unset after opening.
    pub fn set_data_record_duration(&mut self, seconds: Option<f64>) {
        self.data_record_duration = seconds;
    }

    /// Loads every whole data record of the signal region into the channels
    ///
    /// Digital values replace whatever a previous load left behind, and physical values
    /// are recomputed afterwards. On error the channels are left untouched.
    ///
    /// The record count comes from [`data_records_in_file`](Self::data_records_in_file).
    /// The file does not say where the samples end, so gap bytes placed before the event
    /// block are decoded as further data records; a trailing partial record is dropped.
    ///
    /// ```rust
    /// use ydfread::YdfReader;
    ///
    /// # ydfread::doctest_utils::create_simple_test_file("signals.ydf")?;
    /// let mut reader = YdfReader::open("signals.ydf")?;
    /// reader.load_signals()?;
    ///
    /// let ecg = reader.channel(1)?;
    /// assert_eq!(ecg.digital_values, vec![0, -1, -10, -11, -20, -21]);
    /// assert_eq!(ecg.physical_values.len(), ecg.digital_values.len());
    /// # drop(reader);
    /// # std::fs::remove_file("signals.ydf").ok();
    /// # Ok::<(), ydfread::YdfError>(())
    /// ```
    pub fn load_signals(&mut self) -> Result<()> {
        let records = self.data_records_in_file();
        let length = records * self.data_record_size();
        let offset = self.size_of_header();

        let bytes = self.read_region(offset, length)?;
        let per_channel = demultiplex(&decode_samples(&bytes), &self.samples_per_record(), records);
        debug!(offset, length, records, "loaded signal region");

        self.commit_samples(per_channel);
        Ok(())
    }

    /// Loads the data records of one epoch
    ///
    /// `epoch_number` is zero based and `epoch_size` is in seconds. The epoch starts
    /// `epoch_number × epoch_size` data records into the signal region and spans
    /// `epoch_size / data_record_duration + 1` records. Without a positive, finite
    /// [`data_record_duration`](Self::data_record_duration) the quotient falls back to 0,
    /// so a single data record is loaded. The epoch is clamped to the records counted by
    /// [`data_records_in_file`](Self::data_records_in_file); event payloads are never
    /// decoded as samples.
    ///
    /// ```rust
    /// use ydfread::YdfReader;
    ///
    /// # ydfread::doctest_utils::create_simple_test_file("epochs.ydf")?;
    /// let mut reader = YdfReader::open("epochs.ydf")?;
    ///
    /// // Duration unknown: one data record per epoch
    /// reader.load_epoch(1, 1)?;
    /// assert_eq!(reader.channel(0)?.digital_values, vec![100, 101, 102, 103]);
    ///
    /// reader.set_data_record_duration(Some(1.0));
    /// reader.load_epoch(0, 1)?;
    /// assert_eq!(reader.channel(0)?.digital_values.len(), 2 * 4);
    /// # drop(reader);
    /// # std::fs::remove_file("epochs.ydf").ok();
    /// # Ok::<(), ydfread::YdfError>(())
    /// ```
    pub fn load_epoch(&mut self, epoch_number: u64, epoch_size: u64) -> Result<()> {
        let record_size = self.data_record_size() as u64;
        let records_wanted = self.records_per_epoch(epoch_size).saturating_add(1);

        // TODO: 按实际数据记录时长换算 epoch 的起始记录
        let start_record = epoch_number.saturating_mul(epoch_size);
        let offset = self
            .size_of_header()
            .saturating_add(start_record.saturating_mul(record_size));

        // 只读信号区内的完整记录，不能越界读到事件块
        let records_left = (self.data_records_in_file() as u64).saturating_sub(start_record);
        let records = records_wanted.min(records_left);
        let length = (records * record_size) as usize;

        let bytes = self.read_region(offset, length)?;
        let per_channel = demultiplex(&decode_samples(&bytes), &self.samples_per_record(), records as usize);
        debug!(epoch_number, epoch_size, offset, records, "loaded epoch");

        self.commit_samples(per_channel);
        Ok(())
    }

    /// Loads and parses the JSON payload of every event
    ///
    /// The event block is the last `Σ declared_length` bytes of the file; each event's
    /// `start_offset` is relative to that block. `NaN`, `Infinity` and `-Infinity`
    /// literals are accepted and decode as `null`.
    ///
    /// # Errors
    ///
    /// * `YdfError::EventOutOfRange` - An event's bytes don't fit in the event block
    /// * `YdfError::EventPayload` - An event's bytes are not valid JSON
    ///
    /// Either error aborts the whole load; no payload is stored.
    ///
    /// ```rust
    /// use ydfread::YdfReader;
    ///
    /// # ydfread::doctest_utils::create_simple_test_file("events.ydf")?;
    /// let mut reader = YdfReader::open("events.ydf")?;
    /// reader.load_events()?;
    ///
    /// let desat = reader.event(1)?;
    /// let payload = desat.payload.as_ref().unwrap();
    /// assert_eq!(payload["onset"], 2);
    /// assert!(payload["spo2"].is_null());
    /// # drop(reader);
    /// # std::fs::remove_file("events.ydf").ok();
    /// # Ok::<(), ydfread::YdfError>(())
    /// ```
    pub fn load_events(&mut self) -> Result<()> {
        let block_size = self.event_block_size();
        let offset = self.file_size.checked_sub(block_size).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "event block of {} bytes is larger than the {}-byte file",
                    block_size, self.file_size
                ),
            )
        })?;

        let block = self.read_region(offset, block_size as usize)?;
        let payloads = self
            .events
            .iter()
            .enumerate()
            .map(|(index, event)| parse_event_payload(index, event, &block))
            .collect::<Result<Vec<_>>>()?;
        debug!(offset, block_size, events = payloads.len(), "loaded event payloads");

        for (event, payload) in self.events.iter_mut().zip(payloads) {
            event.payload = Some(payload);
        }
        Ok(())
    }

    fn samples_per_record(&self) -> Vec<usize> {
        self.channels.iter().map(ChannelDescriptor::samples_per_record).collect()
    }

    fn records_per_epoch(&self, epoch_size: u64) -> u64 {
        match self.data_record_duration {
            Some(duration) if duration > 0.0 && duration.is_finite() => {
                (epoch_size as f64 / duration).floor() as u64
            }
            _ => {
                debug!(epoch_size, "data record duration unknown, epoch spans a single record");
                0
            }
        }
    }

    fn commit_samples(&mut self, per_channel: Vec<Vec<i32>>) {
        for (channel, digital_values) in self.channels.iter_mut().zip(per_channel) {
            channel.digital_values = digital_values;
            channel.calculate_physical_values();
        }
    }

    fn read_region(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        read_at(&mut self.source, offset, length)
    }
}

/// Reads exactly `length` bytes at `offset`; a zero length performs no I/O.
fn read_at<S: Read + Seek>(source: &mut S, offset: u64, length: usize) -> Result<Vec<u8>> {
    if length == 0 {
        return Ok(Vec::new());
    }

    source.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; length];
    source.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// 读取并解析128字节主头部
fn decode_header<S: Read + Seek>(source: &mut S) -> Result<HeaderRecord> {
    let bytes = read_at(source, 0, record_width(HEADER_FIELDS))?;
    let mut header = HeaderRecord::default();
    decode_record(HEADER_FIELDS, &bytes, &mut header);
    Ok(header)
}

/// Decodes `count` back-to-back records of `table` starting at `base_offset`.
///
/// Every record occupies one contiguous `record_width(table)` span. The region is read
/// in one go and then walked field by field: field `f` of record `i` sits at
/// `base_offset + i × record_width + offset_of(f)`.
/// A count of zero yields an empty vector without reading.
pub fn decode_array<T, S>(
    source: &mut S,
    table: &[FieldSpec<T>],
    count: usize,
    base_offset: u64,
) -> Result<Vec<T>>
where
    T: Default,
    S: Read + Seek,
{
    let width = record_width(table);
    let bytes = read_at(source, base_offset, count * width)?;
    let mut records: Vec<T> = (0..count).map(|_| T::default()).collect();

    for (field, field_offset) in table.iter().zip(field_offsets(table)) {
        for (index, record) in records.iter_mut().enumerate() {
            let start = index * width + field_offset;
            let value = decode_field(&bytes[start..start + field.width], field.transform);
            trace!(
                field = field.name,
                record = index,
                offset = base_offset + start as u64,
                width = field.width,
                ?value,
                "decoded field"
            );
            (field.assign)(record, value);
        }
    }

    Ok(records)
}

/// Interprets `bytes` as little-endian signed 16-bit samples; a trailing odd byte is ignored.
pub fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(SAMPLE_SIZE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Splits interleaved data records into one sample sequence per channel
///
/// A data record holds `samples_per_record[0]` samples of channel 0, then
/// `samples_per_record[1]` samples of channel 1, and so on. The result has one vector
/// per channel holding `records × samples_per_record[c]` values in data-record order.
/// Records missing from `samples` are skipped.
///
/// ```rust
/// use ydfread::reader::demultiplex;
///
/// let flat = [1, 2, 3, 10, 4, 5, 6, 20];
/// let channels = demultiplex(&flat, &[3, 1], 2);
/// assert_eq!(channels, vec![vec![1, 2, 3, 4, 5, 6], vec![10, 20]]);
/// ```
pub fn demultiplex(samples: &[i16], samples_per_record: &[usize], records: usize) -> Vec<Vec<i32>> {
    let total_per_record: usize = samples_per_record.iter().sum();

    // 每个通道在一个数据记录内的起始位置
    let offsets: Vec<usize> = samples_per_record
        .iter()
        .scan(0, |offset, &count| {
            let start = *offset;
            *offset += count;
            Some(start)
        })
        .collect();

    let mut channels: Vec<Vec<i32>> = samples_per_record
        .iter()
        .map(|&count| Vec::with_capacity(count * records))
        .collect();

    for record in 0..records {
        let record_start = record * total_per_record;
        for (channel, (&count, &offset)) in samples_per_record.iter().zip(&offsets).enumerate() {
            let start = record_start + offset;
            if let Some(chunk) = samples.get(start..start + count) {
                channels[channel].extend(chunk.iter().map(|&s| s as i32));
            }
        }
    }

    channels
}

fn parse_event_payload(index: usize, event: &EventDescriptor, block: &[u8]) -> Result<serde_json::Value> {
    let start = event.start();
    let length = event.length();
    let bytes = start
        .checked_add(length)
        .and_then(|end| block.get(start..end))
        .ok_or(YdfError::EventOutOfRange {
            index,
            start,
            length,
            available: block.len(),
        })?;

    serde_json::from_slice(&replace_non_finite_literals(bytes)).map_err(|source| YdfError::EventPayload {
        index,
        label: event.label.clone(),
        source,
    })
}
