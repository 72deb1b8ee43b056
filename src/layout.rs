//! Declarative field tables for the three fixed-width record kinds of a YDF file.
//!
//! Every table is an ordered list of [`FieldSpec`] entries. A field's byte offset inside
//! its record is the sum of the widths declared before it, so all offsets can be worked
//! out before touching the file. Each entry carries a plain function that writes the
//! decoded value straight into the target struct.

use tracing::trace;

use crate::types::{ChannelDescriptor, EventDescriptor, HeaderRecord};
use crate::utils::{atof_lenient, atoi_lenient, trim_padding};

/// Size of one digital sample in the signal region (little-endian `i16`).
pub const SAMPLE_SIZE: usize = 2;

/// Post-read transform applied to the raw ASCII bytes of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// 原样保留
    None,
    Trim,
    ParseInt,
    ParseFloat,
}

/// A decoded field value, before it is written into its record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl FieldValue {
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            FieldValue::Text(s) => atoi_lenient(s),
            FieldValue::Int(v) => *v,
            FieldValue::Float(v) => *v as i64,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            FieldValue::Text(s) => atof_lenient(s),
            FieldValue::Int(v) => *v as f64,
            FieldValue::Float(v) => *v,
        }
    }
}

/// One named, fixed-width field of a record.
pub struct FieldSpec<R> {
    pub name: &'static str,
    pub width: usize,
    pub transform: Transform,
    pub assign: fn(&mut R, FieldValue),
}

/// Main header: 8+16+8+8+16+8+8+4+4+4+4+40 = 128 bytes.
pub static HEADER_FIELDS: &[FieldSpec<HeaderRecord>] = &[
    FieldSpec {
        name: "version",
        width: 8,
        transform: Transform::Trim,
        assign: |r, v| r.version = v.into_text(),
    },
    FieldSpec {
        name: "local_patient_identification",
        width: 16,
        transform: Transform::Trim,
        assign: |r, v| r.patient_id = v.into_text(),
    },
    FieldSpec {
        name: "start_date_of_recording",
        width: 8,
        transform: Transform::None,
        assign: |r, v| r.start_date = v.into_text(),
    },
    FieldSpec {
        name: "start_time_of_recording",
        width: 8,
        transform: Transform::None,
        assign: |r, v| r.start_time = v.into_text(),
    },
    FieldSpec {
        name: "reserved",
        width: 16,
        transform: Transform::None,
        assign: |r, v| r.reserved = v.into_text(),
    },
    FieldSpec {
        name: "number_of_bytes_in_header",
        width: 8,
        transform: Transform::ParseInt,
        assign: |r, v| r.header_bytes = v.as_int(),
    },
    FieldSpec {
        name: "study_duration",
        width: 8,
        transform: Transform::ParseInt,
        assign: |r, v| r.study_duration = v.as_int(),
    },
    FieldSpec {
        name: "number_of_signals",
        width: 4,
        transform: Transform::ParseInt,
        assign: |r, v| r.number_of_channels = v.as_int(),
    },
    FieldSpec {
        name: "eeg_channel_config",
        width: 4,
        transform: Transform::Trim,
        assign: |r, v| r.eeg_channel_config = v.into_text(),
    },
    FieldSpec {
        name: "number_of_event_lists",
        width: 4,
        transform: Transform::ParseInt,
        assign: |r, v| r.number_of_event_lists = v.as_int(),
    },
    FieldSpec {
        name: "error_code",
        width: 4,
        transform: Transform::Trim,
        assign: |r, v| r.error_code = v.into_text(),
    },
    FieldSpec {
        name: "reserved_space",
        width: 40,
        transform: Transform::None,
        assign: |r, v| r.reserved_space = v.into_text(),
    },
];

/// Per-channel sub-header: the EDF signal header without its 32-byte reserved tail (224 bytes).
pub static CHANNEL_FIELDS: &[FieldSpec<ChannelDescriptor>] = &[
    FieldSpec {
        name: "label",
        width: 16,
        transform: Transform::Trim,
        assign: |r, v| r.label = v.into_text(),
    },
    FieldSpec {
        name: "transducer_type",
        width: 80,
        transform: Transform::Trim,
        assign: |r, v| r.transducer_type = v.into_text(),
    },
    FieldSpec {
        name: "physical_dimension",
        width: 8,
        transform: Transform::Trim,
        assign: |r, v| r.physical_dimension = v.into_text(),
    },
    FieldSpec {
        name: "physical_minimum",
        width: 8,
        transform: Transform::ParseFloat,
        assign: |r, v| r.physical_minimum = v.as_float(),
    },
    FieldSpec {
        name: "physical_maximum",
        width: 8,
        transform: Transform::ParseFloat,
        assign: |r, v| r.physical_maximum = v.as_float(),
    },
    FieldSpec {
        name: "digital_minimum",
        width: 8,
        transform: Transform::ParseInt,
        assign: |r, v| r.digital_minimum = v.as_int(),
    },
    FieldSpec {
        name: "digital_maximum",
        width: 8,
        transform: Transform::ParseInt,
        assign: |r, v| r.digital_maximum = v.as_int(),
    },
    FieldSpec {
        name: "prefiltering",
        width: 80,
        transform: Transform::Trim,
        assign: |r, v| r.prefiltering = v.into_text(),
    },
    FieldSpec {
        name: "samples_per_data_record",
        width: 8,
        transform: Transform::ParseInt,
        assign: |r, v| r.samples_per_data_record = v.as_int(),
    },
];

/// Per-event sub-header: 32+1+16+16 = 65 bytes.
pub static EVENT_FIELDS: &[FieldSpec<EventDescriptor>] = &[
    FieldSpec {
        name: "label",
        width: 32,
        transform: Transform::Trim,
        assign: |r, v| r.label = v.into_text(),
    },
    FieldSpec {
        name: "read_only",
        width: 1,
        transform: Transform::ParseInt,
        assign: |r, v| r.read_only = v.as_int(),
    },
    FieldSpec {
        name: "start_offset",
        width: 16,
        transform: Transform::ParseInt,
        assign: |r, v| r.start_offset = v.as_int(),
    },
    FieldSpec {
        name: "file_length",
        width: 16,
        transform: Transform::ParseInt,
        assign: |r, v| r.declared_length = v.as_int(),
    },
];

pub const HEADER_SIZE: usize = 128;
pub const CHANNEL_RECORD_SIZE: usize = 224;
pub const EVENT_RECORD_SIZE: usize = 65;

/// Byte offset of `name` inside one record of `table`, or `None` if the table has no
/// such field.
///
/// ```rust
/// use ydfread::layout::{offset_of, HEADER_FIELDS, EVENT_FIELDS};
///
/// assert_eq!(offset_of(HEADER_FIELDS, "version"), Some(0));
/// assert_eq!(offset_of(HEADER_FIELDS, "number_of_signals"), Some(72));
/// assert_eq!(offset_of(EVENT_FIELDS, "file_length"), Some(49));
/// assert_eq!(offset_of(EVENT_FIELDS, "missing"), None);
/// ```
pub fn offset_of<R>(table: &[FieldSpec<R>], name: &str) -> Option<usize> {
    let mut offset = 0;
    for field in table {
        if field.name == name {
            return Some(offset);
        }
        offset += field.width;
    }
    None
}

/// Total width of one record of `table`.
pub fn record_width<R>(table: &[FieldSpec<R>]) -> usize {
    table.iter().map(|field| field.width).sum()
}

/// Per-field offsets of `table`, in declaration order.
pub fn field_offsets<R>(table: &[FieldSpec<R>]) -> Vec<usize> {
    table
        .iter()
        .scan(0, |offset, field| {
            let start = *offset;
            *offset += field.width;
            Some(start)
        })
        .collect()
}

/// Decodes fixed-width ASCII bytes with the given transform.
pub fn decode_field(bytes: &[u8], transform: Transform) -> FieldValue {
    let text = String::from_utf8_lossy(bytes);
    match transform {
        Transform::None => FieldValue::Text(text.into_owned()),
        Transform::Trim => FieldValue::Text(trim_padding(&text).to_string()),
        Transform::ParseInt => FieldValue::Int(atoi_lenient(&text)),
        Transform::ParseFloat => FieldValue::Float(atof_lenient(&text)),
    }
}

/// Decodes every field of `table` from one record's bytes into `record`.
///
/// `bytes` must hold at least [`record_width`] bytes; missing trailing bytes decode as
/// empty fields.
pub fn decode_record<R>(table: &[FieldSpec<R>], bytes: &[u8], record: &mut R) {
    let mut offset = 0;
    for field in table {
        let end = (offset + field.width).min(bytes.len());
        let raw = bytes.get(offset..end).unwrap_or(&[]);
        let value = decode_field(raw, field.transform);
        trace!(field = field.name, offset, width = field.width, ?value, "decoded field");
        (field.assign)(record, value);
        offset += field.width;
    }
}
