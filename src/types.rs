use chrono::NaiveDateTime;
use serde::Serialize;

use crate::utils::parse_datetime;

/// The fixed 128-byte main header found at the start of every YDF file.
///
/// Count fields are kept exactly as decoded (possibly negative or zero for a damaged
/// file); use [`HeaderRecord::channel_count`] and [`HeaderRecord::event_count`] for the
/// values the layout arithmetic works with.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeaderRecord {
    pub version: String,
    pub patient_id: String,
    /// 原始 `dd.mm.yy` 字段（未去空格）
    pub start_date: String,
    /// 原始 `hh.mm.ss` 字段（未去空格）
    pub start_time: String,
    pub reserved: String,
    /// 文件自己声明的头部字节数
    pub header_bytes: i64,
    pub study_duration: i64,
    /// ns
    pub number_of_channels: i64,
    pub eeg_channel_config: String,
    /// ne
    pub number_of_event_lists: i64,
    pub error_code: String,
    pub reserved_space: String,
}

impl HeaderRecord {
    /// Number of channel sub-headers that follow the main header.
    pub fn channel_count(&self) -> usize {
        usize::try_from(self.number_of_channels).unwrap_or(0)
    }

    /// Number of event sub-headers that follow the channel sub-headers.
    pub fn event_count(&self) -> usize {
        usize::try_from(self.number_of_event_lists).unwrap_or(0)
    }

    /// Recording start, if the date and time fields hold a valid timestamp.
    ///
    /// ```rust
    /// use ydfread::HeaderRecord;
    ///
    /// let header = HeaderRecord {
    ///     start_date: "17.10.26".to_string(),
    ///     start_time: "08.30.00".to_string(),
    ///     ..Default::default()
    /// };
    /// let start = header.start_datetime().unwrap();
    /// assert_eq!(start.to_string(), "2026-10-17 08:30:00");
    /// ```
    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        parse_datetime(&self.start_date, &self.start_time)
    }
}

/// One recorded channel: its sub-header fields plus the sample buffers filled by the
/// reader's load operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelDescriptor {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i64,
    pub digital_maximum: i64,
    pub prefiltering: String,
    pub samples_per_data_record: i64,
    /// 原始16位采样值，按数据记录顺序排列
    pub digital_values: Vec<i32>,
    pub physical_values: Vec<f64>,
}

impl ChannelDescriptor {
    /// Samples this channel contributes to every data record (negative counts read as 0).
    pub fn samples_per_record(&self) -> usize {
        usize::try_from(self.samples_per_data_record).unwrap_or(0)
    }

    /// Converts a digital value to the channel's physical unit.
    ///
    /// `(d - digital_min) * (physical_max - physical_min) / (digital_max - digital_min) + physical_min`
    ///
    /// A channel whose digital range is empty has no defined conversion and yields NaN.
    ///
    /// ```rust
    /// use ydfread::ChannelDescriptor;
    ///
    /// let channel = ChannelDescriptor {
    ///     physical_minimum: -100.0,
    ///     physical_maximum: 100.0,
    ///     digital_minimum: -1000,
    ///     digital_maximum: 1000,
    ///     ..Default::default()
    /// };
    /// assert_eq!(channel.to_physical(500), 50.0);
    /// assert_eq!(channel.to_physical(-1000), -100.0);
    /// ```
    pub fn to_physical(&self, digital_value: i32) -> f64 {
        let digital_range = (self.digital_maximum - self.digital_minimum) as f64;
        if digital_range == 0.0 {
            return f64::NAN;
        }

        (digital_value as f64 - self.digital_minimum as f64)
            * (self.physical_maximum - self.physical_minimum)
            / digital_range
            + self.physical_minimum
    }

    /// 根据当前的数字值重新计算全部物理值
    pub fn calculate_physical_values(&mut self) {
        self.physical_values = self
            .digital_values
            .iter()
            .map(|&d| self.to_physical(d))
            .collect();
    }
}

/// One entry of the event list: sub-header fields plus the JSON payload loaded from the
/// trailing event block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventDescriptor {
    pub label: String,
    pub read_only: i64,
    /// 相对于文件末尾事件块起点的偏移，不是文件绝对偏移
    pub start_offset: i64,
    pub declared_length: i64,
    pub payload: Option<serde_json::Value>,
}

impl EventDescriptor {
    pub fn is_read_only(&self) -> bool {
        self.read_only != 0
    }

    /// Start of this event's bytes inside the event block (negative offsets read as 0).
    pub fn start(&self) -> usize {
        usize::try_from(self.start_offset).unwrap_or(0)
    }

    /// Declared payload length in bytes (negative lengths read as 0).
    pub fn length(&self) -> usize {
        usize::try_from(self.declared_length).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        let header = HeaderRecord {
            number_of_channels: -3,
            number_of_event_lists: 2,
            ..Default::default()
        };
        assert_eq!(header.channel_count(), 0);
        assert_eq!(header.event_count(), 2);
    }

    #[test]
    fn test_calculate_physical_values() {
        let mut channel = ChannelDescriptor {
            physical_minimum: 0.0,
            physical_maximum: 10.0,
            digital_minimum: 0,
            digital_maximum: 100,
            digital_values: vec![0, 50, 100, -10],
            ..Default::default()
        };
        channel.calculate_physical_values();
        assert_eq!(channel.physical_values, vec![0.0, 5.0, 10.0, -1.0]);
    }

    #[test]
    fn test_zero_digital_range_is_nan() {
        let mut channel = ChannelDescriptor {
            digital_minimum: 5,
            digital_maximum: 5,
            digital_values: vec![5, 6],
            ..Default::default()
        };
        channel.calculate_physical_values();
        assert_eq!(channel.physical_values.len(), 2);
        assert!(channel.physical_values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_event_accessors() {
        let event = EventDescriptor {
            read_only: 1,
            start_offset: -4,
            declared_length: 12,
            ..Default::default()
        };
        assert!(event.is_read_only());
        assert_eq!(event.start(), 0);
        assert_eq!(event.length(), 12);
    }
}
