use ydfread::doctest_utils::YdfFileBuilder;
use ydfread::{YdfError, YdfReader, CHANNEL_RECORD_SIZE, EVENT_RECORD_SIZE, HEADER_SIZE};
use std::fs;
use std::path::Path;

// 清理测试文件的辅助函数
fn cleanup_test_file(filename: &str) {
    if Path::new(filename).exists() {
        fs::remove_file(filename).ok();
    }
}

#[test]
fn test_header_fields_round_trip_through_file() {
    let filename = "test_header_fields.ydf";

    YdfFileBuilder::new()
        .version("YDF2")
        .patient_id("PSG-0042")
        .start("05.03.24", "22.15.30")
        .study_duration(28800)
        .channel("EEG C3-M2", 4, -200.0, 200.0)
        .channel("SpO2", 1, 0.0, 100.0)
        .event("Lights Off", r#"{"onset":0}"#)
        .write(filename)
        .unwrap();

    {
        let reader = YdfReader::open(filename).unwrap();
        let header = reader.header();

        assert_eq!(header.version, "YDF2");
        assert_eq!(header.patient_id, "PSG-0042");
        assert_eq!(header.start_date, "05.03.24");
        assert_eq!(header.start_time, "22.15.30");
        assert_eq!(header.study_duration, 28800);
        assert_eq!(header.number_of_channels, 2);
        assert_eq!(header.number_of_event_lists, 1);
        assert_eq!(header.eeg_channel_config, "10");
        assert_eq!(header.error_code, "0");
        assert_eq!(header.reserved.len(), 16);
        assert_eq!(header.reserved_space.len(), 40);
        assert_eq!(
            header.start_datetime().unwrap().to_string(),
            "2024-03-05 22:15:30"
        );

        let spo2 = reader.channel(1).unwrap();
        assert_eq!(spo2.label, "SpO2");
        assert_eq!(spo2.transducer_type, "AgAgCl electrode");
        assert_eq!(spo2.physical_dimension, "uV");
        assert_eq!(spo2.physical_minimum, 0.0);
        assert_eq!(spo2.physical_maximum, 100.0);
        assert_eq!(spo2.digital_minimum, -32767);
        assert_eq!(spo2.prefiltering, "HP:0.1Hz LP:70Hz");
        assert_eq!(spo2.samples_per_data_record, 1);
    }

    cleanup_test_file(filename);
}

#[test]
fn test_two_channels_one_event_layout() {
    let filename = "test_layout_2x1.ydf";

    YdfFileBuilder::new()
        .channel("EEG C3", 4, -200.0, 200.0)
        .channel("EEG C4", 2, -200.0, 200.0)
        .event("Arousal", r#"{"onset":12.5}"#)
        .write(filename)
        .unwrap();

    {
        let reader = YdfReader::open(filename).unwrap();

        assert_eq!(reader.channels().len(), 2);
        assert_eq!(reader.events().len(), 1);

        let expected = HEADER_SIZE + 2 * CHANNEL_RECORD_SIZE + EVENT_RECORD_SIZE;
        assert_eq!(reader.size_of_header(), expected as u64);
        assert_eq!(reader.size_of_header(), 128 + 2 * 224 + 65);
        assert_eq!(reader.data_record_size(), (4 + 2) * 2);
        assert_eq!(reader.expected_signal_data_size(), 6 * 2 * 2);
        assert_eq!(reader.expected_event_data_size(), 14);
        assert_eq!(reader.expected_file_size(), reader.size_of_header() + 24 + 14);
    }

    cleanup_test_file(filename);
}

#[test]
fn test_end_to_end_single_channel_samples() {
    let filename = "test_end_to_end.ydf";

    YdfFileBuilder::new()
        .channel("EEG Fp1", 2, -32767.0, 32767.0)
        .raw_samples(&[1, 0, 2, 0, 3, 0, 4, 0])
        .write(filename)
        .unwrap();

    {
        let mut reader = YdfReader::open(filename).unwrap();
        assert_eq!(reader.data_records_in_file(), 2);

        reader.load_signals().unwrap();
        let channel = reader.channel(0).unwrap();
        assert_eq!(channel.digital_values, vec![1, 2, 3, 4]);
        // 数字与物理范围相同，物理值等于数字值
        assert_eq!(channel.physical_values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    cleanup_test_file(filename);
}

#[test]
fn test_multi_channel_demultiplexing() {
    let filename = "test_demultiplex.ydf";

    let mut builder = YdfFileBuilder::new()
        .channel("EEG C3", 4, -200.0, 200.0)
        .channel("ECG", 2, -5.0, 5.0);
    for record in 0..3i16 {
        let eeg: Vec<i16> = (0..4).map(|i| record * 10 + i).collect();
        let ecg: Vec<i16> = (0..2).map(|i| 1000 + record * 10 + i).collect();
        builder = builder.data_record(&[eeg.as_slice(), ecg.as_slice()]);
    }
    builder.write(filename).unwrap();

    {
        let mut reader = YdfReader::open(filename).unwrap();
        reader.load_signals().unwrap();

        let eeg = &reader.channels()[0].digital_values;
        let ecg = &reader.channels()[1].digital_values;
        assert_eq!(eeg.len(), 12);
        assert_eq!(ecg.len(), 6);
        assert_eq!(eeg, &vec![0, 1, 2, 3, 10, 11, 12, 13, 20, 21, 22, 23]);
        assert_eq!(ecg, &vec![1000, 1001, 1010, 1011, 1020, 1021]);

        println!("Demultiplexed {} EEG and {} ECG samples", eeg.len(), ecg.len());
    }

    cleanup_test_file(filename);
}

#[test]
fn test_physical_values_follow_calibration() {
    let filename = "test_physical.ydf";

    YdfFileBuilder::new()
        .channel("EEG", 3, -100.0, 100.0)
        .data_record(&[&[-32767, 0, 32767]])
        .write(filename)
        .unwrap();

    {
        let mut reader = YdfReader::open(filename).unwrap();
        reader.load_signals().unwrap();

        let physical = &reader.channel(0).unwrap().physical_values;
        assert!((physical[0] + 100.0).abs() < 1e-9);
        assert!(physical[1].abs() < 1e-9);
        assert!((physical[2] - 100.0).abs() < 1e-9);
    }

    cleanup_test_file(filename);
}

#[test]
fn test_empty_channel_and_event_lists() {
    let filename = "test_empty_lists.ydf";

    YdfFileBuilder::new().write(filename).unwrap();

    {
        let mut reader = YdfReader::open(filename).unwrap();
        assert!(reader.channels().is_empty());
        assert!(reader.events().is_empty());
        assert_eq!(reader.size_of_header(), HEADER_SIZE as u64);
        assert_eq!(reader.file_size(), HEADER_SIZE as u64);
        assert_eq!(reader.data_size(), 0);

        reader.load_signals().unwrap();
        reader.load_events().unwrap();
        reader.load_epoch(0, 30).unwrap();
    }

    cleanup_test_file(filename);
}

#[test]
fn test_decoding_is_idempotent() {
    let filename = "test_idempotent.ydf";

    YdfFileBuilder::new()
        .channel("EEG C3", 2, -200.0, 200.0)
        .data_record(&[&[5, -5]])
        .event("Spindle", r#"{"onset":3.25,"channel":"C3"}"#)
        .write(filename)
        .unwrap();

    {
        let mut first = YdfReader::open(filename).unwrap();
        let mut second = YdfReader::open(filename).unwrap();
        first.load_signals().unwrap();
        first.load_events().unwrap();
        second.load_signals().unwrap();
        second.load_events().unwrap();

        assert_eq!(first.header(), second.header());
        assert_eq!(first.channels(), second.channels());
        assert_eq!(first.events(), second.events());
    }

    cleanup_test_file(filename);
}

#[test]
fn test_declared_header_size_is_not_validated() {
    let filename = "test_declared_header.ydf";

    // 声明的信号数比实际写入的多，读取在越界时才失败
    YdfFileBuilder::new()
        .declared_channel_count(3)
        .channel("EEG", 1, -1.0, 1.0)
        .write(filename)
        .unwrap();

    {
        let result = YdfReader::open(filename);
        assert!(matches!(result, Err(YdfError::Io(_))));
    }

    cleanup_test_file(filename);
}

#[test]
fn test_open_missing_file() {
    let result = YdfReader::open("definitely_missing_file.ydf");
    assert!(matches!(result, Err(YdfError::FileNotFound(_))));
}

#[test]
fn test_gap_bytes_before_event_block_count_as_records() {
    let filename = "test_gap_as_records.ydf";

    // 4字节间隙正好是一个数据记录，多出的1字节不足一个记录
    YdfFileBuilder::new()
        .channel("EEG", 2, -100.0, 100.0)
        .data_record(&[&[5, 6]])
        .gap_bytes(&[7, 0, 8, 0, 9])
        .event("Arousal", r#"{"a":1}"#)
        .write(filename)
        .unwrap();

    {
        let mut reader = YdfReader::open(filename).unwrap();
        assert_eq!(reader.data_records_in_file(), 2);

        reader.load_signals().unwrap();
        reader.load_events().unwrap();
        assert_eq!(reader.channel(0).unwrap().digital_values, vec![5, 6, 7, 8]);
        assert_eq!(reader.event(0).unwrap().payload, Some(serde_json::json!({"a": 1})));
    }

    cleanup_test_file(filename);
}
