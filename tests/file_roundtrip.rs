// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use test_log::test;
use tsfile::{
    ColumnSchema, Config, TSDataType, TableSchema, Tablet, TsFileReader, TsFileWriter,
};

fn file_path(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join(name)
}

#[test]
fn five_rows_single_device() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "basic.tsfile");

    let schema = TableSchema::new(
        "T",
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int32),
        ],
    )?;

    let mut writer = TsFileWriter::create(&path, Some(schema), Config::default())?;

    let mut tablet = Tablet::new(
        "T",
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int32),
        ],
        5,
    )?;

    for row in 0..5 {
        tablet.add_timestamp(row, row as i64)?;
        tablet.add_value(row, "id", "d")?;
        tablet.add_value(row, "s", row as i32)?;
    }

    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("T", &["id", "s"], 0, 10)?;

    let metadata = rows.metadata().clone();
    assert_eq!(3, metadata.column_count());
    assert_eq!(Some("time"), metadata.column_name(0));
    assert_eq!(Some(TSDataType::Int64), metadata.column_type(0));
    assert_eq!(Some("id"), metadata.column_name(1));
    assert_eq!(Some("s"), metadata.column_name(2));

    let mut i = 0i64;
    while rows.next()? {
        assert_eq!(i, rows.get_long("time")?);
        assert_eq!("d", rows.get_string("id")?);
        assert_eq!(i as i32, rows.get_int("s")?);
        assert!(!rows.is_null("s")?);
        i += 1;
    }
    assert_eq!(5, i);

    Ok(())
}

#[test]
fn all_types_with_trailing_nulls() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "all_types.tsfile");

    let columns = || {
        vec![
            ColumnSchema::tag("TAG"),
            ColumnSchema::new("i32", TSDataType::Int32),
            ColumnSchema::new("i64", TSDataType::Int64),
            ColumnSchema::new("f", TSDataType::Float),
            ColumnSchema::new("d", TSDataType::Double),
            ColumnSchema::new("b", TSDataType::Boolean),
        ]
    };

    let schema = TableSchema::new("ALL_T", columns())?;
    let mut writer = TsFileWriter::create(&path, Some(schema), Config::default())?;

    let mut tablet = Tablet::new("ALL_T", columns(), 1000)?;
    for row in 0..1000usize {
        tablet.add_timestamp(row, row as i64 - 10)?;
        tablet.add_value(row, "TAG", "device1")?;
        tablet.add_value(row, "i32", row as i32)?;
        tablet.add_value(row, "i64", (row as i64) * 2)?;
        tablet.add_value(row, "f", row as f32 * 0.5)?;

        if row <= 900 {
            tablet.add_value(row, "d", row as f64 * 1.5)?;
            tablet.add_value(row, "b", row % 2 == 0)?;
        }
    }

    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("ALL_T", &["TAG", "i32", "i64", "f", "d", "b"], 0, i64::MAX)?;

    let mut count = 0usize;
    let mut t = 0i64;
    while rows.next()? {
        assert_eq!(t, rows.get_long(0usize)?);
        assert_eq!("device1", rows.get_string("TAG")?);

        let row = (t + 10) as usize;
        assert_eq!(row as i32, rows.get_int("i32")?);
        assert_eq!((row as i64) * 2, rows.get_long("i64")?);
        assert_eq!(row as f32 * 0.5, rows.get_float("f")?);

        if row > 900 {
            assert!(rows.is_null("d")?);
            assert!(rows.is_null("b")?);
        } else {
            assert!(!rows.is_null("d")?);
            assert_eq!(row as f64 * 1.5, rows.get_double("d")?);
            assert_eq!(row % 2 == 0, rows.get_bool("b")?);
        }

        count += 1;
        t += 1;
    }

    // rows at t = -10..-1 fall outside the queried range
    assert_eq!(990, count);

    Ok(())
}

#[test]
fn consecutive_tablets_merge_in_time_order() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "two_tablets.tsfile");

    let columns = || {
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int64),
        ]
    };

    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("T", columns())?), Config::default())?;

    for batch in 0..2i64 {
        let mut tablet = Tablet::new("T", columns(), 10)?;
        for row in 0..10usize {
            let ts = batch * 10 + row as i64;
            tablet.add_timestamp(row, ts)?;
            tablet.add_value(row, "id", "dev")?;
            tablet.add_value(row, "s", ts * 7)?;
        }
        writer.write_table(&tablet)?;
        writer.flush()?;
    }

    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("T", &["id", "s"], i64::MIN, i64::MAX)?;

    let mut expected_ts = 0i64;
    while rows.next()? {
        assert_eq!(expected_ts, rows.get_long("time")?);
        assert_eq!(expected_ts * 7, rows.get_long("s")?);
        expected_ts += 1;
    }
    assert_eq!(20, expected_ts);

    Ok(())
}

#[test]
fn multiple_devices_ordered_by_name() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "devices.tsfile");

    let columns = || {
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int64),
        ]
    };

    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("T", columns())?), Config::default())?;

    // written unordered; results come back in device order
    let mut tablet = Tablet::new("T", columns(), 30)?;
    let mut row = 0usize;
    for device in ["zeta", "alpha", "mid"] {
        for i in 0..10i64 {
            tablet.add_timestamp(row, i)?;
            tablet.add_value(row, "id", device)?;
            tablet.add_value(row, "s", i)?;
            row += 1;
        }
    }
    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("T", &["id", "s"], 0, 100)?;

    let mut sequence = Vec::new();
    while rows.next()? {
        sequence.push((rows.get_string("id")?.to_owned(), rows.get_long("time")?));
    }

    assert_eq!(30, sequence.len());

    let expected: Vec<(String, i64)> = ["alpha", "mid", "zeta"]
        .iter()
        .flat_map(|d| (0..10i64).map(move |i| ((*d).to_owned(), i)))
        .collect();
    assert_eq!(expected, sequence);

    Ok(())
}

#[test]
fn empty_and_null_tags_roundtrip() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "tags.tsfile");

    let columns = || {
        vec![
            ColumnSchema::tag("t1"),
            ColumnSchema::tag("t2"),
            ColumnSchema::new("v", TSDataType::Double),
        ]
    };

    let mut writer = TsFileWriter::create(
        &path,
        Some(TableSchema::new("test_table", columns())?),
        Config::default(),
    )?;

    let mut tablet = Tablet::new("test_table", columns(), 2)?;

    // row 0: empty second tag, row 1: null second tag
    tablet.add_timestamp(0, 0)?;
    tablet.add_value(0, "t1", "a")?;
    tablet.add_value(0, "t2", "")?;
    tablet.add_value(0, "v", 1.0)?;

    tablet.add_timestamp(1, 0)?;
    tablet.add_value(1, "t1", "a")?;
    tablet.add_value(1, "v", 2.0)?;

    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("test_table", &["t1", "t2", "v"], 0, 10)?;

    // device "test_table.a." sorts before "test_table.a.null"
    assert!(rows.next()?);
    assert_eq!("a", rows.get_string("t1")?);
    assert!(!rows.is_null("t2")?);
    assert_eq!("", rows.get_string("t2")?);
    assert_eq!(1.0, rows.get_double("v")?);

    assert!(rows.next()?);
    assert_eq!("a", rows.get_string("t1")?);
    assert!(rows.is_null("t2")?);
    assert_eq!(2.0, rows.get_double("v")?);

    assert!(!rows.next()?);

    Ok(())
}

#[test]
fn tagless_table_with_small_pages() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "tagless.tsfile");

    let columns = || vec![ColumnSchema::new("value", TSDataType::Double)];

    let config = Config::default().use_page_max_point_num(5);
    let mut writer = TsFileWriter::create(
        &path,
        Some(TableSchema::new("test_table", columns())?),
        config,
    )?;

    let mut tablet = Tablet::new("test_table", columns(), 1000)?;
    for row in 0..1000usize {
        tablet.add_timestamp(row, row as i64)?;
        tablet.add_value(row, "value", row as f64 * 1.1)?;
    }
    writer.write_tablet(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("test_table", &["value"], 0, 50)?;

    let mut count = 0;
    while rows.next()? {
        let ts = rows.get_long("time")?;
        assert_eq!(ts as f64 * 1.1, rows.get_double("value")?);
        count += 1;
    }
    assert_eq!(51, count);

    Ok(())
}

#[test]
fn string_date_and_blob_columns() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "strings.tsfile");

    let columns = || {
        vec![
            ColumnSchema::new("name", TSDataType::String),
            ColumnSchema::new("note", TSDataType::Text),
            ColumnSchema::new("payload", TSDataType::Blob),
            ColumnSchema::new("day", TSDataType::Date),
            ColumnSchema::new("at", TSDataType::Timestamp),
        ]
    };

    let mut writer = TsFileWriter::create(
        &path,
        Some(TableSchema::new("logs", columns())?),
        Config::default(),
    )?;

    let day = tsfile::date_to_int(2024, 2, 29)?;
    let payload: &[u8] = &[0xDE, 0x00, 0xFF, 0x80];

    let mut tablet = Tablet::new("logs", columns(), 3)?;
    for row in 0..3usize {
        tablet.add_timestamp(row, row as i64)?;
        tablet.add_value(row, "name", format!("name_{row}").as_str())?;
        tablet.add_value(row, "note", "text value")?;
        tablet.add_value(row, "payload", payload)?;
        tablet.add_value(row, "day", day)?;
        tablet.add_value(row, "at", 1_622_505_600_000i64 + row as i64)?;
    }

    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("logs", &["name", "note", "payload", "day", "at"], 0, 10)?;

    let mut row = 0i64;
    while rows.next()? {
        assert_eq!(format!("name_{row}"), rows.get_string("name")?);
        assert_eq!("text value", rows.get_string("note")?);
        assert_eq!(payload, rows.get_binary("payload")?);
        assert_eq!(day, rows.get_int("day")?);
        assert_eq!(1_622_505_600_000 + row, rows.get_long("at")?);
        row += 1;
    }
    assert_eq!(3, row);

    Ok(())
}

#[test]
fn schema_table_roundtrips_registered_columns() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "meta.tsfile");

    let columns = vec![
        ColumnSchema::tag("region"),
        ColumnSchema::new("speed", TSDataType::Float),
        ColumnSchema::new("count", TSDataType::Int64),
    ];

    let mut writer = TsFileWriter::create(
        &path,
        Some(TableSchema::new("vehicles", columns.clone())?),
        Config::default(),
    )?;

    let mut tablet = Tablet::new("vehicles", columns.clone(), 1)?;
    tablet.add_timestamp(0, 1)?;
    tablet.add_value(0, "region", "eu")?;
    tablet.add_value(0, "speed", 88.5f32)?;
    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;

    assert_eq!(vec!["vehicles"], reader.table_names());

    let meta = reader.table_meta("VEHICLES").expect("table should exist");
    assert_eq!("vehicles", meta.name);
    assert_eq!(columns, meta.columns);

    Ok(())
}

#[test]
fn chunk_statistics_without_page_reads() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "stats.tsfile");

    let columns = || {
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int64),
        ]
    };

    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("T", columns())?), Config::default())?;

    let mut tablet = Tablet::new("T", columns(), 100)?;
    for row in 0..100usize {
        tablet.add_timestamp(row, row as i64 + 1000)?;
        tablet.add_value(row, "id", "d")?;
        tablet.add_value(row, "s", row as i64 * 3)?;
    }
    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;

    let index = reader
        .timeseries_index("T", "T.d", "s")?
        .expect("series should exist");

    assert_eq!("s", index.measurement);
    assert_eq!(1, index.chunks.len());

    let chunk = index.chunks.first().expect("one chunk");
    assert_eq!(100, chunk.statistics.count());
    assert_eq!(1000, chunk.statistics.start_time());
    assert_eq!(1099, chunk.statistics.end_time());

    assert!(reader.timeseries_index("T", "T.d", "nope")?.is_none());
    assert!(reader.timeseries_index("T", "T.other", "s")?.is_none());

    Ok(())
}

#[test]
fn truncated_trailing_magic_is_unreadable() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "truncated.tsfile");

    let columns = || {
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int64),
        ]
    };

    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("T", columns())?), Config::default())?;

    let mut tablet = Tablet::new("T", columns(), 3)?;
    for row in 0..3usize {
        tablet.add_timestamp(row, row as i64)?;
        tablet.add_value(row, "id", "d")?;
        tablet.add_value(row, "s", row as i64)?;
    }
    writer.write_table(&tablet)?;
    writer.close()?;

    // chop off one byte of the trailing magic
    let bytes = std::fs::read(&path)?;
    std::fs::write(&path, &bytes[..bytes.len() - 1])?;

    assert!(matches!(
        TsFileReader::open(&path),
        Err(tsfile::Error::InvalidFile(_)),
    ));

    Ok(())
}

#[test]
fn empty_file_still_opens() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = file_path(&dir, "empty.tsfile");

    let schema = TableSchema::new(
        "T",
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new("s", TSDataType::Int64),
        ],
    )?;

    let writer = TsFileWriter::create(&path, Some(schema), Config::default())?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    assert_eq!(vec!["T"], reader.table_names());

    let mut rows = reader.query("T", &["s"], 0, 100)?;
    assert!(!rows.next()?);

    Ok(())
}
