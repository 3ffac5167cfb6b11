// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use test_log::test;
use tsfile::{
    ColumnSchema, CompressionType, Config, TSDataType, TSEncoding, TableSchema, Tablet,
    TsFileReader, TsFileWriter,
};

fn roundtrip_column(
    name: &str,
    data_type: TSDataType,
    encoding: TSEncoding,
    compression: CompressionType,
    rows: usize,
) -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(format!("{name}.tsfile"));

    let columns = || {
        vec![
            ColumnSchema::tag("id"),
            ColumnSchema::new(name, data_type)
                .use_encoding(encoding)
                .use_compression(compression),
        ]
    };

    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("m", columns())?), Config::default())?;

    let mut tablet = Tablet::new("m", columns(), rows)?;
    for row in 0..rows {
        tablet.add_timestamp(row, row as i64 * 10)?;
        tablet.add_value(row, "id", "dev")?;

        match data_type {
            TSDataType::Int32 => tablet.add_value(row, name, row as i32 - 50)?,
            TSDataType::Int64 => tablet.add_value(row, name, row as i64 * 1_000)?,
            TSDataType::Float => tablet.add_value(row, name, row as f32 / 3.0)?,
            TSDataType::Double => tablet.add_value(row, name, row as f64 * -0.25)?,
            TSDataType::Boolean => tablet.add_value(row, name, row % 3 == 0)?,
            _ => tablet.add_value(row, name, format!("value_{}", row % 7).as_str())?,
        }
    }

    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut result = reader.query("m", &[name], i64::MIN, i64::MAX)?;

    let mut row = 0usize;
    while result.next()? {
        assert_eq!(row as i64 * 10, result.get_long("time")?);

        match data_type {
            TSDataType::Int32 => assert_eq!(row as i32 - 50, result.get_int(name)?),
            TSDataType::Int64 => assert_eq!(row as i64 * 1_000, result.get_long(name)?),
            TSDataType::Float => assert_eq!(row as f32 / 3.0, result.get_float(name)?),
            TSDataType::Double => assert_eq!(row as f64 * -0.25, result.get_double(name)?),
            TSDataType::Boolean => assert_eq!(row % 3 == 0, result.get_bool(name)?),
            _ => assert_eq!(format!("value_{}", row % 7), result.get_string(name)?),
        }

        row += 1;
    }
    assert_eq!(rows, row, "{name} lost rows");

    Ok(())
}

#[test]
fn int32_encodings() -> tsfile::Result<()> {
    for encoding in [
        TSEncoding::Plain,
        TSEncoding::Ts2Diff,
        TSEncoding::Gorilla,
        TSEncoding::Rle,
        TSEncoding::Zigzag,
        TSEncoding::Sprintz,
    ] {
        roundtrip_column(
            "v32",
            TSDataType::Int32,
            encoding,
            CompressionType::Uncompressed,
            777,
        )?;
    }
    Ok(())
}

#[test]
fn int64_encodings() -> tsfile::Result<()> {
    for encoding in [
        TSEncoding::Plain,
        TSEncoding::Ts2Diff,
        TSEncoding::Gorilla,
        TSEncoding::Rle,
        TSEncoding::Zigzag,
        TSEncoding::Sprintz,
    ] {
        roundtrip_column(
            "v64",
            TSDataType::Int64,
            encoding,
            CompressionType::Uncompressed,
            777,
        )?;
    }
    Ok(())
}

#[test]
fn float_and_double_encodings() -> tsfile::Result<()> {
    for encoding in [
        TSEncoding::Plain,
        TSEncoding::Gorilla,
        TSEncoding::Sprintz,
        TSEncoding::Ts2Diff,
    ] {
        roundtrip_column(
            "vf",
            TSDataType::Float,
            encoding,
            CompressionType::Uncompressed,
            300,
        )?;
        roundtrip_column(
            "vd",
            TSDataType::Double,
            encoding,
            CompressionType::Uncompressed,
            300,
        )?;
    }
    Ok(())
}

#[test]
fn string_encodings() -> tsfile::Result<()> {
    for encoding in [TSEncoding::Plain, TSEncoding::Dictionary] {
        roundtrip_column(
            "vs",
            TSDataType::String,
            encoding,
            CompressionType::Uncompressed,
            500,
        )?;
    }
    Ok(())
}

#[cfg(feature = "lz4")]
#[test]
fn lz4_compressed_columns() -> tsfile::Result<()> {
    roundtrip_column(
        "v",
        TSDataType::Int64,
        TSEncoding::Ts2Diff,
        CompressionType::Lz4,
        2_000,
    )
}

#[cfg(feature = "snappy")]
#[test]
fn snappy_compressed_columns() -> tsfile::Result<()> {
    roundtrip_column(
        "v",
        TSDataType::Double,
        TSEncoding::Gorilla,
        CompressionType::Snappy,
        2_000,
    )
}

#[cfg(feature = "gzip")]
#[test]
fn gzip_compressed_columns() -> tsfile::Result<()> {
    roundtrip_column(
        "v",
        TSDataType::String,
        TSEncoding::Dictionary,
        CompressionType::Gzip,
        2_000,
    )
}

#[cfg(feature = "lz4")]
#[test]
fn lz4_time_compression() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("time_lz4.tsfile");

    let columns = || vec![ColumnSchema::new("v", TSDataType::Int64)];

    let config = Config::default()
        .use_time_encoding(TSEncoding::Ts2Diff)?
        .use_time_compression(CompressionType::Lz4)?;

    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("t", columns())?), config)?;

    let mut tablet = Tablet::new("t", columns(), 4096)?;
    for row in 0..4096usize {
        tablet.add_timestamp(row, 1_600_000_000_000 + row as i64 * 50)?;
        tablet.add_value(row, "v", row as i64)?;
    }
    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("t", &["v"], i64::MIN, i64::MAX)?;

    let mut row = 0i64;
    while rows.next()? {
        assert_eq!(1_600_000_000_000 + row * 50, rows.get_long("time")?);
        assert_eq!(row, rows.get_long("v")?);
        row += 1;
    }
    assert_eq!(4096, row);

    Ok(())
}

#[test]
fn plain_time_encoding() -> tsfile::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("time_plain.tsfile");

    let columns = || vec![ColumnSchema::new("v", TSDataType::Int32)];

    let config = Config::default().use_time_encoding(TSEncoding::Plain)?;
    let mut writer =
        TsFileWriter::create(&path, Some(TableSchema::new("t", columns())?), config)?;

    let mut tablet = Tablet::new("t", columns(), 100)?;
    for row in 0..100usize {
        tablet.add_timestamp(row, row as i64)?;
        tablet.add_value(row, "v", row as i32)?;
    }
    writer.write_table(&tablet)?;
    writer.close()?;

    let reader = TsFileReader::open(&path)?;
    let mut rows = reader.query("t", &["v"], 0, 99)?;

    let mut count = 0;
    while rows.next()? {
        count += 1;
    }
    assert_eq!(100, count);

    Ok(())
}
