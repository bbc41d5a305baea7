use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{DirectoryConfig, DirectoryError};

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    JSON,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// A single airline. Only fields carrying a non-blank value are kept, in the
/// order they appear in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct AirlineRecord {
    name: String,
    link: Option<String>,
    fields: Vec<(String, String)>,
}

fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

impl AirlineRecord {
    /// Builds a record from raw `(field, value)` pairs. Returns `None` when the
    /// display name is missing or blank.
    pub fn from_entries<K, V>(
        entries: impl IntoIterator<Item = (K, Option<V>)>,
        name_field: &str,
        link_field: &str,
    ) -> Option<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut name = None;
        let mut link = None;
        let mut fields = Vec::new();

        for (key, value) in entries {
            let key: String = key.into();
            let Some(value) = value.map(Into::into).filter(|v: &String| is_present(v)) else {
                continue;
            };
            if key == name_field {
                name = Some(value);
            } else if key == link_field {
                link = Some(value);
            } else {
                fields.push((key, value));
            }
        }

        name.map(|name| AirlineRecord { name, link, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Domain fields with a present value. Identity fields are never part of it.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_value(&self, field: &str) -> bool {
        self.value(field).is_some()
    }

    /// Number of present domain fields, shown on the card badge and used for sorting.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Default)]
pub struct Dataset {
    name: String,
    records: Vec<AirlineRecord>,
    fields: Vec<String>,
}

impl Dataset {
    pub fn from_records(name: impl Into<String>, records: Vec<AirlineRecord>) -> Self {
        let fields = Self::discover_fields(&records);
        Dataset {
            name: name.into(),
            records,
            fields,
        }
    }

    pub fn load(path: PathBuf, config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let file_info = Self::get_file_info(path)?;
        debug!(
            "Loading {:?} ({} bytes) as {:?}",
            file_info.path, file_info.file_size, file_info.file_type
        );
        let start_time = Instant::now();

        let df = match file_info.file_type {
            FileType::CSV => Self::load_csv(&file_info.path)?.collect()?,
            FileType::JSON => Self::load_json(&file_info.path)?,
            FileType::PARQUET => Self::load_parquet(&file_info.path)?.collect()?,
            FileType::ARROW => Self::load_arrow(&file_info.path)?.collect()?,
        };

        if df.column(&config.name_field).is_err() {
            return Err(DirectoryError::MissingColumn(config.name_field.clone()));
        }

        // Each column is decoded into strings in its own rayon task.
        let c_: Result<Vec<(String, Vec<Option<String>>)>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        let columns = c_?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let entries = columns
                .iter()
                .map(|(name, data)| (name.as_str(), data[row].as_deref()));
            match AirlineRecord::from_entries(entries, &config.name_field, &config.link_field) {
                Some(record) => records.push(record),
                None => warn!("Skipping row {row}: no value for \"{}\"", config.name_field),
            }
        }

        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        let dataset = Dataset::from_records(name, records);

        info!(
            "Loaded {} airlines with {} fields in {}ms",
            dataset.len(),
            dataset.fields.len(),
            start_time.elapsed().as_millis()
        );
        Ok(dataset)
    }

    /// Union of the domain field names with a present value on any record,
    /// sorted lexicographically.
    fn discover_fields(records: &[AirlineRecord]) -> Vec<String> {
        let fields: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.fields().iter().map(|(key, _)| key.as_str()))
            .collect();
        trace!("Discovered fields {:?}", fields);
        fields.into_iter().map(str::to_string).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[AirlineRecord] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&AirlineRecord> {
        self.records.get(idx)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    fn load_column(
        df: &DataFrame,
        col_name: &str,
    ) -> Result<(String, Vec<Option<String>>), PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let data = series
            .into_iter()
            .map(|value| value.map(|s| s.to_string()))
            .collect();
        Ok((col_name.to_string(), data))
    }

    fn detect_file_type(path: &Path) -> Result<FileType, DirectoryError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("JSON") => Ok(FileType::JSON),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(DirectoryError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, DirectoryError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DirectoryError::FileNotFound,
            ErrorKind::PermissionDenied => DirectoryError::PermissionDenied,
            _ => DirectoryError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(DirectoryError::LoadingFailed("Not a file!".into()));
        }

        let file_size = metadata.len();
        let file_type = Self::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size,
            file_type,
        })
    }

    fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.as_path().into()))
            .with_has_header(true)
            .finish()
    }

    fn load_json(path: &Path) -> Result<DataFrame, DirectoryError> {
        let file = File::open(path)?;
        let df = JsonReader::new(file)
            .with_json_format(JsonFormat::Json)
            .infer_schema_len(None)
            .finish()?;
        Ok(df)
    }

    fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(
            PlPath::Local(path.as_path().into()),
            ScanArgsParquet::default(),
        )
    }

    fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.as_path().into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(name: &str, link: Option<&str>, fields: &[(&str, &str)]) -> AirlineRecord {
        let mut entries = vec![("airline_name", Some(name))];
        if let Some(link) = link {
            entries.push(("url", Some(link)));
        }
        entries.extend(fields.iter().map(|&(k, v)| (k, Some(v))));
        AirlineRecord::from_entries(entries, "airline_name", "url").unwrap()
    }

    pub(crate) fn scenario() -> Dataset {
        Dataset::from_records(
            "scenario",
            vec![
                record("Acme Air", Some("http://x"), &[("baggage", "23kg")]),
                record("Beta Jet", None, &[("visa", "required")]),
            ],
        )
    }

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn identity_fields_are_split_off() {
        let r = record("Acme Air", Some("http://x"), &[("baggage", "23kg")]);
        assert_eq!(r.name(), "Acme Air");
        assert_eq!(r.link(), Some("http://x"));
        assert_eq!(r.fields(), &[("baggage".to_string(), "23kg".to_string())]);
        assert_eq!(r.field_count(), 1);
    }

    #[test]
    fn blank_values_are_absent() {
        let r = AirlineRecord::from_entries(
            vec![
                ("airline_name", Some("Gamma")),
                ("baggage", Some("   ")),
                ("visa", None),
                ("dress_code", Some("smart")),
            ],
            "airline_name",
            "url",
        )
        .unwrap();
        assert!(!r.has_value("baggage"));
        assert!(!r.has_value("visa"));
        assert_eq!(r.value("dress_code"), Some("smart"));
        assert_eq!(r.field_count(), 1);
    }

    #[test]
    fn record_without_name_is_rejected() {
        let r = AirlineRecord::from_entries(
            vec![("airline_name", Some(" ")), ("baggage", Some("23kg"))],
            "airline_name",
            "url",
        );
        assert!(r.is_none());
    }

    #[test]
    fn fields_are_discovered_sorted_without_identity() {
        let ds = Dataset::from_records(
            "t",
            vec![
                record("B", Some("http://b"), &[("visa", "yes"), ("baggage", "1pc")]),
                record("A", None, &[("check_in", "online"), ("baggage", "2pc")]),
            ],
        );
        assert_eq!(ds.fields(), &["baggage", "check_in", "visa"]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = Dataset::detect_file_type(Path::new("airlines.xml")).unwrap_err();
        assert!(matches!(err, DirectoryError::UnknownFileType));
        assert_eq!(
            Dataset::detect_file_type(Path::new("Airlines.JSON")).unwrap(),
            FileType::JSON
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Dataset::load(fixture("does_not_exist.json"), &DirectoryConfig::default())
            .unwrap_err();
        assert!(matches!(err, DirectoryError::FileNotFound));
    }

    #[test]
    fn load_csv_fixture() {
        let ds = Dataset::load(fixture("airlines.csv"), &DirectoryConfig::default()).unwrap();
        assert_eq!(ds.name(), "airlines.csv");
        // The row without a name is skipped
        assert_eq!(ds.len(), 3);
        let acme = ds.records().iter().find(|r| r.name() == "Acme Air").unwrap();
        assert_eq!(acme.value("baggage"), Some("23kg"));
        assert_eq!(acme.link(), Some("http://x"));
        assert_eq!(ds.fields(), &["baggage", "dress_code", "visa"]);
    }

    #[test]
    fn load_json_fixture() {
        let ds = Dataset::load(fixture("airlines.json"), &DirectoryConfig::default()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0).unwrap().name(), "Acme Air");
        assert_eq!(ds.get(1).unwrap().value("visa"), Some("required"));
        assert_eq!(ds.fields(), &["baggage", "visa"]);
    }

    fn airline_frame() -> DataFrame {
        df!(
            "airline_name" => [Some("Acme Air"), Some("Beta Jet"), None],
            "url" => [Some("http://x"), None, Some("http://orphan")],
            "baggage" => [Some("23kg"), Some(" "), Some("10kg")],
            "visa" => [None, Some("required"), None]
        )
        .unwrap()
    }

    fn assert_airline_frame(ds: &Dataset) {
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.fields(), &["baggage", "visa"]);
        let acme = ds.get(0).unwrap();
        assert_eq!(acme.name(), "Acme Air");
        assert_eq!(acme.link(), Some("http://x"));
        assert_eq!(acme.value("baggage"), Some("23kg"));
        let beta = ds.get(1).unwrap();
        assert!(!beta.has_value("baggage"));
        assert_eq!(beta.value("visa"), Some("required"));
    }

    #[test]
    fn load_parquet_file() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["airlines.parquet", "airlines.pq"] {
            let path = dir.path().join(name);
            let mut df = airline_frame();
            ParquetWriter::new(File::create(&path).unwrap())
                .finish(&mut df)
                .unwrap();
            let ds = Dataset::load(path, &DirectoryConfig::default()).unwrap();
            assert_eq!(ds.name(), name);
            assert_airline_frame(&ds);
        }
    }

    #[test]
    fn load_arrow_file() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["airlines.arrow", "airlines.ipc", "airlines.feather"] {
            let path = dir.path().join(name);
            let mut df = airline_frame();
            IpcWriter::new(File::create(&path).unwrap())
                .finish(&mut df)
                .unwrap();
            let ds = Dataset::load(path, &DirectoryConfig::default()).unwrap();
            assert_airline_frame(&ds);
        }
    }

    #[test]
    fn missing_name_column_is_reported() {
        let cfg = DirectoryConfig::default().name_field("carrier");
        let err = Dataset::load(fixture("airlines.csv"), &cfg).unwrap_err();
        assert!(matches!(err, DirectoryError::MissingColumn(name) if name == "carrier"));
    }
}
