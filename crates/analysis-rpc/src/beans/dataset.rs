//! Datasets and their `.npy` wire payload.
//!
//! A dataset record carries its payload either inline (`data`, the `.npy`
//! bytes) or as a reference to a spooled `.npy` file (`filename` plus
//! `deletefile`). Large payloads are spooled so the transport never has to
//! carry them as base64.

use super::{bool_field, opt_string_field, optional_field, put, wrong_field, Bean};
use crate::config::FlatteningConfig;
use crate::flatten::RootFlattener;
use crate::native_object;
use crate::value::Value;
use crate::wire::Record;
use crate::{Result, RpcError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IDATASET: &str = "uk.ac.diamond.scisoft.analysis.dataset.IDataset";

const NAME: &str = "name";
const DATA: &str = "data";
const FILENAME: &str = "filename";
const DELETEFILE: &str = "deletefile";

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
// Header block is padded so the data starts on this alignment.
const NPY_ALIGN: usize = 64;

/// Element storage of a dataset, C order.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetData {
    Bool(Vec<bool>),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl DatasetData {
    pub fn len(&self) -> usize {
        match self {
            DatasetData::Bool(v) => v.len(),
            DatasetData::Byte(v) => v.len(),
            DatasetData::Short(v) => v.len(),
            DatasetData::Int(v) => v.len(),
            DatasetData::Long(v) => v.len(),
            DatasetData::Float(v) => v.len(),
            DatasetData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// numpy type descriptor.
    pub fn descr(&self) -> &'static str {
        match self {
            DatasetData::Bool(_) => "|b1",
            DatasetData::Byte(_) => "|i1",
            DatasetData::Short(_) => "<i2",
            DatasetData::Int(_) => "<i4",
            DatasetData::Long(_) => "<i8",
            DatasetData::Float(_) => "<f4",
            DatasetData::Double(_) => "<f8",
        }
    }

    fn item_size(descr: &str) -> Option<usize> {
        match descr {
            "|b1" | "|i1" => Some(1),
            "<i2" => Some(2),
            "<i4" | "<f4" => Some(4),
            "<i8" | "<f8" => Some(8),
            _ => None,
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            DatasetData::Bool(v) => out.extend(v.iter().map(|b| u8::from(*b))),
            DatasetData::Byte(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            DatasetData::Short(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            DatasetData::Int(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            DatasetData::Long(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            DatasetData::Float(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
            DatasetData::Double(v) => out.extend(v.iter().flat_map(|x| x.to_le_bytes())),
        }
    }

    fn read_le(descr: &str, bytes: &[u8]) -> Result<Self> {
        fn chunks<const N: usize>(bytes: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
            bytes.chunks_exact(N).map(|c| {
                let mut buf = [0u8; N];
                buf.copy_from_slice(c);
                buf
            })
        }

        let data = match descr {
            "|b1" => DatasetData::Bool(bytes.iter().map(|b| *b != 0).collect()),
            "|i1" => DatasetData::Byte(chunks::<1>(bytes).map(i8::from_le_bytes).collect()),
            "<i2" => DatasetData::Short(chunks::<2>(bytes).map(i16::from_le_bytes).collect()),
            "<i4" => DatasetData::Int(chunks::<4>(bytes).map(i32::from_le_bytes).collect()),
            "<i8" => DatasetData::Long(chunks::<8>(bytes).map(i64::from_le_bytes).collect()),
            "<f4" => DatasetData::Float(chunks::<4>(bytes).map(f32::from_le_bytes).collect()),
            "<f8" => DatasetData::Double(chunks::<8>(bytes).map(f64::from_le_bytes).collect()),
            other => {
                return Err(RpcError::unsupported(format!(
                    "unsupported dataset dtype '{}'",
                    other
                )))
            }
        };
        Ok(data)
    }
}

/// An n-dimensional array with an optional name.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: Option<String>,
    shape: Vec<usize>,
    data: DatasetData,
}

native_object!(Dataset, Dataset::TYPE_NAME, [IDATASET]);

impl Dataset {
    /// Create a dataset; `shape` must account for every element.
    pub fn new(shape: Vec<usize>, data: DatasetData) -> Result<Self> {
        let size = element_count(&shape)?;
        if size != data.len() {
            return Err(RpcError::malformed(format!(
                "shape {:?} holds {} elements but {} were given",
                shape,
                size,
                data.len()
            )));
        }
        Ok(Self {
            name: None,
            shape,
            data,
        })
    }

    /// One-dimensional dataset over `data`.
    pub fn from_vec(data: DatasetData) -> Self {
        Self {
            name: None,
            shape: vec![data.len()],
            data,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &DatasetData {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encode as an `.npy` (format 1.0) file image.
    pub fn to_npy(&self) -> Result<Vec<u8>> {
        let shape = match self.shape.as_slice() {
            [] => "()".to_string(),
            [n] => format!("({},)", n),
            dims => format!(
                "({})",
                dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            self.data.descr(),
            shape
        );
        let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
        header.push_str(&" ".repeat((NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN));
        header.push('\n');
        let header_len = u16::try_from(header.len())
            .map_err(|_| RpcError::unsupported("npy header too long"))?;

        let mut out = Vec::with_capacity(unpadded + header.len() + self.size() * 8);
        out.extend_from_slice(NPY_MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        self.data.write_le(&mut out);
        Ok(out)
    }

    /// Decode an `.npy` file image (format 1.x or 2.x, C order, little endian).
    pub fn from_npy(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 10 || !bytes.starts_with(NPY_MAGIC) {
            return Err(RpcError::malformed("not an npy payload"));
        }
        let (header_len, header_start) = match bytes[6] {
            1 => (usize::from(u16::from_le_bytes([bytes[8], bytes[9]])), 10),
            2 | 3 if bytes.len() >= 12 => (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            ),
            v => return Err(RpcError::unsupported(format!("npy format version {}", v))),
        };
        let data_start = header_start + header_len;
        let header = bytes
            .get(header_start..data_start)
            .and_then(|h| std::str::from_utf8(h).ok())
            .ok_or_else(|| RpcError::malformed("truncated npy header"))?;

        let descr = header_value(header, "descr")
            .and_then(|v| v.strip_prefix('\''))
            .and_then(|v| v.split('\'').next())
            .ok_or_else(|| RpcError::malformed("npy header has no descr"))?;
        if header_value(header, "fortran_order").is_some_and(|v| v.starts_with("True")) {
            return Err(RpcError::unsupported("fortran-ordered npy payload"));
        }
        let shape = header_value(header, "shape")
            .and_then(|v| v.strip_prefix('('))
            .and_then(|v| v.split(')').next())
            .ok_or_else(|| RpcError::malformed("npy header has no shape"))?
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                d.trim_end_matches('L')
                    .parse::<usize>()
                    .map_err(|_| RpcError::malformed(format!("invalid npy dimension '{}'", d)))
            })
            .collect::<Result<Vec<_>>>()?;

        let item_size = DatasetData::item_size(descr)
            .ok_or_else(|| RpcError::unsupported(format!("unsupported dataset dtype '{}'", descr)))?;
        let needed = element_count(&shape)?
            .checked_mul(item_size)
            .ok_or_else(|| RpcError::malformed(format!("npy shape {:?} is too large", shape)))?;
        let body = &bytes[data_start..];
        if body.len() != needed {
            return Err(RpcError::malformed(format!(
                "npy payload holds {} bytes, shape {:?} of '{}' needs {}",
                body.len(),
                shape,
                descr,
                needed
            )));
        }
        Dataset::new(shape, DatasetData::read_le(descr, body)?)
    }
}

fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| RpcError::malformed(format!("dataset shape {:?} is too large", shape)))
}

// Value text following `'key':` in an npy header dict.
fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("'{}':", key);
    let start = header.find(&pattern)? + pattern.len();
    Some(header[start..].trim_start())
}

fn write_reference(
    record: &mut Record,
    path: &Path,
    delete_after_load: bool,
    name: Option<&str>,
    root: &RootFlattener,
) -> Result<()> {
    put(record, FILENAME, path.to_string_lossy().into_owned(), root)?;
    put(record, DELETEFILE, delete_after_load, root)?;
    put(record, NAME, name.map(str::to_string), root)
}

impl Bean for Dataset {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.dataset.AbstractDataset";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        let npy = self.to_npy()?;
        if npy.len() > FlatteningConfig::INLINE_DATASET_LIMIT {
            let path = root.spool(&npy)?;
            debug!("Spooled {} byte dataset to {}", npy.len(), path.display());
            return write_reference(record, &path, true, self.name(), root);
        }
        put(record, DATA, npy, root)?;
        put(record, NAME, self.name.clone(), root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        let name = opt_string_field(record, NAME, root)?;
        let dataset = match optional_field(record, DATA, root)? {
            Value::Binary(bytes) => Dataset::from_npy(&bytes)?,
            Value::Null | Value::TypedNone(_) => {
                let path = match optional_field(record, FILENAME, root)? {
                    Value::Str(path) => PathBuf::from(path),
                    other => return Err(wrong_field(record, FILENAME, "a file name", &other)),
                };
                let delete = record.contains_key(DELETEFILE)
                    && bool_field(record, DELETEFILE, root)?;
                let dataset = Dataset::from_npy(&std::fs::read(&path)?)?;
                if delete {
                    if !root.is_spooled(&path) {
                        warn!(
                            "Keeping dataset file {}: not a spool file in {}",
                            path.display(),
                            root.temp_location().display()
                        );
                    } else if let Err(e) = std::fs::remove_file(&path) {
                        warn!("Failed to delete dataset file {}: {}", path.display(), e);
                    }
                }
                dataset
            }
            other => return Err(wrong_field(record, DATA, "npy bytes", &other)),
        };
        Ok(Dataset { name, ..dataset })
    }
}

/// Reference to a dataset already saved as an `.npy` file.
///
/// Flattens to the file-reference form of a dataset record without reading
/// the file; the receiving side unflattens it as a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub filename: PathBuf,
    pub delete_after_load: bool,
    pub name: Option<String>,
}

native_object!(
    DatasetDescriptor,
    "uk.ac.diamond.scisoft.analysis.dataset.DatasetDescriptor"
);

impl DatasetDescriptor {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            delete_after_load: false,
            name: None,
        }
    }

    pub(crate) fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        write_reference(
            record,
            &self.filename,
            self.delete_after_load,
            self.name.as_deref(),
            root,
        )
    }
}
