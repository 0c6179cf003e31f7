//! Element types and key-to-type schemas for HDF5 tensors.

use std::fmt;
use std::slice;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor};
use hdf5::H5Type;

use crate::error::Result;
use crate::util::normalize_key;

/// Numeric element type of an HDF5 dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl Dtype {
    /// Maps an HDF5 type descriptor to a `Dtype`, if it is a supported numeric type.
    pub fn from_descriptor(desc: &TypeDescriptor) -> Option<Self> {
        Some(match *desc {
            TypeDescriptor::Integer(IntSize::U1) => Self::Int8,
            TypeDescriptor::Integer(IntSize::U2) => Self::Int16,
            TypeDescriptor::Integer(IntSize::U4) => Self::Int32,
            TypeDescriptor::Integer(IntSize::U8) => Self::Int64,
            TypeDescriptor::Unsigned(IntSize::U1) => Self::UInt8,
            TypeDescriptor::Unsigned(IntSize::U2) => Self::UInt16,
            TypeDescriptor::Unsigned(IntSize::U4) => Self::UInt32,
            TypeDescriptor::Unsigned(IntSize::U8) => Self::UInt64,
            TypeDescriptor::Float(FloatSize::U4) => Self::Float32,
            TypeDescriptor::Float(FloatSize::U8) => Self::Float64,
            _ => return None,
        })
    }

    /// Returns the `Dtype` of a Rust element type, if it is a supported numeric type.
    pub fn of<T: H5Type>() -> Option<Self> {
        Self::from_descriptor(&T::type_descriptor())
    }

    /// Reads the element type of an opened dataset.
    pub fn of_dataset(ds: &hdf5::Dataset) -> Result<Self> {
        let desc = ds.dtype()?.to_descriptor()?;
        match Self::from_descriptor(&desc) {
            Some(dtype) => Ok(dtype),
            None => fail!("unsupported element type in dataset {}: {:?}", ds.name(), desc),
        }
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ensures the Rust element type `T` matches `dtype`.
pub(crate) fn check_dtype<T: H5Type>(dtype: Dtype, key: &str) -> Result<()> {
    match Dtype::of::<T>() {
        Some(requested) if requested == dtype => Ok(()),
        Some(requested) => {
            fail!("dtype mismatch for {}: stored as {}, requested {}", key, dtype, requested)
        }
        None => fail!("dtype mismatch for {}: requested type is not numeric", key),
    }
}

/// Ordered mapping of dataset keys to element types.
///
/// Keys are normalized to absolute paths on insertion, so `"features"` and
/// `"/features"` refer to the same entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    entries: Vec<(String, Dtype)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry, builder-style.
    pub fn with(mut self, key: &str, dtype: Dtype) -> Result<Self> {
        self.insert(key, dtype)?;
        Ok(self)
    }

    /// Adds an entry; replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: &str, dtype: Dtype) -> Result<()> {
        let key = normalize_key(key)?;
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = dtype,
            None => self.entries.push((key, dtype)),
        }
        Ok(())
    }

    /// Builds a schema from `(key, dtype)` pairs, failing on the first invalid key.
    pub fn from_entries<'k, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'k str, Dtype)>,
    {
        let mut schema = Self::new();
        for (key, dtype) in entries {
            schema.insert(key, dtype)?;
        }
        Ok(schema)
    }

    pub fn get(&self, key: &str) -> Option<Dtype> {
        let key = normalize_key(key).ok()?;
        self.entries.iter().find(|(k, _)| *k == key).map(|&(_, dtype)| dtype)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> slice::Iter<(String, Dtype)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a (String, Dtype);
    type IntoIter = slice::Iter<'a, (String, Dtype)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
pub mod tests {
    use hdf5::types::{FloatSize, IntSize, TypeDescriptor};

    use super::{check_dtype, Dtype, Schema};

    #[test]
    pub fn test_dtype_of() {
        assert_eq!(Dtype::of::<f64>(), Some(Dtype::Float64));
        assert_eq!(Dtype::of::<f32>(), Some(Dtype::Float32));
        assert_eq!(Dtype::of::<i8>(), Some(Dtype::Int8));
        assert_eq!(Dtype::of::<u64>(), Some(Dtype::UInt64));
        assert_eq!(Dtype::of::<bool>(), None);
        assert_eq!(
            Dtype::from_descriptor(&TypeDescriptor::Integer(IntSize::U2)),
            Some(Dtype::Int16)
        );
        assert_eq!(
            Dtype::from_descriptor(&TypeDescriptor::Float(FloatSize::U8)),
            Some(Dtype::Float64)
        );
        assert_eq!(Dtype::from_descriptor(&TypeDescriptor::VarLenUnicode), None);
    }

    #[test]
    pub fn test_dtype_size_name() {
        assert_eq!(Dtype::Float64.size(), 8);
        assert_eq!(Dtype::UInt16.size(), 2);
        assert_eq!(Dtype::Float32.to_string(), "float32");
    }

    #[test]
    pub fn test_check_dtype() {
        assert!(check_dtype::<f64>(Dtype::Float64, "/x").is_ok());
        let err = check_dtype::<f32>(Dtype::Float64, "/x").unwrap_err();
        assert_eq!(err.to_string(), "dtype mismatch for /x: stored as float64, requested float32");
        assert!(check_dtype::<bool>(Dtype::UInt8, "/x").is_err());
    }

    #[test]
    pub fn test_schema() {
        let schema = Schema::new()
            .with("/features", Dtype::Float64)
            .unwrap()
            .with("targets", Dtype::Float32)
            .unwrap()
            .with("features", Dtype::Int32)
            .unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["/features", "/targets"]);
        assert_eq!(schema.get("features"), Some(Dtype::Int32));
        assert_eq!(schema.get("/targets"), Some(Dtype::Float32));
        assert_eq!(schema.get("/labels"), None);
        assert!(!schema.contains(""));
        assert!(Schema::new().is_empty());
        assert!(Schema::new().with("/", Dtype::Float64).is_err());
    }

    #[test]
    pub fn test_schema_from_entries() {
        let schema =
            Schema::from_entries(vec![("features", Dtype::Float64), ("targets", Dtype::Float64)])
                .unwrap();
        assert_eq!(schema.iter().count(), 2);
        assert!(Schema::from_entries(vec![("", Dtype::Float64)]).is_err());
    }
}
