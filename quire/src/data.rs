use core::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The bytes of a source file.
///
/// Cloning is cheap, all clones share the same buffer.
#[derive(Clone)]
pub struct PdfData {
    inner: Arc<dyn AsRef<[u8]> + Send + Sync>,
}

impl PdfData {
    /// The length of the data in bytes.
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Whether there is no data.
    pub fn is_empty(&self) -> bool {
        self.as_ref().is_empty()
    }
}

impl Debug for PdfData {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "PdfData {{ {} bytes }}", self.len())
    }
}

impl AsRef<[u8]> for PdfData {
    fn as_ref(&self) -> &[u8] {
        (*self.inner).as_ref()
    }
}

impl<T: AsRef<[u8]> + Send + Sync + 'static> From<Arc<T>> for PdfData {
    fn from(data: Arc<T>) -> Self {
        Self { inner: data }
    }
}

impl From<Vec<u8>> for PdfData {
    fn from(data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(data),
        }
    }
}

impl From<&'static [u8]> for PdfData {
    fn from(data: &'static [u8]) -> Self {
        Self {
            inner: Arc::new(data),
        }
    }
}
