use std::fmt;

/// A named byte payload: one file's worth of archive content.
///
/// `name` is archive-relative and forward-slash separated; a trailing `/`
/// marks a directory entry with no data.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    pub name: String,
    pub data: Vec<u8>,
}

impl Payload {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// A directory entry (name gets a trailing slash if missing)
    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            data: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}
