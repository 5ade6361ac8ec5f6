use alloc::string::String;

/// Longest name, author, version, license or timestamp, in bytes.
pub const MAXIMUM_META_FIELD_LENGTH: usize = 50;
/// Longest description, in bytes.
pub const MAXIMUM_DESCRIPTION_LENGTH: usize = 254;

/// Truncates `value` to at most `max` bytes on a character boundary.
pub(crate) fn bounded(value: &str, max: usize) -> String {
    if value.len() <= max {
        return String::from(value);
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&value[..end])
}

/// Descriptive information embedded in a plugin binary.
///
/// Built once by the metadata factory and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInformation {
    name: String,
    author: String,
    version: String,
    license: String,
    build_timestamp: String,
    description: String,
    size: usize,
}

impl MetaInformation {
    pub fn new(name: &str) -> Self {
        Self {
            name: bounded(name, MAXIMUM_META_FIELD_LENGTH),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = bounded(author, MAXIMUM_META_FIELD_LENGTH);
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = bounded(version, MAXIMUM_META_FIELD_LENGTH);
        self
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.license = bounded(license, MAXIMUM_META_FIELD_LENGTH);
        self
    }

    pub fn with_build_timestamp(mut self, timestamp: &str) -> Self {
        self.build_timestamp = bounded(timestamp, MAXIMUM_META_FIELD_LENGTH);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = bounded(description, MAXIMUM_DESCRIPTION_LENGTH);
        self
    }

    /// Size of the plugin image as declared by the binary.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline]
    pub fn license(&self) -> &str {
        &self.license
    }

    #[inline]
    pub fn build_timestamp(&self) -> &str {
        &self.build_timestamp
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}
