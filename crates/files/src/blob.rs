use crate::FilesError;

/// A file to upload: a relative, slash-separated name and its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedBlob {
    name: String,
    bytes: Vec<u8>,
}

impl NamedBlob {
    /// Validates `name` and pairs it with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] if the name is absolute, contains a backslash, has an
    /// empty, `.` or `..` component, or a component with surrounding whitespace.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, FilesError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), FilesError> {
    if name.is_empty() {
        return Err(FilesError::InvalidPath("name is empty".into()));
    }
    if name.starts_with('/') || name.contains('\\') {
        return Err(FilesError::InvalidPath(format!(
            "name must be a relative slash-separated path: '{name}'"
        )));
    }
    if name
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(FilesError::InvalidPath(format!(
            "name has an empty or relative component: '{name}'"
        )));
    }
    // Manifest names are stored trimmed.
    if name.split('/').any(|part| part.trim() != part) {
        return Err(FilesError::InvalidPath(format!(
            "name component has surrounding whitespace: '{name}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_relative_names() {
        let blob = NamedBlob::new("Organization/550e8400-e29b-41d4-a716-446655440000", vec![1])
            .unwrap();
        assert_eq!(blob.name(), "Organization/550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(blob.bytes(), &[1]);
    }

    #[test]
    fn rejects_unsafe_names() {
        for name in [
            "",
            "/etc/passwd",
            "a/../b",
            "../x",
            "a//b",
            "a/",
            "./a",
            "a\\b",
            " Patient/x",
            "Patient/x ",
            "Patient /x",
            "a/\tb",
        ] {
            assert!(
                matches!(NamedBlob::new(name, vec![]), Err(FilesError::InvalidPath(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
