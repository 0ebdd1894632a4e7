//! Property types and typed accessors.

/// A single property belonging to a device-tree node.
#[derive(Debug, Clone, Copy)]
pub struct FdtProperty<'a> {
    name: &'a str,
    data: &'a [u8],
}

impl<'a> FdtProperty<'a> {
    pub(crate) fn new(name: &'a str, data: &'a [u8]) -> Self {
        Self { name, data }
    }

    /// Returns the property name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the raw property data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the length of the property data in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the property carries no data (present but empty).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Interprets the property as a big-endian `u32`. Returns `None` if
    /// fewer than 4 bytes are present.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Interprets the property as a big-endian `u64`. Returns `None` if
    /// fewer than 8 bytes are present.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.data.get(..8)?.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    /// Interprets the property as a NUL-terminated UTF-8 string, stripping
    /// one trailing NUL if present.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        let bytes = if self.data.last() == Some(&0) {
            &self.data[..self.data.len() - 1]
        } else {
            self.data
        };
        core::str::from_utf8(bytes).ok()
    }

    /// Returns an iterator over a NUL-separated string list, as used by
    /// `compatible` properties.
    #[must_use]
    pub fn as_str_list(&self) -> StrListIter<'a> {
        StrListIter { data: self.data }
    }
}

/// Iterator over a NUL-separated string-list property.
pub struct StrListIter<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for StrListIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let end = self.data.iter().position(|&b| b == 0).unwrap_or(self.data.len());
        let s = core::str::from_utf8(&self.data[..end]).ok()?;
        self.data = if end < self.data.len() {
            &self.data[end + 1..]
        } else {
            &[]
        };
        if s.is_empty() { None } else { Some(s) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_roundtrip() {
        let p = FdtProperty::new("freq", &[0x00, 0x00, 0x27, 0x10]);
        assert_eq!(p.as_u32(), Some(10000));
    }

    #[test]
    fn str_strips_trailing_nul() {
        let p = FdtProperty::new("model", b"test-board\0");
        assert_eq!(p.as_str(), Some("test-board"));
    }

    #[test]
    fn str_list_splits_on_nul() {
        let p = FdtProperty::new("compatible", b"a,b\0c,d\0");
        let items: alloc::vec::Vec<&str> = p.as_str_list().collect();
        assert_eq!(items, ["a,b", "c,d"]);
    }

    #[test]
    fn empty_property_is_empty() {
        let p = FdtProperty::new("ranges", &[]);
        assert!(p.is_empty());
        assert_eq!(p.as_u32(), None);
    }
}

#[cfg(test)]
extern crate alloc;
