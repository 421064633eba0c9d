//! Allocation-free nullable wrapper.

/// A value that may be SQL NULL.
///
/// When `valid` is false the value was NULL and `value` holds `T::default()`.
/// Unlike `Option<T>` the payload is always present, so a `Vec<Nullable<T>>`
/// has the same layout whether or not elements are NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Nullable<T> {
    pub value: T,
    pub valid: bool,
}

impl<T> Nullable<T> {
    /// A non-NULL value.
    pub const fn new(value: T) -> Self {
        Self { value, valid: true }
    }

    /// Returns true if this is SQL NULL.
    pub const fn is_null(&self) -> bool {
        !self.valid
    }

    /// Borrow the value, `None` when NULL.
    pub fn get(&self) -> Option<&T> {
        self.valid.then_some(&self.value)
    }

    /// Convert into an `Option`, dropping the payload of a NULL.
    pub fn into_option(self) -> Option<T> {
        self.valid.then_some(self.value)
    }

    /// Map the payload, keeping validity.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Nullable<U> {
        Nullable {
            value: f(self.value),
            valid: self.valid,
        }
    }
}

impl<T: Default> Nullable<T> {
    /// SQL NULL.
    pub fn null() -> Self {
        Self {
            value: T::default(),
            valid: false,
        }
    }
}

impl<T: Default> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::new(v),
            None => Self::null(),
        }
    }
}
