//! Per-view query state.
//!
//! A view follows one key at a time. When the key changes the observer goes
//! back to fetching and, with `keep_previous` set, keeps the last successful
//! data displayable as a placeholder until the new result arrives. Results for
//! a key that is no longer current are discarded, so the last requested key
//! always wins.

/// Lifecycle of the current key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Fetching,
    Success,
    Error,
}

/// What happened to a delivered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// The result belonged to a key that is no longer current.
    Discarded,
}

#[derive(Debug, Clone)]
struct Settled<K, V> {
    key: K,
    data: V,
}

/// State machine `idle -> fetching -> {success, error}` for one view.
#[derive(Debug, Clone)]
pub struct QueryObserver<K, V> {
    keep_previous: bool,
    current: Option<K>,
    status: QueryStatus,
    last_success: Option<Settled<K, V>>,
    error: Option<String>,
}

impl<K: PartialEq + Clone, V> QueryObserver<K, V> {
    #[must_use]
    pub const fn new(keep_previous: bool) -> Self {
        Self {
            keep_previous,
            current: None,
            status: QueryStatus::Idle,
            last_success: None,
            error: None,
        }
    }

    /// Point the view at `key`.
    ///
    /// Moving to a new key, or retrying a failed one, starts a fetch. Returns
    /// `true` when a fetch was started.
    pub fn observe(&mut self, key: K) -> bool {
        let same_key = self.current.as_ref() == Some(&key);
        if same_key && self.status != QueryStatus::Error {
            return false;
        }

        if !same_key && !self.keep_previous {
            self.last_success = None;
        }
        self.current = Some(key);
        self.status = QueryStatus::Fetching;
        self.error = None;
        true
    }

    /// Deliver the outcome of a fetch for `key`.
    ///
    /// An observer that is not following any key yet adopts `key`.
    pub fn resolve(&mut self, key: &K, result: Result<V, String>) -> Resolution {
        match &self.current {
            Some(current) if current != key => return Resolution::Discarded,
            Some(_) => {}
            None => self.current = Some(key.clone()),
        }

        match result {
            Ok(data) => {
                self.last_success = Some(Settled {
                    key: key.clone(),
                    data,
                });
                self.status = QueryStatus::Success;
                self.error = None;
            }
            Err(message) => {
                self.status = QueryStatus::Error;
                self.error = Some(message);
            }
        }
        Resolution::Applied
    }

    #[must_use]
    pub const fn status(&self) -> QueryStatus {
        self.status
    }

    #[must_use]
    pub const fn current_key(&self) -> Option<&K> {
        self.current.as_ref()
    }

    /// Data to display: the current key's result, or while fetching a new
    /// key, the previous key's result.
    #[must_use]
    pub fn data(&self) -> Option<&V> {
        let settled = self.last_success.as_ref()?;
        if self.current.as_ref() == Some(&settled.key) || self.keep_previous {
            Some(&settled.data)
        } else {
            None
        }
    }

    /// Whether [`Self::data`] belongs to a different key than the current one.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.last_success
            .as_ref()
            .is_some_and(|settled| self.current.as_ref() != Some(&settled.key))
    }

    /// Message of the last failed fetch of the current key.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
