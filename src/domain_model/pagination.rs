use serde::Deserialize;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PaginationError {
    #[error("page size {limit} is not one of {allowed:?}")]
    LimitNotAllowed { limit: u32, allowed: Vec<u32> },
}

/// Page sizes a list view offers, plus the one it starts with.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PageLimits {
    allowed: Vec<u32>,
    default: u32,
}

impl PageLimits {
    pub fn new(allowed: Vec<u32>, default: u32) -> Result<Self, PaginationError> {
        if default == 0 || !allowed.contains(&default) {
            return Err(PaginationError::LimitNotAllowed {
                limit: default,
                allowed,
            });
        }
        Ok(Self { allowed, default })
    }

    pub fn allowed(&self) -> &[u32] {
        &self.allowed
    }

    pub fn default_limit(&self) -> u32 {
        self.default
    }

    pub fn check(&self, limit: u32) -> Result<u32, PaginationError> {
        if self.allowed.contains(&limit) {
            Ok(limit)
        } else {
            Err(PaginationError::LimitNotAllowed {
                limit,
                allowed: self.allowed.clone(),
            })
        }
    }
}

/// Client view of a server-paginated collection. `page` is 1-based and
/// never below 1; `total` is whatever the server last reported.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PaginationState {
    pub page: u64,
    pub limit: u32,
    pub total: u64,
}

impl PaginationState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: 0,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    /// Highest page a navigation may target. An empty collection still has
    /// page 1.
    pub fn last_page(&self) -> u64 {
        self.total_pages().max(1)
    }

    pub fn clamp_page(&self, page: u64) -> u64 {
        page.clamp(1, self.last_page())
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PageQuery {
    pub page: u64,
    pub limit: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// List response body. Posts report `total` at the top level, comments
/// nest it under `pagination`; the items key differs per collection.
#[derive(Debug, Deserialize)]
pub struct PageEnvelope<T> {
    #[serde(alias = "posts", alias = "comments")]
    pub items: Option<Vec<T>>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pagination: Option<PaginationEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct PaginationEnvelope {
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> From<PageEnvelope<T>> for Page<T> {
    fn from(envelope: PageEnvelope<T>) -> Self {
        let total = envelope
            .pagination
            .and_then(|p| p.total)
            .or(envelope.total)
            .unwrap_or(0);
        Page {
            items: envelope.items.unwrap_or_default(),
            total,
        }
    }
}
