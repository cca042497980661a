//! Abstractions for pagination.

use std::num::NonZeroUsize;

/// A page of nodes.
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Nodes on this [`Page`].
    pub nodes: Vec<I>,

    /// [`Arguments`] this [`Page`] was selected with.
    pub arguments: Arguments,
}

impl<I> Page<I> {
    /// Creates a new [`Page`] out of the provided nodes.
    #[must_use]
    pub fn new(arguments: Arguments, nodes: impl IntoIterator<Item = I>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            arguments,
        }
    }

    /// Indicates whether this [`Page`] contains no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Page-based pagination arguments.
///
/// Pages are numbered starting from `1`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Arguments {
    /// Number of the requested page.
    page: NonZeroUsize,

    /// Maximum number of nodes on a page.
    ///
    /// [`None`] means that all the nodes are returned.
    size: Option<usize>,
}

impl Arguments {
    /// [`Arguments`] selecting all the nodes at once.
    pub const ALL: Self = Self {
        page: NonZeroUsize::MIN,
        size: None,
    };

    /// Creates new [`Arguments`].
    ///
    /// [`None`] is returned if the `page` is less than `1` or the `size` is
    /// negative.
    pub fn new<Num>(page: Num, size: Option<Num>) -> Option<Self>
    where
        Num: TryInto<usize>,
    {
        let page = NonZeroUsize::new(page.try_into().ok()?)?;
        let size = match size {
            Some(s) => Some(s.try_into().ok()?),
            None => None,
        };
        Some(Self { page, size })
    }

    /// Returns the number of the requested page.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page.get()
    }

    /// Returns the maximum number of nodes on a page, if any.
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Returns the number of nodes to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.size
            .map_or(0, |s| (self.page.get() - 1).saturating_mul(s))
    }

    /// Returns the number of nodes to take, if limited.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.size
    }

    /// Applies these [`Arguments`] to the provided ordered nodes.
    pub fn apply<I>(
        &self,
        nodes: impl IntoIterator<Item = I>,
    ) -> impl Iterator<Item = I> {
        nodes
            .into_iter()
            .skip(self.offset())
            .take(self.size.unwrap_or(usize::MAX))
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self::ALL
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty) => {
        #[doc = "A [`Page`] of [`$node`]s."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}
