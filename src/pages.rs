use std::{collections::BTreeMap, rc::Rc};

use parse_display::Display;

#[cfg(test)]
mod tests;

/// Returned when a page position is outside `0..count`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    #[display("page position {position} out of range (count {count})")]
    OutOfRange { position: usize, count: usize },
}

impl std::error::Error for PageError {}

struct PageSpec<C> {
    build: Box<dyn Fn() -> C>,
    title: String,
}

/// Accumulates page build functions and titles in position order.
pub struct PagesBuilder<C> {
    specs: Vec<PageSpec<C>>,
}

impl<C: 'static> PagesBuilder<C> {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Appends a page at the next position.
    pub fn add(mut self, build: impl Fn() -> C + 'static, title: impl Into<String>) -> Self {
        self.specs.push(PageSpec {
            build: Box::new(build),
            title: title.into(),
        });
        self
    }

    pub fn build(self) -> PageSpecs<C> {
        PageSpecs(self.specs.into())
    }
}
impl<C: 'static> Default for PagesBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable, ordered page specifications produced by [`PagesBuilder::build`].
pub struct PageSpecs<C>(Rc<[PageSpec<C>]>);

impl<C> PageSpecs<C> {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn title(&self, position: usize) -> Option<&str> {
        self.0.get(position).map(|spec| spec.title.as_str())
    }
}
impl<C> Clone for PageSpecs<C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Listener called with each newly materialized page.
pub type InstantiateListener<C> = Box<dyn FnMut(usize, &C)>;

/// Lazily built pages indexed by position.
///
/// The host container decides which positions are active by calling
/// [`instantiate`](Self::instantiate) and [`destroy`](Self::destroy).
/// The cache holds exactly the positions that are instantiated and not yet destroyed;
/// it never builds or evicts a page on its own.
pub struct LazyPageCache<C> {
    specs: PageSpecs<C>,
    materialized: BTreeMap<usize, C>,
    listener: Option<InstantiateListener<C>>,
}

impl<C: Clone + 'static> LazyPageCache<C> {
    pub fn new(specs: PageSpecs<C>) -> Self {
        Self {
            specs,
            materialized: BTreeMap::new(),
            listener: None,
        }
    }

    pub fn count(&self) -> usize {
        self.specs.len()
    }

    /// Returns the title of the page at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position >= self.count()`.
    pub fn title_at(&self, position: usize) -> &str {
        match self.specs.title(position) {
            Some(title) => title,
            None => panic!("{}", self.out_of_range(position)),
        }
    }

    /// Returns the page at `position`, building it if it is not materialized.
    ///
    /// The listener is notified only when the page is built.
    ///
    /// # Panics
    ///
    /// Panics if `position >= self.count()`.
    pub fn instantiate(&mut self, position: usize) -> C {
        match self.try_instantiate(position) {
            Ok(page) => page,
            Err(e) => panic!("{e}"),
        }
    }

    /// Same as [`instantiate`](Self::instantiate), but returns an error for an out-of-range position.
    pub fn try_instantiate(&mut self, position: usize) -> Result<C, PageError> {
        if let Some(page) = self.materialized.get(&position) {
            return Ok(page.clone());
        }
        let spec = self
            .specs
            .0
            .get(position)
            .ok_or_else(|| self.out_of_range(position))?;
        let page = (spec.build)();
        tracing::debug!(position, title = spec.title.as_str(), "materialize page");
        self.materialized.insert(position, page.clone());
        if let Some(listener) = &mut self.listener {
            listener(position, &page);
        }
        Ok(page)
    }

    /// Forgets the page at `position`. Does nothing if it is not materialized.
    pub fn destroy(&mut self, position: usize) {
        if self.materialized.remove(&position).is_some() {
            tracing::debug!(position, "destroy page");
        }
    }

    /// Returns the page at `position` if it is currently materialized.
    pub fn get_stored(&self, position: usize) -> Option<C> {
        self.materialized.get(&position).cloned()
    }

    /// Replaces the instantiation listener.
    ///
    /// Pages that are already materialized are not reported.
    pub fn set_listener(&mut self, listener: impl FnMut(usize, &C) + 'static) {
        self.listener = Some(Box::new(listener));
    }
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Positions currently materialized, in ascending order.
    pub fn materialized_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.materialized.keys().copied()
    }

    fn out_of_range(&self, position: usize) -> PageError {
        PageError::OutOfRange {
            position,
            count: self.count(),
        }
    }
}
impl<C> std::fmt::Debug for LazyPageCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyPageCache")
            .field("count", &self.specs.len())
            .field("materialized", &self.materialized.keys().collect::<Vec<_>>())
            .finish()
    }
}
