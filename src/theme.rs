use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;
use serde::{Deserialize, Serialize};
use slabmap::SlabMap;

use crate::Subscription;

#[cfg(test)]
mod tests;

/// Primary color used while no theme color has been set.
pub const DEFAULT_COLOR_PRIMARY: Color = Color(0xFF00_897B);

thread_local! {
    static GLOBAL: ThemeRegistry = ThemeRegistry::default();
}

/// ARGB color.
///
/// `Color(0)` means "unset" wherever a theme color is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const UNSET: Self = Self(0);

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
    pub fn or(self, fallback: Color) -> Color {
        if self.is_unset() {
            fallback
        } else {
            self
        }
    }
}
impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// Visual theme broadcast by a [`ThemeRegistry`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThemeColor {
    pub color_primary: Color,
}
impl ThemeColor {
    pub const fn new(color_primary: Color) -> Self {
        Self { color_primary }
    }
}

/// A component that can apply a broadcast theme.
pub trait Themeable {
    fn apply_theme(&self, theme: &ThemeColor);
}

/// Broadcasts the current [`ThemeColor`] to registered [`Themeable`]s.
///
/// The registry holds its subscribers weakly; the [`Subscription`] returned by
/// [`register`](Self::register) removes the entry when dropped.
#[derive_ex(Clone)]
pub struct ThemeRegistry(Rc<RegistryNode>);

impl ThemeRegistry {
    /// Create a registry that resolves unset primary colors to `fallback_primary`.
    pub fn new(fallback_primary: Color) -> Self {
        Self(Rc::new(RegistryNode {
            current: Cell::new(ThemeColor::default()),
            fallback_primary,
            entries: RefCell::new(SlabMap::new()),
        }))
    }

    /// Returns the registry shared by the current thread.
    pub fn global() -> Self {
        GLOBAL.with(|r| r.clone())
    }

    /// Returns the active theme with unset colors resolved.
    pub fn current(&self) -> ThemeColor {
        self.0.resolved()
    }

    /// Changes the active theme and applies it to every live subscriber.
    pub fn set_theme(&self, theme: ThemeColor) {
        self.0.current.set(theme);
        self.0.broadcast();
    }

    /// Registers `themeable` and applies the current theme to it immediately.
    pub fn register<T: Themeable + 'static>(&self, themeable: &Rc<T>) -> Subscription {
        themeable.apply_theme(&self.current());
        let weak: Weak<T> = Rc::downgrade(themeable);
        let weak: Weak<dyn Themeable> = weak;
        let id = self.0.entries.borrow_mut().insert(weak);
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<RegistryNode>| {
            node.entries.borrow_mut().remove(id);
        })
    }

    /// Number of registrations whose [`Subscription`] is still alive.
    pub fn len(&self) -> usize {
        self.0.entries.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR_PRIMARY)
    }
}
impl std::fmt::Debug for ThemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeRegistry")
            .field("current", &self.current())
            .field("len", &self.len())
            .finish()
    }
}

struct RegistryNode {
    current: Cell<ThemeColor>,
    fallback_primary: Color,
    entries: RefCell<SlabMap<Weak<dyn Themeable>>>,
}
impl RegistryNode {
    fn resolved(&self) -> ThemeColor {
        let theme = self.current.get();
        ThemeColor {
            color_primary: theme.color_primary.or(self.fallback_primary),
        }
    }

    fn broadcast(&self) {
        let theme = self.resolved();
        // Dead entries are removed by their subscription, which owns the slot id.
        let entries: Vec<Weak<dyn Themeable>> = self.entries.borrow().values().cloned().collect();
        tracing::trace!(color_primary = %theme.color_primary, entries = entries.len(), "broadcast theme");
        for themeable in entries.iter().filter_map(Weak::upgrade) {
            themeable.apply_theme(&theme);
        }
    }
}
