use std::{
    any::Any,
    mem::take,
    rc::{Rc, Weak},
};


/// Handle to a registration with a [`PreferenceStore`](crate::PreferenceStore) or a [`ThemeRegistry`](crate::ThemeRegistry).
///
/// The registration is released when the handle is dropped.
#[derive(Default)]
#[must_use]
pub struct Subscription(RawSubscription);

impl Subscription {
    /// Create a handle that releases nothing.
    pub fn empty() -> Self {
        Subscription(RawSubscription::Empty)
    }

    /// Create a handle that calls `release` with the owner when dropped.
    ///
    /// Does nothing on drop if the owner has already been dropped.
    pub fn from_weak_fn<T: 'static>(owner: Weak<T>, release: impl Fn(Rc<T>) + 'static) -> Self {
        Subscription(RawSubscription::WeakFn {
            owner,
            release: Box::new(move |owner: Weak<dyn Any>| {
                if let Some(owner) = owner.upgrade() {
                    if let Ok(owner) = owner.downcast::<T>() {
                        release(owner)
                    }
                }
            }),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.0, RawSubscription::Empty)
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        match take(&mut self.0) {
            RawSubscription::Empty => {}
            RawSubscription::WeakFn { owner, release } => release(owner),
        }
    }
}
impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            RawSubscription::Empty => write!(f, "Subscription(<empty>)"),
            _ => write!(f, "Subscription(<active>)"),
        }
    }
}

#[derive(Default)]
enum RawSubscription {
    #[default]
    Empty,
    WeakFn {
        owner: Weak<dyn Any>,
        release: Box<dyn Fn(Weak<dyn Any>)>,
    },
}
