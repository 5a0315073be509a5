use std::{cell::RefCell, rc::Rc};

use derive_ex::derive_ex;
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::{
    store::weak_listener, Color, PreferenceStore, Subscription, ThemeColor, ThemeRegistry,
    Themeable,
};


/// Construction parameters of a [`SyncedToggle`].
///
/// A toggle without a `key` keeps its state in memory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    pub key: Option<String>,
    pub default_state: bool,
}

impl ToggleConfig {
    /// Configuration bound to the preference `key`.
    pub fn new(key: impl Into<String>, default_state: bool) -> Self {
        Self {
            key: Some(key.into()),
            default_state,
        }
    }

    /// Configuration without persistence.
    pub fn ephemeral(default_state: bool) -> Self {
        Self {
            key: None,
            default_state,
        }
    }

    /// Parses a configuration from JSON, e.g. `{"key":"dark_mode","default_state":true}`.
    ///
    /// Missing fields take their default values.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError)
    }
}

#[derive(Debug, Display)]
#[display("invalid toggle configuration: {0}")]
pub struct ConfigError(serde_json::Error);

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Window visibility reported to [`SyncedToggle::on_visibility_changed`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display(style = "snake_case")]
pub enum Visibility {
    Visible,
    Invisible,
    Gone,
}

/// Boolean widget state bound to a [`PreferenceStore`] entry and to a [`ThemeRegistry`].
///
/// While a key is bound, the displayed state follows the store at construction,
/// on every store change of that key, and whenever the widget becomes visible again.
/// Store-originated updates never write back to the store.
///
/// Cloning yields another handle to the same toggle.
/// The store and theme registrations are released when the last handle is dropped.
#[derive_ex(Clone)]
pub struct SyncedToggle(Rc<ToggleNode>);

impl SyncedToggle {
    pub fn new(
        config: ToggleConfig,
        store: impl PreferenceStore + 'static,
        themes: &ThemeRegistry,
    ) -> Self {
        let ToggleConfig { key, default_state } = config;
        let node = Rc::new(ToggleNode {
            store: Rc::new(store),
            data: RefCell::new(ToggleData {
                key: None,
                default_state,
                displayed_state: default_state,
                rendered_color: Color::UNSET,
                store_sub: None,
                theme_sub: Subscription::empty(),
            }),
            on_state_changed: RefCell::new(None),
        });
        let theme_sub = themes.register(&node);
        node.data.borrow_mut().theme_sub = theme_sub;
        match key {
            Some(key) => node.rebind(Some(key)),
            None => node.set_state(default_state, false),
        }
        Self(node)
    }

    /// Create a toggle registered with [`ThemeRegistry::global`].
    pub fn with_global_theme(config: ToggleConfig, store: impl PreferenceStore + 'static) -> Self {
        Self::new(config, store, &ThemeRegistry::global())
    }

    pub fn key(&self) -> Option<String> {
        self.0.data.borrow().key.clone()
    }
    pub fn default_state(&self) -> bool {
        self.0.data.borrow().default_state
    }

    /// Returns the displayed on/off state.
    pub fn state(&self) -> bool {
        self.0.data.borrow().displayed_state
    }

    /// Returns `true` if a store listener is registered.
    pub fn is_subscribed(&self) -> bool {
        self.0.data.borrow().store_sub.is_some()
    }

    /// Primary color of the last applied theme.
    pub fn rendered_color(&self) -> Color {
        self.0.data.borrow().rendered_color
    }

    /// Sets the displayed state.
    ///
    /// If `persist` is `true`, the state is also written to the bound key (if any)
    /// and the state-change listener is notified.
    pub fn set_state(&self, state: bool, persist: bool) {
        self.0.set_state(state, persist)
    }

    /// Sets the state as a user interaction would.
    pub fn set_checked(&self, state: bool) {
        self.set_state(state, true)
    }

    /// Flips the state as a user interaction (e.g. a tap) would.
    pub fn toggle(&self) {
        self.set_checked(!self.state())
    }

    pub fn apply_theme(&self, theme: &ThemeColor) {
        self.0.apply_theme(theme)
    }

    /// Handles a change notification for `changed_key` from the store.
    pub fn on_store_changed(&self, changed_key: &str) {
        self.0.on_store_changed(changed_key)
    }

    /// Rereads the bound key, which may have been changed while the widget was hidden.
    pub fn on_became_visible(&self) {
        self.0.resync()
    }

    pub fn on_visibility_changed(&self, visibility: Visibility) {
        tracing::trace!(%visibility, "toggle visibility changed");
        if visibility == Visibility::Visible {
            self.on_became_visible()
        }
    }

    /// Binds the toggle to another key.
    ///
    /// With a key, the toggle stays subscribed to the store (at most one
    /// subscription per toggle) and resynchronizes from the new key.
    /// Without a key, the subscription is released and the displayed state is kept.
    pub fn rebind(&self, key: Option<&str>) {
        self.0.rebind(key.map(str::to_owned))
    }

    /// Sets the listener called when the state is changed by user interaction.
    ///
    /// Resynchronization from the store does not call the listener.
    pub fn set_on_state_changed(&self, f: impl Fn(bool) + 'static) {
        *self.0.on_state_changed.borrow_mut() = Some(Rc::new(f));
    }
    pub fn clear_on_state_changed(&self) {
        self.0.on_state_changed.borrow_mut().take();
    }
}
impl std::fmt::Debug for SyncedToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.data.try_borrow() {
            Ok(d) => f
                .debug_struct("SyncedToggle")
                .field("key", &d.key)
                .field("default_state", &d.default_state)
                .field("displayed_state", &d.displayed_state)
                .field("subscribed", &d.store_sub.is_some())
                .finish(),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

struct ToggleNode {
    store: Rc<dyn PreferenceStore>,
    data: RefCell<ToggleData>,
    on_state_changed: RefCell<Option<Rc<dyn Fn(bool)>>>,
}

struct ToggleData {
    key: Option<String>,
    default_state: bool,
    displayed_state: bool,
    rendered_color: Color,
    store_sub: Option<Subscription>,
    #[allow(unused)]
    theme_sub: Subscription,
}

impl ToggleNode {
    fn set_state(&self, state: bool, persist: bool) {
        let (changed, key) = {
            let mut d = self.data.borrow_mut();
            let changed = d.displayed_state != state;
            d.displayed_state = state;
            (changed, d.key.clone())
        };
        if !persist {
            return;
        }
        // The store notifies synchronously, so no borrow may be held here.
        if let Some(key) = key {
            self.store.put_bool(&key, state);
        }
        if changed {
            let f = self.on_state_changed.borrow().clone();
            if let Some(f) = f {
                f(state)
            }
        }
    }

    fn resync(&self) {
        let (key, default_state) = {
            let d = self.data.borrow();
            (d.key.clone(), d.default_state)
        };
        if let Some(key) = key {
            let state = self.store.get_bool(&key, default_state);
            tracing::debug!(key = key.as_str(), state, "resync toggle from store");
            self.set_state(state, false);
        }
    }

    fn on_store_changed(&self, changed_key: &str) {
        let is_bound = self.data.borrow().key.as_deref() == Some(changed_key);
        if is_bound {
            self.resync()
        }
    }

    fn rebind(self: &Rc<Self>, key: Option<String>) {
        tracing::debug!(key = ?key, "rebind toggle");
        let is_bound = key.is_some();
        let (released, need_sub) = {
            let mut d = self.data.borrow_mut();
            d.key = key;
            if is_bound {
                (None, d.store_sub.is_none())
            } else {
                (d.store_sub.take(), false)
            }
        };
        drop(released);
        if need_sub {
            // A store may deliver notifications from inside `subscribe`.
            let sub = self
                .store
                .subscribe(weak_listener(self, Self::on_store_changed));
            self.data.borrow_mut().store_sub = Some(sub);
        }
        if is_bound {
            self.resync()
        }
    }
}

impl Themeable for ToggleNode {
    fn apply_theme(&self, theme: &ThemeColor) {
        tracing::trace!(color_primary = %theme.color_primary, "apply theme to toggle");
        self.data.borrow_mut().rendered_color = theme.color_primary;
    }
}
