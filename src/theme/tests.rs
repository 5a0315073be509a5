use super::*;
use assert_call::{call, CallRecorder};

struct Probe(&'static str);
impl Themeable for Probe {
    fn apply_theme(&self, theme: &ThemeColor) {
        call!("{}:{}", self.0, theme.color_primary);
    }
}

const RED: Color = Color(0xFFFF_0000);
const BLUE: Color = Color(0xFF00_00FF);

#[test]
fn color_display() {
    assert_eq!(RED.to_string(), "#FFFF0000");
    assert_eq!(Color::UNSET.to_string(), "#00000000");
}

#[test]
fn unset_resolves_to_fallback() {
    let registry = ThemeRegistry::new(BLUE);
    assert_eq!(registry.current().color_primary, BLUE);
    registry.set_theme(ThemeColor::new(RED));
    assert_eq!(registry.current().color_primary, RED);
    registry.set_theme(ThemeColor::new(Color::UNSET));
    assert_eq!(registry.current().color_primary, BLUE);
}

#[test]
fn register_applies_current_theme() {
    let mut cr = CallRecorder::new();
    let registry = ThemeRegistry::new(BLUE);
    registry.set_theme(ThemeColor::new(RED));
    let p = Rc::new(Probe("p"));
    let _s = registry.register(&p);
    cr.verify("p:#FFFF0000");
}

#[test]
fn broadcast_in_registration_order() {
    let mut cr = CallRecorder::new();
    let registry = ThemeRegistry::new(BLUE);
    let a = Rc::new(Probe("a"));
    let b = Rc::new(Probe("b"));
    let _sa = registry.register(&a);
    let _sb = registry.register(&b);
    cr.verify(["a:#FF0000FF", "b:#FF0000FF"]);

    registry.set_theme(ThemeColor::new(RED));
    cr.verify(["a:#FFFF0000", "b:#FFFF0000"]);
}

#[test]
fn drop_subscription_unregisters() {
    let mut cr = CallRecorder::new();
    let registry = ThemeRegistry::new(BLUE);
    let p = Rc::new(Probe("p"));
    let s = registry.register(&p);
    cr.verify("p:#FF0000FF");
    assert_eq!(registry.len(), 1);
    drop(s);
    assert!(registry.is_empty());
    registry.set_theme(ThemeColor::new(RED));
    cr.verify(());
}

#[test]
fn dropped_themeable_is_skipped() {
    let mut cr = CallRecorder::new();
    let registry = ThemeRegistry::new(BLUE);
    let p = Rc::new(Probe("p"));
    let _s = registry.register(&p);
    cr.verify("p:#FF0000FF");
    drop(p);
    registry.set_theme(ThemeColor::new(RED));
    cr.verify(());
}

#[test]
fn global_is_shared_within_thread() {
    let a = ThemeRegistry::global();
    let b = ThemeRegistry::global();
    a.set_theme(ThemeColor::new(RED));
    assert_eq!(b.current().color_primary, RED);
}

#[test]
fn theme_color_json() {
    let theme: ThemeColor = serde_json::from_str(r#"{"color_primary":4294901760}"#).unwrap();
    assert_eq!(theme, ThemeColor::new(RED));
}
