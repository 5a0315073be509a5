use super::*;
use assert_call::{call, CallRecorder};
use rstest::rstest;

#[derive(Debug)]
struct Page(&'static str);

fn page(name: &'static str) -> impl Fn() -> Rc<Page> {
    move || {
        call!("build {}", name);
        Rc::new(Page(name))
    }
}

fn two_pages() -> LazyPageCache<Rc<Page>> {
    LazyPageCache::new(
        PagesBuilder::new()
            .add(page("A"), "One")
            .add(page("B"), "Two")
            .build(),
    )
}

fn record(cache: &mut LazyPageCache<Rc<Page>>) {
    cache.set_listener(|position, page: &Rc<Page>| call!("listener {} {}", position, page.0));
}

#[test]
fn count_and_titles() {
    let cache = two_pages();
    assert_eq!(cache.count(), 2);
    assert_eq!(cache.title_at(0), "One");
    assert_eq!(cache.title_at(1), "Two");
}

#[test]
fn empty_builder() {
    let specs = PagesBuilder::<Rc<Page>>::default().build();
    assert!(specs.is_empty());
    assert_eq!(LazyPageCache::new(specs).count(), 0);
}

#[test]
fn nothing_is_built_up_front() {
    let mut cr = CallRecorder::new();
    let cache = two_pages();
    assert!(cache.get_stored(0).is_none());
    assert_eq!(cache.materialized_positions().count(), 0);
    cr.verify(());
}

#[test]
fn instantiate_then_get_stored_is_same() {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    let p = cache.instantiate(1);
    cr.verify("build B");
    let stored = cache.get_stored(1).unwrap();
    assert!(Rc::ptr_eq(&p, &stored));
    assert!(cache.get_stored(0).is_none());
}

#[test]
fn destroy_then_get_stored_is_none() {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    cache.instantiate(0);
    cr.verify("build A");
    cache.destroy(0);
    assert!(cache.get_stored(0).is_none());
    cache.destroy(0);
    cache.destroy(1);
}

#[test]
fn cache_hit_neither_builds_nor_notifies() {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    record(&mut cache);
    let p0 = cache.instantiate(0);
    cr.verify(["build A", "listener 0 A"]);
    let p1 = cache.instantiate(0);
    cr.verify(());
    assert!(Rc::ptr_eq(&p0, &p1));
}

#[test]
fn reinstantiate_after_destroy_is_fresh() {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    record(&mut cache);
    let p0 = cache.instantiate(0);
    cr.verify(["build A", "listener 0 A"]);
    cache.destroy(0);
    let p1 = cache.instantiate(0);
    cr.verify(["build A", "listener 0 A"]);
    assert!(!Rc::ptr_eq(&p0, &p1));
}

#[test]
fn set_listener_is_not_retroactive() {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    cache.instantiate(0);
    cr.verify("build A");
    record(&mut cache);
    cr.verify(());
    cache.instantiate(1);
    cr.verify(["build B", "listener 1 B"]);
}

#[test]
fn set_listener_replaces_previous() {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    cache.set_listener(|position, _: &Rc<Page>| call!("first {}", position));
    cache.set_listener(|position, _: &Rc<Page>| call!("second {}", position));
    cache.instantiate(0);
    cr.verify(["build A", "second 0"]);
    cache.clear_listener();
    cache.instantiate(1);
    cr.verify("build B");
}

#[test]
fn materialized_positions_follow_host() {
    let mut cache = LazyPageCache::new(
        PagesBuilder::new()
            .add(|| 0, "a")
            .add(|| 1, "b")
            .add(|| 2, "c")
            .build(),
    );
    cache.instantiate(2);
    cache.instantiate(0);
    cache.instantiate(1);
    cache.destroy(1);
    assert_eq!(cache.materialized_positions().collect::<Vec<_>>(), vec![0, 2]);
}

#[rstest]
fn try_instantiate_out_of_range(#[values(2, 3, usize::MAX)] position: usize) {
    let mut cr = CallRecorder::new();
    let mut cache = two_pages();
    assert_eq!(
        cache.try_instantiate(position).unwrap_err(),
        PageError::OutOfRange { position, count: 2 }
    );
    assert!(cache.get_stored(position).is_none());
    cr.verify(());
}

#[test]
#[should_panic(expected = "page position 2 out of range (count 2)")]
fn instantiate_out_of_range_panics() {
    two_pages().instantiate(2);
}

#[test]
#[should_panic(expected = "page position 5 out of range (count 2)")]
fn title_at_out_of_range_panics() {
    two_pages().title_at(5);
}
