use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use target_locator::{FixtureDom, FixtureElement};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tour_engine::{
    DiscardReason, RenderState, StaticCatalogProvider, TourController, TourEvent, TourHost,
    TourPhase,
};
use tourguide_core_types::{PageId, Rect, Side, StepDescriptor, TargetSelector, TourCatalog, Viewport};
use tourguide_policy_center::TourPolicy;

const A: &str = "[data-tour=\"page-a\"]";
const B: &str = "[data-tour=\"page-b\"]";

#[derive(Default)]
struct CountingHost {
    callbacks: AtomicUsize,
}

impl TourHost for CountingHost {
    fn on_close(&self) {
        self.callbacks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self) {
        self.callbacks.fetch_add(1, Ordering::SeqCst);
    }
}

fn catalog(prefix: &str, selector: &str, len: usize) -> TourCatalog {
    let steps = (0..len)
        .map(|i| {
            StepDescriptor::new(format!("{prefix}-{i}"), TargetSelector::query(selector), "Step")
                .with_side(Side::Right)
        })
        .collect();
    TourCatalog::new(steps).expect("valid catalog")
}

fn setup() -> (TourController, Arc<FixtureDom>, Arc<CountingHost>) {
    let provider = StaticCatalogProvider::new()
        .with_page("/pageA", catalog("a", A, 3))
        .with_page("/pageB", catalog("b", B, 2))
        .with_page(
            "/welcome",
            TourCatalog::new(vec![
                StepDescriptor::new("hello", TargetSelector::Body, "Hello").with_side(Side::Center)
            ])
            .expect("valid catalog"),
        );
    let dom = Arc::new(
        FixtureDom::new(Viewport::new(1024.0, 768.0))
            .with_element(FixtureElement::new("a", [A]).with_rect(Rect::new(300.0, 200.0, 120.0, 40.0)))
            .with_element(FixtureElement::new("b", [B]).with_rect(Rect::new(500.0, 300.0, 80.0, 30.0))),
    );
    let host = Arc::new(CountingHost::default());
    let controller = TourController::new(
        Arc::new(provider),
        dom.clone(),
        host.clone(),
        &TourPolicy::default(),
    );
    (controller, dom, host)
}

async fn wait_render<F>(rx: &mut watch::Receiver<RenderState>, mut ready: F) -> RenderState
where
    F: FnMut(&RenderState) -> bool,
{
    timeout(Duration::from_secs(10), rx.wait_for(|state| ready(state)))
        .await
        .expect("render state never matched")
        .expect("render channel closed")
        .clone()
}

#[tokio::test(start_paused = true)]
async fn reopening_on_another_page_stops_the_old_tracking_loop() {
    let (controller, dom, host) = setup();
    let mut render = controller.subscribe();

    controller.open("/pageA");
    controller.next();
    wait_render(&mut render, |s| s.index() == Some(1) && s.tooltip.is_some()).await;
    sleep(Duration::from_millis(100)).await;
    let old_loop = controller.tracking_probe().expect("step task");
    assert!(old_loop.ticks() > 0);
    let old_session = controller.session_id();

    assert!(controller.open("/pageB"));
    assert_eq!(controller.phase(), TourPhase::Active { index: 0 });
    assert_eq!(controller.page(), Some(PageId::from("/pageB")));
    assert_eq!(controller.generation(), 2);
    assert_ne!(controller.session_id(), old_session);

    sleep(Duration::from_millis(1)).await;
    assert!(old_loop.is_cancelled());
    assert!(old_loop.is_finished());
    let frozen = old_loop.ticks();

    dom.clear_query_log();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(old_loop.ticks(), frozen);
    assert_eq!(dom.query_count(A), 0);
    assert!(dom.query_count(B) > 0);

    let state = controller.render_state();
    assert_eq!(state.page, Some(PageId::from("/pageB")));
    assert_eq!(state.session, controller.session_id());
    assert_eq!(host.callbacks.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn back_to_back_opens_never_touch_the_first_page() {
    let (controller, dom, _host) = setup();
    let mut events = controller.events();

    controller.open("/pageA");
    controller.open("/pageB");
    sleep(Duration::from_millis(300)).await;

    assert_eq!(dom.query_count(A), 0);
    let first = match events.try_recv() {
        Ok(TourEvent::Opened { session, .. }) => session,
        other => panic!("unexpected first event: {other:?}"),
    };
    let mut discarded = false;
    while let Ok(event) = events.try_recv() {
        match event {
            TourEvent::Discarded { session, reason } => {
                assert_eq!(session, first);
                assert_eq!(reason, DiscardReason::Replaced);
                discarded = true;
            }
            TourEvent::Placed { session, .. } => assert_ne!(session, first),
            _ => {}
        }
    }
    assert!(discarded);
}

#[tokio::test(start_paused = true)]
async fn page_change_restarts_at_first_step() {
    let (controller, _dom, host) = setup();
    let mut render = controller.subscribe();

    controller.open("/pageA");
    controller.go_to(2);
    let session = controller.session_id();

    controller.page_changed("/pageB/");
    assert_eq!(controller.phase(), TourPhase::Active { index: 0 });
    assert_eq!(controller.session_id(), session);
    let state = wait_render(&mut render, |s| s.page == Some(PageId::from("/pageB")) && s.tooltip.is_some()).await;
    assert_eq!(state.step_count, 2);
    assert_eq!(state.step.map(|s| s.id), Some("b-0".to_string()));

    // same page again is not a navigation
    controller.next();
    controller.page_changed("/pageB");
    assert_eq!(controller.phase(), TourPhase::Active { index: 1 });

    controller.page_changed("/nowhere");
    assert!(controller.phase().is_closed());
    assert_eq!(host.callbacks.load(Ordering::SeqCst), 0);
    wait_render(&mut render, RenderState::is_closed).await;
}

#[tokio::test(start_paused = true)]
async fn page_change_without_a_session_does_nothing() {
    let (controller, dom, _host) = setup();
    controller.page_changed("/pageA");
    sleep(Duration::from_millis(50)).await;
    assert!(controller.phase().is_closed());
    assert!(dom.query_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn tracking_follows_layout_shifts_and_stays_quiet_otherwise() {
    let (controller, dom, _host) = setup();
    let mut render = controller.subscribe();

    controller.open("/pageA");
    let placed = wait_render(&mut render, |s| s.tooltip.is_some()).await;
    assert_eq!(placed.highlight, Some(Rect::new(296.0, 196.0, 128.0, 48.0)));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(controller.render_state().revision, placed.revision);

    dom.set_rects("a", vec![Rect::new(300.0, 260.0, 120.0, 40.0)])
        .expect("element exists");
    let moved = wait_render(&mut render, |s| s.revision > placed.revision).await;
    assert_eq!(moved.highlight, Some(Rect::new(296.0, 256.0, 128.0, 48.0)));
    assert_eq!(moved.index(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn body_steps_recentre_on_resize() {
    let (controller, dom, _host) = setup();
    let mut render = controller.subscribe();

    controller.open("/welcome");
    let first = wait_render(&mut render, |s| s.tooltip.is_some()).await;
    assert_eq!(first.tooltip, Some(Rect::new(320.0, 184.0, 384.0, 400.0)));
    // whole-viewport steps have nothing to track
    sleep(Duration::from_millis(10)).await;
    assert!(controller.tracking_probe().is_some_and(|probe| probe.is_finished()));

    dom.set_viewport(Viewport::new(1200.0, 800.0));
    controller.viewport_changed();
    let resized = wait_render(&mut render, |s| s.revision > first.revision).await;
    assert_eq!(resized.tooltip, Some(Rect::new(408.0, 200.0, 384.0, 400.0)));
    assert_eq!(resized.side, Some(Side::Center));
    assert_eq!(resized.highlight, None);
}

#[tokio::test(start_paused = true)]
async fn scrolled_viewport_reports_document_coordinates() {
    let (controller, dom, _host) = setup();
    dom.set_viewport(Viewport::new(1024.0, 768.0).with_scroll(0.0, 500.0));
    let mut render = controller.subscribe();

    controller.open("/pageB");
    let state = wait_render(&mut render, |s| s.tooltip.is_some()).await;
    assert_eq!(state.side, Some(Side::Right));
    assert_eq!(state.highlight, Some(Rect::new(496.0, 796.0, 88.0, 38.0)));
    assert_eq!(state.tooltip.map(|t| t.left), Some(600.0));
}

#[tokio::test(start_paused = true)]
async fn page_change_during_completion_restarts_without_completing() {
    let (controller, _dom, host) = setup();
    let mut render = controller.subscribe();

    controller.open("/pageA");
    let session = controller.session_id();
    controller.go_to(2);
    controller.next();
    assert_eq!(controller.phase(), TourPhase::Completing);
    let timer = controller.completion_probe().expect("completion timer");

    controller.page_changed("/pageB");
    assert_eq!(controller.phase(), TourPhase::Active { index: 0 });
    assert_eq!(controller.page(), Some(PageId::from("/pageB")));
    assert_eq!(controller.session_id(), session);
    assert!(controller.completion_probe().is_none());

    sleep(Duration::from_millis(1)).await;
    assert!(timer.is_cancelled());
    assert!(timer.is_finished());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(host.callbacks.load(Ordering::SeqCst), 0);
    assert_eq!(controller.phase(), TourPhase::Active { index: 0 });
    let state = wait_render(&mut render, |s| {
        s.page == Some(PageId::from("/pageB")) && s.tooltip.is_some()
    })
    .await;
    assert_eq!(state.step_count, 2);
}

#[tokio::test(start_paused = true)]
async fn page_change_to_an_empty_page_during_completion_drops_the_timer() {
    let (controller, _dom, host) = setup();

    controller.open("/pageA");
    controller.go_to(2);
    controller.next();
    let timer = controller.completion_probe().expect("completion timer");

    controller.page_changed("/nowhere");
    assert!(controller.phase().is_closed());

    sleep(Duration::from_millis(1)).await;
    assert!(timer.is_cancelled());
    assert!(timer.is_finished());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(host.callbacks.load(Ordering::SeqCst), 0);
    assert!(controller.render_state().is_closed());
}

#[tokio::test(start_paused = true)]
async fn reopening_during_completion_cancels_the_old_timer() {
    let (controller, _dom, host) = setup();

    controller.open("/pageA");
    controller.go_to(2);
    controller.next();
    let timer = controller.completion_probe().expect("completion timer");

    assert!(controller.open("/pageB"));
    assert_eq!(controller.generation(), 2);
    assert_eq!(controller.phase(), TourPhase::Active { index: 0 });

    sleep(Duration::from_millis(1)).await;
    assert!(timer.is_cancelled());
    assert!(timer.is_finished());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(host.callbacks.load(Ordering::SeqCst), 0);
    assert_eq!(controller.phase(), TourPhase::Active { index: 0 });
    assert_eq!(controller.page(), Some(PageId::from("/pageB")));
}
