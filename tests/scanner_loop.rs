use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use parts_scanner::detail::{InventoryHandler, ResumeHandle};
use parts_scanner::{
    Camera, Classifier, Confirmation, DetectionPolicy, Fault, Frame, Overlay, Prediction, Preview,
    QuitHandle, QuitSignal, RunSummary, Scanner, ScannerOptions, StopReason,
};

#[derive(Default)]
struct Events {
    opens: u32,
    reads: u32,
    releases: u32,
    renders: u32,
    closes: u32,
    pauses: u32,
    pumps: u32,
    shown: Vec<String>,
}

type Shared = Rc<RefCell<Events>>;

struct FakeCamera {
    events: Shared,
    fail_open: bool,
    fail_on_read: Option<u32>,
}

impl Camera for FakeCamera {
    fn open(&mut self) -> Result<()> {
        self.events.borrow_mut().opens += 1;
        if self.fail_open {
            bail!("no such device");
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Frame> {
        let mut events = self.events.borrow_mut();
        events.reads += 1;
        if Some(events.reads) == self.fail_on_read {
            bail!("usb disconnect");
        }
        Frame::from_rgb(vec![0; 2 * 2 * 3], 2, 2, u64::from(events.reads))
    }

    fn release(&mut self) -> Result<()> {
        self.events.borrow_mut().releases += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "fake camera".to_string()
    }
}

struct ScriptedClassifier {
    script: Vec<(&'static str, f32)>,
    next: usize,
    fail_at: Option<usize>,
}

impl ScriptedClassifier {
    fn new(script: &[(&'static str, f32)]) -> Self {
        Self {
            script: script.to_vec(),
            next: 0,
            fail_at: None,
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn predict(&mut self, _frame: &Frame) -> Result<Prediction> {
        let index = self.next;
        self.next += 1;
        if Some(index) == self.fail_at {
            return Err(anyhow!("model crashed"));
        }
        let (label, confidence) = self.script[index % self.script.len()];
        Ok(Prediction {
            label: label.to_string(),
            confidence,
            distribution: vec![],
        })
    }
}

enum Behaviour {
    ResumeOnShow,
    ResumeAfterPumps(u32),
    DropHandle,
    FailShow,
    FailPump,
    QuitAfterPumps(u32, QuitHandle),
}

struct FakeHandler {
    events: Shared,
    behaviour: Behaviour,
    held: Option<ResumeHandle>,
    pumps_since_show: u32,
}

impl InventoryHandler for FakeHandler {
    fn show(&mut self, confirmation: &Confirmation, resume: ResumeHandle) -> Result<()> {
        self.events
            .borrow_mut()
            .shown
            .push(confirmation.label.clone());
        self.pumps_since_show = 0;
        match self.behaviour {
            Behaviour::ResumeOnShow => resume.resume(),
            Behaviour::DropHandle => drop(resume),
            Behaviour::FailShow => bail!("inventory offline"),
            Behaviour::ResumeAfterPumps(_)
            | Behaviour::QuitAfterPumps(..)
            | Behaviour::FailPump => {
                self.held = Some(resume)
            }
        }
        Ok(())
    }

    fn pump(&mut self) -> Result<()> {
        self.events.borrow_mut().pumps += 1;
        self.pumps_since_show += 1;
        match &self.behaviour {
            Behaviour::ResumeAfterPumps(n) if self.pumps_since_show >= *n => {
                if let Some(handle) = self.held.take() {
                    handle.resume();
                }
            }
            Behaviour::QuitAfterPumps(n, quit) if self.pumps_since_show >= *n => quit.request(),
            Behaviour::FailPump => bail!("inventory window crashed"),
            _ => {}
        }
        Ok(())
    }
}

struct FakePreview {
    events: Shared,
    fail_on_render: Option<u32>,
}

impl Preview for FakePreview {
    fn render(&mut self, _frame: &Frame, _overlay: &Overlay) -> Result<()> {
        let mut events = self.events.borrow_mut();
        events.renders += 1;
        if Some(events.renders) == self.fail_on_render {
            bail!("display lost");
        }
        Ok(())
    }

    fn paused(&mut self, _confirmation: &Confirmation) {
        self.events.borrow_mut().pauses += 1;
    }

    fn close(&mut self) {
        self.events.borrow_mut().closes += 1;
    }
}

fn policy() -> DetectionPolicy {
    DetectionPolicy::new(0.5, 3, "none", ["bolt", "nut"]).unwrap()
}

fn options(max_frames: Option<u64>) -> ScannerOptions {
    ScannerOptions {
        max_frames,
        poll_interval: Duration::from_millis(1),
        target_fps: 0,
    }
}

struct Rig {
    events: Shared,
    camera: FakeCamera,
    handler: FakeHandler,
    preview: FakePreview,
}

fn rig(behaviour: Behaviour) -> Rig {
    let events: Shared = Rc::default();
    Rig {
        camera: FakeCamera {
            events: events.clone(),
            fail_open: false,
            fail_on_read: None,
        },
        handler: FakeHandler {
            events: events.clone(),
            behaviour,
            held: None,
            pumps_since_show: 0,
        },
        preview: FakePreview {
            events: events.clone(),
            fail_on_render: None,
        },
        events,
    }
}

fn run(
    rig: Rig,
    classifier: ScriptedClassifier,
    quit: QuitSignal,
    max_frames: Option<u64>,
) -> (Result<RunSummary>, Shared) {
    let events = rig.events.clone();
    let mut scanner = Scanner::new(
        rig.camera,
        classifier,
        rig.handler,
        rig.preview,
        policy(),
        quit,
        options(max_frames),
    );
    let result = scanner.run();
    if matches!(&result, Ok(summary) if summary.stop == StopReason::FrameLimit) {
        assert!(!scanner.machine().is_paused());
    }
    (result, events)
}

#[test]
fn routes_each_confirmation_to_the_handler() {
    let classifier = ScriptedClassifier::new(&[
        ("none", 0.99),
        ("bolt", 0.9),
        ("bolt", 0.8),
        ("bolt", 0.7),
        ("nut", 0.6),
        ("nut", 0.6),
        ("nut", 0.5),
        ("none", 0.99),
    ]);
    let (result, events) = run(
        rig(Behaviour::ResumeOnShow),
        classifier,
        QuitSignal::new(),
        Some(8),
    );

    let summary = result.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            frames: 8,
            confirmations: 2,
            stop: StopReason::FrameLimit,
        }
    );
    let events = events.borrow();
    assert_eq!(events.shown, vec!["bolt", "nut"]);
    assert_eq!(events.pauses, 2);
    assert_eq!(events.renders, 8);
    assert_eq!(events.opens, 1);
    assert_eq!(events.releases, 1);
    assert_eq!(events.closes, 1);
}

#[test]
fn no_frames_are_read_while_paused() {
    let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    let (result, events) = run(
        rig(Behaviour::ResumeAfterPumps(5)),
        classifier,
        QuitSignal::new(),
        Some(3),
    );

    let summary = result.unwrap();
    assert_eq!(summary.confirmations, 1);
    let events = events.borrow();
    assert_eq!(events.reads, 3);
    assert_eq!(events.pumps, 5);
}

#[test]
fn resume_starts_a_fresh_streak() {
    // The pause after frame 3 must not carry the streak over: frames 4..=6
    // form a second confirmation and frame 7 starts a third streak.
    let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    let (result, events) = run(
        rig(Behaviour::ResumeOnShow),
        classifier,
        QuitSignal::new(),
        Some(7),
    );

    assert_eq!(result.unwrap().confirmations, 2);
    assert_eq!(events.borrow().shown, vec!["bolt", "bolt"]);
}

#[test]
fn quit_while_paused_releases_once() {
    let quit = QuitSignal::new();
    let handle = quit.handle();
    let classifier = ScriptedClassifier::new(&[("nut", 0.9)]);
    let (result, events) = run(
        rig(Behaviour::QuitAfterPumps(2, handle)),
        classifier,
        quit,
        None,
    );

    let summary = result.unwrap();
    assert_eq!(summary.stop, StopReason::Quit);
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.confirmations, 1);
    let events = events.borrow();
    assert_eq!(events.pumps, 2);
    assert_eq!(events.releases, 1);
    assert_eq!(events.closes, 1);
}

#[test]
fn quit_before_first_frame() {
    let quit = QuitSignal::new();
    quit.handle().request();
    let classifier = ScriptedClassifier::new(&[("nut", 0.9)]);
    let (result, events) = run(rig(Behaviour::ResumeOnShow), classifier, quit, None);

    let summary = result.unwrap();
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.stop, StopReason::Quit);
    assert_eq!(events.borrow().releases, 1);
}

#[test]
fn acquisition_error_is_fatal_and_releases() {
    let mut rig = rig(Behaviour::ResumeOnShow);
    rig.camera.fail_on_read = Some(2);
    let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    let (result, events) = run(rig, classifier, QuitSignal::new(), None);

    let err = result.unwrap_err();
    assert_eq!(Fault::of(&err), Some(Fault::Acquisition));
    assert!(format!("{:#}", err).contains("usb disconnect"));
    let events = events.borrow();
    assert_eq!(events.releases, 1);
    assert_eq!(events.closes, 1);
    assert!(events.shown.is_empty());
}

#[test]
fn failed_open_still_releases() {
    let mut rig = rig(Behaviour::ResumeOnShow);
    rig.camera.fail_open = true;
    let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    let (result, events) = run(rig, classifier, QuitSignal::new(), None);

    assert_eq!(Fault::of(&result.unwrap_err()), Some(Fault::Acquisition));
    let events = events.borrow();
    assert_eq!(events.reads, 0);
    assert_eq!(events.releases, 1);
    assert_eq!(events.closes, 1);
}

#[test]
fn inference_error_is_fatal_and_releases() {
    let mut classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    classifier.fail_at = Some(1);
    let (result, events) = run(
        rig(Behaviour::ResumeOnShow),
        classifier,
        QuitSignal::new(),
        None,
    );

    let err = result.unwrap_err();
    assert_eq!(Fault::of(&err), Some(Fault::Inference));
    let events = events.borrow();
    assert_eq!(events.renders, 1);
    assert_eq!(events.releases, 1);
}

#[test]
fn pump_error_is_an_inventory_fault_and_releases() {
    let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    let (result, events) = run(
        rig(Behaviour::FailPump),
        classifier,
        QuitSignal::new(),
        None,
    );

    let err = result.unwrap_err();
    assert_eq!(Fault::of(&err), Some(Fault::Inventory));
    assert!(format!("{:#}", err).contains("inventory window crashed"));
    let events = events.borrow();
    assert_eq!(events.shown, vec!["bolt"]);
    assert_eq!(events.pumps, 1);
    assert_eq!(events.releases, 1);
    assert_eq!(events.closes, 1);
}

#[test]
fn render_error_is_a_display_fault_and_releases() {
    let mut rig = rig(Behaviour::ResumeOnShow);
    rig.preview.fail_on_render = Some(2);
    let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
    let (result, events) = run(rig, classifier, QuitSignal::new(), None);

    let err = result.unwrap_err();
    assert_eq!(Fault::of(&err), Some(Fault::Display));
    assert!(format!("{:#}", err).contains("display lost"));
    let events = events.borrow();
    assert_eq!(events.reads, 2);
    assert_eq!(events.releases, 1);
    assert_eq!(events.closes, 1);
}

#[test]
fn dropped_or_failed_handler_counts_as_resume() {
    for behaviour in [Behaviour::DropHandle, Behaviour::FailShow] {
        let classifier = ScriptedClassifier::new(&[("bolt", 0.9)]);
        let (result, events) = run(rig(behaviour), classifier, QuitSignal::new(), Some(6));

        let summary = result.unwrap();
        assert_eq!(summary.confirmations, 2);
        assert_eq!(summary.stop, StopReason::FrameLimit);
        assert_eq!(events.borrow().releases, 1);
    }
}

#[test]
fn low_confidence_never_confirms() {
    let classifier = ScriptedClassifier::new(&[("bolt", 0.49), ("bolt", 0.9), ("bolt", 0.9)]);
    let (result, events) = run(
        rig(Behaviour::ResumeOnShow),
        classifier,
        QuitSignal::new(),
        Some(9),
    );

    assert_eq!(result.unwrap().confirmations, 0);
    assert!(events.borrow().shown.is_empty());
}
