use crate::channel::PerfectChannel;
use crate::rdt::{RdtConfig, Role};
use crate::sim::Session;
use crate::viz::{VizEvent, VizEventKind, VizLogger};

#[test]
fn viz_event_json_is_flat_and_tagged() {
    let ev = VizEvent {
        tick: 3,
        role: Role::Sender,
        kind: VizEventKind::SendData {
            seqnum: 5,
            len: 4,
            retrans: true,
        },
    };
    let v = serde_json::to_value(&ev).expect("serialize event");
    assert_eq!(v["kind"], "send_data");
    assert_eq!(v["role"], "sender");
    assert_eq!(v["tick"], 3);
    assert_eq!(v["seqnum"], 5);
    assert_eq!(v["retrans"], true);

    let back: VizEvent = serde_json::from_value(v).expect("deserialize event");
    assert_eq!(back, ev);
}

#[test]
fn session_records_both_sides_when_enabled() {
    let mut s = Session::new(
        RdtConfig::default(),
        "HELLOWORLD",
        Box::new(PerfectChannel::new(1)),
        Box::new(PerfectChannel::new(1)),
    )
    .expect("valid config");
    s.enable_viz();
    s.run_until(100);

    let viz: &VizLogger = s.viz.as_ref().expect("viz enabled");
    assert_eq!(viz.count(|e| e.kind == VizEventKind::Done), 2);
    assert_eq!(
        viz.count(|e| e.role == Role::Sender && matches!(e.kind, VizEventKind::SendData { .. })),
        3
    );
    assert!(viz.count(|e| e.role == Role::Receiver && matches!(e.kind, VizEventKind::SendAck { .. })) >= 1);
    assert!(viz.events.windows(2).all(|w| w[0].tick <= w[1].tick));
}

#[test]
fn disabled_viz_records_nothing() {
    let mut s = Session::new(
        RdtConfig::default(),
        "abc",
        Box::new(PerfectChannel::new(1)),
        Box::new(PerfectChannel::new(1)),
    )
    .expect("valid config");
    s.run_until(100);
    assert!(s.viz.is_none());
}
