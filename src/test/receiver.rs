use crate::channel::{Channel, PerfectChannel};
use crate::rdt::{Endpoint, EndpointIo, Receiver, Segment, SegmentKind};

struct Wire {
    inbound: PerfectChannel,
    outbound: PerfectChannel,
}

impl Wire {
    fn new() -> Self {
        Self {
            inbound: PerfectChannel::new(0),
            outbound: PerfectChannel::new(0),
        }
    }

    fn deliver(&mut self, r: &mut Receiver, segs: Vec<Segment>) -> Vec<Segment> {
        for s in segs {
            self.inbound.send(s);
        }
        let mut io = EndpointIo::new(&mut self.inbound, &mut self.outbound);
        r.tick(&mut io);
        self.outbound.receive()
    }
}

fn data(seq: u64, payload: &str) -> Segment {
    Segment::data(seq, payload.as_bytes().to_vec())
}

#[test]
fn in_order_segments_are_delivered_and_acked_once_per_tick() {
    let mut r = Receiver::new();
    let mut w = Wire::new();

    let resp = w.deliver(&mut r, vec![data(1, "HELL"), data(5, "OWOR")]);
    assert_eq!(resp, vec![Segment::ack(9)]);
    assert_eq!(r.expected_seq(), 9);
    assert_eq!(r.data_received(), b"HELLOWOR");
    assert_eq!(r.delivered_chunks().len(), 2);
}

#[test]
fn out_of_order_segment_is_buffered_and_nacked() {
    let mut r = Receiver::new();
    let mut w = Wire::new();

    let resp = w.deliver(&mut r, vec![data(1, "HELL"), data(9, "LD")]);
    assert_eq!(resp, vec![Segment::nack(5)]);
    assert_eq!(r.data_received_lossy(), "HELL");
    assert_eq!(r.reorder_buffer().keys().copied().collect::<Vec<_>>(), vec![9]);
    assert_eq!(r.stats().buffered, 1);

    let resp = w.deliver(&mut r, vec![data(5, "OWOR")]);
    assert_eq!(resp, vec![Segment::ack(11)]);
    assert!(r.reorder_buffer().is_empty());
    assert_eq!(r.data_received_lossy(), "HELLOWORLD");
    let chunks: Vec<&[u8]> = r.delivered_chunks().iter().map(|c| c.as_slice()).collect();
    assert_eq!(chunks, vec![&b"HELL"[..], &b"OWOR"[..], &b"LD"[..]]);
}

#[test]
fn arrival_order_within_a_tick_does_not_matter() {
    let mut r = Receiver::new();
    let mut w = Wire::new();

    let resp = w.deliver(&mut r, vec![data(9, "LD"), data(5, "OWOR"), data(1, "HELL")]);
    assert_eq!(resp, vec![Segment::ack(11)]);
    assert_eq!(r.data_received_lossy(), "HELLOWORLD");
    assert_eq!(r.stats().buffered, 2);
}

#[test]
fn nothing_is_delivered_while_the_gap_persists() {
    let mut r = Receiver::new();
    let mut w = Wire::new();

    let resp = w.deliver(&mut r, vec![data(5, "OWOR"), data(9, "LD")]);
    assert_eq!(resp, vec![Segment::nack(1)]);
    assert!(r.data_received().is_empty());
    assert_eq!(r.delivered_len(), 0);
}

#[test]
fn duplicate_is_discarded_but_reacked() {
    let mut r = Receiver::new();
    let mut w = Wire::new();
    w.deliver(&mut r, vec![data(1, "HELL")]);

    let resp = w.deliver(&mut r, vec![data(1, "HELL")]);
    assert_eq!(resp, vec![Segment::ack(5)]);
    assert_eq!(r.data_received(), b"HELL");
    assert_eq!(r.stats().duplicates, 1);
    assert_eq!(r.stats().acks_sent, 2);
}

#[test]
fn duplicate_of_buffered_segment_is_not_buffered_twice() {
    let mut r = Receiver::new();
    let mut w = Wire::new();
    w.deliver(&mut r, vec![data(5, "OWOR"), data(5, "OWOR")]);
    assert_eq!(r.reorder_buffer().len(), 1);
    assert_eq!(r.stats().buffered, 1);
    assert_eq!(r.stats().duplicates, 1);
}

#[test]
fn corrupt_segment_is_dropped_silently() {
    let mut r = Receiver::new();
    let mut w = Wire::new();

    let mut bad = data(1, "HELL");
    bad.flip_payload_bit(2, 3);
    let resp = w.deliver(&mut r, vec![bad]);
    assert!(resp.is_empty(), "corrupt data must be neither acked nor nacked");
    assert!(r.data_received().is_empty());
    assert_eq!(r.stats().corrupt_dropped, 1);
}

#[test]
fn corrupt_alongside_valid_only_acks_the_valid_one() {
    let mut r = Receiver::new();
    let mut w = Wire::new();

    let mut bad = data(5, "OWOR");
    bad.flip_payload_bit(0, 0);
    let resp = w.deliver(&mut r, vec![data(1, "HELL"), bad]);
    assert_eq!(resp, vec![Segment::ack(5)]);
    assert_eq!(r.data_received(), b"HELL");
}

#[test]
fn idle_tick_emits_nothing() {
    let mut r = Receiver::new();
    let mut w = Wire::new();
    assert!(w.deliver(&mut r, Vec::new()).is_empty());
    assert_eq!(r.now().0, 1);
}

#[test]
fn acknowledgment_segments_are_ignored() {
    let mut r = Receiver::new();
    let mut w = Wire::new();
    let resp = w.deliver(&mut r, vec![Segment::ack(3), Segment::nack(1)]);
    assert!(resp.is_empty());
    assert_eq!(r.expected_seq(), 1);
}

#[test]
fn overlapping_segment_delivers_only_the_missing_tail() {
    let mut r = Receiver::new();
    let mut w = Wire::new();
    w.deliver(&mut r, vec![data(1, "HELL")]);

    let resp = w.deliver(&mut r, vec![data(3, "LLOW")]);
    assert_eq!(resp, vec![Segment::ack(7)]);
    assert_eq!(r.data_received_lossy(), "HELLOW");
}

#[test]
fn receiver_detects_completion_and_keeps_reacking() {
    let mut r = Receiver::new().expect_len(6);
    let mut w = Wire::new();

    w.deliver(&mut r, vec![data(1, "HELL")]);
    assert!(!r.is_done());
    w.deliver(&mut r, vec![data(5, "OW")]);
    assert!(r.is_done());
    assert_eq!(r.done_time().map(|t| t.0), Some(2));

    let resp = w.deliver(&mut r, vec![data(5, "OW")]);
    assert_eq!(resp.len(), 1);
    assert_eq!(resp[0].kind(), SegmentKind::Ack);
    assert_eq!(resp[0].seqnum(), 7);
}
