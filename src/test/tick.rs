use crate::sim::Tick;

#[test]
fn tick_arithmetic() {
    assert_eq!(Tick::ZERO.next(), Tick(1));
    assert_eq!(Tick(3).after(4), Tick(7));
    assert_eq!(Tick(7).since(Tick(3)), 4);
    assert_eq!(Tick(3).since(Tick(7)), 0);
}

#[test]
fn tick_arithmetic_saturates_on_overflow() {
    assert_eq!(Tick(u64::MAX).next(), Tick(u64::MAX));
    assert_eq!(Tick(u64::MAX).after(10), Tick(u64::MAX));
}
