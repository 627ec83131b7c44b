use docflow_cli::Interrupt;
use tokio::runtime::Runtime;

#[test]
fn raised_interrupt_is_taken_once() {
    let interrupt = Interrupt::default();
    assert!(!interrupt.take());
    interrupt.raise();
    assert!(interrupt.take());
    assert!(!interrupt.take());
}

#[test]
fn clones_share_the_latch() {
    let runtime = Runtime::new().unwrap();
    let interrupt = Interrupt::listen(runtime.handle());
    let other = interrupt.clone();
    other.raise();
    assert!(interrupt.take());
    assert!(!other.take());
}
