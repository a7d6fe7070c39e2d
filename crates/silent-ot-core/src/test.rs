//! OT test utilities.

use silent_core::Block;

/// Asserts that every message pair is correlated by `delta`.
pub fn assert_correlation(delta: Block, msgs: &[[Block; 2]]) {
    assert!(msgs.iter().all(|&[zero, one]| one == zero ^ delta));
}

/// Asserts the correctness of random oblivious transfer.
pub fn assert_rot<T: Copy + PartialEq>(choices: &[bool], msgs: &[[T; 2]], received: &[T]) {
    assert_eq!(choices.len(), msgs.len());
    assert_eq!(received.len(), msgs.len());
    assert!(choices.iter().zip(msgs.iter().zip(received)).all(
        |(&choice, (&msg, &received))| {
            if choice {
                received == msg[1]
            } else {
                received == msg[0]
            }
        }
    ));
}
