// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fast_mode_advances_without_sleeping() {
    let mut clock = SimClock::new(SimMode::Fast);
    let started = std::time::Instant::now();
    clock.wait(3600.0).await;
    clock.wait(0.5).await;
    assert_eq!(clock.now(), 3600.5);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn realtime_mode_sleeps_the_wait() {
    let mut clock = SimClock::new(SimMode::Realtime);
    let started = tokio::time::Instant::now();
    clock.wait(2.0).await;
    assert_eq!(clock.now(), 2.0);
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn zero_and_negative_waits_are_no_ops() {
    let mut clock = SimClock::new(SimMode::Fast);
    clock.wait(0.0).await;
    clock.wait(-5.0).await;
    assert_eq!(clock.now(), 0.0);
}
