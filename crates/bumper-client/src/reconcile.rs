use std::collections::VecDeque;

use bumper_core::net::messages::{MoveAction, MovementInputMsg};
use bumper_core::player::PlayerId;
use bumper_pong::InputIntent;

use crate::config::SyncConfig;

/// A local input the server has not confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingInput {
    pub sequence: u32,
    pub action: MoveAction,
    pub pressed: bool,
    pub timestamp_ms: f64,
}

/// Predicts the local paddle's keys immediately and corrects them from
/// the server's echoes.
#[derive(Debug, Clone)]
pub struct InputReconciler {
    player_id: PlayerId,
    intent: InputIntent,
    next_sequence: u32,
    last_confirmed: u32,
    pending: VecDeque<PendingInput>,
    authoritative_x: Option<f32>,
    last_soft_sync_ms: Option<f64>,
    soft_sync_interval_ms: f64,
    soft_sync_threshold: f32,
    soft_sync_blend: f32,
    pending_timeout_ms: f64,
}

impl InputReconciler {
    pub fn new(player_id: PlayerId, config: &SyncConfig) -> Self {
        Self {
            player_id,
            intent: InputIntent::default(),
            next_sequence: 1,
            last_confirmed: 0,
            pending: VecDeque::new(),
            authoritative_x: None,
            last_soft_sync_ms: None,
            soft_sync_interval_ms: config.soft_sync_interval_ms,
            soft_sync_threshold: config.soft_sync_threshold,
            soft_sync_blend: config.soft_sync_blend,
            pending_timeout_ms: config.pending_timeout_ms,
        }
    }

    /// Keys as currently predicted.
    pub fn intent(&self) -> InputIntent {
        self.intent
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingInput> {
        self.pending.iter()
    }

    pub fn pending_sequences(&self) -> Vec<u32> {
        self.pending.iter().map(|p| p.sequence).collect()
    }

    pub fn last_confirmed(&self) -> u32 {
        self.last_confirmed
    }

    /// Record a key change, apply it at once and return the message to send.
    pub fn submit(&mut self, action: MoveAction, pressed: bool, now_ms: f64) -> MovementInputMsg {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.intent.set(action, pressed);
        self.pending.push_back(PendingInput {
            sequence,
            action,
            pressed,
            timestamp_ms: now_ms,
        });
        MovementInputMsg::new(action, sequence, pressed, self.player_id)
    }

    /// Handle the server's echo. Returns `false` for a stale echo.
    ///
    /// The echoed press/release overwrites the predicted flag, then inputs
    /// for the same action that are still in flight are replayed on top.
    pub fn on_echo(&mut self, action: MoveAction, signed_sequence: i32) -> bool {
        let sequence = signed_sequence.unsigned_abs();
        if sequence == 0 || sequence <= self.last_confirmed {
            tracing::trace!(sequence, last = self.last_confirmed, "Dropping stale echo");
            return false;
        }
        self.last_confirmed = sequence;
        self.pending.retain(|p| p.sequence > sequence);

        self.intent.set(action, signed_sequence > 0);
        for p in self.pending.iter().filter(|p| p.action == action) {
            self.intent.set(action, p.pressed);
        }
        true
    }

    pub fn set_authoritative_x(&mut self, x: f32) {
        self.authoritative_x = Some(x);
    }

    pub fn authoritative_x(&self) -> Option<f32> {
        self.authoritative_x
    }

    /// Blend part of the drift from the server's paddle position into
    /// `local_x`, at most once per interval. Returns whether it moved.
    pub fn soft_reconcile(&mut self, local_x: &mut f32, now_ms: f64) -> bool {
        let Some(target) = self.authoritative_x else {
            return false;
        };
        if let Some(last) = self.last_soft_sync_ms
            && now_ms - last < self.soft_sync_interval_ms
        {
            return false;
        }
        self.last_soft_sync_ms = Some(now_ms);

        let diff = target - *local_x;
        if diff.abs() <= self.soft_sync_threshold {
            return false;
        }
        *local_x += diff * self.soft_sync_blend;
        tracing::trace!(diff, "Soft paddle correction");
        true
    }

    /// Abandon inputs left unconfirmed past the timeout. Returns how many.
    pub fn prune(&mut self, now_ms: f64) -> usize {
        let before = self.pending.len();
        let timeout = self.pending_timeout_ms;
        self.pending.retain(|p| now_ms - p.timestamp_ms <= timeout);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Pruned unconfirmed inputs");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> InputReconciler {
        InputReconciler::new(7, &SyncConfig::default())
    }

    #[test]
    fn submit_signs_sequence_and_predicts() {
        let mut r = reconciler();
        let press = r.submit(MoveAction::MoveLeft, true, 0.0);
        assert_eq!(press.content, 1);
        assert_eq!(press.player_id, 7);
        assert!(r.intent().moves_left);

        let release = r.submit(MoveAction::MoveLeft, false, 5.0);
        assert_eq!(release.content, -2);
        assert!(!r.intent().moves_left);
    }

    #[test]
    fn echo_confirms_up_to_its_sequence() {
        let mut r = reconciler();
        for i in 0..5 {
            let pressed = i % 2 == 0;
            r.submit(MoveAction::MoveRight, pressed, f64::from(i));
        }
        assert!(r.on_echo(MoveAction::MoveRight, 3));
        assert_eq!(r.pending_sequences(), vec![4, 5]);
    }

    #[test]
    fn stale_echo_is_dropped() {
        let mut r = reconciler();
        r.submit(MoveAction::MoveLeft, true, 0.0);
        r.submit(MoveAction::MoveLeft, false, 1.0);
        assert!(r.on_echo(MoveAction::MoveLeft, -2));
        assert!(!r.on_echo(MoveAction::MoveLeft, 1));
        assert!(!r.intent().moves_left);
    }

    #[test]
    fn echo_corrects_flag_but_keeps_newer_press() {
        let mut r = reconciler();
        r.submit(MoveAction::MoveLeft, true, 0.0);
        r.submit(MoveAction::MoveLeft, false, 1.0);
        r.submit(MoveAction::MoveLeft, true, 2.0);
        // Server saw only the release so far.
        assert!(r.on_echo(MoveAction::MoveLeft, -2));
        assert!(r.intent().moves_left, "in-flight press must survive");
        assert_eq!(r.pending_sequences(), vec![3]);
    }

    #[test]
    fn echo_heals_lost_release() {
        let mut r = reconciler();
        r.submit(MoveAction::MoveRight, true, 0.0);
        r.submit(MoveAction::MoveRight, false, 1.0);
        // Prediction got out of step, e.g. after a focus loss.
        r.intent.set(MoveAction::MoveRight, true);
        r.on_echo(MoveAction::MoveRight, -2);
        assert!(!r.intent().moves_right);
        assert_eq!(r.pending().count(), 0);
    }

    #[test]
    fn soft_reconcile_blends_beyond_threshold() {
        let mut r = reconciler();
        let mut x = 0.0;
        assert!(!r.soft_reconcile(&mut x, 0.0), "no authority yet");

        r.set_authoritative_x(1.0);
        assert!(r.soft_reconcile(&mut x, 0.0));
        assert!((x - 0.3).abs() < 1e-6);

        // Rate limited.
        assert!(!r.soft_reconcile(&mut x, 50.0));
        assert!(r.soft_reconcile(&mut x, 100.0));
        assert!((x - 0.51).abs() < 1e-5);
    }

    #[test]
    fn soft_reconcile_ignores_small_drift() {
        let mut r = reconciler();
        let mut x = 2.0;
        r.set_authoritative_x(2.1);
        assert!(!r.soft_reconcile(&mut x, 0.0));
        assert_eq!(x, 2.0);
    }

    #[test]
    fn prune_drops_inputs_older_than_timeout() {
        let mut r = reconciler();
        r.submit(MoveAction::MoveLeft, true, 0.0);
        r.submit(MoveAction::MoveLeft, false, 600.0);
        assert_eq!(r.prune(1000.0), 0);
        assert_eq!(r.prune(1200.0), 1);
        assert_eq!(r.pending_sequences(), vec![2]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pending_never_holds_confirmed_sequences(
                submits in 1usize..40,
                echoes in proptest::collection::vec(1i32..40, 0..20),
            ) {
                let mut r = reconciler();
                for i in 0..submits {
                    r.submit(MoveAction::MoveLeft, i % 2 == 0, i as f64);
                }
                for echo in echoes {
                    r.on_echo(MoveAction::MoveLeft, echo);
                    let confirmed = r.last_confirmed();
                    prop_assert!(r.pending().all(|p| p.sequence > confirmed));
                }
                let seqs = r.pending_sequences();
                prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
