//! Multi-round sequences and idle auto-stop.

#[cfg(test)]
mod tests {
    use dicearena_types::{ArenaConfig, ArenaError, ArenaEvent, Outcome};

    use crate::mocks::TestTable;
    use crate::scheduler::TimerKind;

    fn test_config() -> ArenaConfig {
        ArenaConfig {
            betting_ms: 1_000,
            roll_delay_ms: 500,
            sequence_start_delay_ms: 200,
            inter_round_delay_ms: 300,
            max_sequence_rounds: 20,
            idle_round_limit: 3,
            ..ArenaConfig::default()
        }
    }

    fn rounds_opened(table: &TestTable) -> usize {
        table
            .events
            .iter()
            .filter(|event| matches!(event, ArenaEvent::RoundOpened { .. }))
            .count()
    }

    /// Fire timers until the next round opens. Returns false if none did.
    fn advance_to_next_open(table: &mut TestTable) -> bool {
        let before = rounds_opened(table);
        while table.fire_next().is_some() {
            if rounds_opened(table) > before {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_sequence_validation() {
        let mut table = TestTable::new(-3, test_config());
        assert_eq!(
            table.engine().start_sequence(0),
            Err(ArenaError::InvalidSequenceLength)
        );
        assert_eq!(
            table.engine().start_sequence(21),
            Err(ArenaError::SequenceLimitExceeded {
                requested: 21,
                max: 20
            })
        );

        table.engine().open_round(0).expect("open");
        assert_eq!(
            table.engine().start_sequence(2),
            Err(ArenaError::RoundAlreadyActive)
        );
        table.engine().stop_round(1).expect("stop");

        table.engine().start_sequence(2).expect("start");
        assert_eq!(
            table.engine().start_sequence(2),
            Err(ArenaError::SequenceAlreadyActive)
        );
        assert_eq!(
            table.engine().open_round(2),
            Err(ArenaError::SequenceAlreadyActive)
        );
    }

    #[test]
    fn test_sequence_runs_to_completion() {
        let mut table =
            TestTable::new(-3, test_config()).with_rolls(&[(1, 2), (3, 4), (5, 6)]);
        let start = table.engine().start_sequence(3).expect("start");
        assert_eq!(start.starts_in_ms, 200);

        for round in 1..=3u64 {
            assert!(advance_to_next_open(&mut table), "round {round} should open");
            let now = table.now_ms();
            table
                .engine()
                .place_bet(1, "p", Outcome::Small, 10, now)
                .expect("bet");
        }
        table.run_until_idle(10);

        assert_eq!(rounds_opened(&table), 3);
        assert_eq!(table.arena.history().len(), 3);
        assert!(table.arena.sequence().is_none());
        assert!(table.arena.is_quiet());
        assert_eq!(table.event_names().last(), Some(&"sequence_completed"));

        let advanced: Vec<u32> = table
            .events
            .iter()
            .filter_map(|event| match event {
                ArenaEvent::SequenceAdvanced { completed, .. } => Some(*completed),
                _ => None,
            })
            .collect();
        assert_eq!(advanced, vec![1, 2]);
    }

    #[test]
    fn test_sequence_round_timing() {
        let mut table = TestTable::new(-3, test_config());
        table.engine().start_sequence(2).expect("start");

        assert!(advance_to_next_open(&mut table));
        assert_eq!(table.now_ms(), 200);
        let Some(ArenaEvent::RoundOpened { sequence, .. }) = table.events.last() else {
            panic!("expected round_opened");
        };
        let progress = sequence.expect("sequence progress");
        assert_eq!((progress.completed, progress.total), (0, 2));

        // open 200, close 1200, roll 1700, next round 2000.
        assert!(advance_to_next_open(&mut table));
        assert_eq!(table.now_ms(), 2_000);
    }

    #[test]
    fn test_scenario_e_idle_rounds_auto_stop() {
        let mut table = TestTable::new(-3, test_config());
        table.engine().start_sequence(5).expect("start");

        // Round 1 has a bet.
        assert!(advance_to_next_open(&mut table));
        let now = table.now_ms();
        table
            .engine()
            .place_bet(1, "p", Outcome::Big, 10, now)
            .expect("bet");

        // Rounds 2 to 4 are empty.
        for _ in 2..=4 {
            assert!(advance_to_next_open(&mut table));
        }
        table.run_until_idle(10);

        assert_eq!(rounds_opened(&table), 4);
        assert_eq!(table.arena.history().len(), 4);
        assert_eq!(table.arena.idle_streak(), 3);
        assert!(table.arena.is_quiet());
        assert_eq!(table.scheduler.pending_count(), 0);

        let Some(ArenaEvent::SequenceAutoStopped { completed, total, idle_streak, .. }) =
            table.events.last()
        else {
            panic!("expected sequence_auto_stopped, got {:?}", table.event_names());
        };
        assert_eq!((*completed, *total, *idle_streak), (4, 5, 3));
    }

    #[test]
    fn test_bet_resets_idle_streak() {
        let mut table = TestTable::new(-3, test_config());
        table.engine().start_sequence(6).expect("start");

        // Two empty rounds, one with a bet, then two more empty rounds.
        for round in 1..=5 {
            assert!(advance_to_next_open(&mut table), "round {round} should open");
            if round == 3 {
                let now = table.now_ms();
                table
                    .engine()
                    .place_bet(1, "p", Outcome::Lucky, 10, now)
                    .expect("bet");
                assert_eq!(table.arena.idle_streak(), 0);
            }
        }
        assert!(table.arena.sequence().is_some());
        table.run_until_idle(20);

        // Round 6 is the third consecutive empty round.
        assert_eq!(rounds_opened(&table), 6);
        assert_eq!(table.event_names().last(), Some(&"sequence_auto_stopped"));
    }

    #[test]
    fn test_stop_round_ends_sequence() {
        let mut table = TestTable::new(-3, test_config());
        table.engine().start_sequence(4).expect("start");
        assert!(advance_to_next_open(&mut table));
        let now = table.now_ms();
        table
            .engine()
            .place_bet(1, "p", Outcome::Big, 10, now)
            .expect("bet");

        table.engine().stop_round(now).expect("stop");
        assert!(table.arena.sequence().is_none());
        assert!(table.arena.is_quiet());
        assert_eq!(table.run_until_idle(10), 0);
        assert_eq!(rounds_opened(&table), 1);
    }

    #[test]
    fn test_stale_next_round_after_cancel() {
        let mut table = TestTable::new(-3, test_config());
        let start = table.engine().start_sequence(2).expect("start");
        table.engine().cancel_sequence().expect("cancel");

        let stale = crate::scheduler::Timer {
            chat_id: -3,
            generation: 0,
            kind: TimerKind::NextRound {
                sequence_id: start.sequence_id,
            },
        };
        assert!(!table.engine().next_round(start.sequence_id, 500));
        assert!(!table
            .engine()
            .fire(stale, &mut crate::mocks::FailingDice, 500));
        assert!(table.arena.current_round().is_none());
        assert_eq!(table.event_names().last(), Some(&"sequence_cancelled"));
    }

    #[test]
    fn test_sequence_of_one() {
        let mut table = TestTable::new(-3, test_config());
        table.engine().start_sequence(1).expect("start");
        table.run_until_idle(10);
        assert_eq!(rounds_opened(&table), 1);
        assert_eq!(table.event_names().last(), Some(&"sequence_completed"));
        assert!(table.arena.is_quiet());
    }

    #[test]
    fn test_sequence_ids_increase() {
        let mut table = TestTable::new(-3, test_config());
        let first = table.engine().start_sequence(1).expect("start");
        table.run_until_idle(10);
        let second = table.engine().start_sequence(1).expect("start");
        assert!(second.sequence_id > first.sequence_id);
    }
}
