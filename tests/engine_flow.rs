//! Integration tests for the raffle engine: creation, entry, draws and
//! reaction entry, driven against the in-memory store and a TOML roster.

mod common;

use chrono::{TimeZone, Utc};
use common::{ALICE, BOB, CAROL, DAVE, LOBBY, MANAGER, OWNER, ROSTER, VIP_ROLE};
use raffled::directory::{MemberRecord, Roster};
use raffled::engine::{
    Abandoned, DrawOutcome, EngineSettings, FixedClock, JoinOutcome, PICKING_MESSAGE,
    REACTION_ENTRY_MESSAGE, RaffleEngine, Removal, SeededRandom,
};
use raffled::error::RaffleError;
use raffled::notify::{BroadcastSink, LogSink, NotificationSink, Target};
use raffled::raffle::{
    Badge, DenialKind, EndAction, EntityCategory, RaffleState, ValidationError,
};
use raffled::store::MemoryStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const CHANNEL: u64 = 500;
const MESSAGE: u64 = 900;

struct Harness {
    engine: Arc<RaffleEngine>,
    roster: Arc<Roster>,
}

fn harness_with(notifier: Arc<dyn NotificationSink>) -> Harness {
    let roster = Arc::new(Roster::from_toml(ROSTER).expect("roster parses"));
    let settings = EngineSettings {
        default_suspense: Duration::ZERO,
        ..EngineSettings::default()
    };
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let engine = RaffleEngine::new(
        Arc::new(MemoryStore::new()),
        roster.clone(),
        notifier,
        settings,
    )
    .with_random(Arc::new(SeededRandom::new(42)))
    .with_clock(Arc::new(FixedClock::new(now)));
    Harness {
        engine: Arc::new(engine),
        roster,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(LogSink))
}

fn denial(outcome: JoinOutcome) -> DenialKind {
    match outcome {
        JoinOutcome::Denied(denial) => denial.kind,
        other => panic!("expected a denial, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_join_and_deny_repeat_entry() {
    let h = harness();
    let def = h
        .engine
        .create_raffle(LOBBY, &json!({"name": "spring", "description": "Spring giveaway"}), OWNER)
        .await
        .unwrap();
    assert_eq!(def.owner, OWNER);
    assert!(def.entries.is_empty());

    let outcome = h.engine.join_raffle(LOBBY, "spring", ALICE).await.unwrap();
    assert_eq!(
        outcome,
        JoinOutcome::Admitted {
            message: "<@10> you have been added to the raffle.".to_string(),
            entry_count: 1,
        }
    );

    let again = h.engine.join_raffle(LOBBY, "spring", ALICE).await.unwrap();
    assert_eq!(denial(again), DenialKind::AlreadyEntered);

    let own = h.engine.join_raffle(LOBBY, "spring", OWNER).await.unwrap();
    assert_eq!(denial(own), DenialKind::OwnRaffle);

    assert_eq!(h.engine.list_entrants(LOBBY, "spring").await.unwrap(), vec![ALICE]);
}

#[tokio::test]
async fn test_create_rejects_duplicates_and_bad_definitions() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "dup"}), OWNER)
        .await
        .unwrap();
    assert!(matches!(
        h.engine.create_raffle(LOBBY, &json!({"name": "dup"}), MANAGER).await,
        Err(RaffleError::AlreadyExists(name)) if name == "dup"
    ));

    let err = h
        .engine
        .create_raffle(LOBBY, &json!({"name": "bad name"}), OWNER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RaffleError::Invalid(ValidationError::Syntax {
            field: "name",
            position: Some(3),
            ..
        })
    ));

    // Dave is known but not a member of the lobby.
    let err = h
        .engine
        .create_raffle(LOBBY, &json!({"name": "vip", "allowed_users": [DAVE]}), OWNER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RaffleError::Invalid(ValidationError::UnknownEntity {
            category: EntityCategory::User,
            ..
        })
    ));

    assert!(matches!(
        h.engine.create_raffle(99, &json!({"name": "x"}), OWNER).await,
        Err(RaffleError::UnknownScope(99))
    ));
}

#[tokio::test]
async fn test_reaction_fields_are_mode_checked() {
    let h = harness();
    let err = h
        .engine
        .create_raffle(LOBBY, &json!({"name": "cmd", "reaction_emoji": "🎉"}), OWNER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RaffleError::Invalid(ValidationError::ConditionCrossover {
            field: "reaction_emoji",
            ..
        })
    ));

    let err = h
        .engine
        .create_reaction_raffle(LOBBY, &json!({"name": "react"}), OWNER, CHANNEL, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RaffleError::Invalid(ValidationError::RequiredKey {
            field: "reaction_emoji"
        })
    ));
}

#[tokio::test]
async fn test_requirements_deny_in_order() {
    let h = harness();
    h.engine
        .create_raffle(
            LOBBY,
            &json!({"name": "vip", "roles_needed_to_enter": [VIP_ROLE]}),
            OWNER,
        )
        .await
        .unwrap();
    let outcome = h.engine.join_raffle(LOBBY, "vip", CAROL).await.unwrap();
    match outcome {
        JoinOutcome::Denied(d) => {
            assert_eq!(d.kind, DenialKind::MissingRole(VIP_ROLE));
            assert_eq!(d.message, "You are missing a required role: VIP");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        h.engine.join_raffle(LOBBY, "vip", ALICE).await.unwrap(),
        JoinOutcome::Admitted { .. }
    ));

    h.engine
        .create_raffle(LOBBY, &json!({"name": "veterans", "account_age": 365}), OWNER)
        .await
        .unwrap();
    assert_eq!(
        denial(h.engine.join_raffle(LOBBY, "veterans", BOB).await.unwrap()),
        DenialKind::AccountTooYoung { required_days: 365 }
    );

    h.engine
        .create_raffle(LOBBY, &json!({"name": "regulars", "server_join_age": 30}), OWNER)
        .await
        .unwrap();
    assert_eq!(
        denial(h.engine.join_raffle(LOBBY, "regulars", BOB).await.unwrap()),
        DenialKind::MembershipTooRecent { required_days: 30 }
    );
    // Not a member at all.
    assert_eq!(
        denial(h.engine.join_raffle(LOBBY, "regulars", DAVE).await.unwrap()),
        DenialKind::MembershipTooRecent { required_days: 30 }
    );

    h.engine
        .create_raffle(
            LOBBY,
            &json!({"name": "early", "badges_needed_to_enter": ["early_supporter"]}),
            OWNER,
        )
        .await
        .unwrap();
    assert_eq!(
        denial(h.engine.join_raffle(LOBBY, "early", CAROL).await.unwrap()),
        DenialKind::MissingBadge(Badge::EarlySupporter)
    );
    assert!(matches!(
        h.engine.join_raffle(LOBBY, "early", ALICE).await.unwrap(),
        JoinOutcome::Admitted { .. }
    ));
}

#[tokio::test]
async fn test_capacity_admits_one_past_the_cap() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "tiny", "maximum_entries": 1}), OWNER)
        .await
        .unwrap();

    assert!(matches!(
        h.engine.join_raffle(LOBBY, "tiny", ALICE).await.unwrap(),
        JoinOutcome::Admitted { entry_count: 1, .. }
    ));
    assert!(matches!(
        h.engine.join_raffle(LOBBY, "tiny", CAROL).await.unwrap(),
        JoinOutcome::Admitted { entry_count: 2, .. }
    ));
    assert_eq!(
        denial(h.engine.join_raffle(LOBBY, "tiny", BOB).await.unwrap()),
        DenialKind::RaffleFull
    );
}

#[tokio::test]
async fn test_join_message_is_rendered() {
    let h = harness();
    h.engine
        .create_raffle(
            LOBBY,
            &json!({
                "name": "greet",
                "join_message": "Welcome {user.display_name}, entry #{entry_count} in {raffle}"
            }),
            OWNER,
        )
        .await
        .unwrap();

    let outcome = h.engine.join_raffle(LOBBY, "greet", CAROL).await.unwrap();
    assert_eq!(
        outcome,
        JoinOutcome::Admitted {
            message: "<@12> you have been added to the raffle.\n---\nWelcome caz, entry #1 in greet"
                .to_string(),
            entry_count: 1,
        }
    );
}

#[tokio::test]
async fn test_unsafe_template_is_rejected() {
    let h = harness();
    let err = h
        .engine
        .create_raffle(
            LOBBY,
            &json!({"name": "leak", "end_message": "{winner.email}"}),
            OWNER,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RaffleError::Invalid(ValidationError::Syntax {
            field: "end_message",
            ..
        })
    ));
}

#[tokio::test]
async fn test_draw_dispositions() {
    let h = harness();
    for action in EndAction::ALL {
        let name = match action {
            EndAction::End => "final",
            EndAction::RemoveWinner => "remove",
            EndAction::RemoveAndPreventWinner => "prevent",
            EndAction::KeepWinner => "keep",
        }
        .to_string();
        h.engine
            .create_raffle(
                LOBBY,
                &json!({"name": name, "on_end_action": action.as_str()}),
                OWNER,
            )
            .await
            .unwrap();
        h.engine.join_raffle(LOBBY, &name, ALICE).await.unwrap();

        let outcome = h.engine.draw_raffle(LOBBY, &name, CHANNEL).await.unwrap();
        let DrawOutcome::WinnerAnnounced {
            winner,
            message,
            action: applied,
            state,
        } = outcome
        else {
            panic!("expected a winner for {}", name);
        };
        assert_eq!(winner, ALICE);
        assert_eq!(applied, action);
        assert_eq!(
            message,
            format!("Congratulations <@10>, you have won the {} raffle!", name)
        );

        match action {
            EndAction::KeepWinner => {
                assert_eq!(state, RaffleState::Open);
                assert_eq!(h.engine.list_entrants(LOBBY, &name).await.unwrap(), vec![ALICE]);
            }
            EndAction::RemoveWinner => {
                assert_eq!(state, RaffleState::Open);
                assert!(h.engine.list_entrants(LOBBY, &name).await.unwrap().is_empty());
                assert!(matches!(
                    h.engine.join_raffle(LOBBY, &name, ALICE).await.unwrap(),
                    JoinOutcome::Admitted { .. }
                ));
            }
            EndAction::RemoveAndPreventWinner => {
                assert_eq!(state, RaffleState::Open);
                assert!(h.engine.list_entrants(LOBBY, &name).await.unwrap().is_empty());
                assert_eq!(
                    denial(h.engine.join_raffle(LOBBY, &name, ALICE).await.unwrap()),
                    DenialKind::Prevented
                );
            }
            EndAction::End => {
                assert_eq!(state, RaffleState::Ended);
                assert!(matches!(
                    h.engine.raffle_info(LOBBY, &name).await,
                    Err(RaffleError::NotFound(_))
                ));
            }
        }
    }
}

#[tokio::test]
async fn test_draw_without_participants() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "empty"}), OWNER)
        .await
        .unwrap();
    assert_eq!(
        h.engine.draw_raffle(LOBBY, "empty", CHANNEL).await.unwrap(),
        DrawOutcome::NoParticipants
    );
    assert!(matches!(
        h.engine.draw_raffle(LOBBY, "missing", CHANNEL).await,
        Err(RaffleError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_draw_announces_in_channel() {
    let sink = Arc::new(BroadcastSink::new(16));
    let mut rx = sink.subscribe();
    let h = harness_with(sink.clone());

    h.engine
        .create_raffle(
            LOBBY,
            &json!({"name": "loud", "end_message": "{winner.display_name} takes {raffle}"}),
            OWNER,
        )
        .await
        .unwrap();
    h.engine.join_raffle(LOBBY, "loud", CAROL).await.unwrap();
    h.engine.draw_raffle(LOBBY, "loud", CHANNEL).await.unwrap();

    let picking = rx.recv().await.unwrap();
    assert_eq!(picking.target, Target::Channel(CHANNEL));
    assert_eq!(picking.text, PICKING_MESSAGE);
    let winner = rx.recv().await.unwrap();
    assert_eq!(winner.target, Target::Channel(CHANNEL));
    assert_eq!(winner.text, "caz takes loud");
}

#[tokio::test]
async fn test_draw_abandoned_when_winner_leaves() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "slow", "suspense_timer": 1}), OWNER)
        .await
        .unwrap();
    h.engine.join_raffle(LOBBY, "slow", ALICE).await.unwrap();

    let engine = h.engine.clone();
    let draw = tokio::spawn(async move { engine.draw_raffle(LOBBY, "slow", CHANNEL).await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        h.engine.leave_raffle(LOBBY, "slow", ALICE).await.unwrap(),
        Removal::Removed
    );

    let outcome = draw.await.unwrap().unwrap();
    assert_eq!(outcome, DrawOutcome::Abandoned(Abandoned::WinnerLeft));
}

#[tokio::test]
async fn test_draw_abandoned_when_raffle_ends() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "short", "suspense_timer": 1}), OWNER)
        .await
        .unwrap();
    h.engine.join_raffle(LOBBY, "short", ALICE).await.unwrap();

    let engine = h.engine.clone();
    let draw = tokio::spawn(async move { engine.draw_raffle(LOBBY, "short", CHANNEL).await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    h.engine.end_raffle(LOBBY, "short").await.unwrap();

    let outcome = draw.await.unwrap().unwrap();
    assert_eq!(outcome, DrawOutcome::Abandoned(Abandoned::RaffleEnded));
}

#[tokio::test]
async fn test_edit_keeps_entries_and_name() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "summer"}), OWNER)
        .await
        .unwrap();
    h.engine.join_raffle(LOBBY, "summer", ALICE).await.unwrap();

    let edited = h
        .engine
        .edit_raffle(
            LOBBY,
            "summer",
            &json!({"name": "summer", "maximum_entries": 5, "description": "Now capped"}),
        )
        .await
        .unwrap();
    assert_eq!(edited.maximum_entries, Some(5));
    assert_eq!(edited.entries, vec![ALICE]);
    assert_eq!(edited.owner, OWNER);

    let err = h
        .engine
        .edit_raffle(LOBBY, "summer", &json!({"name": "autumn"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RaffleError::Invalid(ValidationError::InvalidValue { field: "name", .. })
    ));
    assert!(matches!(
        h.engine.edit_raffle(LOBBY, "winter", &json!({"name": "winter"})).await,
        Err(RaffleError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_leave_kick_and_end() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "autumn"}), OWNER)
        .await
        .unwrap();
    h.engine.join_raffle(LOBBY, "autumn", ALICE).await.unwrap();
    h.engine.join_raffle(LOBBY, "autumn", CAROL).await.unwrap();

    assert_eq!(
        h.engine.leave_raffle(LOBBY, "autumn", ALICE).await.unwrap(),
        Removal::Removed
    );
    assert_eq!(
        h.engine.leave_raffle(LOBBY, "autumn", ALICE).await.unwrap(),
        Removal::NotEntered
    );
    assert_eq!(
        h.engine.kick_entrant(LOBBY, "autumn", CAROL).await.unwrap(),
        Removal::Removed
    );
    assert_eq!(h.engine.mention_entrants(LOBBY, "autumn").await.unwrap(), None);

    h.engine.end_raffle(LOBBY, "autumn").await.unwrap();
    assert!(matches!(
        h.engine.end_raffle(LOBBY, "autumn").await,
        Err(RaffleError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_queries_and_management() {
    let h = harness();
    let long = "A very long description that will certainly be cut down for lists";
    h.engine
        .create_raffle(LOBBY, &json!({"name": "b_raffle", "description": long}), OWNER)
        .await
        .unwrap();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "a_raffle"}), OWNER)
        .await
        .unwrap();
    for user in [ALICE, CAROL, BOB] {
        h.engine.join_raffle(LOBBY, "a_raffle", user).await.unwrap();
    }

    let list = h.engine.list_raffles(LOBBY).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].name, "a_raffle");
    assert_eq!(list[0].description, None);
    let shortened = list[1].description.as_deref().unwrap();
    assert!(shortened.ends_with("..."));
    assert!(shortened.chars().count() <= 53);

    assert_eq!(
        h.engine.mention_entrants(LOBBY, "a_raffle").await.unwrap(),
        Some("<@10>, <@12>, and <@11>".to_string())
    );

    assert!(h.engine.can_manage(LOBBY, "a_raffle", OWNER).await.unwrap());
    assert!(h.engine.can_manage(LOBBY, "a_raffle", MANAGER).await.unwrap());
    assert!(!h.engine.can_manage(LOBBY, "a_raffle", ALICE).await.unwrap());

    assert!(h.engine.list_raffles(99).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reaction_entry_with_dm_fallback() {
    let sink = Arc::new(BroadcastSink::new(64));
    sink.close_dms(BOB);
    let mut rx = sink.subscribe();
    let h = harness_with(sink.clone());

    h.engine
        .create_reaction_raffle(
            LOBBY,
            &json!({"name": "react", "reaction_emoji": "🎉"}),
            OWNER,
            CHANNEL,
            MESSAGE,
        )
        .await
        .unwrap();

    let entries = h
        .engine
        .reaction_added(LOBBY, CHANNEL, MESSAGE, "🎉", ALICE)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].raffle, "react");
    assert_eq!(entries[0].delivered_to, Some(Target::User(ALICE)));
    assert!(!entries[0].retract);
    let dm = rx.recv().await.unwrap();
    assert_eq!(dm.target, Target::User(ALICE));
    assert_eq!(dm.text, REACTION_ENTRY_MESSAGE);

    let entries = h
        .engine
        .reaction_added(LOBBY, CHANNEL, MESSAGE, "🎉", BOB)
        .await
        .unwrap();
    assert_eq!(entries[0].delivered_to, Some(Target::Channel(CHANNEL)));
    let fallback = rx.recv().await.unwrap();
    assert_eq!(fallback.text, "<@11>: You have been entered into the raffle!");

    let entries = h
        .engine
        .reaction_added(LOBBY, CHANNEL, MESSAGE, "🎉", OWNER)
        .await
        .unwrap();
    assert!(entries[0].retract);
    assert!(matches!(
        &entries[0].outcome,
        JoinOutcome::Denied(d) if d.kind == DenialKind::OwnRaffle
    ));
    let denial = rx.recv().await.unwrap();
    assert_eq!(denial.target, Target::User(OWNER));
    assert_eq!(denial.text, "you cannot join your own raffle.");

    // Other emoji and other messages are ignored.
    assert!(h
        .engine
        .reaction_added(LOBBY, CHANNEL, MESSAGE, "👍", CAROL)
        .await
        .unwrap()
        .is_empty());
    assert!(h
        .engine
        .reaction_added(LOBBY, CHANNEL, MESSAGE + 1, "🎉", CAROL)
        .await
        .unwrap()
        .is_empty());

    assert_eq!(
        h.engine
            .reaction_removed(LOBBY, MESSAGE, "🎉", ALICE)
            .await
            .unwrap(),
        Some("react".to_string())
    );
    assert_eq!(
        h.engine
            .reaction_removed(LOBBY, MESSAGE, "🎉", ALICE)
            .await
            .unwrap(),
        None
    );
    assert_eq!(h.engine.list_entrants(LOBBY, "react").await.unwrap(), vec![BOB]);
}

#[tokio::test]
async fn test_roster_changes_are_seen() {
    let h = harness();
    h.engine
        .create_raffle(LOBBY, &json!({"name": "members", "server_join_age": 30}), OWNER)
        .await
        .unwrap();
    assert_eq!(
        denial(h.engine.join_raffle(LOBBY, "members", DAVE).await.unwrap()),
        DenialKind::MembershipTooRecent { required_days: 30 }
    );

    assert!(h.roster.add_member(
        LOBBY,
        MemberRecord {
            user: DAVE,
            joined_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            nick: None,
            roles: Vec::new(),
        },
    ));
    assert!(matches!(
        h.engine.join_raffle(LOBBY, "members", DAVE).await.unwrap(),
        JoinOutcome::Admitted { .. }
    ));

    assert!(matches!(
        h.engine.join_raffle(LOBBY, "members", 404).await,
        Err(RaffleError::UnknownEntrant(404))
    ));
}
