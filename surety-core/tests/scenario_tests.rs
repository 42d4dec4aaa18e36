//! End-to-end protocol scenarios
//!
//! Exercises the full facade the way the surrounding DApp drives it:
//! admission, funding, flight registration, insurance sale, oracle
//! consensus, settlement, and withdrawal.

use surety_core::{
    ether, Address, Error, FlightKey, FlightStatus, ProtocolEvent, ProtocolParams, SuretyEngine,
};

fn admin() -> Address {
    Address::new("0xADMIN")
}

fn addr(prefix: &str, n: usize) -> Address {
    Address::new(format!("0x{}{:03}", prefix, n))
}

fn seeded_engine(seed: u64) -> SuretyEngine {
    let params = ProtocolParams {
        rng_seed: Some(seed),
        ..ProtocolParams::default()
    };
    SuretyEngine::new(params, admin(), addr("A", 1), "UDA_001").unwrap()
}

/// Submit matching reports from freshly registered oracles until the
/// flight resolves
fn reach_quorum(
    engine: &mut SuretyEngine,
    flight_key: FlightKey,
    timestamp: i64,
    status: FlightStatus,
) -> usize {
    engine.request_flight_status(flight_key).unwrap();
    let request = match engine.take_events().into_iter().last() {
        Some(ProtocolEvent::OracleRequestOpened { request }) => request,
        other => panic!("expected request-opened event, got {:?}", other),
    };
    let target = request.key.index;

    let mut submitted = 0;
    let mut n = 0;
    while !engine.flight(&flight_key).unwrap().status.is_terminal() {
        n += 1;
        let identity = addr("O", n);
        let indexes = engine.register_oracle(identity.clone(), ether(1)).unwrap();
        if indexes.contains(&target) {
            let accepted = engine
                .submit_oracle_report(&identity, target, flight_key, timestamp, status)
                .unwrap();
            assert!(accepted);
            submitted += 1;
        }
    }
    submitted
}

#[test]
fn test_full_surety_lifecycle() {
    let mut engine = seeded_engine(11);
    let airline_a = addr("A", 1);
    let airline_b = addr("A", 2);
    let passenger = addr("P", 1);
    let timestamp = 1_700_000_000;

    // Airline A self-funds 10 ether and becomes active.
    engine.fund_airline(&airline_a, ether(10)).unwrap();
    assert_eq!(engine.active_airlines().len(), 1);

    // A registers B: automatic pass, registry size is below bootstrap.
    let outcome = engine
        .propose_airline(&airline_a, airline_b.clone(), "UDA_002")
        .unwrap();
    assert_eq!(outcome.votes, 0);
    assert!(outcome.is_registered);

    // B funds 10 ether and registers flight F1.
    engine.fund_airline(&airline_b, ether(10)).unwrap();
    let flight_key = engine
        .register_flight(&airline_b, "F1", timestamp)
        .unwrap();

    // Passenger buys insurance for F1 with a 1 ether premium.
    engine
        .buy_insurance(passenger.clone(), flight_key, ether(1))
        .unwrap();

    // Three matching LateAirline reports resolve the flight.
    let submitted = reach_quorum(&mut engine, flight_key, timestamp, FlightStatus::LateAirline);
    assert_eq!(submitted, 3);
    assert_eq!(
        engine.flight(&flight_key).unwrap().status,
        FlightStatus::LateAirline
    );

    // Withdrawable amount is premium * 3 / 2 = 1.5 ether.
    let expected = ether(1) * 3 / 2;
    assert_eq!(engine.withdrawable(&passenger), expected);

    let transferred = engine.withdraw(&passenger).unwrap();
    assert_eq!(transferred, expected);

    // A repeat withdraw finds nothing.
    let repeat = engine.withdraw(&passenger);
    assert!(matches!(repeat, Err(Error::NothingToWithdraw(_))));

    assert!(engine.check_reserve_invariant());
}

#[test]
fn test_fifth_airline_requires_two_votes() {
    let mut engine = seeded_engine(12);
    engine.fund_airline(&addr("A", 1), ether(10)).unwrap();

    // Bootstrap admissions for airlines 2-4.
    for n in 2..=4 {
        let outcome = engine
            .propose_airline(&addr("A", 1), addr("A", n), "UDA")
            .unwrap();
        assert_eq!(outcome.votes, 0);
        assert!(outcome.is_registered);
        engine.fund_airline(&addr("A", n), ether(10)).unwrap();
    }

    // Fifth airline: one vote of four is below half.
    let first = engine
        .propose_airline(&addr("A", 1), addr("A", 5), "UDA_005")
        .unwrap();
    assert_eq!(first.votes, 1);
    assert!(!first.is_registered);

    // Second vote from a different airline admits it.
    let second = engine
        .propose_airline(&addr("A", 2), addr("A", 5), "UDA_005")
        .unwrap();
    assert_eq!(second.votes, 2);
    assert!(second.is_registered);
}

#[test]
fn test_non_late_airline_resolution_pays_nothing() {
    let mut engine = seeded_engine(13);
    let airline = addr("A", 1);
    let passenger = addr("P", 1);
    let timestamp = 1_700_000_000;

    engine.fund_airline(&airline, ether(10)).unwrap();
    let flight_key = engine.register_flight(&airline, "F2", timestamp).unwrap();
    engine
        .buy_insurance(passenger.clone(), flight_key, ether(1))
        .unwrap();

    reach_quorum(&mut engine, flight_key, timestamp, FlightStatus::LateWeather);

    assert_eq!(engine.withdrawable(&passenger), 0);
    let result = engine.withdraw(&passenger);
    assert!(matches!(result, Err(Error::NothingToWithdraw(_))));
}

#[test]
fn test_insuring_resolved_flight_rejected() {
    let mut engine = seeded_engine(14);
    let airline = addr("A", 1);
    let timestamp = 1_700_000_000;

    engine.fund_airline(&airline, ether(10)).unwrap();
    let flight_key = engine.register_flight(&airline, "F3", timestamp).unwrap();
    reach_quorum(&mut engine, flight_key, timestamp, FlightStatus::OnTime);

    let result = engine.buy_insurance(addr("P", 1), flight_key, ether(1));
    assert!(matches!(result, Err(Error::AlreadyResolved(_))));
}

#[test]
fn test_second_quorum_is_noop() {
    let mut engine = seeded_engine(15);
    let airline = addr("A", 1);
    let passenger = addr("P", 1);
    let timestamp = 1_700_000_000;

    engine.fund_airline(&airline, ether(10)).unwrap();
    let flight_key = engine.register_flight(&airline, "F4", timestamp).unwrap();
    engine
        .buy_insurance(passenger.clone(), flight_key, ether(1))
        .unwrap();

    // Open two independent requests before any reports land.
    engine.request_flight_status(flight_key).unwrap();
    let first = match engine.take_events().into_iter().last() {
        Some(ProtocolEvent::OracleRequestOpened { request }) => request,
        other => panic!("expected request-opened event, got {:?}", other),
    };
    let mut second = first.clone();
    while second.key.index == first.key.index {
        engine.request_flight_status(flight_key).unwrap();
        second = match engine.take_events().into_iter().last() {
            Some(ProtocolEvent::OracleRequestOpened { request }) => request,
            other => panic!("expected request-opened event, got {:?}", other),
        };
    }

    // Register oracles until both requests have three eligible reporters.
    let mut first_reporters = Vec::new();
    let mut second_reporters = Vec::new();
    let mut n = 0;
    while first_reporters.len() < 3 || second_reporters.len() < 3 {
        n += 1;
        let identity = addr("O", n);
        let indexes = engine.register_oracle(identity.clone(), ether(1)).unwrap();
        if indexes.contains(&first.key.index) && first_reporters.len() < 3 {
            first_reporters.push(identity.clone());
        } else if indexes.contains(&second.key.index) && second_reporters.len() < 3 {
            second_reporters.push(identity);
        }
    }

    // First request reaches LateAirline quorum and settles the flight.
    for reporter in &first_reporters {
        engine
            .submit_oracle_report(
                reporter,
                first.key.index,
                flight_key,
                timestamp,
                FlightStatus::LateAirline,
            )
            .unwrap();
    }
    assert_eq!(
        engine.flight(&flight_key).unwrap().status,
        FlightStatus::LateAirline
    );
    let credited = engine.withdrawable(&passenger);

    // Second request reaching a different quorum changes nothing.
    for reporter in &second_reporters {
        engine
            .submit_oracle_report(
                reporter,
                second.key.index,
                flight_key,
                timestamp,
                FlightStatus::OnTime,
            )
            .unwrap();
    }
    assert_eq!(
        engine.flight(&flight_key).unwrap().status,
        FlightStatus::LateAirline
    );
    assert_eq!(engine.withdrawable(&passenger), credited);
}

#[test]
fn test_event_stream_for_lifecycle() {
    let mut engine = seeded_engine(16);
    let airline = addr("A", 1);

    engine.fund_airline(&airline, ether(10)).unwrap();
    engine
        .propose_airline(&airline, addr("A", 2), "UDA_002")
        .unwrap();
    engine.register_flight(&airline, "F5", 1_700_000_000).unwrap();

    let kinds: Vec<&str> = engine.take_events().iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec!["airline.funded", "airline.registered", "flight.registered"]
    );
}
