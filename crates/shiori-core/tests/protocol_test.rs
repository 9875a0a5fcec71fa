//! Wire-level behaviour of the codec and the family policies.

use chrono::{TimeZone, Utc};
use shiori_core::{
    build_request, format_response, EngineFamily, EngineInstance, EngineSettings, FixedClock, Request, Response,
    ScriptedRandom, ShioriError,
};
use std::sync::Arc;

fn engine(family: EngineFamily) -> EngineInstance {
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    EngineInstance::new(
        family,
        "8.0.0",
        &EngineSettings::default(),
        Arc::new(clock),
        Arc::new(ScriptedRandom::constant(0)),
    )
}

#[test]
fn test_request_round_trip_recovers_event_and_references() {
    let cases: &[(&str, &[&str])] = &[
        ("OnBoot", &[]),
        ("OnMouseClick", &["10", "20", "head"]),
        ("OnMinuteChange", &["0"]),
        ("OnCommunicate", &["user", "", "", "hello there"]),
    ];
    for (event, references) in cases {
        let raw = build_request(event, references);
        let parsed = Request::parse(&raw).unwrap();
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.version, "SHIORI/3.0");
        assert_eq!(&parsed.event, event);
        assert_eq!(parsed.references, references.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }
}

#[test]
fn test_sparse_trailing_indices_read_as_empty() {
    let parsed = Request::parse("GET SHIORI/3.0\r\nID: OnX\r\nReference3: last\r\n\r\n").unwrap();
    assert_eq!(parsed.references.len(), 4);
    assert_eq!(&parsed.references[..3], &["", "", ""]);
    assert_eq!(parsed.reference(3), "last");
}

#[test]
fn test_format_wire_layout() {
    let headers = vec![
        ("Value".to_string(), "hello".to_string()),
        ("Surface".to_string(), "0".to_string()),
        ("Event".to_string(), "OnBoot".to_string()),
    ];
    assert_eq!(
        format_response(200, &headers),
        "SHIORI/3.0 200\r\nValue: hello\r\nSurface: 0\r\nEvent: OnBoot\r\n\r\n"
    );
}

#[test]
fn test_minute_change_scenario() {
    let mut yaya = engine(EngineFamily::Yaya);

    let raw = yaya
        .process("GET SHIORI/3.0\r\nID: OnMinuteChange\r\nReference0: 0\r\n\r\n")
        .unwrap();
    assert_eq!(
        raw,
        "SHIORI/3.0 200\r\nValue: 時報！正時をお知らせします。\r\nSurface: 0\r\nEvent: OnMinuteChange\r\n\r\n"
    );

    let raw = yaya
        .process("GET SHIORI/3.0\r\nID: OnMinuteChange\r\nReference0: 15\r\n\r\n")
        .unwrap();
    assert_eq!(raw, "SHIORI/3.0 204\r\n\r\n");
}

#[test]
fn test_second_change_is_always_silent() {
    let mut yaya = engine(EngineFamily::Yaya);
    for _ in 0..10 {
        let resp = Response::parse(&yaya.process(&build_request("OnSecondChange", &[])).unwrap()).unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(resp.value(), None);
        assert_eq!(resp.header("Surface"), None);
    }
}

#[test]
fn test_unknown_event_fallback_differs_by_family() {
    let request = build_request("OnWeatherChange", &["rain"]);

    let mut yaya = engine(EngineFamily::Yaya);
    let resp = Response::parse(&yaya.process(&request).unwrap()).unwrap();
    assert_eq!(resp.status, 200);
    assert!(resp.value().unwrap().contains("OnWeatherChange"));
    assert_eq!(resp.header("Event"), Some("OnWeatherChange"));

    let mut satoriya = engine(EngineFamily::Satoriya);
    let resp = Response::parse(&satoriya.process(&request).unwrap()).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.value(), Some("..."));
    assert_eq!(resp.header("Surface"), Some("0"));
}

#[test]
fn test_scripted_random_drives_phrase_choice() {
    let clock = FixedClock(Utc::now());
    let mut yaya = EngineInstance::new(
        EngineFamily::Yaya,
        "8.0.0",
        &EngineSettings::default(),
        Arc::new(clock),
        Arc::new(ScriptedRandom::new(vec![3, 0])),
    );
    let first = Response::parse(&yaya.process(&build_request("OnBoot", &[])).unwrap()).unwrap();
    let second = Response::parse(&yaya.process(&build_request("OnBoot", &[])).unwrap()).unwrap();
    assert_eq!(first.value(), Some("今日もよろしくお願いします！"));
    assert_eq!(second.value(), Some("おかえりなさい！"));
}

#[test]
fn test_monotonic_counter_over_mixed_traffic() {
    let mut satoriya = engine(EngineFamily::Satoriya);
    let requests = [
        build_request("OnBoot", &[]),
        "garbage".to_string(),
        build_request("OnMouseClick", &["1", "2", "head"]),
        build_request("OnUnknown", &[]),
    ];
    for (k, raw) in requests.iter().enumerate() {
        satoriya.process(raw).unwrap();
        assert_eq!(satoriya.request_counter(), k as u64 + 1);
    }
    // The malformed request is counted but not recorded.
    assert_eq!(satoriya.history_len(), 3);
}

#[test]
fn test_unloaded_instance_rejects_process() {
    let mut generic = engine(EngineFamily::Generic);
    generic.unload();
    assert!(matches!(
        generic.process(&build_request("OnBoot", &[])),
        Err(ShioriError::NotLoaded)
    ));
    assert_eq!(generic.debug_info().variable_count, 0);
    assert_eq!(generic.history_len(), 0);
}
