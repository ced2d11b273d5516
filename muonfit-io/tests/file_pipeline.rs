use std::fs;
use std::io::Write;

use muonfit_algorithms::RunContext;
use muonfit_core::{
    EventId, EventInput, ReconstructionConfig, SensorHit, TankCluster, TrackStub, Vector3,
};
use muonfit_io::{
    read_events, ProfileWriter, ResultWriter, SensorTable, TrackFitTable, PROFILE_HEADER,
};
use tempfile::tempdir;

fn barrel_document() -> String {
    let sensors: Vec<String> = (0..12)
        .map(|i| {
            format!(
                r#"{{"channel_id":{},"kind":"LUX","position":{{"x":137.0,"y":0.0,"z":{}}},"orientation":{{"x":-1.0,"y":0.0,"z":0.0}},"gain":1.0}}"#,
                332 + i,
                -120.0 + 15.0 * f64::from(i)
            )
        })
        .collect();
    format!(r#"{{"sensors":[{}]}}"#, sensors.join(","))
}

fn muon_event(number: u64) -> EventInput {
    let track = TrackStub::from_endpoints(Vector3::new(0.0, 0.0, 50.0), Vector3::new(0.0, 0.0, 150.0))
        .with_energy_loss(200.0)
        .with_start_time(845.0);
    let hits = (0..12u32)
        .map(|i| SensorHit::new(332 + i, 10.0 + f64::from(i), 100.0 + f64::from(i)))
        .collect();
    EventInput::new(EventId::new(3, number))
        .with_trigger_word(5)
        .with_track(track)
        .with_cluster(TankCluster::new(100.0, hits))
}

#[test]
fn test_reconstruct_from_files() {
    let dir = tempdir().unwrap();

    let events_path = dir.path().join("events.jsonl");
    let mut events_file = fs::File::create(&events_path).unwrap();
    for number in 0..3 {
        let line = serde_json::to_string(&muon_event(number)).unwrap();
        writeln!(events_file, "{line}").unwrap();
    }
    drop(events_file);

    let geometry_path = dir.path().join("geometry.json");
    fs::write(&geometry_path, barrel_document()).unwrap();

    let fits_path = dir.path().join("fits.csv");
    fs::write(&fits_path, "##ev_id,cluster_time,tank_length\np3_1,100,150\n").unwrap();

    let events = read_events(&events_path).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], muon_event(1));

    let geometry = SensorTable::open(&geometry_path).unwrap();
    let fits = TrackFitTable::open(&fits_path).unwrap();
    let context = RunContext::new(ReconstructionConfig::default(), &geometry)
        .unwrap()
        .with_fits(&fits);
    let outcomes = context.reconstruct_events(&events);

    let results_path = dir.path().join("results.csv");
    let mut results = ResultWriter::create(&results_path).unwrap();
    results.write_outcomes(&outcomes).unwrap();
    drop(results);

    let profiles_path = dir.path().join("profiles.csv");
    let mut profiles = ProfileWriter::create(&profiles_path).unwrap();
    assert_eq!(profiles.write_outcomes(&outcomes).unwrap(), 3);
    drop(profiles);

    let text = fs::read_to_string(&results_path).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[1].starts_with("p3_0,no_fit,"));
    assert!(rows[2].starts_with("p3_1,reconstructed,100,"));
    assert!(rows[3].starts_with("p3_2,no_fit,"));

    let text = fs::read_to_string(&profiles_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(PROFILE_HEADER));
    let first: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(first.len(), 4);
    assert_eq!(first[0], "p3_0");
    assert_eq!(first[1], "100");
}

#[test]
fn test_profile_file_feeds_back_as_fit_ids() {
    // Event ids written to the profile file parse back in the fit table.
    let dir = tempdir().unwrap();
    let path = dir.path().join("fits.csv");
    fs::write(&path, "p3_0,100.0,80.0\n# trailing comment\n").unwrap();
    let fits = TrackFitTable::open(&path).unwrap();
    assert_eq!(fits.len(), 1);
    assert!(TrackFitTable::open(dir.path().join("missing.csv")).is_err());
}
