use approx::assert_relative_eq;
use egfkit::core::{
    Axis, AzimuthKey, DirectionScheme, DirectionalityAnalyzer, DirectionalityParams, SnrField,
    VelocityWindow,
};
use egfkit::{EgfError, SampleGrid, Station, WaveformRecord};
use ndarray::Array1;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Synthetic two-sided EGF with surface-wave energy inside the default
/// 2.0-4.5 km/s window on each side and alternating unit noise elsewhere
fn synthetic_egf(a: &Station, b: &Station, causal_amp: f64, acausal_amp: f64) -> WaveformRecord {
    let grid = SampleGrid::two_sided(400.0, 1.0).unwrap();
    let placeholder = WaveformRecord::new(
        Array1::zeros(grid.npts()),
        grid,
        a.clone(),
        b.clone(),
    )
    .unwrap();
    let (t1, t2) = VelocityWindow::default().arrival_window(placeholder.distance_km);

    let samples = Array1::from_shape_fn(grid.npts(), |i| {
        let lag = grid.time_at(i);
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        if lag >= t1 && lag <= t2 {
            causal_amp * sign
        } else if -lag >= t1 && -lag <= t2 {
            acausal_amp * sign
        } else {
            sign
        }
    });
    WaveformRecord { samples, ..placeholder }
}

fn network() -> Vec<Station> {
    vec![
        Station::new("ALPH", 0.0, 0.0),
        Station::new("BRAV", 1.0, 0.0),
        Station::new("CHAR", 0.0, 1.0),
        Station::new("DELT", 1.0, 1.0),
    ]
}

fn all_pairs() -> Vec<WaveformRecord> {
    let stations = network();
    let mut records = Vec::new();
    for (i, a) in stations.iter().enumerate() {
        for b in &stations[i + 1..] {
            records.push(synthetic_egf(a, b, 8.0, 2.0));
        }
    }
    records
}

#[test]
fn test_dataset_twins_and_correction() {
    init_logging();

    let analyzer = DirectionalityAnalyzer::standard().unwrap();
    let records = all_pairs();
    let dataset = analyzer.prepare(&records).expect("dataset preparation");

    assert_eq!(dataset.len(), 2 * records.len());
    assert_eq!(dataset.recorded().count(), records.len());
    assert_relative_eq!(dataset.constants.mean_stack_count, 1.0);

    let nearest = dataset
        .recorded()
        .min_by(|a, b| a.record.distance_km.total_cmp(&b.record.distance_km))
        .unwrap();
    assert_relative_eq!(nearest.corrected_snr.causal, nearest.raw_snr.causal, epsilon = 1e-9);
    assert_relative_eq!(dataset.constants.min_distance_km, nearest.record.distance_km);

    for pair in dataset.entries.chunks(2) {
        let (recorded, twin) = (&pair[0], &pair[1]);
        assert!(twin.is_reversed_twin);
        assert_eq!(twin.record.station_a, recorded.record.station_b);
        assert_eq!(twin.corrected_snr.causal, recorded.corrected_snr.acausal);
        assert_eq!(twin.corrected_snr.symmetric, recorded.corrected_snr.symmetric);
        assert_eq!(twin.axis, recorded.axis);
        println!(
            "{}: axis {} causal {:.2} dB acausal {:.2} dB",
            recorded.record.pair_key(),
            recorded.axis,
            recorded.corrected_snr.causal,
            recorded.corrected_snr.acausal
        );
    }
}

#[test]
fn test_regions_have_consistent_polarity() {
    init_logging();

    let analyzer = DirectionalityAnalyzer::standard().unwrap();
    let dataset = analyzer.prepare(&all_pairs()).unwrap();
    let regions = analyzer.regions(&dataset).unwrap();

    assert_eq!(regions.len(), 4);
    let total: usize = regions.iter().map(|r| r.members.len()).sum();
    assert_eq!(total, dataset.recorded().count());

    for region in &regions {
        assert_eq!(region.causal.count(), region.members.len());
        for pair in region.members.windows(2) {
            assert!(pair[0].record.distance_km <= pair[1].record.distance_km);
        }
        for member in &region.members {
            assert!(region.axis.in_primary_half(member.record.forward_azimuth));
        }
    }

    // ALPH-BRAV runs due east, so it sits on the E-W axis unreversed
    let east_west = regions.iter().find(|r| r.axis == Axis::EastWest).unwrap();
    let alph_brav = east_west
        .members
        .iter()
        .find(|m| m.record.pair_key().to_string() == "ALPH_BRAV")
        .expect("ALPH_BRAV on the E-W axis");
    assert!(!alph_brav.reversed);
    assert!(alph_brav.causal_snr > alph_brav.acausal_snr);
}

#[test]
fn test_fan_diagram_counts_every_entry_once() {
    init_logging();

    let analyzer = DirectionalityAnalyzer::new(DirectionalityParams {
        snr_field: SnrField::Symmetric,
        ..DirectionalityParams::default()
    })
    .unwrap();
    let dataset = analyzer.prepare(&all_pairs()).unwrap();
    let fan = analyzer.fan_diagram(&dataset.entries);

    assert_eq!(fan.bins.len(), 24);
    assert_eq!(fan.key, AzimuthKey::Back);
    let counted: usize = fan.bins.iter().map(|b| b.stats.count()).sum();
    assert_eq!(counted, dataset.len());
    assert!(fan.bins.iter().any(|b| b.stats.is_empty()));
    assert!(fan.max_mean().unwrap() > 0.0);
}

#[test]
fn test_eight_way_direction_labels() {
    init_logging();

    let analyzer = DirectionalityAnalyzer::new(DirectionalityParams {
        direction_scheme: DirectionScheme::EightWay,
        direction_key: AzimuthKey::Forward,
        ..DirectionalityParams::default()
    })
    .unwrap();
    let dataset = analyzer.prepare(&all_pairs()).unwrap();
    let directions = analyzer.directions(&dataset);

    // ALPH->BRAV (E), ALPH->CHAR (N), ALPH->DELT (NE), BRAV->CHAR (NW),
    // BRAV->DELT (N), CHAR->DELT (E)
    assert_eq!(directions["E"].count(), 2);
    assert_eq!(directions["N"].count(), 2);
    assert_eq!(directions["NE"].count(), 1);
    assert_eq!(directions["NW"].count(), 1);
}

#[test]
fn test_station_and_subset_views() {
    init_logging();

    let analyzer = DirectionalityAnalyzer::standard().unwrap();
    let dataset = analyzer.prepare(&all_pairs()).unwrap();

    let stations = analyzer.stations(&dataset);
    let names: Vec<&str> = stations.iter().map(|s| s.station.name.as_str()).collect();
    assert_eq!(names, vec!["ALPH", "BRAV", "CHAR", "DELT"]);
    for station in &stations {
        assert_eq!(station.partners.len(), 3);
        assert_eq!(station.causal.count(), 3);
        for pair in station.partners.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
    }

    let subset = analyzer.subset(&dataset, &["ALPH", "DELT"]).unwrap();
    assert_eq!(subset.causal.count(), 6);
    assert_relative_eq!(subset.mean_lon, 0.5);
    assert_relative_eq!(subset.mean_lat, 0.5);
    assert_eq!(subset.fan_back.key, AzimuthKey::Back);
    assert_eq!(subset.fan_forward.key, AzimuthKey::Forward);
    let region_total: usize = subset.regions.iter().map(|r| r.members.len()).sum();
    assert_eq!(region_total, 6);

    match analyzer.subset(&dataset, &["ALPH", "ZULU"]) {
        Err(EgfError::UnknownStation(name)) => assert_eq!(name, "ZULU"),
        other => panic!("expected an unknown station error, got {:?}", other.map(|s| s.stations)),
    }
}
