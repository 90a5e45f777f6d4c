//! End-to-end tests: catalogs through files, the full refinement schedule,
//! and auxiliary-column passthrough.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ::remaster::catalog::{write_corrected, write_deltas};
use ::remaster::{remaster, Catalog, RemasterConfig, RemasterError};

#[test]
fn two_point_catalog_end_to_end() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let dir = tempfile::tempdir().unwrap();
    let working_path = dir.path().join("working.txt");
    let master_path = dir.path().join("master.txt");
    let delta_path = dir.path().join("delta.txt");
    let corrected_path = dir.path().join("corrected.txt");

    // Working catalog with one auxiliary column; master displaced by 1e-4 deg.
    std::fs::write(&working_path, "10.0 20.0 1.0\n10.001 20.001 2.0\n").unwrap();
    std::fs::write(&master_path, "10.0001 20.0001\n10.0011 20.0011\n").unwrap();

    let mut working = Catalog::from_file(&working_path, 0).unwrap();
    let master = Catalog::from_file(&master_path, 0).unwrap();

    // The 1e-4 deg displacement is ~2.4e-6 in chord distance, so the schedule
    // opens wide enough to capture it and then tightens.
    let config = RemasterConfig {
        thresholds: vec![4e-6, 2e-6, 1e-6, 5e-7],
        min_matches: 2,
        stop_tolerance: None,
    };
    let result = remaster(&mut working, &master, &config).unwrap();
    assert_eq!(result.rounds.len(), 4);
    assert_eq!(result.deltas.len(), 2);

    write_deltas(&delta_path, &result.deltas).unwrap();
    write_corrected(&corrected_path, &working).unwrap();

    // Corrected coordinates land on the master points; aux rides through.
    let corrected = Catalog::from_file(&corrected_path, 0).unwrap();
    assert_eq!(corrected.len(), 2);
    for i in 0..2 {
        assert!(
            (corrected.ra[i] - master.ra[i]).abs() < 1e-7,
            "ra[{i}] residual {:e}",
            corrected.ra[i] - master.ra[i]
        );
        assert!((corrected.dec[i] - master.dec[i]).abs() < 1e-7);
    }
    assert_eq!(corrected.aux[0], vec![1.0]);
    assert_eq!(corrected.aux[1], vec![2.0]);

    // Delta file: seven columns, deltas duplicated in columns 4 and 5.
    let delta_text = std::fs::read_to_string(&delta_path).unwrap();
    let rows: Vec<Vec<f64>> = delta_text
        .lines()
        .map(|l| {
            l.split_whitespace()
                .map(|t| t.parse().unwrap())
                .collect()
        })
        .collect();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.len(), 7);
        assert_eq!(row[0], row[3]);
        assert_eq!(row[1], row[4]);
        assert!(row[2] >= 0.0);
    }
}

#[test]
fn jittered_grid_quadratic_warp_converges() {
    let mut rng = StdRng::seed_from_u64(7);

    let mut master = Catalog::default();
    for i in 0..12 {
        for j in 0..12 {
            master.ra.push(50.0 + i as f64 * 0.004 + rng.random_range(-0.001..0.001));
            master
                .dec
                .push(30.0 + j as f64 * 0.004 + rng.random_range(-0.001..0.001));
            master.aux.push(vec![]);
        }
    }

    // Working = master plus a small quadratic warp.
    let mut working = master.clone();
    for i in 0..working.len() {
        let u = working.ra[i] - 50.022;
        let v = working.dec[i] - 30.022;
        working.ra[i] += 1.0e-5 + 2.0e-2 * u * v;
        working.dec[i] += -8.0e-6 + 1.0e-2 * (u * u - v * v);
    }

    let result = remaster(&mut working, &master, &RemasterConfig::default()).unwrap();
    assert!(result.rounds.iter().all(|r| r.kept == master.len()));

    for i in 0..working.len() {
        assert!(
            (working.ra[i] - master.ra[i]).abs() < 1e-9,
            "ra[{i}] residual {:e}",
            working.ra[i] - master.ra[i]
        );
        assert!((working.dec[i] - master.dec[i]).abs() < 1e-9);
    }
}

#[test]
fn malformed_catalog_file_is_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.txt");
    std::fs::write(&path, "10.0 20.0\nnot-a-number 21.0\n").unwrap();

    match Catalog::from_file(&path, 0) {
        Err(RemasterError::MalformedCatalog { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected MalformedCatalog, got {other:?}"),
    }
}

#[test]
fn master_header_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.txt");
    std::fs::write(
        &path,
        "master catalog export\nepoch 2026.5\ncolumns ra dec\n10.0 20.0\n10.001 20.001\n",
    )
    .unwrap();

    let master = Catalog::from_file(&path, 3).unwrap();
    assert_eq!(master.len(), 2);
    assert_eq!(master.ra, vec![10.0, 10.001]);
}
