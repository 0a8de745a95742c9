use aviation_dash::api::{
    ACCIDENT_CSV, DateRange, Endpoint, aboard_from_rows, operator_country_counts,
};
use aviation_dash::config::ApiConfig;
use aviation_dash::models::{AccidentRow, ClusterData, CountryCount, GroupKey};
use aviation_dash::{Client, DataSource, FetchError, FileSource};
use chrono::NaiveDate;
use std::path::PathBuf;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn accident_rows_decode_leniently() {
    let v = serde_json::json!([
        {"Year": "1999", "Date": null, "Time": 1230, "Operator Country": "  ",
         "Fatalities": "3 (passengers:2 crew:1)", "Aboard": 10},
        {"Year": null, "Date": "May 6, 1937", "Fatalities": "?", "extra": [1, 2]}
    ]);
    let rows: Vec<AccidentRow> = serde_json::from_value(v).unwrap();
    assert_eq!(rows[0].year, Some(1999));
    assert_eq!(rows[0].date, None);
    assert_eq!(rows[0].time.as_deref(), Some("1230"));
    assert_eq!(rows[0].hour(), Some(12));
    assert_eq!(rows[0].operator_country, None);
    assert_eq!(rows[0].fatalities_count(), 3);
    assert_eq!(rows[0].aboard_count(), 10);
    assert_eq!(rows[0].aboard_breakdown(), None);

    assert_eq!(rows[1].year, None);
    assert_eq!(rows[1].effective_year(), Some(1937));
    assert_eq!(rows[1].fatalities_count(), 0);
    assert_eq!(rows[1].hour(), None);
}

#[test]
fn csv_fixture_reads_as_accident_rows() {
    let src = FileSource::new(fixtures());
    assert!(src.dir().join(ACCIDENT_CSV).is_file());
    let rows = src.accidents().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].year, Some(1970));
    assert_eq!(rows[0].date.as_deref(), Some("March 3, 1970"));
    assert_eq!(rows[0].location.as_deref(), Some("Paris, France"));
    assert_eq!(rows[0].aboard_breakdown(), Some((20, 5)));
    assert_eq!(rows[1].hour(), Some(9));
    assert_eq!(rows[2].manufacturer.as_deref(), Some("Boeing"));
    assert_eq!(rows[4].year, None);
    assert_eq!(rows[4].effective_year(), Some(2001));
    assert_eq!(rows[4].hour(), None);
}

#[test]
fn endpoint_fixtures_decode() {
    let src = FileSource::new(fixtures());

    let countries = src.operator_countries(None).unwrap();
    assert_eq!(countries.len(), 3);
    assert_eq!(
        countries[1],
        CountryCount {
            country: "Germany".into(),
            count: 30.0
        }
    );
    assert_eq!(countries[2].country, "");

    let engines = src.engine_rates().unwrap();
    let keys: Vec<&str> = engines.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["1", "2", "3", "4"]);
    assert_eq!(engines[2].1, 9.0);

    let weights = src.weight_rates().unwrap();
    let keys: Vec<&str> = weights.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["Small", "Medium", "Large", "Heavy"]);

    let bins = src.wingspan_bins().unwrap();
    assert_eq!(bins.len(), 3);
    assert_eq!(bins[2].accident_count, 7.0);

    let makers = src.manufacturer_years().unwrap();
    let years: Vec<i32> = makers.iter().map(|r| r.year).collect();
    assert_eq!(years, [1990, 2000, 2010]);
    assert_eq!(makers[2].counts.get("Airbus"), Some(&14.0));

    let aboard = src.aboard_distribution().unwrap();
    let heavy = &aboard[&GroupKey::new("passengers", "Heavy")];
    assert_eq!(heavy.len(), 3);
    assert!(heavy[2].is_nan());
    assert_eq!(aboard[&GroupKey::new("crew", "Small")], vec![1.0, 2.0, 2.0, 3.0]);
}

#[test]
fn cluster_payload_decodes_with_bad_points() {
    let data: ClusterData = FileSource::new(fixtures()).cluster_data().unwrap();
    assert_eq!(data.points.len(), 6);
    assert!(data.points[5].x.is_nan());
    assert_eq!(data.points[1].fatalities, Some(520.0));
    assert_eq!(data.points[4].cluster_label(), "Cluster 2");
    assert_eq!(data.points[0].cluster_label(), "Weather");
    assert_eq!(data.kmeans.distribution.get("Engine failure"), Some(&2.0));
    assert_eq!(data.kmeans.clusters[0].term_labels(), ["fog", "storm"]);

    let empty: ClusterData = serde_json::from_str("{}").unwrap();
    assert!(empty.points.is_empty());
}

#[test]
fn operator_counts_respect_the_date_range() {
    let src = FileSource::new(fixtures());
    let range = DateRange::new(date(2000, 12, 31), date(1980, 1, 1));
    assert_eq!(range.start, date(1980, 1, 1));
    let counts = src.operator_countries(Some(range)).unwrap();
    let got: Vec<(&str, f64)> = counts.iter().map(|c| (c.country.as_str(), c.count)).collect();
    assert_eq!(got, [("Japan", 1.0), ("United States", 1.0)]);

    let rows = src.accidents().unwrap();
    let all = operator_country_counts(&rows, None);
    assert_eq!(all[0].country, "France");
    assert_eq!(all[0].count, 2.0);
    let early = operator_country_counts(&rows, Some(DateRange::new(date(1960, 1, 1), date(1975, 1, 1))));
    assert_eq!(early.len(), 1);
}

#[test]
fn aboard_distribution_falls_back_to_raw_rows() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixtures().join(ACCIDENT_CSV), dir.path().join(ACCIDENT_CSV)).unwrap();
    let src = FileSource::new(dir.path());
    let groups = src.aboard_distribution().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&GroupKey::new("crew", "All")], vec![5.0, 4.0, 15.0, 18.0, 9.0]);
    assert_eq!(
        groups[&GroupKey::new("passengers", "All")],
        vec![20.0, 36.0, 509.0, 212.0, 251.0]
    );
    assert_eq!(aboard_from_rows(&[]).len(), 0);
}

#[test]
fn missing_and_broken_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let src = FileSource::new(dir.path());
    assert!(matches!(src.wingspan_bins(), Err(FetchError::Io { .. })));
    assert!(matches!(src.accidents(), Err(FetchError::Io { .. })));

    std::fs::write(src.path_for(Endpoint::WingspanBins), "[{\"bin_start\": ").unwrap();
    let err = src.wingspan_bins().unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
    assert!(!err.is_transient());
}

#[test]
fn client_builds_endpoint_urls() {
    let client = Client::new(ApiConfig::default().with_base_url("http://example.test/api/")).unwrap();
    assert_eq!(
        client.url_for(Endpoint::ClusterData, &[]),
        "http://example.test/api/api/cluster-data"
    );
    let q = [
        ("start_date", "2001-01-01".to_string()),
        ("end_date", "2001-12-31".to_string()),
    ];
    assert_eq!(
        client.url_for(Endpoint::OperatorCountry, &q),
        "http://example.test/api/operator-country?start_date=2001-01-01&end_date=2001-12-31"
    );
    assert_eq!(client.describe(), "http://example.test/api");
}

#[test]
fn only_server_and_network_failures_are_transient() {
    let status = |s| FetchError::Status {
        url: "u".into(),
        status: s,
    };
    assert!(status(502).is_transient());
    assert!(!status(404).is_transient());
    assert!(
        FetchError::Network {
            url: "u".into(),
            message: "reset".into()
        }
        .is_transient()
    );
}

// Live test (opt-in): cargo test --features online -- --ignored
#[cfg(feature = "online")]
#[test]
#[ignore = "needs the dashboard API"]
fn live_api_serves_wingspan_bins() {
    let client = Client::new(ApiConfig::from_env()).unwrap();
    let bins = client.wingspan_bins().unwrap();
    assert!(!bins.is_empty());
}
