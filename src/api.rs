/// Data access for the accident statistics API.
///
/// Two sources implement [`DataSource`]:
/// - [`Client`], a blocking HTTP client against the dashboard backend
///   (`http://localhost:5000` by default, see [`ApiConfig::from_env`]);
/// - [`FileSource`], which reads the same payloads from `<dir>/<endpoint>.json`
///   and the raw dataset from `<dir>/accident-data.csv`.
///
/// Payloads decode through the lenient models in [`crate::models`], so odd
/// rows default instead of failing the whole request.
///
/// ### Example
/// ```no_run
/// use aviation_dash::api::{Client, DataSource};
/// use aviation_dash::config::ApiConfig;
///
/// let client = Client::new(ApiConfig::from_env())?;
/// let bins = client.wingspan_bins()?;
/// println!("{} wingspan bins", bins.len());
/// # Ok::<(), anyhow::Error>(())
/// ```
use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{
    AccidentRow, BinRow, ClusterData, CountryCount, GroupKey, ManufacturerYearRow,
    parse_aboard_distribution, parse_category_counts, parse_manufacturer_rows,
};
use anyhow::Context;
use chrono::NaiveDate;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upstream endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AccidentData,
    OperatorCountry,
    ManufacturersPerYear,
    EngineRates,
    WeightRates,
    WingspanBins,
    ClusterData,
    AboardDistribution,
}

impl Endpoint {
    pub const ALL: [Endpoint; 8] = [
        Endpoint::AccidentData,
        Endpoint::OperatorCountry,
        Endpoint::ManufacturersPerYear,
        Endpoint::EngineRates,
        Endpoint::WeightRates,
        Endpoint::WingspanBins,
        Endpoint::ClusterData,
        Endpoint::AboardDistribution,
    ];

    /// Path below the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::AccidentData => "accident-data",
            Endpoint::OperatorCountry => "operator-country",
            Endpoint::ManufacturersPerYear => "number_of_accidents_per_manufacturer_per_year",
            Endpoint::EngineRates => "get_accident_rate_engine_amount",
            Endpoint::WeightRates => "get_accident_rate_weight_amount",
            Endpoint::WingspanBins => "get_accident_rate_wingspan_bin",
            Endpoint::ClusterData => "api/cluster-data",
            Endpoint::AboardDistribution => "aboard_distribution",
        }
    }

    /// Fixture file name without extension (`api/cluster-data` -> `cluster-data`).
    pub fn file_stem(self) -> &'static str {
        let p = self.path();
        p.rsplit('/').next().unwrap_or(p)
    }
}

/// Inclusive date range for the operator-country endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Bounds are swapped when given in reverse.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

fn decode<T: DeserializeOwned>(origin: &str, v: Value) -> Result<T, FetchError> {
    serde_json::from_value(v).map_err(|e| FetchError::Decode {
        url: origin.to_string(),
        message: e.to_string(),
    })
}

/// A source of dashboard payloads. Implementors provide [`DataSource::get_json`];
/// the typed accessors decode on top of it.
pub trait DataSource: Send + Sync {
    fn get_json(&self, endpoint: Endpoint, query: &[(&str, String)]) -> Result<Value, FetchError>;

    /// Human-readable origin, for logs and error messages.
    fn describe(&self) -> String;

    fn accidents(&self) -> Result<Vec<AccidentRow>, FetchError> {
        let v = self.get_json(Endpoint::AccidentData, &[])?;
        decode(Endpoint::AccidentData.path(), v)
    }

    /// Accidents per operator country, optionally within a date range.
    fn operator_countries(&self, range: Option<DateRange>) -> Result<Vec<CountryCount>, FetchError> {
        let q = range.map(|r| r.query()).unwrap_or_default();
        let v = self.get_json(Endpoint::OperatorCountry, &q)?;
        decode(Endpoint::OperatorCountry.path(), v)
    }

    fn manufacturer_years(&self) -> Result<Vec<ManufacturerYearRow>, FetchError> {
        Ok(parse_manufacturer_rows(
            &self.get_json(Endpoint::ManufacturersPerYear, &[])?,
        ))
    }

    /// Accident rate per engine count, in display order.
    fn engine_rates(&self) -> Result<Vec<(String, f64)>, FetchError> {
        Ok(parse_category_counts(&self.get_json(Endpoint::EngineRates, &[])?))
    }

    /// Accident rate per weight class, in display order.
    fn weight_rates(&self) -> Result<Vec<(String, f64)>, FetchError> {
        Ok(parse_category_counts(&self.get_json(Endpoint::WeightRates, &[])?))
    }

    fn wingspan_bins(&self) -> Result<Vec<BinRow>, FetchError> {
        let v = self.get_json(Endpoint::WingspanBins, &[])?;
        decode(Endpoint::WingspanBins.path(), v)
    }

    fn cluster_data(&self) -> Result<ClusterData, FetchError> {
        let v = self.get_json(Endpoint::ClusterData, &[])?;
        decode(Endpoint::ClusterData.path(), v)
    }

    /// People aboard per accident, grouped by role and weight class.
    fn aboard_distribution(&self) -> Result<BTreeMap<GroupKey, Vec<f64>>, FetchError> {
        Ok(parse_aboard_distribution(
            &self.get_json(Endpoint::AboardDistribution, &[])?,
        ))
    }
}

/// Blocking HTTP client with a short retry loop for transient failures.
#[derive(Debug, Clone)]
pub struct Client {
    pub config: ApiConfig,
    http: HttpClient,
}

// Allow -, _, . unescaped in query values (ISO dates stay readable)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn encode_query(query: &[(&str, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                k,
                percent_encoding::utf8_percent_encode(v.trim(), SAFE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl Client {
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("aviation-dash/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self { config, http })
    }

    pub fn url_for(&self, endpoint: Endpoint, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}", self.config.base_url, endpoint.path());
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        url
    }

    /// GET and decode JSON. Server errors and transport errors are retried
    /// once per configured backoff step; client errors fail immediately.
    fn get_with_retry(&self, url: &str) -> Result<Value, FetchError> {
        let mut last_err: Option<FetchError> = None;
        let waits = std::iter::once(0).chain(self.config.retry_backoff_ms.iter().copied());
        for (attempt, backoff_ms) in waits.enumerate() {
            if backoff_ms > 0 {
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            let err = match self.http.get(url).send() {
                Ok(r) if r.status().is_success() => {
                    return r.json::<Value>().map_err(|e| FetchError::Decode {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
                Ok(r) => FetchError::Status {
                    url: url.to_string(),
                    status: r.status().as_u16(),
                },
                Err(e) => FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                },
            };
            if !err.is_transient() {
                return Err(err);
            }
            log::warn!("attempt {} failed: {err}", attempt + 1);
            last_err = Some(err);
        }
        Err(last_err.unwrap_or_else(|| FetchError::Network {
            url: url.to_string(),
            message: "no request attempted".into(),
        }))
    }
}

impl DataSource for Client {
    fn get_json(&self, endpoint: Endpoint, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url_for(endpoint, query);
        log::debug!("GET {url}");
        self.get_with_retry(&url)
    }

    fn describe(&self) -> String {
        self.config.base_url.clone()
    }
}

/// Reads payloads from a fixture directory.
///
/// Missing derived payloads are computed from the raw rows instead: the
/// operator-country counts (also whenever a date range is requested) and the
/// crew/passenger distribution.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

pub const ACCIDENT_CSV: &str = "accident-data.csv";

impl FileSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, endpoint: Endpoint) -> PathBuf {
        self.dir.join(format!("{}.json", endpoint.file_stem()))
    }

    fn has(&self, endpoint: Endpoint) -> bool {
        self.path_for(endpoint).is_file()
    }

    fn read_csv(&self) -> Result<Vec<AccidentRow>, FetchError> {
        let path = self.dir.join(ACCIDENT_CSV);
        let io_err = |source: std::io::Error| FetchError::Io {
            path: path.clone(),
            source,
        };
        let file = std::fs::File::open(&path).map_err(io_err)?;
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let mut rows = Vec::new();
        for (i, rec) in rdr.deserialize::<AccidentRow>().enumerate() {
            match rec {
                Ok(row) => rows.push(row),
                Err(e) => log::debug!("skipping csv record {}: {e}", i + 1),
            }
        }
        Ok(rows)
    }
}

impl DataSource for FileSource {
    fn get_json(&self, endpoint: Endpoint, _query: &[(&str, String)]) -> Result<Value, FetchError> {
        let path = self.path_for(endpoint);
        let text = std::fs::read_to_string(&path).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn accidents(&self) -> Result<Vec<AccidentRow>, FetchError> {
        if self.has(Endpoint::AccidentData) {
            let v = self.get_json(Endpoint::AccidentData, &[])?;
            decode(Endpoint::AccidentData.path(), v)
        } else {
            self.read_csv()
        }
    }

    fn operator_countries(&self, range: Option<DateRange>) -> Result<Vec<CountryCount>, FetchError> {
        if range.is_none() && self.has(Endpoint::OperatorCountry) {
            let v = self.get_json(Endpoint::OperatorCountry, &[])?;
            return decode(Endpoint::OperatorCountry.path(), v);
        }
        Ok(operator_country_counts(&self.accidents()?, range))
    }

    fn aboard_distribution(&self) -> Result<BTreeMap<GroupKey, Vec<f64>>, FetchError> {
        if self.has(Endpoint::AboardDistribution) {
            return Ok(parse_aboard_distribution(
                &self.get_json(Endpoint::AboardDistribution, &[])?,
            ));
        }
        Ok(aboard_from_rows(&self.accidents()?))
    }
}

/// Accidents per operator country, most first. With a range, rows without a
/// parsable date are left out.
pub fn operator_country_counts(rows: &[AccidentRow], range: Option<DateRange>) -> Vec<CountryCount> {
    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for r in rows {
        if let Some(range) = range
            && !r.parsed_date().is_some_and(|d| range.contains(d))
        {
            continue;
        }
        if let Some(c) = r.operator_country.as_deref() {
            *counts.entry(c).or_insert(0.0) += 1.0;
        }
    }
    let mut out: Vec<CountryCount> = counts
        .into_iter()
        .map(|(country, count)| CountryCount {
            country: country.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.total_cmp(&a.count).then_with(|| a.country.cmp(&b.country)));
    out
}

/// Crew and passenger counts from the `Aboard` context of raw rows. The raw
/// dataset carries no weight class, so every value lands in subcategory `"All"`.
pub fn aboard_from_rows(rows: &[AccidentRow]) -> BTreeMap<GroupKey, Vec<f64>> {
    let mut out: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for (passengers, crew) in rows.iter().filter_map(AccidentRow::aboard_breakdown) {
        out.entry(GroupKey::new("crew", "All"))
            .or_default()
            .push(crew as f64);
        out.entry(GroupKey::new("passengers", "All"))
            .or_default()
            .push(passengers as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_encoded() {
        let q = [("start_date", "2020-01-01".to_string()), ("q", "a b/c".to_string())];
        assert_eq!(encode_query(&q), "start_date=2020-01-01&q=a%20b%2Fc");
    }

    #[test]
    fn cluster_endpoint_file_stem() {
        assert_eq!(Endpoint::ClusterData.file_stem(), "cluster-data");
        assert_eq!(Endpoint::AccidentData.file_stem(), "accident-data");
    }
}
