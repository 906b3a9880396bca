use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use super::attrs::Attrs;
use super::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// Closed – boundary policy for time slicing
// ---------------------------------------------------------------------------

/// Which ends of a `[t_min, t_max]` window are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Closed {
    /// `t_min <= t <= t_max`
    #[default]
    Both,
    /// `t_min <= t < t_max`
    Left,
    /// `t_min < t <= t_max`
    Right,
    /// `t_min < t < t_max`
    Neither,
}

impl Closed {
    fn includes_start(self) -> bool {
        matches!(self, Closed::Both | Closed::Left)
    }

    fn includes_end(self) -> bool {
        matches!(self, Closed::Both | Closed::Right)
    }

    /// Whether `t` falls inside the window. A `None` bound is unbounded.
    pub fn contains(self, t: f64, t_min: Option<f64>, t_max: Option<f64>) -> bool {
        let after_start = match t_min {
            Some(lo) if self.includes_start() => t >= lo,
            Some(lo) => t > lo,
            None => true,
        };
        let before_end = match t_max {
            Some(hi) if self.includes_end() => t <= hi,
            Some(hi) => t < hi,
            None => true,
        };
        after_start && before_end
    }
}

impl FromStr for Closed {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "both" => Ok(Closed::Both),
            "left" => Ok(Closed::Left),
            "right" => Ok(Closed::Right),
            "neither" => Ok(Closed::Neither),
            other => Err(CoreError::InvalidArgument(format!(
                "closed must be one of: both, left, right, neither (got '{other}')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeSeriesLike – what channels depend on
// ---------------------------------------------------------------------------

/// Read interface shared by eager and lazy series.
///
/// Everything that touches sample data is fallible because a lazy series
/// loads on first access and the load may fail.
pub trait TimeSeriesLike: fmt::Debug + Send + Sync {
    fn unit(&self) -> Option<&str>;

    fn name(&self) -> Option<&str>;

    fn attrs(&self) -> &Attrs;

    /// The validated, in-memory series. Loads it first if needed.
    fn materialize(&self) -> Result<&TimeSeries>;

    /// False only for a lazy series that has not been loaded yet.
    fn is_loaded(&self) -> bool {
        true
    }

    fn n(&self) -> Result<usize> {
        Ok(self.materialize()?.n())
    }

    fn time(&self) -> Result<&[f64]> {
        Ok(self.materialize()?.time())
    }

    fn values(&self) -> Result<&[f64]> {
        Ok(self.materialize()?.values())
    }

    fn t_start(&self) -> Result<Option<f64>> {
        Ok(self.materialize()?.t_start())
    }

    fn t_end(&self) -> Result<Option<f64>> {
        Ok(self.materialize()?.t_end())
    }

    fn slice_time(&self, t_min: Option<f64>, t_max: Option<f64>, closed: Closed) -> Result<TimeSeries> {
        Ok(self.materialize()?.slice_time(t_min, t_max, closed))
    }

    fn mean(&self, skipna: bool) -> Result<Option<f64>> {
        Ok(self.materialize()?.mean(skipna))
    }

    fn std(&self, ddof: usize, skipna: bool) -> Result<Option<f64>> {
        Ok(self.materialize()?.std(ddof, skipna))
    }

    fn to_arrays(&self, copy: bool) -> Result<(Arc<[f64]>, Arc<[f64]>)> {
        Ok(self.materialize()?.to_arrays(copy))
    }
}

// ---------------------------------------------------------------------------
// TimeSeries – eager, validated
// ---------------------------------------------------------------------------

/// Immutable 1D time vector + 1D value vector.
///
/// Time is finite and non-decreasing (duplicates allowed); values may hold
/// NaN. An empty series is valid. Derived series share the sample buffers
/// whenever the samples are unchanged.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    time: Arc<[f64]>,
    values: Arc<[f64]>,
    unit: Option<String>,
    name: Option<String>,
    attrs: Attrs,
}

fn validate(time: &[f64], values: &[f64]) -> Result<()> {
    if time.len() != values.len() {
        return Err(CoreError::InvalidTimeSeries(format!(
            "`time` and `values` must have same length, got {} vs {}",
            time.len(),
            values.len()
        )));
    }
    if let Some(pos) = time.iter().position(|t| !t.is_finite()) {
        return Err(CoreError::InvalidTimeSeries(format!(
            "`time` contains a non-finite value at position {pos}"
        )));
    }
    if let Some(pos) = time.windows(2).position(|w| w[1] < w[0]) {
        return Err(CoreError::InvalidTimeSeries(format!(
            "`time` must be monotonic non-decreasing (decreases at position {})",
            pos + 1
        )));
    }
    Ok(())
}

impl TimeSeries {
    pub fn new(time: impl Into<Arc<[f64]>>, values: impl Into<Arc<[f64]>>) -> Result<Self> {
        let time = time.into();
        let values = values.into();
        validate(&time, &values)?;
        Ok(Self {
            time,
            values,
            unit: None,
            name: None,
            attrs: Attrs::new(),
        })
    }

    pub fn empty() -> Self {
        Self {
            time: Arc::from(Vec::new()),
            values: Arc::from(Vec::new()),
            unit: None,
            name: None,
            attrs: Attrs::new(),
        }
    }

    pub fn with_unit(&self, unit: Option<&str>) -> Self {
        Self {
            unit: unit.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_name(&self, name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Self {
        Self {
            attrs,
            ..self.clone()
        }
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn n(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn t_start(&self) -> Option<f64> {
        self.time.first().copied()
    }

    pub fn t_end(&self) -> Option<f64> {
        self.time.last().copied()
    }

    /// True if the sampling step is (approximately) constant.
    /// Series with two samples or fewer are always uniform.
    pub fn is_uniform(&self, rtol: f64, atol: f64) -> bool {
        if self.n() <= 2 {
            return true;
        }
        let dt0 = self.time[1] - self.time[0];
        self.time
            .windows(2)
            .all(|w| ((w[1] - w[0]) - dt0).abs() <= atol + rtol * dt0.abs())
    }

    /// Keep the samples whose time lies in the window.
    ///
    /// An empty series is returned as-is, sharing its buffers.
    pub fn slice_time(&self, t_min: Option<f64>, t_max: Option<f64>, closed: Closed) -> TimeSeries {
        if self.is_empty() {
            return self.clone();
        }

        let (time, values): (Vec<f64>, Vec<f64>) = self
            .time
            .iter()
            .zip(self.values.iter())
            .filter(|(t, _)| closed.contains(**t, t_min, t_max))
            .map(|(t, v)| (*t, *v))
            .unzip();

        // A subset of a sorted, finite axis needs no re-validation.
        TimeSeries {
            time: time.into(),
            values: values.into(),
            unit: self.unit.clone(),
            name: self.name.clone(),
            attrs: self.attrs.clone(),
        }
    }

    /// Arithmetic mean; `None` on an empty series.
    ///
    /// With `skipna` NaN entries are ignored, otherwise any NaN makes the
    /// result NaN.
    pub fn mean(&self, skipna: bool) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let (sum, count) = self
            .samples(skipna)
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        Some(sum / count as f64)
    }

    /// Standard deviation with `count - ddof` as divisor; `None` on an
    /// empty series, NaN when the divisor is not positive.
    pub fn std(&self, ddof: usize, skipna: bool) -> Option<f64> {
        let mean = self.mean(skipna)?;
        let (sq_sum, count) = self
            .samples(skipna)
            .fold((0.0, 0usize), |(acc, count), v| (acc + (v - mean).powi(2), count + 1));
        if count <= ddof {
            return Some(f64::NAN);
        }
        Some((sq_sum / (count - ddof) as f64).sqrt())
    }

    fn samples(&self, skipna: bool) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .copied()
            .filter(move |v| !(skipna && v.is_nan()))
    }

    /// `(time, values)`. Without `copy` the shared buffers are handed out
    /// and must be treated as read-only.
    pub fn to_arrays(&self, copy: bool) -> (Arc<[f64]>, Arc<[f64]>) {
        if copy {
            (Arc::from(&self.time[..]), Arc::from(&self.values[..]))
        } else {
            (Arc::clone(&self.time), Arc::clone(&self.values))
        }
    }

    /// True if both series point at the same sample buffers.
    pub fn shares_buffers(&self, other: &TimeSeries) -> bool {
        Arc::ptr_eq(&self.time, &other.time) && Arc::ptr_eq(&self.values, &other.values)
    }
}

impl TimeSeriesLike for TimeSeries {
    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    fn materialize(&self) -> Result<&TimeSeries> {
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// LazyTimeSeries – deferred load, cached once
// ---------------------------------------------------------------------------

/// Zero-argument producer of `(time, values)`.
pub type SeriesLoader = Box<dyn Fn() -> anyhow::Result<(Vec<f64>, Vec<f64>)> + Send + Sync>;

/// A series whose samples are produced on first access.
///
/// The loader runs at most once after it succeeds; the validated result is
/// cached for the lifetime of the value. A failed load is not cached and
/// the error is returned unchanged.
pub struct LazyTimeSeries {
    loader: SeriesLoader,
    unit: Option<String>,
    name: Option<String>,
    attrs: Attrs,
    cache: OnceLock<TimeSeries>,
}

impl LazyTimeSeries {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<(Vec<f64>, Vec<f64>)> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            unit: None,
            name: None,
            attrs: Attrs::new(),
            cache: OnceLock::new(),
        }
    }

    pub fn with_unit(mut self, unit: Option<&str>) -> Self {
        self.unit = unit.map(str::to_string);
        self
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    fn load(&self) -> Result<&TimeSeries> {
        if let Some(series) = self.cache.get() {
            return Ok(series);
        }

        let (time, values) = (self.loader)()?;
        log::debug!(
            "lazy series {:?}: loaded {} samples",
            self.name.as_deref().unwrap_or("<unnamed>"),
            time.len()
        );
        let series = TimeSeries::new(time, values)?;
        let series = TimeSeries {
            unit: self.unit.clone(),
            name: self.name.clone(),
            attrs: self.attrs.clone(),
            ..series
        };
        Ok(self.cache.get_or_init(|| series))
    }
}

impl fmt::Debug for LazyTimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyTimeSeries")
            .field("unit", &self.unit)
            .field("name", &self.name)
            .field("loaded", &self.cache.get().is_some())
            .finish()
    }
}

impl TimeSeriesLike for LazyTimeSeries {
    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    fn materialize(&self) -> Result<&TimeSeries> {
        self.load()
    }

    fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ts(time: &[f64], values: &[f64]) -> TimeSeries {
        TimeSeries::new(time.to_vec(), values.to_vec()).unwrap()
    }

    #[test]
    fn valid_series_reports_length_and_bounds() {
        let s = ts(&[0.0, 1.0, 1.0, 2.5], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.n(), 4);
        assert_eq!(s.t_start(), Some(0.0));
        assert_eq!(s.t_end(), Some(2.5));
    }

    #[test]
    fn empty_series_is_valid() {
        let s = TimeSeries::new(Vec::new(), Vec::new()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.t_start(), None);
        assert_eq!(s.t_end(), None);
        assert_eq!(s.mean(true), None);
        assert_eq!(s.std(0, true), None);
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeSeries(_)));
        assert!(err.to_string().contains("2 vs 1"));
    }

    #[test]
    fn rejects_non_finite_time() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = TimeSeries::new(vec![0.0, bad], vec![1.0, 2.0]).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTimeSeries(_)));
        }
    }

    #[test]
    fn rejects_decreasing_time() {
        let err = TimeSeries::new(vec![0.0, 2.0, 1.0], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeSeries(_)));
    }

    #[test]
    fn nan_values_are_allowed() {
        let s = ts(&[0.0, 1.0], &[f64::NAN, 2.0]);
        assert_eq!(s.n(), 2);
    }

    #[test]
    fn slice_closed_variants() {
        let s = ts(&[0.0, 1.0, 2.0, 3.0], &[10.0, 20.0, 30.0, 40.0]);

        let both = s.slice_time(Some(1.0), Some(2.0), Closed::Both);
        assert_eq!(both.time(), &[1.0, 2.0]);
        assert_eq!(both.values(), &[20.0, 30.0]);

        let left = s.slice_time(Some(1.0), Some(2.0), Closed::Left);
        assert_eq!(left.time(), &[1.0]);
        assert_eq!(left.values(), &[20.0]);

        let right = s.slice_time(Some(1.0), Some(2.0), Closed::Right);
        assert_eq!(right.time(), &[2.0]);
        assert_eq!(right.values(), &[30.0]);

        let neither = s.slice_time(Some(1.0), Some(2.0), Closed::Neither);
        assert!(neither.is_empty());
    }

    #[test]
    fn slice_with_open_bounds() {
        let s = ts(&[0.0, 1.0, 2.0, 3.0], &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(s.slice_time(None, None, Closed::Both).n(), 4);
        assert_eq!(s.slice_time(Some(2.0), None, Closed::Both).time(), &[2.0, 3.0]);
        assert_eq!(s.slice_time(None, Some(1.0), Closed::Left).time(), &[0.0]);
    }

    #[test]
    fn slice_keeps_unit_name_and_attrs() {
        let mut attrs = Attrs::new();
        attrs.insert("ecu".into(), "ME17".into());
        let s = ts(&[0.0, 1.0], &[1.0, 2.0])
            .with_unit(Some("rpm"))
            .with_name(Some("eng_spd"))
            .with_attrs(attrs.clone());

        let sliced = s.slice_time(Some(0.5), None, Closed::Both);
        assert_eq!(sliced.unit(), Some("rpm"));
        assert_eq!(sliced.name(), Some("eng_spd"));
        assert_eq!(sliced.attrs(), &attrs);
    }

    #[test]
    fn slicing_empty_series_shares_buffers() {
        let s = TimeSeries::empty();
        let sliced = s.slice_time(Some(0.0), Some(1.0), Closed::Both);
        assert!(sliced.shares_buffers(&s));
    }

    #[test]
    fn closed_parses_known_values_only() {
        assert_eq!("both".parse::<Closed>().unwrap(), Closed::Both);
        assert_eq!("neither".parse::<Closed>().unwrap(), Closed::Neither);
        let err = "middle".parse::<Closed>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn mean_and_std_skip_nan_by_default() {
        let s = ts(&[0.0, 1.0, 2.0], &[1.0, f64::NAN, 3.0]);
        assert_eq!(s.mean(true), Some(2.0));
        assert_eq!(s.std(0, true), Some(1.0));
        assert!(s.mean(false).unwrap().is_nan());
        assert!(s.std(0, false).unwrap().is_nan());
    }

    #[test]
    fn std_with_ddof() {
        let s = ts(&[0.0, 1.0, 2.0, 3.0], &[2.0, 4.0, 4.0, 6.0]);
        let sample_std = s.std(1, true).unwrap();
        assert!((sample_std - (8.0_f64 / 3.0).sqrt()).abs() < 1e-12);

        let single = ts(&[0.0], &[5.0]);
        assert!(single.std(1, true).unwrap().is_nan());
    }

    #[test]
    fn to_arrays_shares_or_copies() {
        let s = ts(&[0.0, 1.0], &[1.0, 2.0]);
        let (t_shared, _) = s.to_arrays(false);
        let (t_copy, v_copy) = s.to_arrays(true);

        let (t_again, _) = s.to_arrays(false);
        assert!(Arc::ptr_eq(&t_shared, &t_again));
        assert!(!Arc::ptr_eq(&t_shared, &t_copy));
        assert_eq!(&t_copy[..], s.time());
        assert_eq!(&v_copy[..], s.values());
    }

    #[test]
    fn with_unit_keeps_buffers() {
        let s = ts(&[0.0, 1.0], &[1.0, 2.0]);
        let renamed = s.with_unit(Some("Nm"));
        assert!(renamed.shares_buffers(&s));
        assert_eq!(s.unit(), None);
        assert_eq!(renamed.unit(), Some("Nm"));
    }

    #[test]
    fn uniform_detection() {
        assert!(ts(&[0.0, 0.1, 0.2, 0.3], &[0.0; 4]).is_uniform(1e-6, 1e-12));
        assert!(!ts(&[0.0, 0.1, 0.3], &[0.0; 3]).is_uniform(1e-6, 1e-12));
        assert!(ts(&[0.0, 5.0], &[0.0; 2]).is_uniform(1e-6, 1e-12));
    }

    fn counting_lazy(calls: Arc<AtomicUsize>) -> LazyTimeSeries {
        LazyTimeSeries::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok((vec![0.0, 1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0, 40.0]))
        })
        .with_unit(Some("rpm"))
        .with_name(Some("eng_spd"))
    }

    #[test]
    fn lazy_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting_lazy(Arc::clone(&calls));

        assert!(!lazy.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(TimeSeriesLike::unit(&lazy), Some("rpm"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(lazy.n().unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        lazy.time().unwrap();
        lazy.values().unwrap();
        lazy.to_arrays(true).unwrap();
        lazy.mean(true).unwrap();
        lazy.std(0, true).unwrap();
        lazy.slice_time(Some(1.0), None, Closed::Both).unwrap();
        lazy.t_end().unwrap();
        assert!(lazy.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_slice_matches_eager_slice() {
        let lazy = counting_lazy(Arc::new(AtomicUsize::new(0)));
        let eager = ts(&[0.0, 1.0, 2.0, 3.0], &[10.0, 20.0, 30.0, 40.0]);

        let lazy_half = lazy.slice_time(Some(0.0), Some(1.5), Closed::Both).unwrap();
        let eager_half = eager.slice_time(Some(0.0), Some(1.5), Closed::Both);
        assert_eq!(lazy_half.time(), eager_half.time());
        assert_eq!(lazy_half.values(), eager_half.values());
        assert_eq!(lazy_half.unit(), Some("rpm"));
    }

    #[test]
    fn lazy_validates_on_first_access() {
        let lazy = LazyTimeSeries::new(|| Ok((vec![1.0, 0.0], vec![1.0, 2.0])));
        let err = lazy.n().unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeSeries(_)));
        assert!(!lazy.is_loaded());
    }

    #[test]
    fn lazy_loader_errors_propagate() {
        let lazy = LazyTimeSeries::new(|| Err(anyhow::anyhow!("signal 3/7 unreadable")));
        let err = lazy.materialize().unwrap_err();
        assert!(matches!(err, CoreError::Load(_)));
        assert_eq!(err.to_string(), "signal 3/7 unreadable");
    }
}
