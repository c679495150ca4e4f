//! Null-skipping reductions used by the aggregation stages.
//!
//! Nulls are dropped first; the arithmetic is `statrs`.

use statrs::statistics::{Data, Distribution, OrderStatistics};

fn present<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().collect()
}

/// Arithmetic mean of the non-null values; `None` when there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let xs = present(values);
    if xs.is_empty() {
        return None;
    }
    Data::new(xs).mean()
}

/// Sample standard deviation (n − 1 denominator); `None` below two values.
pub fn sample_std<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let xs = present(values);
    if xs.len() < 2 {
        return None;
    }
    Data::new(xs).std_dev()
}

/// Median of the non-null values (average of the middle pair for even counts).
pub fn median<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let xs = present(values);
    if xs.is_empty() {
        return None;
    }
    Some(Data::new(xs).median())
}
